//! **sarchive** - a mountable, read-write Nintendo SARC archive engine.
//!
//! # Modules
//! | Module | Responsibility |
//! |--------|--------|
//! | [`vmem`] | Growable per-entry memory regions |
//! | [`io`] | The `IoStream` contract and its file/memory/range implementations |
//! | [`dirtree`] | Path-keyed directory tree |
//! | [`entry`] | A single archive member's metadata and buffer |
//! | [`sarc`] | SARC wire format: hashing, header/table (de)serialization |
//! | [`archive`] | Open-archive context: backing stream, tree, write-handle count |
//! | [`handle`] | Per-open-file read/write/append handles |
//! | [`rebuild`] | Serializes the directory tree back into SARC bytes |
//! | [`zstd_stream`] | Streaming Zstandard decompression with dictionary support |
//! | [`archiver`] | The top-level `SarcArchive` facade |

pub mod archive;
pub mod archiver;
pub mod dirtree;
pub mod entry;
pub mod error;
pub mod handle;
pub mod io;
pub mod rebuild;
pub mod sarc;
pub mod vmem;
pub mod zstd_stream;

pub use archiver::{zstd_add_dict, zstd_wrap_io, SarcArchive};
pub use error::{Error, Result};

//! The crate's top-level surface (`spec.md` §6): a mountable SARC archive
//! plus the Zstandard-wrapping helpers any backing stream can be passed
//! through first.
//!
//! Mirrors `archiver_sarc_default`'s bundle of `openArchive`/`enumerate`/
//! `openRead`/`openWrite`/`openAppend`/`remove`/`mkdir`/`stat`/
//! `closeArchive`, plus `zstd_wrap_io`/`zstd_io_add_dict` from
//! `zstd_io.c`, as methods and free functions on top of the lower-level
//! [`crate::archive::Archive`]/[`crate::handle::FileHandle`] types.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::archive::{Archive, Stat};
use crate::error::Result;
use crate::handle::FileHandle;
use crate::io::{FileIo, IoStream};
use crate::zstd_stream::ZstdStream;

/// A mounted, read-write SARC archive.
#[derive(Debug, Clone)]
pub struct SarcArchive {
    inner: Rc<RefCell<Archive>>,
}

impl SarcArchive {
    /// Parse an existing SARC archive from any stream.
    pub fn open(io: Box<dyn IoStream>, name: &str) -> Result<Self> {
        Ok(Self {
            inner: Archive::open(io, name)?,
        })
    }

    /// Start a new, empty archive over a stream (typically freshly
    /// created/truncated).
    pub fn create(io: Box<dyn IoStream>, name: &str) -> Result<Self> {
        Ok(Self {
            inner: Archive::create(io, name)?,
        })
    }

    /// Open an existing SARC file on the host filesystem for read-write
    /// access.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy().into_owned();
        let file = std::fs::File::options().read(true).write(true).open(path)?;
        Self::open(Box::new(FileIo::from_file(file)), &name)
    }

    /// Create a new SARC file on the host filesystem, overwriting any
    /// existing file at `path`.
    pub fn create_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_string_lossy().into_owned();
        Self::create(Box::new(FileIo::create(path)?), &name)
    }

    pub fn filename(&self) -> String {
        self.inner.borrow().filename().to_string()
    }

    pub fn stat(&self, path: &str) -> Result<Stat> {
        self.inner.borrow().stat(path)
    }

    /// Direct children of `dir` (`""` for the archive root).
    pub fn enumerate(&self, dir: &str) -> Vec<String> {
        self.inner.borrow().enumerate(dir)
    }

    pub fn open_read(&self, path: &str) -> Result<FileHandle> {
        FileHandle::open_read(&self.inner, path)
    }

    pub fn open_write(&self, path: &str) -> Result<FileHandle> {
        FileHandle::open_write(&self.inner, path, false)
    }

    pub fn open_append(&self, path: &str) -> Result<FileHandle> {
        FileHandle::open_write(&self.inner, path, true)
    }

    pub fn mkdir(&self, path: &str) -> Result<()> {
        self.inner.borrow_mut().mkdir(path)
    }

    /// Always fails: SARC archives do not support removal.
    pub fn remove(&self, path: &str) -> Result<()> {
        self.inner.borrow_mut().remove(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.inner.borrow().exists(path)
    }
}

/// Wrap `io` so reads from it are transparently Zstandard-decompressed.
pub fn zstd_wrap_io(io: Box<dyn IoStream>) -> Result<Box<dyn IoStream>> {
    Ok(Box::new(ZstdStream::wrap(io)?))
}

/// Register a reference dictionary for every future [`ZstdStream`].
pub fn zstd_add_dict(bytes: Vec<u8>) {
    crate::zstd_stream::add_dict(bytes)
}

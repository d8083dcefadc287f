//! The `IoStream` contract (C2 in `spec.md` §4.2) and its implementations.
//!
//! A polymorphic byte stream every consumer (the SARC codec, an open file
//! handle, the Zstd wrapper) can be built on top of. In the original C
//! source this is `PHYSFS_Io`, a struct of function pointers plus an
//! `opaque` pointer (see `spec.md` §9, "tagged handle over opaque pointer").
//! Here it is a plain object-safe trait so archives, ranges, and Zstd
//! wrappers can all be held as `Box<dyn IoStream>` without a tagged union or
//! pointer casts.
//!
//! `destroy()` from the original contract has no explicit method here —
//! `Drop` plays that role, which is the idiomatic Rust equivalent.

pub mod file;
pub mod memory;
pub mod range;

pub use file::FileIo;
pub use memory::MemoryIo;
pub use range::RangeIo;

use crate::error::Result;

/// A seekable, possibly-writable byte stream.
pub trait IoStream: std::fmt::Debug {
    /// Read up to `buf.len()` bytes, returning the count read (0 at EOF).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write `buf` in full. Read-only streams return `Ok(0)`.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Seek to an absolute byte offset. Bounded streams fail with
    /// [`crate::error::Error::PastEof`] when `offset` exceeds their length.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Current cursor position.
    fn tell(&mut self) -> Result<u64>;

    /// Total length of the stream in bytes.
    fn length(&mut self) -> Result<u64>;

    /// Truncate (or extend with zeros) a writable stream to `len` bytes.
    fn truncate(&mut self, len: u64) -> Result<()>;

    /// Produce an independent cursor over the same underlying data.
    fn duplicate(&self) -> Result<Box<dyn IoStream>>;

    /// Flush any buffered state. For a SARC write handle this is the
    /// trigger point for rebuild (see `src/handle.rs`).
    fn flush(&mut self) -> Result<()>;
}

/// Read exactly `buf.len()` bytes, translating short reads to
/// [`crate::error::Error::Io`] with `UnexpectedEof`, the way `std::io::Read`
/// does.
pub fn read_exact(io: &mut dyn IoStream, mut buf: &mut [u8]) -> Result<()> {
    while !buf.is_empty() {
        match io.read(buf)? {
            0 => {
                return Err(crate::error::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                )));
            }
            n => buf = &mut buf[n..],
        }
    }
    Ok(())
}

/// Write every byte of `buf`, short-write included (`std::io::Write`'s
/// `write_all` has no direct equivalent on the trait since `write` may do
/// partial writes by contract).
pub fn write_all(io: &mut dyn IoStream, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        let n = io.write(buf)?;
        if n == 0 {
            return Err(crate::error::Error::ReadOnly("write returned 0 bytes"));
        }
        buf = &buf[n..];
    }
    Ok(())
}

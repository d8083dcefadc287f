//! A bounded view over a byte range of another stream.
//!
//! Used by the handle layer (`src/handle.rs`) for a clean entry's read
//! path: rather than copying bytes out of the archive's backing stream
//! up front, a `RangeIo` just remembers `(base, size)` and translates
//! every operation into an offset read against the shared backing.

use super::IoStream;
use crate::error::{Error, Result};

#[derive(Debug)]
pub struct RangeIo {
    inner: Box<dyn IoStream>,
    base: u64,
    size: u64,
    cursor: u64,
}

impl RangeIo {
    /// Wrap `[base, base + size)` of `inner` as a standalone stream.
    ///
    /// `inner`'s own cursor is owned by this `RangeIo` from here on; every
    /// operation repositions it before touching the underlying stream, so
    /// callers should not keep reading `inner` directly afterwards.
    pub fn new(inner: Box<dyn IoStream>, base: u64, size: u64) -> Self {
        Self {
            inner,
            base,
            size,
            cursor: 0,
        }
    }
}

impl IoStream for RangeIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.cursor >= self.size {
            return Ok(0);
        }
        let max = (self.size - self.cursor) as usize;
        let want = buf.len().min(max);
        self.inner.seek(self.base + self.cursor)?;
        let n = self.inner.read(&mut buf[..want])?;
        self.cursor += n as u64;
        Ok(n)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Err(Error::ReadOnly("range view is read-only"))
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.size {
            return Err(Error::PastEof);
        }
        self.cursor = offset;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.cursor)
    }

    fn length(&mut self) -> Result<u64> {
        Ok(self.size)
    }

    fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(Error::ReadOnly("range view is read-only"))
    }

    fn duplicate(&self) -> Result<Box<dyn IoStream>> {
        Ok(Box::new(Self {
            inner: self.inner.duplicate()?,
            base: self.base,
            size: self.size,
            cursor: 0,
        }))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryIo;

    #[test]
    fn reads_are_clipped_to_range() {
        let mut backing = MemoryIo::new();
        backing.write(b"0123456789").unwrap();
        let mut view = RangeIo::new(Box::new(backing), 3, 4);
        let mut buf = [0u8; 16];
        let n = view.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"3456");
        assert_eq!(view.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn seek_past_range_end_fails() {
        let mut backing = MemoryIo::new();
        backing.write(b"0123456789").unwrap();
        let mut view = RangeIo::new(Box::new(backing), 0, 4);
        assert!(view.seek(5).is_err());
        assert!(view.seek(4).is_ok());
    }
}

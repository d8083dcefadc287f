//! The host-filesystem `IoStream` implementation.
//!
//! Corresponds to the "host's file-backed stream" mentioned in `spec.md`
//! §4.2. This is the only implementation that talks to the OS; everything
//! else in this crate is built on top of [`super::IoStream`] generically.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::IoStream;
use crate::error::Result;

#[derive(Debug)]
pub struct FileIo {
    file: File,
}

impl FileIo {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            file: File::open(path)?,
        })
    }

    /// Open for read-write, creating the file if it does not exist.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self { file })
    }

    /// Wrap an already-open file (e.g. opened read-write by the caller for
    /// an existing archive that will be rebuilt in place).
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl IoStream for FileIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.file.read(buf)?)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        Ok(self.file.write(buf)?)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let len = self.length()?;
        if offset > len {
            return Err(crate::error::Error::PastEof);
        }
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn length(&mut self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    fn duplicate(&self) -> Result<Box<dyn IoStream>> {
        Ok(Box::new(FileIo {
            file: self.file.try_clone()?,
        }))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.file.flush()?)
    }
}

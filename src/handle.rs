//! Per-open-file handle (C8 in `spec.md` §4.8).
//!
//! Addresses its entry by stable path key rather than a cached index or
//! raw pointer (`spec.md` §9, "handles key entries by path, not pointer"),
//! and holds a [`Weak`] reference to the archive rather than the original's
//! raw back-pointer (`arc_info` in `SARC_file_ctx`) so a handle outliving
//! its archive fails gracefully instead of dereferencing freed memory.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::io::{IoStream, RangeIo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
    Append,
}

#[derive(Debug)]
enum Backend {
    /// A read handle opened while the entry was still `Clean`: an
    /// independent duplicate of the archive's backing stream, bounded to
    /// the entry's on-disk extent. Unaffected by later writes through a
    /// different handle to the same entry.
    Snapshot(Box<dyn IoStream>),
    /// Every read or write goes straight through the archive's entry
    /// buffer, borrowed fresh on each call.
    Live,
}

#[derive(Debug)]
pub struct FileHandle {
    archive: Weak<RefCell<Archive>>,
    path: String,
    mode: Mode,
    cursor: u64,
    backend: Backend,
    flushed: bool,
}

impl FileHandle {
    pub fn open_read(archive: &Rc<RefCell<Archive>>, path: &str) -> Result<Self> {
        let mut a = archive.borrow_mut();
        let entry = a.tree.find(path).ok_or(Error::Corrupt("no such entry"))?;
        if entry.is_dir() {
            return Err(Error::NotAFile);
        }

        let backend = if entry.is_dirty() {
            Backend::Live
        } else {
            let (start, size) = (entry.start_pos, entry.size());
            let dup = a.backing.duplicate()?;
            Backend::Snapshot(Box::new(RangeIo::new(dup, start, size)))
        };

        Ok(Self {
            archive: Rc::downgrade(archive),
            path: path.to_string(),
            mode: Mode::Read,
            cursor: 0,
            backend,
            flushed: true,
        })
    }

    pub fn open_write(archive: &Rc<RefCell<Archive>>, path: &str, append: bool) -> Result<Self> {
        {
            let mut a = archive.borrow_mut();
            a.ensure_file(path);
            a.materialize_all()?;
            if let Some(entry) = a.tree.find(path) {
                if entry.is_dir() {
                    return Err(Error::NotAFile);
                }
            }
            a.begin_write();
        }

        let cursor = if append {
            archive
                .borrow()
                .tree
                .find(path)
                .map(|e| e.size())
                .unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            archive: Rc::downgrade(archive),
            path: path.to_string(),
            mode: if append { Mode::Append } else { Mode::Write },
            cursor,
            backend: Backend::Live,
            flushed: false,
        })
    }

    fn archive(&self) -> Result<Rc<RefCell<Archive>>> {
        self.archive
            .upgrade()
            .ok_or(Error::Corrupt("archive has been closed"))
    }
}

impl IoStream for FileHandle {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.backend {
            Backend::Snapshot(s) => {
                s.seek(self.cursor)?;
                let n = s.read(buf)?;
                self.cursor += n as u64;
                Ok(n)
            }
            Backend::Live => {
                let archive = self.archive()?;
                let a = archive.borrow();
                let entry = a.tree.find(&self.path).ok_or(Error::Corrupt("entry vanished"))?;
                let data = entry.as_slice().ok_or(Error::Corrupt("entry not materialized"))?;
                let pos = self.cursor as usize;
                if pos >= data.len() {
                    return Ok(0);
                }
                let n = buf.len().min(data.len() - pos);
                buf[..n].copy_from_slice(&data[pos..pos + n]);
                self.cursor += n as u64;
                Ok(n)
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.mode == Mode::Read {
            return Err(Error::ReadOnly("handle opened for reading"));
        }
        let archive = self.archive()?;
        let mut a = archive.borrow_mut();
        let entry = a
            .tree
            .find_mut(&self.path)
            .ok_or(Error::Corrupt("entry vanished"))?;
        let end = self.cursor + buf.len() as u64;
        if end > entry.size() {
            entry.resize(end)?;
        }
        let data = entry.as_mut_slice().ok_or(Error::Corrupt("entry not materialized"))?;
        let pos = self.cursor as usize;
        data[pos..pos + buf.len()].copy_from_slice(buf);
        self.cursor += buf.len() as u64;
        self.flushed = false;
        Ok(buf.len())
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let len = self.length()?;
        if offset > len {
            return Err(Error::PastEof);
        }
        self.cursor = offset;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.cursor)
    }

    fn length(&mut self) -> Result<u64> {
        match &mut self.backend {
            Backend::Snapshot(s) => s.length(),
            Backend::Live => {
                let archive = self.archive()?;
                let a = archive.borrow();
                let entry = a.tree.find(&self.path).ok_or(Error::Corrupt("entry vanished"))?;
                Ok(entry.size())
            }
        }
    }

    fn truncate(&mut self, len: u64) -> Result<()> {
        if self.mode == Mode::Read {
            return Err(Error::ReadOnly("handle opened for reading"));
        }
        let archive = self.archive()?;
        let mut a = archive.borrow_mut();
        let entry = a
            .tree
            .find_mut(&self.path)
            .ok_or(Error::Corrupt("entry vanished"))?;
        entry.resize(len)?;
        self.flushed = false;
        Ok(())
    }

    fn duplicate(&self) -> Result<Box<dyn IoStream>> {
        let backend = match &self.backend {
            Backend::Snapshot(s) => Backend::Snapshot(s.duplicate()?),
            Backend::Live => Backend::Live,
        };
        Ok(Box::new(Self {
            archive: self.archive.clone(),
            path: self.path.clone(),
            mode: self.mode,
            cursor: 0,
            backend,
            flushed: true,
        }))
    }

    /// Rebuild the archive and decrement the write-handle count, the way
    /// `SARC_flush`/`close_write_handle` do. A no-op for read handles and
    /// idempotent for write handles (matches `spec.md` §4.8, "flush is
    /// safe to call more than once").
    fn flush(&mut self) -> Result<()> {
        if self.mode == Mode::Read || self.flushed {
            return Ok(());
        }
        let archive = self.archive()?;
        archive.borrow_mut().end_write()?;
        self.flushed = true;
        Ok(())
    }
}

impl Drop for FileHandle {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

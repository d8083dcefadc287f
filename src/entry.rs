//! A single archive member: a file's metadata plus its mutable buffer, or
//! a directory marker (C3/C7 in `spec.md` §4.3/§4.5).
//!
//! Files start out `Clean` (their bytes live only in the archive's backing
//! stream, at `start_pos`) and become [`EntryData::Owned`] the first time
//! anything opens them for writing. `spec.md` §3 is explicit that "Owned
//! regions are freed only when the archive is closed" — entries never
//! revert to `Clean` once materialized, even if every write handle to them
//! closes.

use crate::vmem::Region;

#[derive(Debug)]
pub enum EntryData {
    /// Bytes live in the archive's backing stream; not yet materialized.
    Clean,
    /// Bytes have been copied into an owned, independently growable buffer.
    Owned(Region),
}

#[derive(Debug)]
pub struct Entry {
    pub name: String,
    is_dir: bool,
    /// Byte offset into the archive's backing stream where this entry's
    /// (possibly still-compressed) data begins. Meaningless while `data`
    /// is `Owned`.
    pub start_pos: u64,
    /// Logical size in bytes. For a `Clean` entry this is the on-disk
    /// extent; for `Owned` it tracks `Region::len`.
    size: u64,
    pub data: EntryData,
}

impl Entry {
    pub fn new_dir(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: true,
            start_pos: 0,
            size: 0,
            data: EntryData::Clean,
        }
    }

    pub fn new_file(name: &str, start_pos: u64, size: u64) -> Self {
        Self {
            name: name.to_string(),
            is_dir: false,
            start_pos,
            size,
            data: EntryData::Clean,
        }
    }

    /// A brand-new, empty, already-`Owned` file (fresh entries created by
    /// `open_write` on a path that doesn't exist yet have no backing-stream
    /// home to be `Clean` against).
    pub fn new_owned_file(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_dir: false,
            start_pos: 0,
            size: 0,
            data: EntryData::Owned(Region::default()),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self.data, EntryData::Owned(_))
    }

    pub fn size(&self) -> u64 {
        match &self.data {
            EntryData::Owned(r) => r.len() as u64,
            EntryData::Clean => self.size,
        }
    }

    /// Materialize a `Clean` entry into an `Owned` buffer by copying
    /// `bytes` (the caller already decompressed/read them from the backing
    /// stream). No-op if already `Owned`.
    pub fn materialize(&mut self, bytes: &[u8]) -> crate::error::Result<()> {
        if self.is_dirty() {
            return Ok(());
        }
        let mut region = Region::reserve(bytes.len().max(crate::vmem::DEFAULT_RESERVE))?;
        region.commit(bytes.len())?;
        region.as_mut_slice().copy_from_slice(bytes);
        self.size = bytes.len() as u64;
        self.data = EntryData::Owned(region);
        Ok(())
    }

    /// Grow or shrink an already-`Owned` entry's buffer.
    pub fn resize(&mut self, new_len: u64) -> crate::error::Result<()> {
        match &mut self.data {
            EntryData::Owned(r) => {
                r.resize(new_len as usize)?;
                self.size = new_len;
                Ok(())
            }
            EntryData::Clean => Err(crate::error::Error::ReadOnly(
                "cannot resize a clean entry directly, materialize it first",
            )),
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        match &self.data {
            EntryData::Owned(r) => Some(r.as_slice()),
            EntryData::Clean => None,
        }
    }

    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match &mut self.data {
            EntryData::Owned(r) => Some(r.as_mut_slice()),
            EntryData::Clean => None,
        }
    }
}

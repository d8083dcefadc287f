//! Per-entry growable memory regions (C1 in `spec.md` §4.1).
//!
//! The original `Torphedo/sarc_archiver` source reserves a large address
//! range per entry with `mmap`/`VirtualAlloc` (`PROT_NONE`/`MEM_RESERVE`) and
//! commits pages into it as the entry grows, so that a pointer handed out to
//! a handle stays valid across growth (see `examples/original_source/src/vmem.c`).
//! `spec.md` §4.1 explicitly allows falling back to reallocate-and-copy on
//! platforms without cheap reservation; this crate takes that path everywhere,
//! using `Vec<u8>` as the backing allocation. Nothing outside this module
//! ever holds a raw pointer into a [`Region`] — callers address bytes through
//! [`Region::as_slice`]/[`Region::as_mut_slice`], so a reallocating grow is
//! invisible to them (see `spec.md` §9, "per-entry growable memory").

use crate::error::{Error, Result};

/// Initial size reserved for a freshly materialized entry (`INITIAL_RESERVE`
/// in the original source's `callback_copy_files`, 5,000,000 bytes).
pub const DEFAULT_RESERVE: usize = 5_000_000;

/// Extra bytes committed beyond a requested size when growing past the
/// current reservation (the `+ 500` in the original `resize_entry`).
pub const GROWTH_SLACK: usize = 500;

/// A committed, growable byte region backing one archive entry.
///
/// `reserved()` reports the capacity currently backing the region (the
/// analogue of the original's separately tracked `reserved` field); `len()`
/// reports the committed prefix that is the entry's logical content.
#[derive(Debug, Default)]
pub struct Region {
    buf: Vec<u8>,
}

impl Region {
    /// Reserve a region of at least `size` bytes with nothing committed yet.
    pub fn reserve(size: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| Error::OutOfMemory)?;
        Ok(Self { buf })
    }

    /// Commit the first `len` bytes of the region, growing the backing
    /// allocation if needed. Shrinking (`len < self.len()`) truncates the
    /// committed prefix without releasing the reservation.
    pub fn commit(&mut self, len: usize) -> Result<()> {
        if len > self.buf.capacity() {
            self.buf
                .try_reserve_exact(len - self.buf.len())
                .map_err(|_| Error::OutOfMemory)?;
        }
        self.buf.resize(len, 0);
        Ok(())
    }

    /// Grow or shrink the region to exactly `new_len` bytes, preserving the
    /// existing content. Mirrors the original `resize_entry`: if `new_len`
    /// still fits the current reservation, the committed prefix is simply
    /// extended; otherwise a slack of [`GROWTH_SLACK`] bytes is reserved
    /// beyond what was asked for so the next few writes don't each trigger a
    /// reallocation.
    pub fn resize(&mut self, new_len: usize) -> Result<()> {
        if new_len <= self.buf.capacity() {
            self.buf.resize(new_len, 0);
        } else {
            self.buf
                .try_reserve_exact(new_len + GROWTH_SLACK - self.buf.len())
                .map_err(|_| Error::OutOfMemory)?;
            self.buf.resize(new_len, 0);
        }
        Ok(())
    }

    /// Number of bytes currently committed.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True when nothing is committed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes reserved (capacity) for this region.
    pub fn reserved(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

// `release()` has no explicit analogue: dropping a `Region` frees the
// backing `Vec<u8>`, which is the same release-of-reservation-and-storage
// the original's `virtual_free` performs.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_then_grow_preserves_prefix() {
        let mut r = Region::reserve(8).unwrap();
        r.commit(4).unwrap();
        r.as_mut_slice().copy_from_slice(b"abcd");
        r.resize(32).unwrap();
        assert_eq!(&r.as_slice()[..4], b"abcd");
        assert_eq!(r.len(), 32);
    }

    #[test]
    fn resize_beyond_reservation_reallocates() {
        let mut r = Region::reserve(4).unwrap();
        r.commit(4).unwrap();
        r.as_mut_slice().copy_from_slice(b"1234");
        r.resize(4096).unwrap();
        assert_eq!(&r.as_slice()[..4], b"1234");
        assert!(r.reserved() >= 4096);
    }

    #[test]
    fn shrink_keeps_prefix() {
        let mut r = Region::reserve(16).unwrap();
        r.commit(16).unwrap();
        r.as_mut_slice().copy_from_slice(b"0123456789abcdef");
        r.resize(4).unwrap();
        assert_eq!(r.as_slice(), b"0123");
    }
}

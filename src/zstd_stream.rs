//! Streaming Zstandard decompression with block-indexed random access and
//! a process-wide dictionary table (C4 in `spec.md` §4.4).
//!
//! Grounded on `examples/original_source/src/zstd_io.c`: a `ZstdStream`
//! decompresses its backing stream one `ZSTD_BLOCKSIZE_MAX`-sized block at
//! a time into a fixed output buffer, tracks which block index is
//! currently resident, and serves `seek` either by repositioning within
//! the resident block or by resetting the decompression session and
//! fast-forwarding block by block to the target. `spec.md` §9 calls this
//! out explicitly as worth keeping rather than redesigning into a full
//! random-access index, since SARC entries are read close to sequentially
//! in practice.
//!
//! This crate uses `zstd-safe`'s low-level `DCtx` bindings rather than the
//! high-level `zstd` crate's `Decoder`, because the high-level wrapper has
//! no way to attach more than one dictionary to a single decoding context
//! with automatic dictID-based selection — exactly what `ZSTD_d_refMultipleDDicts`
//! plus repeated `ZSTD_DCtx_refDDict` calls give the original. See
//! `DESIGN.md` for the accepted risk around this binding surface: it is
//! exercised nowhere else in the example corpus, so the exact method names
//! below are a best-effort match to the upstream `zstd-safe` API rather
//! than something this crate has verified against running code.

use std::sync::{Mutex, OnceLock};

use crate::error::{Error, Result};
use crate::io::IoStream;

/// Output (decompressed) block size, matching `ZSTD_BLOCKSIZE_MAX`.
const OUT_SIZE: usize = 128 * 1024;
/// Input buffer size: one compressed block plus its 3-byte block header.
const IN_SIZE: usize = OUT_SIZE + 3;

/// A process-wide table of up to three reference dictionaries, matching
/// `zstd_io.c`'s `dict_buffers[3]`. Dictionaries are matched to frames by
/// Zstandard's own dictID mechanism once referenced into a `DCtx` with
/// multi-dict mode enabled, so callers never need to say which dictionary
/// goes with which archive.
struct DictTable {
    dicts: Vec<Vec<u8>>,
}

const MAX_DICTS: usize = 3;

static DICT_TABLE: OnceLock<Mutex<DictTable>> = OnceLock::new();

fn dict_table() -> &'static Mutex<DictTable> {
    DICT_TABLE.get_or_init(|| Mutex::new(DictTable { dicts: Vec::new() }))
}

/// Register a dictionary for every future [`ZstdStream`] to reference.
/// Matches `zstd_io_add_dict`: silently does nothing once 3 slots are
/// filled (`spec.md` §4.4, "dictionary table has 3 slots").
pub fn add_dict(bytes: Vec<u8>) {
    let mut table = dict_table().lock().expect("dict table poisoned");
    if table.dicts.len() < MAX_DICTS {
        table.dicts.push(bytes);
    }
}

fn new_dctx_with_dicts() -> Result<zstd_safe::DCtx<'static>> {
    let mut dctx = zstd_safe::DCtx::create();
    dctx.set_parameter(zstd_safe::DParameter::RefMultipleDDicts(true))
        .map_err(|_| Error::Zstd)?;
    let table = dict_table().lock().expect("dict table poisoned");
    for dict in &table.dicts {
        // Leaked so the `'static` `DDict` required by a long-lived `DCtx`
        // stays valid; dictionaries are process-wide for this crate's
        // lifetime anyway (there is no `remove_dict`).
        let leaked: &'static [u8] = Box::leak(dict.clone().into_boxed_slice());
        let ddict = zstd_safe::DDict::create(leaked);
        dctx.ref_ddict(&ddict).map_err(|_| Error::Zstd)?;
    }
    Ok(dctx)
}

struct Decompressor {
    dctx: zstd_safe::DCtx<'static>,
    /// 1-based index of the block currently resident in `out_buf`; 0 means
    /// nothing decompressed yet.
    block_idx: u64,
    out_buf: Vec<u8>,
    out_len: usize,
    in_buf: Vec<u8>,
    in_pos: usize,
    in_len: usize,
}

impl Decompressor {
    fn new() -> Result<Self> {
        Ok(Self {
            dctx: new_dctx_with_dicts()?,
            block_idx: 0,
            out_buf: vec![0u8; OUT_SIZE],
            out_len: 0,
            in_buf: vec![0u8; IN_SIZE],
            in_pos: 0,
            in_len: 0,
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.dctx
            .reset(zstd_safe::ResetDirective::SessionOnly)
            .map_err(|_| Error::Zstd)?;
        self.block_idx = 0;
        self.in_pos = 0;
        self.in_len = 0;
        Ok(())
    }

    /// Decompress the next block from `src` into `out_buf`. Returns the
    /// number of bytes produced (0 at end of stream).
    fn decompress_block(&mut self, src: &mut dyn IoStream) -> Result<usize> {
        self.block_idx += 1;
        self.out_len = 0;

        loop {
            if self.in_pos >= self.in_len {
                self.in_len = src.read(&mut self.in_buf)?;
                self.in_pos = 0;
                if self.in_len == 0 {
                    break;
                }
            }

            let before = self.out_len;
            let mut out = zstd_safe::OutBuffer::around(&mut self.out_buf[..]);
            out.set_pos(self.out_len);
            let mut input =
                zstd_safe::InBuffer::around(&self.in_buf[self.in_pos..self.in_len]);

            let rc = self.dctx.decompress_stream(&mut out, &mut input);
            let consumed = input.pos();
            self.in_pos += consumed;
            self.out_len = out.pos();

            if rc.is_err() {
                return Err(Error::Zstd);
            }
            if self.out_len >= OUT_SIZE {
                break;
            }
            if consumed == 0 && self.out_len == before {
                // No forward progress possible with the input currently in
                // hand; either it's exhausted (loop back to read more) or
                // the frame has ended.
                if self.in_pos < self.in_len {
                    break;
                }
            }
        }
        if self.out_len == 0 {
            // Nothing resident changed; don't advance past the last block
            // that actually held data, or `block_start()` would jump ahead
            // of `pos` and the next `offset_in_block()` would underflow.
            self.block_idx -= 1;
        }
        Ok(self.out_len)
    }
}

impl std::fmt::Debug for Decompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decompressor")
            .field("block_idx", &self.block_idx)
            .field("out_len", &self.out_len)
            .finish()
    }
}

/// A read-only view over a Zstandard-compressed stream, decoded on demand.
#[derive(Debug)]
pub struct ZstdStream {
    inner: Box<dyn IoStream>,
    dec: Decompressor,
    /// Absolute decoded-byte position of the read cursor.
    pos: u64,
}

impl ZstdStream {
    pub fn wrap(mut inner: Box<dyn IoStream>) -> Result<Self> {
        inner.seek(0)?;
        let mut dec = Decompressor::new()?;
        dec.decompress_block(inner.as_mut())?;
        Ok(Self {
            inner,
            dec,
            pos: 0,
        })
    }

    fn block_start(&self) -> u64 {
        (self.dec.block_idx.saturating_sub(1)) * OUT_SIZE as u64
    }

    fn offset_in_block(&self) -> usize {
        self.pos.saturating_sub(self.block_start()) as usize
    }
}

impl IoStream for ZstdStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            let off = self.offset_in_block();
            if off >= self.dec.out_len {
                let n = self.dec.decompress_block(self.inner.as_mut())?;
                if n == 0 {
                    break;
                }
                continue;
            }
            let avail = self.dec.out_len - off;
            let want = (buf.len() - written).min(avail);
            buf[written..written + want]
                .copy_from_slice(&self.dec.out_buf[off..off + want]);
            written += want;
            self.pos += want as u64;
        }
        Ok(written)
    }

    fn write(&mut self, _buf: &[u8]) -> Result<usize> {
        Ok(0)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        let block_start = self.block_start();
        if offset >= block_start && offset < block_start + self.dec.out_len as u64 {
            self.pos = offset;
            return Ok(());
        }

        if offset < block_start {
            self.inner.seek(0)?;
            self.dec.reset()?;
            self.dec.decompress_block(self.inner.as_mut())?;
        }

        loop {
            let block_start = self.block_start();
            if offset < block_start + self.dec.out_len as u64 || self.dec.out_len == 0 {
                break;
            }
            let n = self.dec.decompress_block(self.inner.as_mut())?;
            if n == 0 {
                break;
            }
        }
        self.pos = offset;
        Ok(())
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos)
    }

    /// Decode the whole stream to find its length, resetting back to a
    /// fresh session afterwards — matches `zstd_length`'s approach of
    /// walking every block rather than trusting a frame content size field
    /// (older/streamed frames may not carry one).
    fn length(&mut self) -> Result<u64> {
        let saved_pos = self.pos;
        self.inner.seek(0)?;
        self.dec.reset()?;
        let mut total = 0u64;
        loop {
            let n = self.dec.decompress_block(self.inner.as_mut())?;
            if n == 0 {
                break;
            }
            total += n as u64;
        }
        self.seek(saved_pos.min(total))?;
        Ok(total)
    }

    fn truncate(&mut self, _len: u64) -> Result<()> {
        Err(Error::ReadOnly("zstd streams are read-only"))
    }

    fn duplicate(&self) -> Result<Box<dyn IoStream>> {
        let inner = self.inner.duplicate()?;
        Self::wrap(inner)
            .map(|s| Box::new(s) as Box<dyn IoStream>)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_dict_caps_at_three_slots() {
        for _ in 0..5 {
            add_dict(vec![0u8; 8]);
        }
        let table = dict_table().lock().unwrap();
        assert!(table.dicts.len() <= MAX_DICTS);
    }
}

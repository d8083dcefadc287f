//! SARC wire structures and their parsing (`spec.md` §4.3).
//!
//! Field layout follows `examples/original_source/src/sarc.h` exactly:
//! all multi-byte fields little-endian, `SARC` header (20 bytes), `SFAT`
//! header (12 bytes) followed by `node_count` 16-byte nodes, `SFNT` header
//! (8 bytes) followed by a NUL-terminated name per node, 4-byte aligned.

use crate::error::{Error, Result};
use crate::io::{read_exact, write_all, IoStream};

pub const SARC_MAGIC: [u8; 4] = *b"SARC";
pub const SARC_HEADER_SIZE: u16 = 0x14;
pub const SARC_LITTLE_ENDIAN: u16 = 0xFEFF;
pub const SARC_VERSION: u16 = 0x0100;

pub const SFAT_MAGIC: [u8; 4] = *b"SFAT";
pub const SFAT_HEADER_SIZE: u16 = 0xC;
pub const SFAT_NODE_SIZE: u32 = 16;

pub const SFNT_MAGIC: [u8; 4] = *b"SFNT";
pub const SFNT_HEADER_SIZE: u16 = 0x8;

pub const DEFAULT_HASH_KEY: u32 = super::hash::DEFAULT_HASH_KEY;

#[derive(Debug, Clone, Copy)]
pub struct Header {
    pub header_size: u16,
    pub byte_order_mark: u16,
    pub archive_size: u32,
    pub data_offset: u32,
    pub version: u16,
    pub reserved: u16,
}

impl Header {
    pub const WIRE_SIZE: u64 = 20;

    pub fn read(io: &mut dyn IoStream) -> Result<Self> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        read_exact(io, &mut buf)?;
        if buf[0..4] != SARC_MAGIC {
            return Err(Error::Unsupported);
        }
        Ok(Self {
            header_size: u16::from_le_bytes([buf[4], buf[5]]),
            byte_order_mark: u16::from_le_bytes([buf[6], buf[7]]),
            archive_size: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            data_offset: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
            version: u16::from_le_bytes([buf[16], buf[17]]),
            reserved: u16::from_le_bytes([buf[18], buf[19]]),
        })
    }

    pub fn write(&self, io: &mut dyn IoStream) -> Result<()> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        buf[0..4].copy_from_slice(&SARC_MAGIC);
        buf[4..6].copy_from_slice(&self.header_size.to_le_bytes());
        buf[6..8].copy_from_slice(&self.byte_order_mark.to_le_bytes());
        buf[8..12].copy_from_slice(&self.archive_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.data_offset.to_le_bytes());
        buf[16..18].copy_from_slice(&self.version.to_le_bytes());
        buf[18..20].copy_from_slice(&self.reserved.to_le_bytes());
        write_all(io, &buf)
    }

    pub fn fresh() -> Self {
        Self {
            header_size: SARC_HEADER_SIZE,
            byte_order_mark: SARC_LITTLE_ENDIAN,
            archive_size: 0,
            data_offset: 0,
            version: SARC_VERSION,
            reserved: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SfatHeader {
    pub header_size: u16,
    pub node_count: u16,
    pub hash_key: u32,
}

impl SfatHeader {
    pub const WIRE_SIZE: u64 = 12;

    pub fn read(io: &mut dyn IoStream) -> Result<Self> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        read_exact(io, &mut buf)?;
        if buf[0..4] != SFAT_MAGIC {
            return Err(Error::Corrupt("missing SFAT magic"));
        }
        Ok(Self {
            header_size: u16::from_le_bytes([buf[4], buf[5]]),
            node_count: u16::from_le_bytes([buf[6], buf[7]]),
            hash_key: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }

    pub fn write(&self, io: &mut dyn IoStream) -> Result<()> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        buf[0..4].copy_from_slice(&SFAT_MAGIC);
        buf[4..6].copy_from_slice(&self.header_size.to_le_bytes());
        buf[6..8].copy_from_slice(&self.node_count.to_le_bytes());
        buf[8..12].copy_from_slice(&self.hash_key.to_le_bytes());
        write_all(io, &buf)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SfatNode {
    pub filename_hash: u32,
    /// Name offset into the SFNT name block, in 4-byte units.
    pub filename_offset: u16,
    /// Always `0x0100` in practice; marks `filename_offset` as valid.
    pub enable_offset: u16,
    pub file_start_offset: u32,
    pub file_end_offset: u32,
}

impl SfatNode {
    pub const WIRE_SIZE: u64 = 16;

    pub fn read(io: &mut dyn IoStream) -> Result<Self> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        read_exact(io, &mut buf)?;
        Ok(Self {
            filename_hash: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            filename_offset: u16::from_le_bytes([buf[4], buf[5]]),
            enable_offset: u16::from_le_bytes([buf[6], buf[7]]),
            file_start_offset: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            file_end_offset: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    pub fn write(&self, io: &mut dyn IoStream) -> Result<()> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        buf[0..4].copy_from_slice(&self.filename_hash.to_le_bytes());
        buf[4..6].copy_from_slice(&self.filename_offset.to_le_bytes());
        buf[6..8].copy_from_slice(&self.enable_offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.file_start_offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.file_end_offset.to_le_bytes());
        write_all(io, &buf)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SfntHeader {
    pub header_size: u16,
    pub reserved: u16,
}

impl SfntHeader {
    pub const WIRE_SIZE: u64 = 8;

    pub fn read(io: &mut dyn IoStream) -> Result<Self> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        read_exact(io, &mut buf)?;
        if buf[0..4] != SFNT_MAGIC {
            return Err(Error::Corrupt("missing SFNT magic"));
        }
        Ok(Self {
            header_size: u16::from_le_bytes([buf[4], buf[5]]),
            reserved: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }

    pub fn write(&self, io: &mut dyn IoStream) -> Result<()> {
        let mut buf = [0u8; Self::WIRE_SIZE as usize];
        buf[0..4].copy_from_slice(&SFNT_MAGIC);
        buf[4..6].copy_from_slice(&self.header_size.to_le_bytes());
        buf[6..8].copy_from_slice(&self.reserved.to_le_bytes());
        write_all(io, &buf)
    }

    pub fn fresh() -> Self {
        Self {
            header_size: SFNT_HEADER_SIZE,
            reserved: 0,
        }
    }
}

/// A parsed file record, as found directly in the SFAT/SFNT tables.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub start_pos: u64,
    pub size: u64,
}

/// Parse the SFAT/SFNT tables following a [`Header`] already consumed from
/// `io`. Mirrors `archiver_sarc.c`'s `SARC_loadEntries`: the name block's
/// absolute position is computed from `node_count`, then each name is read
/// by walking 4-byte-aligned NUL-terminated strings out of the block
/// already in hand, rather than seeking per name.
pub fn load_entries(
    io: &mut dyn IoStream,
    sfat_header: &SfatHeader,
    data_offset: u32,
) -> Result<Vec<RawEntry>> {
    let count = sfat_header.node_count as usize;

    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        nodes.push(SfatNode::read(io)?);
    }

    let sfnt_header = SfntHeader::read(io)?;
    let _ = sfnt_header;
    let name_block_start = io.tell()?;
    let name_block_len = (data_offset as u64)
        .checked_sub(name_block_start)
        .ok_or(Error::Corrupt("data_offset precedes name table"))?;
    let mut name_block = vec![0u8; name_block_len as usize];
    read_exact(io, &mut name_block)?;

    let mut entries = Vec::with_capacity(count);
    for node in &nodes {
        let name_pos = (node.filename_offset as usize) * 4;
        let name = read_c_string(&name_block, name_pos)?;
        let file_pos = node.file_start_offset as u64 + data_offset as u64;
        let size = node
            .file_end_offset
            .checked_sub(node.file_start_offset)
            .ok_or(Error::Corrupt("file_end precedes file_start"))? as u64;
        entries.push(RawEntry {
            name,
            start_pos: file_pos,
            size,
        });
    }
    Ok(entries)
}

fn read_c_string(buf: &[u8], start: usize) -> Result<String> {
    if start > buf.len() {
        return Err(Error::Corrupt("filename offset past the name table"));
    }
    let end = buf[start..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Corrupt("unterminated filename in SFNT"))?;
    std::str::from_utf8(&buf[start..start + end])
        .map(str::to_string)
        .map_err(|_| Error::Corrupt("non-UTF-8 filename"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryIo;

    fn node(hash: u32, filename_offset: u16, start: u32, end: u32) -> SfatNode {
        SfatNode {
            filename_hash: hash,
            filename_offset,
            enable_offset: 0x0100,
            file_start_offset: start,
            file_end_offset: end,
        }
    }

    #[test]
    fn load_entries_rejects_end_before_start() {
        let sfat_header = SfatHeader {
            header_size: SFAT_HEADER_SIZE,
            node_count: 1,
            hash_key: DEFAULT_HASH_KEY,
        };

        let mut io = MemoryIo::new();
        node(0, 0, 10, 4).write(&mut io).unwrap();
        SfntHeader::fresh().write(&mut io).unwrap();
        write_all(&mut io, b"a\0\0\0").unwrap();
        io.seek(0).unwrap();

        // name block is exactly the 4 bytes just written, starting right
        // after the one SFAT node (16) and the SFNT header (8).
        let data_offset = SfatNode::WIRE_SIZE as u32 + SfntHeader::WIRE_SIZE as u32 + 4;
        let err = load_entries(&mut io, &sfat_header, data_offset).unwrap_err();
        assert!(matches!(err, Error::Corrupt(_)));
    }

    #[test]
    fn read_c_string_rejects_offset_past_name_block() {
        let buf = b"a\0\0\0";
        assert!(read_c_string(buf, 100).is_err());
    }
}

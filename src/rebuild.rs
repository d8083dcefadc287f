//! The rebuild engine (C9 in `spec.md` §4.6): turns the current directory
//! tree back into SARC bytes and writes them into the archive's backing
//! stream.
//!
//! Grounded on `sarc_io.c`'s `rebuild_sarc`. Unlike that version, which
//! seeks back and forth across the live backing stream while it writes
//! (headers first with placeholder sizes, then SFAT/SFNT, then bodies,
//! then patches the header), this builds the whole new image in one
//! contiguous buffer and writes it out in a single pass — equivalent
//! output, no partial-write window if something fails midway.

use crate::archive::Archive;
use crate::error::{Error, Result};
use crate::sarc::format::{Header, SfatHeader, SfatNode, SfntHeader};
use crate::sarc::hash::sarc_hash;

struct Staged {
    name: String,
    hash: u32,
    bytes: Vec<u8>,
}

pub fn rebuild(archive: &mut Archive) -> Result<()> {
    let hash_key = archive.hash_key;

    let mut staged = Vec::new();
    for (path, entry) in archive.tree.iter() {
        if !entry.is_file() {
            continue;
        }
        let bytes = match entry.as_slice() {
            Some(s) => s.to_vec(),
            None => {
                let mut buf = vec![0u8; entry.size() as usize];
                archive.backing.seek(entry.start_pos)?;
                crate::io::read_exact(archive.backing.as_mut(), &mut buf)?;
                buf
            }
        };
        staged.push(Staged {
            name: path.to_string(),
            hash: sarc_hash(path, hash_key),
            bytes,
        });
    }
    staged.sort_by_key(|s| s.hash);
    for pair in staged.windows(2) {
        if pair[0].hash == pair[1].hash {
            return Err(Error::Corrupt("two entries hash to the same value"));
        }
    }

    let node_count = staged.len() as u16;
    let sfat_start = Header::WIRE_SIZE;
    let sfnt_start = sfat_start + SfatHeader::WIRE_SIZE + node_count as u64 * SfatNode::WIRE_SIZE;
    let name_block_start = sfnt_start + SfntHeader::WIRE_SIZE;

    let mut name_block = Vec::new();
    let mut name_offsets = Vec::with_capacity(staged.len());
    for s in &staged {
        name_offsets.push(name_block.len() as u64 / 4);
        name_block.extend_from_slice(s.name.as_bytes());
        name_block.push(0);
        while name_block.len() % 4 != 0 {
            name_block.push(0);
        }
    }

    let data_offset = name_block_start + name_block.len() as u64;

    let mut bodies = Vec::new();
    let mut nodes = Vec::with_capacity(staged.len());
    let mut write_pos = data_offset;
    for (s, name_offset) in staged.iter().zip(name_offsets.iter()) {
        let start = write_pos - data_offset;
        bodies.extend_from_slice(&s.bytes);
        let end = start + s.bytes.len() as u64;
        while bodies.len() % 8 != 0 {
            bodies.push(0);
        }
        write_pos = data_offset + bodies.len() as u64;

        nodes.push(SfatNode {
            filename_hash: s.hash,
            filename_offset: *name_offset as u16,
            enable_offset: 0x0100,
            file_start_offset: start as u32,
            file_end_offset: end as u32,
        });
    }
    let archive_size = write_pos;

    let mut sink = crate::io::MemoryIo::new();

    let header = Header {
        header_size: crate::sarc::format::SARC_HEADER_SIZE,
        byte_order_mark: crate::sarc::format::SARC_LITTLE_ENDIAN,
        archive_size: archive_size as u32,
        data_offset: data_offset as u32,
        version: crate::sarc::format::SARC_VERSION,
        reserved: 0,
    };
    header.write(&mut sink)?;

    let sfat_header = SfatHeader {
        header_size: crate::sarc::format::SFAT_HEADER_SIZE,
        node_count,
        hash_key,
    };
    sfat_header.write(&mut sink)?;
    for node in &nodes {
        node.write(&mut sink)?;
    }

    let sfnt_header = SfntHeader::fresh();
    sfnt_header.write(&mut sink)?;
    crate::io::write_all(&mut sink, &name_block)?;
    crate::io::write_all(&mut sink, &bodies)?;

    let out = sink.to_vec();
    debug_assert_eq!(out.len() as u64, archive_size);

    archive.write_all_to_backing(0, &out)?;
    archive.backing.truncate(archive_size)?;
    Ok(())
}

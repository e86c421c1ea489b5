//! Bag-of-cells wire serialization.
//!
//! The text-facing backends ship whole cell trees as BOC blobs (usually
//! base64): external messages on the way out, get-method results on the way
//! back. Serialization emits the generic single-root form without index or
//! checksum; deserialization accepts the optional index and crc sections.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::cell::{Cell, MAX_REFS};

const BOC_MAGIC: u32 = 0xb5ee9c72;

const FLAG_HAS_IDX: u8 = 0x80;
const FLAG_HAS_CRC: u8 = 0x40;
const FLAG_HAS_CACHE_BITS: u8 = 0x20;

#[derive(Debug, Error)]
pub enum BocError {
    #[error("truncated bag of cells")]
    Truncated,

    #[error("bad bag-of-cells magic")]
    BadMagic,

    #[error("malformed bag of cells: {0}")]
    Malformed(&'static str),
}

/// Serialize a single-root cell tree.
pub fn serialize(root: &Cell) -> Vec<u8> {
    // Topological order: parents strictly before children. A parent is
    // always deeper than any of its children, so depth-descending order of
    // the distinct cells satisfies the reference direction requirement.
    let mut unique: Vec<Cell> = Vec::new();
    let mut seen: HashMap<[u8; 32], usize> = HashMap::new();
    collect(root, &mut unique, &mut seen);
    unique.sort_by(|a, b| b.depth().cmp(&a.depth()));
    let index: HashMap<[u8; 32], usize> = unique
        .iter()
        .enumerate()
        .map(|(i, c)| (c.repr_hash(), i))
        .collect();

    let ref_size = bytes_needed(unique.len() as u64).max(1);
    let mut cells_section = Vec::new();
    for cell in &unique {
        cells_section.push(cell.d1());
        cells_section.push(cell.d2());
        cells_section.extend_from_slice(&cell.data_with_completion_tag());
        for r in cell.refs() {
            let child = index[&r.repr_hash()];
            cells_section.extend_from_slice(&be_bytes(child as u64, ref_size));
        }
    }

    let off_size = bytes_needed(cells_section.len() as u64).max(1);
    let mut out = Vec::with_capacity(cells_section.len() + 32);
    out.extend_from_slice(&BOC_MAGIC.to_be_bytes());
    out.push(ref_size as u8);
    out.push(off_size as u8);
    out.extend_from_slice(&be_bytes(unique.len() as u64, ref_size));
    out.extend_from_slice(&be_bytes(1, ref_size)); // roots
    out.extend_from_slice(&be_bytes(0, ref_size)); // absent
    out.extend_from_slice(&be_bytes(cells_section.len() as u64, off_size));
    out.extend_from_slice(&be_bytes(0, ref_size)); // root index
    out.extend_from_slice(&cells_section);
    out
}

// iterative walk: trees can chain far deeper than the thread stack
fn collect(root: &Cell, unique: &mut Vec<Cell>, seen: &mut HashMap<[u8; 32], usize>) {
    let mut pending = vec![root.clone()];
    while let Some(cell) = pending.pop() {
        let hash = cell.repr_hash();
        if seen.contains_key(&hash) {
            continue;
        }
        seen.insert(hash, unique.len());
        for r in cell.refs() {
            pending.push(r.as_ref().clone());
        }
        unique.push(cell);
    }
}

fn bytes_needed(value: u64) -> usize {
    let mut n = 0;
    let mut v = value;
    while v > 0 {
        n += 1;
        v >>= 8;
    }
    n
}

fn be_bytes(value: u64, len: usize) -> Vec<u8> {
    value.to_be_bytes()[8 - len..].to_vec()
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], BocError> {
        if self.pos + len > self.data.len() {
            return Err(BocError::Truncated);
        }
        let out = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn take_uint(&mut self, len: usize) -> Result<u64, BocError> {
        let bytes = self.take(len)?;
        Ok(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
    }
}

/// Deserialize a bag of cells and return its (single) root.
pub fn deserialize(data: &[u8]) -> Result<Cell, BocError> {
    let mut r = Reader { data, pos: 0 };
    if r.take_uint(4)? as u32 != BOC_MAGIC {
        return Err(BocError::BadMagic);
    }
    let b1 = r.take_uint(1)? as u8;
    if b1 & FLAG_HAS_CACHE_BITS != 0 {
        return Err(BocError::Malformed("cache bits are not supported"));
    }
    let has_idx = b1 & FLAG_HAS_IDX != 0;
    let has_crc = b1 & FLAG_HAS_CRC != 0;
    let ref_size = (b1 & 0x07) as usize;
    if ref_size == 0 || ref_size > 4 {
        return Err(BocError::Malformed("bad reference size"));
    }
    let off_size = r.take_uint(1)? as usize;
    if off_size == 0 || off_size > 8 {
        return Err(BocError::Malformed("bad offset size"));
    }

    let cell_count = r.take_uint(ref_size)? as usize;
    let root_count = r.take_uint(ref_size)? as usize;
    let absent_count = r.take_uint(ref_size)? as usize;
    if root_count != 1 || absent_count != 0 {
        return Err(BocError::Malformed("expected exactly one root"));
    }
    let _tot_cells_size = r.take_uint(off_size)?;
    let root_idx = r.take_uint(ref_size)? as usize;
    if root_idx >= cell_count {
        return Err(BocError::Malformed("root index out of range"));
    }
    if has_idx {
        r.take(cell_count * off_size)?;
    }

    struct RawCell {
        data: Vec<u8>,
        bit_len: usize,
        refs: Vec<usize>,
    }

    let mut raw: Vec<RawCell> = Vec::with_capacity(cell_count);
    for i in 0..cell_count {
        let d1 = r.take_uint(1)? as u8;
        if d1 & 0x08 != 0 {
            return Err(BocError::Malformed("exotic cells are not supported"));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_REFS {
            return Err(BocError::Malformed("too many references"));
        }
        let d2 = r.take_uint(1)? as usize;
        let byte_len = (d2 + 1) / 2;
        let mut bytes = r.take(byte_len)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            byte_len * 8
        } else {
            let last = *bytes
                .last()
                .ok_or(BocError::Malformed("empty padded cell"))?;
            if last == 0 {
                return Err(BocError::Malformed("missing completion tag"));
            }
            let tz = last.trailing_zeros() as usize;
            // clear the completion tag so stored data holds pure payload bits
            bytes[byte_len - 1] = last & !(1 << tz);
            (byte_len - 1) * 8 + (7 - tz)
        };
        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let idx = r.take_uint(ref_size)? as usize;
            if idx <= i || idx >= cell_count {
                return Err(BocError::Malformed("reference does not point forward"));
            }
            refs.push(idx);
        }
        raw.push(RawCell {
            data: bytes,
            bit_len,
            refs,
        });
    }
    if has_crc {
        r.take(4)?;
    }

    // children have larger indices; build back to front
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for i in (0..cell_count).rev() {
        let rc = &raw[i];
        let refs = rc
            .refs
            .iter()
            .map(|&idx| {
                built[idx]
                    .clone()
                    .ok_or(BocError::Malformed("reference to an unbuilt cell"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        built[i] = Some(Arc::new(Cell::from_parts(
            rc.data.clone(),
            rc.bit_len,
            refs,
        )));
    }

    let root = built[root_idx]
        .take()
        .ok_or(BocError::Malformed("root cell missing"))?;
    Ok(Arc::try_unwrap(root).unwrap_or_else(|arc| arc.as_ref().clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn roundtrip_flat_cell() {
        let cell = CellBuilder::new().store_uint(0xdead, 17).unwrap().build();
        let parsed = deserialize(&serialize(&cell)).unwrap();
        assert_eq!(parsed, cell);
        assert_eq!(parsed.repr_hash(), cell.repr_hash());
    }

    #[test]
    fn roundtrip_tree_with_shared_child() {
        let shared = CellBuilder::new().store_uint(7, 8).unwrap().build();
        let left = CellBuilder::new()
            .store_uint(1, 8)
            .unwrap()
            .store_ref(shared.clone())
            .unwrap()
            .build();
        let right = CellBuilder::new()
            .store_uint(2, 8)
            .unwrap()
            .store_ref(shared)
            .unwrap()
            .build();
        let root = CellBuilder::new()
            .store_ref(left)
            .unwrap()
            .store_ref(right)
            .unwrap()
            .build();
        let parsed = deserialize(&serialize(&root)).unwrap();
        assert_eq!(parsed.repr_hash(), root.repr_hash());
    }

    #[test]
    fn deep_chain_roundtrip() {
        let mut cell = Cell::empty();
        for i in 0..10_000u32 {
            cell = CellBuilder::new()
                .store_uint(u128::from(i), 32)
                .unwrap()
                .store_ref(cell)
                .unwrap()
                .build();
        }
        let parsed = deserialize(&serialize(&cell)).unwrap();
        assert_eq!(parsed.repr_hash(), cell.repr_hash());
    }

    #[test]
    fn roundtrip_empty_cell() {
        let parsed = deserialize(&serialize(&Cell::empty())).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn bad_magic_rejected() {
        assert!(matches!(deserialize(&[0u8; 16]), Err(BocError::BadMagic)));
    }

    #[test]
    fn truncated_rejected() {
        let bytes = serialize(&CellBuilder::new().store_uint(5, 32).unwrap().build());
        assert!(deserialize(&bytes[..bytes.len() - 2]).is_err());
    }
}

//! Bag-of-cells data model.
//!
//! TON messages, contract data, and get-method arguments are all trees of
//! cells: up to 1023 data bits and four references per node. `CellBuilder`
//! writes bits most-significant first, `CellSlice` reads them back, and
//! `Cell::repr_hash` produces the canonical representation hash used as the
//! identifier for submitted transfer bodies.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::address::Address;

/// Maximum number of data bits in a single cell.
pub const MAX_BITS: usize = 1023;
/// Maximum number of child references in a single cell.
pub const MAX_REFS: usize = 4;

#[derive(Debug, Error)]
pub enum CellError {
    #[error("cell data overflow: {have} + {add} bits exceeds {MAX_BITS}")]
    DataOverflow { have: usize, add: usize },

    #[error("cell reference overflow: a cell holds at most {MAX_REFS} references")]
    RefOverflow,

    #[error("value {value} does not fit into {bits} bits")]
    ValueOutOfRange { value: u128, bits: usize },

    #[error("read past the end of a cell slice")]
    SliceUnderflow,

    #[error("unsupported cell content: {0}")]
    Unsupported(&'static str),
}

/// An immutable tree node of up to [`MAX_BITS`] bits and [`MAX_REFS`] children.
///
/// Depth and the representation hash are computed once at construction, so
/// both are O(1) reads regardless of how deep the tree is.
#[derive(Clone)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    depth: u16,
    hash: [u8; 32],
}

impl Cell {
    /// The empty cell: no data bits, no references.
    pub fn empty() -> Self {
        Cell::seal(Vec::new(), 0, Vec::new())
    }

    pub(crate) fn from_parts(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_BITS);
        debug_assert!(refs.len() <= MAX_REFS);
        debug_assert!(data.len() == (bit_len + 7) / 8);
        Cell::seal(data, bit_len, refs)
    }

    /// Finish construction: children already carry their depth and hash, so
    /// neither computation walks the tree.
    fn seal(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        let mut cell = Cell {
            data,
            bit_len,
            refs,
            depth: 0,
            hash: [0; 32],
        };
        cell.depth = cell.refs.iter().map(|r| r.depth + 1).max().unwrap_or(0);
        let mut hasher = Sha256::new();
        hasher.update([cell.d1(), cell.d2()]);
        hasher.update(cell.data_with_completion_tag());
        for r in &cell.refs {
            hasher.update(r.depth.to_be_bytes());
        }
        for r in &cell.refs {
            hasher.update(r.hash);
        }
        cell.hash = hasher.finalize().into();
        cell
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Raw data bytes; bits beyond `bit_len` in the last byte are zero.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    fn bit(&self, idx: usize) -> bool {
        self.data[idx / 8] & (0x80 >> (idx % 8)) != 0
    }

    /// Tree depth: 0 for a leaf, `1 + max(children)` otherwise.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// First descriptor byte: the reference count (ordinary, level-0 cells).
    pub(crate) fn d1(&self) -> u8 {
        self.refs.len() as u8
    }

    /// Second descriptor byte: `floor(bits/8) + ceil(bits/8)`. An odd value
    /// signals that the last byte carries a completion tag.
    pub(crate) fn d2(&self) -> u8 {
        (self.bit_len / 8 + (self.bit_len + 7) / 8) as u8
    }

    /// Data bytes with the completion tag applied when `bit_len` is not a
    /// whole number of bytes.
    pub(crate) fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.bit_len % 8 != 0 {
            let idx = self.bit_len;
            out[idx / 8] |= 0x80 >> (idx % 8);
        }
        out
    }

    /// The standard representation hash of the cell tree.
    pub fn repr_hash(&self) -> [u8; 32] {
        self.hash
    }

    /// Start reading the cell from the beginning.
    pub fn begin_parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }
}

/// The representation hash is the canonical identity of a cell tree.
impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

/// Reference chains coming off the wire can nest arbitrarily deep; drop
/// must unwind them without recursing.
impl Drop for Cell {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.refs);
        while let Some(child) = pending.pop() {
            if let Ok(mut cell) = Arc::try_unwrap(child) {
                pending.append(&mut cell.refs);
            }
        }
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell{{{} bits, {} refs, {}}}",
            self.bit_len,
            self.refs.len(),
            hex::encode(&self.data)
        )
    }
}

/// Write-side counterpart of [`Cell`]. Methods consume and return the
/// builder so stores chain with `?`.
#[derive(Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_capacity(&self, add: usize) -> Result<(), CellError> {
        if self.bit_len + add > MAX_BITS {
            return Err(CellError::DataOverflow {
                have: self.bit_len,
                add,
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len;
            self.data[idx / 8] |= 0x80 >> (idx % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(mut self, bit: bool) -> Result<Self, CellError> {
        self.ensure_capacity(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store `value` as a big-endian unsigned integer of exactly `bits` bits
    /// (at most 128).
    pub fn store_uint(mut self, value: u128, bits: usize) -> Result<Self, CellError> {
        if bits > 128 {
            return Err(CellError::Unsupported("uint wider than 128 bits"));
        }
        if bits < 128 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange { value, bits });
        }
        self.ensure_capacity(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_bytes(mut self, bytes: &[u8]) -> Result<Self, CellError> {
        self.ensure_capacity(bytes.len() * 8)?;
        for &b in bytes {
            for i in (0..8).rev() {
                self.push_bit((b >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// Variable-length coin amount: a 4-bit byte length followed by the value.
    pub fn store_coins(self, value: u128) -> Result<Self, CellError> {
        if value == 0 {
            return self.store_uint(0, 4);
        }
        let byte_len = ((128 - value.leading_zeros() as usize) + 7) / 8;
        self.store_uint(byte_len as u128, 4)?
            .store_uint(value, byte_len * 8)
    }

    /// `addr_std` for `Some`, `addr_none` for `None`. Anycast is never written.
    pub fn store_address(self, address: Option<&Address>) -> Result<Self, CellError> {
        match address {
            None => self.store_uint(0, 2),
            Some(a) => self
                .store_uint(0b100, 3)?
                .store_uint(a.workchain as i8 as u8 as u128, 8)?
                .store_bytes(&a.hash_part),
        }
    }

    /// Append the data bits and references of another cell inline.
    pub fn store_cell(mut self, cell: &Cell) -> Result<Self, CellError> {
        self.ensure_capacity(cell.bit_len())?;
        if self.refs.len() + cell.refs().len() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        for i in 0..cell.bit_len() {
            self.push_bit(cell.bit(i));
        }
        self.refs.extend(cell.refs().iter().cloned());
        Ok(self)
    }

    pub fn store_ref(mut self, cell: Cell) -> Result<Self, CellError> {
        if self.refs.len() == MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(Arc::new(cell));
        Ok(self)
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn build(self) -> Cell {
        Cell::seal(self.data, self.bit_len, self.refs)
    }
}

/// Read cursor over a cell's data bits and references.
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        if self.remaining_bits() < 1 {
            return Err(CellError::SliceUnderflow);
        }
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128, CellError> {
        if bits > 128 || self.remaining_bits() < bits {
            return Err(CellError::SliceUnderflow);
        }
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u128;
        }
        Ok(value)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    pub fn load_coins(&mut self) -> Result<u128, CellError> {
        let byte_len = self.load_uint(4)? as usize;
        if byte_len == 0 {
            return Ok(0);
        }
        self.load_uint(byte_len * 8)
    }

    pub fn load_address(&mut self) -> Result<Option<Address>, CellError> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(CellError::Unsupported("anycast address"));
                }
                let workchain = self.load_uint(8)? as u8 as i8 as i32;
                let bytes = self.load_bytes(32)?;
                let mut hash_part = [0u8; 32];
                hash_part.copy_from_slice(&bytes);
                Ok(Some(Address::new(workchain, hash_part)))
            }
            _ => Err(CellError::Unsupported("non-standard address kind")),
        }
    }

    pub fn load_ref(&mut self) -> Result<&'a Arc<Cell>, CellError> {
        let r = self
            .cell
            .refs()
            .get(self.ref_pos)
            .ok_or(CellError::SliceUnderflow)?;
        self.ref_pos += 1;
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_roundtrip() {
        let cell = CellBuilder::new()
            .store_uint(0x0f8a7ea5, 32)
            .unwrap()
            .store_uint(0, 64)
            .unwrap()
            .store_uint(12345, 17)
            .unwrap()
            .build();
        let mut s = cell.begin_parse();
        assert_eq!(s.load_uint(32).unwrap(), 0x0f8a7ea5);
        assert_eq!(s.load_uint(64).unwrap(), 0);
        assert_eq!(s.load_uint(17).unwrap(), 12345);
        assert_eq!(s.remaining_bits(), 0);
    }

    #[test]
    fn uint_width_checked() {
        assert!(matches!(
            CellBuilder::new().store_uint(256, 8),
            Err(CellError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn uint_wider_than_128_bits_rejected() {
        assert!(matches!(
            CellBuilder::new().store_uint(0, 129),
            Err(CellError::Unsupported(_))
        ));
    }

    #[test]
    fn coins_roundtrip() {
        for value in [0u128, 1, 255, 256, 100_000_000, u128::from(u64::MAX) * 7] {
            let cell = CellBuilder::new().store_coins(value).unwrap().build();
            assert_eq!(cell.begin_parse().load_coins().unwrap(), value);
        }
    }

    #[test]
    fn address_roundtrip() {
        let addr = Address::new(-1, [0xab; 32]);
        let cell = CellBuilder::new()
            .store_address(Some(&addr))
            .unwrap()
            .store_address(None)
            .unwrap()
            .build();
        let mut s = cell.begin_parse();
        assert_eq!(s.load_address().unwrap(), Some(addr));
        assert_eq!(s.load_address().unwrap(), None);
    }

    #[test]
    fn overflow_rejected() {
        let builder = CellBuilder::new().store_bytes(&[0u8; 127]).unwrap();
        assert!(matches!(
            builder.store_uint(0, 8),
            Err(CellError::DataOverflow { .. })
        ));

        let mut builder = CellBuilder::new();
        for _ in 0..MAX_REFS {
            builder = builder.store_ref(Cell::empty()).unwrap();
        }
        assert!(matches!(
            builder.store_ref(Cell::empty()),
            Err(CellError::RefOverflow)
        ));
    }

    #[test]
    fn repr_hash_is_stable_and_structural() {
        let a = CellBuilder::new()
            .store_uint(7, 16)
            .unwrap()
            .store_ref(Cell::empty())
            .unwrap()
            .build();
        let b = CellBuilder::new()
            .store_uint(7, 16)
            .unwrap()
            .store_ref(Cell::empty())
            .unwrap()
            .build();
        assert_eq!(a.repr_hash(), b.repr_hash());

        let c = CellBuilder::new().store_uint(8, 16).unwrap().build();
        assert_ne!(a.repr_hash(), c.repr_hash());
    }

    #[test]
    fn store_cell_appends_bits_and_refs() {
        let inner = CellBuilder::new()
            .store_uint(0xff, 8)
            .unwrap()
            .store_ref(Cell::empty())
            .unwrap()
            .build();
        let outer = CellBuilder::new()
            .store_uint(1, 4)
            .unwrap()
            .store_cell(&inner)
            .unwrap()
            .build();
        assert_eq!(outer.bit_len(), 12);
        assert_eq!(outer.refs().len(), 1);
        let mut s = outer.begin_parse();
        assert_eq!(s.load_uint(12).unwrap(), 0x1ff);
    }

    #[test]
    fn depth_counts_levels() {
        let leaf = Cell::empty();
        let mid = CellBuilder::new().store_ref(leaf).unwrap().build();
        let root = CellBuilder::new().store_ref(mid).unwrap().build();
        assert_eq!(root.depth(), 2);
    }

    #[test]
    fn deep_chains_build_and_drop() {
        let mut cell = Cell::empty();
        for _ in 0..10_000 {
            cell = CellBuilder::new().store_ref(cell).unwrap().build();
        }
        assert_eq!(cell.depth(), 10_000);
    }
}

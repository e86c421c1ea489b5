//! TVM stack values for get-method calls.
//!
//! Structured backends pass these around as-is; the lite-server backend
//! wants the whole stack packed into a single cell (and answers in kind),
//! so [`pack_stack`] / [`unpack_stack`] implement the stack-cell layout:
//! a 24-bit depth followed by a linked list of tagged values.

use std::collections::VecDeque;

use crate::cell::{Cell, CellBuilder, CellError, CellSlice};
use crate::error::WalletError;
use crate::Address;

/// A single value on the TVM stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleItem {
    Null,
    Int(i128),
    Cell(Cell),
    Slice(Cell),
}

/// Reader over a get-method result stack, consumed front to back.
///
/// An empty reader is a legitimate "nothing to read" outcome, produced when
/// a backend returns no result at all.
#[derive(Debug, Default)]
pub struct TupleReader {
    items: VecDeque<TupleItem>,
}

impl TupleReader {
    pub fn new(items: Vec<TupleItem>) -> Self {
        TupleReader {
            items: items.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn pop(&mut self) -> Option<TupleItem> {
        self.items.pop_front()
    }

    fn next(&mut self, expected: &'static str) -> Result<TupleItem, WalletError> {
        self.items.pop_front().ok_or_else(|| {
            WalletError::UnexpectedReply(format!("expected {expected}, stack exhausted"))
        })
    }

    pub fn read_int(&mut self) -> Result<i128, WalletError> {
        match self.next("integer")? {
            TupleItem::Int(i) => Ok(i),
            other => Err(WalletError::UnexpectedReply(format!(
                "expected integer, got {other:?}"
            ))),
        }
    }

    pub fn read_uint(&mut self) -> Result<u128, WalletError> {
        let i = self.read_int()?;
        u128::try_from(i).map_err(|_| {
            WalletError::UnexpectedReply(format!("expected unsigned integer, got {i}"))
        })
    }

    pub fn read_cell(&mut self) -> Result<Cell, WalletError> {
        match self.next("cell")? {
            TupleItem::Cell(c) | TupleItem::Slice(c) => Ok(c),
            other => Err(WalletError::UnexpectedReply(format!(
                "expected cell, got {other:?}"
            ))),
        }
    }

    /// Read a slice value holding a single standard address.
    pub fn read_address(&mut self) -> Result<Address, WalletError> {
        let cell = self.read_cell()?;
        let addr = cell
            .begin_parse()
            .load_address()
            .map_err(|e| WalletError::UnexpectedReply(format!("bad address slice: {e}")))?;
        addr.ok_or_else(|| {
            WalletError::UnexpectedReply("expected an address, got addr_none".into())
        })
    }
}

const TAG_NULL: u128 = 0x00;
const TAG_TINYINT: u128 = 0x01;
const TAG_INT_PREFIX: u128 = 0x02;
const TAG_CELL: u128 = 0x03;
const TAG_SLICE: u128 = 0x04;

/// Pack a stack (bottom first) into its cell representation.
pub fn pack_stack(items: &[TupleItem]) -> Result<Cell, CellError> {
    let mut root = CellBuilder::new().store_uint(items.len() as u128, 24)?;
    if let Some((top, rest)) = items.split_last() {
        root = root.store_ref(pack_list(rest)?)?;
        root = store_value(root, top)?;
    }
    Ok(root.build())
}

fn pack_list(items: &[TupleItem]) -> Result<Cell, CellError> {
    let mut list = Cell::empty();
    for item in items {
        let builder = CellBuilder::new().store_ref(list)?;
        list = store_value(builder, item)?.build();
    }
    Ok(list)
}

fn store_value(builder: CellBuilder, item: &TupleItem) -> Result<CellBuilder, CellError> {
    match item {
        TupleItem::Null => builder.store_uint(TAG_NULL, 8),
        TupleItem::Int(i) => {
            if i64::try_from(*i).is_ok() {
                builder
                    .store_uint(TAG_TINYINT, 8)?
                    .store_uint(*i as i64 as u64 as u128, 64)
            } else {
                // int257: 15-bit tag, then a 257-bit signed big-endian value
                // written as 129 sign bits plus the 128-bit two's complement.
                let sign = *i < 0;
                let sign_word = if sign { u64::MAX as u128 } else { 0 };
                builder
                    .store_uint(0x0100, 15)?
                    .store_bit(sign)?
                    .store_uint(sign_word, 64)?
                    .store_uint(sign_word, 64)?
                    .store_uint(*i as u128, 128)
            }
        }
        TupleItem::Cell(c) => builder.store_uint(TAG_CELL, 8)?.store_ref(c.clone()),
        TupleItem::Slice(c) => builder
            .store_uint(TAG_SLICE, 8)?
            .store_ref(c.clone())?
            .store_uint(0, 10)?
            .store_uint(c.bit_len() as u128, 10)?
            .store_uint(0, 3)?
            .store_uint(c.refs().len() as u128, 3),
    }
}

/// Unpack a stack cell into values, bottom first.
///
/// The claimed depth and the list chain both come from the backend, so the
/// walk is iterative and the result buffer grows as values actually parse.
pub fn unpack_stack(cell: &Cell) -> Result<Vec<TupleItem>, CellError> {
    let mut slice = cell.begin_parse();
    let depth = slice.load_uint(24)? as usize;
    if depth == 0 {
        return Ok(Vec::new());
    }
    let mut items = Vec::with_capacity(depth.min(1024));
    let mut rest = slice.load_ref()?.clone();
    items.push(load_value(&mut slice)?);
    for _ in 1..depth {
        let node = rest;
        let mut slice = node.begin_parse();
        rest = slice.load_ref()?.clone();
        items.push(load_value(&mut slice)?);
    }
    items.reverse();
    Ok(items)
}

fn load_value(slice: &mut CellSlice<'_>) -> Result<TupleItem, CellError> {
    match slice.load_uint(8)? {
        TAG_NULL => Ok(TupleItem::Null),
        TAG_TINYINT => Ok(TupleItem::Int(slice.load_uint(64)? as u64 as i64 as i128)),
        TAG_INT_PREFIX => {
            let low = slice.load_uint(7)?;
            if low == 0x7f {
                return Err(CellError::Unsupported("nan stack value"));
            }
            if low != 0 {
                return Err(CellError::Unsupported("unknown stack value tag"));
            }
            // 257-bit signed: 129 sign bits, then the 128-bit value.
            let sign = slice.load_bit()?;
            let hi = slice.load_uint(64)?;
            let mid = slice.load_uint(64)?;
            let value = slice.load_uint(128)?;
            let sign_word = if sign { u64::MAX as u128 } else { 0 };
            if hi != sign_word || mid != sign_word {
                return Err(CellError::Unsupported("integer wider than 128 bits"));
            }
            Ok(TupleItem::Int(value as i128))
        }
        TAG_CELL => Ok(TupleItem::Cell(slice.load_ref()?.as_ref().clone())),
        TAG_SLICE => {
            let cell = slice.load_ref()?.as_ref().clone();
            let _st_bits = slice.load_uint(10)?;
            let _end_bits = slice.load_uint(10)?;
            let _st_ref = slice.load_uint(3)?;
            let _end_ref = slice.load_uint(3)?;
            Ok(TupleItem::Slice(cell))
        }
        _ => Err(CellError::Unsupported("unknown stack value tag")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_roundtrip() {
        let cell = pack_stack(&[]).unwrap();
        assert_eq!(unpack_stack(&cell).unwrap(), vec![]);
    }

    #[test]
    fn mixed_stack_roundtrip() {
        let payload = CellBuilder::new().store_uint(42, 32).unwrap().build();
        let items = vec![
            TupleItem::Int(0),
            TupleItem::Null,
            TupleItem::Int(-7),
            TupleItem::Slice(payload.clone()),
            TupleItem::Cell(payload),
            TupleItem::Int(i128::from(u64::MAX) * 3),
        ];
        let cell = pack_stack(&items).unwrap();
        assert_eq!(unpack_stack(&cell).unwrap(), items);
    }

    #[test]
    fn deep_stack_roundtrip() {
        let items: Vec<TupleItem> = (0..10_000i128).map(TupleItem::Int).collect();
        let cell = pack_stack(&items).unwrap();
        assert_eq!(unpack_stack(&cell).unwrap(), items);
    }

    #[test]
    fn wide_negative_int_roundtrip() {
        let items = vec![TupleItem::Int(-(i128::from(u64::MAX) * 11))];
        let cell = pack_stack(&items).unwrap();
        assert_eq!(unpack_stack(&cell).unwrap(), items);
    }

    #[test]
    fn reader_on_empty_stack() {
        let mut reader = TupleReader::empty();
        assert!(reader.is_empty());
        assert!(matches!(
            reader.read_int(),
            Err(WalletError::UnexpectedReply(_))
        ));
    }

    #[test]
    fn reader_reads_address_from_slice() {
        let addr = Address::new(0, [0x5a; 32]);
        let slice = CellBuilder::new()
            .store_address(Some(&addr))
            .unwrap()
            .build();
        let mut reader = TupleReader::new(vec![TupleItem::Slice(slice)]);
        assert_eq!(reader.read_address().unwrap(), addr);
    }

    #[test]
    fn reader_rejects_negative_uint() {
        let mut reader = TupleReader::new(vec![TupleItem::Int(-1)]);
        assert!(matches!(
            reader.read_uint(),
            Err(WalletError::UnexpectedReply(_))
        ));
    }
}

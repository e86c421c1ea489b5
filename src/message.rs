//! Message construction.
//!
//! Internal transfers, the external envelope the backends accept, contract
//! state-init, and the standard jetton transfer body all assemble here. The
//! layouts follow the chain's message TL-B schemes bit for bit; everything
//! is deterministic so message hashes double as client-side tracking ids.

use crate::address::Address;
use crate::cell::{Cell, CellBuilder, CellError};

/// Opcode of the standard jetton transfer (TEP-74).
pub const JETTON_TRANSFER_OPCODE: u32 = 0x0f8a7ea5;

/// Sender pays forwarding fees from its own balance.
pub const SEND_MODE_PAY_GAS_SEPARATELY: u8 = 1;

/// Code and data of a contract that may not be deployed yet.
#[derive(Debug, Clone)]
pub struct StateInit {
    pub code: Cell,
    pub data: Cell,
}

impl StateInit {
    /// `_ split_depth:(Maybe ..) special:(Maybe ..) code:(Maybe ^Cell)
    /// data:(Maybe ^Cell) library:(Maybe ..)`, with only code and data set.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        Ok(CellBuilder::new()
            .store_bit(false)? // split_depth
            .store_bit(false)? // special
            .store_bit(true)?
            .store_ref(self.code.clone())?
            .store_bit(true)?
            .store_ref(self.data.clone())?
            .store_bit(false)? // library
            .build())
    }

    /// The address a contract with this init deploys to.
    pub fn address(&self, workchain: i32) -> Result<Address, CellError> {
        Ok(Address::new(workchain, self.to_cell()?.repr_hash()))
    }
}

/// An internal message, one entry of a signed transfer order.
#[derive(Debug, Clone)]
pub struct TransferMessage {
    pub dest: Address,
    pub value: u128,
    pub bounce: bool,
    pub body: Cell,
    pub init: Option<StateInit>,
}

impl TransferMessage {
    pub fn new(dest: Address, value: u128, bounce: bool) -> Self {
        TransferMessage {
            dest,
            value,
            bounce,
            body: Cell::empty(),
            init: None,
        }
    }

    pub fn with_body(mut self, body: Cell) -> Self {
        self.body = body;
        self
    }

    pub fn with_init(mut self, init: StateInit) -> Self {
        self.init = Some(init);
        self
    }

    /// Hash of the message body, usable as a client-side tracking id.
    pub fn body_hash(&self) -> [u8; 32] {
        self.body.repr_hash()
    }

    /// `int_msg_info$0` with zeroed fees and logical time; the chain fills
    /// those in. An empty body is stored inline, anything else in a ref.
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new()
            .store_bit(false)? // int_msg_info$0
            .store_bit(true)? // ihr_disabled
            .store_bit(self.bounce)?
            .store_bit(false)? // bounced
            .store_address(None)? // src, filled by the chain
            .store_address(Some(&self.dest))?
            .store_coins(self.value)?
            .store_bit(false)? // no extra currencies
            .store_coins(0)? // ihr_fee
            .store_coins(0)? // fwd_fee
            .store_uint(0, 64)? // created_lt
            .store_uint(0, 32)?; // created_at
        b = match &self.init {
            None => b.store_bit(false)?,
            Some(init) => b.store_bit(true)?.store_bit(true)?.store_ref(init.to_cell()?)?,
        };
        b = if self.body.is_empty() {
            b.store_bit(false)?
        } else {
            b.store_bit(true)?.store_ref(self.body.clone())?
        };
        Ok(b.build())
    }
}

/// The external envelope submitted to a backend: `ext_in_msg_info$10`.
#[derive(Debug, Clone)]
pub struct ExternalMessage {
    pub dest: Address,
    pub init: Option<StateInit>,
    pub body: Cell,
}

impl ExternalMessage {
    pub fn to_cell(&self) -> Result<Cell, CellError> {
        let mut b = CellBuilder::new()
            .store_uint(0b10, 2)? // ext_in_msg_info$10
            .store_address(None)? // src
            .store_address(Some(&self.dest))?
            .store_coins(0)?; // import fee
        b = match &self.init {
            None => b.store_bit(false)?,
            Some(init) => b.store_bit(true)?.store_bit(true)?.store_ref(init.to_cell()?)?,
        };
        Ok(b.store_bit(true)?.store_ref(self.body.clone())?.build())
    }
}

/// Build a TEP-74 jetton transfer body.
///
/// No custom payload and no forward payload; `forward_amount` is the tiny
/// notification value the receiving wallet forwards to its owner.
pub fn jetton_transfer_body(
    to: &Address,
    amount: u128,
    forward_amount: u128,
) -> Result<Cell, CellError> {
    Ok(CellBuilder::new()
        .store_uint(JETTON_TRANSFER_OPCODE as u128, 32)?
        .store_uint(0, 64)? // query id
        .store_coins(amount)?
        .store_address(Some(to))? // destination owner
        .store_address(Some(to))? // response destination
        .store_bit(false)? // no custom payload
        .store_coins(forward_amount)?
        .store_bit(false)? // forward payload inline, empty
        .build())
}

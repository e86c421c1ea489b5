//! Backend transport traits.
//!
//! Three transport families cover the node APIs in the wild: the plain HTTP
//! API answering against its own latest state, the v4-style HTTP API that
//! scopes every query to an explicit block, and the binary lite-server
//! protocol that additionally talks in raw stack cells. Transports return
//! `anyhow::Result`; classification into wallet errors happens one layer up.

use crate::address::Address;
use crate::cell::Cell;
use crate::tuple::TupleItem;

/// A masterchain block reference used to scope queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub seqno: u32,
    pub root_hash: [u8; 32],
    pub file_hash: [u8; 32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// Never seen by the chain.
    Nonexistent,
    /// Holds balance but no code.
    Uninitialized,
    Frozen,
    Active,
}

/// Account snapshot as the structured HTTP APIs report it.
#[derive(Debug, Clone, Copy)]
pub struct RawAccountState {
    pub status: AccountStatus,
    pub balance: u128,
}

/// Account snapshot as the lite protocol reports it: absent entirely when
/// the account does not exist.
#[derive(Debug, Clone, Copy)]
pub struct RawLiteAccount {
    pub state: Option<RawAccountState>,
}

/// Result of a get-method execution.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub exit_code: i32,
    pub stack: Vec<TupleItem>,
}

/// Plain HTTP API: every query answers against the node's latest state.
#[allow(async_fn_in_trait)]
pub trait HttpTransport {
    async fn account_state(&self, address: &Address) -> anyhow::Result<RawAccountState>;

    async fn run_method(
        &self,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> anyhow::Result<RunResult>;

    async fn send_message(&self, boc: &[u8]) -> anyhow::Result<()>;
}

/// Block-scoped HTTP API: callers obtain a block reference first and pin
/// each query to it.
#[allow(async_fn_in_trait)]
pub trait HttpV4Transport {
    async fn last_block(&self) -> anyhow::Result<BlockRef>;

    async fn account_state(
        &self,
        block: &BlockRef,
        address: &Address,
    ) -> anyhow::Result<RawAccountState>;

    async fn run_method(
        &self,
        block: &BlockRef,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> anyhow::Result<RunResult>;

    async fn send_message(&self, boc: &[u8]) -> anyhow::Result<()>;
}

/// Binary lite-server protocol: block-scoped like v4, but get-method stacks
/// travel as packed cells and a missing result is a legitimate answer.
#[allow(async_fn_in_trait)]
pub trait LiteTransport {
    async fn masterchain_info(&self) -> anyhow::Result<BlockRef>;

    async fn account_state(
        &self,
        block: &BlockRef,
        address: &Address,
    ) -> anyhow::Result<RawLiteAccount>;

    async fn run_method(
        &self,
        block: &BlockRef,
        address: &Address,
        method: &str,
        stack: Cell,
    ) -> anyhow::Result<Option<Cell>>;

    async fn send_message(&self, boc: &[u8]) -> anyhow::Result<()>;
}

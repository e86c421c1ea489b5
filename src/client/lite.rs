//! Adapter over the binary lite-server protocol.
//!
//! The lite protocol differs from the HTTP APIs in two ways: an account the
//! chain has never seen comes back with no state at all, and get-method
//! stacks travel as packed cells in both directions. A missing result cell
//! maps to an empty reader, not an error.

use tracing::debug;

use super::transport::LiteTransport;
use super::{state_of, ContractClient, ContractState};
use crate::address::Address;
use crate::boc;
use crate::cell::Cell;
use crate::error::Result;
use crate::tuple::{pack_stack, unpack_stack, TupleItem, TupleReader};

/// [`ContractClient`] over a lite-server transport.
pub struct LiteBackend<T> {
    transport: T,
}

impl<T: LiteTransport> LiteBackend<T> {
    pub fn new(transport: T) -> Self {
        LiteBackend { transport }
    }
}

impl<T: LiteTransport> ContractClient for LiteBackend<T> {
    async fn is_deployed(&self, address: &Address) -> Result<bool> {
        Ok(self.get_state(address).await?.active)
    }

    async fn get_state(&self, address: &Address) -> Result<ContractState> {
        let block = self.transport.masterchain_info().await?;
        let account = self.transport.account_state(&block, address).await?;
        Ok(match account.state {
            None => ContractState::ABSENT,
            Some(state) => state_of(state.status),
        })
    }

    async fn balance(&self, address: &Address) -> Result<u128> {
        let block = self.transport.masterchain_info().await?;
        let account = self.transport.account_state(&block, address).await?;
        Ok(account.state.map(|s| s.balance).unwrap_or(0))
    }

    async fn run_method(
        &self,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> Result<TupleReader> {
        let block = self.transport.masterchain_info().await?;
        debug!(%address, method, block = block.seqno, "running get method");
        let stack = pack_stack(&args)?;
        let result = self
            .transport
            .run_method(&block, address, method, stack)
            .await?;
        match result {
            None => Ok(TupleReader::empty()),
            Some(cell) => Ok(TupleReader::new(unpack_stack(&cell)?)),
        }
    }

    async fn send_message(&self, message: &Cell) -> Result<()> {
        let packed = boc::serialize(message);
        debug!(len = packed.len(), "submitting external message");
        self.transport.send_message(&packed).await?;
        Ok(())
    }
}

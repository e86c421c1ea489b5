//! Adapter over the block-scoped v4 HTTP API.
//!
//! Every query fetches a fresh latest-block reference first; pinning reads
//! to a stale block would make confirmation polling observe no progress.

use tracing::debug;

use super::transport::HttpV4Transport;
use super::{reader_from, state_of, ContractClient, ContractState};
use crate::address::Address;
use crate::boc;
use crate::cell::Cell;
use crate::error::Result;
use crate::tuple::{TupleItem, TupleReader};

/// [`ContractClient`] over a v4-style block-scoped HTTP transport.
pub struct HttpV4Backend<T> {
    transport: T,
}

impl<T: HttpV4Transport> HttpV4Backend<T> {
    pub fn new(transport: T) -> Self {
        HttpV4Backend { transport }
    }
}

impl<T: HttpV4Transport> ContractClient for HttpV4Backend<T> {
    async fn is_deployed(&self, address: &Address) -> Result<bool> {
        Ok(self.get_state(address).await?.active)
    }

    async fn get_state(&self, address: &Address) -> Result<ContractState> {
        let block = self.transport.last_block().await?;
        let state = self.transport.account_state(&block, address).await?;
        Ok(state_of(state.status))
    }

    async fn balance(&self, address: &Address) -> Result<u128> {
        let block = self.transport.last_block().await?;
        Ok(self.transport.account_state(&block, address).await?.balance)
    }

    async fn run_method(
        &self,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> Result<TupleReader> {
        let block = self.transport.last_block().await?;
        debug!(%address, method, block = block.seqno, "running get method");
        let result = self
            .transport
            .run_method(&block, address, method, args)
            .await?;
        reader_from(method, result)
    }

    async fn send_message(&self, message: &Cell) -> Result<()> {
        let packed = boc::serialize(message);
        debug!(len = packed.len(), "submitting external message");
        self.transport.send_message(&packed).await?;
        Ok(())
    }
}

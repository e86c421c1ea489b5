//! Adapter over the plain HTTP API.

use tracing::debug;

use super::transport::HttpTransport;
use super::{reader_from, state_of, ContractClient, ContractState};
use crate::address::Address;
use crate::boc;
use crate::cell::Cell;
use crate::error::Result;
use crate::tuple::{TupleItem, TupleReader};

/// [`ContractClient`] over a latest-state HTTP transport.
pub struct HttpBackend<T> {
    transport: T,
}

impl<T: HttpTransport> HttpBackend<T> {
    pub fn new(transport: T) -> Self {
        HttpBackend { transport }
    }
}

impl<T: HttpTransport> ContractClient for HttpBackend<T> {
    async fn is_deployed(&self, address: &Address) -> Result<bool> {
        Ok(self.get_state(address).await?.active)
    }

    async fn get_state(&self, address: &Address) -> Result<ContractState> {
        let state = self.transport.account_state(address).await?;
        Ok(state_of(state.status))
    }

    async fn balance(&self, address: &Address) -> Result<u128> {
        Ok(self.transport.account_state(address).await?.balance)
    }

    async fn run_method(
        &self,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> Result<TupleReader> {
        debug!(%address, method, "running get method");
        let result = self.transport.run_method(address, method, args).await?;
        reader_from(method, result)
    }

    async fn send_message(&self, message: &Cell) -> Result<()> {
        let packed = boc::serialize(message);
        debug!(len = packed.len(), "submitting external message");
        self.transport.send_message(&packed).await?;
        Ok(())
    }
}

//! Contract client abstraction.
//!
//! The wallet core talks to exactly one interface, [`ContractClient`]; the
//! backend variants in this module adapt the three transport families to it
//! so differences in state scoping and stack encoding never leak upward.

mod http;
mod http_v4;
mod lite;
pub mod toncenter;
pub mod transport;

pub use http::HttpBackend;
pub use http_v4::HttpV4Backend;
pub use lite::LiteBackend;

use crate::address::Address;
use crate::cell::Cell;
use crate::error::Result;
use crate::tuple::{TupleItem, TupleReader};

/// On-chain state of a contract, as far as the wallet cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractState {
    /// Code exists on-chain (active or frozen).
    pub deployed: bool,
    /// Code exists and can execute.
    pub active: bool,
}

impl ContractState {
    pub const ABSENT: ContractState = ContractState {
        deployed: false,
        active: false,
    };
}

/// Uniform query-and-submit interface over a single backend connection.
#[allow(async_fn_in_trait)]
pub trait ContractClient {
    async fn is_deployed(&self, address: &Address) -> Result<bool>;

    async fn get_state(&self, address: &Address) -> Result<ContractState>;

    /// Balance in base units; zero for accounts the chain has never seen.
    async fn balance(&self, address: &Address) -> Result<u128>;

    /// Execute a get-method and return its result stack in push order,
    /// first result first.
    async fn run_method(
        &self,
        address: &Address,
        method: &str,
        args: Vec<TupleItem>,
    ) -> Result<TupleReader>;

    /// Submit an external message cell.
    async fn send_message(&self, message: &Cell) -> Result<()>;
}

use crate::error::WalletError;
use transport::{AccountStatus, RunResult};

fn state_of(status: AccountStatus) -> ContractState {
    ContractState {
        deployed: matches!(status, AccountStatus::Active | AccountStatus::Frozen),
        active: status == AccountStatus::Active,
    }
}

/// TVM treats exit codes 0 and 1 as successful termination.
fn reader_from(method: &str, result: RunResult) -> Result<TupleReader> {
    if result.exit_code != 0 && result.exit_code != 1 {
        return Err(WalletError::UnexpectedReply(format!(
            "get method {method:?} exited with code {}",
            result.exit_code
        )));
    }
    Ok(TupleReader::new(result.stack))
}

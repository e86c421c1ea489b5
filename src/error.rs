//! Error taxonomy for the wallet core.
//!
//! Backend and network failures are carried through untouched as
//! [`WalletError::Backend`]; the core never retries them. Everything the
//! core itself can detect gets its own variant so callers can match on it.

use thiserror::Error;

use crate::boc::BocError;
use crate::cell::CellError;
use crate::crypto::KeyError;

pub type Result<T, E = WalletError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum WalletError {
    /// An operation needed the signing key or contract proxy before `init()`.
    #[error("wallet is not initialized")]
    Uninitialized,

    /// `init()` was called on an already initialized wallet.
    #[error("wallet is already initialized")]
    AlreadyInitialized,

    /// Lookup of an asset name that was never registered.
    #[error("asset {0:?} is not registered")]
    AssetNotFound(String),

    /// A confirmation or deployment poll exhausted its attempt budget.
    #[error("confirmation not observed after {attempts} polls")]
    ConfirmationTimeout { attempts: u32 },

    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },

    #[error("invalid amount {input:?}: {reason}")]
    InvalidAmount { input: String, reason: String },

    /// The backend answered, but not in a shape the core can interpret.
    #[error("malformed backend reply: {0}")]
    UnexpectedReply(String),

    #[error(transparent)]
    Cell(#[from] CellError),

    #[error(transparent)]
    Boc(#[from] BocError),

    #[error(transparent)]
    Key(#[from] KeyError),

    /// A transport-level failure, propagated unchanged from the backend.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

//! Mnemonic-backed TON wallet with jetton support.
//!
//! The crate splits into three layers:
//!
//! * primitives: cells, bag-of-cells serialization, addresses, TVM stack
//!   values, key derivation, and decimal unit conversion;
//! * the client layer: one [`ContractClient`] interface with adapters over
//!   the three backend transport families;
//! * the wallet layer: contract derivation, the jetton asset registry, and
//!   the transfer build/sign/submit/confirm pipeline.
//!
//! A [`Wallet`] is constructed dormant and comes alive with
//! [`Wallet::init`]; from there balances, jetton registration, and
//! transfers all go through the one backend it was given.

pub mod address;
pub mod boc;
pub mod cell;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod message;
pub mod tuple;
pub mod units;
pub mod wallet;

pub use address::Address;
pub use cell::{Cell, CellBuilder, CellSlice};
pub use client::{ContractClient, ContractState};
pub use config::WalletConfig;
pub use error::{Result, WalletError};
pub use message::{ExternalMessage, StateInit, TransferMessage};
pub use tuple::{TupleItem, TupleReader};
pub use wallet::{JettonConfig, Wallet, NATIVE_ASSET};

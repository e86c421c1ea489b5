//! Wallet contract proxy.
//!
//! A standard wallet contract is fully determined by its code, the owner's
//! public key, and the wallet id: initial data is `(seqno=0, wallet_id,
//! pubkey)`, and the deployment address is the hash of that state-init.
//! Transfer orders are signed off-chain; the contract only checks the
//! Ed25519 signature, the wallet id, the expiry, and the sequence number.

use crate::address::Address;
use crate::cell::{Cell, CellBuilder, CellError};
use crate::crypto::KeyPair;
use crate::message::{StateInit, TransferMessage};

/// Derived identity of the wallet contract, deployed or not.
#[derive(Debug, Clone)]
pub struct WalletContract {
    address: Address,
    state_init: StateInit,
    wallet_id: u32,
}

impl WalletContract {
    /// Derive the contract from its code and owner key.
    pub fn derive(
        public_key: [u8; 32],
        wallet_id: u32,
        workchain: i32,
        code: Cell,
    ) -> Result<Self, CellError> {
        let data = CellBuilder::new()
            .store_uint(0, 32)? // initial seqno
            .store_uint(wallet_id as u128, 32)?
            .store_bytes(&public_key)?
            .store_bit(false)? // no extensions
            .build();
        let state_init = StateInit { code, data };
        let address = state_init.address(workchain)?;
        Ok(WalletContract {
            address,
            state_init,
            wallet_id,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn state_init(&self) -> &StateInit {
        &self.state_init
    }

    /// Build and sign a transfer order carrying up to four messages.
    ///
    /// Layout: 512-bit signature, then the signed payload `wallet_id |
    /// valid_until | seqno | (mode, ^message)*`. The signature covers the
    /// representation hash of the payload.
    pub fn signed_transfer_body(
        &self,
        keys: &KeyPair,
        seqno: u32,
        valid_until: u32,
        mode: u8,
        messages: &[TransferMessage],
    ) -> Result<Cell, CellError> {
        let mut unsigned = CellBuilder::new()
            .store_uint(self.wallet_id as u128, 32)?
            .store_uint(valid_until as u128, 32)?
            .store_uint(seqno as u128, 32)?;
        for message in messages {
            unsigned = unsigned
                .store_uint(mode as u128, 8)?
                .store_ref(message.to_cell()?)?;
        }
        let unsigned = unsigned.build();

        let signature = keys.sign(&unsigned.repr_hash());
        CellBuilder::new()
            .store_bytes(&signature)?
            .store_cell(&unsigned)
            .map(CellBuilder::build)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keypair_from_mnemonic;
    use crate::message::SEND_MODE_PAY_GAS_SEPARATELY;

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon art";

    fn code() -> Cell {
        CellBuilder::new().store_uint(0xc0de, 16).unwrap().build()
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = WalletContract::derive([1; 32], 698_983_191, 0, code()).unwrap();
        let b = WalletContract::derive([1; 32], 698_983_191, 0, code()).unwrap();
        assert_eq!(a.address(), b.address());
    }

    #[test]
    fn address_depends_on_key_and_wallet_id() {
        let base = WalletContract::derive([1; 32], 698_983_191, 0, code()).unwrap();
        let other_key = WalletContract::derive([2; 32], 698_983_191, 0, code()).unwrap();
        let other_id = WalletContract::derive([1; 32], 698_983_192, 0, code()).unwrap();
        assert_ne!(base.address(), other_key.address());
        assert_ne!(base.address(), other_id.address());
    }

    #[test]
    fn signed_body_layout() {
        let keys = keypair_from_mnemonic(MNEMONIC).unwrap();
        let contract =
            WalletContract::derive(keys.public_key(), 698_983_191, 0, code()).unwrap();
        let message = TransferMessage::new(Address::new(0, [0x11; 32]), 1_000, true);
        let body = contract
            .signed_transfer_body(&keys, 7, 1_700_000_000, SEND_MODE_PAY_GAS_SEPARATELY, &[message])
            .unwrap();

        let mut s = body.begin_parse();
        s.load_bytes(64).unwrap(); // signature
        assert_eq!(s.load_uint(32).unwrap(), 698_983_191);
        assert_eq!(s.load_uint(32).unwrap(), 1_700_000_000);
        assert_eq!(s.load_uint(32).unwrap(), 7);
        assert_eq!(s.load_uint(8).unwrap(), SEND_MODE_PAY_GAS_SEPARATELY as u128);
        assert_eq!(body.refs().len(), 1);
    }

    #[test]
    fn signature_changes_with_seqno() {
        let keys = keypair_from_mnemonic(MNEMONIC).unwrap();
        let contract =
            WalletContract::derive(keys.public_key(), 698_983_191, 0, code()).unwrap();
        let a = contract
            .signed_transfer_body(&keys, 1, 1_700_000_000, 1, &[])
            .unwrap();
        let b = contract
            .signed_transfer_body(&keys, 2, 1_700_000_000, 1, &[])
            .unwrap();
        assert_ne!(a.repr_hash(), b.repr_hash());
    }
}

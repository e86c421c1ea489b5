//! Mnemonic-based Ed25519 key derivation and signing.
//!
//! Keys derive from a BIP-39 mnemonic: the normalized seed is run through
//! HMAC-SHA512 keyed with the chain's domain string, and the first 32 bytes
//! become the Ed25519 signing key. The secret half lives behind [`Secret`]
//! and is zeroized on drop.

use ed25519_dalek::{Signer, SigningKey};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroize;

type HmacSha512 = Hmac<Sha512>;

const SEED_DOMAIN: &[u8] = b"TON default seed";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),
}

/// An Ed25519 keypair derived from a mnemonic.
pub struct KeyPair {
    public: [u8; 32],
    secret: Secret<[u8; 32]>,
}

impl KeyPair {
    pub fn public_key(&self) -> [u8; 32] {
        self.public
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        let key = SigningKey::from_bytes(self.secret.expose_secret());
        key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public))
            .finish_non_exhaustive()
    }
}

/// Generate a fresh 24-word mnemonic from OS entropy.
pub fn generate_mnemonic() -> Result<String, KeyError> {
    let mut entropy = [0u8; 32];
    OsRng.fill_bytes(&mut entropy);
    let mnemonic = bip39::Mnemonic::from_entropy(&entropy)
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Derive the wallet keypair from a mnemonic phrase.
pub fn keypair_from_mnemonic(phrase: &str) -> Result<KeyPair, KeyError> {
    let mnemonic = bip39::Mnemonic::parse_normalized(phrase.trim())
        .map_err(|e| KeyError::InvalidMnemonic(e.to_string()))?;
    let mut seed = mnemonic.to_seed_normalized("");

    let mut mac = HmacSha512::new_from_slice(SEED_DOMAIN)
        .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
    mac.update(&seed);
    let mut digest = mac.finalize().into_bytes();
    seed.zeroize();

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&digest[..32]);
    digest.as_mut_slice().zeroize();
    let public = SigningKey::from_bytes(&secret).verifying_key().to_bytes();
    Ok(KeyPair {
        public,
        secret: Secret::new(secret),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Verifier, VerifyingKey};

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon abandon abandon abandon abandon abandon abandon abandon \
        abandon art";

    #[test]
    fn derivation_is_deterministic() {
        let a = keypair_from_mnemonic(MNEMONIC).unwrap();
        let b = keypair_from_mnemonic(MNEMONIC).unwrap();
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn generated_mnemonic_has_24_words_and_derives() {
        let phrase = generate_mnemonic().unwrap();
        assert_eq!(phrase.split_whitespace().count(), 24);
        keypair_from_mnemonic(&phrase).unwrap();
    }

    #[test]
    fn invalid_mnemonic_rejected() {
        assert!(matches!(
            keypair_from_mnemonic("definitely not a mnemonic"),
            Err(KeyError::InvalidMnemonic(_))
        ));
    }

    #[test]
    fn signatures_verify_under_public_key() {
        let keys = keypair_from_mnemonic(MNEMONIC).unwrap();
        let message = b"external message hash";
        let sig = keys.sign(message);
        let verifying = VerifyingKey::from_bytes(&keys.public_key()).unwrap();
        assert!(verifying
            .verify(message, &ed25519_dalek::Signature::from_bytes(&sig))
            .is_ok());
    }
}

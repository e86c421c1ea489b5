//! TON account addresses.
//!
//! An address is a workchain id plus a 256-bit account hash. Two text forms
//! exist on the wire: the raw `workchain:hex` form and the user-friendly
//! base64 form carrying a tag byte and a crc16 checksum. Both parse here;
//! `Display` renders the bounceable user-friendly form.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::WalletError;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET: u8 = 0x80;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub workchain: i32,
    pub hash_part: [u8; 32],
}

impl Address {
    pub fn new(workchain: i32, hash_part: [u8; 32]) -> Self {
        Address {
            workchain,
            hash_part,
        }
    }

    /// Parse either the raw `workchain:hex` form or the friendly base64 form.
    pub fn parse(input: &str) -> Result<Self, WalletError> {
        let invalid = |reason: &str| WalletError::InvalidAddress {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if let Some((wc, hash)) = input.split_once(':') {
            let workchain: i32 = wc.parse().map_err(|_| invalid("bad workchain id"))?;
            let bytes = hex::decode(hash).map_err(|_| invalid("bad account hex"))?;
            if bytes.len() != 32 {
                return Err(invalid("account hash must be 32 bytes"));
            }
            let mut hash_part = [0u8; 32];
            hash_part.copy_from_slice(&bytes);
            return Ok(Address::new(workchain, hash_part));
        }

        let trimmed = input.trim_end_matches('=');
        let bytes = URL_SAFE_NO_PAD
            .decode(trimmed)
            .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
            .map_err(|_| invalid("bad base64"))?;
        if bytes.len() != 36 {
            return Err(invalid("friendly form must decode to 36 bytes"));
        }
        let tag = bytes[0] & !TAG_TESTNET;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(invalid("unknown address tag"));
        }
        let expected = crc16(&bytes[..34]);
        let actual = u16::from_be_bytes([bytes[34], bytes[35]]);
        if expected != actual {
            return Err(invalid("checksum mismatch"));
        }
        let workchain = bytes[1] as i8 as i32;
        let mut hash_part = [0u8; 32];
        hash_part.copy_from_slice(&bytes[2..34]);
        Ok(Address::new(workchain, hash_part))
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash_part))
    }

    pub fn to_friendly(&self, bounceable: bool, testnet: bool) -> String {
        let mut tag = if bounceable {
            TAG_BOUNCEABLE
        } else {
            TAG_NON_BOUNCEABLE
        };
        if testnet {
            tag |= TAG_TESTNET;
        }
        let mut bytes = Vec::with_capacity(36);
        bytes.push(tag);
        bytes.push(self.workchain as i8 as u8);
        bytes.extend_from_slice(&self.hash_part);
        let crc = crc16(&bytes);
        bytes.extend_from_slice(&crc.to_be_bytes());
        URL_SAFE_NO_PAD.encode(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly(true, false))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_raw())
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

/// Serializes as the `Display` form; accepts either text form back.
impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Address::parse(&text).map_err(de::Error::custom)
    }
}

/// crc16/xmodem, the checksum of the friendly address form.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

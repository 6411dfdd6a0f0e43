//! The `wormhole_vaas` crate provides the pure primitives a receiving chain needs to accept a VAA.
//!
//! It includes:
//!
//! - The VAA wire codec and the codecs for governance and token payloads.
//! - Guardian sets, their rotation and expiry.
//! - Verification of a VAA's signature quorum against a guardian set.
//!
//! Nothing here mutates shared state on its own: replay protection lives in the
//! `wormhole-sequence-window` crate and governance dispatch in `wormhole-governance`.

#![deny(unused_results)]

use std::fmt;

use serde::{Deserialize, Serialize};

mod chain;
mod codec;
mod error;
pub mod guardian_set;
pub mod payload;
pub mod vaa;
pub mod verify;

pub use {
    chain::Chain,
    codec::{Reader, Writer},
    error::{MalformedInput, RegistryError, VerificationError},
    guardian_set::{GuardianSet, GuardianSetRegistry},
    vaa::{Body, Digest, Signature, Vaa},
    verify::verify_vaa,
};

/// The `GOVERNANCE_EMITTER` is the address guardians observe governance actions from by default.
/// The value is "0000000000000000000000000000000000000000000000000000000000000004".
pub const GOVERNANCE_EMITTER: Address = Address([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04,
]);

/// A guardian is identified by the last 20 bytes of the keccak256 hash of its uncompressed
/// secp256k1 public key, the same way Ethereum derives account addresses.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct GuardianAddress(pub [u8; 20]);

impl fmt::Display for GuardianAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}

/// Wormhole specifies addresses as 32 bytes. Addresses that are shorter, for example 20 byte
/// Ethereum addresses, are left zero padded to 32.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Address(pub [u8; 32]);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}

/// Computes keccak256 over the concatenation of `parts`.
pub fn keccak256<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> [u8; 32] {
    use sha3::{Digest as _, Keccak256};

    let mut h = Keccak256::new();
    for p in parts {
        h.update(p);
    }
    h.finalize().into()
}

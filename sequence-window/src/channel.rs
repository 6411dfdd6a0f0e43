//! Deterministic channel addressing.
//!
//! Every inbound channel, and every overflow record a channel creates, has an identity derived
//! from its parent identity and a path. Anyone holding the parent can locate the right window
//! without a registry lookup.

use std::fmt;

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

fn derive(parent: &[u8; 32], path: &[&[u8]]) -> [u8; 32] {
    let mut h = Keccak256::new();
    h.update(parent);
    for p in path {
        h.update(p);
    }
    h.finalize().into()
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

/// Identity scoping one independent sequence window.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct ChannelId(pub [u8; 32]);

impl ChannelId {
    pub fn derive(parent: &[u8; 32], path: &[&[u8]]) -> Self {
        ChannelId(derive(parent, path))
    }

    /// The inbound channel of `parent` for messages from `chain`.
    pub fn for_chain(parent: &[u8; 32], chain: u16) -> Self {
        Self::derive(parent, &[&chain.to_be_bytes()])
    }

    /// The per-token ledger of `parent` for the token `token` originating on `chain`.
    pub fn for_token(parent: &[u8; 32], chain: u16, token: &[u8; 32]) -> Self {
        Self::derive(parent, &[&chain.to_be_bytes(), token])
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// Address of an overflow record, derived from its owning channel and the first sequence of the
/// block it covers.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct RecordId(pub [u8; 32]);

impl RecordId {
    pub fn derive(owner: &ChannelId, block_begin: U256) -> Self {
        let mut begin = [0u8; 32];
        block_begin.to_big_endian(&mut begin);
        RecordId(derive(&owner.0, &[&begin]))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const BRIDGE: [u8; 32] = [0x0b; 32];

    #[test]
    fn derivation_is_deterministic() {
        assert_eq!(
            ChannelId::for_chain(&BRIDGE, 2),
            ChannelId::for_chain(&BRIDGE, 2)
        );
        assert_ne!(
            ChannelId::for_chain(&BRIDGE, 2),
            ChannelId::for_chain(&BRIDGE, 3)
        );
        assert_ne!(
            ChannelId::for_chain(&BRIDGE, 2),
            ChannelId::for_chain(&[0x0c; 32], 2)
        );
    }

    #[test]
    fn path_is_concatenated() {
        let token = [0x77; 32];
        let mut path = 2u16.to_be_bytes().to_vec();
        path.extend_from_slice(&token);

        assert_eq!(
            ChannelId::for_token(&BRIDGE, 2, &token),
            ChannelId::derive(&BRIDGE, &[&path])
        );
        assert_ne!(
            ChannelId::for_token(&BRIDGE, 2, &token),
            ChannelId::for_chain(&BRIDGE, 2)
        );
    }

    #[test]
    fn records_are_scoped_to_their_owner() {
        let a = ChannelId::for_chain(&BRIDGE, 1);
        let b = ChannelId::for_chain(&BRIDGE, 2);

        assert_eq!(
            RecordId::derive(&a, U256::from(256)),
            RecordId::derive(&a, U256::from(256))
        );
        assert_ne!(
            RecordId::derive(&a, U256::from(256)),
            RecordId::derive(&b, U256::from(256))
        );
        assert_ne!(
            RecordId::derive(&a, U256::from(256)),
            RecordId::derive(&a, U256::from(512))
        );
    }

    #[test]
    fn display_is_hex() {
        assert_eq!(
            "0b".repeat(32),
            ChannelId(BRIDGE).to_string()
        );
    }
}

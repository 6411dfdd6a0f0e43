//! VAA's represent a collection of signatures combined with a message and its metadata. VAA's are
//! used as a form of proof; by submitting a VAA to a target contract, the receiving contract can
//! make assumptions about the validity of state on the source chain.
//!
//! Wire layout (all integers big-endian):
//!
//! ```markdown
//! header:
//! 0   uint8       version (0x01)
//! 1   uint32      guardian set index
//! 5   uint8       len signatures
//!
//! per signature (length 66):
//! 0   uint8       index of the signer (in guardian keys)
//! 1   [32]uint8   r
//! 33  [32]uint8   s
//! 65  uint8       recovery id
//!
//! body:
//! 0   uint32      timestamp (unix in seconds)
//! 4   [4]uint8    nonce
//! 8   uint16      emitter_chain
//! 10  uint16      target_chain
//! 12  [32]uint8   emitter_address
//! 44  uint64      sequence
//! 52  uint8       consistency_level
//! 53  []uint8     payload
//! ```

use serde::{Deserialize, Serialize};

use crate::{keccak256, Address, Chain, MalformedInput, Reader, Writer};

pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 6;
pub const SIGNATURE_LEN: usize = 66;
pub const BODY_FIXED_LEN: usize = 53;

/// A guardian's ECDSA signature over the VAA digest, prefixed with the guardian's position in the
/// guardian set.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub index: u8,
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

impl Signature {
    fn decode(r: &mut Reader) -> Result<Self, MalformedInput> {
        Ok(Signature {
            index: r.read_u8()?,
            r: r.read_array()?,
            s: r.read_array()?,
            recovery_id: r.read_u8()?,
        })
    }

    fn encode(&self, w: &mut Writer) {
        let _ = w.u8(self.index).bytes(&self.r).bytes(&self.s).u8(self.recovery_id);
    }
}

/// The body of a VAA is the part the guardians sign. It is immutable once signed and its exact
/// encoding is the pre-image of the signing digest.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Body {
    /// Seconds since UNIX epoch.
    pub timestamp: u32,
    pub nonce: [u8; 4],
    pub emitter_chain: Chain,
    pub target_chain: Chain,
    pub emitter_address: Address,
    pub sequence: u64,
    pub consistency_level: u8,
    pub payload: Vec<u8>,
}

/// The core VAA itself. This structure is what is received by a contract on the receiving side of
/// a message passing flow.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Vaa {
    pub version: u8,
    pub guardian_set_index: u32,
    pub signatures: Vec<Signature>,
    pub body: Body,
}

/// Digest data for the Body.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest {
    /// The keccak256 hash of the body. This identifies a VAA across every Wormhole component.
    pub hash: [u8; 32],

    /// The hash of `hash`. secp256k1 signing hashes its input first, so the guardians' signatures
    /// recover against this value rather than `hash`.
    pub secp256k_hash: [u8; 32],
}

/// Calculates the digest of an already encoded body.
pub fn digest(body: &[u8]) -> Digest {
    let hash = keccak256([body]);
    let secp256k_hash = keccak256([&hash[..]]);

    Digest {
        hash,
        secp256k_hash,
    }
}

impl Body {
    pub fn decode(r: &mut Reader) -> Result<Self, MalformedInput> {
        Ok(Body {
            timestamp: r.read_u32()?,
            nonce: r.read_array()?,
            emitter_chain: r.read_chain()?,
            target_chain: r.read_chain()?,
            emitter_address: r.read_address()?,
            sequence: r.read_u64()?,
            consistency_level: r.read_u8()?,
            payload: r.rest().to_vec(),
        })
    }

    pub fn encode_into(&self, w: &mut Writer) {
        let _ = w
            .u32(self.timestamp)
            .bytes(&self.nonce)
            .chain(self.emitter_chain)
            .chain(self.target_chain)
            .bytes(&self.emitter_address.0)
            .u64(self.sequence)
            .u8(self.consistency_level)
            .bytes(&self.payload);
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(BODY_FIXED_LEN + self.payload.len());
        self.encode_into(&mut w);
        w.into_vec()
    }

    /// The canonical body encoding is byte-exact with what was decoded, so this is also the
    /// digest the guardians signed.
    pub fn digest(&self) -> Digest {
        digest(&self.encode())
    }
}

impl Vaa {
    /// Decodes a VAA from its wire format. Only version 1 VAAs are accepted.
    pub fn decode(buf: &[u8]) -> Result<Self, MalformedInput> {
        let mut r = Reader::new(buf);

        let version = r.read_u8()?;
        if version != VERSION {
            return Err(MalformedInput::UnsupportedVersion(version));
        }

        let guardian_set_index = r.read_u32()?;
        let count = r.read_u8()?;
        let signatures = (0..count)
            .map(|_| Signature::decode(&mut r))
            .collect::<Result<Vec<_>, _>>()?;
        let body = Body::decode(&mut r)?;

        Ok(Vaa {
            version,
            guardian_set_index,
            signatures,
            body,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, MalformedInput> {
        let count = u8::try_from(self.signatures.len())
            .map_err(|_| MalformedInput::TooLong("signatures", self.signatures.len()))?;

        let mut w = Writer::with_capacity(
            HEADER_LEN + SIGNATURE_LEN * self.signatures.len() + BODY_FIXED_LEN + self.body.payload.len(),
        );
        let _ = w.u8(self.version).u32(self.guardian_set_index).u8(count);
        for sig in &self.signatures {
            sig.encode(&mut w);
        }
        self.body.encode_into(&mut w);

        Ok(w.into_vec())
    }
}

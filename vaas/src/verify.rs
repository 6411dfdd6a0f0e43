//! Signature quorum verification.
//!
//! A VAA is accepted only if at least a quorum of guardians from the set it names signed the
//! double keccak256 digest of its body, and every signature it carries checks out. There is no
//! partial credit: one bad signature rejects the VAA even when the remaining ones would be enough.

use k256::{
    ecdsa::{RecoveryId, Signature as EcdsaSignature, VerifyingKey},
    elliptic_curve::sec1::ToEncodedPoint,
};

use crate::{
    keccak256, vaa::Digest, GuardianAddress, GuardianSet, GuardianSetRegistry, Signature, Vaa,
    VerificationError,
};

/// Verifies `vaa` against the guardian set it names. Returns the body digest on success.
pub fn verify_vaa(
    vaa: &Vaa,
    registry: &GuardianSetRegistry,
    now: u64,
) -> Result<Digest, VerificationError> {
    let digest = vaa.body.digest();
    let set = registry.resolve(vaa.guardian_set_index, now)?;

    verify_signatures(&vaa.signatures, &digest, set)?;

    Ok(digest)
}

/// Checks `signatures` over `digest` against `set`.
pub fn verify_signatures(
    signatures: &[Signature],
    digest: &Digest,
    set: &GuardianSet,
) -> Result<(), VerificationError> {
    let required = set.quorum();
    if signatures.len() < required {
        return Err(VerificationError::QuorumNotMet {
            required,
            actual: signatures.len(),
        });
    }

    let mut last_index: Option<u8> = None;
    for sig in signatures {
        if matches!(last_index, Some(last) if sig.index <= last) {
            return Err(VerificationError::InvalidSignatureOrder(sig.index));
        }
        last_index = Some(sig.index);

        let expected = set
            .addresses
            .get(usize::from(sig.index))
            .ok_or(VerificationError::SignatureMismatch(sig.index))?;

        match recover_address(sig, &digest.secp256k_hash) {
            Some(recovered) if recovered == *expected => {}
            _ => return Err(VerificationError::SignatureMismatch(sig.index)),
        }
    }

    Ok(())
}

/// Recovers the guardian address that produced `sig` over `prehash`. Returns `None` if the
/// signature is not a valid secp256k1 signature.
pub fn recover_address(sig: &Signature, prehash: &[u8; 32]) -> Option<GuardianAddress> {
    let mut rs = [0u8; 64];
    rs[..32].copy_from_slice(&sig.r);
    rs[32..].copy_from_slice(&sig.s);

    let signature = EcdsaSignature::from_slice(&rs).ok()?;
    let recovery_id = RecoveryId::from_byte(sig.recovery_id)?;
    let key = VerifyingKey::recover_from_prehash(prehash, &signature, recovery_id).ok()?;

    Some(guardian_address(&key))
}

/// Derives a guardian address from its public key: the last 20 bytes of the keccak256 hash of the
/// uncompressed point, without the SEC1 tag byte.
pub fn guardian_address(key: &VerifyingKey) -> GuardianAddress {
    let point = key.to_encoded_point(false);
    let hash = keccak256([&point.as_bytes()[1..]]);

    let mut addr = [0u8; 20];
    addr.copy_from_slice(&hash[12..]);
    GuardianAddress(addr)
}

#[cfg(test)]
mod test {
    use k256::ecdsa::SigningKey;

    use super::*;
    use crate::{Address, Body, Chain};

    fn keys(n: usize) -> Vec<SigningKey> {
        (0..n)
            .map(|i| {
                let mut secret = [0x42u8; 32];
                secret[31] = i as u8 + 1;
                SigningKey::from_slice(&secret).unwrap()
            })
            .collect()
    }

    fn registry(keys: &[SigningKey]) -> GuardianSetRegistry {
        let addresses = keys
            .iter()
            .map(|k| guardian_address(k.verifying_key()))
            .collect();
        GuardianSetRegistry::new(GuardianSet::new(0, addresses).unwrap())
    }

    fn sign(keys: &[SigningKey], signers: &[u8], body: Body) -> Vaa {
        let digest = body.digest();
        let signatures = signers
            .iter()
            .map(|&i| {
                let (sig, recid) = keys[usize::from(i)]
                    .sign_prehash_recoverable(&digest.secp256k_hash)
                    .unwrap();
                let bytes = sig.to_bytes();
                Signature {
                    index: i,
                    r: bytes[..32].try_into().unwrap(),
                    s: bytes[32..].try_into().unwrap(),
                    recovery_id: recid.to_byte(),
                }
            })
            .collect();

        Vaa {
            version: 1,
            guardian_set_index: 0,
            signatures,
            body,
        }
    }

    fn body() -> Body {
        Body {
            timestamp: 1_656_354_705,
            nonce: [0, 0, 0, 7],
            emitter_chain: Chain::Ethereum,
            target_chain: Chain::Solana,
            emitter_address: Address([0x11; 32]),
            sequence: 42,
            consistency_level: 1,
            payload: b"From: evm0\nMsg: Hello World!".to_vec(),
        }
    }

    #[test]
    fn recovers_signer() {
        let keys = keys(1);
        let vaa = sign(&keys, &[0], body());
        let recovered = recover_address(&vaa.signatures[0], &vaa.body.digest().secp256k_hash);
        assert_eq!(Some(guardian_address(keys[0].verifying_key())), recovered);
    }

    #[test]
    fn accepts_quorum() {
        let keys = keys(19);
        let registry = registry(&keys);

        let signers: Vec<u8> = (0..13).collect();
        let vaa = sign(&keys, &signers, body());
        let digest = verify_vaa(&vaa, &registry, 0).unwrap();
        assert_eq!(vaa.body.digest(), digest);

        // Survives the wire.
        let decoded = Vaa::decode(&vaa.encode().unwrap()).unwrap();
        let _ = verify_vaa(&decoded, &registry, 0).unwrap();
    }

    #[test]
    fn rejects_below_quorum() {
        let keys = keys(19);
        let registry = registry(&keys);

        let signers: Vec<u8> = (0..12).collect();
        let vaa = sign(&keys, &signers, body());
        assert_eq!(
            VerificationError::QuorumNotMet {
                required: 13,
                actual: 12
            },
            verify_vaa(&vaa, &registry, 0).unwrap_err()
        );
    }

    #[test]
    fn rejects_unordered_and_duplicate_signers() {
        let keys = keys(4);
        let registry = registry(&keys);

        let vaa = sign(&keys, &[0, 2, 1], body());
        assert_eq!(
            VerificationError::InvalidSignatureOrder(1),
            verify_vaa(&vaa, &registry, 0).unwrap_err()
        );

        let vaa = sign(&keys, &[0, 1, 1], body());
        assert_eq!(
            VerificationError::InvalidSignatureOrder(1),
            verify_vaa(&vaa, &registry, 0).unwrap_err()
        );
    }

    #[test]
    fn rejects_wrong_position() {
        let keys = keys(4);
        let registry = registry(&keys);

        let mut vaa = sign(&keys, &[0, 1, 2], body());
        vaa.signatures[2].index = 3;
        assert_eq!(
            VerificationError::SignatureMismatch(3),
            verify_vaa(&vaa, &registry, 0).unwrap_err()
        );
    }

    #[test]
    fn rejects_signer_outside_set() {
        let keys = keys(5);
        let registry = registry(&keys[..3]);

        let vaa = sign(&keys, &[0, 1, 4], body());
        assert_eq!(
            VerificationError::SignatureMismatch(4),
            verify_vaa(&vaa, &registry, 0).unwrap_err()
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let keys = keys(4);
        let registry = registry(&keys);

        let mut vaa = sign(&keys, &[0, 1, 2], body());
        vaa.body.sequence += 1;
        assert_eq!(
            VerificationError::SignatureMismatch(0),
            verify_vaa(&vaa, &registry, 0).unwrap_err()
        );
    }

    #[test]
    fn any_flipped_signature_bit_is_rejected() {
        let keys = keys(1);
        let registry = registry(&keys);
        let vaa = sign(&keys, &[0], body());

        for byte in 0..65 {
            for bit in 0..8 {
                let mut tampered = vaa.clone();
                let sig = &mut tampered.signatures[0];
                match byte {
                    0..=31 => sig.r[byte] ^= 1 << bit,
                    32..=63 => sig.s[byte - 32] ^= 1 << bit,
                    _ => sig.recovery_id ^= 1 << bit,
                }

                assert_eq!(
                    Err(VerificationError::SignatureMismatch(0)),
                    verify_vaa(&tampered, &registry, 0),
                    "accepted a signature with bit {bit} of byte {byte} flipped"
                );
            }
        }
    }

    #[test]
    fn previous_set_until_expiry() {
        let old_keys = keys(3);
        let mut registry = registry(&old_keys);
        let all_keys = keys(6);
        let new_keys = &all_keys[3..];
        let new_set = GuardianSet::new(
            1,
            new_keys
                .iter()
                .map(|k| guardian_address(k.verifying_key()))
                .collect(),
        )
        .unwrap();
        registry.rotate(new_set, 100, 1_000).unwrap();

        let vaa = sign(&old_keys, &[0, 1, 2], body());
        let _ = verify_vaa(&vaa, &registry, 1_100).unwrap();
        assert_eq!(
            VerificationError::UnknownGuardianSet(0),
            verify_vaa(&vaa, &registry, 1_101).unwrap_err()
        );

        let mut vaa = sign(new_keys, &[0, 1, 2], body());
        vaa.guardian_set_index = 1;
        let _ = verify_vaa(&vaa, &registry, 5_000).unwrap();
    }
}

//! Contract upgrade state migrations.
//!
//! An upgrade may replace the persisted state along with the code. The migration names the hash
//! of the state it was built against, and is refused unless the executor currently persists
//! exactly that state.

use serde::Serialize;
use wormhole_vaas::{keccak256, payload::StateMigration};

use crate::Error;

/// keccak256 of the canonical JSON encoding of `state`.
pub fn state_hash<T: Serialize>(state: &T) -> Result<[u8; 32], Error> {
    let bytes = serde_json::to_vec(state).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(keccak256([bytes.as_slice()]))
}

pub fn check_migration(current: [u8; 32], migration: &StateMigration) -> Result<(), Error> {
    if current != migration.prev_state_hash {
        return Err(Error::StateMismatch {
            expected: migration.prev_state_hash,
            actual: current,
        });
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn hash_is_stable() {
        let state: BTreeMap<u16, &str> = [(2, "ethereum"), (1, "solana")].into_iter().collect();
        let again: BTreeMap<u16, &str> = [(1, "solana"), (2, "ethereum")].into_iter().collect();

        assert_eq!(state_hash(&state).unwrap(), state_hash(&again).unwrap());
        assert_eq!(
            keccak256([&br#"{"1":"solana","2":"ethereum"}"#[..]]),
            state_hash(&state).unwrap()
        );
    }

    #[test]
    fn migration_requires_matching_hash() {
        let current = state_hash(&"state").unwrap();
        let mut migration = StateMigration {
            prev_state_hash: current,
            immutable_state: vec![1],
            mutable_state: vec![2],
        };
        check_migration(current, &migration).unwrap();

        migration.prev_state_hash[0] ^= 1;
        assert_eq!(
            Error::StateMismatch {
                expected: migration.prev_state_hash,
                actual: current
            },
            check_migration(current, &migration).unwrap_err()
        );
    }
}

//! Guardian sets and the registry holding the current and previous set.
//!
//! A rotation moves the current set into the previous slot and gives it an expiry, so VAAs
//! signed by the outgoing guardians in flight during the handover are still accepted for a while.

use log::info;
use serde::{Deserialize, Serialize};

use crate::{GuardianAddress, MalformedInput, RegistryError, VerificationError};

/// A `GuardianSet` is a versioned set of keys that can sign VAAs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuardianSet {
    pub index: u32,

    /// Guardian addresses, ordered by their position in the set.
    pub addresses: Vec<GuardianAddress>,

    /// Unix seconds after which this set may no longer verify VAAs. Only set on a replaced set.
    pub expiration_time: Option<u64>,
}

impl GuardianSet {
    /// Builds a set with no expiry. Addresses must be non-empty and unique.
    pub fn new(index: u32, addresses: Vec<GuardianAddress>) -> Result<Self, MalformedInput> {
        if addresses.is_empty() {
            return Err(MalformedInput::EmptyGuardianSet);
        }

        for (i, a) in addresses.iter().enumerate() {
            if addresses[..i].contains(a) {
                return Err(MalformedInput::DuplicateGuardian(i));
            }
        }

        Ok(GuardianSet {
            index,
            addresses,
            expiration_time: None,
        })
    }

    /// Minimum number of signatures needed for a VAA to be accepted by this set.
    ///
    /// The truncation order matters: this is what every other Wormhole contract computes, and it
    /// is not the same as a plain `ceil(2n/3)`.
    pub fn quorum(&self) -> usize {
        quorum(self.addresses.len())
    }

    pub fn is_expired(&self, now: u64) -> bool {
        matches!(self.expiration_time, Some(t) if now > t)
    }
}

pub fn quorum(num_guardians: usize) -> usize {
    ((num_guardians * 10 / 3) * 2) / 10 + 1
}

/// Holds the current guardian set and the one it replaced.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GuardianSetRegistry {
    current: GuardianSet,
    previous: Option<GuardianSet>,
}

impl GuardianSetRegistry {
    pub fn new(initial: GuardianSet) -> Self {
        GuardianSetRegistry {
            current: initial,
            previous: None,
        }
    }

    pub fn current(&self) -> &GuardianSet {
        &self.current
    }

    /// The set replaced by the last rotation, if any. It may already be expired.
    pub fn previous(&self) -> Option<&GuardianSet> {
        self.previous.as_ref()
    }

    /// Installs `new_set` as the current set. The outgoing set becomes `previous` and expires
    /// `expiry_delay` seconds after `now`; whatever was in `previous` before is dropped.
    pub fn rotate(
        &mut self,
        new_set: GuardianSet,
        expiry_delay: u64,
        now: u64,
    ) -> Result<(), RegistryError> {
        if self.current.index.checked_add(1) != Some(new_set.index) {
            return Err(RegistryError::InvalidGuardianSetIndex {
                expected: self.current.index.wrapping_add(1),
                actual: new_set.index,
            });
        }

        // The set may have been built by hand rather than through `GuardianSet::new`.
        let new_set = GuardianSet::new(new_set.index, new_set.addresses)?;

        let mut outgoing = std::mem::replace(&mut self.current, new_set);
        outgoing.expiration_time = Some(now.saturating_add(expiry_delay));

        info!(
            "guardian set rotated: {} -> {} (previous expires at {})",
            outgoing.index,
            self.current.index,
            now.saturating_add(expiry_delay)
        );
        self.previous = Some(outgoing);

        Ok(())
    }

    /// Looks up the set a VAA claims to be signed by. The previous set only resolves until it
    /// expires.
    pub fn resolve(&self, index: u32, now: u64) -> Result<&GuardianSet, VerificationError> {
        if index == self.current.index {
            return Ok(&self.current);
        }

        match &self.previous {
            Some(prev) if prev.index == index && !prev.is_expired(now) => Ok(prev),
            _ => Err(VerificationError::UnknownGuardianSet(index)),
        }
    }
}

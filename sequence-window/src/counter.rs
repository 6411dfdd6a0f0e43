use log::debug;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::WindowError;

/// Strict ordering for channels with a single, already ordered sender: sequence `n` is admitted
/// only right after `n - 1`. This is a window one sequence wide, so nothing is ever parked.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SequenceCounter {
    next: U256,
}

impl SequenceCounter {
    pub fn new(next: U256) -> Self {
        SequenceCounter { next }
    }

    /// The only sequence `check` will accept.
    pub fn next(&self) -> U256 {
        self.next
    }

    pub fn check(&mut self, seq: U256) -> Result<bool, WindowError> {
        if seq != self.next {
            return Err(WindowError::OutOfOrder {
                expected: self.next,
                actual: seq,
            });
        }

        let next = self
            .next
            .checked_add(U256::one())
            .ok_or(WindowError::OutOfOrder {
                expected: self.next,
                actual: seq,
            })?;
        self.next = next;
        debug!("admitted {seq} in order");

        Ok(true)
    }
}

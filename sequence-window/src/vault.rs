//! Collateral backing overflow records.
//!
//! Creating a record reserves a fixed amount from the channel's funds and destroying it releases
//! exactly that amount again. The host decides what the units are.

use std::collections::HashMap;

use log::debug;

use crate::{ChannelId, WindowError};

pub trait CollateralVault {
    /// Takes `amount` from the funds available to `channel`. On failure nothing is taken.
    fn reserve(&mut self, channel: &ChannelId, amount: u128) -> Result<(), WindowError>;

    /// Returns `amount` previously reserved for `channel`.
    fn refund(&mut self, channel: &ChannelId, amount: u128);
}

/// Keeps per-channel balances in memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryVault {
    balances: HashMap<ChannelId, u128>,
    outstanding: u128,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deposit(&mut self, channel: &ChannelId, amount: u128) {
        let balance = self.balances.entry(*channel).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, channel: &ChannelId) -> u128 {
        self.balances.get(channel).copied().unwrap_or_default()
    }

    /// Total currently reserved across all channels.
    pub fn outstanding(&self) -> u128 {
        self.outstanding
    }
}

impl CollateralVault for MemoryVault {
    fn reserve(&mut self, channel: &ChannelId, amount: u128) -> Result<(), WindowError> {
        let available = self.balance(channel);
        if available < amount {
            return Err(WindowError::InsufficientCollateral {
                required: amount,
                available,
            });
        }

        let _ = self.balances.insert(*channel, available - amount);
        self.outstanding = self.outstanding.saturating_add(amount);
        debug!("reserved {amount} for channel {channel}");

        Ok(())
    }

    fn refund(&mut self, channel: &ChannelId, amount: u128) {
        self.outstanding = self.outstanding.saturating_sub(amount);
        self.deposit(channel, amount);
        debug!("refunded {amount} to channel {channel}");
    }
}

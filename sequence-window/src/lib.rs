//! Replay protection for VAA sequence numbers.
//!
//! Each inbound channel admits every sequence at most once. The general case is a
//! [`SequenceWindow`]: a 512 wide bitmap that slides forward in 256 sequence blocks and parks
//! incomplete blocks in collateral-backed [`OverflowRecord`]s. Channels with a single ordered
//! sender can use a [`SequenceCounter`] instead.
//!
//! Every operation is all or nothing. A call that fails leaves the window, the ledger and the
//! vault untouched.

#![deny(unused_results)]

use primitive_types::U256;

mod channel;
mod counter;
mod error;
mod overflow;
mod vault;
mod window;

pub use {
    channel::{ChannelId, RecordId},
    counter::SequenceCounter,
    error::WindowError,
    overflow::{block_of, OverflowEvent, OverflowLedger, OverflowRecord},
    vault::{CollateralVault, MemoryVault},
    window::{SequenceWindow, WindowState},
};

/// Number of sequences in a window block and in an overflow record.
pub const BLOCK_LEN: u64 = 256;

/// Anything that can admit sequences of a channel at most once.
pub trait ReplayGuard {
    /// `Ok(true)` admits `seq`. `Ok(false)` means `seq` is not admissible yet and the call should
    /// be repeated.
    fn admit(
        &mut self,
        seq: U256,
        ledger: &mut OverflowLedger,
        vault: &mut dyn CollateralVault,
    ) -> Result<bool, WindowError>;
}

impl ReplayGuard for SequenceWindow {
    fn admit(
        &mut self,
        seq: U256,
        ledger: &mut OverflowLedger,
        vault: &mut dyn CollateralVault,
    ) -> Result<bool, WindowError> {
        self.check(seq, ledger, vault)
    }
}

impl ReplayGuard for SequenceCounter {
    fn admit(
        &mut self,
        seq: U256,
        _: &mut OverflowLedger,
        _: &mut dyn CollateralVault,
    ) -> Result<bool, WindowError> {
        self.check(seq)
    }
}

/// Keeps calling `guard` until `seq` is admitted or rejected. Each call slides a window by at
/// most one block, so this is bounded by the distance from the window in blocks.
pub fn admit_eventually(
    guard: &mut dyn ReplayGuard,
    seq: U256,
    ledger: &mut OverflowLedger,
    vault: &mut dyn CollateralVault,
) -> Result<(), WindowError> {
    while !guard.admit(seq, ledger, vault)? {}
    Ok(())
}

//! The sliding admission window.
//!
//! A window covers 512 sequences starting at `start`, split into two 256 bit blocks. Sequences
//! beyond the window slide it forward one block per call; a block that falls off the back with
//! sequences still missing is parked in an overflow record.

use log::debug;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::{
    overflow::block_of, ChannelId, CollateralVault, OverflowLedger, RecordId, WindowError,
    BLOCK_LEN,
};

/// Persisted state of one window.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    pub start: U256,
    /// Bit `k` set means `start + k` has been admitted.
    pub first_next_256: U256,
    /// Bit `k` set means `start + 256 + k` has been admitted.
    pub second_next_256: U256,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "PersistedWindow")]
pub struct SequenceWindow {
    channel: ChannelId,
    state: WindowState,
    /// Reserved from the channel for every overflow record it creates.
    collateral: u128,
}

#[derive(Deserialize)]
struct PersistedWindow {
    channel: ChannelId,
    state: WindowState,
    collateral: u128,
}

impl TryFrom<PersistedWindow> for SequenceWindow {
    type Error = WindowError;

    fn try_from(w: PersistedWindow) -> Result<Self, Self::Error> {
        SequenceWindow::from_parts(w.channel, w.state, w.collateral)
    }
}

impl SequenceWindow {
    pub fn new(channel: ChannelId, collateral: u128) -> Self {
        SequenceWindow {
            channel,
            state: WindowState::default(),
            collateral,
        }
    }

    /// Restores a window from persisted state. `start` has to sit on a block boundary, otherwise
    /// overflow records could not be located again.
    pub fn from_parts(
        channel: ChannelId,
        state: WindowState,
        collateral: u128,
    ) -> Result<Self, WindowError> {
        if block_of(state.start) != state.start {
            return Err(WindowError::UnalignedStart(state.start));
        }

        Ok(SequenceWindow {
            channel,
            state,
            collateral,
        })
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn state(&self) -> &WindowState {
        &self.state
    }

    pub fn collateral(&self) -> u128 {
        self.collateral
    }

    /// Admits `seq` if it has not been admitted before.
    ///
    /// Returns `Ok(false)` if `seq` is still ahead of the window after sliding it forward by one
    /// block; the caller should call again. A sequence behind the window is only admissible
    /// through the overflow record of its block.
    pub fn check(
        &mut self,
        seq: U256,
        ledger: &mut OverflowLedger,
        vault: &mut dyn CollateralVault,
    ) -> Result<bool, WindowError> {
        if seq < self.state.start {
            ledger.admit(&self.channel, seq, vault)?;
            debug!("channel {}: admitted {seq} from overflow", self.channel);
            return Ok(true);
        }

        if self.try_admit(seq)? {
            return Ok(true);
        }

        // Slide by one block. The record, if one is needed, is created first so a failed
        // reservation leaves the window as it was.
        let evicted = self.state.first_next_256;
        if evicted != U256::MAX {
            let _ = ledger.create(
                &self.channel,
                self.state.start,
                evicted,
                self.collateral,
                vault,
            )?;
        }

        self.state = WindowState {
            start: self.state.start + U256::from(BLOCK_LEN),
            first_next_256: self.state.second_next_256,
            second_next_256: U256::zero(),
        };
        debug!(
            "channel {}: window moved to {}",
            self.channel, self.state.start
        );

        self.try_admit(seq)
    }

    /// Removes the overflow record of the block starting at `block_begin`, complete or not.
    pub fn destroy(
        &self,
        block_begin: U256,
        ledger: &mut OverflowLedger,
        vault: &mut dyn CollateralVault,
    ) -> Result<(), WindowError> {
        let id = RecordId::derive(&self.channel, block_begin);
        let _ = ledger.destroy(&self.channel, &id, vault)?;
        Ok(())
    }

    // Admits `seq` if it lies inside the window. `Ok(false)` means it is ahead of the window.
    fn try_admit(&mut self, seq: U256) -> Result<bool, WindowError> {
        let offset = seq - self.state.start;
        let block = U256::from(BLOCK_LEN);

        let (bitmap, bit) = if offset < block {
            (&mut self.state.first_next_256, offset.low_u64())
        } else if offset < block + block {
            (&mut self.state.second_next_256, offset.low_u64() - BLOCK_LEN)
        } else {
            return Ok(false);
        };

        let mask = U256::one() << bit as usize;
        if *bitmap & mask != U256::zero() {
            return Err(WindowError::Replay(seq));
        }
        *bitmap |= mask;
        debug!("channel {}: admitted {seq}", self.channel);

        Ok(true)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{MemoryVault, OverflowEvent};

    const COLLATERAL: u128 = 10;

    struct Harness {
        window: SequenceWindow,
        ledger: OverflowLedger,
        vault: MemoryVault,
    }

    impl Harness {
        fn new(state: WindowState) -> Self {
            let channel = ChannelId([3; 32]);
            let mut vault = MemoryVault::new();
            vault.deposit(&channel, 1_000);
            Harness {
                window: SequenceWindow::from_parts(channel, state, COLLATERAL).unwrap(),
                ledger: OverflowLedger::new(),
                vault,
            }
        }

        fn check(&mut self, seq: u64) -> Result<bool, WindowError> {
            self.window
                .check(U256::from(seq), &mut self.ledger, &mut self.vault)
        }

        fn record(&self, block_begin: u64) -> Option<U256> {
            self.ledger
                .find(self.window.channel(), U256::from(block_begin))
                .map(|r| r.sequences)
        }
    }

    fn state(start: u64, first: U256, second: U256) -> WindowState {
        WindowState {
            start: U256::from(start),
            first_next_256: first,
            second_next_256: second,
        }
    }

    #[test]
    fn shift_parks_incomplete_block_without_admitting() {
        let mut h = Harness::new(state(0, U256::one(), U256::one()));

        assert!(!h.check(768).unwrap());

        assert_eq!(&state(256, U256::one(), U256::zero()), h.window.state());
        assert_eq!(1, h.ledger.len());
        assert_eq!(Some(U256::one()), h.record(0));
        assert_eq!(1_000 - COLLATERAL, h.vault.balance(h.window.channel()));
    }

    #[test]
    fn shift_then_admit_in_second_block() {
        let high_byte = U256::from(0xff) << 248;
        let mut h = Harness::new(state(256, high_byte, U256::zero()));

        assert!(h.check(256 + 513).unwrap());

        assert_eq!(&state(512, U256::zero(), U256::from(2)), h.window.state());
        assert_eq!(Some(high_byte), h.record(256));
        assert_eq!(1, h.ledger.len());
    }

    #[test]
    fn complete_block_is_dropped_without_record() {
        let mut h = Harness::new(state(512, U256::MAX, U256::MAX));

        assert!(h.check(1025).unwrap());

        assert_eq!(&state(768, U256::MAX, U256::from(2)), h.window.state());
        assert!(h.ledger.is_empty());
        assert!(h.ledger.drain_events().is_empty());
        assert_eq!(1_000, h.vault.balance(h.window.channel()));
    }

    #[test]
    fn replay_inside_window() {
        let mut h = Harness::new(WindowState::default());

        assert!(h.check(0).unwrap());
        assert!(h.check(300).unwrap());
        assert_eq!(WindowError::Replay(U256::zero()), h.check(0).unwrap_err());
        assert_eq!(
            WindowError::Replay(U256::from(300)),
            h.check(300).unwrap_err()
        );
        assert_eq!(
            &state(0, U256::one(), U256::one() << 44),
            h.window.state()
        );
    }

    #[test]
    fn far_ahead_sequence_takes_several_calls() {
        let mut h = Harness::new(WindowState::default());

        let mut calls = 0;
        let mut last_start = U256::zero();
        while !h.check(2_000).unwrap() {
            calls += 1;
            let start = h.window.state().start;
            assert!(start > last_start);
            assert_eq!(U256::from(256), start - last_start);
            last_start = start;
        }

        // 2000 fits once start reaches 1536.
        assert_eq!(5, calls);
        assert_eq!(U256::from(1_536), h.window.state().start);
        // Every evicted block was empty and got a record.
        assert_eq!(6, h.ledger.len());
        assert_eq!(WindowError::Replay(U256::from(2_000)), h.check(2_000).unwrap_err());
    }

    #[test]
    fn late_arrivals_go_through_overflow() {
        let mut h = Harness::new(WindowState::default());
        assert!(h.check(5).unwrap());
        assert!(h.check(600).unwrap());
        assert_eq!(U256::from(256), h.window.state().start);

        assert!(h.check(6).unwrap());
        assert_eq!(WindowError::Replay(U256::from(5)), h.check(5).unwrap_err());
        assert_eq!(WindowError::Replay(U256::from(6)), h.check(6).unwrap_err());
        assert_eq!(Some(U256::from(0b110_0000)), h.record(0));
    }

    #[test]
    fn completing_overflow_refunds_collateral() {
        let missing = 17u64;
        let mut h = Harness::new(state(
            0,
            U256::MAX ^ (U256::one() << missing as usize),
            U256::zero(),
        ));
        let channel = *h.window.channel();

        assert!(h.check(600).unwrap());
        assert_eq!(1_000 - COLLATERAL, h.vault.balance(&channel));

        assert!(h.check(missing).unwrap());
        assert!(h.ledger.is_empty());
        assert_eq!(1_000, h.vault.balance(&channel));
        assert_eq!(0, h.vault.outstanding());

        let events = h.ledger.drain_events();
        assert_eq!(2, events.len());
        assert!(matches!(
            events[1],
            OverflowEvent::Destroyed {
                completed: true,
                refunded: COLLATERAL,
                ..
            }
        ));

        assert_eq!(
            WindowError::AlreadyExecutedOrUnknown(U256::from(missing)),
            h.check(missing).unwrap_err()
        );
    }

    #[test]
    fn settled_block_behind_window_is_unknown() {
        let mut h = Harness::new(state(512, U256::zero(), U256::zero()));
        assert_eq!(
            WindowError::AlreadyExecutedOrUnknown(U256::from(10)),
            h.check(10).unwrap_err()
        );
    }

    #[test]
    fn failed_reservation_leaves_window_untouched() {
        let channel = ChannelId([4; 32]);
        let before = state(256, U256::one(), U256::from(6));
        let mut window = SequenceWindow::from_parts(channel, before, COLLATERAL).unwrap();
        let mut ledger = OverflowLedger::new();
        let mut vault = MemoryVault::new();
        vault.deposit(&channel, COLLATERAL - 1);

        assert_eq!(
            WindowError::InsufficientCollateral {
                required: COLLATERAL,
                available: COLLATERAL - 1
            },
            window
                .check(U256::from(1_000), &mut ledger, &mut vault)
                .unwrap_err()
        );
        assert_eq!(&before, window.state());
        assert!(ledger.is_empty());
        assert_eq!(COLLATERAL - 1, vault.balance(&channel));
    }

    #[test]
    fn destroy_by_block() {
        let mut h = Harness::new(state(0, U256::one(), U256::zero()));
        assert!(!h.check(768).unwrap());
        assert!(h.record(0).is_some());

        h.window
            .destroy(U256::zero(), &mut h.ledger, &mut h.vault)
            .unwrap();
        assert!(h.record(0).is_none());
        assert_eq!(1_000, h.vault.balance(h.window.channel()));

        assert!(matches!(
            h.window.destroy(U256::zero(), &mut h.ledger, &mut h.vault),
            Err(WindowError::UnknownRecord(_))
        ));
        assert_eq!(
            WindowError::AlreadyExecutedOrUnknown(U256::from(1)),
            h.check(1).unwrap_err()
        );
    }

    #[test]
    fn unaligned_start_is_rejected() {
        assert_eq!(
            WindowError::UnalignedStart(U256::from(300)),
            SequenceWindow::from_parts(ChannelId::default(), state(300, U256::zero(), U256::zero()), 1)
                .unwrap_err()
        );
    }

    #[test]
    fn state_survives_json() {
        let mut h = Harness::new(WindowState::default());
        assert!(h.check(42).unwrap());

        let json = serde_json::to_string(&h.window).unwrap();
        let restored: SequenceWindow = serde_json::from_str(&json).unwrap();
        assert_eq!(h.window, restored);

        let mut unaligned = serde_json::to_value(&h.window).unwrap();
        unaligned["state"]["start"] = serde_json::to_value(U256::from(300)).unwrap();
        let err = serde_json::from_value::<SequenceWindow>(unaligned).unwrap_err();
        assert!(err.to_string().contains("300"), "{err}");
    }
}

//! Overflow records.
//!
//! When the window slides past a block that still has unadmitted sequences, the block's bitmap is
//! parked in an `OverflowRecord` so late arrivals can still be admitted exactly once. Each record
//! holds a fixed amount of collateral which is refunded when the record goes away, either because
//! its last sequence was admitted or because governance removed it.

use std::collections::HashMap;

use log::info;
use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::{ChannelId, CollateralVault, RecordId, WindowError, BLOCK_LEN};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OverflowRecord {
    pub owner: ChannelId,

    /// First sequence covered by this record. Always a multiple of 256.
    pub block_begin: U256,

    /// Bit `k` is set once sequence `block_begin + k` has been admitted.
    pub sequences: U256,

    pub collateral: u128,
}

impl OverflowRecord {
    pub fn id(&self) -> RecordId {
        RecordId::derive(&self.owner, self.block_begin)
    }

    pub fn is_complete(&self) -> bool {
        self.sequences == U256::MAX
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OverflowEvent {
    Created {
        owner: ChannelId,
        block_begin: U256,
        sequences: U256,
        collateral: u128,
    },
    Destroyed {
        owner: ChannelId,
        block_begin: U256,
        refunded: u128,
        /// False when the record was removed before all of its sequences were admitted.
        completed: bool,
    },
}

/// Arena of overflow records, addressed by `RecordId`.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(from = "Vec<OverflowRecord>", into = "Vec<OverflowRecord>")]
pub struct OverflowLedger {
    records: HashMap<RecordId, OverflowRecord>,
    events: Vec<OverflowEvent>,
}

impl From<Vec<OverflowRecord>> for OverflowLedger {
    fn from(records: Vec<OverflowRecord>) -> Self {
        OverflowLedger {
            records: records.into_iter().map(|r| (r.id(), r)).collect(),
            events: Vec::new(),
        }
    }
}

impl From<OverflowLedger> for Vec<OverflowRecord> {
    fn from(ledger: OverflowLedger) -> Self {
        let mut records: Vec<_> = ledger.records.into_values().collect();
        records.sort_by(|a, b| (a.owner, a.block_begin).cmp(&(b.owner, b.block_begin)));
        records
    }
}

impl OverflowLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&OverflowRecord> {
        self.records.get(id)
    }

    pub fn find(&self, owner: &ChannelId, block_begin: U256) -> Option<&OverflowRecord> {
        self.get(&RecordId::derive(owner, block_begin))
    }

    /// Records owned by `owner`, in no particular order.
    pub fn records_of<'a>(
        &'a self,
        owner: &'a ChannelId,
    ) -> impl Iterator<Item = &'a OverflowRecord> + 'a {
        self.records.values().filter(move |r| r.owner == *owner)
    }

    /// Events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<OverflowEvent> {
        std::mem::take(&mut self.events)
    }

    /// Parks `sequences` for the block starting at `block_begin`, reserving `collateral` from
    /// `owner`. Nothing is created if the reservation fails.
    pub fn create(
        &mut self,
        owner: &ChannelId,
        block_begin: U256,
        sequences: U256,
        collateral: u128,
        vault: &mut dyn CollateralVault,
    ) -> Result<RecordId, WindowError> {
        let id = RecordId::derive(owner, block_begin);
        if self.records.contains_key(&id) {
            return Err(WindowError::RecordExists(id));
        }

        vault.reserve(owner, collateral)?;

        let record = OverflowRecord {
            owner: *owner,
            block_begin,
            sequences,
            collateral,
        };
        info!(
            "overflow record {id} created for channel {owner} at block {block_begin} ({} of {BLOCK_LEN} admitted)",
            sequences.0.iter().map(|w| w.count_ones()).sum::<u32>()
        );
        self.events.push(OverflowEvent::Created {
            owner: *owner,
            block_begin,
            sequences,
            collateral,
        });
        let _ = self.records.insert(id, record);

        Ok(id)
    }

    /// Admits `seq`, which lies behind `caller`'s window, against the record of its block. A record
    /// whose last sequence is admitted here is destroyed and its collateral refunded.
    pub fn admit(
        &mut self,
        caller: &ChannelId,
        seq: U256,
        vault: &mut dyn CollateralVault,
    ) -> Result<(), WindowError> {
        let block_begin = block_of(seq);
        let id = RecordId::derive(caller, block_begin);

        let record = self
            .records
            .get_mut(&id)
            .ok_or(WindowError::AlreadyExecutedOrUnknown(seq))?;
        if record.owner != *caller {
            return Err(WindowError::NotOwner {
                caller: *caller,
                record: id,
            });
        }

        let bit = U256::one() << (seq - block_begin).low_u64() as usize;
        if record.sequences & bit != U256::zero() {
            return Err(WindowError::Replay(seq));
        }
        record.sequences |= bit;

        if record.is_complete() {
            let _ = self.remove(caller, &id, vault)?;
        }

        Ok(())
    }

    /// Removes a record whether or not it is complete and refunds its collateral.
    pub fn destroy(
        &mut self,
        caller: &ChannelId,
        id: &RecordId,
        vault: &mut dyn CollateralVault,
    ) -> Result<OverflowRecord, WindowError> {
        self.remove(caller, id, vault)
    }

    fn remove(
        &mut self,
        caller: &ChannelId,
        id: &RecordId,
        vault: &mut dyn CollateralVault,
    ) -> Result<OverflowRecord, WindowError> {
        match self.records.get(id) {
            None => return Err(WindowError::UnknownRecord(*id)),
            Some(r) if r.owner != *caller => {
                return Err(WindowError::NotOwner {
                    caller: *caller,
                    record: *id,
                })
            }
            Some(_) => {}
        }

        let record = self
            .records
            .remove(id)
            .ok_or(WindowError::UnknownRecord(*id))?;
        vault.refund(&record.owner, record.collateral);

        let completed = record.is_complete();
        info!(
            "overflow record {id} of channel {} destroyed (completed: {completed}), refunded {}",
            record.owner, record.collateral
        );
        self.events.push(OverflowEvent::Destroyed {
            owner: record.owner,
            block_begin: record.block_begin,
            refunded: record.collateral,
            completed,
        });

        Ok(record)
    }
}

/// First sequence of the block `seq` falls in.
pub fn block_of(seq: U256) -> U256 {
    seq & !U256::from(BLOCK_LEN - 1)
}

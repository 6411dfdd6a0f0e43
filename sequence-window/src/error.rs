use primitive_types::U256;
use thiserror::Error;

use crate::{ChannelId, RecordId};

/// Admission failures. Every variant is terminal for the call that produced it and leaves the
/// window, the overflow ledger and the vault exactly as they were.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("sequence {0} has already been admitted")]
    Replay(U256),

    #[error("sequence {0} is behind the window and its block has no overflow record")]
    AlreadyExecutedOrUnknown(U256),

    #[error("expected sequence {expected}, got {actual}")]
    OutOfOrder { expected: U256, actual: U256 },

    #[error("overflow record {record} is not owned by channel {caller}")]
    NotOwner { caller: ChannelId, record: RecordId },

    #[error("overflow record {0} already exists")]
    RecordExists(RecordId),

    #[error("overflow record {0} does not exist")]
    UnknownRecord(RecordId),

    #[error("insufficient collateral: {required} required, {available} available")]
    InsufficientCollateral { required: u128, available: u128 },

    #[error("window start {0} is not a multiple of 256")]
    UnalignedStart(U256),
}

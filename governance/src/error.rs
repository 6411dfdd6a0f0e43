use sequence_window::WindowError;
use thiserror::Error;
use wormhole_vaas::{Address, Chain, MalformedInput, RegistryError, VerificationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Malformed(#[from] MalformedInput),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("VAA was not emitted by the governance contract ({0}, {1})")]
    InvalidGovernanceEmitter(Chain, Address),

    #[error("VAA targets chain {0}")]
    WrongTargetChain(Chain),

    #[error("no emitter {1} is registered for chain {0}")]
    UnregisteredEmitter(Chain, Address),

    #[error("chain {0} already has a registered emitter")]
    ChainAlreadyRegistered(Chain),

    #[error("consistency level {actual} is below the minimum of {required}")]
    ConsistencyTooLow { required: u8, actual: u8 },

    #[error(
        "persisted state hash {} does not match the migration's {}",
        hex::encode(actual),
        hex::encode(expected)
    )]
    StateMismatch { expected: [u8; 32], actual: [u8; 32] },

    #[error("failed to serialize state: {0}")]
    Serialization(String),

    /// Raised by an `ActionExecutor`.
    #[error("action executor failed: {0}")]
    Executor(String),
}

use thiserror::Error;

/// Codec failures. A malformed input is always terminal: the request is rejected and nothing is
/// mutated.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedInput {
    #[error("unexpected end of input: needed {needed} bytes at offset {offset}")]
    Eof { offset: usize, needed: usize },
    #[error("trailing data in input buffer ({0} bytes)")]
    TrailingData(usize),
    #[error("unsupported VAA version {0}")]
    UnsupportedVersion(u8),
    #[error("unknown governance module")]
    UnknownModule,
    #[error("unknown action {action} for module {module}")]
    UnknownAction { module: &'static str, action: u8 },
    #[error("unknown token payload id {0}")]
    UnknownPayload(u8),
    #[error("chain id 0 is not allowed for {0}")]
    InvalidChain(&'static str),
    #[error("duplicate guardian address at position {0}")]
    DuplicateGuardian(usize),
    #[error("guardian set must not be empty")]
    EmptyGuardianSet,
    #[error("{0} is too long to encode ({1} bytes)")]
    TooLong(&'static str, usize),
}

/// Failures of signature quorum verification. No partial credit is given: any one of these
/// rejects the whole VAA.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("guardian set {0} is unknown or expired")]
    UnknownGuardianSet(u32),
    #[error("guardian set {0} is not the current guardian set")]
    NotCurrentGuardianSet(u32),
    #[error("quorum not met: {actual} signatures, {required} required")]
    QuorumNotMet { required: usize, actual: usize },
    #[error("signer indices must be strictly increasing (index {0})")]
    InvalidSignatureOrder(u8),
    #[error("signature from guardian {0} does not match the guardian set")]
    SignatureMismatch(u8),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Guardian sets must increase in steps of 1.
    #[error("invalid guardian set index: expected {expected}, got {actual}")]
    InvalidGuardianSetIndex { expected: u32, actual: u32 },
    #[error(transparent)]
    Malformed(#[from] MalformedInput),
}

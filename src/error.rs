use thiserror::Error;

/// Errors raised by the field layer. These indicate a programming mistake
/// (a bad modulus, mixing elements from two different fields, ...) rather
/// than anything an honest protocol run can trigger at runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("{0} is not a valid prime modulus")]
    InvalidModulus(String),

    #[error("field does not support square roots: modulus is not a Blum prime (p = 3 mod 4)")]
    NotBlum,

    #[error("cannot invert zero")]
    ZeroInverse,

    #[error("elements belong to different fields")]
    FieldMismatch,
}

/// Errors raised while loading a player's configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration file: {0}")]
    Parse(String),

    #[error("no section in the configuration owns a prss_keys subsection")]
    MissingPrssKeys,

    #[error("more than one section in the configuration owns a prss_keys subsection")]
    AmbiguousOwner,

    #[error("malformed player section {0:?}")]
    MalformedPlayerSection(String),

    #[error("malformed prss key entry {0:?}")]
    MalformedPrssKey(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors a protocol precondition check can fail with, e.g. calling `open`
/// with a threshold that would leak information, or `make_field` asked to
/// build a field too small for the configured (l, k, n).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("threshold t = {t} is out of range for n = {n} players (need 0 <= t and 2t < n)")]
    ThresholdOutOfRange { t: usize, n: usize },

    #[error("field modulus too small for bit length {l} security parameter {k} and n = {n} players")]
    FieldTooSmall { l: usize, k: usize, n: usize },

    #[error("not enough points to recombine: need at least {needed}, got {got}")]
    NotEnoughShares { needed: usize, got: usize },

    #[error("duplicate point label {0} among shares supplied to recombine")]
    DuplicatePointLabel(u32),
}

/// Top level runtime error. Any of these, once observed at a `.await` point
/// on a share, is fatal: the runtime aborts and every connection is closed
/// (see SPEC_FULL.md §7).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    #[error("malformed frame from peer {peer}: {reason}")]
    TransportDecode { peer: u32, reason: String },

    #[error("peer announced unexpected id {got}, expected {expected}")]
    UnexpectedPeerId { expected: u32, got: u32 },

    #[error("connection to peer {0} was lost")]
    ConnectionLost(u32),

    #[error("payload of {size} bytes exceeds the {max} byte frame limit")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("a retry loop exceeded its sanity cap of {0} attempts")]
    RetryBudgetExceeded(u32),

    #[error("runtime is shutting down")]
    ShuttingDown,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

//! Error taxonomy for `jsondb` (spec §7).
//!
//! Every fallible public operation returns [`Result<T>`]. Cast failures are
//! the one documented exception: `Node::get`/`Node::set` never fail on a bad
//! cross-type conversion, they fall back to the target type's default.

/// The single error type surfaced by `jsondb`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("expected node of kind {expected}, found {actual}")]
    ShapeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("failed to parse JSON")]
    Parse(#[from] serde_json::Error),

    #[error("no index registered with name {0:?}")]
    UnknownIndex(String),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("B+ tree key must not be null")]
    NullKey,

    #[error("value array already holds elements of type {existing}, cannot add {attempted}")]
    HeterogeneousArray {
        existing: &'static str,
        attempted: &'static str,
    },

    #[error("malformed snapshot line {line_no}: {reason}")]
    CorruptSnapshot { line_no: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

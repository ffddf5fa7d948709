//! Error types for the flip connect 4 enumerator

use thiserror::Error;

/// Every failure the rules engine, the search and the persistence layers can produce.
///
/// None of these are transient: the computation is deterministic, so callers are
/// expected to abort on the first error rather than retry.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid board dimensions {width}x{height} with win amount {win_amount}, all must be positive")]
    InvalidDimensions {
        width: usize,
        height: usize,
        win_amount: usize,
    },

    #[error("invalid move in column {column}: {reason}")]
    InvalidMove { column: usize, reason: &'static str },

    #[error("cannot flip: no placement since the last flip")]
    InvalidFlip,

    #[error("terminal action sequence reported twice: [{actions}]")]
    StructuralViolation { actions: String },

    #[error("game is already over after ply {ply}")]
    GameOver { ply: usize },

    #[error("could not parse '{token}' as an action")]
    ParseAction { token: String },

    #[error("floating piece: empty cell at column {column}, row {row} below the column top")]
    CorruptBoard { column: usize, row: usize },

    #[error("corrupt outcome log: {reason}")]
    CorruptLog { reason: String },

    #[error("search cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

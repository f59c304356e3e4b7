use crate::PieceId;

/// Failures surfaced by graph editing, module lookup and the document codec.
///
/// Arity mismatches and unmapped composite pins are not represented here:
/// they are recovered in place during evaluation and only logged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown piece: {0}")]
    UnknownPiece(PieceId),

    #[error("Piece {piece} has no {direction} pin {index}")]
    NoSuchPin {
        piece: PieceId,
        direction: PinDirection,
        index: usize,
    },

    #[error("Unknown connection: {0}")]
    UnknownConnection(usize),

    #[error("Piece {piece} is not a {expected}")]
    UnexpectedKind {
        piece: PieceId,
        expected: &'static str,
    },

    #[error("Clock period must be greater than zero")]
    InvalidClockPeriod,

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// Combining needs at least one wired input piece and one wired output piece.
    #[error("Nothing to combine: {inputs} input(s), {outputs} output(s)")]
    NothingToCombine { inputs: usize, outputs: usize },

    #[error("Cannot tabulate {0} inputs")]
    TooManyInputs(usize),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

impl std::fmt::Display for PinDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

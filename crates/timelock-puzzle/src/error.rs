use thiserror::Error;
use timelock_types::{Checkpoint, TypesError};

#[derive(Error, Debug)]
pub enum PuzzleError {
    #[error("Puzzle generation failed: {0}")]
    Generation(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Malformed puzzle record: {0}")]
    Parse(String),

    #[error("Calibration failed: {0}")]
    Calibration(String),

    #[error("Malformed ciphertext: {0}")]
    Format(String),

    #[error("Ciphertext failed authentication")]
    Authentication,

    /// The solve was stopped early. Carries the exact progress made.
    #[error("Solve cancelled with {} squarings remaining", .0.remaining())]
    Cancelled(Box<Checkpoint>),
}

impl From<TypesError> for PuzzleError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::InvalidDescriptor(msg) => PuzzleError::InvalidDescriptor(msg),
            TypesError::Parse(msg) => PuzzleError::Parse(msg),
            TypesError::RlpDecode(e) => PuzzleError::Parse(e.to_string()),
        }
    }
}

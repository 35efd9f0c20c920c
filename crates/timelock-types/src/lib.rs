pub mod error;
pub mod puzzle;

pub use error::TypesError;
pub use puzzle::{Checkpoint, PuzzleArtifact, PuzzleDescriptor, SealScheme, SealedPayload};

use std::path::PathBuf;
use timelock_storage::{Config, Storage};

use anyhow::Result;

/// Lists the puzzles in a store with the progress of their best checkpoint.
fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./timelock"));
    let storage = Storage::new(Config::new(path))?;

    for tag in storage.puzzles().artifact_tags()? {
        let artifact = storage.load_artifact(tag)?;
        let steps = artifact.descriptor.steps();
        let sealed = match &artifact.sealed {
            Some(sealed) => format!("{:?}, {} bytes", sealed.scheme, sealed.bytes.len()),
            None => "no payload".to_string(),
        };

        match storage
            .puzzles()
            .latest_checkpoint(artifact.descriptor.cipher_key())?
        {
            Some(checkpoint) => println!(
                "puzzle_{}: {} of {} steps done ({})",
                tag,
                steps.saturating_sub(checkpoint.remaining()),
                steps,
                sealed
            ),
            None => println!("puzzle_{}: not started, {} steps ({})", tag, steps, sealed),
        }
    }

    Ok(())
}

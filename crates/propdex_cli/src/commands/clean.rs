//! Clean command implementation.

use propdex_core::IndexerRegistry;
use std::path::Path;

/// Runs the clean command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if IndexerRegistry::global().cleanup(path)? {
        println!("✓ Removed index at {}", path.display());
    } else {
        println!("Nothing to remove at {}", path.display());
    }
    Ok(())
}

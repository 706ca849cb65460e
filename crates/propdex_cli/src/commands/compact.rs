//! Compact command implementation.

use crate::commands::open_index;
use std::path::Path;

/// Runs the compact command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let index = open_index(path)?;
    let before = index.stats()?;

    println!("Compacting index at {}", path.display());
    println!();

    if before.deleted == 0 {
        println!("No compaction needed - index has no deleted documents");
        return Ok(());
    }

    index.compact()?;
    let after = index.stats()?;

    println!("  Documents:   {}", after.documents);
    println!("  Reclaimed:   {} deleted document(s)", before.deleted);
    println!("  Size before: {} bytes", before.log_bytes);
    println!("  Size after:  {} bytes", after.log_bytes);
    println!(
        "  Space saved: {} bytes ({:.1}%)",
        before.log_bytes.saturating_sub(after.log_bytes),
        if before.log_bytes > 0 {
            (before.log_bytes.saturating_sub(after.log_bytes)) as f64 / before.log_bytes as f64
                * 100.0
        } else {
            0.0
        }
    );
    println!("✓ Compaction complete");

    Ok(())
}

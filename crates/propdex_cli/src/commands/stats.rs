//! Stats command implementation.

use crate::commands::open_index;
use crate::Format;
use std::path::Path;

/// Runs the stats command.
pub fn run(path: &Path, format: Format) -> Result<(), Box<dyn std::error::Error>> {
    let index = open_index(path)?;
    let stats = index.stats()?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Format::Text => {
            println!("Index: {}", stats.location);
            println!();
            println!("Documents:");
            println!("  Live:     {}", stats.documents);
            println!("  Deleted:  {}", stats.deleted);
            println!();
            println!("Terms:");
            println!("  Fields:   {}", stats.fields);
            println!("  Terms:    {}", stats.terms);
            println!();
            println!("Log:");
            println!("  Size:       {} bytes", stats.log_bytes);
            println!("  Generation: {}", stats.generation);
        }
    }

    Ok(())
}

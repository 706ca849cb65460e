//! Dump command implementation.

use crate::commands::{open_index, print_document, DocumentView};
use crate::Format;
use std::path::Path;

/// Runs the dump command.
pub fn run(
    path: &Path,
    limit: Option<usize>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = open_index(path)?;
    let documents = index.documents();
    let views: Vec<DocumentView> = documents
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(DocumentView::from)
        .collect();

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&views)?),
        Format::Text => {
            println!("{} of {} document(s)", views.len(), documents.len());
            for view in &views {
                println!();
                print_document(view);
            }
        }
    }

    Ok(())
}

//! Search command implementation.

use crate::commands::{open_index, print_document, DocumentView};
use crate::Format;
use propdex_core::{HitValue, Indexer};
use serde::Serialize;
use std::path::Path;

/// Parameters of one search.
#[derive(Debug)]
pub struct SearchRequest<'a> {
    /// Entity class to search.
    pub class: &'a str,
    /// Query text.
    pub query: &'a str,
    /// Hits to skip.
    pub offset: usize,
    /// Maximum hits.
    pub limit: usize,
    /// Return stored documents.
    pub raw: bool,
}

#[derive(Debug, Serialize)]
struct HitView {
    id: String,
    score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    document: Option<DocumentView>,
}

#[derive(Debug, Serialize)]
struct SearchView {
    total_hits: usize,
    hits: Vec<HitView>,
}

/// Runs the search command.
pub fn run(
    path: &Path,
    request: &SearchRequest<'_>,
    format: Format,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = open_index(path)?;
    let results = index.search(
        request.class,
        request.query,
        request.offset,
        request.limit,
        request.raw,
    )?;

    let view = SearchView {
        total_hits: results.total_hits(),
        hits: results
            .into_iter()
            .map(|hit| HitView {
                document: match &hit.value {
                    HitValue::Stored(doc) => Some(DocumentView::from(doc)),
                    HitValue::Identifier(_) => None,
                },
                id: hit.id,
                score: hit.score,
            })
            .collect(),
    };

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        Format::Text => {
            println!(
                "{} hit(s), showing {} from offset {}",
                view.total_hits,
                view.hits.len(),
                request.offset
            );
            for hit in &view.hits {
                match &hit.document {
                    Some(doc) => {
                        println!();
                        println!("score {:.4}", hit.score);
                        print_document(doc);
                    }
                    None => println!("  {:<24} {:.4}", hit.id, hit.score),
                }
            }
        }
    }

    Ok(())
}

//! Query model and text syntax.
//!
//! Queries use a subset of the classic Lucene syntax:
//!
//! ```text
//! +entity.class:com.example.Person AND Person.AGE:32
//! Person.NAME:"john smith"^2 -Person.DAY:MONDAY
//! Person.NAME:jo* OR (Person.AGE:32 || Person.AGE:35)
//! ```
//!
//! Parsing produces a [`Query`] tree that indexers evaluate against their
//! own term statistics.

mod parser;

pub use parser::parse;

/// How a clause takes part in a boolean query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match.
    Must,
    /// The clause may match and adds to the score if it does.
    Should,
    /// The clause must not match.
    MustNot,
}

/// One clause of a boolean query.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    /// Participation of the clause.
    pub occur: Occur,
    /// The clause's query.
    pub query: Query,
}

/// A parsed query.
///
/// `field: None` means the query runs against every field.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Matches every document.
    MatchAll,
    /// A value; text fields require every analyzed token of it.
    Term {
        /// Field to search.
        field: Option<String>,
        /// Unescaped value.
        value: String,
    },
    /// Terms starting with a prefix.
    Prefix {
        /// Field to search.
        field: Option<String>,
        /// Unescaped prefix, without the trailing `*`.
        prefix: String,
    },
    /// Tokens at consecutive positions.
    Phrase {
        /// Field to search.
        field: Option<String>,
        /// Unescaped phrase text.
        text: String,
    },
    /// A combination of clauses.
    Boolean(Vec<Clause>),
    /// A query whose score is multiplied by `boost`.
    Boost {
        /// Inner query.
        query: Box<Query>,
        /// Score multiplier.
        boost: f32,
    },
}

impl Query {
    /// Builds a term query on a field.
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Term {
            field: Some(field.into()),
            value: value.into(),
        }
    }

    /// Builds a boolean query requiring every given query.
    #[must_use]
    pub fn all(queries: Vec<Query>) -> Self {
        Self::Boolean(
            queries
                .into_iter()
                .map(|query| Clause {
                    occur: Occur::Must,
                    query,
                })
                .collect(),
        )
    }

    /// Returns true if the query can only ever exclude documents.
    ///
    /// A boolean query made of prohibited clauses alone matches nothing.
    #[must_use]
    pub fn is_purely_negative(&self) -> bool {
        match self {
            Self::Boolean(clauses) => {
                !clauses.is_empty() && clauses.iter().all(|c| c.occur == Occur::MustNot)
            }
            Self::Boost { query, .. } => query.is_purely_negative(),
            _ => false,
        }
    }
}

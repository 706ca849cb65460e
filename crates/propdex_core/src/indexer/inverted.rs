//! In-memory inverted index and query evaluation.
//!
//! Postings are kept per field: `field -> term -> doc -> positions`.
//! Documents are addressed by their insertion slot, so slot order is
//! insertion order and breaks score ties. Deleted slots stay empty until
//! the index is compacted.

use crate::analysis::Analyzer;
use crate::document::{Document, Field, FieldKind, ENTITY_ID_FIELD};
use crate::indexer::log::IndexOp;
use crate::indexer::{HitValue, SearchHit, SearchResults};
use crate::query::{Clause, Occur, Query};
use std::collections::{BTreeMap, BTreeSet, HashSet};

type DocId = usize;
type Scores = BTreeMap<DocId, f32>;

/// Gap between the token positions of two values of one field, so phrases
/// never span values.
const VALUE_POSITION_GAP: u32 = 1;

#[derive(Debug, Clone)]
struct Posting {
    positions: Vec<u32>,
    boost: f32,
}

#[derive(Debug, Clone)]
struct FieldPostings {
    kind: FieldKind,
    terms: BTreeMap<String, BTreeMap<DocId, Posting>>,
}

#[derive(Debug, Clone)]
struct StoredDoc {
    id: String,
    class: String,
    document: Document,
}

/// Searchable index over a set of documents.
#[derive(Debug, Clone)]
pub(crate) struct InvertedIndex {
    analyzer: Analyzer,
    docs: Vec<Option<StoredDoc>>,
    fields: BTreeMap<String, FieldPostings>,
    live: usize,
}

impl InvertedIndex {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer,
            docs: Vec::new(),
            fields: BTreeMap::new(),
            live: 0,
        }
    }

    /// Builds an index over `documents` in order.
    pub fn from_documents<'a>(
        analyzer: Analyzer,
        documents: impl IntoIterator<Item = &'a Document>,
    ) -> Self {
        let mut index = Self::new(analyzer);
        for document in documents {
            index.add(document.clone());
        }
        index
    }

    /// Number of live documents.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of deleted slots awaiting compaction.
    pub fn deleted_count(&self) -> usize {
        self.docs.len() - self.live
    }

    /// Number of distinct fields seen.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Number of distinct (field, term) pairs.
    pub fn term_count(&self) -> usize {
        self.fields.values().map(|f| f.terms.len()).sum()
    }

    /// Live documents in insertion order.
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter().flatten().map(|d| &d.document)
    }

    /// A copy with deleted slots squeezed out.
    pub fn compacted(&self) -> Self {
        Self::from_documents(self.analyzer.clone(), self.documents())
    }

    /// Applies one logged operation.
    pub fn apply(&mut self, op: IndexOp) {
        match op {
            IndexOp::Add(document) => {
                self.add(document);
            }
            IndexOp::Update { id_field, document } => {
                if let (Some(class), Some(value)) =
                    (document.entity_class(), document.get_text(&id_field))
                {
                    self.delete_matching(&class, &id_field, &value);
                }
                self.add(document);
            }
            IndexOp::Delete { id, class } => {
                self.delete_matching(&class, ENTITY_ID_FIELD, &id);
            }
            IndexOp::Commit { .. } => {}
        }
    }

    /// Adds a document and returns its slot.
    pub fn add(&mut self, document: Document) -> DocId {
        let doc_id = self.docs.len();
        self.index_fields(doc_id, &document);

        let stored = StoredDoc {
            id: document.entity_id().unwrap_or_default(),
            class: document.entity_class().unwrap_or_default(),
            document,
        };
        self.docs.push(Some(stored));
        self.live += 1;
        doc_id
    }

    fn index_fields(&mut self, doc_id: DocId, document: &Document) {
        let mut offsets: BTreeMap<&str, u32> = BTreeMap::new();
        for (name, field) in document.fields() {
            let base = offsets.entry(name).or_insert(0);
            let terms = field_terms(&self.analyzer, field);
            let width = terms.iter().map(|(_, p)| p + 1).max().unwrap_or(0);

            let postings = self
                .fields
                .entry(name.to_string())
                .or_insert_with(|| FieldPostings {
                    kind: field.kind,
                    terms: BTreeMap::new(),
                });
            for (term, position) in terms {
                let posting = postings
                    .terms
                    .entry(term)
                    .or_default()
                    .entry(doc_id)
                    .or_insert_with(|| Posting {
                        positions: Vec::new(),
                        boost: field.boost,
                    });
                posting.positions.push(*base + position);
                posting.boost = posting.boost.max(field.boost);
            }
            *base += width + VALUE_POSITION_GAP;
        }
    }

    /// Deletes the document in `doc_id`. Returns false if already empty.
    pub fn delete(&mut self, doc_id: DocId) -> bool {
        let Some(stored) = self.docs.get_mut(doc_id).and_then(Option::take) else {
            return false;
        };
        for (name, field) in stored.document.fields() {
            let Some(postings) = self.fields.get_mut(name) else {
                continue;
            };
            for (term, _) in field_terms(&self.analyzer, field) {
                if let Some(docs) = postings.terms.get_mut(&term) {
                    docs.remove(&doc_id);
                    if docs.is_empty() {
                        postings.terms.remove(&term);
                    }
                }
            }
        }
        self.fields.retain(|_, postings| !postings.terms.is_empty());
        self.live -= 1;
        true
    }

    /// Deletes the documents of `class` having `value` in `field`.
    pub fn delete_matching(&mut self, class: &str, field: &str, value: &str) -> usize {
        let victims: Vec<DocId> = self
            .candidates(field, value)
            .into_iter()
            .filter(|&doc_id| {
                self.docs[doc_id].as_ref().is_some_and(|stored| {
                    stored.class == class
                        && stored.document.get_all(field).any(|f| f.text() == value)
                })
            })
            .collect();
        for &doc_id in &victims {
            self.delete(doc_id);
        }
        victims.len()
    }

    fn candidates(&self, field: &str, value: &str) -> Vec<DocId> {
        match self.fields.get(field) {
            Some(postings) if postings.kind == FieldKind::Keyword => postings
                .terms
                .get(value)
                .map(|docs| docs.keys().copied().collect())
                .unwrap_or_default(),
            Some(_) => self.live_ids().collect(),
            None => Vec::new(),
        }
    }

    fn live_ids(&self) -> impl Iterator<Item = DocId> + '_ {
        self.docs
            .iter()
            .enumerate()
            .filter_map(|(doc_id, slot)| slot.as_ref().map(|_| doc_id))
    }

    /// Evaluates `query` within `entity_class` and returns one page.
    pub fn search(
        &self,
        entity_class: &str,
        query: &Query,
        offset: usize,
        limit: usize,
        fetch_raw: bool,
    ) -> SearchResults {
        let mut ranked: Vec<(DocId, f32)> = self
            .evaluate(query)
            .into_iter()
            .filter(|(doc_id, _)| {
                self.docs[*doc_id]
                    .as_ref()
                    .is_some_and(|stored| stored.class == entity_class)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut seen = HashSet::new();
        let unique: Vec<(&StoredDoc, f32)> = ranked
            .into_iter()
            .filter_map(|(doc_id, score)| {
                let stored = self.docs[doc_id].as_ref()?;
                seen.insert(stored.id.as_str()).then_some((stored, score))
            })
            .collect();

        let total = unique.len();
        let hits = unique
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(stored, score)| SearchHit {
                id: stored.id.clone(),
                score,
                value: if fetch_raw {
                    HitValue::Stored(stored.document.clone())
                } else {
                    HitValue::Identifier(stored.id.clone())
                },
            })
            .collect();
        SearchResults::new(hits, total)
    }

    fn evaluate(&self, query: &Query) -> Scores {
        match query {
            Query::MatchAll => self.live_ids().map(|doc_id| (doc_id, 1.0)).collect(),
            Query::Term { field, value } => {
                self.across_fields(field.as_deref(), |name| self.match_value(name, value, false))
            }
            Query::Phrase { field, text } => {
                self.across_fields(field.as_deref(), |name| self.match_value(name, text, true))
            }
            Query::Prefix { field, prefix } => {
                self.across_fields(field.as_deref(), |name| self.match_prefix(name, prefix))
            }
            Query::Boolean(clauses) => self.evaluate_boolean(clauses),
            Query::Boost { query, boost } => {
                let mut scores = self.evaluate(query);
                for score in scores.values_mut() {
                    *score *= boost;
                }
                scores
            }
        }
    }

    fn across_fields(&self, field: Option<&str>, matcher: impl Fn(&str) -> Scores) -> Scores {
        match field {
            Some(name) => matcher(name),
            None => {
                let mut total = Scores::new();
                for name in self.fields.keys() {
                    for (doc_id, score) in matcher(name) {
                        *total.entry(doc_id).or_insert(0.0) += score;
                    }
                }
                total
            }
        }
    }

    fn match_value(&self, field: &str, value: &str, phrase: bool) -> Scores {
        let Some(postings) = self.fields.get(field) else {
            return Scores::new();
        };
        let terms = match postings.kind {
            FieldKind::Keyword => vec![value.to_string()],
            FieldKind::Text => self.analyzer.terms(value),
        };
        if terms.is_empty() {
            return Scores::new();
        }
        let Some(lists) = terms
            .iter()
            .map(|term| postings.terms.get(term))
            .collect::<Option<Vec<_>>>()
        else {
            return Scores::new();
        };

        let mut scores = Scores::new();
        for (&doc_id, _) in lists[0] {
            let per_term: Option<Vec<&Posting>> =
                lists.iter().map(|docs| docs.get(&doc_id)).collect();
            let Some(per_term) = per_term else {
                continue;
            };
            if phrase && !consecutive(&per_term) {
                continue;
            }
            let score: f32 = per_term
                .iter()
                .zip(&lists)
                .map(|(posting, docs)| self.term_score(posting, docs.len()))
                .sum();
            scores.insert(doc_id, score);
        }
        scores
    }

    fn match_prefix(&self, field: &str, prefix: &str) -> Scores {
        let Some(postings) = self.fields.get(field) else {
            return Scores::new();
        };
        let prefix = match postings.kind {
            FieldKind::Keyword => prefix.to_string(),
            FieldKind::Text => self.analyzer.normalize(prefix),
        };
        let mut scores = Scores::new();
        let expansions = postings
            .terms
            .range(prefix.clone()..)
            .take_while(|(term, _)| term.starts_with(&prefix));
        for (_, docs) in expansions {
            for (&doc_id, posting) in docs {
                let score = scores.entry(doc_id).or_insert(0.0);
                *score = score.max(posting.boost);
            }
        }
        scores
    }

    fn evaluate_boolean(&self, clauses: &[Clause]) -> Scores {
        let mut must: Vec<Scores> = Vec::new();
        let mut should: Vec<Scores> = Vec::new();
        let mut excluded: BTreeSet<DocId> = BTreeSet::new();
        for clause in clauses {
            let scores = self.evaluate(&clause.query);
            match clause.occur {
                Occur::Must => must.push(scores),
                Occur::Should => should.push(scores),
                Occur::MustNot => excluded.extend(scores.into_keys()),
            }
        }

        let mut result = if must.is_empty() {
            let mut union = Scores::new();
            for scores in &should {
                for (&doc_id, &score) in scores {
                    *union.entry(doc_id).or_insert(0.0) += score;
                }
            }
            union
        } else {
            let mut iter = must.into_iter();
            let mut result = iter.next().unwrap_or_default();
            for scores in iter {
                result.retain(|doc_id, _| scores.contains_key(doc_id));
                for (doc_id, score) in result.iter_mut() {
                    *score += scores.get(doc_id).copied().unwrap_or(0.0);
                }
            }
            for scores in &should {
                for (doc_id, score) in result.iter_mut() {
                    *score += scores.get(doc_id).copied().unwrap_or(0.0);
                }
            }
            result
        };
        result.retain(|doc_id, _| !excluded.contains(doc_id));
        result
    }

    /// `boost × idf × √tf`, with `idf = 1 + ln(N / (df + 1))`.
    fn term_score(&self, posting: &Posting, doc_freq: usize) -> f32 {
        let n = self.live as f32;
        let idf = 1.0 + (n / (doc_freq as f32 + 1.0)).ln();
        let tf = posting.positions.len() as f32;
        posting.boost * idf * tf.sqrt()
    }
}

fn field_terms(analyzer: &Analyzer, field: &Field) -> Vec<(String, u32)> {
    match field.kind {
        FieldKind::Keyword => vec![(field.text(), 0)],
        FieldKind::Text => analyzer
            .tokens(&field.text())
            .into_iter()
            .map(|t| (t.text, t.position))
            .collect(),
    }
}

fn consecutive(postings: &[&Posting]) -> bool {
    let Some((first, rest)) = postings.split_first() else {
        return false;
    };
    first.positions.iter().any(|&start| {
        rest.iter()
            .zip(1u32..)
            .all(|(posting, step)| posting.positions.contains(&(start + step)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ENTITY_CLASS_FIELD;
    use crate::query::parse;

    const PERSON: &str = "com.example.Person";

    fn person(id: &str, name: &str, age: i32) -> Document {
        let mut doc = Document::new();
        doc.add_keyword(ENTITY_CLASS_FIELD, PERSON);
        doc.add_keyword(ENTITY_ID_FIELD, id);
        doc.add_text("Person.NAME", name, 1.0);
        doc.add_text("Person.AGE", age, 1.0);
        doc
    }

    fn index(docs: &[Document]) -> InvertedIndex {
        InvertedIndex::from_documents(Analyzer::default(), docs)
    }

    fn ids(index: &InvertedIndex, query: &str) -> Vec<String> {
        index
            .search(PERSON, &parse(query).unwrap(), 0, 100, false)
            .ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn term_and_boolean_queries() {
        let index = index(&[
            person("p1", "John Smith", 32),
            person("p2", "Jane Smith", 35),
            person("p3", "John Doe", 32),
        ]);
        assert_eq!(ids(&index, "Person.AGE:32"), vec!["p1", "p3"]);
        assert_eq!(ids(&index, "Person.NAME:john AND Person.AGE:32"), vec!["p1", "p3"]);
        assert_eq!(ids(&index, "Person.NAME:smith -Person.AGE:35"), vec!["p1"]);
        assert_eq!(ids(&index, "+entity.class:com.example.Person +Person.NAME:doe"), vec!["p3"]);
        assert!(ids(&index, "Person.AGE:40").is_empty());
        assert!(ids(&index, "-Person.AGE:32").is_empty());
        assert_eq!(ids(&index, "*:*").len(), 3);
    }

    #[test]
    fn unqualified_terms_search_all_fields() {
        let index = index(&[person("p1", "John Smith", 32), person("p2", "Ann Lee", 35)]);
        assert_eq!(ids(&index, "lee"), vec!["p2"]);
        assert_eq!(ids(&index, "32"), vec!["p1"]);
    }

    #[test]
    fn phrases_need_adjacent_tokens() {
        let index = index(&[
            person("p1", "John Smith", 32),
            person("p2", "Smith John", 35),
        ]);
        assert_eq!(ids(&index, "Person.NAME:\"john smith\""), vec!["p1"]);
        assert_eq!(ids(&index, "Person.NAME:(john smith)").len(), 2);
    }

    #[test]
    fn prefix_queries() {
        let index = index(&[person("p1", "Johnny", 32), person("p2", "Jane", 35)]);
        assert_eq!(ids(&index, "Person.NAME:JOH*"), vec!["p1"]);
        assert_eq!(ids(&index, "Person.NAME:j*").len(), 2);
    }

    #[test]
    fn keyword_fields_match_exactly() {
        let index = index(&[person("AB-123", "x", 1)]);
        assert_eq!(ids(&index, "entity.id:AB-123"), vec!["AB-123"]);
        assert!(ids(&index, "entity.id:ab-123").is_empty());
    }

    #[test]
    fn boost_ranks_higher() {
        let mut heavy = Document::new();
        heavy.add_keyword(ENTITY_CLASS_FIELD, PERSON);
        heavy.add_keyword(ENTITY_ID_FIELD, "heavy");
        heavy.add_text("Person.NAME", "ann", 3.0);
        let index = index(&[person("light", "ann", 1), heavy]);
        assert_eq!(ids(&index, "Person.NAME:ann"), vec!["heavy", "light"]);
        assert_eq!(
            ids(&index, "Person.NAME:ann OR entity.id:light^10"),
            vec!["light", "heavy"]
        );
    }

    #[test]
    fn ties_keep_insertion_order_and_pages_slice() {
        let docs: Vec<Document> = (0..5).map(|i| person(&format!("p{i}"), "same", 1)).collect();
        let index = index(&docs);
        let query = parse("Person.NAME:same").unwrap();
        let page = index.search(PERSON, &query, 1, 2, false);
        assert_eq!(page.ids(), vec!["p1", "p2"]);
        assert_eq!(page.total_hits(), 5);
        assert!(index.search(PERSON, &query, 10, 2, false).is_empty());
    }

    #[test]
    fn scoped_by_class() {
        let mut robot = Document::new();
        robot.add_keyword(ENTITY_CLASS_FIELD, "com.example.Robot");
        robot.add_keyword(ENTITY_ID_FIELD, "r1");
        robot.add_text("Person.NAME", "John", 1.0);
        let index = index(&[person("p1", "John", 32), robot]);
        assert_eq!(ids(&index, "Person.NAME:john"), vec!["p1"]);
    }

    #[test]
    fn deletes_and_compaction() {
        let mut index = index(&[
            person("p1", "John", 32),
            person("p2", "Jane", 35),
            person("p1", "John", 32),
        ]);
        assert_eq!(index.delete_matching(PERSON, ENTITY_ID_FIELD, "p1"), 2);
        assert_eq!(index.live_count(), 1);
        assert_eq!(index.deleted_count(), 2);
        assert!(ids(&index, "Person.NAME:john").is_empty());
        assert_eq!(index.delete_matching(PERSON, ENTITY_ID_FIELD, "p1"), 0);

        let compacted = index.compacted();
        assert_eq!(compacted.live_count(), 1);
        assert_eq!(compacted.deleted_count(), 0);
        assert_eq!(ids(&compacted, "Person.AGE:35"), vec!["p2"]);
    }

    #[test]
    fn update_replaces_by_field() {
        let mut index = index(&[person("p1", "John", 32)]);
        index.apply(IndexOp::Update {
            id_field: ENTITY_ID_FIELD.to_string(),
            document: person("p1", "John", 35),
        });
        assert_eq!(index.live_count(), 1);
        assert!(ids(&index, "Person.AGE:32").is_empty());
        assert_eq!(ids(&index, "Person.AGE:35"), vec!["p1"]);
    }

    #[test]
    fn duplicate_identifiers_collapse_in_results() {
        let index = index(&[person("p1", "John", 32), person("p1", "John", 32)]);
        assert_eq!(index.live_count(), 2);
        assert_eq!(ids(&index, "Person.NAME:john"), vec!["p1"]);
    }
}

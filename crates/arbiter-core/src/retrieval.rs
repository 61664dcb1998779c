//! Retrieval collaborator contract and the in-memory keyword index

use arbiter_model::{Document, Metadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    /// Matched text
    pub content: String,
    /// Metadata of the source document
    #[serde(default)]
    pub metadata: Metadata,
    /// Similarity in `[0.0, 1.0]`
    pub score: f64,
}

impl RetrievedCandidate {
    /// Candidate built from a document
    #[must_use]
    pub fn from_document(document: &Document, score: f64) -> Self {
        Self {
            content: document.content().to_string(),
            metadata: document.metadata().clone(),
            score,
        }
    }
}

/// Failures at the retrieval boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    /// Backend could not be reached
    #[error("retrieval backend unavailable: {0}")]
    Unavailable(String),

    /// Search did not finish in time
    #[error("retrieval timed out after {secs}s")]
    Timeout {
        /// Elapsed limit
        secs: u64,
    },

    /// Backend answered with an error
    #[error("retrieval backend error: {0}")]
    Backend(String),
}

impl RetrievalError {
    /// Transient failures a caller may retry
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout { .. })
    }
}

/// Similarity search over the knowledge base
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Up to `k` candidates for `query`, best first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedCandidate>, RetrievalError>;
}

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "best", "by", "for", "find", "from", "how", "in",
    "is", "it", "of", "on", "or", "the", "to", "what", "which", "with",
];

/// Lowercased alphanumeric terms, stop words and single characters removed
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
struct Entry {
    document: Document,
    terms: HashSet<String>,
}

/// In-memory lexical index
///
/// A document's score is the fraction of query terms it contains, so scores
/// fall in `[0.0, 1.0]`. Documents sharing no term with the query are not
/// returned. Equal scores keep insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    entries: Vec<Entry>,
}

impl KeywordIndex {
    /// Empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the given documents in order
    #[must_use]
    pub fn from_documents(documents: &[Document]) -> Self {
        let mut index = Self::new();
        for document in documents {
            index.insert(document.clone());
        }
        index
    }

    /// Add one document
    pub fn insert(&mut self, document: Document) {
        let mut terms = tokenize(document.content());
        for value in document.metadata().values() {
            if let Some(text) = value.as_str() {
                terms.extend(tokenize(text));
            }
        }
        self.entries.push(Entry { document, terms });
    }

    /// Number of indexed documents
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synchronous ranking used by the [`Retriever`] impl
    #[must_use]
    pub fn rank(&self, query: &str, k: usize) -> Vec<RetrievedCandidate> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || k == 0 {
            return Vec::new();
        }

        #[allow(clippy::cast_precision_loss)]
        let total = query_terms.len() as f64;
        let mut scored: Vec<(f64, &Entry)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let hits = query_terms.intersection(&entry.terms).count();
                #[allow(clippy::cast_precision_loss)]
                let score = hits as f64 / total;
                (hits > 0).then_some((score, entry))
            })
            .collect();

        // stable: ties keep insertion order
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| RetrievedCandidate::from_document(&entry.document, score))
            .collect()
    }
}

#[async_trait]
impl Retriever for KeywordIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedCandidate>, RetrievalError> {
        let hits = self.rank(query, k);
        tracing::debug!(documents = self.len(), hits = hits.len(), "keyword search");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(content: &str) -> Document {
        Document::new(content, Metadata::new()).unwrap()
    }

    #[test]
    fn tokenize_drops_noise() {
        let terms = tokenize("Find the BEST low-risk bond, a 5% yield!");
        assert!(terms.contains("low"));
        assert!(terms.contains("risk"));
        assert!(terms.contains("bond"));
        assert!(terms.contains("yield"));
        assert!(!terms.contains("the"));
        assert!(!terms.contains("best"));
        assert!(!terms.contains("5"));
    }

    #[test]
    fn ranks_by_overlap_then_insertion() {
        let index = KeywordIndex::from_documents(&[
            doc("Stock index fund, high growth"),
            doc("Government bond fund, low risk"),
            doc("Corporate bond fund, moderate risk"),
            doc("Gardening tools"),
        ]);

        let hits = index.rank("low risk bond", 10);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "Government bond fund, low risk");
        assert!((hits[0].score - 1.0).abs() < f64::EPSILON);
        assert_eq!(hits[1].content, "Corporate bond fund, moderate risk");
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.score)));
    }

    #[test]
    fn respects_k() {
        let index = KeywordIndex::from_documents(&[doc("bond a"), doc("bond b"), doc("bond c")]);
        let hits = index.rank("bond", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "bond a");
        assert!(index.rank("bond", 0).is_empty());
    }

    #[test]
    fn metadata_text_is_searchable() {
        let mut metadata = Metadata::new();
        metadata.insert("title".into(), json!("Treasury ladder"));
        let index = KeywordIndex::from_documents(&[Document::new("Short maturities", metadata).unwrap()]);

        let hits = index.rank("treasury", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.get("title"), Some(&json!("Treasury ladder")));
    }

    #[test]
    fn stop_word_query_finds_nothing() {
        let index = KeywordIndex::from_documents(&[doc("the best of the best")]);
        assert!(index.rank("the best", 5).is_empty());
    }

    #[tokio::test]
    async fn search_delegates_to_rank() {
        let index = KeywordIndex::from_documents(&[doc("bond fund")]);
        let hits = index.search("bond", 5).await.unwrap();
        assert_eq!(hits, index.rank("bond", 5));
    }

    #[test]
    fn retryable_errors() {
        assert!(RetrievalError::Timeout { secs: 5 }.is_retryable());
        assert!(RetrievalError::Unavailable("down".into()).is_retryable());
        assert!(!RetrievalError::Backend("bad query".into()).is_retryable());
    }
}

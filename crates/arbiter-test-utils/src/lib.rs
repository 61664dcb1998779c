//! Testing utilities for the Arbiter workspace
//!
//! Scripted collaborators, fixtures and shared assertions.

#![allow(missing_docs)]

use arbiter_core::{GenerationError, Generator, RetrievalError, RetrievedCandidate, Retriever};
use arbiter_kernel::AgentState;
use arbiter_model::{Document, Metadata};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

pub fn investment_query() -> &'static str {
    "Find best investment option"
}

/// Three investment products with `id`, `title` and `risk` metadata
pub fn sample_documents() -> Vec<Document> {
    [
        ("bonds", "Government bonds", "Government bond fund, a low risk investment with steady income", "low"),
        ("index", "Index fund", "Broad stock index fund for long term investment growth", "medium"),
        ("crypto", "Crypto basket", "Basket of crypto assets, speculative investment option", "high"),
    ]
    .into_iter()
    .map(|(id, title, content, risk)| {
        let mut metadata = Metadata::new();
        metadata.insert("id".into(), json!(id));
        metadata.insert("title".into(), json!(title));
        metadata.insert("risk".into(), json!(risk));
        Document::new(content, metadata).unwrap()
    })
    .collect()
}

pub fn investment_state() -> AgentState {
    AgentState::create(investment_query(), sample_documents()).unwrap()
}

/// A well-formed analysis response
pub fn analysis_response(summary: &str, confidence: f64) -> String {
    format!("PROS:\n- Clear upside\nCONS:\n- Some downside\nSUMMARY: {summary}\nCONFIDENCE: {confidence}")
}

pub fn candidate(id: &str, content: &str, score: f64) -> RetrievedCandidate {
    let mut metadata = Metadata::new();
    metadata.insert("id".into(), json!(id));
    RetrievedCandidate {
        content: content.to_string(),
        metadata,
        score,
    }
}

struct Rule {
    needle: String,
    reply: Result<String, GenerationError>,
    remaining: Option<u32>,
}

/// Generator answering from substring rules
///
/// Rules are checked in insertion order; the first whose needle occurs in the
/// prompt and that has uses left answers. Otherwise the fallback answers.
pub struct ScriptedGenerator {
    rules: Mutex<Vec<Rule>>,
    fallback: Result<String, GenerationError>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: Ok(fallback.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with `error` unless a rule matches
    pub fn failing(error: GenerationError) -> Self {
        Self {
            rules: Mutex::new(Vec::new()),
            fallback: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn push(self, needle: &str, reply: Result<String, GenerationError>, remaining: Option<u32>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            needle: needle.to_string(),
            reply,
            remaining,
        });
        self
    }

    pub fn when(self, needle: &str, response: impl Into<String>) -> Self {
        self.push(needle, Ok(response.into()), None)
    }

    pub fn fail_when(self, needle: &str, error: GenerationError) -> Self {
        self.push(needle, Err(error), None)
    }

    /// Fail the first `times` matching calls, then fall through
    pub fn fail_times(self, needle: &str, times: u32, error: GenerationError) -> Self {
        self.push(needle, Err(error), Some(times))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut rules = self.rules.lock().unwrap();
        for rule in rules.iter_mut() {
            if !prompt.contains(&rule.needle) || rule.remaining == Some(0) {
                continue;
            }
            if let Some(left) = rule.remaining.as_mut() {
                *left -= 1;
            }
            return rule.reply.clone();
        }
        self.fallback.clone()
    }
}

/// Retriever returning a fixed candidate list
pub struct StaticRetriever {
    candidates: Vec<RetrievedCandidate>,
    calls: Mutex<Vec<(String, usize)>>,
}

impl StaticRetriever {
    pub fn new(candidates: Vec<RetrievedCandidate>) -> Self {
        Self {
            candidates,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Candidates for `documents` with scores 0.9, 0.8, ... in order
    pub fn from_documents(documents: &[Document]) -> Self {
        let candidates = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| {
                #[allow(clippy::cast_precision_loss)]
                let score = (0.9 - 0.1 * i as f64).max(0.0);
                RetrievedCandidate::from_document(doc, score)
            })
            .collect();
        Self::new(candidates)
    }

    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedCandidate>, RetrievalError> {
        self.calls.lock().unwrap().push((query.to_string(), k));
        Ok(self.candidates.iter().take(k).cloned().collect())
    }
}

/// Retriever failing a number of times before answering
pub struct FailingRetriever {
    error: RetrievalError,
    remaining: Mutex<Option<u32>>,
    then: Vec<RetrievedCandidate>,
}

impl FailingRetriever {
    pub fn always(error: RetrievalError) -> Self {
        Self {
            error,
            remaining: Mutex::new(None),
            then: Vec::new(),
        }
    }

    pub fn failing_first(times: u32, error: RetrievalError, then: Vec<RetrievedCandidate>) -> Self {
        Self {
            error,
            remaining: Mutex::new(Some(times)),
            then,
        }
    }
}

#[async_trait]
impl Retriever for FailingRetriever {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedCandidate>, RetrievalError> {
        let mut remaining = self.remaining.lock().unwrap();
        match *remaining {
            None => Err(self.error.clone()),
            Some(0) => Ok(self.then.iter().take(k).cloned().collect()),
            Some(ref mut left) => {
                *left -= 1;
                Err(self.error.clone())
            }
        }
    }
}

/// Every recommendation's option id matches its analysis and ranks run 1..=n
pub fn assert_consistent_ranking(state: &AgentState) {
    for (i, rec) in state.recommendations().iter().enumerate() {
        assert_eq!(rec.option().id(), rec.analysis().option_id());
        assert_eq!(rec.rank() as usize, i + 1);
    }
    let scores: Vec<f64> = state.recommendations().iter().map(|r| r.score()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]), "scores not descending: {scores:?}");
}

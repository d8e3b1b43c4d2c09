//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use edgequake_retrieval::{
    Document, RankedList, Result, RetrievalError, RetrievalSource, SearchOptions, VectorRetriever,
};

/// Ten short n8n documentation snippets.
pub fn n8n_corpus() -> Vec<Document> {
    [
        "The Webhook node in n8n receives HTTP requests and triggers workflows automatically.",
        "Slack integration allows sending messages to channels and direct messages in n8n.",
        "HTTP Request node makes API calls to external services with authentication support.",
        "Gmail node integrates with Gmail to send and receive emails in workflows.",
        "The Set node transforms and manipulates data in your n8n workflow.",
        "Webhook triggers are essential for event-driven automation in n8n.",
        "Function node allows writing custom JavaScript code for data processing.",
        "Slack notifications can be automated based on specific workflow conditions.",
        "Database nodes like PostgreSQL enable data storage and retrieval.",
        "Cron triggers schedule workflows to run automatically at specific times.",
    ]
    .iter()
    .enumerate()
    .map(|(i, text)| Document::new((i + 1).to_string(), *text))
    .collect()
}

/// Keyword-counting vector retriever.
///
/// Score = 0.3 per query keyword contained in the text, plus 0.001 × id
/// so no two documents share a score.
pub struct KeywordVectorRetriever {
    corpus: Arc<[Document]>,
    keywords: Vec<&'static str>,
    expose_corpus: bool,
    calls: AtomicUsize,
}

impl KeywordVectorRetriever {
    pub fn new(corpus: Vec<Document>) -> Self {
        Self {
            corpus: corpus.into(),
            keywords: vec!["webhook", "slack", "notification"],
            expose_corpus: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn hide_corpus(mut self) -> Self {
        self.expose_corpus = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorRetriever for KeywordVectorRetriever {
    async fn search(&self, _query: &str, options: &SearchOptions) -> Result<RankedList> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut scored: Vec<(Document, f64)> = self
            .corpus
            .iter()
            .map(|doc| {
                let lowered = doc.text.to_lowercase();
                let hits = self.keywords.iter().filter(|k| lowered.contains(*k)).count();
                let id: f64 = doc.id.parse().unwrap_or(0.0);
                (doc.clone(), 0.3 * hits as f64 + 0.001 * id)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        scored.truncate(options.limit);

        Ok(RankedList::from_scored(RetrievalSource::Vector, scored))
    }

    fn document_corpus(&self) -> Option<Arc<[Document]>> {
        self.expose_corpus.then(|| Arc::clone(&self.corpus))
    }
}

/// Vector retriever that always fails.
pub struct FailingVectorRetriever;

#[async_trait]
impl VectorRetriever for FailingVectorRetriever {
    async fn search(&self, _query: &str, _options: &SearchOptions) -> Result<RankedList> {
        Err(RetrievalError::VectorSearch("connection refused".to_string()))
    }

    fn document_corpus(&self) -> Option<Arc<[Document]>> {
        Some(n8n_corpus().into())
    }
}

pub fn ids(results: &[edgequake_retrieval::RerankedDocument]) -> Vec<&str> {
    results.iter().map(|r| r.document.id.as_str()).collect()
}

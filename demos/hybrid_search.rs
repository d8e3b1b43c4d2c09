//! Hybrid search example
//!
//! Run with: cargo run --example hybrid_search
//! Set RUST_LOG=edgequake_retrieval=debug to see pipeline logs.
//!
//! Uses the offline mock embedder, so no API key is needed.

use std::sync::Arc;

use edgequake_retrieval::{
    Document, FusionMethod, HybridRetriever, InMemoryVectorRetriever,
    MockEmbeddingProvider, Reranker, RetrievalConfig, RetrieveOptions,
};
use tracing_subscriber::EnvFilter;

const DOCS: &[&str] = &[
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
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let documents: Vec<Document> = DOCS
        .iter()
        .enumerate()
        .map(|(i, text)| Document::new((i + 1).to_string(), *text))
        .collect();

    let provider = Arc::new(MockEmbeddingProvider::new());
    let vector = Arc::new(InMemoryVectorRetriever::new(provider.clone(), documents));

    let config = RetrievalConfig::default()
        .with_fusion_method(FusionMethod::Rrf)
        .with_k(10, 5)
        .with_diversity(0.7);
    let reranker: Arc<dyn Reranker> = Arc::new(config.hybrid_reranker(provider));
    let retriever = HybridRetriever::new(vector, Some(reranker), config)?;

    println!("EdgeQuake Retrieval - Hybrid Search Example\n");

    for query in ["webhook slack notification", "send email from a workflow"] {
        let response = retriever.retrieve(query, RetrieveOptions::new()).await?;

        println!("Query: {query}");
        for (rank, doc) in response.results.iter().enumerate() {
            println!(
                "  {}. [{}] {:.4}  {}",
                rank + 1,
                doc.document.id,
                doc.final_score,
                doc.document.text
            );
        }
        println!(
            "  vector={} bm25={} fused={} reranked={} ({:?})\n",
            response.metadata.vector_count,
            response.metadata.bm25_count,
            response.metadata.fused_count,
            response.metadata.reranked,
            response.metadata.duration
        );
    }

    let stats = retriever.stats();
    println!(
        "Stats: {} retrievals, {} rerank calls, {} fallbacks, avg fusion score {:.4}",
        stats.retrievals, stats.rerank_calls, stats.rerank_fallbacks, stats.avg_fusion_score
    );
    if let Some(rerank) = retriever.rerank_stats() {
        println!(
            "Rerank: {} documents, cache hit rate {:.2}",
            rerank.documents_reranked, rerank.cache_hit_rate
        );
    }

    Ok(())
}

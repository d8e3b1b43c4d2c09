//! Embedding provider and vector retriever implementations.

pub mod memory;
pub use memory::InMemoryVectorRetriever;

pub mod mock;
pub use mock::MockEmbeddingProvider;

pub mod openai;
pub use openai::{OpenAIEmbeddingProvider, OpenAIEmbeddingProviderBuilder};

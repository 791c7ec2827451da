//! Medical knowledge base: chunked reference text with embeddings, searched
//! by cosine similarity.

pub mod chunker;
pub mod index;
pub mod retriever;

pub use chunker::TextSplitter;
pub use index::{cosine_similarity, IndexedChunk, KnowledgeIndex};
pub use retriever::{open_retriever, EmbeddingRetriever, MedicalRetriever};

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid knowledge index: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] LlmError),

    #[error("No text documents found under {0}")]
    NoDocuments(PathBuf),
}

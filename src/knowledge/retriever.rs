use std::sync::Arc;

use super::{KnowledgeError, KnowledgeIndex};
use crate::config::Config;
use crate::llm::LlmClient;

/// Similarity search over medical reference text.
///
/// `Ok(None)` means nothing relevant was found.
pub trait MedicalRetriever: Send + Sync {
    fn search(&self, query: &str, top_k: usize) -> Result<Option<String>, KnowledgeError>;
}

/// Embeds the query with the same model that built the index, then returns
/// the nearest chunks joined by a blank line.
pub struct EmbeddingRetriever {
    index: KnowledgeIndex,
    embedder: Arc<dyn LlmClient>,
}

impl EmbeddingRetriever {
    pub fn new(index: KnowledgeIndex, embedder: Arc<dyn LlmClient>) -> Self {
        Self { index, embedder }
    }
}

impl MedicalRetriever for EmbeddingRetriever {
    fn search(&self, query: &str, top_k: usize) -> Result<Option<String>, KnowledgeError> {
        if self.index.is_empty() || query.trim().is_empty() {
            return Ok(None);
        }
        let embedding = self.embedder.embed(&self.index.embedding_model, query)?;
        let hits = self.index.nearest(&embedding, top_k);
        if hits.is_empty() {
            return Ok(None);
        }
        Ok(Some(
            hits.iter()
                .map(|c| c.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n"),
        ))
    }
}

/// Load the configured index. A missing or unreadable index disables retrieval.
pub fn open_retriever(config: &Config, embedder: Arc<dyn LlmClient>) -> Option<Arc<dyn MedicalRetriever>> {
    let path = &config.knowledge_index_path;
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Knowledge index not found; medical retrieval disabled");
        return None;
    }
    match KnowledgeIndex::load(path) {
        Ok(index) => {
            if index.embedding_model != config.embedding_model {
                tracing::warn!(
                    index_model = %index.embedding_model,
                    configured = %config.embedding_model,
                    "Knowledge index was built with a different embedding model; using the index's model"
                );
            }
            tracing::info!(chunks = index.len(), "Knowledge index loaded");
            Some(Arc::new(EmbeddingRetriever::new(index, embedder)))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to load knowledge index: {e}");
            None
        }
    }
}

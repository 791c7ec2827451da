use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{KnowledgeError, TextSplitter};
use crate::llm::LlmClient;

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

const SOURCE_EXTENSIONS: &[&str] = &["txt", "md", "xml"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub content: String,
    /// Path of the source file, relative to the indexed directory.
    pub source: String,
    pub embedding: Vec<f32>,
}

/// Persisted embedding index, stored as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeIndex {
    pub embedding_model: String,
    pub chunks: Vec<IndexedChunk>,
}

impl KnowledgeIndex {
    pub fn load(path: &Path) -> Result<Self, KnowledgeError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write atomically: serialize to a sibling temp file, then rename over `path`.
    pub fn save(&self, path: &Path) -> Result<(), KnowledgeError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer(&mut tmp, self)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| KnowledgeError::Io(e.error))?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `top_k` chunks most similar to `query`, best first.
    pub fn nearest(&self, query: &[f32], top_k: usize) -> Vec<&IndexedChunk> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(query, &chunk.embedding), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(top_k).map(|(_, chunk)| chunk).collect()
    }

    /// Chunk and embed every text, markdown and XML file under `dir`.
    pub fn build(
        dir: &Path,
        embedder: &dyn LlmClient,
        model: &str,
        splitter: &TextSplitter,
    ) -> Result<Self, KnowledgeError> {
        let mut files = Vec::new();
        collect_sources(dir, &mut files)?;
        files.sort();
        if files.is_empty() {
            return Err(KnowledgeError::NoDocuments(dir.to_path_buf()));
        }

        let mut index = Self {
            embedding_model: model.to_string(),
            chunks: Vec::new(),
        };
        for file in &files {
            let text = read_source(file)?;
            let source = file
                .strip_prefix(dir)
                .unwrap_or(file)
                .to_string_lossy()
                .into_owned();
            let pieces = splitter.split(&text);
            tracing::info!(source = %source, chunks = pieces.len(), "Indexing knowledge file");
            for content in pieces {
                let embedding = embedder.embed(model, &content)?;
                index.chunks.push(IndexedChunk {
                    content,
                    source: source.clone(),
                    embedding,
                });
            }
        }
        Ok(index)
    }
}

fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), KnowledgeError> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_sources(&path, out)?;
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        {
            out.push(path);
        }
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<String, KnowledgeError> {
    let raw = fs::read_to_string(path)?;
    let is_xml = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"));
    Ok(if is_xml {
        MARKUP_TAG.replace_all(&raw, " ").into_owned()
    } else {
        raw
    })
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    fn chunk(content: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            content: content.into(),
            source: "test.txt".into(),
            embedding,
        }
    }

    #[test]
    fn cosine_of_parallel_vectors_is_one() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn nearest_orders_by_similarity() {
        let index = KnowledgeIndex {
            embedding_model: "m".into(),
            chunks: vec![
                chunk("far", vec![0.0, 1.0]),
                chunk("near", vec![1.0, 0.1]),
                chunk("middle", vec![1.0, 1.0]),
            ],
        };
        let hits: Vec<&str> = index
            .nearest(&[1.0, 0.0], 2)
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(hits, vec!["near", "middle"]);
    }

    #[test]
    fn build_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("docs");
        fs::create_dir_all(docs.join("cardio")).unwrap();
        fs::write(docs.join("headache.txt"), "Tension headaches respond to rest.").unwrap();
        fs::write(
            docs.join("cardio").join("qa.xml"),
            "<Answer>Palpitations can follow caffeine.</Answer>",
        )
        .unwrap();
        fs::write(docs.join("ignored.bin"), "zzz").unwrap();

        let llm = MockLlmClient::new("");
        let index = KnowledgeIndex::build(&docs, &llm, "all-minilm", &TextSplitter::default()).unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.chunks.iter().all(|c| !c.content.contains('<')));

        let path = dir.path().join("knowledge").join("index.json");
        index.save(&path).unwrap();
        let reloaded = KnowledgeIndex::load(&path).unwrap();
        assert_eq!(reloaded.chunks, index.chunks);
        assert_eq!(reloaded.embedding_model, "all-minilm");
    }

    #[test]
    fn build_rejects_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let llm = MockLlmClient::new("");
        let err = KnowledgeIndex::build(dir.path(), &llm, "m", &TextSplitter::default()).unwrap_err();
        assert!(matches!(err, KnowledgeError::NoDocuments(_)));
    }
}

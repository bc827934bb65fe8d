use std::fs::File;
use std::path::Path;
use std::sync::{Arc, Mutex};

use arrow::array::{AsArray, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Float32Type, Schema};
use chrono::Utc;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;
use tracing::info;

use crate::config::PipelineConfig;
use crate::corpus::{self, SourceDocument};
use crate::embed::EmbeddingProvider;
use crate::error::{PipelineError, Result};
use crate::model::DocumentChunk;
use crate::similarity::cosine_similarity;

/// Serializes the exists-check/build/write sequence. Rebuilds are rare
/// operator events; the serving path never takes this lock after startup.
static BUILD_LOCK: Mutex<()> = Mutex::new(());

/// Cuts `text` into windows of `chunk_size` characters where consecutive
/// windows share `overlap` characters. The final window may be shorter;
/// every character lands in at least one window. Boundaries are a pure
/// function of the inputs, so rebuilding from unchanged text is idempotent.
/// Operates on Unicode scalar values, never splitting a code point.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(chunk_size > overlap, "validated by PipelineConfig");

    let chars: Vec<char> = text.chars().collect();
    let stride = chunk_size - overlap;

    let mut windows = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += stride;
    }
    windows
}

/// One retrieval result, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub text: String,
    pub source_id: String,
    pub score: f32,
}

/// Tier 3: the embedded document corpus. Built offline (or on first use when
/// the artifact is absent), read-only while serving.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: Vec<DocumentChunk>,
}

impl ChunkStore {
    pub fn from_chunks(chunks: Vec<DocumentChunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[DocumentChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Segments every document and embeds each window once.
    pub fn build<E>(documents: &[SourceDocument], config: &PipelineConfig, embedder: &E) -> Result<Self>
    where
        E: EmbeddingProvider + Sync + ?Sized,
    {
        let mut pending: Vec<(String, String)> = Vec::new();
        for document in documents {
            for window in split_text(&document.text, config.chunk_size, config.chunk_overlap) {
                pending.push((document.source_id.clone(), window));
            }
        }

        let chunks = pending
            .par_iter()
            .map(|(source_id, text)| {
                Ok(DocumentChunk {
                    text: text.clone(),
                    source_id: source_id.clone(),
                    embedding: embedder.embed(text)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "chunk store built"
        );
        Ok(Self { chunks })
    }

    /// Top-`k` chunks by cosine similarity, descending, with anything scoring
    /// `<= min_score` dropped. Exact-score ties resolve to the earlier chunk.
    pub fn retrieve(&self, query_embedding: &[f32], k: usize, min_score: f32) -> Vec<RetrievedChunk> {
        let mut scored: Vec<(usize, f32)> = self
            .chunks
            .par_iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query_embedding, &chunk.embedding)))
            .collect();

        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .filter(|(_, score)| *score > min_score)
            .map(|(i, score)| RetrievedChunk {
                text: self.chunks[i].text.clone(),
                source_id: self.chunks[i].source_id.clone(),
                score,
            })
            .collect()
    }

    /// Writes the store as a single snappy-compressed parquet file:
    /// `text: Utf8`, `source_id: Utf8`,
    /// `embedding: FixedSizeList<Float32>[embedding_dim]`.
    pub fn save_artifact(&self, path: &Path, embedding_dim: usize) -> Result<()> {
        for chunk in &self.chunks {
            if chunk.embedding.len() != embedding_dim {
                return Err(PipelineError::artifact(
                    path,
                    format!(
                        "chunk embedding has {} dims, expected {embedding_dim}",
                        chunk.embedding.len()
                    ),
                ));
            }
        }

        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let schema = Arc::new(Schema::new(vec![
            Field::new("text", DataType::Utf8, false),
            Field::new("source_id", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(item_field.clone(), embedding_dim as i32),
                false,
            ),
        ]));

        let text = StringArray::from_iter_values(self.chunks.iter().map(|c| c.text.as_str()));
        let source_id =
            StringArray::from_iter_values(self.chunks.iter().map(|c| c.source_id.as_str()));
        let values = Float32Array::from_iter_values(
            self.chunks.iter().flat_map(|c| c.embedding.iter().copied()),
        );
        let embedding =
            FixedSizeListArray::new(item_field, embedding_dim as i32, Arc::new(values), None);

        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(text), Arc::new(source_id), Arc::new(embedding)],
        )
        .map_err(|e| PipelineError::artifact(path, e))?;

        let properties = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_key_value_metadata(Some(vec![KeyValue::new(
                "built_at".to_string(),
                Utc::now().to_rfc3339(),
            )]))
            .build();

        let file = File::create(path).map_err(|e| PipelineError::artifact(path, e))?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(properties))
            .map_err(|e| PipelineError::artifact(path, e))?;
        writer
            .write(&batch)
            .map_err(|e| PipelineError::artifact(path, e))?;
        writer
            .close()
            .map_err(|e| PipelineError::artifact(path, e))?;

        info!(path = %path.display(), chunks = self.chunks.len(), "vector store artifact written");
        Ok(())
    }

    /// Loads a previously written artifact verbatim; no re-embedding.
    pub fn load_artifact(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| PipelineError::artifact(path, e))?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(|e| PipelineError::artifact(path, e))?;
        let reader = builder
            .build()
            .map_err(|e| PipelineError::artifact(path, e))?;

        let mut chunks = Vec::new();
        for batch_result in reader {
            let batch = batch_result.map_err(|e| PipelineError::artifact(path, e))?;

            let text = batch
                .column_by_name("text")
                .ok_or_else(|| PipelineError::artifact(path, "missing column 'text'"))?
                .as_string::<i32>();
            let source_id = batch
                .column_by_name("source_id")
                .ok_or_else(|| PipelineError::artifact(path, "missing column 'source_id'"))?
                .as_string::<i32>();
            let embedding = batch
                .column_by_name("embedding")
                .ok_or_else(|| PipelineError::artifact(path, "missing column 'embedding'"))?
                .as_fixed_size_list();

            for i in 0..batch.num_rows() {
                let row = embedding.value(i);
                let floats = row.as_primitive::<Float32Type>();
                chunks.push(DocumentChunk {
                    text: text.value(i).to_string(),
                    source_id: source_id.value(i).to_string(),
                    embedding: floats.values().to_vec(),
                });
            }
        }

        info!(path = %path.display(), chunks = chunks.len(), "vector store artifact loaded");
        Ok(Self { chunks })
    }

    /// Startup entry point: load the artifact if it exists, otherwise build
    /// from the corpus directory and write the artifact before first use.
    /// Corpus changes are never detected here; a rebuild is an explicit
    /// operator action.
    pub fn open_or_build<E>(
        artifact_path: &Path,
        data_dir: &Path,
        config: &PipelineConfig,
        embedder: &E,
    ) -> Result<Self>
    where
        E: EmbeddingProvider + Sync + ?Sized,
    {
        let _guard = BUILD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if artifact_path.is_file() {
            return Self::load_artifact(artifact_path);
        }

        info!(path = %artifact_path.display(), "artifact missing, building from corpus");
        let documents = corpus::load_documents(data_dir)?;
        if documents.is_empty() {
            return Err(PipelineError::Corpus(format!(
                "no usable documents in {}",
                data_dir.display()
            )));
        }

        let store = Self::build(&documents, config, embedder)?;
        store.save_artifact(artifact_path, config.embedding_dim)?;
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;
    use std::io::Write;

    fn sample_text(len: usize) -> String {
        (0..len)
            .map(|i| char::from(b'a' + (i % 26) as u8))
            .collect()
    }

    #[test]
    fn segmentation_is_deterministic() {
        let text = sample_text(1000);
        assert_eq!(split_text(&text, 400, 80), split_text(&text, 400, 80));
    }

    #[test]
    fn segmentation_covers_every_character_with_fixed_overlap() {
        let text = sample_text(1000);
        let windows = split_text(&text, 400, 80);
        assert_eq!(windows.len(), 3);

        // Reassembling with the 80-char overlap removed must reproduce the
        // source exactly, which proves full coverage.
        let mut rebuilt = windows[0].clone();
        for window in &windows[1..] {
            rebuilt.push_str(&window[80..]);
        }
        assert_eq!(rebuilt, text);

        // Consecutive windows share exactly the overlap.
        for pair in windows.windows(2) {
            let tail = &pair[0][pair[0].len() - 80..];
            let head = &pair[1][..80];
            assert_eq!(tail, head);
        }
    }

    #[test]
    fn short_and_exact_length_inputs_yield_a_single_window() {
        assert_eq!(split_text("abc", 400, 80), vec!["abc".to_string()]);

        let exact = sample_text(400);
        assert_eq!(split_text(&exact, 400, 80), vec![exact]);

        assert!(split_text("", 400, 80).is_empty());
    }

    fn store_with_synthetic_chunks() -> ChunkStore {
        ChunkStore::from_chunks(vec![
            DocumentChunk {
                text: "straight ahead".to_string(),
                source_id: "doc".to_string(),
                embedding: vec![1.0, 0.0],
            },
            DocumentChunk {
                text: "slightly off".to_string(),
                source_id: "doc".to_string(),
                embedding: vec![0.9, 0.4358899],
            },
            DocumentChunk {
                text: "orthogonal".to_string(),
                source_id: "doc".to_string(),
                embedding: vec![0.0, 1.0],
            },
        ])
    }

    #[test]
    fn retrieval_orders_by_descending_similarity() {
        let store = store_with_synthetic_chunks();
        let results = store.retrieve(&[1.0, 0.0], 2, 0.2);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "straight ahead");
        assert_eq!(results[1].text, "slightly off");
        assert!(results[0].score >= results[1].score);
    }

    #[test]
    fn retrieval_drops_scores_at_or_below_the_floor() {
        let store = store_with_synthetic_chunks();

        // Orthogonal chunk scores ~0 and must never appear.
        let results = store.retrieve(&[1.0, 0.0], 3, 0.2);
        assert!(results.iter().all(|r| r.text != "orthogonal"));

        // A score exactly at the floor is excluded (strictly-greater survives).
        let store = ChunkStore::from_chunks(vec![DocumentChunk {
            text: "boundary".to_string(),
            source_id: "doc".to_string(),
            embedding: vec![3.0, 4.0],
        }]);
        let probed = store.retrieve(&[1.0, 0.0], 1, -1.0)[0].score;
        assert!(store.retrieve(&[1.0, 0.0], 1, probed).is_empty());
    }

    #[test]
    fn retrieval_on_empty_store_returns_nothing() {
        let store = ChunkStore::default();
        assert!(store.retrieve(&[1.0, 0.0], 2, 0.2).is_empty());
    }

    #[test]
    fn artifact_round_trip_preserves_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.parquet");

        let store = ChunkStore::from_chunks(vec![
            DocumentChunk {
                text: "prepayment penalties apply".to_string(),
                source_id: "loans.txt".to_string(),
                embedding: vec![0.1, 0.2, 0.3, 0.4],
            },
            DocumentChunk {
                text: "grievance redressal levels".to_string(),
                source_id: "complaints.txt".to_string(),
                embedding: vec![0.5, 0.6, 0.7, 0.8],
            },
        ]);

        store.save_artifact(&path, 4).unwrap();
        let loaded = ChunkStore::load_artifact(&path).unwrap();
        assert_eq!(loaded.chunks(), store.chunks());
    }

    #[test]
    fn save_rejects_mismatched_embedding_dims() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector_store.parquet");
        let store = ChunkStore::from_chunks(vec![DocumentChunk {
            text: "x".to_string(),
            source_id: "doc".to_string(),
            embedding: vec![1.0, 2.0],
        }]);

        assert!(store.save_artifact(&path, 4).is_err());
    }

    #[test]
    fn open_or_build_builds_once_then_loads_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();
        let mut file = File::create(data_dir.join("policy.txt")).unwrap();
        file.write_all(b"Fixed rate loans carry a prepayment penalty within the lock-in period.")
            .unwrap();

        let artifact = dir.path().join("vector_store.parquet");
        let config = PipelineConfig::default();
        let embedder = HashEmbeddingProvider::default();

        let built = ChunkStore::open_or_build(&artifact, &data_dir, &config, &embedder).unwrap();
        assert!(artifact.is_file());
        assert!(!built.is_empty());

        // Second open must load the artifact without touching the corpus:
        // a bogus data dir still works.
        let reloaded = ChunkStore::open_or_build(
            &artifact,
            Path::new("/nonexistent"),
            &config,
            &embedder,
        )
        .unwrap();
        assert_eq!(reloaded.chunks(), built.chunks());
    }

    #[test]
    fn open_or_build_with_empty_corpus_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        std::fs::create_dir(&data_dir).unwrap();

        let artifact = dir.path().join("vector_store.parquet");
        let config = PipelineConfig::default();
        let embedder = HashEmbeddingProvider::default();

        let err =
            ChunkStore::open_or_build(&artifact, &data_dir, &config, &embedder).unwrap_err();
        assert!(matches!(err, PipelineError::Corpus(_)));
        assert!(!artifact.exists());
    }
}

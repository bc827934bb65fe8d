use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.70;
pub const DEFAULT_CHUNK_SIZE: usize = 400;
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;
pub const DEFAULT_RETRIEVAL_K: usize = 2;
pub const DEFAULT_RETRIEVAL_MIN_SCORE: f32 = 0.20;
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Static pipeline configuration, fixed at startup. Every field has a
/// default, so a config file only needs to name the values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub dataset_match_threshold: f32,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub retrieval_k: usize,
    pub retrieval_min_score: f32,
    pub embedding_dim: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset_match_threshold: DEFAULT_MATCH_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            retrieval_min_score: DEFAULT_RETRIEVAL_MIN_SCORE,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| PipelineError::Config(format!("open {}: {e}", path.display())))?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| PipelineError::Config(format!("parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::Config("chunk_size must be positive".into()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.embedding_dim == 0 {
            return Err(PipelineError::Config("embedding_dim must be positive".into()));
        }
        if !self.dataset_match_threshold.is_finite() || !self.retrieval_min_score.is_finite() {
            return Err(PipelineError::Config("thresholds must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunk_size, 400);
        assert_eq!(config.chunk_overlap, 80);
        assert_eq!(config.embedding_dim, 384);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk_size() {
        let config = PipelineConfig {
            chunk_overlap: 400,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            chunk_overlap: 500,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_file_uses_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(br#"{"chunk_size": 200, "retrieval_k": 3}"#)
            .unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.chunk_size, 200);
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.chunk_overlap, DEFAULT_CHUNK_OVERLAP);
        assert_eq!(config.dataset_match_threshold, DEFAULT_MATCH_THRESHOLD);
    }
}

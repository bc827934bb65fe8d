use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for the pipeline. Startup errors (`Config`, `Dataset`,
/// `Artifact`, `Corpus`) are fatal: the pipeline never serves from a
/// partially initialized state. `Embedding` and `Inference` are recoverable
/// per query; the router degrades to the fallback responder instead of
/// surfacing them to the caller.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("answer dataset {path}: {detail}")]
    Dataset { path: PathBuf, detail: String },

    #[error("vector store artifact {path}: {detail}")]
    Artifact { path: PathBuf, detail: String },

    #[error("document corpus: {0}")]
    Corpus(String),

    #[error("embedding failure: {0}")]
    Embedding(String),

    #[error("model inference error: {0}")]
    Inference(#[from] candle_core::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn dataset(path: &std::path::Path, detail: impl ToString) -> Self {
        Self::Dataset {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    pub fn artifact(path: &std::path::Path, detail: impl ToString) -> Self {
        Self::Artifact {
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

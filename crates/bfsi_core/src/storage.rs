use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// One record of the curated answer artifact (alpaca layout). `input` is
/// reserved and typically empty; when present it extends the match text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedRecord {
    pub instruction: String,
    #[serde(default)]
    pub input: String,
    pub output: String,
}

impl CuratedRecord {
    /// The text the Tier-1 embedding is computed over.
    pub fn match_text(&self) -> String {
        if self.input.is_empty() {
            self.instruction.clone()
        } else {
            format!("{} {}", self.instruction, self.input)
        }
    }
}

/// Loads the whole curated answer artifact. A missing or unparseable file is
/// fatal at startup.
pub fn load_curated_records(path: &Path) -> Result<Vec<CuratedRecord>> {
    let file = File::open(path).map_err(|e| PipelineError::dataset(path, e))?;
    let records: Vec<CuratedRecord> =
        serde_json::from_reader(file).map_err(|e| PipelineError::dataset(path, e))?;
    Ok(records)
}

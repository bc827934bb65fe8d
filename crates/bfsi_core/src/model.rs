use serde::{Deserialize, Serialize};

/// One curated instruction/answer pair with its precomputed embedding.
/// Immutable after load; collection order is the insertion order of the
/// source artifact and breaks similarity ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub instruction: String,
    pub answer: String,
    pub embedding: Vec<f32>,
}

/// One overlapping text window cut from a source document, embedded once at
/// build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source_id: String,
    pub embedding: Vec<f32>,
}

/// Which tier produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerSource {
    Dataset,
    Retrieval,
    Assistant,
    Blocked,
    Rejected,
}

impl std::fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            AnswerSource::Dataset => "dataset",
            AnswerSource::Retrieval => "retrieval",
            AnswerSource::Assistant => "assistant",
            AnswerSource::Blocked => "blocked",
            AnswerSource::Rejected => "rejected",
        };
        f.write_str(tag)
    }
}

/// The single terminal outcome of resolving one query. Produced fresh per
/// query, never persisted. `disclaimer` is present on every answer except
/// Blocked and Rejected ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
    pub confidence: Option<f32>,
    pub disclaimer: Option<String>,
}

impl Answer {
    /// The user-facing text with the compliance disclaimer appended when one
    /// applies.
    pub fn rendered(&self) -> String {
        match &self.disclaimer {
            Some(disclaimer) => format!("{}\n\n{disclaimer}", self.text),
            None => self.text.clone(),
        }
    }
}

use tracing::info;

use crate::embed::EmbeddingProvider;
use crate::error::Result;
use crate::model::KnowledgeEntry;
use crate::similarity::cosine_similarity;
use crate::storage::CuratedRecord;

/// Tier 1: nearest-neighbor lookup over the curated answer set. Read-only
/// after construction.
#[derive(Debug, Default)]
pub struct AnswerIndex {
    entries: Vec<KnowledgeEntry>,
}

/// Outcome of a lookup. The best score is always reported, even on a miss,
/// so callers can inspect near-misses.
#[derive(Debug, Clone)]
pub struct IndexLookup {
    pub answer: Option<String>,
    pub score: f32,
}

impl AnswerIndex {
    /// Embeds each record's match text once and fixes the insertion order.
    pub fn build<E>(records: &[CuratedRecord], embedder: &E) -> Result<Self>
    where
        E: EmbeddingProvider + ?Sized,
    {
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            entries.push(KnowledgeEntry {
                instruction: record.instruction.clone(),
                answer: record.output.clone(),
                embedding: embedder.embed(&record.match_text())?,
            });
        }
        info!(entries = entries.len(), "answer index built");
        Ok(Self { entries })
    }

    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum cosine similarity over all entries; exact-score ties keep the
    /// earliest inserted entry. Hit iff `score >= threshold`. An empty index
    /// reports `(None, 0.0)`.
    pub fn lookup(&self, query_embedding: &[f32], threshold: f32) -> IndexLookup {
        let mut best: Option<(usize, f32)> = None;
        for (i, entry) in self.entries.iter().enumerate() {
            let score = cosine_similarity(query_embedding, &entry.embedding);
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }

        match best {
            Some((i, score)) if score >= threshold => IndexLookup {
                answer: Some(self.entries[i].answer.clone()),
                score,
            },
            Some((_, score)) => IndexLookup { answer: None, score },
            None => IndexLookup {
                answer: None,
                score: 0.0,
            },
        }
    }
}

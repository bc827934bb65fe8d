use std::path::Path;

use tracing::{debug, warn};

use crate::chunks::{ChunkStore, RetrievedChunk};
use crate::config::PipelineConfig;
use crate::embed::EmbeddingProvider;
use crate::error::Result;
use crate::guardrail::{self, Verdict, OUT_OF_DOMAIN_RESPONSE, UNSAFE_RESPONSE};
use crate::index::AnswerIndex;
use crate::model::{Answer, AnswerSource};
use crate::storage;
use crate::templates::{FallbackResponder, TemplateResponder};

/// Queries needing document-grounded answers rather than a one-line match.
pub const COMPLEX_KEYWORDS: &[&str] = &[
    "policy",
    "breakdown",
    "schedule",
    "penalty",
    "detailed",
    "clause",
    "terms",
    "grievance",
    "ombudsman",
    "redressal",
    "billing cycle",
    "late payment",
    "cash withdrawal",
    "digital",
    "limit",
    "cooling period",
];

/// Appended to every answer except Blocked and Rejected ones.
pub const DISCLAIMER: &str = "Disclaimer: This information is for general guidance only. \
    Please verify with official bank documents or contact your branch \
    for the most accurate and up-to-date information. Rates and terms \
    are subject to change.";

pub fn is_complex(query: &str) -> bool {
    let q = query.to_lowercase();
    COMPLEX_KEYWORDS.iter().any(|kw| q.contains(kw))
}

type SharedEmbedder = Box<dyn EmbeddingProvider + Send + Sync>;
type SharedFallback = Box<dyn FallbackResponder + Send + Sync>;

/// The whole serving-side state, constructed once at startup and read-only
/// afterwards, so one instance is freely shareable across query-handling
/// threads. `resolve` is the sole entry point and always produces a
/// complete `Answer`.
pub struct Pipeline {
    embedder: SharedEmbedder,
    index: AnswerIndex,
    store: ChunkStore,
    fallback: SharedFallback,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        embedder: SharedEmbedder,
        index: AnswerIndex,
        store: ChunkStore,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            store,
            fallback: Box::new(TemplateResponder),
            config,
        }
    }

    /// Swaps the final-tier responder. The router only depends on the
    /// `respond` capability, so variants are interchangeable.
    pub fn with_fallback(mut self, fallback: SharedFallback) -> Self {
        self.fallback = fallback;
        self
    }

    /// Startup convenience: load the curated artifact, build the answer
    /// index, open (or build) the vector store. Any failure here is fatal;
    /// the pipeline never serves partially initialized.
    pub fn load(
        embedder: SharedEmbedder,
        dataset_path: &Path,
        data_dir: &Path,
        artifact_path: &Path,
        config: PipelineConfig,
    ) -> Result<Self> {
        config.validate()?;
        let records = storage::load_curated_records(dataset_path)?;
        let index = AnswerIndex::build(&records, &embedder)?;
        let store = ChunkStore::open_or_build(artifact_path, data_dir, &config, &embedder)?;
        Ok(Self::new(embedder, index, store, config))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Resolves one query to exactly one terminal `Answer`, in strict
    /// priority order: guardrail, dataset match, retrieval for complex
    /// queries, template fallback.
    pub fn resolve(&self, query: &str) -> Answer {
        match guardrail::classify(query) {
            Verdict::Unsafe => {
                debug!("query blocked by guardrail");
                return Answer {
                    text: UNSAFE_RESPONSE.to_string(),
                    source: AnswerSource::Blocked,
                    confidence: None,
                    disclaimer: None,
                };
            }
            Verdict::OutOfDomain => {
                debug!("query rejected as out of domain");
                return Answer {
                    text: OUT_OF_DOMAIN_RESPONSE.to_string(),
                    source: AnswerSource::Rejected,
                    confidence: None,
                    disclaimer: None,
                };
            }
            Verdict::Pass => {}
        }

        // A failed embedding downgrades the query to the fallback tier
        // instead of failing the call.
        let query_embedding = match self.embedder.embed(query) {
            Ok(embedding) => Some(embedding),
            Err(err) => {
                warn!(error = %err, "query embedding failed, degrading to fallback responder");
                None
            }
        };

        if let Some(embedding) = &query_embedding {
            let lookup = self
                .index
                .lookup(embedding, self.config.dataset_match_threshold);
            if let Some(answer) = lookup.answer {
                debug!(score = lookup.score, "dataset match");
                return Answer {
                    text: answer,
                    source: AnswerSource::Dataset,
                    confidence: Some(lookup.score),
                    disclaimer: Some(DISCLAIMER.to_string()),
                };
            }
            debug!(score = lookup.score, "no dataset match");

            if is_complex(query) {
                let retrieved = self.store.retrieve(
                    embedding,
                    self.config.retrieval_k,
                    self.config.retrieval_min_score,
                );
                if let Some(top) = retrieved.first() {
                    debug!(
                        chunks = retrieved.len(),
                        top_score = top.score,
                        "answering with retrieved context"
                    );
                    let confidence = top.score;
                    let reply = self.fallback.respond(query);
                    return Answer {
                        text: compose_grounded(&reply.response, &retrieved),
                        source: AnswerSource::Retrieval,
                        confidence: Some(confidence),
                        disclaimer: Some(DISCLAIMER.to_string()),
                    };
                }
                debug!("complex query but nothing retrieved");
            }
        }

        let reply = self.fallback.respond(query);
        Answer {
            text: reply.response,
            source: AnswerSource::Assistant,
            confidence: None,
            disclaimer: Some(DISCLAIMER.to_string()),
        }
    }
}

/// Template guidance first, retrieved excerpts after it as grounding
/// context.
fn compose_grounded(template_response: &str, retrieved: &[RetrievedChunk]) -> String {
    let mut text = String::from(template_response);
    text.push_str("\n\nFrom our policy documents:");
    for chunk in retrieved {
        text.push_str("\n\n");
        text.push_str(chunk.text.trim());
    }
    text
}

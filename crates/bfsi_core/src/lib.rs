pub mod chunks;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod error;
pub mod eval;
pub mod guardrail;
pub mod index;
pub mod minilm;
pub mod model;
pub mod router;
pub mod similarity;
pub mod storage;
pub mod templates;

pub use chunks::{split_text, ChunkStore, RetrievedChunk};
pub use config::{
    PipelineConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_EMBEDDING_DIM,
    DEFAULT_MATCH_THRESHOLD, DEFAULT_RETRIEVAL_K, DEFAULT_RETRIEVAL_MIN_SCORE,
};
pub use corpus::{load_documents, SourceDocument};
pub use embed::{EmbeddingProvider, HashEmbeddingProvider};
pub use error::{PipelineError, Result};
pub use eval::{evaluate_routes, RouteCase, RouteOutcome, RouteSummary};
pub use guardrail::{classify, Verdict};
pub use index::{AnswerIndex, IndexLookup};
pub use minilm::MiniLmEmbeddingProvider;
pub use model::{Answer, AnswerSource, DocumentChunk, KnowledgeEntry};
pub use router::{is_complex, Pipeline, COMPLEX_KEYWORDS, DISCLAIMER};
pub use storage::{load_curated_records, CuratedRecord};
pub use templates::{FallbackReply, FallbackResponder, TemplateResponder, CATALOG};

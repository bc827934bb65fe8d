use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::model::AnswerSource;
use crate::router::Pipeline;

/// One end-to-end routing expectation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteCase {
    pub case_id: String,
    pub query: String,
    pub expected_source: AnswerSource,
    /// When set, the answer text must contain this fragment.
    #[serde(default)]
    pub expected_fragment: Option<String>,
    /// When set, the answer confidence must be present and at least this.
    #[serde(default)]
    pub min_confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub case_id: String,
    pub passed: bool,
    pub actual_source: AnswerSource,
    pub confidence: Option<f32>,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f32,
    pub outcomes: Vec<RouteOutcome>,
}

fn case_passes(case: &RouteCase, source: AnswerSource, text: &str, confidence: Option<f32>) -> bool {
    if case.expected_source != source {
        return false;
    }
    if let Some(fragment) = &case.expected_fragment {
        if !text.contains(fragment.as_str()) {
            return false;
        }
    }
    if let Some(min) = case.min_confidence {
        match confidence {
            Some(c) if c >= min => {}
            _ => return false,
        }
    }
    true
}

/// Runs every case through the pipeline and tallies pass/fail with per-case
/// latency.
pub fn evaluate_routes(pipeline: &Pipeline, cases: &[RouteCase]) -> RouteSummary {
    let mut outcomes = Vec::with_capacity(cases.len());

    for case in cases {
        let start = Instant::now();
        let answer = pipeline.resolve(&case.query);
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;

        outcomes.push(RouteOutcome {
            case_id: case.case_id.clone(),
            passed: case_passes(case, answer.source, &answer.text, answer.confidence),
            actual_source: answer.source,
            confidence: answer.confidence,
            latency_ms,
        });
    }

    let total = outcomes.len();
    let passed = outcomes.iter().filter(|o| o.passed).count();
    let failed = total.saturating_sub(passed);
    let pass_rate = if total == 0 {
        0.0
    } else {
        passed as f32 / total as f32
    };

    RouteSummary {
        total,
        passed,
        failed,
        pass_rate,
        outcomes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::chunks::ChunkStore;
    use crate::embed::HashEmbeddingProvider;
    use crate::index::AnswerIndex;
    use crate::storage::CuratedRecord;

    fn pipeline() -> Pipeline {
        let embedder = HashEmbeddingProvider::default();
        let records = vec![CuratedRecord {
            instruction: "What are the KYC requirements?".to_string(),
            input: String::new(),
            output: "KYC needs identity and address proof.".to_string(),
        }];
        let index = AnswerIndex::build(&records, &embedder).unwrap();
        Pipeline::new(
            Box::new(embedder),
            index,
            ChunkStore::default(),
            PipelineConfig::default(),
        )
    }

    fn case(case_id: &str, query: &str, expected: AnswerSource) -> RouteCase {
        RouteCase {
            case_id: case_id.to_string(),
            query: query.to_string(),
            expected_source: expected,
            expected_fragment: None,
            min_confidence: None,
        }
    }

    #[test]
    fn tallies_passes_and_failures() {
        let pipeline = pipeline();
        let cases = vec![
            case("hit", "What are the KYC requirements?", AnswerSource::Dataset),
            case("reject", "Tell me a joke", AnswerSource::Rejected),
            case("wrong", "Tell me a joke", AnswerSource::Dataset),
        ];

        let summary = evaluate_routes(&pipeline, &cases);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert!((summary.pass_rate - 2.0 / 3.0).abs() < 1e-6);
        assert!(!summary.outcomes[2].passed);
    }

    #[test]
    fn fragment_and_confidence_expectations_apply() {
        let pipeline = pipeline();
        let mut strict = case("strict", "What are the KYC requirements?", AnswerSource::Dataset);
        strict.expected_fragment = Some("identity and address".to_string());
        strict.min_confidence = Some(0.9);

        let summary = evaluate_routes(&pipeline, &[strict]);
        assert_eq!(summary.passed, 1);

        let mut impossible = case("strict2", "What are the KYC requirements?", AnswerSource::Dataset);
        impossible.expected_fragment = Some("not in the answer".to_string());
        let summary = evaluate_routes(&pipeline, &[impossible]);
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn empty_case_list_reports_zero_pass_rate() {
        let pipeline = pipeline();
        let summary = evaluate_routes(&pipeline, &[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.pass_rate, 0.0);
    }
}

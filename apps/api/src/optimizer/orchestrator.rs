//! Optimizer Orchestrator: one optimisation request, end to end.
//!
//! Flow: build prompt → (complete + parse) ‖ (similarity score) → FeedbackRecord.
//!
//! Provider failures never fail the request; they become a single explanatory
//! suggestion with an empty rewrite. Only a similarity failure is an error.

use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::llm_client::parser::parse_json_response;
use crate::llm_client::{CompletionProvider, CompletionRequest, LlmError};
use crate::optimizer::prompts::{build_optimize_prompt, OPTIMIZE_SYSTEM};
use crate::similarity::SimilarityScorer;

/// Result of one optimisation.
///
/// `ats_score` compares the ORIGINAL resume with the job description; the
/// rewritten resume is not re-scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub suggestions: Vec<String>,
    pub optimized_resume: String,
    pub ats_score: f32,
}

impl FeedbackRecord {
    /// `ats_score` as a whole percentage.
    pub fn score_percent(&self) -> u8 {
        (self.ats_score * 100.0).round() as u8
    }

    fn from_parsed(parsed: Map<String, Value>, ats_score: f32) -> Self {
        Self {
            suggestions: suggestions_from(parsed.get("suggestions")),
            optimized_resume: match parsed.get("optimized_resume") {
                Some(Value::String(s)) => s.clone(),
                None | Some(Value::Null) => String::new(),
                Some(other) => other.to_string(),
            },
            ats_score: clamp_score(ats_score),
        }
    }

    fn from_provider_error(error: &LlmError, ats_score: f32) -> Self {
        Self {
            suggestions: vec![format!("An error occurred while querying the AI: {error}")],
            optimized_resume: String::new(),
            ats_score: clamp_score(ats_score),
        }
    }
}

fn clamp_score(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Normalises whatever the model put under `suggestions` into a list of strings.
fn suggestions_from(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => vec![],
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        // A bullet list delivered as one string.
        Some(Value::String(s)) => s
            .lines()
            .map(|line| line.trim().trim_start_matches(['-', '*', '\u{2022}']).trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
        Some(other) => vec![other.to_string()],
    }
}

/// Runs the completion and the ATS score for a resume / job description pair.
#[derive(Clone)]
pub struct Optimizer {
    provider: Arc<dyn CompletionProvider>,
    scorer: Arc<dyn SimilarityScorer>,
}

impl Optimizer {
    pub fn new(provider: Arc<dyn CompletionProvider>, scorer: Arc<dyn SimilarityScorer>) -> Self {
        Self { provider, scorer }
    }

    pub async fn optimize(
        &self,
        resume_text: &str,
        job_description: &str,
        provider: &str,
        model: &str,
    ) -> Result<FeedbackRecord, AppError> {
        let start = std::time::Instant::now();
        let request = CompletionRequest::new(
            &build_optimize_prompt(resume_text, job_description),
            OPTIMIZE_SYSTEM,
            provider,
            model,
        );

        // The forward pass is CPU-bound; keep it off the async workers.
        let scorer = Arc::clone(&self.scorer);
        let (resume_owned, jd_owned) = (resume_text.to_string(), job_description.to_string());
        let score_task =
            tokio::task::spawn_blocking(move || scorer.score(&resume_owned, &jd_owned));

        let (completion, score) = tokio::join!(self.provider.complete(&request), score_task);
        let ats_score = score.context("Similarity task panicked")??;

        let record = match completion {
            Ok(raw) => {
                debug!(provider, chars = raw.len(), "Raw model output: {raw}");
                FeedbackRecord::from_parsed(parse_json_response(&raw), ats_score)
            }
            Err(e) => {
                warn!(provider, model, "Completion failed: {e}");
                FeedbackRecord::from_provider_error(&e, ats_score)
            }
        };

        info!(
            provider,
            model,
            ats_score = record.ats_score,
            suggestions = record.suggestions.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Optimisation complete"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::llm_client::parser::PARSE_FAILURE_SUGGESTION;
    use crate::similarity::SimilarityError;

    enum Reply {
        Text(&'static str),
        Upstream500,
    }

    struct StubProvider {
        reply: Reply,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl StubProvider {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for StubProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.reply {
                Reply::Text(text) => Ok(text.to_string()),
                Reply::Upstream500 => Err(LlmError::Upstream {
                    status: 500,
                    body: "internal error".into(),
                }),
            }
        }
    }

    /// Scores by shared-word overlap and records its inputs.
    struct StubScorer {
        seen: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl StubScorer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(vec![]),
                fail: false,
            })
        }
    }

    impl SimilarityScorer for StubScorer {
        fn score(&self, a: &str, b: &str) -> Result<f32, SimilarityError> {
            self.seen.lock().unwrap().push((a.to_string(), b.to_string()));
            if self.fail {
                return Err(SimilarityError::Tokenizer("boom".into()));
            }
            let a_words: Vec<&str> = a.split_whitespace().collect();
            let shared = b.split_whitespace().filter(|w| a_words.contains(w)).count();
            Ok(shared as f32 / a_words.len().max(1) as f32)
        }
    }

    #[tokio::test]
    async fn test_empty_job_description_well_formed_resume() {
        let provider = StubProvider::new(Reply::Text(
            r#"{"suggestions":[],"optimized_resume":"Alice — Engineer"}"#,
        ));
        let optimizer = Optimizer::new(provider, StubScorer::new());

        let record = optimizer
            .optimize("Alice — Engineer", "", "groq", "llama3-70b-8192")
            .await
            .unwrap();

        assert!((0.0..=1.0).contains(&record.ats_score));
        assert!(record.suggestions.is_empty());
        assert_eq!(record.optimized_resume, "Alice — Engineer");
    }

    #[tokio::test]
    async fn test_unparseable_model_output_falls_back() {
        let provider = StubProvider::new(Reply::Text("Sure! here you go: hello"));
        let optimizer = Optimizer::new(provider, StubScorer::new());

        let record = optimizer.optimize("resume", "jd", "groq", "").await.unwrap();

        assert_eq!(record.suggestions, vec![PARSE_FAILURE_SUGGESTION.to_string()]);
        assert_eq!(record.optimized_resume, "Sure! here you go: hello");
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_real_score() {
        let provider = StubProvider::new(Reply::Upstream500);
        let scorer = StubScorer::new();
        let optimizer = Optimizer::new(provider, scorer.clone());

        let resume = "rust rust go";
        let jd = "rust";
        let record = optimizer.optimize(resume, jd, "groq", "").await.unwrap();

        let expected = scorer.score(resume, jd).unwrap();
        assert_eq!(record.suggestions.len(), 1);
        assert!(record.suggestions[0].starts_with("An error occurred while querying the AI: "));
        assert!(record.suggestions[0].contains("500"));
        assert_eq!(record.optimized_resume, "");
        assert!((record.ats_score - expected).abs() < 1e-6);
        assert!(record.ats_score > 0.0);
    }

    #[tokio::test]
    async fn test_score_uses_original_resume_and_prompt_embeds_both_texts() {
        let provider = StubProvider::new(Reply::Text(
            r#"{"suggestions":["Add metrics"],"optimized_resume":"REWRITTEN"}"#,
        ));
        let scorer = StubScorer::new();
        let optimizer = Optimizer::new(provider.clone(), scorer.clone());

        optimizer
            .optimize("ORIGINAL resume", "the JD", "together", "m")
            .await
            .unwrap();

        let scored = scorer.seen.lock().unwrap().clone();
        assert_eq!(scored, vec![("ORIGINAL resume".to_string(), "the JD".to_string())]);

        let requests = provider.seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].provider, "together");
        assert_eq!(requests[0].model, "m");
        assert_eq!(requests[0].system_prompt, "");
        assert!(requests[0].prompt.contains("----\nthe JD\n----"));
        assert!(requests[0].prompt.contains("----\nORIGINAL resume\n----"));
    }

    #[tokio::test]
    async fn test_similarity_failure_is_an_error() {
        let provider = StubProvider::new(Reply::Text("{}"));
        let scorer = Arc::new(StubScorer {
            seen: Mutex::new(vec![]),
            fail: true,
        });
        let optimizer = Optimizer::new(provider, scorer);

        let err = optimizer.optimize("a", "b", "groq", "").await.unwrap_err();
        assert!(matches!(err, AppError::Similarity(_)));
    }

    #[test]
    fn test_missing_keys_default_to_empty() {
        let record = FeedbackRecord::from_parsed(Map::new(), 0.5);
        assert!(record.suggestions.is_empty());
        assert_eq!(record.optimized_resume, "");
        assert_eq!(record.score_percent(), 50);
    }

    #[test]
    fn test_suggestions_shapes_are_normalised() {
        let as_string = serde_json::json!("- Add Rust\n\n* Quantify impact\n");
        assert_eq!(
            suggestions_from(Some(&as_string)),
            vec!["Add Rust".to_string(), "Quantify impact".to_string()]
        );

        let mixed = serde_json::json!(["Keep it short", 42, {"tip": "x"}]);
        assert_eq!(
            suggestions_from(Some(&mixed)),
            vec!["Keep it short".to_string(), "42".to_string(), r#"{"tip":"x"}"#.to_string()]
        );
    }

    #[test]
    fn test_score_is_clamped() {
        let record = FeedbackRecord::from_parsed(Map::new(), 1.7);
        assert_eq!(record.ats_score, 1.0);
        let record = FeedbackRecord::from_parsed(Map::new(), f32::NAN);
        assert_eq!(record.ats_score, 0.0);
        assert_eq!(record.score_percent(), 0);
    }
}

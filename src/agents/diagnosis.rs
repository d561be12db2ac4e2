//! Diagnosis synthesizer: signals + feedback to a life-event hypothesis.
//!
//! The hypothesis itself comes entirely from the text generator. This stage
//! only frames the request and enforces the response schema.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::customer::FeedbackItem;
use crate::error::PipelineError;
use crate::extract::{Validate, parse_structured};
use crate::llm::TextGenerator;
use crate::pipeline::Stage;
use crate::signals::BehaviorSignals;

/// How strongly the generator backs its primary hypothesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

/// A hypothesis the generator considered and rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeHypothesis {
    pub hypothesis: String,
    pub reason_rejected: String,
}

/// Validated life-event diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub primary_hypothesis: String,
    pub alternative_hypotheses: Vec<AlternativeHypothesis>,
    pub confidence: Confidence,
    pub evidence: Vec<String>,
    pub business_risk: String,
}

impl Validate for Diagnosis {
    fn validate(&self) -> Result<(), String> {
        if self.primary_hypothesis.trim().is_empty() {
            return Err("primary_hypothesis is empty".to_string());
        }
        Ok(())
    }
}

const RESPONSE_SCHEMA: &str = r#"{
  "primary_hypothesis": "string",
  "alternative_hypotheses": [
    {
      "hypothesis": "string",
      "reason_rejected": "string"
    }
  ],
  "confidence": "High | Medium | Low",
  "evidence": ["string"],
  "business_risk": "string"
}"#;

/// Infers a lifestyle or life-event shift via one generative call.
pub struct DiagnosisSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl DiagnosisSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Build the request text embedding signals and feedback as facts.
    pub fn prompt(
        signals: &BehaviorSignals,
        feedback: &[FeedbackItem],
    ) -> Result<String, PipelineError> {
        let signals_json = serde_json::to_string_pretty(signals)
            .map_err(|e| PipelineError::InvalidInput(format!("unserializable signals: {}", e)))?;
        let feedback_json = serde_json::to_string_pretty(feedback)
            .map_err(|e| PipelineError::InvalidInput(format!("unserializable feedback: {}", e)))?;

        Ok(format!(
            "You are a behavioral intelligence agent for a retail loyalty platform.\n\n\
             Deterministic behavioral signals (facts, do not invent new ones):\n{signals_json}\n\n\
             Customer feedback:\n{feedback_json}\n\n\
             Identify the most likely lifestyle or life-event shift. Consider at least one \
             alternative hypothesis and say why it was rejected. Estimate confidence and \
             explain the business risk if no action is taken.\n\n\
             Do not infer sensitive personal attributes; frame insights as lifestyle or \
             situational shifts. Respond with strict JSON only, matching exactly this schema:\n\n\
             {RESPONSE_SCHEMA}\n"
        ))
    }

    /// Produce a validated diagnosis.
    ///
    /// Fails with `GeneratorUnavailable` if the generator call fails and with
    /// `MalformedOutput` if its output cannot be reduced to the schema.
    pub async fn infer(
        &self,
        signals: &BehaviorSignals,
        feedback: &[FeedbackItem],
    ) -> Result<Diagnosis, PipelineError> {
        let prompt = Self::prompt(signals, feedback)?;
        tracing::debug!("Diagnosis prompt: {} chars", prompt.len());

        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| PipelineError::unavailable(Stage::Diagnosis, e))?;
        tracing::debug!("Diagnosis raw output: {} chars", raw.len());

        let diagnosis: Diagnosis = parse_structured(&raw).inspect_err(|e| {
            tracing::warn!("Rejected diagnosis output: {}", e);
        })?;

        tracing::info!(
            "Diagnosis: {} (confidence {:?}, {} alternatives)",
            diagnosis.primary_hypothesis,
            diagnosis.confidence,
            diagnosis.alternative_hypotheses.len()
        );
        Ok(diagnosis)
    }
}

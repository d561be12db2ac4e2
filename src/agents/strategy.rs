//! Strategy synthesizer: diagnosis to a concrete loyalty-program action.
//!
//! The customer id is the only caller-supplied value that flows into the
//! request verbatim; it must come back unchanged inside the platform payload.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agents::diagnosis::Diagnosis;
use crate::error::PipelineError;
use crate::extract::{Validate, parse_structured};
use crate::llm::TextGenerator;
use crate::pipeline::Stage;

/// Loyalty-platform endpoint the payload targets.
pub const PAYLOAD_ENDPOINT: &str = "/events/trigger";
/// HTTP method of the payload.
pub const PAYLOAD_METHOD: &str = "POST";
/// Event name carried in every payload.
pub const INTERVENTION_EVENT: &str = "life_event_loyalty_intervention";
/// Workflow the event is routed to.
pub const RETENTION_WORKFLOW_ID: &str = "life_event_retention_v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClubActionKind {
    #[serde(alias = "invite")]
    Invite,
    #[serde(alias = "update")]
    Update,
    #[serde(rename = "None", alias = "none")]
    NoAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubAction {
    pub action: ClubActionKind,
    pub club_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardType {
    #[serde(alias = "service")]
    Service,
    #[serde(alias = "access")]
    Access,
    #[serde(alias = "points")]
    Points,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    #[serde(rename = "type")]
    pub kind: RewardType,
    pub description: String,
    pub duration: String,
    pub business_rationale: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageTone {
    #[serde(alias = "supportive")]
    Supportive,
    #[serde(alias = "informational")]
    Informational,
    #[serde(alias = "neutral")]
    Neutral,
}

/// Validated loyalty intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub segment: String,
    pub club_action: ClubAction,
    pub rewards: Vec<Reward>,
    pub channels: Vec<String>,
    pub message_tone: MessageTone,
    pub example_message: String,
    pub guardrails: String,
    pub prohibited_actions: Vec<String>,
    /// Opaque platform request; only its customer echo is checked.
    pub antavo_api_payload: serde_json::Value,
}

impl Validate for Strategy {
    fn validate(&self) -> Result<(), String> {
        if self.segment.trim().is_empty() {
            return Err("segment is empty".to_string());
        }
        if self.example_message.trim().is_empty() {
            return Err("example_message is empty".to_string());
        }
        if !self.antavo_api_payload.is_object() {
            return Err("antavo_api_payload is not an object".to_string());
        }
        Ok(())
    }
}

impl Strategy {
    /// Customer id echoed inside the payload body, if present.
    pub fn payload_customer_id(&self) -> Option<&str> {
        self.antavo_api_payload
            .get("body")
            .and_then(|b| b.get("customer_id"))
            .and_then(|c| c.as_str())
    }

    /// Check that the payload targets the fixed intervention request for
    /// `customer_id`. Only the metadata block is left to the generator.
    pub fn check_payload(&self, customer_id: &str) -> Result<(), String> {
        let payload = &self.antavo_api_payload;
        let body = payload.get("body");
        let expected = [
            ("endpoint", payload.get("endpoint"), PAYLOAD_ENDPOINT),
            ("method", payload.get("method"), PAYLOAD_METHOD),
            ("body.customer_id", body.and_then(|b| b.get("customer_id")), customer_id),
            ("body.event", body.and_then(|b| b.get("event")), INTERVENTION_EVENT),
            ("body.workflow_id", body.and_then(|b| b.get("workflow_id")), RETENTION_WORKFLOW_ID),
        ];

        for (field, actual, want) in expected {
            match actual.and_then(|v| v.as_str()) {
                Some(got) if got == want => {}
                Some(got) => {
                    return Err(format!(
                        "antavo_api_payload.{field} is '{got}', expected '{want}'"
                    ));
                }
                None => return Err(format!("antavo_api_payload.{field} is missing")),
            }
        }
        Ok(())
    }
}

/// Payload template the generator must fill in and echo back.
pub fn payload_template(customer_id: &str) -> serde_json::Value {
    serde_json::json!({
        "endpoint": PAYLOAD_ENDPOINT,
        "method": PAYLOAD_METHOD,
        "body": {
            "customer_id": customer_id,
            "event": INTERVENTION_EVENT,
            "workflow_id": RETENTION_WORKFLOW_ID,
            "metadata": {
                "segment": "string",
                "club": "string",
                "reason": "string"
            }
        }
    })
}

/// Designs a loyalty intervention via one generative call.
pub struct StrategySynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl StrategySynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Build the request text from the diagnosis and customer id.
    pub fn prompt(diagnosis: &Diagnosis, customer_id: &str) -> Result<String, PipelineError> {
        let diagnosis_json = serde_json::to_string_pretty(diagnosis)
            .map_err(|e| PipelineError::InvalidInput(format!("unserializable diagnosis: {}", e)))?;

        let schema = serde_json::json!({
            "segment": "string",
            "club_action": {
                "action": "Invite | Update | None",
                "club_name": "string"
            },
            "rewards": [{
                "type": "Service | Access | Points",
                "description": "string",
                "duration": "string",
                "business_rationale": "string"
            }],
            "channels": ["Email", "Push", "SMS"],
            "message_tone": "Supportive | Informational | Neutral",
            "example_message": "string",
            "guardrails": "string",
            "prohibited_actions": ["string"],
            "antavo_api_payload": payload_template(customer_id)
        });
        let schema_json = serde_json::to_string_pretty(&schema)
            .map_err(|e| PipelineError::InvalidInput(format!("unserializable schema: {}", e)))?;

        Ok(format!(
            "You are a senior loyalty architect for a retail loyalty program.\n\n\
             A customer has been analyzed with the following diagnosis:\n{diagnosis_json}\n\n\
             Design a safe, empathetic and business-effective loyalty intervention.\n\
             Do not mention sensitive personal conditions directly. Do not shame or alarm the \
             customer. Prefer service or access rewards over discounts. Include explicit \
             prohibited actions. Copy antavo_api_payload.body.customer_id exactly as given and \
             keep its endpoint, method, event and workflow_id unchanged.\n\n\
             Respond with valid JSON only, matching exactly this schema:\n\n{schema_json}\n"
        ))
    }

    /// Produce a validated strategy for `customer_id`.
    ///
    /// Same failure modes as diagnosis; additionally, a payload that does not
    /// echo `customer_id` or alters the fixed endpoint, method, event or
    /// workflow is `MalformedOutput`.
    pub async fn design(
        &self,
        diagnosis: &Diagnosis,
        customer_id: &str,
    ) -> Result<Strategy, PipelineError> {
        let prompt = Self::prompt(diagnosis, customer_id)?;
        tracing::debug!("Strategy prompt: {} chars", prompt.len());

        let raw = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| PipelineError::unavailable(Stage::Strategy, e))?;
        tracing::debug!("Strategy raw output: {} chars", raw.len());

        let strategy: Strategy = parse_structured(&raw).inspect_err(|e| {
            tracing::warn!("Rejected strategy output: {}", e);
        })?;

        strategy.check_payload(customer_id).map_err(|reason| {
            tracing::warn!("Rejected strategy payload: {}", reason);
            PipelineError::malformed(reason)
        })?;

        tracing::info!(
            "Strategy: segment '{}', club {:?} '{}', {} rewards",
            strategy.segment,
            strategy.club_action.action,
            strategy.club_action.club_name,
            strategy.rewards.len()
        );
        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::agents::diagnosis::Confidence;
    use crate::error::LlmError;

    struct Fixed(String);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    fn diagnosis() -> Diagnosis {
        Diagnosis {
            primary_hypothesis: "Time-poor new routine".to_string(),
            alternative_hypotheses: vec![],
            confidence: Confidence::High,
            evidence: vec!["frozen emerged".to_string()],
            business_risk: "Lower basket value".to_string(),
        }
    }

    fn strategy_json(customer_id: &str, action: &str) -> String {
        serde_json::json!({
            "segment": "Busy Households",
            "club_action": {"action": action, "club_name": "Quick Meals Club"},
            "rewards": [{
                "type": "Service",
                "description": "Free click-and-collect",
                "duration": "3 months",
                "business_rationale": "Reduces friction"
            }],
            "channels": ["Email", "Push"],
            "message_tone": "Supportive",
            "example_message": "We made weeknights easier.",
            "guardrails": "No mention of personal circumstances",
            "prohibited_actions": ["Discount spam"],
            "antavo_api_payload": payload_template(customer_id)
        })
        .to_string()
    }

    #[test]
    fn prompt_embeds_customer_and_fixed_identifiers() {
        let prompt = StrategySynthesizer::prompt(&diagnosis(), "C-42").unwrap();
        assert!(prompt.contains("\"customer_id\": \"C-42\""));
        assert!(prompt.contains(INTERVENTION_EVENT));
        assert!(prompt.contains(RETENTION_WORKFLOW_ID));
        assert!(prompt.contains("Time-poor new routine"));
    }

    #[test]
    fn customer_id_is_json_escaped_in_prompt() {
        let prompt = StrategySynthesizer::prompt(&diagnosis(), "C\"1").unwrap();
        assert!(prompt.contains(r#""customer_id": "C\"1""#));
    }

    #[tokio::test]
    async fn design_parses_valid_output() {
        let synth = StrategySynthesizer::new(Arc::new(Fixed(strategy_json("C-42", "Invite"))));
        let strategy = synth.design(&diagnosis(), "C-42").await.unwrap();
        assert_eq!(strategy.club_action.action, ClubActionKind::Invite);
        assert_eq!(strategy.rewards[0].kind, RewardType::Service);
        assert_eq!(strategy.message_tone, MessageTone::Supportive);
        assert_eq!(strategy.payload_customer_id(), Some("C-42"));
    }

    #[tokio::test]
    async fn none_club_action_round_trips_as_none() {
        let synth = StrategySynthesizer::new(Arc::new(Fixed(strategy_json("C-42", "None"))));
        let strategy = synth.design(&diagnosis(), "C-42").await.unwrap();
        assert_eq!(strategy.club_action.action, ClubActionKind::NoAction);
        let value = serde_json::to_value(&strategy).unwrap();
        assert_eq!(value["club_action"]["action"], "None");
        assert_eq!(value["rewards"][0]["type"], "Service");
    }

    #[tokio::test]
    async fn mismatched_customer_echo_is_malformed() {
        let synth = StrategySynthesizer::new(Arc::new(Fixed(strategy_json("C-99", "Update"))));
        let err = synth.design(&diagnosis(), "C-42").await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedOutput { .. }));
    }

    async fn design_with_payload_field(path: &[&str], value: serde_json::Value) -> PipelineError {
        let mut reply: serde_json::Value =
            serde_json::from_str(&strategy_json("C-42", "Invite")).unwrap();
        let mut slot = &mut reply["antavo_api_payload"];
        for key in path {
            slot = slot.get_mut(*key).unwrap();
        }
        *slot = value;
        let synth = StrategySynthesizer::new(Arc::new(Fixed(reply.to_string())));
        synth.design(&diagnosis(), "C-42").await.unwrap_err()
    }

    #[tokio::test]
    async fn altered_event_is_malformed() {
        let err = design_with_payload_field(&["body", "event"], "delete_customer".into()).await;
        match err {
            PipelineError::MalformedOutput { reason } => assert!(reason.contains("body.event")),
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn altered_workflow_is_malformed() {
        let err = design_with_payload_field(&["body", "workflow_id"], "bogus".into()).await;
        assert!(matches!(err, PipelineError::MalformedOutput { ref reason } if reason.contains("workflow_id")));
    }

    #[tokio::test]
    async fn altered_method_is_malformed() {
        let err = design_with_payload_field(&["method"], "DELETE".into()).await;
        assert!(matches!(err, PipelineError::MalformedOutput { ref reason } if reason.contains("method")));
    }

    #[tokio::test]
    async fn altered_endpoint_is_malformed() {
        let err = design_with_payload_field(&["endpoint"], "/customers/C-42".into()).await;
        assert!(matches!(err, PipelineError::MalformedOutput { ref reason } if reason.contains("endpoint")));
    }

    #[tokio::test]
    async fn missing_event_is_malformed() {
        let err = design_with_payload_field(&["body", "event"], serde_json::Value::Null).await;
        assert!(matches!(err, PipelineError::MalformedOutput { ref reason } if reason.contains("missing")));
    }

    #[test]
    fn template_passes_payload_check() {
        let reply: Strategy = serde_json::from_str(&strategy_json("C-42", "Update")).unwrap();
        assert_eq!(reply.check_payload("C-42"), Ok(()));
        assert!(reply.check_payload("C-43").is_err());
    }

    #[tokio::test]
    async fn unknown_reward_type_is_malformed() {
        let raw = strategy_json("C-42", "Invite").replace("\"Service\"", "\"Discount\"");
        let synth = StrategySynthesizer::new(Arc::new(Fixed(raw)));
        let err = synth.design(&diagnosis(), "C-42").await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedOutput { .. }));
    }

    #[tokio::test]
    async fn non_object_payload_is_malformed() {
        let mut value: serde_json::Value =
            serde_json::from_str(&strategy_json("C-42", "Invite")).unwrap();
        value["antavo_api_payload"] = serde_json::json!("POST /events/trigger");
        let synth = StrategySynthesizer::new(Arc::new(Fixed(value.to_string())));
        let err = synth.design(&diagnosis(), "C-42").await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedOutput { .. }));
    }
}

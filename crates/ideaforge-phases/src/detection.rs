//! Detection phase: decide whether the idea warrants domain discovery.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use ideaforge_prompts::detection_prompt;
use ideaforge_types::WorkflowPhase;

use crate::{PhaseExecutor, PhaseOutcome, PhaseOutput};

/// Classifier verdict from the detection phase. Extra keys in the model's
/// answer are ignored; all four named keys must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionVerdict {
    pub use_event_storming: bool,
    pub feature_count_estimate: i64,
    pub has_complex_business_logic: bool,
    pub reasoning: String,
}

const REQUIRED_KEYS: [&str; 4] = [
    "use_event_storming",
    "feature_count_estimate",
    "has_complex_business_logic",
    "reasoning",
];

pub(crate) async fn run(exec: &PhaseExecutor, idea: &str) -> PhaseOutcome {
    let phase = WorkflowPhase::Detection;
    let request = exec
        .request(&exec.models().detection, detection_prompt(idea))
        .with_json_output();

    let call = match exec.call(request).await {
        Ok(call) => call,
        Err(error) => return PhaseOutcome::failed(phase, error.to_string(), Vec::new()),
    };

    // Malformed JSON and a well-formed answer missing keys are distinct
    // failures; the error must say which happened.
    let value: Value = match serde_json::from_str(&call.content) {
        Ok(value) => value,
        Err(error) => {
            return PhaseOutcome::failed(
                phase,
                format!("failed to parse detection response: {error}"),
                vec![call.usage],
            );
        }
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .filter(|key| value.get(**key).is_none())
        .copied()
        .collect();
    if !missing.is_empty() {
        return PhaseOutcome::failed(
            phase,
            format!("detection response missing required keys: {}", missing.join(", ")),
            vec![call.usage],
        );
    }

    match serde_json::from_value::<DetectionVerdict>(value) {
        Ok(verdict) => {
            debug!(
                use_event_storming = verdict.use_event_storming,
                feature_count_estimate = verdict.feature_count_estimate,
                "detection verdict parsed"
            );
            PhaseOutcome::succeeded(phase, PhaseOutput::Detection(verdict), vec![call.usage])
        }
        Err(error) => PhaseOutcome::failed(
            phase,
            format!("invalid detection response: {error}"),
            vec![call.usage],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCaller, executor};
    use ideaforge_llm::{LlmError, ResponseFormat};

    #[tokio::test]
    async fn valid_verdict_succeeds_with_usage() {
        let caller = ScriptedCaller::new();
        caller.push_content(
            r#"{"use_event_storming": true, "feature_count_estimate": 12,
                "has_complex_business_logic": true, "reasoning": "many features"}"#,
        );
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::Detection {
                idea: "a marketplace".to_string(),
            })
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        match outcome.output {
            Some(PhaseOutput::Detection(verdict)) => {
                assert!(verdict.use_event_storming);
                assert_eq!(verdict.feature_count_estimate, 12);
            }
            other => panic!("unexpected output: {other:?}"),
        }

        let requests = caller.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "openai/gpt-4o-mini");
        assert_eq!(requests[0].temperature, 0.3);
        assert_eq!(requests[0].max_tokens, 500);
        assert_eq!(requests[0].response_format, Some(ResponseFormat::JsonObject));
    }

    #[tokio::test]
    async fn malformed_json_fails_but_keeps_usage() {
        let caller = ScriptedCaller::new();
        caller.push_content("not json at all");
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Detection {
                idea: "x".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        assert!(outcome.error_message.unwrap().contains("parse"));
    }

    #[tokio::test]
    async fn missing_keys_are_named_in_error() {
        let caller = ScriptedCaller::new();
        caller.push_content(r#"{"use_event_storming": false, "reasoning": "simple"}"#);
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Detection {
                idea: "x".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        let message = outcome.error_message.unwrap();
        assert!(message.contains("missing required keys"));
        assert!(message.contains("feature_count_estimate"));
        assert!(message.contains("has_complex_business_logic"));
        assert!(!message.contains("reasoning,"));
        assert!(!message.contains("failed to parse"));
    }

    #[tokio::test]
    async fn wrong_key_type_is_invalid_not_missing() {
        let caller = ScriptedCaller::new();
        caller.push_content(
            r#"{"use_event_storming": "yes", "feature_count_estimate": 3,
                "has_complex_business_logic": false, "reasoning": "r"}"#,
        );
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Detection {
                idea: "x".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        assert!(outcome.error_message.unwrap().contains("invalid detection response"));
    }

    #[tokio::test]
    async fn transport_error_fails_without_usage() {
        let caller = ScriptedCaller::new();
        caller.push_error(LlmError::Transport("connection reset".to_string()));
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Detection {
                idea: "x".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert!(outcome.usage.is_empty());
    }
}

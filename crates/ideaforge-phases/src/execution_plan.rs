//! Execution-plan phase: approach classification plus staged-plan
//! generation.

use serde_json::Value;
use tracing::warn;

use ideaforge_prompts::{EXECUTION_PLAN_SYSTEM, approach_prompt, execution_plan_prompt};
use ideaforge_types::{DeliveryApproach, ModelUsage, WorkflowPhase};

use crate::{PhaseExecutor, PhaseOutcome, PhaseOutput};

const MIN_CHARS: usize = 1000;

/// Stage headers, task lines and checkbox markup must all be present.
const REQUIRED_MARKERS: [&str; 4] = ["Stage", "Task", "[", "]"];

pub(crate) async fn run(
    exec: &PhaseExecutor,
    prd_md: &str,
    tech_stack_md: &str,
) -> PhaseOutcome {
    let phase = WorkflowPhase::ExecutionPlan;

    if prd_md.trim().is_empty() || tech_stack_md.trim().is_empty() {
        return PhaseOutcome::failed(
            phase,
            "both PRD and tech stack are required for execution plan generation",
            Vec::new(),
        );
    }

    let (approach, mut usage) = classify_approach(exec, prd_md).await;

    let request = exec
        .request(
            &exec.models().execution_plan,
            execution_plan_prompt(prd_md, tech_stack_md, approach),
        )
        .with_system_message(EXECUTION_PLAN_SYSTEM);

    let call = match exec.call(request).await {
        Ok(call) => call,
        Err(error) => return PhaseOutcome::failed(phase, error.to_string(), usage),
    };
    usage.push(call.usage);

    if call.content.chars().count() < MIN_CHARS {
        return PhaseOutcome::failed(
            phase,
            "execution plan too short, generation likely failed",
            usage,
        );
    }

    let missing: Vec<&str> = REQUIRED_MARKERS
        .iter()
        .filter(|kw| !call.content.contains(**kw))
        .copied()
        .collect();
    if !missing.is_empty() {
        return PhaseOutcome::failed(
            phase,
            format!(
                "execution plan missing required elements: {}",
                missing.join(", ")
            ),
            usage,
        );
    }

    PhaseOutcome::succeeded(
        phase,
        PhaseOutput::ExecutionPlan {
            execution_plan_md: call.content,
            approach,
        },
        usage,
    )
}

/// Classify the delivery approach from the PRD. Any parse, validation or
/// transport error falls back to vertical, the safer default; the phase
/// itself never fails on classification.
async fn classify_approach(
    exec: &PhaseExecutor,
    prd_md: &str,
) -> (DeliveryApproach, Vec<ModelUsage>) {
    let request = exec
        .request(&exec.models().approach, approach_prompt(prd_md))
        .with_json_output();

    match exec.call(request).await {
        Ok(call) => {
            let approach = serde_json::from_str::<Value>(&call.content)
                .ok()
                .and_then(|value| {
                    value
                        .get("approach")
                        .and_then(Value::as_str)
                        .map(DeliveryApproach::from_classifier)
                })
                .unwrap_or(DeliveryApproach::Vertical);
            (approach, vec![call.usage])
        }
        Err(error) => {
            warn!(%error, "approach classification failed, defaulting to vertical");
            (DeliveryApproach::Vertical, Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCaller, executor};
    use ideaforge_llm::LlmError;

    fn plan_doc() -> String {
        format!(
            "# Execution Plan\n\n## Stage 1: Setup\n\n- [ ] Task 1.1: scaffold\n\n{}",
            "step ".repeat(300)
        )
    }

    #[tokio::test]
    async fn horizontal_verdict_reaches_plan_prompt() {
        let caller = ScriptedCaller::new();
        caller.push_content(r#"{"approach": "HORIZONTAL", "reasoning": "few features"}"#);
        caller.push_content(&plan_doc());
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::ExecutionPlan {
                prd_md: "# PRD".to_string(),
                tech_stack_md: "# Stack".to_string(),
            })
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.usage.len(), 2);
        match outcome.output {
            Some(PhaseOutput::ExecutionPlan { approach, .. }) => {
                assert_eq!(approach, DeliveryApproach::Horizontal);
            }
            other => panic!("unexpected output: {other:?}"),
        }

        let requests = caller.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].model, "openai/gpt-4o-mini");
        assert_eq!(requests[0].max_tokens, 300);
        assert!(requests[1].prompt.contains("HORIZONTAL (layer-by-layer)"));
    }

    #[tokio::test]
    async fn unparseable_classification_defaults_to_vertical() {
        let caller = ScriptedCaller::new();
        caller.push_content("no json here");
        caller.push_content(&plan_doc());
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::ExecutionPlan {
                prd_md: "# PRD".to_string(),
                tech_stack_md: "# Stack".to_string(),
            })
            .await;

        assert!(outcome.success);
        match outcome.output {
            Some(PhaseOutput::ExecutionPlan { approach, .. }) => {
                assert_eq!(approach, DeliveryApproach::Vertical);
            }
            other => panic!("unexpected output: {other:?}"),
        }
        assert!(caller.requests()[1]
            .prompt
            .contains("VERTICAL (feature-by-feature)"));
    }

    #[tokio::test]
    async fn invalid_approach_value_defaults_to_vertical() {
        let caller = ScriptedCaller::new();
        caller.push_content(r#"{"approach": "DIAGONAL"}"#);
        caller.push_content(&plan_doc());
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::ExecutionPlan {
                prd_md: "# PRD".to_string(),
                tech_stack_md: "# Stack".to_string(),
            })
            .await;

        match outcome.output {
            Some(PhaseOutput::ExecutionPlan { approach, .. }) => {
                assert_eq!(approach, DeliveryApproach::Vertical);
            }
            other => panic!("unexpected output: {other:?}"),
        }
    }

    #[tokio::test]
    async fn classification_transport_error_still_generates_plan() {
        let caller = ScriptedCaller::new();
        caller.push_error(LlmError::Transport("reset".to_string()));
        caller.push_content(&plan_doc());
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::ExecutionPlan {
                prd_md: "# PRD".to_string(),
                tech_stack_md: "# Stack".to_string(),
            })
            .await;

        assert!(outcome.success);
        // Only the generation call billed; the failed classification
        // consumed no tokens.
        assert_eq!(outcome.usage.len(), 1);
    }

    #[tokio::test]
    async fn missing_inputs_fail_without_model_calls() {
        let caller = ScriptedCaller::new();
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::ExecutionPlan {
                prd_md: "# PRD".to_string(),
                tech_stack_md: String::new(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(caller.call_count(), 0);
    }

    #[tokio::test]
    async fn plan_without_checkboxes_fails_with_both_usages() {
        let caller = ScriptedCaller::new();
        caller.push_content(r#"{"approach": "VERTICAL"}"#);
        caller.push_content(&format!("# Plan\n\n## Stage 1\n\nTask {}", "x ".repeat(500)));
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::ExecutionPlan {
                prd_md: "# PRD".to_string(),
                tech_stack_md: "# Stack".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 2);
        assert!(outcome.error_message.unwrap().contains("["));
    }
}

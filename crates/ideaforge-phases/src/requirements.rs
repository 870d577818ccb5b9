//! Requirements phase: PRD generation, optionally grounded in the
//! domain-discovery summary.

use ideaforge_prompts::{REQUIREMENTS_SYSTEM, requirements_prompt};
use ideaforge_types::WorkflowPhase;

use crate::{PhaseExecutor, PhaseOutcome, PhaseOutput};

const MIN_CHARS: usize = 1000;

/// Coarse completeness check: a real PRD mentions at least one of these.
const SECTION_KEYWORDS: [&str; 4] = ["Overview", "Requirements", "Scope", "Features"];

pub(crate) async fn run(
    exec: &PhaseExecutor,
    idea: &str,
    domain_summary: Option<&str>,
) -> PhaseOutcome {
    let phase = WorkflowPhase::Requirements;
    let request = exec
        .request(
            &exec.models().requirements,
            requirements_prompt(idea, domain_summary),
        )
        .with_system_message(REQUIREMENTS_SYSTEM);

    let call = match exec.call(request).await {
        Ok(call) => call,
        Err(error) => return PhaseOutcome::failed(phase, error.to_string(), Vec::new()),
    };

    if call.content.chars().count() < MIN_CHARS {
        return PhaseOutcome::failed(
            phase,
            "PRD too short, generation likely failed",
            vec![call.usage],
        );
    }

    if !SECTION_KEYWORDS.iter().any(|kw| call.content.contains(kw)) {
        return PhaseOutcome::failed(phase, "PRD missing required sections", vec![call.usage]);
    }

    PhaseOutcome::succeeded(
        phase,
        PhaseOutput::Requirements {
            prd_md: call.content,
        },
        vec![call.usage],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCaller, executor};

    fn prd_with(keyword: &str) -> String {
        format!("# PRD\n\n## {keyword}\n\n{}", "body ".repeat(300))
    }

    #[tokio::test]
    async fn prd_with_one_keyword_passes() {
        let caller = ScriptedCaller::new();
        caller.push_content(&prd_with("Scope"));
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Requirements {
                idea: "x".to_string(),
                domain_summary: None,
            })
            .await;

        assert!(outcome.success);
    }

    #[tokio::test]
    async fn prd_without_any_keyword_fails() {
        let caller = ScriptedCaller::new();
        caller.push_content(&format!("# Notes\n\n{}", "body ".repeat(300)));
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Requirements {
                idea: "x".to_string(),
                domain_summary: None,
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        assert!(outcome.error_message.unwrap().contains("sections"));
    }

    #[tokio::test]
    async fn short_prd_fails() {
        let caller = ScriptedCaller::new();
        caller.push_content("## Overview\nbrief");
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::Requirements {
                idea: "x".to_string(),
                domain_summary: None,
            })
            .await;

        assert!(!outcome.success);
        assert!(outcome.error_message.unwrap().contains("too short"));
    }

    #[tokio::test]
    async fn domain_summary_is_embedded_in_prompt() {
        let caller = ScriptedCaller::new();
        caller.push_content(&prd_with("Overview"));
        executor(caller.clone())
            .execute(&crate::PhaseInput::Requirements {
                idea: "x".to_string(),
                domain_summary: Some("## Domain Events in tests".to_string()),
            })
            .await;

        assert!(caller.requests()[0]
            .prompt
            .contains("## Domain Events in tests"));
    }
}

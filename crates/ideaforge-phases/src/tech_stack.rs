//! Tech-stack phase: stack-decision document grounded in the PRD.

use ideaforge_prompts::{TECH_STACK_SYSTEM, tech_stack_prompt};
use ideaforge_types::WorkflowPhase;

use crate::{PhaseExecutor, PhaseOutcome, PhaseOutput};

const MIN_CHARS: usize = 500;

const REQUIRED_SECTIONS: [&str; 3] = ["Frontend", "Backend", "Infrastructure"];

pub(crate) async fn run(exec: &PhaseExecutor, prd_md: &str) -> PhaseOutcome {
    let phase = WorkflowPhase::TechStack;

    // Missing input fails fast, before any model call.
    if prd_md.trim().is_empty() {
        return PhaseOutcome::failed(
            phase,
            "PRD markdown is required for tech stack generation",
            Vec::new(),
        );
    }

    let request = exec
        .request(&exec.models().tech_stack, tech_stack_prompt(prd_md))
        .with_system_message(TECH_STACK_SYSTEM);

    let call = match exec.call(request).await {
        Ok(call) => call,
        Err(error) => return PhaseOutcome::failed(phase, error.to_string(), Vec::new()),
    };

    if call.content.chars().count() < MIN_CHARS {
        return PhaseOutcome::failed(
            phase,
            "tech stack document too short, generation likely failed",
            vec![call.usage],
        );
    }

    let missing: Vec<&str> = REQUIRED_SECTIONS
        .iter()
        .filter(|kw| !call.content.contains(**kw))
        .copied()
        .collect();
    if !missing.is_empty() {
        return PhaseOutcome::failed(
            phase,
            format!("tech stack missing required sections: {}", missing.join(", ")),
            vec![call.usage],
        );
    }

    PhaseOutcome::succeeded(
        phase,
        PhaseOutput::TechStack {
            tech_stack_md: call.content,
        },
        vec![call.usage],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCaller, executor};

    fn full_stack_doc() -> String {
        format!(
            "# Tech Stack\n\n## Frontend\n\n## Backend\n\n## Infrastructure\n\n{}",
            "detail ".repeat(100)
        )
    }

    #[tokio::test]
    async fn empty_prd_fails_without_calling_model() {
        let caller = ScriptedCaller::new();
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::TechStack {
                prd_md: "   ".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert!(outcome.usage.is_empty());
        assert_eq!(caller.call_count(), 0);
        assert!(outcome.error_message.unwrap().contains("required"));
    }

    #[tokio::test]
    async fn complete_document_succeeds() {
        let caller = ScriptedCaller::new();
        caller.push_content(&full_stack_doc());
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::TechStack {
                prd_md: "# PRD".to_string(),
            })
            .await;

        assert!(outcome.success);
        let requests = caller.requests();
        assert_eq!(requests[0].model, "openai/gpt-4o");
        assert_eq!(requests[0].temperature, 0.5);
        assert_eq!(requests[0].max_tokens, 3000);
    }

    #[tokio::test]
    async fn missing_sections_are_named_in_error() {
        let caller = ScriptedCaller::new();
        caller.push_content(&format!(
            "# Tech Stack\n\n## Frontend\n\n{}",
            "detail ".repeat(100)
        ));
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::TechStack {
                prd_md: "# PRD".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        let message = outcome.error_message.unwrap();
        assert!(message.contains("Backend"));
        assert!(message.contains("Infrastructure"));
        assert!(!message.contains("Frontend,"));
    }
}

//! Domain-discovery phase: autonomous Event Storming summary document.

use ideaforge_prompts::{DOMAIN_DISCOVERY_SYSTEM, domain_discovery_prompt};
use ideaforge_types::WorkflowPhase;

use crate::{PhaseExecutor, PhaseOutcome, PhaseOutput};

/// Shorter output than this almost always means a truncated generation.
const MIN_CHARS: usize = 500;

pub(crate) async fn run(exec: &PhaseExecutor, idea: &str) -> PhaseOutcome {
    let phase = WorkflowPhase::DomainDiscovery;
    let request = exec
        .request(&exec.models().domain_discovery, domain_discovery_prompt(idea))
        .with_system_message(DOMAIN_DISCOVERY_SYSTEM);

    let call = match exec.call(request).await {
        Ok(call) => call,
        Err(error) => return PhaseOutcome::failed(phase, error.to_string(), Vec::new()),
    };

    if call.content.chars().count() < MIN_CHARS {
        return PhaseOutcome::failed(
            phase,
            "domain discovery summary too short, generation likely failed",
            vec![call.usage],
        );
    }

    PhaseOutcome::succeeded(
        phase,
        PhaseOutput::DomainDiscovery {
            domain_summary_md: call.content,
        },
        vec![call.usage],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedCaller, executor};

    fn long_summary() -> String {
        format!("# Event Storming Summary\n\n{}", "detail ".repeat(100))
    }

    #[tokio::test]
    async fn long_summary_succeeds() {
        let caller = ScriptedCaller::new();
        caller.push_content(&long_summary());
        let outcome = executor(caller.clone())
            .execute(&crate::PhaseInput::DomainDiscovery {
                idea: "an insurance claims platform".to_string(),
            })
            .await;

        assert!(outcome.success);
        let requests = caller.requests();
        assert_eq!(requests[0].model, "anthropic/claude-3.5-sonnet");
        assert_eq!(
            requests[0].system_message.as_deref(),
            Some(DOMAIN_DISCOVERY_SYSTEM)
        );
        assert!(requests[0].prompt.contains("an insurance claims platform"));
    }

    #[tokio::test]
    async fn short_summary_fails_with_usage() {
        let caller = ScriptedCaller::new();
        caller.push_content("# Too short");
        let outcome = executor(caller)
            .execute(&crate::PhaseInput::DomainDiscovery {
                idea: "x".to_string(),
            })
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.usage.len(), 1);
        assert!(outcome.error_message.unwrap().contains("too short"));
    }
}

//! Prompt builders for each pipeline phase.
//!
//! Every builder returns the complete user prompt for one model call. The
//! generative phases run in autonomous mode: where an interactive session
//! would ask the stakeholder questions and wait, these prompts instruct the
//! model to answer its own questions and emit the finished document in one
//! pass.

use ideaforge_types::DeliveryApproach;

/// Suffix appended to generative prompts so the model produces the final
/// document directly instead of opening an interactive back-and-forth.
const AUTONOMOUS_MODE_INSTRUCTIONS: &str = "

---

**IMPORTANT - AUTONOMOUS MODE:**
This is an autonomous run, not an interactive session:

1. Imagine you are interviewing a typical stakeholder for this type of project
2. Ask yourself the questions above
3. Provide reasonable, well-thought-out answers based on the project idea
4. Then generate the complete final document

Skip the interactive back-and-forth. Start your response with the document
header and output only the document itself.";

/// System message for the domain-discovery phase.
pub const DOMAIN_DISCOVERY_SYSTEM: &str =
    "You are an expert business analyst conducting Event Storming sessions.";

/// System message for the requirements phase.
pub const REQUIREMENTS_SYSTEM: &str =
    "You are an expert AI software architect and project manager.";

/// System message for the tech-stack phase.
pub const TECH_STACK_SYSTEM: &str =
    "You are an expert software architect making technology stack decisions.";

/// System message for the execution-plan phase.
pub const EXECUTION_PLAN_SYSTEM: &str =
    "You are an expert at creating detailed, granular execution plans for AI coding agents.";

/// Prompt for the detection phase: classify whether the idea is complex
/// enough to warrant a dedicated domain-discovery pass.
#[must_use]
pub fn detection_prompt(idea: &str) -> String {
    format!(
        r#"You are assessing a software project idea to decide whether it needs a
dedicated business-domain discovery session (Event Storming) before writing
requirements.

# Project Idea

{idea}

# Your Task

Estimate the scope and complexity of this idea. A domain-discovery session is
worthwhile when the project has many features or non-trivial business rules;
a simple CRUD tool or single-purpose utility does not need one.

Respond with a JSON object containing exactly these keys:

{{
  "use_event_storming": <true or false>,
  "feature_count_estimate": <integer, your best estimate of distinct features>,
  "has_complex_business_logic": <true or false>,
  "reasoning": "<one or two sentences explaining the decision>"
}}

Output only the JSON object."#
    )
}

/// Prompt for the domain-discovery phase: a full Event Storming summary
/// document for the idea.
#[must_use]
pub fn domain_discovery_prompt(idea: &str) -> String {
    format!(
        r"You are running an Event Storming session to discover the business domain
behind a project idea.

# Project Idea

{idea}

# Your Task

Produce a complete Event Storming Summary Document in markdown with all 10
sections:

1. Domain Overview
2. Domain Events (past-tense business events, in rough timeline order)
3. Commands (actions that trigger the events)
4. Actors (who or what issues each command)
5. Aggregates (clusters of events and commands around a consistency boundary)
6. Bounded Contexts
7. Policies & Reactions (whenever X happens, then Y)
8. External Systems
9. Hotspots & Open Questions
10. Glossary of Domain Terms

Cover the whole domain the idea implies, not just the happy path. Where the
idea is silent, make the assumptions a typical project of this kind would
make and note them in the hotspots section.{suffix}",
        suffix = AUTONOMOUS_MODE_INSTRUCTIONS
    )
}

/// Prompt for the requirements phase: a PRD with 9 sections, optionally
/// informed by a domain-discovery summary.
#[must_use]
pub fn requirements_prompt(idea: &str, domain_summary: Option<&str>) -> String {
    let domain_context = match domain_summary {
        Some(summary) => format!(
            r"
Additionally, here is the Event Storming Summary from our business domain
analysis:

---
{summary}
---

Use this summary to inform your questions and the final PRD.
"
        ),
        None => String::new(),
    };

    format!(
        r"You are turning a project idea into a complete Product Requirements
Document (PRD).

# Project Idea

{idea}
{domain_context}
# Your Task

First, work through the 15 discovery questions an experienced product manager
would ask about this idea: target users, the core problem, success metrics,
must-have features, nice-to-have features, explicit non-features, user roles
and permissions, key workflows, data the system owns, integrations, platform
and device expectations, performance and scale expectations, security and
compliance constraints, launch timeline pressure, and the biggest risks.

Then generate the complete PRD in markdown with these 9 sections:

1. Project Overview & Vision
2. Strategic Alignment & Success Metrics
3. Target Users & Personas
4. User Stories & Acceptance Criteria
5. Functional Requirements by Feature
6. Scope & In-Scope Features (MVP)
7. Explicitly Out-of-Scope (Post-MVP)
8. Non-Functional Requirements
9. Assumptions, Dependencies, Risks{suffix}",
        suffix = AUTONOMOUS_MODE_INSTRUCTIONS
    )
}

/// Prompt for the tech-stack phase, grounded in the finished PRD.
#[must_use]
pub fn tech_stack_prompt(prd_md: &str) -> String {
    format!(
        r"You are selecting the technology stack for the product described in the
PRD below.

# Product Requirements Document

---
{prd_md}
---

# Your Task

Produce a Technology Stack document in markdown. It must contain at least
these sections:

- Frontend (framework, language, key libraries, rationale)
- Backend (framework, language, key libraries, rationale)
- Database & Storage
- Infrastructure (hosting, CI/CD, monitoring)
- Third-Party Services & Integrations

For each choice, name a concrete, current, well-supported technology and give
a one-line rationale tied to the PRD's requirements. Prefer boring, proven
choices over novelty unless the PRD demands otherwise. Start your response
with the document header and output only the document."
    )
}

/// Prompt for classifying the delivery approach of the execution plan.
#[must_use]
pub fn approach_prompt(prd_md: &str) -> String {
    format!(
        r#"You are deciding the delivery approach for the product described in the
PRD below.

# Product Requirements Document

---
{prd_md}
---

# Your Task

Choose between two delivery approaches:

- HORIZONTAL: build layer by layer (all backend, then all frontend, then
  integration). Suits small products with few, tightly-coupled features.
- VERTICAL: build feature by feature, each slice end to end. Suits products
  with many independent features where early working slices matter.

Respond with a JSON object:

{{
  "approach": "<HORIZONTAL or VERTICAL>",
  "reasoning": "<one sentence>"
}}

Output only the JSON object."#
    )
}

fn approach_instruction(approach: DeliveryApproach) -> &'static str {
    match approach {
        DeliveryApproach::Vertical => {
            r"**IMPORTANT:** Use a VERTICAL (feature-by-feature) development approach.
Each stage implements a complete feature from backend to frontend, not layers.

Structure stages as:
- Stage 1: Minimal Working Installation (basic end-to-end system)
- Stage 2-N: Complete feature slices (backend + frontend + integration per feature)
- Final Stage: Polish & finalization"
        }
        DeliveryApproach::Horizontal => {
            r"**IMPORTANT:** Use a HORIZONTAL (layer-by-layer) development approach.
Stages build each layer completely before moving to the next.

Structure stages as:
- Stage 1: Project Setup & Environment
- Stage 2: Backend Development (all APIs)
- Stage 3: Frontend Development (all UI)
- Stage 4: Integration
- Stage 5: Testing & Documentation"
        }
    }
}

/// Prompt for the execution-plan phase, grounded in the PRD and tech stack
/// and shaped by the detected delivery approach.
#[must_use]
pub fn execution_plan_prompt(
    prd_md: &str,
    tech_stack_md: &str,
    approach: DeliveryApproach,
) -> String {
    format!(
        r"You are writing a staged execution plan for building the product described
below. The plan will be handed to AI coding agents, so every task must be
small, concrete, and independently checkable.

# Product Requirements Document

---
{prd_md}
---

# Technology Stack

---
{tech_stack_md}
---

# Your Task

{instruction}

Produce the Execution Plan in markdown:

- Number each stage (Stage 1, Stage 2, ...) with a title and a one-paragraph
  goal stating what works at the end of the stage.
- Under each stage, list tasks as markdown checkboxes: `- [ ] Task N.M: ...`.
- Each task names the files or components it touches and its done-criteria.
- End each stage with a verification task that exercises the stage's goal.

Start your response with the document header and output only the document.",
        instruction = approach_instruction(approach)
    )
}

// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution prompt assembly.
//!
//! The system prompt is an intent instruction plus a tier instruction. The
//! user prompt carries the request text, any extra context entries, and the
//! document (already summarized when it was too large for the target).

use serde_json::Value;
use switchyard_core::types::DOCUMENT_CONTEXT_KEY;
use switchyard_core::{ComplexityTier, Intent, OrchestrationRequest};

/// Prompt pair sent to the selected backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPrompt {
    pub system: String,
    pub user: String,
}

fn intent_instruction(intent: Intent) -> &'static str {
    match intent {
        Intent::Read => {
            "Help the user retrieve and understand the requested information. Be accurate and comprehensive."
        }
        Intent::Write => {
            "Help the user create or modify content as requested. Ensure all generated content is accurate and well-formatted."
        }
        Intent::Search => {
            "Help the user find the information they are looking for. Be thorough but concise in presenting results."
        }
        Intent::Analyze => {
            "Analyze the provided data or situation. Provide clear insights and actionable recommendations."
        }
        Intent::Manage => {
            "Help the user organize, configure, or administer the requested resources effectively."
        }
    }
}

fn tier_instruction(tier: ComplexityTier) -> Option<&'static str> {
    match tier {
        ComplexityTier::Simple => Some("Keep the response brief and to the point."),
        ComplexityTier::Moderate => None,
        ComplexityTier::Complex => Some("Provide detailed analysis with step-by-step reasoning."),
    }
}

pub fn system_prompt(intent: Intent, tier: ComplexityTier) -> String {
    let mut prompt = intent_instruction(intent).to_string();
    if let Some(extra) = tier_instruction(tier) {
        prompt.push('\n');
        prompt.push_str(extra);
    }
    prompt
}

/// Assemble the prompt for `request`. `document` replaces the request's own
/// document entry, so callers pass the summary when one was produced.
pub fn build_prompt(
    request: &OrchestrationRequest,
    intent: Intent,
    tier: ComplexityTier,
    document: Option<&str>,
) -> ExecutionPrompt {
    let mut user = request.text.trim().to_string();

    let extra: Vec<String> = request
        .context
        .iter()
        .filter(|(key, _)| key.as_str() != DOCUMENT_CONTEXT_KEY)
        .map(|(key, value)| match value {
            Value::String(s) => format!("- {key}: {s}"),
            other => format!("- {key}: {other}"),
        })
        .collect();
    if !extra.is_empty() {
        user.push_str("\n\nContext:\n");
        user.push_str(&extra.join("\n"));
    }

    if let Some(doc) = document.filter(|d| !d.is_empty()) {
        user.push_str("\n\nDocument:\n");
        user.push_str(doc);
    }

    ExecutionPrompt {
        system: system_prompt(intent, tier),
        user,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tier_adjusts_system_prompt() {
        let simple = system_prompt(Intent::Read, ComplexityTier::Simple);
        assert!(simple.ends_with("Keep the response brief and to the point."));

        let moderate = system_prompt(Intent::Read, ComplexityTier::Moderate);
        assert_eq!(moderate, intent_instruction(Intent::Read));

        let complex = system_prompt(Intent::Analyze, ComplexityTier::Complex);
        assert!(complex.starts_with("Analyze the provided data"));
        assert!(complex.contains("step-by-step reasoning"));
    }

    #[test]
    fn every_intent_has_an_instruction() {
        for intent in Intent::ALL {
            assert!(!intent_instruction(intent).is_empty());
        }
    }

    #[test]
    fn user_prompt_carries_context_and_substituted_document() {
        let request = OrchestrationRequest::new("  What changed in Q3?  ")
            .with_context("team", json!("finance"))
            .with_context("year", json!(2025))
            .with_document("very long original text");

        let prompt = build_prompt(&request, Intent::Analyze, ComplexityTier::Moderate, Some("short summary"));
        assert!(prompt.user.starts_with("What changed in Q3?\n\nContext:\n"));
        assert!(prompt.user.contains("- team: finance"));
        assert!(prompt.user.contains("- year: 2025"));
        assert!(prompt.user.ends_with("Document:\nshort summary"));
        assert!(!prompt.user.contains("very long original text"));
    }

    #[test]
    fn plain_request_is_just_the_text() {
        let request = OrchestrationRequest::new("List all files");
        let prompt = build_prompt(&request, Intent::Read, ComplexityTier::Simple, None);
        assert_eq!(prompt.user, "List all files");
    }
}

// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic intent classification.
//!
//! Maps request text to one of the five intents using keyword rules. No LLM
//! pre-call, no network, no latency. Text that matches no rule falls back to
//! [`Intent::Analyze`] with the lowest confidence.

use serde::Serialize;
use switchyard_core::Intent;

/// Result of classifying a request's intent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Confidence in the classification (0.0-1.0).
    pub confidence: f32,
    /// Human-readable reason for the classification.
    pub reason: String,
}

/// Confidence reported when no rule matched.
pub const FALLBACK_CONFIDENCE: f32 = 0.2;

const MIN_MATCH_CONFIDENCE: f32 = 0.5;
const MAX_MATCH_CONFIDENCE: f32 = 0.95;

/// Keyword rules per intent. Single words match whole tokens; entries with a
/// space match as substrings of the normalized text.
const RULES: &[(Intent, &[&str])] = &[
    (
        Intent::Read,
        &[
            "read", "show", "list", "get", "display", "view", "fetch", "retrieve", "open",
            "print", "cat", "describe", "what is", "contents of",
        ],
    ),
    (
        Intent::Write,
        &[
            "write", "create", "generate", "make", "add", "compose", "draft", "build",
            "implement", "update", "modify", "edit", "fix", "refactor", "rename", "insert",
            "translate",
        ],
    ),
    (
        Intent::Search,
        &[
            "find", "search", "locate", "grep", "lookup", "where", "which", "look for",
            "look up", "occurrences of",
        ],
    ),
    (
        Intent::Analyze,
        &[
            "analyze", "analyse", "evaluate", "examine", "compare", "assess", "review",
            "explain", "summarize", "summarise", "why", "investigate", "optimize", "debug",
            "profile", "audit", "diagnose", "pros and cons", "trade-off", "tradeoff",
        ],
    ),
    (
        Intent::Manage,
        &[
            "manage", "configure", "organize", "organise", "deploy", "install", "uninstall",
            "delete", "remove", "move", "schedule", "administer", "restart", "migrate",
            "backup", "permissions", "provision", "set up", "clean up",
        ],
    ),
];

/// Deterministic keyword-based intent classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify `text`. Never fails.
    ///
    /// Each matched keyword scores 1; a single-word keyword that is also the
    /// first word of the request scores 2 more. Ties go to the intent
    /// declared first.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let normalized = normalize(text);
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let first = words.first().copied();

        let mut scores: Vec<(Intent, u32, Vec<&'static str>)> = Vec::with_capacity(RULES.len());
        for (intent, keywords) in RULES {
            let mut score = 0;
            let mut matched = Vec::new();
            for &keyword in *keywords {
                let hit = if keyword.contains(' ') {
                    contains_phrase(&normalized, keyword)
                } else {
                    words.contains(&keyword)
                };
                if hit {
                    score += 1;
                    if first == Some(keyword) {
                        score += 2;
                    }
                    matched.push(keyword);
                }
            }
            scores.push((*intent, score, matched));
        }

        // Stable sort keeps declaration order among equal scores.
        scores.sort_by(|a, b| b.1.cmp(&a.1));
        let (intent, best, matched) = &scores[0];
        let runner_up = scores.get(1).map(|s| s.1).unwrap_or(0);

        if *best == 0 {
            return ClassificationResult {
                intent: Intent::Analyze,
                confidence: FALLBACK_CONFIDENCE,
                reason: "no intent keywords matched".to_string(),
            };
        }

        let margin = (*best - runner_up) as f32 / *best as f32;
        let confidence =
            MIN_MATCH_CONFIDENCE + (MAX_MATCH_CONFIDENCE - MIN_MATCH_CONFIDENCE) * margin;

        ClassificationResult {
            intent: *intent,
            confidence,
            reason: format!("matched {}", matched.join(", ")),
        }
    }
}

/// Lowercase, with punctuation other than `-` and `'` turned into spaces.
fn normalize(text: &str) -> String {
    let mapped: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-word phrase match against normalized text.
fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    let padded = format!(" {normalized} ");
    padded.contains(&format!(" {phrase} "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(text: &str) -> ClassificationResult {
        IntentClassifier::new().classify(text)
    }

    #[test]
    fn list_files_is_read() {
        let r = classify("List all files in the project");
        assert_eq!(r.intent, Intent::Read);
        assert!(r.confidence > MIN_MATCH_CONFIDENCE);
    }

    #[test]
    fn leading_verb_decides_intent() {
        assert_eq!(classify("Write a function that parses dates").intent, Intent::Write);
        assert_eq!(classify("Find every TODO in src/").intent, Intent::Search);
        assert_eq!(classify("Analyze the error logs from yesterday").intent, Intent::Analyze);
        assert_eq!(classify("Deploy the staging build").intent, Intent::Manage);
        assert_eq!(classify("Show me config.json").intent, Intent::Read);
    }

    #[test]
    fn phrases_match_on_word_boundaries() {
        assert_eq!(classify("Please look for unused imports").intent, Intent::Search);
        assert_eq!(classify("outlook formatting").intent, Intent::Analyze);
    }

    #[test]
    fn unknown_text_defaults_to_analyze_with_lowest_confidence() {
        let r = classify("zxqv blorp");
        assert_eq!(r.intent, Intent::Analyze);
        assert_eq!(r.confidence, FALLBACK_CONFIDENCE);

        let empty = classify("");
        assert_eq!(empty.intent, Intent::Analyze);
        assert_eq!(empty.confidence, FALLBACK_CONFIDENCE);
    }

    #[test]
    fn ambiguous_text_has_lower_confidence() {
        let clear = classify("Delete the temp directory");
        let mixed = classify("please read or write");
        assert!(mixed.confidence < clear.confidence);
        assert_eq!(mixed.confidence, MIN_MATCH_CONFIDENCE);
        assert_eq!(mixed.intent, Intent::Read);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "Compare the two designs and explain the trade-off";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        assert_eq!(classify("LIST, files!").intent, Intent::Read);
    }
}

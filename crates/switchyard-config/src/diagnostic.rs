// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Converts Figment deserialization errors and semantic validation failures
//! into miette diagnostics with source spans and "did you mean?" hints
//! computed with Jaro-Winkler similarity. The same matcher suggests catalog
//! model ids when a tier references a model that is not declared.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// Catches typos like `cooldwn_secs` -> `cooldown_secs` and
/// `gemini-2.0-flsh` -> `gemini-2.0-flash` while filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(switchyard::config::unknown_key),
        help("{}", format_suggestion_help(suggestion.as_deref(), "valid keys", valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(switchyard::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(switchyard::config::missing_key),
        help("add `{key} = <value>` to your switchyard.toml")
    )]
    MissingKey { key: String },

    /// A routing tier names a model that is not in `[[models]]`.
    #[error("routing.{tier} references undeclared model `{model}`")]
    #[diagnostic(
        code(switchyard::config::unknown_model),
        help("{}", format_suggestion_help(suggestion.as_deref(), "declared models", declared))
    )]
    UnknownModel {
        tier: String,
        model: String,
        suggestion: Option<String>,
        declared: String,
    },

    /// A numeric value lies outside its permitted range.
    #[error("`{key}` = {value} is out of range")]
    #[diagnostic(code(switchyard::config::out_of_range), help("expected {range}"))]
    OutOfRange {
        key: String,
        value: String,
        range: String,
    },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(switchyard::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(switchyard::config::other))]
    Other(String),
}

impl ConfigError {
    /// Out-of-range error for `key`.
    pub fn out_of_range(key: &str, value: impl std::fmt::Display, range: &str) -> Self {
        Self::OutOfRange {
            key: key.to_string(),
            value: value.to_string(),
            range: range.to_string(),
        }
    }
}

fn format_suggestion_help(suggestion: Option<&str>, label: &str, options: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {label}: {options}"),
        None => format!("{label}: {options}"),
    }
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A figment error may aggregate several failures; each one becomes its own
/// diagnostic, with fuzzy suggestions for unknown fields.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    let mut errors = Vec::new();

    for error in err {
        let config_error = match &error.kind {
            Kind::UnknownField(field, expected) => {
                let valid_keys: Vec<&str> = expected.to_vec();
                let suggestion = suggest_key(field, &valid_keys);
                let (span, src) = find_source_span(&error, field, toml_sources);

                ConfigError::UnknownKey {
                    key: field.clone(),
                    suggestion,
                    valid_keys: valid_keys.join(", "),
                    span,
                    src,
                }
            }
            Kind::MissingField(field) => ConfigError::MissingKey {
                key: dotted_key(&error.path, Some(&field[..])),
            },
            Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                key: dotted_key(&error.path, None),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            Kind::InvalidValue(actual, expected) => ConfigError::InvalidType {
                key: dotted_key(&error.path, None),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
            },
            Kind::UnknownVariant(variant, expected) => ConfigError::InvalidType {
                key: dotted_key(&error.path, None),
                detail: format!("unknown variant `{variant}`"),
                expected: format!("one of: {}", expected.join(", ")),
            },
            _ => ConfigError::Other(format!("{error}")),
        };

        errors.push(config_error);
    }

    errors
}

fn dotted_key(path: &[String], leaf: Option<&str>) -> String {
    path.iter()
        .map(String::as_str)
        .chain(leaf)
        .collect::<Vec<_>>()
        .join(".")
}

/// Locate the offending key in whichever source file the error came from.
fn find_source_span(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    match locate_key(error, field, toml_sources) {
        Some((span, src)) => (Some(span), Some(src)),
        None => (None, None),
    }
}

fn locate_key(
    error: &figment::error::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> Option<(SourceSpan, NamedSource<String>)> {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|source| match source {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline sources (tests, `load_and_validate_str`) carry no file path.
    let (name, content) = match origin {
        Some(origin) => toml_sources.iter().find(|(name, _)| *name == origin)?,
        None => toml_sources.first()?,
    };

    let offset = find_key_offset(content, &error.path, field)?;
    Some((
        SourceSpan::new(offset.into(), field.len()),
        NamedSource::new(name, content.clone()),
    ))
}

/// Find the byte offset of a key in TOML content, relative to a section path.
///
/// For `path = ["cache"]` and `field = "ttl_sec"`, finds the `[cache]` header
/// then searches for `ttl_sec` after it. Array-of-tables headers such as
/// `[[models]]` and `[[routing.simple]]` match their path as well. For
/// top-level fields, searches from the start.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let section: Vec<&str> = path
        .iter()
        .map(String::as_str)
        .filter(|seg| seg.parse::<usize>().is_err())
        .collect();

    let search_start = if section.is_empty() {
        0
    } else {
        let dotted = section.join(".");
        let table = format!("[{dotted}]");
        let array = format!("[[{dotted}]]");
        content
            .find(&array)
            .map(|p| p + array.len())
            .or_else(|| content.find(&table).map(|p| p + table.len()))?
    };

    let mut offset = search_start;
    for line in content[search_start..].split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let is_key = line[indent..]
            .strip_prefix(field)
            .and_then(|after| after.chars().next())
            .is_some_and(|c| matches!(c, ' ' | '\t' | '='));
        if is_key {
            return Some(offset + indent);
        }
        offset += line.len();
    }

    None
}

/// The closest valid key by Jaro-Winkler similarity, above the threshold.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render each error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut rendered = String::new();
        match handler.render_report(&mut rendered, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{rendered}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

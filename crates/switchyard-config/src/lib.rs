// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Switchyard routing pipeline.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, environment variable overrides, and diagnostic
//! error rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use switchyard_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("service: {}", config.service.name);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::SwitchyardConfig;

/// Load configuration from the standard locations and validate it.
///
/// Figment failures become miette diagnostics pointing into whichever
/// config files exist; semantic problems are collected by
/// [`validation::validate_config`].
pub fn load_and_validate() -> Result<SwitchyardConfig, Vec<ConfigError>> {
    checked(loader::load_config(), existing_sources)
}

/// Load configuration from an explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<SwitchyardConfig, Vec<ConfigError>> {
    tracing::debug!(path = %path.display(), "loading configuration file");
    checked(loader::load_config_from_path(path), || {
        read_source(path).into_iter().collect()
    })
}

/// Validate a TOML string on its own, without files or environment.
pub fn load_and_validate_str(toml_content: &str) -> Result<SwitchyardConfig, Vec<ConfigError>> {
    checked(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

/// Validate a loaded config, or turn the load error into diagnostics.
///
/// `sources` is only read on failure, to resolve error spans.
fn checked(
    loaded: Result<SwitchyardConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<SwitchyardConfig, Vec<ConfigError>> {
    let config = loaded.map_err(|err| diagnostic::figment_to_config_errors(err, &sources()))?;
    validation::validate_config(&config)?;
    Ok(config)
}

fn read_source(path: &Path) -> Option<(String, String)> {
    let content = std::fs::read_to_string(path).ok()?;
    let name = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    Some((name.display().to_string(), content))
}

/// Contents of every config file on the search path that exists.
fn existing_sources() -> Vec<(String, String)> {
    loader::search_paths()
        .iter()
        .filter_map(|path| read_source(path))
        .collect()
}

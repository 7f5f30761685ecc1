// SPDX-FileCopyrightText: 2026 Switchyard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./switchyard.toml` > `~/.config/switchyard/switchyard.toml` > `/etc/switchyard/switchyard.toml`
//! with environment variable overrides via `SWITCHYARD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SwitchyardConfig;

/// Sections whose keys may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "routing",
    "circuit_breaker",
    "chunking",
    "cache",
    "preprocessing",
    "metrics",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/switchyard/switchyard.toml` (system-wide)
/// 3. `~/.config/switchyard/switchyard.toml` (user XDG config)
/// 4. `./switchyard.toml` (local directory)
/// 5. `SWITCHYARD_*` environment variables
pub fn load_config() -> Result<SwitchyardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SwitchyardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchyardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SwitchyardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SwitchyardConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Config files consulted by [`load_config`], lowest precedence first.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/switchyard/switchyard.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("switchyard").join("switchyard.toml"));
    }
    paths.push(PathBuf::from("switchyard.toml"));
    paths
}

/// The layered Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    search_paths()
        .into_iter()
        .fold(
            Figment::new().merge(Serialized::defaults(SwitchyardConfig::default())),
            |figment, path| figment.merge(Toml::file(path)),
        )
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because section and key
/// names contain underscores: `SWITCHYARD_CIRCUIT_BREAKER_COOLDOWN_SECS`
/// must map to `circuit_breaker.cooldown_secs`.
fn env_provider() -> Env {
    Env::prefixed("SWITCHYARD_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

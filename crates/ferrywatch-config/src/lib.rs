//! Shared configuration for ferrywatch.
//!
//! TOML profiles (one per controller), figment layering of defaults,
//! file and `FERRYWATCH_` environment, and translation into
//! `ferrywatch_core::SessionConfig` / `SubscriptionScope`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use ferrywatch_core::{
    KeyTemplate, OwnerRef, ReconnectConfig, RelationTable, ResourceKind, SessionConfig,
    SubscriptionScope, WatchAction,
};

/// Path of the controller's resource event feed, relative to its base URL.
pub const EVENTS_PATH: &str = "/v1/resources/events";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found in config")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named controller profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Resolve a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// "plain" or "json".
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Connect timeout in seconds for one-shot probes.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "plain".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named controller profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Controller base URL (e.g., "http://10.0.0.5:8080").
    pub controller: String,

    /// Event feed path, appended to `controller`. Default: `/v1/resources/events`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_path: Option<String>,

    /// Scope: action filter ("created", "updated", "deleted", "all").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<WatchAction>,

    /// Scope: kind filter ("Machine", "Node", ... or "All").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,

    /// Scope: single resource id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Scope: owner reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<OwnerRef>,

    /// Extra headers sent on the upgrade request (e.g. Authorization).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_initial_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect_max_ms: Option<u64>,

    /// Omit to retry forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Start from an empty relation table instead of the standard one.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub direct_only: bool,

    /// Per-kind relation overrides, keyed by kind name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, Vec<KeyTemplate>>,
}

impl Profile {
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            ..Self::default()
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "ferrywatch", "ferrywatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("ferrywatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` layered over defaults, with `FERRYWATCH_` env on top.
///
/// Nested keys use `__`: `FERRYWATCH_PROFILES__LAB__CONTROLLER`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("FERRYWATCH_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation to core types ───────────────────────────────────────

/// Event feed URL for a profile, without scope parameters.
pub fn profile_endpoint(profile: &Profile) -> Result<Url, ConfigError> {
    let base: Url = profile
        .controller
        .parse()
        .map_err(|e: url::ParseError| ConfigError::Validation {
            field: "controller".into(),
            reason: format!("invalid URL '{}': {e}", profile.controller),
        })?;

    if !matches!(base.scheme(), "http" | "https" | "ws" | "wss") {
        return Err(ConfigError::Validation {
            field: "controller".into(),
            reason: format!("unsupported scheme '{}'", base.scheme()),
        });
    }

    let path = profile.events_path.as_deref().unwrap_or(EVENTS_PATH);
    let mut endpoint = base;
    let joined = format!(
        "{}/{}",
        endpoint.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    endpoint.set_path(&joined);
    Ok(endpoint)
}

/// Subscription scope declared by a profile. Unset filters mean `All`.
pub fn profile_scope(profile: &Profile) -> SubscriptionScope {
    SubscriptionScope {
        action: profile.action.unwrap_or_default(),
        kind: profile.kind.unwrap_or_default(),
        id: profile.id.clone(),
        owner: profile.owner.clone(),
    }
}

pub fn profile_reconnect(profile: &Profile) -> Result<ReconnectConfig, ConfigError> {
    let defaults = ReconnectConfig::default();
    let reconnect = ReconnectConfig {
        initial_delay: profile
            .reconnect_initial_ms
            .map_or(defaults.initial_delay, Duration::from_millis),
        max_delay: profile
            .reconnect_max_ms
            .map_or(defaults.max_delay, Duration::from_millis),
        max_retries: profile.max_retries,
    };

    if reconnect.initial_delay.is_zero() {
        return Err(ConfigError::Validation {
            field: "reconnect_initial_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }
    if reconnect.max_delay < reconnect.initial_delay {
        return Err(ConfigError::Validation {
            field: "reconnect_max_ms".into(),
            reason: "must not be smaller than reconnect_initial_ms".into(),
        });
    }
    Ok(reconnect)
}

/// Standard (or empty) relation table with the profile's overrides applied.
pub fn profile_relations(profile: &Profile) -> Result<RelationTable, ConfigError> {
    let mut table = if profile.direct_only {
        RelationTable::direct_only()
    } else {
        RelationTable::standard()
    };

    for (name, templates) in &profile.relations {
        let kind: ResourceKind = name.parse().map_err(|_| ConfigError::Validation {
            field: format!("relations.{name}"),
            reason: format!("unknown resource kind '{name}'"),
        })?;
        table
            .set(kind, templates.clone())
            .map_err(|e| ConfigError::Validation {
                field: format!("relations.{name}"),
                reason: e.to_string(),
            })?;
    }
    Ok(table)
}

/// Build a `SessionConfig` from a profile.
pub fn profile_to_session_config(profile: &Profile) -> Result<SessionConfig, ConfigError> {
    Ok(SessionConfig::new(profile_endpoint(profile)?)
        .with_reconnect(profile_reconnect(profile)?)
        .with_relations(profile_relations(profile)?))
}

// ── Tests ───────────────────────────────────────────────────────────

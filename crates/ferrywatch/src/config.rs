//! GlobalOpts-aware wrappers over `ferrywatch_config`.
//!
//! Resolves which profile a command runs against, applying `--controller`
//! and scope flag overrides on top of the config file.

use std::path::PathBuf;

use ferrywatch_config::{Config, Profile, load_config_from, profile_relations, profile_scope};
use ferrywatch_core::{RelationTable, SubscriptionScope};

use crate::cli::{GlobalOpts, ScopeArgs};
use crate::error::CliError;

/// Config file in effect: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(ferrywatch_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&config_file(global))?)
}

/// Profile name: `--profile`, then the config's default, then "default".
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// The profile a connected command runs against, with `--controller` applied.
pub fn resolve_profile(global: &GlobalOpts) -> Result<Profile, CliError> {
    let cfg = load(global)?;
    let name = active_profile_name(global, &cfg);

    if let Some(profile) = cfg.profiles.get(&name) {
        let mut profile = profile.clone();
        if let Some(ref controller) = global.controller {
            profile.controller.clone_from(controller);
        }
        return Ok(profile);
    }

    // No profile: --controller alone is enough.
    if let Some(ref controller) = global.controller {
        return Ok(Profile::new(controller.clone()));
    }

    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name,
            available: available_profiles(&cfg),
        });
    }

    Err(CliError::NoConfig {
        path: config_file(global).display().to_string(),
    })
}

/// Relation table for offline commands: the active profile's, or the
/// standard table when nothing is configured.
pub fn resolve_relations(global: &GlobalOpts) -> Result<RelationTable, CliError> {
    let cfg = load(global)?;
    let name = active_profile_name(global, &cfg);
    match cfg.profiles.get(&name) {
        Some(profile) => Ok(profile_relations(profile)?),
        None if global.profile.is_some() => Err(CliError::ProfileNotFound {
            name,
            available: available_profiles(&cfg),
        }),
        None => Ok(RelationTable::standard()),
    }
}

/// Profile scope with command-line filters layered on top.
pub fn resolve_scope(profile: &Profile, args: &ScopeArgs) -> SubscriptionScope {
    let mut scope = profile_scope(profile);
    if let Some(action) = args.action {
        scope.action = action;
    }
    if let Some(kind) = args.kind {
        scope.kind = kind;
    }
    if args.id.is_some() {
        scope.id.clone_from(&args.id);
    }
    if args.owner.is_some() {
        scope.owner.clone_from(&args.owner);
    }
    scope
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        "(none)".into()
    } else {
        cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

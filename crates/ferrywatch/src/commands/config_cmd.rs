//! Config subcommand handlers.

use ferrywatch_config::{Config, ConfigError, Profile, profile_to_session_config, save_config_to};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const SETTABLE_KEYS: &str = "controller, events_path, action, kind, id, owner, max_retries, \
                             reconnect_initial_ms, reconnect_max_ms, direct_only, header.<NAME>";

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = config::config_file(global);

    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { url, name, force } => {
            if path.exists() && !force {
                return Err(CliError::Validation {
                    field: "config".into(),
                    reason: format!("{} already exists (use --force to overwrite)", path.display()),
                });
            }

            let profile = Profile::new(url);
            profile_to_session_config(&profile)?;

            let mut cfg = Config {
                default_profile: Some(name.clone()),
                ..Config::default()
            };
            cfg.profiles.insert(name.clone(), profile);
            save_config_to(&cfg, &path)?;

            output::print_status(
                &format!("Configuration written to {}\n  Active profile: {name}", path.display()),
                global.quiet,
            );
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            let rendered = match output::render_structured(global.output, &cfg)? {
                Some(json) => json,
                None => toml::to_string_pretty(&cfg).map_err(ConfigError::from)?,
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load(global)?;
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();

            set_key(profile, &key, value)?;
            if !profile.controller.is_empty() {
                profile_to_session_config(profile)?;
            }
            save_config_to(&cfg, &path)?;

            output::print_status(&format!("Set {key} on profile '{profile_name}'"), global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load(global)?;
            let active = config::active_profile_name(global, &cfg);
            let names: Vec<&String> = cfg.profiles.keys().collect();

            let rendered = match output::render_structured(global.output, &names)? {
                Some(json) => json,
                None => cfg
                    .profiles
                    .iter()
                    .map(|(name, profile)| {
                        let marker = if *name == active { "*" } else { " " };
                        format!("{marker} {name:<16} {}", profile.controller)
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            };
            output::print_output(&rendered, global.quiet);
            Ok(())
        }

        // ── Use <name> ──────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load(global)?;
            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: config::available_profiles(&cfg),
                    name,
                });
            }
            cfg.default_profile = Some(name.clone());
            save_config_to(&cfg, &path)?;
            output::print_status(&format!("Default profile set to '{name}'"), global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn invalid(field: &str, reason: impl Into<String>) -> CliError {
    CliError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Empty values clear optional keys.
fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    let clear = value.is_empty();

    match key {
        "controller" => profile.controller = value,
        "events_path" | "events-path" => profile.events_path = (!clear).then_some(value),
        "action" => {
            profile.action = if clear {
                None
            } else {
                Some(value.parse().map_err(|e| invalid("action", format!("{e}")))?)
            };
        }
        "kind" => {
            profile.kind = if clear {
                None
            } else {
                Some(value.parse().map_err(|_| invalid("kind", format!("unknown resource kind '{value}'")))?)
            };
        }
        "id" => profile.id = (!clear).then_some(value),
        "owner" => {
            profile.owner = if clear {
                None
            } else {
                let (kind, id) = value
                    .split_once('/')
                    .filter(|(kind, id)| !kind.is_empty() && !id.is_empty())
                    .ok_or_else(|| invalid("owner", "expected KIND/ID"))?;
                Some(ferrywatch_core::OwnerRef::new(kind, id))
            };
        }
        "max_retries" | "max-retries" => profile.max_retries = parse_opt(key, &value)?,
        "reconnect_initial_ms" | "reconnect-initial-ms" => {
            profile.reconnect_initial_ms = parse_opt(key, &value)?;
        }
        "reconnect_max_ms" | "reconnect-max-ms" => profile.reconnect_max_ms = parse_opt(key, &value)?,
        "direct_only" | "direct-only" => {
            profile.direct_only = value
                .parse()
                .map_err(|_| invalid("direct_only", "must be 'true' or 'false'"))?;
        }
        other => {
            if let Some(name) = other.strip_prefix("header.") {
                if clear {
                    profile.headers.remove(name);
                } else {
                    profile.headers.insert(name.to_owned(), value);
                }
            } else {
                return Err(invalid(
                    other,
                    format!("unknown config key '{other}'. Valid keys: {SETTABLE_KEYS}"),
                ));
            }
        }
    }
    Ok(())
}

fn parse_opt<T: std::str::FromStr>(field: &str, value: &str) -> Result<Option<T>, CliError> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| invalid(field, format!("must be a number, got '{value}'")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ferrywatch_core::{OwnerRef, ResourceKind, WatchAction};

    #[test]
    fn set_key_parses_typed_values() {
        let mut profile = Profile::new("http://x");
        set_key(&mut profile, "kind", "Machine".into()).unwrap();
        set_key(&mut profile, "action", "deleted".into()).unwrap();
        set_key(&mut profile, "owner", "Node/node-7".into()).unwrap();
        set_key(&mut profile, "max-retries", "4".into()).unwrap();
        set_key(&mut profile, "header.Authorization", "Bearer t".into()).unwrap();

        assert_eq!(profile.kind, Some(ResourceKind::Machine));
        assert_eq!(profile.action, Some(WatchAction::Deleted));
        assert_eq!(profile.owner, Some(OwnerRef::new("Node", "node-7")));
        assert_eq!(profile.max_retries, Some(4));
        assert_eq!(profile.headers["Authorization"], "Bearer t");

        set_key(&mut profile, "max_retries", String::new()).unwrap();
        set_key(&mut profile, "header.Authorization", String::new()).unwrap();
        assert_eq!(profile.max_retries, None);
        assert!(profile.headers.is_empty());
    }

    #[test]
    fn set_key_rejects_bad_input() {
        let mut profile = Profile::new("http://x");
        assert!(set_key(&mut profile, "kind", "Gadget".into()).is_err());
        assert!(set_key(&mut profile, "owner", "node-7".into()).is_err());
        assert!(set_key(&mut profile, "max_retries", "many".into()).is_err());
        assert!(set_key(&mut profile, "colour", "blue".into()).is_err());
    }
}

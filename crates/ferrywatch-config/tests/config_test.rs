#![allow(clippy::unwrap_used)]

use std::time::Duration;

use pretty_assertions::assert_eq;

use ferrywatch_config::{
    Config, Profile, load_config_from, profile_scope, profile_to_session_config, save_config_to,
};
use ferrywatch_core::{KeyTemplate, OwnerRef, ResourceKind, WatchAction};

const LAB_TOML: &str = r#"
default_profile = "lab"

[defaults]
output = "json"

[profiles.lab]
controller = "http://10.0.0.5:8080"
kind = "Machine"
action = "updated"
max_retries = 3
reconnect_initial_ms = 500

[profiles.lab.headers]
Authorization = "Bearer abc"

[profiles.lab.owner]
kind = "Node"
id = "node-7"

[[profiles.lab.relations.Instance]]
type = "list"
kind = "Instance"

[[profiles.lab.relations.Instance]]
type = "related"
kind = "Cluster"
field = "/clusterId"
"#;

#[test]
fn toml_file_merges_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, LAB_TOML).unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.default_profile.as_deref(), Some("lab"));
    assert_eq!(config.defaults.output, "json");
    assert_eq!(config.defaults.color, "auto");
    assert_eq!(config.defaults.timeout, 10);

    let (name, profile) = config.profile(None).unwrap();
    assert_eq!(name, "lab");
    assert_eq!(profile.kind, Some(ResourceKind::Machine));
    assert_eq!(profile.action, Some(WatchAction::Updated));
    assert_eq!(profile.headers["Authorization"], "Bearer abc");
    assert_eq!(
        profile.relations["Instance"][1],
        KeyTemplate::related(ResourceKind::Cluster, "/clusterId")
    );

    let scope = profile_scope(profile);
    assert_eq!(scope.owner, Some(OwnerRef::new("Node", "node-7")));

    let session = profile_to_session_config(profile).unwrap();
    assert_eq!(
        session.endpoint.as_str(),
        "http://10.0.0.5:8080/v1/resources/events"
    );
    assert_eq!(session.reconnect.initial_delay, Duration::from_millis(500));
    assert_eq!(session.reconnect.max_retries, Some(3));
    assert_eq!(
        session.relations.required_fields(ResourceKind::Instance),
        vec!["/clusterId"]
    );
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.lab]\nkind = \"Gadget\"\ncontroller = \"http://x\"\n").unwrap();
    assert!(load_config_from(&path).is_err());
}

#[test]
fn integer_action_code_in_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[profiles.default]\ncontroller = \"http://x\"\naction = 2\n").unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.profiles["default"].action, Some(WatchAction::Deleted));
}

#[test]
fn env_override_accepts_action_code() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            "[profiles.default]\ncontroller = \"http://x\"\naction = \"created\"\n",
        )?;
        jail.set_env("FERRYWATCH_PROFILES__DEFAULT__ACTION", "1");

        let config = load_config_from(&jail.directory().join("config.toml"))
            .map_err(|e| e.to_string())?;
        assert_eq!(config.profiles["default"].action, Some(WatchAction::Updated));
        assert_eq!(config.profiles["default"].controller, "http://x");
        Ok(())
    });
}

#[test]
fn saved_config_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            kind: Some(ResourceKind::Network),
            max_retries: Some(10),
            ..Profile::new("https://ctl.example")
        },
    );
    save_config_to(&config, &path).unwrap();

    let loaded = load_config_from(&path).unwrap();
    assert_eq!(loaded, config);
}

//! Integration tests for configuration loading
//!
//! Covers file formats, resolution order and how configured defaults flow
//! into a stage request.

use cmrel::cli::{Cli, Commands};
use cmrel::config::loader::{load_config_from_file, resolve_config, save_config_to_file};
use cmrel::{ConfigError, ReleaseConfig, RevisionLookup};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_toml_config_feeds_stage_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cmrel.toml");
    fs::write(
        &path,
        r#"
bucket = "my-staging-bucket"
project = "my-gcp-project"
org = "my-fork"
signing_kms_key = ""
cloudbuild_file = "release/cloudbuild.json"
bucket_path_prefix = "staging"
"#,
    )
    .unwrap();

    let config = resolve_config(Some(&path)).expect("Failed to resolve config");
    assert_eq!(config.repo, "cert-manager");

    let cli = Cli::try_parse_from(["cmrel", "stage", "--branch", "master"]).unwrap();
    let Commands::Stage(args) = cli.cmd;
    let request = args.into_request(&config);

    assert_eq!(request.bucket, "my-staging-bucket");
    assert_eq!(request.project, "my-gcp-project");
    assert_eq!(request.org, "my-fork");
    assert_eq!(request.cloudbuild_file, PathBuf::from("release/cloudbuild.json"));
    assert!(request.signing_skipped());
    assert_eq!(request.source_repo_url(), "https://github.com/my-fork/cert-manager.git");
}

#[test]
fn test_json_and_toml_round_trip_agree() {
    let temp_dir = TempDir::new().unwrap();
    let config = ReleaseConfig {
        machine_type: "E2_HIGHCPU_32".to_string(),
        poll_interval_secs: 5,
        revision_lookup: RevisionLookup::GitRemote,
        ..Default::default()
    };

    let json_path = temp_dir.path().join("cmrel.json");
    let toml_path = temp_dir.path().join("cmrel.toml");
    save_config_to_file(&config, &json_path).unwrap();
    save_config_to_file(&config, &toml_path).unwrap();

    let from_json = load_config_from_file(&json_path).unwrap();
    let from_toml = load_config_from_file(&toml_path).unwrap();
    assert_eq!(from_json, config);
    assert_eq!(from_toml, config);
}

#[test]
fn test_invalid_toml_reported() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    fs::write(&path, "bucket = ").unwrap();

    assert!(matches!(
        load_config_from_file(&path),
        Err(ConfigError::InvalidToml(_))
    ));
}

#[test]
fn test_unknown_lookup_method_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cmrel.json");
    fs::write(&path, r#"{"revision_lookup": "carrier-pigeon"}"#).unwrap();

    assert!(matches!(
        load_config_from_file(&path),
        Err(ConfigError::InvalidJson(_))
    ));
}

#[test]
fn test_empty_required_value_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cmrel.toml");
    fs::write(&path, "project = \"\"\n").unwrap();

    match load_config_from_file(&path) {
        Err(ConfigError::ValidationFailed(msg)) => assert!(msg.contains("project")),
        other => panic!("expected ValidationFailed, got {:?}", other),
    }
}

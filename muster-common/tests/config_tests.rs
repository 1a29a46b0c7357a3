//! Configuration resolution and graceful degradation
//!
//! Tests that manipulate MUSTER_ROOT_FOLDER are marked #[serial] so they
//! never race on the process environment.

use muster_common::config::{
    default_root_folder, load_toml_or_default, ConfigSource, LoggingConfig, RootFolderInitializer,
    RootFolderResolver, ROOT_FOLDER_ENV,
};
use muster_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug, Default, Deserialize, PartialEq)]
struct SampleConfig {
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve(None, None);

    assert!(!root_folder.as_os_str().is_empty());
    assert_eq!(root_folder, default_root_folder());
}

#[test]
#[serial]
fn test_resolver_cli_beats_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/muster-env");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve(Some(Path::new("/tmp/muster-cli")), None);
    assert_eq!(root_folder, PathBuf::from("/tmp/muster-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_environment_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/muster-env");

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve(None, Some(Path::new("/tmp/muster-toml")));
    assert_eq!(root_folder, PathBuf::from("/tmp/muster-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolver_toml_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolver = RootFolderResolver::new("test-module");
    let root_folder = resolver.resolve(None, Some(Path::new("/tmp/muster-toml")));
    assert_eq!(root_folder, PathBuf::from("/tmp/muster-toml"));
}

#[test]
#[serial]
fn test_resolver_ignores_blank_env() {
    env::set_var(ROOT_FOLDER_ENV, "  ");

    let resolver = RootFolderResolver::new("test-module");
    assert_eq!(resolver.resolve(None, None), default_root_folder());

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
fn test_initializer_creates_directory() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("a").join("b");
    let initializer = RootFolderInitializer::new(root.clone());

    assert!(!root.exists());
    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());

    // Second call is a no-op
    initializer.ensure_directory_exists().unwrap();
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("absent.toml");
    let (config, source): (SampleConfig, _) = load_toml_or_default(&path).unwrap();
    assert_eq!(config, SampleConfig::default());
    // Reported back so the caller can warn once logging is initialised
    assert_eq!(source, ConfigSource::Missing(path));
}

#[test]
fn test_partial_config_file_fills_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("muster.toml");
    std::fs::write(&path, "port = 4000\n").unwrap();

    let (config, source): (SampleConfig, _) = load_toml_or_default(&path).unwrap();
    assert_eq!(config.port, Some(4000));
    assert_eq!(source, ConfigSource::File(path.clone()));
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_malformed_config_file_is_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("muster.toml");
    std::fs::write(&path, "port = [not toml").unwrap();

    let result: muster_common::Result<(SampleConfig, ConfigSource)> = load_toml_or_default(&path);
    assert!(matches!(result, Err(Error::Config(_))));
}

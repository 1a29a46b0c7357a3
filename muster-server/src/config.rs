//! Configuration for muster-server
//!
//! Bootstrap only: the TOML file is read once at startup, command-line
//! arguments override it, and every field has a built-in default.

use chrono_tz::Tz;
use clap::Parser;
use muster_common::config::{
    default_config_path, load_toml_or_default, ConfigSource, LoggingConfig, RootFolderResolver,
};
use muster_common::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "muster-server.toml";

/// Command-line arguments for muster-server
#[derive(Parser, Debug, Default)]
#[command(name = "muster-server")]
#[command(about = "Snapshot store and scheduled report notifications for muster")]
#[command(version)]
pub struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "MUSTER_SERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MUSTER_PORT")]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Folder holding app-data.json and push-subscribers.json
    #[arg(short, long)]
    pub root_folder: Option<PathBuf>,

    /// IANA time zone for the report schedule
    #[arg(long)]
    pub timezone: Option<String>,

    /// PEM file holding the VAPID P-256 private key
    #[arg(long, env = "MUSTER_VAPID_PRIVATE_KEY")]
    pub vapid_private_key: Option<PathBuf>,
}

/// TOML bootstrap configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port (default 3000)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Only browser origin allowed to call the API
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,

    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// IANA time zone name the triggers are evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Contact identifying this sender to push services
    #[serde(default = "default_contact")]
    pub contact: String,

    /// VAPID private key (PEM); scheduled notifications are off without it
    #[serde(default)]
    pub vapid_private_key: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_allowed_origin() -> String {
    "http://127.0.0.1:5500".to_string()
}

fn default_timezone() -> String {
    "America/Chicago".to_string()
}

fn default_contact() -> String {
    "mailto:your-email@example.com".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origin: default_allowed_origin(),
            root_folder: None,
            timezone: default_timezone(),
            contact: default_contact(),
            vapid_private_key: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load the TOML file named by `args` (or the default path) and apply
    /// command-line overrides
    pub fn load(args: &Args) -> Result<(Self, ConfigSource)> {
        let path = args
            .config
            .clone()
            .or_else(|| default_config_path(CONFIG_FILE_NAME));

        let (config, source) = match path {
            Some(path) => load_toml_or_default(&path)?,
            None => (Self::default(), ConfigSource::Defaults),
        };
        Ok((config.with_overrides(args), source))
    }

    pub fn with_overrides(mut self, args: &Args) -> Self {
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(host) = &args.host {
            self.host = host.clone();
        }
        if let Some(timezone) = &args.timezone {
            self.timezone = timezone.clone();
        }
        if let Some(key) = &args.vapid_private_key {
            self.vapid_private_key = Some(key.clone());
        }
        self
    }

    /// Data folder: command line, environment, config file, then default
    pub fn resolve_root_folder(&self, args: &Args) -> PathBuf {
        RootFolderResolver::new("muster-server").resolve(
            args.root_folder.as_deref(),
            self.root_folder.as_deref(),
        )
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn parse_timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| Error::Config(format!("Unknown time zone '{}': {}", self.timezone, e)))
    }
}

//! Configuration for the muster client

use clap::ValueEnum;
use muster_common::config::{
    default_config_path, load_toml_or_default, ConfigSource, LoggingConfig,
};
use muster_common::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "muster.toml";

/// Local storage file name inside the root folder
pub const LOCAL_STORAGE_FILE: &str = "local-storage.json";

/// Which scanning page the station behaves like
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Quick-scan page: newest-first log capped at 500 entries, status
    /// taken from the association
    Basic,
    /// Roster page: unbounded chronological log, explicit in/out status,
    /// auto check-in when an association is saved
    #[default]
    Roster,
}

/// Storage keys used by one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKeys {
    pub associations: &'static str,
    pub current_status: &'static str,
    pub scan_log: &'static str,
}

impl Variant {
    pub fn storage_keys(self) -> StorageKeys {
        match self {
            Variant::Basic => StorageKeys {
                associations: "barcodeData",
                current_status: "currentStatus",
                scan_log: "scanLogData",
            },
            Variant::Roster => StorageKeys {
                associations: "barcodeAssociations",
                current_status: "currentStatus",
                scan_log: "scanLog",
            },
        }
    }

    pub fn status_headers(self) -> &'static [&'static str] {
        match self {
            Variant::Basic => &["barcode", "name", "status"],
            Variant::Roster => &["barcode", "name", "room", "phase", "status"],
        }
    }

    pub fn log_headers(self) -> &'static [&'static str] {
        match self {
            Variant::Basic => &["timestamp", "barcode", "name", "status"],
            Variant::Roster => &["barcode", "name", "room", "phase", "status", "timestamp"],
        }
    }

    pub fn status_file_name(self) -> &'static str {
        match self {
            Variant::Basic => "barcode-associations.csv",
            Variant::Roster => "current_status.csv",
        }
    }

    pub fn log_file_name(self) -> &'static str {
        match self {
            Variant::Basic => "barcode-scan-log.csv",
            Variant::Roster => "scan_log.csv",
        }
    }
}

/// TOML bootstrap configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL receiving snapshots
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Local storage file (default `<root>/local-storage.json`)
    #[serde(default)]
    pub storage_path: Option<PathBuf>,

    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub variant: Variant,

    #[serde(default = "default_sync_enabled")]
    pub sync_enabled: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_backend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_sync_enabled() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            storage_path: None,
            root_folder: None,
            variant: Variant::default(),
            sync_enabled: default_sync_enabled(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load `path`, or the default config path when `None`
    ///
    /// The returned [`ConfigSource`] is logged by the caller once tracing is
    /// initialised.
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match path
            .map(Path::to_path_buf)
            .or_else(|| default_config_path(CONFIG_FILE_NAME))
        {
            Some(path) => load_toml_or_default(&path),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Storage file: explicit path, else inside `root_folder`
    pub fn storage_file(&self, root_folder: &Path) -> PathBuf {
        self.storage_path
            .clone()
            .unwrap_or_else(|| root_folder.join(LOCAL_STORAGE_FILE))
    }
}

//! Configuration loading and root folder resolution
//!
//! # Sources (highest priority first)
//!
//! 1. Command-line arguments
//! 2. Environment variables (`CIVIC_ROOT_FOLDER`, then `CIVIC_ROOT`)
//! 3. TOML file at `~/.config/civic/<module>.toml`
//! 4. Compiled defaults
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! the defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Primary root folder environment variable
pub const ROOT_FOLDER_ENV: &str = "CIVIC_ROOT_FOLDER";

/// Alternative root folder environment variable
pub const ROOT_ENV: &str = "CIVIC_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "civic.db";

/// Upload directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Built-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub token_ttl_minutes: i64,
    pub admin_phone: String,
    pub allowed_origins: Vec<String>,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(target_os = "linux") {
            dirs::data_local_dir()
                .map(|d| d.join("civic"))
                .unwrap_or_else(|| PathBuf::from("/var/lib/civic"))
        } else if cfg!(target_os = "macos") {
            dirs::data_dir()
                .map(|d| d.join("civic"))
                .unwrap_or_else(|| PathBuf::from("/Library/Application Support/civic"))
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .map(|d| d.join("civic"))
                .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\civic"))
        } else {
            PathBuf::from("./civic_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8000,
            token_ttl_minutes: 30,
            admin_phone: "+919999999999".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Browser origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Access token configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }
}

/// SMS notification configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Recipient of "needs manual review" alerts
    #[serde(default = "default_admin_phone")]
    pub admin_phone: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_phone: default_admin_phone(),
        }
    }
}

/// Bootstrap configuration file contents
///
/// Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    /// Load the module's TOML file, falling back to defaults
    pub fn load_or_default(module_name: &str) -> Self {
        let Some(path) = config_file_path(module_name) else {
            return Self::default();
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

fn default_log_level() -> String {
    CompiledDefaults::for_current_platform().log_level
}

fn default_host() -> String {
    CompiledDefaults::for_current_platform().host
}

fn default_port() -> u16 {
    CompiledDefaults::for_current_platform().port
}

fn default_allowed_origins() -> Vec<String> {
    CompiledDefaults::for_current_platform().allowed_origins
}

fn default_token_ttl_minutes() -> i64 {
    CompiledDefaults::for_current_platform().token_ttl_minutes
}

fn default_admin_phone() -> String {
    CompiledDefaults::for_current_platform().admin_phone
}

fn default_true() -> bool {
    true
}

/// `~/.config/civic/<module>.toml`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("civic").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Set the command-line override
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(path) = TomlConfig::load_or_default(&self.module_name).root_folder {
            return path;
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Prepares the root folder layout
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root and upload directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }
}

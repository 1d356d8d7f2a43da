//! Configuration system for backrooms
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (BACKROOMS_* prefix, plus OPENAI_API_KEY and PORT)
//! 3. Configuration file (TOML)
//! 4. Default values

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::{Host, Url};

use crate::error::{Error, Result};
use crate::persona::{Persona, PersonaRegistry, PersonaRotation};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listening socket settings
    pub server: ServerSettings,

    /// Call budget
    pub limits: LimitSettings,

    /// Usage ledger storage
    pub ledger: LedgerSettings,

    /// Completion provider settings
    pub provider: ProviderSettings,

    /// Logging configuration
    pub logging: LoggingSettings,

    /// Persona rotation (bundled rotation when empty)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub personas: Vec<Persona>,
}

/// Listening socket settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind
    pub bind_addr: String,

    /// TCP port (0 = ephemeral)
    pub port: u16,

    /// Runtime worker threads (0 = auto)
    pub worker_threads: u32,
}

/// Call budget settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Provider calls allowed per UTC day, across all sessions
    pub daily_limit: u32,
}

/// Usage ledger storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSettings {
    /// Path of the JSON usage record
    pub path: String,
}

/// Which provider implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible HTTP API
    OpenAi,
    /// Local scripted replies, no network
    Mock,
}

/// Completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Provider implementation
    pub kind: ProviderKind,

    /// API base URL (OpenAI, Ollama, vLLM, LM Studio, etc.)
    pub base_url: String,

    /// API key (may be empty for loopback servers)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Request timeout in seconds (0 = none)
    pub timeout_secs: u64,

    /// Simulated latency of the mock provider in milliseconds
    pub mock_latency_ms: u64,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 3000,
            worker_threads: 0, // Auto-detect
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self { daily_limit: 20 }
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            path: "~/.backrooms/api_usage.json".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            timeout_secs: 0,
            mock_latency_ms: 0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_files: 5,
            json_format: false,
        }
    }
}

fn env_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl AppConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        // 1. Load from config file if it exists
        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e.message()),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        // 2. Apply environment variable overrides
        config.apply_env_overrides();

        // 3. Expand paths
        config.expand_paths();

        // 4. Validate
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::ConfigNotFound { path })
            };
        }

        let search_paths = [
            PathBuf::from("backrooms.toml"),
            dirs::config_dir()
                .map(|p| p.join("backrooms").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".backrooms").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // Server settings
        if let Ok(val) = std::env::var("BACKROOMS_BIND_ADDR") {
            self.server.bind_addr = val;
        }
        let port = std::env::var("BACKROOMS_PORT").or_else(|_| std::env::var("PORT"));
        if let Ok(val) = port {
            if let Ok(n) = val.parse() {
                self.server.port = n;
            }
        }

        // Limits
        if let Ok(val) = std::env::var("BACKROOMS_DAILY_LIMIT") {
            if let Ok(n) = val.parse() {
                self.limits.daily_limit = n;
            }
        }

        // Ledger
        if let Ok(val) = std::env::var("BACKROOMS_LEDGER_PATH") {
            self.ledger.path = val;
        }

        // Provider settings
        if let Ok(val) = std::env::var("BACKROOMS_PROVIDER") {
            match val.to_lowercase().as_str() {
                "openai" => self.provider.kind = ProviderKind::OpenAi,
                "mock" => self.provider.kind = ProviderKind::Mock,
                _ => {}
            }
        }
        if let Ok(val) = std::env::var("BACKROOMS_PROVIDER_BASE_URL") {
            self.provider.base_url = val;
        }
        if self.provider.api_key.is_empty() {
            if let Ok(val) = std::env::var("OPENAI_API_KEY") {
                self.provider.api_key = val;
            }
        }
        if let Ok(val) = std::env::var("BACKROOMS_API_KEY") {
            self.provider.api_key = val;
        }
        if let Ok(val) = std::env::var("BACKROOMS_PROVIDER_TIMEOUT_SECS") {
            if let Ok(n) = val.parse() {
                self.provider.timeout_secs = n;
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("BACKROOMS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("BACKROOMS_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Ok(val) = std::env::var("BACKROOMS_LOG_JSON") {
            self.logging.json_format = env_flag(&val);
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.ledger.path = expand_path(&self.ledger.path);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.bind_addr.is_empty() {
            return Err(Error::config_field_invalid("server.bind_addr", "bind address cannot be empty"));
        }

        if self.limits.daily_limit == 0 {
            return Err(Error::config_field_invalid(
                "limits.daily_limit",
                "daily_limit must be greater than zero",
            ));
        }

        if self.ledger.path.is_empty() {
            return Err(Error::config_field_invalid("ledger.path", "ledger path cannot be empty"));
        }

        if self.provider.kind == ProviderKind::OpenAi {
            let url = Url::parse(&self.provider.base_url).map_err(|e| {
                Error::config_field_invalid(
                    "provider.base_url",
                    format!("invalid provider URL '{}': {}", self.provider.base_url, e),
                )
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(Error::config_field_invalid(
                    "provider.base_url",
                    "provider URL must start with http:// or https://",
                ));
            }
        }

        for (i, persona) in self.personas.iter().enumerate() {
            if persona.display_name.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    format!("personas[{}].display_name", i),
                    "persona display_name cannot be empty",
                ));
            }
            if persona.model_id.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    format!("personas[{}].model_id", i),
                    format!("persona '{}' has no model_id", persona.display_name),
                ));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }

    /// Ensure the provider can authenticate. Loopback endpoints may run keyless.
    pub fn check_credentials(&self) -> Result<()> {
        if self.provider.kind != ProviderKind::OpenAi || !self.provider.api_key.is_empty() {
            return Ok(());
        }

        let loopback = Url::parse(&self.provider.base_url)
            .ok()
            .map(|url| match url.host() {
                Some(Host::Domain(d)) => d == "localhost",
                Some(Host::Ipv4(ip)) => ip.is_loopback(),
                Some(Host::Ipv6(ip)) => ip.is_loopback(),
                None => false,
            })
            .unwrap_or(false);

        if loopback {
            Ok(())
        } else {
            Err(Error::CredentialsMissing {
                base_url: self.provider.base_url.clone(),
            })
        }
    }

    /// The persona rotation this configuration describes
    pub fn rotation(&self) -> Result<PersonaRotation> {
        PersonaRegistry::new().resolve(&self.personas)
    }

    /// Socket address string to listen on
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_addr, self.server.port)
    }

    /// Ledger file as a PathBuf
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.ledger.path)
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or(std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".backrooms")
                .join("config.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    format!(
        r#"# backrooms configuration

[server]
# Address and port the WebSocket server listens on
bind_addr = "127.0.0.1"
port = 3000

# Runtime worker threads (0 = auto-detect)
worker_threads = 0

[limits]
# Provider calls allowed per UTC day, shared by every session
daily_limit = 20

[ledger]
# JSON file holding today's call count
path = "~/.backrooms/api_usage.json"

[provider]
# "openai" for any OpenAI-compatible API, "mock" for offline replies
kind = "openai"
base_url = "https://api.openai.com/v1"

# API key (or set OPENAI_API_KEY); may be omitted for loopback servers
# api_key = "sk-..."

# Request timeout in seconds (0 = none)
timeout_secs = 0

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.backrooms/logs/backrooms.log"

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

# Persona rotation. Speakers take turns in this order.
{}"#,
        PersonaRegistry::new()
            .bundled_toml()
            .lines()
            .skip_while(|l| l.starts_with('#') || l.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    )
}

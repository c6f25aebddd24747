//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$REFUNDSCAN_CONFIG` (environment variable)
//! 2. `~/.config/refundscan/config.toml` (Linux/macOS)
//!    `%APPDATA%\refundscan\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Gmail API access.
    pub gmail: GmailConfig,
    /// Provider search query used in live mode.
    pub query: QueryConfig,
    /// Keyword heuristics used to classify messages.
    pub classifier: ClassifierConfig,
    /// Simulated (dev) mode.
    pub simulate: SimulateConfig,
    /// Display settings.
    pub display: DisplayConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override the directory holding the state file and logs.
    pub data_dir: Option<PathBuf>,
    /// Scan window used until the user picks one.
    pub default_period_days: u32,
    /// Dev-mode default used until the user toggles it.
    pub dev_mode: bool,
}

/// Gmail API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    /// REST base URL for `users/me`.
    pub api_base_url: String,
    /// Web UI base URL used to open a message.
    pub web_base_url: String,
    /// Maximum number of messages inspected per scan.
    pub max_messages: usize,
    /// Environment variable holding an OAuth access token.
    pub token_env: String,
    /// Shell command printing an OAuth access token on stdout.
    pub token_command: Option<String>,
    /// OAuth client id; enables browser sign-in.
    pub oauth_client_id: Option<String>,
    /// OAuth client secret, for client types that have one.
    pub oauth_client_secret: Option<String>,
    /// Loopback redirect URI registered for the client.
    pub oauth_redirect_uri: String,
    pub oauth_auth_url: String,
    pub oauth_token_url: String,
    /// Requested scope.
    pub oauth_scope: String,
}

/// Provider search query parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Required label (empty = none).
    pub label: String,
    /// Categories, any of which may match.
    pub categories: Vec<String>,
    /// Search terms, any of which may match (e.g. `subject:refund`).
    pub terms: Vec<String>,
    /// Words excluded from the results.
    pub exclude: Vec<String>,
}

/// Classifier keyword lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// At least one of these must appear for a message to be a candidate.
    pub return_keywords: Vec<String>,
    /// Any of these marks a candidate as refunded.
    pub refund_keywords: Vec<String>,
    /// Maximum snippet length in characters.
    pub snippet_max_chars: usize,
}

/// Simulated mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulateConfig {
    /// Delay between progress steps in milliseconds.
    pub step_delay_ms: u64,
}

/// Display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// `strftime` format string for dates.
    pub date_format: String,
    /// Sender names longer than this are truncated with "...".
    pub sender_name_max: usize,
    /// Scan windows offered by the window selector.
    pub period_choices: Vec<u32>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            data_dir: None,
            default_period_days: 14,
            dev_mode: true,
        }
    }
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base_url: crate::fetch::gmail::DEFAULT_BASE_URL.to_string(),
            web_base_url: crate::present::DEFAULT_WEB_URL.to_string(),
            max_messages: 200,
            token_env: "REFUNDSCAN_ACCESS_TOKEN".to_string(),
            token_command: None,
            oauth_client_id: None,
            oauth_client_secret: None,
            oauth_redirect_uri: "http://127.0.0.1:8765/callback".to_string(),
            oauth_auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            oauth_token_url: "https://oauth2.googleapis.com/token".to_string(),
            oauth_scope: "https://www.googleapis.com/auth/gmail.readonly".to_string(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            label: "important".to_string(),
            categories: vec!["primary".to_string(), "updates".to_string()],
            terms: vec!["subject:refund".to_string(), "subject:\"return\"".to_string()],
            exclude: vec!["Fwd".to_string()],
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        let keywords = crate::classify::Keywords::default();
        Self {
            return_keywords: keywords.returns,
            refund_keywords: keywords.refunds,
            snippet_max_chars: crate::classify::SNIPPET_MAX_CHARS,
        }
    }
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self { step_delay_ms: 120 }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M".to_string(),
            sender_name_max: 20,
            period_choices: vec![7, 14, 30, 60, 90],
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location and return the path written.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("REFUNDSCAN_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("refundscan").join("config.toml"))
}

/// Return the data directory for the state file and logs.
pub fn data_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.data_dir {
        return dir.clone();
    }
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("refundscan")
}

/// Return the key-value state file path.
pub fn state_file_path(config: &Config) -> PathBuf {
    data_dir(config).join("state.json")
}

/// Return the OAuth token cache path.
pub fn token_cache_path(config: &Config) -> PathBuf {
    data_dir(config).join("tokens.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.default_period_days, 14);
        assert!(cfg.general.dev_mode);
        assert_eq!(cfg.gmail.max_messages, 200);
        assert_eq!(cfg.classifier.snippet_max_chars, 500);
        assert_eq!(cfg.simulate.step_delay_ms, 120);
        assert_eq!(cfg.display.sender_name_max, 20);
        assert_eq!(cfg.query.label, "important");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.gmail.api_base_url, cfg.gmail.api_base_url);
        assert_eq!(parsed.query.terms, cfg.query.terms);
        assert_eq!(
            parsed.classifier.refund_keywords,
            cfg.classifier.refund_keywords
        );
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[general]
dev_mode = false

[classifier]
return_keywords = ["rma"]
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert!(!cfg.general.dev_mode);
        assert_eq!(cfg.classifier.return_keywords, vec!["rma".to_string()]);
        assert_eq!(cfg.general.default_period_days, 14);
        assert_eq!(cfg.classifier.snippet_max_chars, 500);
    }

    #[test]
    fn test_state_file_honors_data_dir() {
        let mut cfg = Config::default();
        cfg.general.data_dir = Some(PathBuf::from("/tmp/refundscan-test"));
        assert_eq!(
            state_file_path(&cfg),
            PathBuf::from("/tmp/refundscan-test/state.json")
        );
        assert_eq!(
            token_cache_path(&cfg),
            PathBuf::from("/tmp/refundscan-test/tokens.json")
        );
    }
}

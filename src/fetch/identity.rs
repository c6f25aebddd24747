//! Access-token acquisition.
//!
//! A token comes from an external command (for example
//! `gcloud auth print-access-token`), from the browser sign-in in
//! [`super::oauth`] when an OAuth client id is configured, or from an
//! environment variable.

use std::process::{Command, Stdio};

use tracing::debug;

use super::oauth::{OAuthSettings, OAuthTokenProvider, TokenCache};
use crate::config::{self, Config};
use crate::error::{RefundError, Result};

/// Something that can hand out an OAuth access token for Gmail.
pub trait TokenProvider {
    /// Return a bearer token. `interactive` allows prompting the user.
    fn access_token(&self, interactive: bool) -> Result<String>;
}

/// Token read from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvTokenProvider {
    fn access_token(&self, _interactive: bool) -> Result<String> {
        match std::env::var(&self.var) {
            Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => Err(RefundError::Credential(format!(
                "No access token: set {}, gmail.oauth_client_id or gmail.token_command",
                self.var
            ))),
        }
    }
}

/// Token printed on stdout by a shell command.
#[derive(Debug, Clone)]
pub struct CommandTokenProvider {
    command: String,
}

impl CommandTokenProvider {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn shell(&self) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        }
    }
}

impl TokenProvider for CommandTokenProvider {
    fn access_token(&self, interactive: bool) -> Result<String> {
        debug!(command = %self.command, interactive, "Running token command");

        let mut cmd = self.shell();
        cmd.stdout(Stdio::piped());
        if interactive {
            cmd.stdin(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdin(Stdio::null()).stderr(Stdio::piped());
        }

        let output = cmd
            .output()
            .map_err(|e| RefundError::Credential(format!("Could not run token command: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(RefundError::Credential(if detail.is_empty() {
                format!("Token command failed ({})", output.status)
            } else {
                format!("Token command failed: {detail}")
            }));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(RefundError::Credential(
                "Token command printed no token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Pick the token source described by the `[gmail]` config section.
///
/// A token command wins, then browser sign-in, then the environment.
pub fn from_config(config: &Config) -> Box<dyn TokenProvider> {
    let gmail = &config.gmail;
    if let Some(command) = gmail.token_command.as_deref().map(str::trim) {
        if !command.is_empty() {
            return Box::new(CommandTokenProvider::new(command));
        }
    }
    match OAuthSettings::from_config(gmail) {
        Some(settings) => Box::new(OAuthTokenProvider::new(
            settings,
            TokenCache::new(config::token_cache_path(config)),
        )),
        None => Box::new(EnvTokenProvider::new(gmail.token_env.clone())),
    }
}

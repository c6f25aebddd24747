//! Browser sign-in for Gmail with OAuth 2.0 (authorization code + PKCE).
//!
//! Tokens are cached in `tokens.json` under the data directory. A cached
//! access token is reused until shortly before it expires, then the refresh
//! token buys a new one. Only when neither works, and the caller allows it,
//! is the browser opened.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    RefreshToken, Scope, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, Server};
use tracing::{debug, info, warn};
use url::Url;

use super::identity::TokenProvider;
use crate::config::GmailConfig;
use crate::error::{RefundError, Result};

/// Seconds before expiry at which a cached access token counts as stale.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when the token endpoint does not say.
const DEFAULT_LIFETIME_SECS: i64 = 3500;

/// How long the callback server waits for the browser.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

// ── Token cache ─────────────────────────────────────────────────

/// Tokens kept between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CachedTokens {
    pub access_token: Option<String>,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub refresh_token: Option<String>,
}

impl CachedTokens {
    /// The access token if it is still good at `now`.
    pub fn valid_access_token(&self, now: i64) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(exp)) if now + EXPIRY_MARGIN_SECS < exp => Some(token),
            _ => None,
        }
    }
}

/// JSON file holding [`CachedTokens`].
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the cache. A missing or unreadable file is an empty cache.
    pub fn load(&self) -> CachedTokens {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Could not read token cache");
                }
                return CachedTokens::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Token cache is corrupt, ignoring it");
            CachedTokens::default()
        })
    }

    pub fn save(&self, tokens: &CachedTokens) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RefundError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(tokens)?;
        std::fs::write(&self.path, json).map_err(|e| RefundError::io(&self.path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| RefundError::io(&self.path, e))?;
        }

        debug!(path = %self.path.display(), "Saved token cache");
        Ok(())
    }
}

// ── Provider ────────────────────────────────────────────────────

/// OAuth client registration and endpoints.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scope: String,
}

impl OAuthSettings {
    /// Settings from the `[gmail]` section, if a client id is configured.
    pub fn from_config(config: &GmailConfig) -> Option<Self> {
        let client_id = config.oauth_client_id.as_deref().map(str::trim)?;
        if client_id.is_empty() {
            return None;
        }
        Some(Self {
            client_id: client_id.to_string(),
            client_secret: config
                .oauth_client_secret
                .clone()
                .filter(|s| !s.trim().is_empty()),
            auth_url: config.oauth_auth_url.clone(),
            token_url: config.oauth_token_url.clone(),
            redirect_uri: config.oauth_redirect_uri.clone(),
            scope: config.oauth_scope.clone(),
        })
    }

    fn client(&self) -> Result<BasicClient> {
        let auth_url = AuthUrl::new(self.auth_url.clone()).map_err(bad_url("auth"))?;
        let token_url = TokenUrl::new(self.token_url.clone()).map_err(bad_url("token"))?;
        Ok(BasicClient::new(
            ClientId::new(self.client_id.clone()),
            self.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        ))
    }
}

fn bad_url(which: &'static str) -> impl Fn(url::ParseError) -> RefundError {
    move |e| RefundError::Credential(format!("Invalid OAuth {which} URL: {e}"))
}

/// Token provider that signs in through the browser and caches the result.
pub struct OAuthTokenProvider {
    settings: OAuthSettings,
    cache: TokenCache,
}

impl OAuthTokenProvider {
    pub fn new(settings: OAuthSettings, cache: TokenCache) -> Self {
        Self { settings, cache }
    }

    fn refresh(&self, refresh_token: &str) -> Result<BasicTokenResponse> {
        debug!(token_url = %self.settings.token_url, "Refreshing access token");
        self.settings
            .client()?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request(http_client)
            .map_err(|e| RefundError::Credential(format!("Token refresh failed: {e}")))
    }

    /// Open the consent page and wait for the redirect on a loopback server.
    fn sign_in(&self) -> Result<BasicTokenResponse> {
        let redirect = Url::parse(&self.settings.redirect_uri).map_err(bad_url("redirect"))?;
        let bind_addr = loopback_addr(&redirect)?;

        let server = Server::http(bind_addr).map_err(|e| {
            RefundError::Credential(format!("Could not listen on {bind_addr}: {e}"))
        })?;

        let redirect_url =
            RedirectUrl::new(self.settings.redirect_uri.clone()).map_err(bad_url("redirect"))?;
        let client = self.settings.client()?.set_redirect_uri(redirect_url);

        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(self.settings.scope.clone()))
            .set_pkce_challenge(challenge)
            .url();

        warn!(url = %auth_url, "Sign in to Gmail in your browser");
        if let Err(e) = open::that(auth_url.as_str()) {
            warn!(error = %e, "Could not open the browser");
        }

        let code = wait_for_code(&server, &redirect, csrf.secret())?;

        client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request(http_client)
            .map_err(|e| RefundError::Credential(format!("Token exchange failed: {e}")))
    }

    /// Merge a token response into the cache and return the access token.
    fn remember(&self, mut cached: CachedTokens, response: &BasicTokenResponse) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let lifetime = response
            .expires_in()
            .and_then(|d| i64::try_from(d.as_secs()).ok())
            .unwrap_or(DEFAULT_LIFETIME_SECS);
        let access = response.access_token().secret().clone();

        cached.access_token = Some(access.clone());
        cached.expires_at = Some(now + lifetime);
        if let Some(refresh) = response.refresh_token() {
            cached.refresh_token = Some(refresh.secret().clone());
        }

        if let Err(e) = self.cache.save(&cached) {
            warn!(error = %e, "Could not save token cache");
        }
        Ok(access)
    }
}

impl TokenProvider for OAuthTokenProvider {
    fn access_token(&self, interactive: bool) -> Result<String> {
        let cached = self.cache.load();
        if let Some(token) = cached.valid_access_token(chrono::Utc::now().timestamp()) {
            return Ok(token.to_string());
        }

        if let Some(refresh) = cached.refresh_token.clone() {
            match self.refresh(&refresh) {
                Ok(response) => return self.remember(cached, &response),
                Err(e) if interactive => warn!(error = %e, "Refresh failed, signing in again"),
                Err(e) => return Err(e),
            }
        }

        if !interactive {
            return Err(RefundError::Credential(
                "Not signed in to Gmail".to_string(),
            ));
        }

        let response = self.sign_in()?;
        info!("Signed in to Gmail");
        self.remember(cached, &response)
    }
}

/// Address to bind for a loopback redirect URI.
fn loopback_addr(redirect: &Url) -> Result<SocketAddr> {
    let host = redirect.host_str().unwrap_or_default();
    let ip = match host {
        "localhost" | "127.0.0.1" => IpAddr::V4(Ipv4Addr::LOCALHOST),
        other => other.parse::<IpAddr>().map_err(|_| {
            RefundError::Credential(format!(
                "OAuth redirect host must be localhost or an IP address: '{other}'"
            ))
        })?,
    };
    let port = redirect.port_or_known_default().ok_or_else(|| {
        RefundError::Credential(format!("OAuth redirect URI has no port: {redirect}"))
    })?;
    Ok(SocketAddr::new(ip, port))
}

/// Serve the redirect until a request carries a code with the expected state.
fn wait_for_code(server: &Server, redirect: &Url, expected_state: &str) -> Result<String> {
    let deadline = Instant::now() + CALLBACK_TIMEOUT;

    while Instant::now() < deadline {
        let request = match server.recv_timeout(Duration::from_millis(500)) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                return Err(RefundError::Credential(format!(
                    "OAuth callback server failed: {e}"
                )))
            }
        };

        let outcome = redirect
            .join(request.url())
            .ok()
            .map(|url| callback_params(&url, expected_state));

        let reply = match &outcome {
            Some(Ok(_)) => "Signed in. You can close this tab.",
            Some(Err(_)) => "Sign-in was not completed. You can close this tab.",
            None => "Bad redirect.",
        };
        if let Err(e) = request.respond(Response::from_string(reply)) {
            debug!(error = %e, "Could not answer the OAuth callback");
        }

        match outcome {
            Some(Ok(Some(code))) => return Ok(code),
            Some(Err(e)) => return Err(e),
            _ => {}
        }
    }

    Err(RefundError::Credential(
        "Timed out waiting for the browser sign-in".to_string(),
    ))
}

/// Code from a redirect URL. `Ok(None)` means the request was not a callback.
fn callback_params(url: &Url, expected_state: &str) -> Result<Option<String>> {
    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => error = Some(v.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(RefundError::Credential(format!("Sign-in refused: {error}")));
    }
    let Some(code) = code else {
        return Ok(None);
    };
    if state.as_deref() != Some(expected_state) {
        return Err(RefundError::Credential(
            "Sign-in state mismatch".to_string(),
        ));
    }
    Ok(Some(code))
}

//! Authenticated HTTP session with one UPS
//!
//! A [`Session`] owns the HTTP client and the token pair for a single device
//! address. It knows how to log in and how to issue a GET with the current
//! token attached; deciding *when* to log in again is the scraper's job.

use crate::config::ExporterConfig;
use crate::error::{ExporterError, LoginError, Result};
use crate::ups::paths::{AUTH_PATH, GRANT_TYPE, SCOPE};
use crate::ups::types::LoginRequest;
use reqwest::header::{AUTHORIZATION, CONNECTION};
use reqwest::{Response, Url};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::debug;

/// Username and password for the web UI of a UPS
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token pair issued by the device on login
#[derive(Clone)]
pub struct Token {
    pub token_type: String,
    pub access_token: SecretString,
}

impl Token {
    pub fn new(token_type: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            token_type: token_type.into(),
            access_token: SecretString::from(access_token.into()),
        }
    }

    fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token.expose_secret())
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

pub struct Session {
    address: String,
    credentials: Credentials,
    client: reqwest::Client,
    token: Option<Token>,
    login_timeout: Duration,
    request_timeout: Duration,
}

impl Session {
    /// Create a session for `address` (scheme, host and optional port).
    ///
    /// No request is sent until the first [`Session::get`] or
    /// [`Session::login`].
    pub fn new(
        address: impl Into<String>,
        credentials: Credentials,
        config: &ExporterConfig,
    ) -> Result<Self> {
        let address = address.into().trim_end_matches('/').to_string();
        let request_timeout = Duration::from_secs(config.request_timeout_seconds);

        // Connect failures, timeouts included, surface as connect errors
        let mut builder = reqwest::Client::builder().connect_timeout(request_timeout);
        if config.insecure {
            // Self-signed device certificates
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
                .map_err(|e| ExporterError::Config(format!("TLS setup failed: {}", e)))?;
            builder = builder.use_preconfigured_tls(connector);
            debug!("Certificate verification disabled for {}", address);
        }
        let client = builder.build()?;

        Ok(Self {
            address,
            credentials,
            client,
            token: None,
            login_timeout: Duration::from_secs(config.login_timeout_seconds),
            request_timeout,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    pub fn login_timeout(&self) -> Duration {
        self.login_timeout
    }

    /// Build the absolute URL of a device-relative path.
    pub fn resolve(&self, path: &str) -> std::result::Result<Url, LoginError> {
        if !self.address.contains("://") {
            return Err(LoginError::MissingSchema);
        }
        let url = Url::parse(&format!("{}{}", self.address, path))
            .map_err(|_| LoginError::InvalidUrl)?;
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(url),
            _ => Err(LoginError::InvalidUrl),
        }
    }

    /// Request a new token pair from the device.
    ///
    /// The session's own token is left untouched; see [`Session::refresh`].
    pub async fn login(&self) -> std::result::Result<Token, LoginError> {
        let url = self.resolve(AUTH_PATH)?;
        let body = LoginRequest {
            grant_type: GRANT_TYPE,
            scope: SCOPE,
            username: &self.credentials.username,
            password: self.credentials.password.expose_secret(),
        };

        let response = self
            .client
            .post(url)
            .header(CONNECTION, "keep-alive")
            .json(&body)
            .timeout(self.login_timeout)
            .send()
            .await
            .map_err(|e| self.classify(&e))?;
        let text = response.text().await.map_err(|e| self.classify(&e))?;

        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|_| LoginError::AuthenticationFailed)?;
        let token_type = value.get("token_type").and_then(serde_json::Value::as_str);
        let access_token = value.get("access_token").and_then(serde_json::Value::as_str);
        match (token_type, access_token) {
            (Some(token_type), Some(access_token)) => {
                debug!("Authentication successful on {}", self.address);
                Ok(Token::new(token_type, access_token))
            }
            _ => Err(LoginError::AuthenticationFailed),
        }
    }

    /// Log in and keep the new token pair for subsequent requests.
    pub async fn refresh(&mut self) -> std::result::Result<(), LoginError> {
        let token = self.login().await?;
        self.token = Some(token);
        Ok(())
    }

    /// GET a device-relative path with the current token, if any.
    ///
    /// Connecting and waiting for the response each get the request timeout.
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = self.resolve(path)?;
        let mut request = self
            .client
            .get(url)
            .header(CONNECTION, "keep-alive")
            .timeout(self.request_timeout * 2);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, token.header_value());
        }
        Ok(request.send().await?)
    }

    /// Map a transport failure during login to its login error class.
    fn classify(&self, err: &reqwest::Error) -> LoginError {
        // A connect timeout means the host is out of reach
        if err.is_timeout() && !err.is_connect() {
            return LoginError::Timeout(self.login_timeout.as_secs());
        }
        if err.is_builder() {
            return LoginError::InvalidUrl;
        }

        let chain = source_chain(err).to_lowercase();
        if chain.contains("certificate") {
            LoginError::Certificate
        } else if chain.contains("ssl") || chain.contains("tls") || chain.contains("handshake") {
            LoginError::Tls
        } else {
            LoginError::Connection
        }
    }
}

/// Concatenate the messages of the sources of an error.
///
/// The top-level message is skipped because it embeds the request URL.
fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = String::new();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(&inner.to_string());
        text.push_str(": ");
        source = inner.source();
    }
    text
}

use crate::config::LwaConfig;
use crate::constants::AUTH_TIMEOUT;
use crate::error::is_retryable_status;
use crate::{Error, Result};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use log::{debug, error, warn};
use serde::Deserialize;
use spfeed_core::time::{now, DateTime};
use spfeed_core::utils::{truncate_chars, Redact};
use spfeed_core::{Context, RequestTimeout};
use std::fmt::{Debug, Formatter};

/// Bearer token sent as `x-amz-access-token` on every signed call.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: Option<DateTime>,
}

impl AccessToken {
    /// Wrap an already issued token.
    pub fn new(token: &str, expires_at: Option<DateTime>) -> Self {
        Self {
            token: token.to_string(),
            expires_at,
        }
    }

    /// The raw token value.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// When the token stops being accepted, if the endpoint said so.
    pub fn expires_at(&self) -> Option<DateTime> {
        self.expires_at
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &Redact::from(&self.token))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Deserialize)]
struct RefreshTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// TokenProvider exchanges the long-lived refresh token for an access token.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    config: LwaConfig,
}

impl TokenProvider {
    /// Create a new TokenProvider.
    pub fn new(config: LwaConfig) -> Self {
        Self { config }
    }

    /// Fetch a fresh access token.
    ///
    /// Transient failures are retried up to `max_attempts` times; any other
    /// failure is returned as [`Error::Auth`] right away.
    pub async fn fetch_access_token(&self, ctx: &Context) -> Result<AccessToken> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.exchange(ctx).await {
                Err(Error::Auth { status, .. })
                    if attempt < max_attempts && is_retryable_status(status) =>
                {
                    warn!(
                        "token exchange attempt {attempt}/{max_attempts} got {status}, retrying in {:?}",
                        self.config.retry_delay
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn exchange(&self, ctx: &Context) -> Result<AccessToken> {
        debug!(
            "exchanging refresh token {:?} for access token",
            Redact::from(&self.config.refresh_token)
        );

        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", &self.config.refresh_token)
            .append_pair("client_id", &self.config.client_id)
            .append_pair("client_secret", &self.config.client_secret)
            .finish();

        let mut req = http::Request::post(&self.config.endpoint)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded;charset=UTF-8")
            .header(ACCEPT, "application/json")
            .body(Bytes::from(body))
            .map_err(|e| {
                Error::Config(
                    spfeed_core::Error::config_invalid("invalid token endpoint").with_source(e),
                )
            })?;
        req.extensions_mut().insert(RequestTimeout(AUTH_TIMEOUT));

        let resp = ctx.http_send(req).await.map_err(Error::Transport)?;
        let status = resp.status();
        let body = String::from_utf8_lossy(resp.body()).to_string();

        if !status.is_success() {
            error!(
                "token exchange failed with status {status}: {}",
                truncate_chars(&body, 2000)
            );
            return Err(Error::Auth { status, body });
        }

        let token_resp: RefreshTokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::InvalidResponse {
                what: "token",
                message: e.to_string(),
            })?;
        let token = match token_resp.access_token {
            Some(token) if !token.is_empty() => token,
            _ => {
                error!("token exchange response carries no access_token");
                return Err(Error::Auth { status, body });
            }
        };

        let expires_at = token_resp
            .expires_in
            .and_then(chrono::TimeDelta::try_seconds)
            .map(|d| now() + d);

        Ok(AccessToken::new(&token, expires_at))
    }
}

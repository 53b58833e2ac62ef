use crate::constants::*;
use crate::{Error, Result};
use log::debug;
use spfeed_aws_v4::{
    Credential, AWS_ACCESS_KEY_ID, AWS_REGION, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN,
    EXECUTE_API,
};
use spfeed_core::utils::Redact;
use spfeed_core::Context;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a feed run needs, built once and never mutated.
#[derive(Clone, Debug)]
pub struct Config {
    /// Regional selling partner endpoint, without trailing slash.
    pub endpoint: String,
    /// Signing region.
    pub region: String,
    /// Signing service name.
    pub service: String,
    /// Token exchange settings.
    pub lwa: LwaConfig,
    /// Key pair used to sign every marketplace call.
    pub credential: Credential,
    /// Status polling settings.
    pub poll: PollConfig,
    /// Content type declared for uploaded documents.
    pub content_type: String,
    /// Probe seller authorization before submitting.
    pub verify_seller_access: bool,
    /// Directory receiving status, report and failure artifacts, the
    /// working directory by default; `None` disables them.
    pub artifact_dir: Option<PathBuf>,
}

impl Config {
    /// Create a config with default endpoint, region and poll settings.
    pub fn new(lwa: LwaConfig, credential: Credential) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            region: DEFAULT_REGION.to_string(),
            service: EXECUTE_API.to_string(),
            lwa,
            credential,
            poll: PollConfig::default(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            verify_seller_access: true,
            artifact_dir: Some(PathBuf::from(".")),
        }
    }

    /// Load config from the env exposed by `ctx`.
    ///
    /// Values are trimmed; blank values count as missing.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let var = |key: &str| {
            ctx.env_var(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            var(key).ok_or_else(|| {
                Error::Config(spfeed_core::Error::config_invalid(format!(
                    "missing required env {key}"
                )))
            })
        };

        let mut lwa = LwaConfig::new(
            &required(SPAPI_LWA_CLIENT_ID)?,
            &required(SPAPI_LWA_CLIENT_SECRET)?,
            &required(SPAPI_LWA_REFRESH_TOKEN)?,
        );
        if let Some(endpoint) = var(SPAPI_LWA_ENDPOINT) {
            lwa.endpoint = endpoint;
        }

        let mut credential = Credential::new(
            &required(AWS_ACCESS_KEY_ID)?,
            &required(AWS_SECRET_ACCESS_KEY)?,
        );
        credential.session_token = var(AWS_SESSION_TOKEN);

        let mut cfg = Config::new(lwa, credential);
        if let Some(endpoint) = var(SPAPI_ENDPOINT) {
            cfg.endpoint = endpoint.trim_end_matches('/').to_string();
        }
        if let Some(region) = var(AWS_REGION) {
            cfg.region = region;
        }
        if let Some(v) = var(SPAPI_POLL_SECONDS) {
            cfg.poll.interval = Duration::from_secs(parse_number(SPAPI_POLL_SECONDS, &v)?);
        }
        if let Some(v) = var(SPAPI_MAX_POLLS) {
            cfg.poll.max_attempts = parse_number(SPAPI_MAX_POLLS, &v)?;
        }
        if let Some(dir) = var(SPAPI_ARTIFACT_DIR) {
            cfg.artifact_dir = Some(PathBuf::from(dir));
        }

        debug!("loaded config from env: {cfg:?}");
        Ok(cfg)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        Error::Config(spfeed_core::Error::config_invalid(format!(
            "env {key} must be a non-negative integer, got {value:?}"
        )))
    })
}

/// Settings of the refresh token grant.
#[derive(Clone)]
pub struct LwaConfig {
    /// Token endpoint.
    pub endpoint: String,
    /// Application client id.
    pub client_id: String,
    /// Application client secret.
    pub client_secret: String,
    /// Long-lived refresh token issued to the seller.
    pub refresh_token: String,
    /// Attempts for transient failures (429, 5xx); 1 fails fast.
    pub max_attempts: usize,
    /// Wait between attempts.
    pub retry_delay: Duration,
}

impl LwaConfig {
    /// Create token settings against the default endpoint.
    pub fn new(client_id: &str, client_secret: &str, refresh_token: &str) -> Self {
        Self {
            endpoint: DEFAULT_LWA_ENDPOINT.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            max_attempts: 1,
            retry_delay: Duration::from_secs(2),
        }
    }
}

impl Debug for LwaConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LwaConfig")
            .field("endpoint", &self.endpoint)
            .field("client_id", &Redact::from(&self.client_id))
            .field("client_secret", &Redact::from(&self.client_secret))
            .field("refresh_token", &Redact::from(&self.refresh_token))
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

/// Fixed-interval polling budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Wait between two status reads.
    pub interval: Duration,
    /// Maximum number of status reads.
    pub max_attempts: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_attempts: 18,
        }
    }
}

use std::time::Duration;

/// Default regional selling partner endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://sellingpartnerapi-eu.amazon.com";
/// Default signing region, matching [`DEFAULT_ENDPOINT`].
pub const DEFAULT_REGION: &str = "eu-west-1";
/// Default token endpoint for the refresh token grant.
pub const DEFAULT_LWA_ENDPOINT: &str = "https://api.amazon.com/auth/o2/token";
/// Default content type of uploaded feed documents.
pub const DEFAULT_CONTENT_TYPE: &str = "text/tab-separated-values; charset=UTF-8";

/// Path prefix of the feeds API.
pub const FEEDS_API: &str = "/feeds/2021-06-30";
/// Seller authorization check.
pub const MARKETPLACE_PARTICIPATIONS: &str = "/sellers/v1/marketplaceParticipations";

// Per-call timeouts.
pub(crate) const AUTH_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const SIGNED_CALL_TIMEOUT: Duration = Duration::from_secs(120);
pub(crate) const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);
pub(crate) const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(180);

// Log truncation.
pub(crate) const LOGGED_BODY_LIMIT: usize = 4000;
pub(crate) const LOGGED_UPLOAD_BODY_LIMIT: usize = 2000;

// Artifact file names.
/// Last observed feed status payload.
pub const FEED_STATUS_FILE: &str = "feed_status.json";
/// Result document descriptor.
pub const FEED_DOCUMENT_META_FILE: &str = "feed_document_meta.json";
/// Processing report decoded as text.
pub const FEED_REPORT_TEXT_FILE: &str = "feed_processing_report.txt";
/// Processing report kept as raw bytes.
pub const FEED_REPORT_BINARY_FILE: &str = "feed_processing_report.bin";
/// Redacted dump of the last failed call.
pub const REQUEST_DUMP_FILE: &str = "spapi_request_response.txt";

// Env values used to build the config.
/// Env holding the LWA client id.
pub const SPAPI_LWA_CLIENT_ID: &str = "SPAPI_LWA_CLIENT_ID";
/// Env holding the LWA client secret.
pub const SPAPI_LWA_CLIENT_SECRET: &str = "SPAPI_LWA_CLIENT_SECRET";
/// Env holding the LWA refresh token.
pub const SPAPI_LWA_REFRESH_TOKEN: &str = "SPAPI_LWA_REFRESH_TOKEN";
/// Env overriding [`DEFAULT_ENDPOINT`].
pub const SPAPI_ENDPOINT: &str = "SPAPI_ENDPOINT";
/// Env overriding [`DEFAULT_LWA_ENDPOINT`].
pub const SPAPI_LWA_ENDPOINT: &str = "SPAPI_LWA_ENDPOINT";
/// Env holding the poll interval in seconds.
pub const SPAPI_POLL_SECONDS: &str = "SPAPI_POLL_SECONDS";
/// Env holding the poll attempt budget.
pub const SPAPI_MAX_POLLS: &str = "SPAPI_MAX_POLLS";
/// Env holding the artifact directory.
pub const SPAPI_ARTIFACT_DIR: &str = "SPAPI_ARTIFACT_DIR";

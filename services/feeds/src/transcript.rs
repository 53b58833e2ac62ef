use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::Serialize;
use spfeed_core::utils::REDACTED;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Header keys whose values never leave the process.
pub const REDACTED_HEADERS: &[&str] = &[
    "authorization",
    "x-amz-access-token",
    "x-amz-security-token",
];

/// Redacted record of one failed exchange.
///
/// `Display` renders the dump written to the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    /// Request method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers with secrets masked.
    pub request_headers: BTreeMap<String, String>,
    /// Request body, `None` when empty.
    pub request_body: Option<String>,
    /// Response status code.
    pub status: u16,
    /// Vendor request id, when present.
    pub request_id: Option<String>,
    /// Response headers with secrets masked.
    pub response_headers: BTreeMap<String, String>,
    /// Response body.
    pub response_body: String,
}

impl Transcript {
    /// Capture a request and the response it produced.
    pub fn new(
        method: &Method,
        url: &str,
        request_headers: &HeaderMap,
        request_body: &[u8],
        resp: &http::Response<Bytes>,
    ) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            request_headers: redact_headers(request_headers),
            request_body: (!request_body.is_empty())
                .then(|| String::from_utf8_lossy(request_body).to_string()),
            status: resp.status().as_u16(),
            request_id: request_id(resp.headers()),
            response_headers: redact_headers(resp.headers()),
            response_body: String::from_utf8_lossy(resp.body()).to_string(),
        }
    }
}

impl Display for Transcript {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let headers = |h: &BTreeMap<String, String>| {
            serde_json::to_string_pretty(h).map_err(|_| std::fmt::Error)
        };

        writeln!(f, "=== REQUEST ===")?;
        writeln!(f, "{} {}", self.method, self.url)?;
        writeln!(f)?;
        writeln!(f, "Request headers:")?;
        writeln!(f, "{}", headers(&self.request_headers)?)?;
        writeln!(f)?;
        writeln!(f, "Request body:")?;
        writeln!(f, "{}", self.request_body.as_deref().unwrap_or("<empty>"))?;
        writeln!(f)?;
        writeln!(f, "=== RESPONSE ===")?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Request id: {}", self.request_id.as_deref().unwrap_or("-"))?;
        writeln!(f)?;
        writeln!(f, "Response headers:")?;
        writeln!(f, "{}", headers(&self.response_headers)?)?;
        writeln!(f)?;
        writeln!(f, "Response body:")?;
        writeln!(f, "{}", self.response_body)
    }
}

/// Copy headers into a sorted map, masking [`REDACTED_HEADERS`].
pub fn redact_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for name in headers.keys() {
        let key = name.as_str().to_ascii_lowercase();
        let value = if REDACTED_HEADERS.contains(&key.as_str()) {
            REDACTED.to_string()
        } else {
            headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        map.insert(key, value);
    }
    map
}

/// Vendor request id of a response.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    ["x-amzn-requestid", "x-amz-request-id"]
        .iter()
        .find_map(|key| headers.get(*key))
        .map(|v| String::from_utf8_lossy(v.as_bytes()).to_string())
}

/// Replace the query of a pre-signed URL, it carries the authorization.
pub(crate) fn redact_query(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?{REDACTED}"),
        None => url.to_string(),
    }
}

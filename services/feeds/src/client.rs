use crate::artifacts::Artifacts;
use crate::constants::*;
use crate::token::AccessToken;
use crate::transcript::{redact_query, Transcript};
use crate::{Error, Result};
use bytes::Bytes;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde_json::Value;
use spfeed_aws_v4::{Credential, X_AMZ_ACCESS_TOKEN};
use spfeed_core::utils::truncate_chars;
use spfeed_core::{Context, RequestTimeout, Signer};
use std::time::Duration;

/// Client for the marketplace API.
///
/// Marketplace calls are signed and carry the access token; document
/// transfers go to pre-signed URLs and carry neither.
#[derive(Debug, Clone)]
pub struct SignedClient {
    ctx: Context,
    endpoint: String,
    signer: Signer<Credential>,
    access_token: AccessToken,
    artifacts: Artifacts,
}

impl SignedClient {
    /// Create a client for `endpoint` acting with `access_token`.
    pub fn new(
        ctx: Context,
        endpoint: &str,
        signer: Signer<Credential>,
        access_token: AccessToken,
    ) -> Self {
        Self {
            ctx,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            signer,
            access_token,
            artifacts: Artifacts::disabled(),
        }
    }

    /// Write failure dumps and other artifacts through `artifacts`.
    pub fn with_artifacts(mut self, artifacts: Artifacts) -> Self {
        self.artifacts = artifacts;
        self
    }

    /// Artifact sink of this client.
    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    /// Issue a signed call to `path` (which may carry a query) below the endpoint.
    ///
    /// An empty 2xx body yields an empty JSON object.
    pub async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value> {
        let url = format!("{}{}", self.endpoint, path);
        let body = match body {
            Some(v) => Bytes::from(serde_json::to_vec(v).map_err(|e| {
                Error::Signing(
                    spfeed_core::Error::request_invalid("failed to serialize request body")
                        .with_source(e),
                )
            })?),
            None => Bytes::new(),
        };

        let mut token = HeaderValue::from_str(self.access_token.as_str())
            .map_err(|e| Error::Signing(e.into()))?;
        token.set_sensitive(true);

        let (mut parts, ()) = http::Request::builder()
            .method(method.clone())
            .uri(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(X_AMZ_ACCESS_TOKEN, token)
            .body(())
            .map_err(|e| Error::Signing(e.into()))?
            .into_parts();
        self.signer
            .sign(&mut parts, &body)
            .await
            .map_err(Error::Signing)?;

        debug!("sending {method} {url}");
        let request_headers = parts.headers.clone();
        let mut req = http::Request::from_parts(parts, body.clone());
        req.extensions_mut()
            .insert(RequestTimeout(SIGNED_CALL_TIMEOUT));

        let resp = self.ctx.http_send(req).await.map_err(Error::Transport)?;
        if resp.status().as_u16() >= 400 {
            let transcript = Transcript::new(&method, &url, &request_headers, &body, &resp);
            return Err(self.fail(method, url, transcript, &resp, LOGGED_BODY_LIMIT).await);
        }

        let text = String::from_utf8_lossy(resp.body());
        if text.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse {
            what: "marketplace",
            message: format!("{method} {url} returned non JSON body: {e}"),
        })
    }

    /// Upload `content` to a pre-signed URL.
    pub async fn upload(&self, url: &str, content_type: &str, content: Bytes) -> Result<()> {
        let req = http::Request::put(url)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .map_err(|e| Error::Signing(e.into()))?;

        debug!("uploading {} bytes to {}", req.body().len(), redact_query(url));
        self.transfer(req, UPLOAD_TIMEOUT, LOGGED_UPLOAD_BODY_LIMIT)
            .await
            .map(|_| ())
    }

    /// Download the content behind a pre-signed URL.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        let req = http::Request::get(url)
            .body(Bytes::new())
            .map_err(|e| Error::Signing(e.into()))?;

        debug!("downloading {}", redact_query(url));
        self.transfer(req, DOWNLOAD_TIMEOUT, LOGGED_BODY_LIMIT).await
    }

    async fn transfer(
        &self,
        mut req: http::Request<Bytes>,
        timeout: Duration,
        body_limit: usize,
    ) -> Result<Bytes> {
        let method = req.method().clone();
        let url = redact_query(&req.uri().to_string());
        let request_headers: HeaderMap = req.headers().clone();
        req.extensions_mut().insert(RequestTimeout(timeout));

        let resp = self.ctx.http_send(req).await.map_err(Error::Transport)?;
        if resp.status().as_u16() >= 400 {
            // Document payloads stay out of the dump.
            let transcript = Transcript::new(&method, &url, &request_headers, &[], &resp);
            return Err(self.fail(method, url, transcript, &resp, body_limit).await);
        }

        Ok(resp.into_body())
    }

    async fn fail(
        &self,
        method: Method,
        url: String,
        transcript: Transcript,
        resp: &http::Response<Bytes>,
        body_limit: usize,
    ) -> Error {
        error!(
            "{method} {url} failed with status {} (request id {}): {}",
            resp.status(),
            transcript.request_id.as_deref().unwrap_or("-"),
            truncate_chars(&transcript.response_body, body_limit)
        );
        self.artifacts
            .write(REQUEST_DUMP_FILE, transcript.to_string().as_bytes())
            .await;

        Error::Http {
            method,
            url,
            status: resp.status(),
            request_id: transcript.request_id,
            body: transcript.response_body,
        }
    }
}

/// Strip the `payload` envelope some API versions wrap responses in.
///
/// Anything that is not a JSON object becomes an empty object.
pub fn unwrap_payload(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("payload") {
            Some(payload @ Value::Object(_)) => payload,
            Some(other) => {
                map.insert("payload".to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        _ => Value::Object(Default::default()),
    }
}

/// Deserialize an (enveloped) response into `T`.
pub(crate) fn parse_payload<T: DeserializeOwned>(what: &'static str, value: Value) -> Result<T> {
    serde_json::from_value(unwrap_payload(value)).map_err(|e| Error::InvalidResponse {
        what,
        message: e.to_string(),
    })
}

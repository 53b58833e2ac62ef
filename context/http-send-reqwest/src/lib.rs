//! Reqwest-based HTTP sending for spfeed.
//!
//! `ReqwestHttpSend` implements [`HttpSend`] on top of a shared
//! [`reqwest::Client`]. A [`RequestTimeout`] found in the request extensions is
//! applied to that single exchange, which lets the token exchange, signed API
//! calls and large transfers use different limits on one client.
//!
//! ```no_run
//! use spfeed_core::Context;
//! use spfeed_http_send_reqwest::ReqwestHttpSend;
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::default());
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};
use spfeed_core::{Error, HttpSend, RequestTimeout, Result};

/// HttpSend implementation backed by reqwest.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let timeout = req.extensions().get::<RequestTimeout>().copied();
        let mut req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to build reqwest request").with_source(e))?;
        if let Some(RequestTimeout(timeout)) = timeout {
            *req.timeout_mut() = Some(timeout);
        }
        debug!("sending {} {}", req.method(), req.url());

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| Error::unexpected(format!("failed to send request: {e}")).with_source(e))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

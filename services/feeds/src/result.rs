use crate::client::{unwrap_payload, SignedClient};
use crate::constants::*;
use crate::Result;
use flate2::read::MultiGzDecoder;
use http::Method;
use log::{info, warn};
use serde_json::Value;
use std::io::Read;

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];
const BINARY_SNIFF_LEN: usize = 8192;

/// Descriptor of a processing report.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultDocument {
    /// Result document id.
    pub feed_document_id: String,
    /// Pre-signed download URL, absent when nothing can be downloaded.
    pub url: Option<String>,
    /// Compression announced for the content, e.g. `GZIP`.
    pub compression_algorithm: Option<String>,
    /// Descriptor as returned, envelope removed.
    pub raw: Value,
}

impl ResultDocument {
    fn from_response(feed_document_id: &str, value: Value) -> Self {
        let raw = unwrap_payload(value);
        let field = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            feed_document_id: feed_document_id.to_string(),
            url: field("url"),
            compression_algorithm: field("compressionAlgorithm"),
            raw,
        }
    }
}

/// Decoded report content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultContent {
    /// Text report.
    Text(String),
    /// Content that is not text, kept as is.
    Binary(Vec<u8>),
}

/// What fetching a result document produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultFetch {
    /// The report was downloaded and decoded.
    Downloaded {
        /// Report descriptor.
        document: ResultDocument,
        /// Report content.
        content: ResultContent,
    },
    /// The descriptor carries no download URL.
    NoUrl(ResultDocument),
}

impl SignedClient {
    /// Resolve, download and decode a result document.
    pub async fn fetch_result(&self, result_feed_document_id: &str) -> Result<ResultFetch> {
        let resp = self
            .call(
                Method::GET,
                &format!("{FEEDS_API}/documents/{result_feed_document_id}"),
                None,
            )
            .await?;
        let document = ResultDocument::from_response(result_feed_document_id, resp);
        self.artifacts()
            .write_json(FEED_DOCUMENT_META_FILE, &document.raw)
            .await;

        let Some(url) = document.url.as_deref() else {
            warn!("result document {result_feed_document_id} has no download url");
            return Ok(ResultFetch::NoUrl(document));
        };

        let bytes = self.download(url).await?;
        let bytes = maybe_gunzip(bytes.to_vec(), document.compression_algorithm.as_deref());
        let content = decode_content(bytes);

        match &content {
            ResultContent::Text(text) => {
                info!("downloaded processing report ({} chars)", text.chars().count());
                self.artifacts()
                    .write(FEED_REPORT_TEXT_FILE, text.as_bytes())
                    .await;
            }
            ResultContent::Binary(bytes) => {
                info!("downloaded binary processing report ({} bytes)", bytes.len());
                self.artifacts().write(FEED_REPORT_BINARY_FILE, bytes).await;
            }
        }

        Ok(ResultFetch::Downloaded { document, content })
    }
}

/// Whether `bytes` start with the gzip magic.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&GZIP_MAGIC)
}

/// Decompress gzip content, detected by its magic bytes.
///
/// `compression` is only checked against what the bytes say; content that
/// fails to decompress is returned unchanged.
pub fn maybe_gunzip(bytes: Vec<u8>, compression: Option<&str>) -> Vec<u8> {
    let announced = compression.is_some_and(|c| c.eq_ignore_ascii_case("GZIP"));
    if !is_gzip(&bytes) {
        if announced {
            warn!("content announced as GZIP has no gzip magic, using it as is");
        }
        return bytes;
    }

    let mut out = Vec::new();
    match MultiGzDecoder::new(bytes.as_slice()).read_to_end(&mut out) {
        Ok(_) => out,
        Err(err) => {
            warn!("failed to decompress gzip content, using it as is: {err}");
            bytes
        }
    }
}

/// Decode report bytes.
///
/// Valid UTF-8 is text. Invalid UTF-8 with a NUL byte in the first 8 KiB is
/// binary. Anything else is text with U+FFFD replacements.
pub fn decode_content(bytes: Vec<u8>) -> ResultContent {
    match String::from_utf8(bytes) {
        Ok(text) => ResultContent::Text(text),
        Err(err) => {
            let bytes = err.into_bytes();
            let head = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
            if head.contains(&0) {
                ResultContent::Binary(bytes)
            } else {
                warn!("report is not valid UTF-8, replacing invalid sequences");
                ResultContent::Text(String::from_utf8_lossy(&bytes).into_owned())
            }
        }
    }
}

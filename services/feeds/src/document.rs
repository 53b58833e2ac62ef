use crate::client::{parse_payload, SignedClient};
use crate::constants::FEEDS_API;
use crate::Result;
use bytes::Bytes;
use http::Method;
use log::info;
use serde::Deserialize;
use serde_json::json;

/// Pre-signed location a feed document is uploaded to.
///
/// The URL is single use and must not be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Id later referenced as `inputFeedDocumentId`.
    pub feed_document_id: String,
    /// Pre-signed upload URL.
    pub url: String,
    /// Content type the upload must declare.
    pub content_type: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFeedDocumentResponse {
    feed_document_id: String,
    url: String,
}

impl SignedClient {
    /// Reserve a feed document and get its upload URL.
    pub async fn create_upload_target(&self, content_type: &str) -> Result<UploadTarget> {
        let resp = self
            .call(
                Method::POST,
                &format!("{FEEDS_API}/documents"),
                Some(&json!({ "contentType": content_type })),
            )
            .await?;
        let resp: CreateFeedDocumentResponse = parse_payload("createFeedDocument", resp)?;

        info!("created feed document {}", resp.feed_document_id);
        Ok(UploadTarget {
            feed_document_id: resp.feed_document_id,
            url: resp.url,
            content_type: content_type.to_string(),
        })
    }

    /// Upload the document content to `target`.
    pub async fn upload_document(&self, target: &UploadTarget, content: Bytes) -> Result<()> {
        let size = content.len();
        self.upload(&target.url, &target.content_type, content)
            .await?;

        info!(
            "uploaded {size} bytes to feed document {}",
            target.feed_document_id
        );
        Ok(())
    }
}

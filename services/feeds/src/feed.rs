use crate::client::{parse_payload, SignedClient};
use crate::constants::FEEDS_API;
use crate::{Error, Result};
use http::Method;
use log::info;
use serde::Deserialize;
use serde_json::json;

/// A submitted processing job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Id assigned by the marketplace.
    pub feed_id: String,
    /// Feed type, e.g. `POST_FLAT_FILE_LISTINGS_DATA`.
    pub feed_type: String,
    /// Marketplaces the feed applies to.
    pub marketplace_ids: Vec<String>,
    /// Uploaded document the feed processes.
    pub input_feed_document_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateFeedResponse {
    feed_id: String,
}

impl SignedClient {
    /// Create a feed processing `input_feed_document_id`.
    ///
    /// Not retried: a resubmission creates a second job.
    pub async fn submit_feed(
        &self,
        feed_type: &str,
        marketplace_ids: &[String],
        input_feed_document_id: &str,
    ) -> Result<Feed> {
        if marketplace_ids.is_empty() {
            return Err(Error::Signing(spfeed_core::Error::request_invalid(
                "at least one marketplace id is required",
            )));
        }

        let resp = self
            .call(
                Method::POST,
                &format!("{FEEDS_API}/feeds"),
                Some(&json!({
                    "feedType": feed_type,
                    "marketplaceIds": marketplace_ids,
                    "inputFeedDocumentId": input_feed_document_id,
                })),
            )
            .await?;
        let resp: CreateFeedResponse = parse_payload("createFeed", resp)?;

        info!("created feed {} of type {feed_type}", resp.feed_id);
        Ok(Feed {
            feed_id: resp.feed_id,
            feed_type: feed_type.to_string(),
            marketplace_ids: marketplace_ids.to_vec(),
            input_feed_document_id: input_feed_document_id.to_string(),
        })
    }
}

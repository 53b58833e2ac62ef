use crate::client::{unwrap_payload, SignedClient};
use crate::config::PollConfig;
use crate::constants::{FEEDS_API, FEED_STATUS_FILE};
use crate::{Error, Result};
use http::Method;
use log::{info, warn};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use tokio_util::sync::CancellationToken;

/// Processing state reported for a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStatus {
    /// Waiting to be processed.
    InQueue,
    /// Being processed.
    InProgress,
    /// Processed; a result document may be attached.
    Done,
    /// Cancelled before processing finished.
    Cancelled,
    /// Processing aborted.
    Fatal,
    /// Status string this crate does not know.
    Unknown(String),
}

impl ProcessingStatus {
    /// Parse the vendor status string, verbatim.
    pub fn parse(s: &str) -> Self {
        match s {
            "IN_QUEUE" => Self::InQueue,
            "IN_PROGRESS" => Self::InProgress,
            "DONE" => Self::Done,
            "CANCELLED" => Self::Cancelled,
            "FATAL" => Self::Fatal,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Vendor status string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::InQueue => "IN_QUEUE",
            Self::InProgress => "IN_PROGRESS",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
            Self::Fatal => "FATAL",
            Self::Unknown(s) => s,
        }
    }

    /// Whether the status will never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Cancelled | Self::Fatal)
    }
}

impl Display for ProcessingStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed status payload.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSnapshot {
    /// Payload as returned, envelope removed.
    pub raw: Value,
    /// Parsed status, `None` when the payload carries none.
    pub status: Option<ProcessingStatus>,
    /// Result document id, only meaningful once the status is `DONE`.
    pub result_feed_document_id: Option<String>,
}

impl FeedSnapshot {
    /// Build a snapshot from a status response.
    pub fn from_response(value: Value) -> Self {
        let raw = unwrap_payload(value);
        let status = ["processingStatus", "status"]
            .iter()
            .find_map(|key| {
                raw.get(*key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .map(ProcessingStatus::parse);
        let result_feed_document_id = raw
            .get("resultFeedDocumentId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Self {
            raw,
            status,
            result_feed_document_id,
        }
    }

    /// Whether polling can stop at this snapshot.
    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(ProcessingStatus::is_terminal)
    }
}

/// How a poll run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A terminal status was observed.
    Terminal(FeedSnapshot),
    /// The attempt budget ran out first.
    Exhausted {
        /// Number of status reads made.
        attempts: usize,
        /// Last observed snapshot.
        last: Option<FeedSnapshot>,
    },
}

/// Reads a feed's status at a fixed interval until it is terminal.
#[derive(Debug, Clone)]
pub struct Poller<'a> {
    client: &'a SignedClient,
    config: PollConfig,
    cancel: CancellationToken,
}

impl<'a> Poller<'a> {
    /// Create a poller issuing calls through `client`.
    pub fn new(client: &'a SignedClient, config: PollConfig) -> Self {
        Self {
            client,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort polling with [`Error::Cancelled`] once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Poll `feed_id`.
    ///
    /// Makes at most `max_attempts` reads with exactly `interval` between two
    /// reads; there is no wait after the last one.
    pub async fn poll(&self, feed_id: &str) -> Result<PollOutcome> {
        let path = format!("{FEEDS_API}/feeds/{feed_id}");
        let max_attempts = self.config.max_attempts;
        let mut last = None;

        for attempt in 1..=max_attempts {
            let value = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                resp = self.client.call(Method::GET, &path, None) => resp?,
            };

            let snapshot = FeedSnapshot::from_response(value);
            self.client
                .artifacts()
                .write_json(FEED_STATUS_FILE, &snapshot.raw)
                .await;

            match &snapshot.status {
                Some(ProcessingStatus::Unknown(status)) => {
                    warn!("[poll {attempt}/{max_attempts}] unknown processingStatus={status}, continuing")
                }
                Some(status) => info!("[poll {attempt}/{max_attempts}] processingStatus={status}"),
                None => warn!("[poll {attempt}/{max_attempts}] response carries no processingStatus"),
            }

            if snapshot.is_terminal() {
                return Ok(PollOutcome::Terminal(snapshot));
            }
            last = Some(snapshot);

            if attempt < max_attempts {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(self.config.interval) => {}
                }
            }
        }

        warn!("feed {feed_id} is not terminal after {max_attempts} polls");
        Ok(PollOutcome::Exhausted {
            attempts: max_attempts,
            last,
        })
    }
}

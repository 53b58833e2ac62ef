use crate::artifacts::Artifacts;
use crate::client::SignedClient;
use crate::config::Config;
use crate::constants::MARKETPLACE_PARTICIPATIONS;
use crate::document::UploadTarget;
use crate::feed::Feed;
use crate::poll::{FeedSnapshot, PollOutcome, Poller, ProcessingStatus};
use crate::result::{ResultContent, ResultDocument, ResultFetch};
use crate::token::TokenProvider;
use crate::{Error, Result};
use bytes::Bytes;
use http::Method;
use log::{info, warn};
use serde_json::Value;
use spfeed_aws_v4::{Credential, RequestSigner, StaticCredentialProvider};
use spfeed_core::{Context, Signer};
use tokio_util::sync::CancellationToken;

/// A document to publish as a feed.
#[derive(Debug, Clone)]
pub struct FeedSubmission {
    /// Feed type, e.g. `POST_FLAT_FILE_LISTINGS_DATA`.
    pub feed_type: String,
    /// Marketplaces the feed applies to, at least one.
    pub marketplace_ids: Vec<String>,
    /// Overrides [`Config::content_type`].
    pub content_type: Option<String>,
    /// Document content.
    pub document: Bytes,
}

impl FeedSubmission {
    /// Create a submission using the configured content type.
    pub fn new(feed_type: &str, marketplace_ids: &[&str], document: impl Into<Bytes>) -> Self {
        Self {
            feed_type: feed_type.to_string(),
            marketplace_ids: marketplace_ids.iter().map(|id| id.to_string()).collect(),
            content_type: None,
            document: document.into(),
        }
    }

    /// Create a submission whose document is read from `path` through
    /// the file reader of `ctx`.
    pub async fn from_file(
        ctx: &Context,
        feed_type: &str,
        marketplace_ids: &[&str],
        path: &str,
    ) -> Result<Self> {
        let document = ctx.file_read(path).await.map_err(|source| Error::Document {
            path: path.to_string(),
            source,
        })?;
        info!("read {} bytes of feed document {path}", document.len());
        Ok(Self::new(feed_type, marketplace_ids, document))
    }

    /// Declare `content_type` for the upload.
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }
}

/// A feed accepted for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedFeed {
    /// The created feed.
    pub feed: Feed,
    /// Where its input document was uploaded.
    pub upload: UploadTarget,
}

/// Why a finished check produced no report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoResultReason {
    /// `DONE` without a result document id.
    NoResultDocument,
    /// The result document has no download URL.
    NoDownloadUrl,
    /// `CANCELLED` or `FATAL`.
    TerminalWithoutResult,
}

/// How checking a feed ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    /// The processing report was downloaded.
    Completed {
        /// Checked feed.
        feed_id: String,
        /// Report descriptor.
        document: ResultDocument,
        /// Report content.
        content: ResultContent,
    },
    /// The feed is terminal but there is no report to download.
    NoResult {
        /// Checked feed.
        feed_id: String,
        /// Terminal status observed.
        status: ProcessingStatus,
        /// Why there is no report.
        reason: NoResultReason,
    },
    /// The feed was still processing when the poll budget ran out.
    PollExhausted {
        /// Checked feed.
        feed_id: String,
        /// Number of status reads made.
        attempts: usize,
        /// Last observed snapshot.
        last: Option<FeedSnapshot>,
    },
}

/// Publishes feed documents and collects their processing reports.
///
/// Each call fetches a fresh access token; nothing is shared between runs
/// except the immutable signing credential.
#[derive(Debug, Clone)]
pub struct FeedPipeline {
    ctx: Context,
    config: Config,
    signer: Signer<Credential>,
    cancel: CancellationToken,
}

impl FeedPipeline {
    /// Create a pipeline for `config`.
    pub fn new(ctx: Context, config: Config) -> Self {
        let signer = Signer::new(
            ctx.clone(),
            StaticCredentialProvider::from(config.credential.clone()),
            RequestSigner::new(&config.service, &config.region),
        );

        Self {
            ctx,
            config,
            signer,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort polling once `token` fires.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Config of this pipeline.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Upload `submission` and create its feed.
    pub async fn submit(&self, submission: FeedSubmission) -> Result<SubmittedFeed> {
        let client = self.connect().await?;
        self.submit_with(&client, submission).await
    }

    /// Poll `feed_id` and fetch its report once it is done.
    pub async fn check(&self, feed_id: &str) -> Result<FeedOutcome> {
        let client = self.connect().await?;
        self.check_with(&client, feed_id).await
    }

    /// Submit, then check the created feed with the same access token.
    pub async fn run(&self, submission: FeedSubmission) -> Result<FeedOutcome> {
        let client = self.connect().await?;
        let submitted = self.submit_with(&client, submission).await?;
        self.check_with(&client, &submitted.feed.feed_id).await
    }

    async fn connect(&self) -> Result<SignedClient> {
        let token = TokenProvider::new(self.config.lwa.clone())
            .fetch_access_token(&self.ctx)
            .await?;
        match token.expires_at() {
            Some(at) => info!("obtained access token valid until {at}"),
            None => info!("obtained access token"),
        }

        Ok(SignedClient::new(
            self.ctx.clone(),
            &self.config.endpoint,
            self.signer.clone(),
            token,
        )
        .with_artifacts(Artifacts::new(
            self.ctx.clone(),
            self.config.artifact_dir.clone(),
        )))
    }

    async fn submit_with(
        &self,
        client: &SignedClient,
        submission: FeedSubmission,
    ) -> Result<SubmittedFeed> {
        if submission.marketplace_ids.is_empty() {
            return Err(Error::Signing(spfeed_core::Error::request_invalid(
                "at least one marketplace id is required",
            )));
        }

        if self.config.verify_seller_access {
            verify_seller_access(client).await?;
        }

        let content_type = submission
            .content_type
            .as_deref()
            .unwrap_or(&self.config.content_type);
        let upload = client.create_upload_target(content_type).await?;
        client
            .upload_document(&upload, submission.document)
            .await?;
        let feed = client
            .submit_feed(
                &submission.feed_type,
                &submission.marketplace_ids,
                &upload.feed_document_id,
            )
            .await?;

        Ok(SubmittedFeed { feed, upload })
    }

    async fn check_with(&self, client: &SignedClient, feed_id: &str) -> Result<FeedOutcome> {
        let outcome = Poller::new(client, self.config.poll)
            .with_cancellation(self.cancel.clone())
            .poll(feed_id)
            .await?;

        let snapshot = match outcome {
            PollOutcome::Terminal(snapshot) => snapshot,
            PollOutcome::Exhausted { attempts, last } => {
                return Ok(FeedOutcome::PollExhausted {
                    feed_id: feed_id.to_string(),
                    attempts,
                    last,
                })
            }
        };
        let no_result = |status: ProcessingStatus, reason| FeedOutcome::NoResult {
            feed_id: feed_id.to_string(),
            status,
            reason,
        };

        // Terminal snapshots always carry a status.
        let status = snapshot.status.unwrap_or(ProcessingStatus::Fatal);
        if status != ProcessingStatus::Done {
            warn!("feed {feed_id} ended with {status}, no report to fetch");
            return Ok(no_result(status, NoResultReason::TerminalWithoutResult));
        }
        let Some(result_id) = snapshot.result_feed_document_id else {
            warn!("feed {feed_id} is DONE without a result document");
            return Ok(no_result(status, NoResultReason::NoResultDocument));
        };

        match client.fetch_result(&result_id).await? {
            ResultFetch::Downloaded { document, content } => {
                info!("feed {feed_id} completed with report {result_id}");
                Ok(FeedOutcome::Completed {
                    feed_id: feed_id.to_string(),
                    document,
                    content,
                })
            }
            ResultFetch::NoUrl(_) => Ok(no_result(status, NoResultReason::NoDownloadUrl)),
        }
    }
}

/// Check the credentials are authorized for at least one marketplace.
async fn verify_seller_access(client: &SignedClient) -> Result<()> {
    let resp = client
        .call(Method::GET, MARKETPLACE_PARTICIPATIONS, None)
        .await?;
    let participations = match resp.get("payload") {
        Some(Value::Array(items)) => items.len(),
        _ => 0,
    };
    info!("seller authorized for {participations} marketplace participation(s)");
    Ok(())
}

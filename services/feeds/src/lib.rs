//! Feed publishing for the Selling Partner API.
//!
//! This crate implements the whole feed lifecycle on top of `spfeed-core`:
//!
//! - exchanging a refresh token for an access token ([`TokenProvider`])
//! - signed marketplace calls with redacted failure dumps ([`SignedClient`], [`Transcript`])
//! - uploading documents to pre-signed URLs and creating feeds
//! - fixed-interval, cancellable status polling ([`Poller`])
//! - downloading and decoding processing reports
//!
//! [`FeedPipeline`] ties these together.
//!
//! ## Example
//!
//! ```no_run
//! use spfeed_core::{Context, OsEnv};
//! use spfeed_feeds::{Config, FeedOutcome, FeedPipeline, FeedSubmission};
//!
//! # async fn example(ctx: Context) -> anyhow::Result<()> {
//! let ctx = ctx.with_env(OsEnv);
//! let config = Config::from_env(&ctx)?;
//! let pipeline = FeedPipeline::new(ctx, config);
//!
//! let submission = FeedSubmission::new(
//!     "POST_FLAT_FILE_LISTINGS_DATA",
//!     &["A1PA6795UKMFR9"],
//!     "sku\tprice\nSKU-1\t9.99\n",
//! );
//! match pipeline.run(submission).await? {
//!     FeedOutcome::Completed { content, .. } => println!("{content:?}"),
//!     other => println!("no report: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod constants;
pub use constants::*;

mod error;
pub use error::{Error, Result};

mod config;
pub use config::{Config, LwaConfig, PollConfig};

mod token;
pub use token::{AccessToken, TokenProvider};

mod artifacts;
pub use artifacts::Artifacts;

mod transcript;
pub use transcript::{redact_headers, request_id, Transcript, REDACTED_HEADERS};

mod client;
pub use client::{unwrap_payload, SignedClient};

mod document;
pub use document::UploadTarget;

mod feed;
pub use feed::Feed;

mod poll;
pub use poll::{FeedSnapshot, PollOutcome, Poller, ProcessingStatus};

mod result;
pub use result::{decode_content, is_gzip, maybe_gunzip, ResultContent, ResultDocument, ResultFetch};

mod pipeline;
pub use pipeline::{FeedOutcome, FeedPipeline, FeedSubmission, NoResultReason, SubmittedFeed};

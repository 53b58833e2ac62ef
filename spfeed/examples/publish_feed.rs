//! Publish a feed document and wait for its processing report.
//!
//! ```shell
//! cargo run --example publish_feed -- POST_FLAT_FILE_LISTINGS_DATA A1PA6795UKMFR9 listings.tsv
//! ```

use anyhow::{bail, Result};
use log::info;
use spfeed::default_context;
use spfeed::feeds::{Config, FeedOutcome, FeedPipeline, FeedSubmission, ResultContent};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [feed_type, marketplace_ids, path] = args.as_slice() else {
        bail!("usage: publish_feed <feed-type> <marketplace-id[,marketplace-id...]> <document>");
    };
    let marketplace_ids: Vec<&str> = marketplace_ids.split(',').map(str::trim).collect();

    let ctx = default_context();
    let submission = FeedSubmission::from_file(&ctx, feed_type, &marketplace_ids, path).await?;

    let cancel = CancellationToken::new();
    let config = Config::from_env(&ctx)?;
    let pipeline = FeedPipeline::new(ctx, config).with_cancellation(cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match pipeline.run(submission).await? {
        FeedOutcome::Completed { feed_id, content, .. } => {
            info!("feed {feed_id} completed");
            match content {
                ResultContent::Text(text) => println!("{text}"),
                ResultContent::Binary(bytes) => println!("<{} bytes of binary report>", bytes.len()),
            }
        }
        FeedOutcome::NoResult {
            feed_id,
            status,
            reason,
        } => println!("feed {feed_id} ended with {status} and no report ({reason:?})"),
        FeedOutcome::PollExhausted {
            feed_id, attempts, ..
        } => println!(
            "feed {feed_id} still processing after {attempts} polls, run check_feed {feed_id} later"
        ),
    }
    Ok(())
}

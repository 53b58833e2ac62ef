//! Poll an already submitted feed and print its processing report.
//!
//! ```shell
//! cargo run --example check_feed -- 50001
//! ```

use anyhow::{bail, Result};
use spfeed::feeds::{default_pipeline, FeedOutcome, ResultContent};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    env_logger::init();

    let Some(feed_id) = std::env::args().nth(1) else {
        bail!("usage: check_feed <feed-id>");
    };

    match default_pipeline()?.check(&feed_id).await? {
        FeedOutcome::Completed { content, .. } => match content {
            ResultContent::Text(text) => println!("{text}"),
            ResultContent::Binary(bytes) => println!("<{} bytes of binary report>", bytes.len()),
        },
        FeedOutcome::NoResult { status, reason, .. } => {
            println!("feed {feed_id} ended with {status} and no report ({reason:?})")
        }
        FeedOutcome::PollExhausted { last, .. } => {
            let status = last
                .and_then(|s| s.status)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("feed {feed_id} is still {status}")
        }
    }
    Ok(())
}

use crate::mock::*;
use anyhow::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use spfeed_feeds::{
    Error, FeedOutcome, FeedPipeline, NoResultReason, ProcessingStatus, ResultContent,
    FEED_REPORT_BINARY_FILE, FEED_STATUS_FILE,
};
use std::io::Write;
use std::time::Duration;
use test_case::test_case;
use tokio_util::sync::CancellationToken;

const FEED_PATH: &str = "/feeds/2021-06-30/feeds/50001";
const RESULT_PATH: &str = "/feeds/2021-06-30/documents/amzn1.tortuga.4.eu.result";

fn done() -> serde_json::Value {
    json!({
        "feedId": "50001",
        "processingStatus": "DONE",
        "resultFeedDocumentId": "amzn1.tortuga.4.eu.result"
    })
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhausted() -> Result<()> {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token();
    for attempt in 1..=3 {
        http.expect_api(
            Method::GET,
            FEED_PATH,
            200,
            json!({"feedId": "50001", "processingStatus": "IN_PROGRESS", "attempt": attempt}),
        );
    }

    let start = tokio::time::Instant::now();
    let outcome = FeedPipeline::new(context(&http), config(None))
        .check("50001")
        .await?;

    match outcome {
        FeedOutcome::PollExhausted {
            feed_id,
            attempts,
            last,
        } => {
            assert_eq!(feed_id, "50001");
            assert_eq!(attempts, 3);
            let last = last.expect("last snapshot is kept");
            assert_eq!(last.status, Some(ProcessingStatus::InProgress));
            assert_eq!(
                last.raw,
                json!({"feedId": "50001", "processingStatus": "IN_PROGRESS", "attempt": 3})
            );
        }
        other => panic!("expected exhausted polling, got {other:?}"),
    }
    // No wait after the last attempt.
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert_eq!(http.requests().len(), 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unknown_status_keeps_polling() -> Result<()> {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token()
        .expect_api(
            Method::GET,
            FEED_PATH,
            200,
            json!({"processingStatus": "IN_REVIEW"}),
        )
        .expect_api(Method::GET, FEED_PATH, 200, json!({"status": "IN_QUEUE"}))
        .expect_api(Method::GET, FEED_PATH, 200, json!({"payload": done()}))
        .expect_api(
            Method::GET,
            RESULT_PATH,
            200,
            json!({"feedDocumentId": "amzn1.tortuga.4.eu.result", "url": DOWNLOAD_URL}),
        )
        .expect(Method::GET, DOWNLOAD_URL, 200, REPORT);

    let outcome = FeedPipeline::new(context(&http), config(None))
        .check("50001")
        .await?;

    assert!(matches!(outcome, FeedOutcome::Completed { .. }));
    assert_eq!(http.remaining(), 0);
    Ok(())
}

#[test_case("CANCELLED", ProcessingStatus::Cancelled; "cancelled")]
#[test_case("FATAL", ProcessingStatus::Fatal; "fatal")]
#[tokio::test(start_paused = true)]
async fn test_terminal_without_result(raw: &str, expected: ProcessingStatus) -> Result<()> {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token().expect_api(
        Method::GET,
        FEED_PATH,
        200,
        json!({"feedId": "50001", "processingStatus": raw}),
    );

    let start = tokio::time::Instant::now();
    let outcome = FeedPipeline::new(context(&http), config(None))
        .check("50001")
        .await?;

    assert_eq!(
        outcome,
        FeedOutcome::NoResult {
            feed_id: "50001".to_string(),
            status: expected,
            reason: NoResultReason::TerminalWithoutResult,
        }
    );
    // Stops on the first terminal status without waiting.
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(http.requests().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_done_without_result_document() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let http = ScriptedHttpSend::new();
    http.expect_token().expect_api(
        Method::GET,
        FEED_PATH,
        200,
        json!({"feedId": "50001", "processingStatus": "DONE"}),
    );

    let outcome = FeedPipeline::new(context(&http), config(Some(dir.path())))
        .check("50001")
        .await?;

    assert_eq!(
        outcome,
        FeedOutcome::NoResult {
            feed_id: "50001".to_string(),
            status: ProcessingStatus::Done,
            reason: NoResultReason::NoResultDocument,
        }
    );
    assert!(dir.path().join(FEED_STATUS_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_result_document_without_url() -> Result<()> {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token()
        .expect_api(Method::GET, FEED_PATH, 200, done())
        .expect_api(
            Method::GET,
            RESULT_PATH,
            200,
            json!({"payload": {"feedDocumentId": "amzn1.tortuga.4.eu.result"}}),
        );

    let outcome = FeedPipeline::new(context(&http), config(None))
        .check("50001")
        .await?;

    assert!(matches!(
        outcome,
        FeedOutcome::NoResult {
            reason: NoResultReason::NoDownloadUrl,
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_gzip_report() -> Result<()> {
    init();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(REPORT.as_bytes())?;
    let compressed = encoder.finish()?;

    let http = ScriptedHttpSend::new();
    http.expect_token()
        .expect_api(Method::GET, FEED_PATH, 200, done())
        .expect_api(
            Method::GET,
            RESULT_PATH,
            200,
            json!({"feedDocumentId": "amzn1.tortuga.4.eu.result", "url": DOWNLOAD_URL, "compressionAlgorithm": "GZIP"}),
        )
        .expect(Method::GET, DOWNLOAD_URL, 200, compressed);

    let outcome = FeedPipeline::new(context(&http), config(None))
        .check("50001")
        .await?;

    match outcome {
        FeedOutcome::Completed {
            document, content, ..
        } => {
            assert_eq!(document.compression_algorithm.as_deref(), Some("GZIP"));
            assert_eq!(content, ResultContent::Text(REPORT.to_string()));
        }
        other => panic!("expected completed check, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_binary_report() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let payload = vec![0x50, 0x4b, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00, 0xff, 0xfe];

    let http = ScriptedHttpSend::new();
    http.expect_token()
        .expect_api(Method::GET, FEED_PATH, 200, done())
        .expect_api(
            Method::GET,
            RESULT_PATH,
            200,
            json!({"feedDocumentId": "amzn1.tortuga.4.eu.result", "url": DOWNLOAD_URL}),
        )
        .expect(Method::GET, DOWNLOAD_URL, 200, payload.clone());

    let outcome = FeedPipeline::new(context(&http), config(Some(dir.path())))
        .check("50001")
        .await?;

    match outcome {
        FeedOutcome::Completed { content, .. } => {
            assert_eq!(content, ResultContent::Binary(payload.clone()))
        }
        other => panic!("expected completed check, got {other:?}"),
    }
    assert_eq!(std::fs::read(dir.path().join(FEED_REPORT_BINARY_FILE))?, payload);
    Ok(())
}

#[tokio::test]
async fn test_poll_error_propagates() {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token().expect_api(
        Method::GET,
        FEED_PATH,
        503,
        json!({"errors": [{"code": "ServiceUnavailable"}]}),
    );

    let err = FeedPipeline::new(context(&http), config(None))
        .check("50001")
        .await
        .expect_err("503 must fail the check");

    assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    assert!(err.is_retryable());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_waiting() {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token();
    for _ in 0..3 {
        http.expect_api(
            Method::GET,
            FEED_PATH,
            200,
            json!({"processingStatus": "IN_QUEUE"}),
        );
    }

    let token = CancellationToken::new();
    let pipeline =
        FeedPipeline::new(context(&http), config(None)).with_cancellation(token.clone());
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(15)).await;
        token.cancel();
    });

    let err = pipeline
        .check("50001")
        .await
        .expect_err("cancellation must abort polling");

    assert!(matches!(err, Error::Cancelled));
    // Polled at 0s and 10s, cancelled during the second wait.
    assert_eq!(http.requests().len(), 3);
}

use crate::mock::*;
use anyhow::Result;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use spfeed_aws_v4::{AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY};
use spfeed_core::{Context, StaticEnv};
use spfeed_feeds::{
    Config, Error, FeedOutcome, FeedPipeline, FeedSubmission, ResultContent,
    DEFAULT_CONTENT_TYPE, FEED_DOCUMENT_META_FILE, FEED_REPORT_TEXT_FILE, FEED_STATUS_FILE,
    REQUEST_DUMP_FILE, SPAPI_LWA_CLIENT_ID, SPAPI_LWA_CLIENT_SECRET, SPAPI_LWA_REFRESH_TOKEN,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn submission() -> FeedSubmission {
    FeedSubmission::new(
        "POST_FLAT_FILE_LISTINGS_DATA",
        &["A1PA6795UKMFR9"],
        "sku\tprice\tquantity\nSKU-1\t9.99\t3\n",
    )
}

fn script_submit(http: &ScriptedHttpSend) {
    http.expect_api(
        Method::POST,
        "/feeds/2021-06-30/documents",
        201,
        json!({"feedDocumentId": "amzn1.tortuga.4.eu.input", "url": UPLOAD_URL}),
    )
    .expect(Method::PUT, UPLOAD_URL, 200, "")
    .expect_api(
        Method::POST,
        "/feeds/2021-06-30/feeds",
        202,
        json!({"feedId": "50001"}),
    );
}

#[tokio::test(start_paused = true)]
async fn test_run_to_completion() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let http = ScriptedHttpSend::new();
    http.expect_token();
    script_submit(&http);
    http.expect_api(
        Method::GET,
        "/feeds/2021-06-30/feeds/50001",
        200,
        json!({"feedId": "50001", "processingStatus": "IN_PROGRESS"}),
    )
    .expect_api(
        Method::GET,
        "/feeds/2021-06-30/feeds/50001",
        200,
        json!({"payload": {
            "feedId": "50001",
            "processingStatus": "DONE",
            "resultFeedDocumentId": "amzn1.tortuga.4.eu.result"
        }}),
    )
    .expect_api(
        Method::GET,
        "/feeds/2021-06-30/documents/amzn1.tortuga.4.eu.result",
        200,
        json!({"feedDocumentId": "amzn1.tortuga.4.eu.result", "url": DOWNLOAD_URL}),
    )
    .expect(Method::GET, DOWNLOAD_URL, 200, REPORT);

    let pipeline = FeedPipeline::new(context(&http), config(Some(dir.path())));
    let start = tokio::time::Instant::now();
    let outcome = pipeline.run(submission()).await?;

    match outcome {
        FeedOutcome::Completed {
            feed_id,
            document,
            content,
        } => {
            assert_eq!(feed_id, "50001");
            assert_eq!(document.feed_document_id, "amzn1.tortuga.4.eu.result");
            assert_eq!(content, ResultContent::Text(REPORT.to_string()));
        }
        other => panic!("expected completed run, got {other:?}"),
    }
    assert_eq!(start.elapsed(), Duration::from_secs(10), "one wait between two polls");
    assert_eq!(http.remaining(), 0);

    let requests = http.requests();
    assert_eq!(requests.len(), 8);

    // Signed marketplace calls.
    for req in requests.iter().filter(|r| r.uri.starts_with(ENDPOINT)) {
        assert_eq!(req.headers["x-amz-access-token"], ACCESS_TOKEN);
        let auth = req.headers[AUTHORIZATION].to_str()?;
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(auth.contains(
            "/eu-west-1/execute-api/aws4_request, SignedHeaders=accept;content-type;host;x-amz-access-token;x-amz-content-sha256;x-amz-date, Signature="
        ));
        assert_eq!(req.headers["x-amz-content-sha256"].len(), 64);
        assert_eq!(req.timeout, Some(Duration::from_secs(120)));
    }

    // Document transfers are neither signed nor carry the token.
    let upload = &requests[2];
    assert_eq!(upload.method, Method::PUT);
    assert_eq!(upload.headers[CONTENT_TYPE], DEFAULT_CONTENT_TYPE);
    assert_eq!(upload.body.as_ref(), b"sku\tprice\tquantity\nSKU-1\t9.99\t3\n");
    assert!(!upload.headers.contains_key(AUTHORIZATION));
    assert!(!upload.headers.contains_key("x-amz-access-token"));
    assert_eq!(upload.timeout, Some(Duration::from_secs(300)));
    assert_eq!(requests[7].timeout, Some(Duration::from_secs(180)));

    let create_feed: serde_json::Value = serde_json::from_slice(&requests[3].body)?;
    assert_eq!(
        create_feed,
        json!({
            "feedType": "POST_FLAT_FILE_LISTINGS_DATA",
            "marketplaceIds": ["A1PA6795UKMFR9"],
            "inputFeedDocumentId": "amzn1.tortuga.4.eu.input"
        })
    );

    let status: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join(FEED_STATUS_FILE))?)?;
    assert_eq!(status["processingStatus"], "DONE");
    assert!(dir.path().join(FEED_DOCUMENT_META_FILE).exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(FEED_REPORT_TEXT_FILE))?,
        REPORT
    );
    assert!(!dir.path().join(REQUEST_DUMP_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_submit_with_seller_access_check() -> Result<()> {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token().expect_api(
        Method::GET,
        "/sellers/v1/marketplaceParticipations",
        200,
        json!({"payload": [{"marketplace": {"id": "A1PA6795UKMFR9"}, "participation": {"isParticipating": true}}]}),
    );
    script_submit(&http);

    let mut cfg = config(None);
    cfg.verify_seller_access = true;
    let submitted = FeedPipeline::new(context(&http), cfg)
        .submit(submission().with_content_type("text/xml; charset=UTF-8"))
        .await?;

    assert_eq!(submitted.feed.feed_id, "50001");
    assert_eq!(submitted.feed.input_feed_document_id, "amzn1.tortuga.4.eu.input");
    assert_eq!(submitted.upload.url, UPLOAD_URL);
    assert_eq!(submitted.upload.content_type, "text/xml; charset=UTF-8");

    let requests = http.requests();
    assert_eq!(requests.len(), 5);
    assert_eq!(
        serde_json::from_slice::<serde_json::Value>(&requests[2].body)?,
        json!({"contentType": "text/xml; charset=UTF-8"})
    );
    assert_eq!(requests[3].headers[CONTENT_TYPE], "text/xml; charset=UTF-8");
    Ok(())
}

#[tokio::test]
async fn test_rejected_document_request_stops_the_run() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let http = ScriptedHttpSend::new();
    http.expect_token().expect_response(
        Method::POST,
        &format!("{ENDPOINT}/feeds/2021-06-30/documents"),
        http::Response::builder()
            .status(403)
            .header("x-amzn-RequestId", "7c9e0d8a-2f3b-4c1d-9e8f-000000000001")
            .header("content-type", "application/json")
            .body(bytes::Bytes::from_static(
                br#"{"errors":[{"code":"Unauthorized","message":"Access to requested resource is denied."}]}"#,
            ))?,
    );

    let err = FeedPipeline::new(context(&http), config(Some(dir.path())))
        .run(submission())
        .await
        .expect_err("403 must abort the run");

    match &err {
        Error::Http {
            status, request_id, ..
        } => {
            assert_eq!(*status, StatusCode::FORBIDDEN);
            assert_eq!(
                request_id.as_deref(),
                Some("7c9e0d8a-2f3b-4c1d-9e8f-000000000001")
            );
        }
        other => panic!("expected http error, got {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(http.requests().len(), 2, "no call after the failure");

    let dump = std::fs::read_to_string(dir.path().join(REQUEST_DUMP_FILE))?;
    assert!(dump.starts_with("=== REQUEST ===\nPOST https://sellingpartnerapi-eu.amazon.com/feeds/2021-06-30/documents\n"));
    assert!(dump.contains("\"authorization\": \"***REDACTED***\""));
    assert!(dump.contains("\"x-amz-access-token\": \"***REDACTED***\""));
    assert!(dump.contains("Request id: 7c9e0d8a-2f3b-4c1d-9e8f-000000000001"));
    assert!(dump.contains("Access to requested resource is denied."));
    assert!(!dump.contains(ACCESS_TOKEN));
    assert!(!dump.contains("Signature="));
    Ok(())
}

#[tokio::test]
async fn test_failed_upload() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let http = ScriptedHttpSend::new();
    http.expect_token()
        .expect_api(
            Method::POST,
            "/feeds/2021-06-30/documents",
            201,
            json!({"payload": {"feedDocumentId": "amzn1.tortuga.4.eu.input", "url": UPLOAD_URL}}),
        )
        .expect(
            Method::PUT,
            UPLOAD_URL,
            403,
            "<Error><Code>SignatureDoesNotMatch</Code></Error>",
        );

    let err = FeedPipeline::new(context(&http), config(Some(dir.path())))
        .submit(submission())
        .await
        .expect_err("upload must fail");

    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(http.requests().len(), 3, "no feed is created");

    let dump = std::fs::read_to_string(dir.path().join(REQUEST_DUMP_FILE))?;
    assert!(dump.contains("SignatureDoesNotMatch"));
    assert!(!dump.contains("upload-signature"));
    Ok(())
}

#[tokio::test]
async fn test_token_failure_is_fatal() {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_json(
        Method::POST,
        LWA_ENDPOINT,
        400,
        json!({"error": "invalid_grant", "error_description": "The request has an invalid grant parameter"}),
    );

    let err = FeedPipeline::new(context(&http), config(None))
        .run(submission())
        .await
        .expect_err("token failure must abort the run");

    assert!(matches!(err, Error::Auth { status, .. } if status == StatusCode::BAD_REQUEST));
    assert_eq!(http.requests().len(), 1, "no signed call after a token failure");
}

#[tokio::test]
async fn test_empty_marketplaces_rejected_before_any_upload() {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token();

    let err = FeedPipeline::new(context(&http), config(None))
        .submit(FeedSubmission::new("POST_FLAT_FILE_LISTINGS_DATA", &[], "sku\n"))
        .await
        .expect_err("empty marketplaces must be rejected");

    assert!(matches!(err, Error::Signing(_)));
    assert_eq!(http.requests().len(), 1);
}

#[tokio::test]
async fn test_default_config_dumps_into_working_directory() -> Result<()> {
    init();
    let http = ScriptedHttpSend::new();
    http.expect_token().expect_json(
        Method::GET,
        &format!("{ENDPOINT}/sellers/v1/marketplaceParticipations"),
        403,
        json!({"errors": [{"code": "Unauthorized", "message": "Access to requested resource is denied."}]}),
    );
    let fs = RecordingFs::default();
    let ctx = Context::new()
        .with_http_send(http.clone())
        .with_file_write(fs.clone())
        .with_env(StaticEnv {
            envs: [
                (SPAPI_LWA_CLIENT_ID, "amzn1.application-oa2-client.test"),
                (SPAPI_LWA_CLIENT_SECRET, "client-secret"),
                (SPAPI_LWA_REFRESH_TOKEN, "Atzr|refresh"),
                (AWS_ACCESS_KEY_ID, "AKIDEXAMPLE"),
                (AWS_SECRET_ACCESS_KEY, "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        });

    let config = Config::from_env(&ctx)?;
    assert_eq!(config.artifact_dir, Some(PathBuf::from(".")));

    let err = FeedPipeline::new(ctx, config)
        .submit(submission())
        .await
        .expect_err("403 must abort the submission");
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));

    let dump_path = Path::new(".").join(REQUEST_DUMP_FILE);
    let dump = fs
        .content(&dump_path.to_string_lossy())
        .unwrap_or_else(|| panic!("no dump written, got {:?}", fs.paths()));
    let dump = String::from_utf8(dump)?;
    assert!(dump.starts_with("=== REQUEST ===\nGET https://sellingpartnerapi-eu.amazon.com/sellers/v1/marketplaceParticipations\n"));
    assert!(dump.contains("\"x-amz-access-token\": \"***REDACTED***\""));
    assert!(!dump.contains(ACCESS_TOKEN));
    Ok(())
}

#[tokio::test]
async fn test_submission_from_file() -> Result<()> {
    init();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("listings.tsv");
    std::fs::write(&path, "sku\tprice\nSKU-1\t9.99\n")?;
    let http = ScriptedHttpSend::new();
    http.expect_token();
    script_submit(&http);
    let ctx = context(&http);

    let submission = FeedSubmission::from_file(
        &ctx,
        "POST_FLAT_FILE_LISTINGS_DATA",
        &["A1PA6795UKMFR9"],
        &path.to_string_lossy(),
    )
    .await?;
    FeedPipeline::new(ctx, config(None)).submit(submission).await?;

    let requests = http.requests();
    assert_eq!(requests[2].method, Method::PUT);
    assert_eq!(requests[2].body.as_ref(), b"sku\tprice\nSKU-1\t9.99\n");
    Ok(())
}

#[tokio::test]
async fn test_submission_from_missing_file() {
    let http = ScriptedHttpSend::new();

    let err = FeedSubmission::from_file(
        &context(&http),
        "POST_FLAT_FILE_LISTINGS_DATA",
        &["A1PA6795UKMFR9"],
        "/definitely/not/here.tsv",
    )
    .await
    .expect_err("missing document must fail");

    assert!(matches!(err, Error::Document { ref path, .. } if path == "/definitely/not/here.tsv"));
    assert!(http.requests().is_empty());
}

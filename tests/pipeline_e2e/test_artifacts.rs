//! E2E tests: artifact collection, transfer and confirmation.

use serde_json::json;
use testledger_reporter::config::LedgerSettings;
use testledger_reporter::models::{Artifact, LedgerId};
use testledger_reporter::services::{
    ArtifactUploader, Diagnostics, LedgerClient, Stage, run_pipeline,
};

use super::mock_ledger::MockLedger;
use super::test_helpers::*;

fn two_suite_run() -> TestRun {
    let run = TestRun::new();
    run.write_log(
        "wdio-0-0-json-reporter.log",
        &suite_log("Login", "test/specs/login.spec.js", true, json!([])),
    );
    run.write_log(
        "wdio-0-1-json-reporter.log",
        &suite_log("Checkout", "test/specs/checkout.spec.js", true, json!([])),
    );
    run
}

/// Screenshots and videos are described with their suite, type, mime type and size.
#[actix_rt::test]
async fn test_artifacts_described_and_associated() {
    let ledger = MockLedger::start().await;
    let run = two_suite_run();
    run.write_screenshot("checkout.spec--pays.png", b"png-data");
    run.write_screenshot("unrelated.jpg", b"jpeg");
    run.write_screenshot("notes.txt", b"ignored");
    run.write_video("login.spec.webm", b"webm-video-bytes");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    let request = ledger.requests_to("/artifacts/presigned-upload")[0].json();
    let artifacts = request["artifacts"].as_array().unwrap();
    assert_eq!(artifacts.len(), 3);

    assert_eq!(artifacts[0]["filename"], "checkout.spec--pays.png");
    assert_eq!(artifacts[0]["artifact_type"], "screenshot");
    assert_eq!(artifacts[0]["mime_type"], "image/png");
    assert_eq!(artifacts[0]["file_size"], 8);
    assert_eq!(artifacts[0]["test_run_suite_id"], 2);
    assert!(artifacts[0]["test_run_suite_test_id"].is_null());

    // No spec name in the filename: first suite
    assert_eq!(artifacts[1]["filename"], "unrelated.jpg");
    assert_eq!(artifacts[1]["mime_type"], "image/jpeg");
    assert_eq!(artifacts[1]["test_run_suite_id"], 1);

    assert_eq!(artifacts[2]["artifact_type"], "video");
    assert_eq!(artifacts[2]["mime_type"], "video/webm");
    assert_eq!(artifacts[2]["test_run_suite_id"], 1);

    let summary = outcome.upload.unwrap();
    assert_eq!(summary.artifacts, 3);
    assert_eq!(summary.transferred(), 3);
    assert!(summary.confirmed);
    assert!(outcome.diagnostics.is_empty());
}

/// Each PUT carries the artifact bytes and its mime type.
#[actix_rt::test]
async fn test_transfers_send_bytes_with_content_type() {
    let ledger = MockLedger::start().await;
    let run = two_suite_run();
    run.write_screenshot("login.spec.gif", b"GIF89a");
    run.write_video("checkout.spec.mov", b"quicktime");
    let (started_at, finished_at) = run_window();

    run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    let puts = ledger.requests_to("/storage/");
    assert_eq!(puts.len(), 2);
    assert_eq!(puts[0].method, "PUT");
    assert_eq!(puts[0].path, "/storage/1000");
    assert_eq!(puts[0].content_type.as_deref(), Some("image/gif"));
    assert_eq!(puts[0].body, b"GIF89a");
    assert_eq!(puts[1].content_type.as_deref(), Some("video/quicktime"));
    assert_eq!(puts[1].body, b"quicktime");
}

/// Only successfully transferred ids are confirmed.
#[actix_rt::test]
async fn test_confirm_names_only_successful_transfers() {
    let ledger = MockLedger::start().await;
    ledger.script(|s| {
        s.failing_uploads.insert("1001".to_string());
    });
    let run = two_suite_run();
    run.write_screenshot("a-login.spec.png", b"1");
    run.write_screenshot("b-login.spec.png", b"2");
    run.write_screenshot("c-login.spec.png", b"3");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    assert_eq!(ledger.requests_to("/storage/").len(), 3);
    let confirm = ledger.requests_to("/artifacts/confirm");
    assert_eq!(confirm.len(), 1);
    assert_eq!(confirm[0].json(), json!({"artifact_ids": [1000, 1002]}));

    let summary = outcome.upload.unwrap();
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.confirmed_ids, vec![LedgerId::Int(1000), LedgerId::Int(1002)]);

    let upload: Vec<_> = outcome.diagnostics.for_stage(Stage::Upload).collect();
    assert_eq!(upload.len(), 1);
    assert!(upload[0].message.contains("1001"));
    assert!(upload[0].message.contains("HTTP 500"));
}

#[actix_rt::test]
async fn test_no_confirm_when_every_transfer_fails() {
    let ledger = MockLedger::start().await;
    ledger.script(|s| {
        s.failing_uploads.insert("1000".to_string());
    });
    let run = two_suite_run();
    run.write_screenshot("login.spec.png", b"1");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    assert!(ledger.requests_to("/artifacts/confirm").is_empty());
    let summary = outcome.upload.unwrap();
    assert!(summary.confirmed_ids.is_empty());
    assert!(!summary.confirmed);
}

/// An empty target list ends the stage quietly.
#[actix_rt::test]
async fn test_empty_presigned_response_uploads_nothing() {
    let ledger = MockLedger::start().await;
    ledger.script(|s| s.presigned_response = Some(json!({})));
    let run = two_suite_run();
    run.write_screenshot("login.spec.png", b"1");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    assert!(ledger.requests_to("/storage/").is_empty());
    assert!(ledger.requests_to("/artifacts/confirm").is_empty());
    assert_eq!(outcome.upload.unwrap().targets, 0);
    assert!(outcome.diagnostics.is_empty());
}

#[actix_rt::test]
async fn test_presigned_failure_is_a_diagnostic() {
    let ledger = MockLedger::start().await;
    ledger.script(|s| s.presigned_status = 503);
    let run = two_suite_run();
    run.write_screenshot("login.spec.png", b"1");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    assert!(ledger.requests_to("/storage/").is_empty());
    assert_eq!(outcome.diagnostics.for_stage(Stage::Upload).count(), 1);
}

#[actix_rt::test]
async fn test_confirm_failure_is_a_diagnostic() {
    let ledger = MockLedger::start().await;
    ledger.script(|s| s.confirm_status = 500);
    let run = two_suite_run();
    run.write_screenshot("login.spec.png", b"1");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    assert_eq!(ledger.requests_to("/artifacts/confirm").len(), 1);
    let summary = outcome.upload.unwrap();
    assert_eq!(summary.confirmed_ids, vec![LedgerId::Int(1000)]);
    assert!(!summary.confirmed);

    let upload: Vec<_> = outcome.diagnostics.for_stage(Stage::Upload).collect();
    assert_eq!(upload.len(), 1);
    assert!(upload[0].message.contains("/artifacts/confirm"));
}

/// Surplus targets fail on their own; the matched ones still go through.
#[actix_rt::test]
async fn test_surplus_targets_fail_individually() {
    let ledger = MockLedger::start().await;
    let base = ledger.base_url.clone();
    ledger.script(|s| {
        s.presigned_response = Some(json!({"uploads": [
            {"artifact_id": "a1", "presigned_url": format!("{}/storage/a1", base)},
            {"artifact_id": "a2", "presigned_url": format!("{}/storage/a2", base)},
        ]}))
    });
    let run = two_suite_run();
    run.write_screenshot("login.spec.png", b"1");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    assert_eq!(ledger.requests_to("/storage/").len(), 1);
    let summary = outcome.upload.unwrap();
    assert_eq!(summary.transferred(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.confirmed_ids, vec![LedgerId::Text("a1".to_string())]);
    assert_eq!(
        summary.results[1].error.as_deref(),
        Some("no artifact for upload target")
    );
}

/// Fewer targets than artifacts: only the paired artifacts are sent.
#[actix_rt::test]
async fn test_missing_targets_leave_artifacts_unsent() {
    let ledger = MockLedger::start().await;
    let base = ledger.base_url.clone();
    ledger.script(|s| {
        s.presigned_response = Some(json!({"uploads": [
            {"artifact_id": 1, "presigned_url": format!("{}/storage/1", base)},
        ]}))
    });
    let run = two_suite_run();
    run.write_screenshot("a-login.spec.png", b"1");
    run.write_screenshot("b-login.spec.png", b"2");
    run.write_screenshot("c-login.spec.png", b"3");
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&run.config(&ledger), started_at, finished_at).await;

    let described = ledger.requests_to("/artifacts/presigned-upload")[0].json();
    assert_eq!(described["artifacts"].as_array().unwrap().len(), 3);

    let puts = ledger.requests_to("/storage/");
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].path, "/storage/1");
    assert_eq!(puts[0].body, b"1");

    let summary = outcome.upload.unwrap();
    assert_eq!(summary.artifacts, 3);
    assert_eq!(summary.targets, 1);
    assert_eq!(summary.results.len(), 1);
    assert!(summary.results[0].success);
    assert_eq!(summary.confirmed_ids, vec![LedgerId::Int(1)]);
    assert!(summary.confirmed);

    let confirm = ledger.requests_to("/artifacts/confirm");
    assert_eq!(confirm.len(), 1);
    assert_eq!(confirm[0].json(), json!({"artifact_ids": [1]}));
    assert!(outcome.diagnostics.is_empty());
}

#[actix_rt::test]
async fn test_artifacts_disabled_skips_upload_stage() {
    let ledger = MockLedger::start().await;
    let run = two_suite_run();
    run.write_screenshot("login.spec.png", b"1");
    let config = run.config_with(&ledger, &[("TESTLEDGER_UPLOAD_ARTIFACTS", "0")]);
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&config, started_at, finished_at).await;

    assert!(outcome.upload.is_none());
    assert_eq!(ledger.requests().len(), 1);
}

/// Parallel transfers keep results in target order.
#[actix_rt::test]
async fn test_concurrent_transfers_keep_order() {
    let ledger = MockLedger::start().await;
    ledger.script(|s| {
        s.failing_uploads.insert("1002".to_string());
    });
    let run = two_suite_run();
    for i in 0..5 {
        run.write_screenshot(&format!("{}-login.spec.png", i), b"x");
    }
    let config = run.config_with(&ledger, &[("TESTLEDGER_MAX_CONCURRENT_TRANSFERS", "3")]);
    let (started_at, finished_at) = run_window();

    let outcome = run_pipeline(&config, started_at, finished_at).await;

    let summary = outcome.upload.unwrap();
    let ids: Vec<LedgerId> = summary.results.iter().map(|r| r.artifact_id.clone()).collect();
    assert_eq!(ids, (1000..1005).map(LedgerId::Int).collect::<Vec<_>>());
    assert!(!summary.results[2].success);
    assert_eq!(
        summary.confirmed_ids,
        vec![
            LedgerId::Int(1000),
            LedgerId::Int(1001),
            LedgerId::Int(1003),
            LedgerId::Int(1004)
        ]
    );
}

/// An empty artifact list never touches the network.
#[actix_rt::test]
async fn test_upload_of_nothing_makes_no_requests() {
    let ledger = MockLedger::start().await;
    let client = LedgerClient::new(&LedgerSettings {
        api_url: ledger.base_url.clone(),
        api_token: TEST_API_TOKEN.to_string().into(),
        project_id: None,
    })
    .unwrap();
    let mut diagnostics = Diagnostics::new();

    let artifacts: Vec<Artifact> = Vec::new();
    let summary = ArtifactUploader::new(client, 1)
        .upload(&artifacts, &mut diagnostics)
        .await;

    assert_eq!(summary.artifacts, 0);
    assert!(ledger.requests().is_empty());
    assert!(diagnostics.is_empty());
}

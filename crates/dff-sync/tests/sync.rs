//! End-to-end sync runs against a wiremock LocalLine and in-memory rows.

use std::path::Path;

use dff_core::{MarkupConfig, PriceListTarget};
use dff_db::{CandidateFilter, PricelistRow};
use dff_localline::LocalLineClient;
use dff_sync::{RunState, SyncError, SyncOrchestrator, SyncSettings};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn markups() -> MarkupConfig {
    MarkupConfig {
        member_markup: Decimal::new(38, 2),
        guest_markup: Decimal::new(55, 2),
        discount: Decimal::new(65, 2),
    }
}

fn targets() -> Vec<PriceListTarget> {
    vec![
        PriceListTarget {
            name: "test1".to_string(),
            id: 5332,
            markup: Decimal::new(38, 2),
        },
        PriceListTarget {
            name: "guest".to_string(),
            id: 4757,
            markup: Decimal::new(55, 2),
        },
    ]
}

fn settings(csv: &Path, dry_run: bool) -> SyncSettings {
    SyncSettings {
        markups: markups(),
        price_lists: targets(),
        username: "farm@example.com".to_string(),
        password: "hunter2".to_string(),
        missing_links_path: csv.to_path_buf(),
        dry_run,
    }
}

fn each_row(id: i64, vendor_id: i64, retail: Decimal) -> PricelistRow {
    PricelistRow {
        id,
        category: "Roasters & Turkeys".to_string(),
        product_name: format!("row {id}"),
        package_name: None,
        description: None,
        retail_sales_price: retail,
        dff_unit_of_measure: "each".to_string(),
        lowest_weight: None,
        highest_weight: None,
        num_of_items: None,
        local_line_product_id: Some(vendor_id),
        local_line_connected_vendor_product_id: Some(vendor_id),
        available_on_ll: true,
        visible: true,
        track_inventory: false,
        stock_inventory: 0,
    }
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"access": "tok"})))
        .mount(server)
        .await;
}

/// Mounts `GET products/{id}/` returning a product on the given price lists.
async fn mount_product(server: &MockServer, id: i64, name: &str, lists: &[i64]) {
    let entries: Vec<serde_json::Value> = lists
        .iter()
        .map(|l| serde_json::json!({"id": id * 10 + l, "price_list": l}))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/products/{id}/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "name": name,
            "packages": [{"id": id + 1000, "name": "Default"}],
            "product_price_list_entries": entries
        })))
        .mount(server)
        .await;
}

async fn mount_patch_ok(server: &MockServer, id: i64) {
    Mock::given(method("PATCH"))
        .and(path(format!("/products/{id}/")))
        .and(query_param("expand", "vendor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": id})))
        .mount(server)
        .await;
}

fn client(server: &MockServer) -> LocalLineClient {
    LocalLineClient::with_base_url(&server.uri(), 30, None).expect("client")
}

#[tokio::test]
async fn full_run_updates_entries_and_records_misses() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    // Product 100 is on both lists, product 200 only on test1.
    mount_product(&server, 100, "Whole Turkey", &[5332, 4757]).await;
    mount_product(&server, 200, "Roaster", &[5332]).await;
    mount_patch_ok(&server, 100).await;
    mount_patch_ok(&server, 200).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("data").join("missing.csv");
    let rows = vec![
        each_row(1, 100, Decimal::new(1000, 2)),
        each_row(2, 200, Decimal::new(500, 2)),
    ];

    let client = client(&server);
    let mut orchestrator = SyncOrchestrator::new(&client, settings(&csv, false));
    let report = orchestrator
        .run(&rows, CandidateFilter::default(), &CancellationToken::new())
        .await
        .expect("run should succeed");

    assert_eq!(orchestrator.state(), RunState::Done);
    assert_eq!(report.rows_seen, 2);
    assert_eq!(report.rows_failed, 0);
    assert_eq!(report.entries_updated, 3);
    assert_eq!(report.misses, 1);
    assert_eq!(report.misses_flushed, 1);
    assert!(!report.cancelled);

    let contents = std::fs::read_to_string(&csv).expect("csv written");
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "timestamp,product_id,product_name,missing_price_list");
    assert!(lines[1].ends_with(",200,Roaster,product does not appear in pricelist guest (4757)"));
}

#[tokio::test]
async fn guest_patch_carries_computed_price() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_product(&server, 100, "Whole Turkey", &[4757]).await;

    // retail 10.00 × discount 0.65 = 6.50; guest 6.50 × 1.55 = 10.075 → 10.08
    Mock::given(method("PATCH"))
        .and(path("/products/100/"))
        .and(body_partial_json(serde_json::json!({
            "packages": [{
                "id": 1100,
                "unit_price": "6.50",
                "price_list_entries": [{
                    "price_list": 4757,
                    "product_price_list_entry": 5757,
                    "calculated_value": 10.08,
                    "adjustment_value": 55.0
                }]
            }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let mut s = settings(&dir.path().join("m.csv"), false);
    s.price_lists.retain(|t| t.id == 4757);

    let client = client(&server);
    let report = SyncOrchestrator::new(&client, s)
        .run(
            &vec![each_row(1, 100, Decimal::new(1000, 2))],
            CandidateFilter::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("run");

    assert_eq!(report.entries_updated, 1);
    assert_eq!(report.remote_failures, 0);
}

#[tokio::test]
async fn bad_row_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_product(&server, 300, "Eggs", &[5332, 4757]).await;
    mount_patch_ok(&server, 300).await;

    let mut broken = each_row(1, 999, Decimal::new(500, 2));
    broken.dff_unit_of_measure = "bushel".to_string();
    let mut unbounded = each_row(2, 998, Decimal::new(500, 2));
    unbounded.dff_unit_of_measure = "lbs".to_string();
    let rows = vec![broken, unbounded, each_row(3, 300, Decimal::new(700, 2))];

    let dir = tempfile::tempdir().expect("tempdir");
    let client = client(&server);
    let report = SyncOrchestrator::new(&client, settings(&dir.path().join("m.csv"), false))
        .run(&rows, CandidateFilter::default(), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(report.rows_seen, 3);
    assert_eq!(report.rows_failed, 2);
    assert_eq!(report.entries_updated, 2);
}

#[tokio::test]
async fn remote_failures_are_counted_and_skipped() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    // Product 400 is unknown remotely; product 500 rejects patches.
    Mock::given(method("GET"))
        .and(path("/products/400/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_product(&server, 500, "Chicken", &[5332, 4757]).await;
    Mock::given(method("PATCH"))
        .and(path("/products/500/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("m.csv");
    let rows = vec![
        each_row(1, 400, Decimal::new(500, 2)),
        each_row(2, 500, Decimal::new(500, 2)),
    ];

    let client = client(&server);
    let report = SyncOrchestrator::new(&client, settings(&csv, false))
        .run(&rows, CandidateFilter::default(), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(report.remote_failures, 4);
    assert_eq!(report.entries_updated, 0);
    assert_eq!(report.misses, 0);
    assert!(!csv.exists(), "no misses means no file");
}

#[tokio::test]
async fn same_product_on_two_rows_is_missed_once() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_product(&server, 600, "Duck", &[]).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("m.csv");
    let rows = vec![
        each_row(1, 600, Decimal::new(500, 2)),
        each_row(2, 600, Decimal::new(900, 2)),
    ];

    let client = client(&server);
    let mut orchestrator = SyncOrchestrator::new(&client, settings(&csv, false));
    let report = orchestrator
        .run(&rows, CandidateFilter::default(), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(report.misses, 2, "one per price list");
    assert_eq!(report.misses_flushed, 2);
    assert_eq!(orchestrator.recorder().len(), 2);
}

#[tokio::test]
async fn product_body_without_id_records_requested_id() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path("/products/900/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Goose",
            "packages": [{"id": 1900, "name": "10-12 lb"}],
            "product_price_list_entries": []
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("m.csv");
    let rows = vec![each_row(1, 900, Decimal::new(800, 2))];

    let client = client(&server);
    let mut orchestrator = SyncOrchestrator::new(&client, settings(&csv, false));
    let report = orchestrator
        .run(&rows, CandidateFilter::default(), &CancellationToken::new())
        .await
        .expect("run");

    assert_eq!(report.misses, 2);
    assert_eq!(report.remote_failures, 0);
    assert_eq!(report.misses_flushed, 2);

    let contents = std::fs::read_to_string(&csv).expect("csv written");
    let lines: Vec<&str> = contents.lines().skip(1).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.contains(",900,Goose,")));
}

#[tokio::test]
async fn unwritable_miss_log_fails_the_run() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_product(&server, 800, "Pheasant", &[]).await;

    // A regular file where the log's parent directory should be.
    let blocker = tempfile::NamedTempFile::new().expect("temp file");
    let csv = blocker.path().join("m.csv");
    let rows = vec![each_row(1, 800, Decimal::new(500, 2))];

    let client = client(&server);
    let mut orchestrator = SyncOrchestrator::new(&client, settings(&csv, false));
    let result = orchestrator
        .run(&rows, CandidateFilter::default(), &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(SyncError::Recorder(_))), "{result:?}");
    assert_eq!(orchestrator.state(), RunState::Failed);
    assert_eq!(orchestrator.recorder().len(), 2);
}

#[tokio::test]
async fn second_run_appends_without_header() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_product(&server, 700, "Goose", &[5332]).await;
    mount_patch_ok(&server, 700).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("m.csv");
    let rows = vec![each_row(1, 700, Decimal::new(500, 2))];
    let client = client(&server);

    for _ in 0..2 {
        SyncOrchestrator::new(&client, settings(&csv, false))
            .run(&rows, CandidateFilter::default(), &CancellationToken::new())
            .await
            .expect("run");
    }

    let contents = std::fs::read_to_string(&csv).expect("csv");
    assert_eq!(contents.lines().count(), 3);
    assert_eq!(contents.matches("missing_price_list").count(), 1);
}

#[tokio::test]
async fn dry_run_sends_no_patches() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_product(&server, 800, "Lamb", &[5332, 4757]).await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let client = client(&server);
    let report = SyncOrchestrator::new(&client, settings(&dir.path().join("m.csv"), true))
        .run(
            &vec![each_row(1, 800, Decimal::new(500, 2))],
            CandidateFilter::default(),
            &CancellationToken::new(),
        )
        .await
        .expect("run");

    assert_eq!(report.entries_updated, 2);
}

#[tokio::test]
async fn authentication_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let client = client(&server);
    let mut orchestrator = SyncOrchestrator::new(&client, settings(&dir.path().join("m.csv"), false));
    let err = orchestrator
        .run(
            &vec![each_row(1, 100, Decimal::ONE)],
            CandidateFilter::default(),
            &CancellationToken::new(),
        )
        .await
        .expect_err("run should fail");

    assert!(matches!(err, SyncError::Authentication(_)));
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[tokio::test]
async fn cancelled_run_skips_rows_but_flushes() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let client = client(&server);
    let mut orchestrator = SyncOrchestrator::new(&client, settings(&dir.path().join("m.csv"), false));
    let report = orchestrator
        .run(
            &vec![each_row(1, 100, Decimal::ONE), each_row(2, 200, Decimal::ONE)],
            CandidateFilter::default(),
            &cancel,
        )
        .await
        .expect("run");

    assert!(report.cancelled);
    assert_eq!(report.rows_seen, 0);
    assert_eq!(orchestrator.state(), RunState::Done);
}

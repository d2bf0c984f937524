//! Integration tests for `LocalLineClient` using wiremock HTTP mocks.

use dff_localline::{
    build_package_update, build_price_list_entry, AccessToken, LocalLineClient, LocalLineError,
    ProductUpdate,
};
use rust_decimal::Decimal;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> LocalLineClient {
    LocalLineClient::with_base_url(base_url, 30, Some("https://deck-test.localline.ca"))
        .expect("client construction should not fail")
}

fn product_body() -> serde_json::Value {
    serde_json::json!({
        "id": 555,
        "name": "Whole Turkey",
        "vendor": {"id": 12},
        "packages": [{"id": 900, "name": "12-14 lb"}],
        "product_price_list_entries": [
            {"id": 7001, "price_list": 5332, "price_list_name": "test1"},
            {"id": 7002, "price_list": 4757, "price_list_name": "guest"}
        ]
    })
}

#[tokio::test]
async fn authenticate_returns_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_json(serde_json::json!({
            "username": "farm@example.com",
            "password": "hunter2"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"access": "tok-123", "refresh": "r"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let token = client
        .authenticate("farm@example.com", "hunter2")
        .await
        .expect("should authenticate");

    assert_eq!(token.as_str(), "tok-123");
}

#[tokio::test]
async fn authenticate_rejected_credentials_surface_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .authenticate("farm@example.com", "wrong")
        .await
        .expect_err("should fail");

    assert!(
        matches!(err, LocalLineError::UnexpectedStatus { status: 401, ref body, .. } if body == "bad credentials"),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn authenticate_without_access_field_is_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"detail": "?"})))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .authenticate("u", "p")
        .await
        .expect_err("should fail");

    assert!(matches!(err, LocalLineError::Deserialize { .. }));
}

#[tokio::test]
async fn get_product_sends_bearer_token_and_parses_product() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/555/"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_body()))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let product = client
        .get_product(&AccessToken::new("tok-123"), 555)
        .await
        .expect("should parse product");

    assert_eq!(product.id, Some(555));
    assert_eq!(product.name, "Whole Turkey");
    assert_eq!(product.first_package().map(|p| p.id), Some(900));
    assert_eq!(product.entry_for(4757).map(|e| e.id), Some(7002));
}

#[tokio::test]
async fn get_product_not_found_is_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/1/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client
        .get_product(&AccessToken::new("t"), 1)
        .await
        .expect_err("should fail");

    assert!(matches!(
        err,
        LocalLineError::UnexpectedStatus { status: 404, .. }
    ));
}

#[tokio::test]
async fn apply_package_update_patches_with_vendor_expand_and_origin() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/products/555/"))
        .and(query_param("expand", "vendor"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("referer", "https://deck-test.localline.ca"))
        .and(header("origin", "https://deck-test.localline.ca"))
        .and(body_partial_json(serde_json::json!({
            "packages": [{
                "id": 900,
                "unit_price": "6.50",
                "inventory_per_unit": 1,
                "price_list_entries": [{
                    "price_list": 4757,
                    "product_price_list_entry": 7002,
                    "calculated_value": 10.08
                }]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let token = AccessToken::new("tok-123");
    let product: dff_localline::RemoteProduct =
        serde_json::from_value(product_body()).expect("product");

    let basis = Decimal::new(650, 2);
    let entry = build_price_list_entry(basis, product.entry_for(4757), Decimal::new(55, 2))
        .expect("entry present");
    let package = product.first_package().expect("package present");
    let patch = build_package_update(package, basis, entry);

    client
        .apply_package_update(&token, 555, &patch)
        .await
        .expect("patch should succeed");
}

#[tokio::test]
async fn apply_package_update_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/products/555/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let product: dff_localline::RemoteProduct =
        serde_json::from_value(product_body()).expect("product");
    let entry = build_price_list_entry(Decimal::ONE, product.entry_for(5332), Decimal::ZERO)
        .expect("entry present");
    let patch = build_package_update(&product.packages[0], Decimal::ONE, entry);

    let err = client
        .apply_package_update(&AccessToken::new("t"), 555, &patch)
        .await
        .expect_err("should fail");

    match err {
        LocalLineError::UnexpectedStatus { status, url, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
            assert!(!url.contains("expand"), "query should be dropped: {url}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn update_product_sends_inventory_fields() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/products/321/"))
        .and(body_json(serde_json::json!({
            "visible": false,
            "track_inventory": true,
            "name": "Duck Eggs",
            "set_inventory": 4
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 321})))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let update = ProductUpdate::from_inventory(false, true, 4, None, Some("Duck Eggs"));
    client
        .update_product(&AccessToken::new("t"), 321, &update)
        .await
        .expect("update should succeed");
}

//! Integration tests for the auth, merchant and analytics endpoints

mod common;

use chrono::{TimeZone, Utc};
use common::{NoAuthorization, client_for, ok, store_with, token_pair, unauthorized};
use paydash_core::{Credentials, MemorySessionStore, Role, SessionStore};
use paydash_http::types::{AnalyticsScope, DateRange, ForecastModel, ForecastQuery, Metric};
use paydash_http::{ApiClient, ClientError};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn november() -> DateRange {
    DateRange::new(
        Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 11, 16, 0, 0, 0).unwrap(),
    )
    .unwrap()
}

fn merchant_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "Acme",
        "webhookUrl": "https://acme.example.com/hook",
        "balance": 120.5,
        "withdrawableBalance": 100.0,
        "secretKey": "sk_test",
        "createdAt": "2025-11-01T10:00:00.000Z"
    })
}

#[tokio::test]
async fn test_login_stores_pair_and_role() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/admin/login"))
        .and(body_json(json!({"username": "root", "password": "hunter2"})))
        .and(NoAuthorization)
        .respond_with(ok(token_pair("a1", "r1")))
        .expect(1)
        .mount(&mock_server)
        .await;

    // A leftover session must not leak into the login call
    let store = store_with("old", Some("old-refresh"), Role::Merchant);
    let client = client_for(&mock_server, store.clone());

    let pair = client.login(Role::Admin, "root", "hunter2").await.unwrap();
    assert_eq!(pair.access_token, "a1");

    let session = store.load().await.unwrap().unwrap();
    assert_eq!(session.credentials, Credentials::new("a1", "r1"));
    assert_eq!(session.role, Role::Admin);
}

#[tokio::test]
async fn test_failed_login_does_not_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ok(token_pair("a2", "r2")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let store = store_with("old", Some("old-refresh"), Role::Merchant);
    let client = client_for(&mock_server, store.clone());

    let result = client.login(Role::Merchant, "someone", "wrong").await;
    assert!(matches!(result, Err(ClientError::Unauthorized(_))));
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("old"));
}

#[tokio::test]
async fn test_register_stores_merchant_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .and(body_json(json!({"username": "shop", "password": "pw"})))
        .respond_with(ok(token_pair("a1", "r1")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    client.register("shop", "pw").await.unwrap();

    assert_eq!(client.session().role().await.unwrap(), Role::Merchant);
    assert_eq!(
        client.session().refresh_token().await.unwrap().as_deref(),
        Some("r1")
    );
}

#[tokio::test]
async fn test_session_endpoint_follows_role() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/session"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ok(json!({"id": "u-1", "username": "root"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Admin));
    let info = client.verify_session().await.unwrap().unwrap();
    assert_eq!(info.id, "u-1");
    assert_eq!(info.username, "root");
}

#[tokio::test]
async fn test_verify_session_clears_rejected_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(unauthorized())
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_with("a1", Some("r1"), Role::Merchant);
    let client = client_for(&mock_server, store.clone());

    assert!(client.verify_session().await.unwrap().is_none());
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_verify_session_without_token_skips_the_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/auth/session"))
        .respond_with(ok(json!({"id": "u-1", "username": "x"})))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = ApiClient::new(mock_server.uri()).unwrap();
    assert!(client.verify_session().await.unwrap().is_none());
}

#[tokio::test]
async fn test_explicit_refresh_and_logout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("authorization", "Bearer r1"))
        .respond_with(ok(token_pair("a2", "r2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = store_with("a1", Some("r1"), Role::Merchant);
    let client = client_for(&mock_server, store.clone());

    client.refresh_session().await.unwrap();
    assert_eq!(store.access_token().await.unwrap().as_deref(), Some("a2"));

    client.logout().await.unwrap();
    assert!(store.load().await.unwrap().is_none());

    assert!(matches!(
        client.refresh_session().await,
        Err(ClientError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_custom_refresh_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/token/refresh"))
        .respond_with(ok(token_pair("a2", "r2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store: Arc<MemorySessionStore> = store_with("a1", Some("r1"), Role::Merchant);
    let client = ApiClient::builder()
        .base_url(mock_server.uri())
        .refresh_path("/v2/token/refresh")
        .session_store(store)
        .build()
        .unwrap();

    client.refresh_session().await.unwrap();
}

#[tokio::test]
async fn test_list_merchants_pages() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchant"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "10"))
        .respond_with(ok(json!({
            "result": [merchant_json("m-1")],
            "pagination": {"total": 11, "page": 2}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Merchant));
    let page = client.list_merchants(2, 10).await.unwrap();

    assert_eq!(page.pagination.total, 11);
    assert_eq!(page.result[0].name, "Acme");
    assert_eq!(
        page.result[0].webhook_url.as_deref(),
        Some("https://acme.example.com/hook")
    );
}

#[tokio::test]
async fn test_get_and_create_merchant() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchant/m-1"))
        .respond_with(ok(merchant_json("m-1")))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/merchant"))
        .and(body_json(json!({"name": "Acme", "webhookUrl": null})))
        .respond_with(ok(merchant_json("m-2")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Merchant));

    let merchant = client.merchant("m-1").await.unwrap();
    assert_eq!(merchant.id, "m-1");
    assert!((merchant.balance - 120.5).abs() < f64::EPSILON);

    // Empty webhook is sent as null
    let created = client
        .create_merchant("Acme", Some(String::new()))
        .await
        .unwrap();
    assert_eq!(created.id, "m-2");
}

#[tokio::test]
async fn test_missing_merchant_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchant/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "statusCode": 404,
            "message": "Merchant not found"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Merchant));
    assert!(matches!(
        client.merchant("nope").await,
        Err(ClientError::NotFound(ref message)) if message == "Merchant not found"
    ));
}

#[tokio::test]
async fn test_merchant_id_stays_one_path_segment() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchant/..%2Fadmin%2Falerts"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "statusCode": 404,
            "message": "Merchant not found"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/alerts"))
        .respond_with(ok(json!(["should not be reached"])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Admin));
    assert!(matches!(
        client.merchant("../admin/alerts").await,
        Err(ClientError::NotFound(_))
    ));

    // Dot segments are rejected before sending
    assert!(matches!(
        client.merchant("..").await,
        Err(ClientError::BadRequest(_))
    ));
    let scope = AnalyticsScope::Merchant(".".into());
    assert!(matches!(
        client.kpi(&scope, Metric::Gmv, &november()).await,
        Err(ClientError::BadRequest(_))
    ));
}

#[tokio::test]
async fn test_kpi_and_chart_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/merchant/m-1/service-fee"))
        .and(query_param("startDate", "2025-11-01T00:00:00.000Z"))
        .and(query_param("endDate", "2025-11-16T00:00:00.000Z"))
        .respond_with(ok(json!(42.5)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/merchant/m-1/service-fee/chart"))
        .and(query_param("startDate", "2025-11-01T00:00:00.000Z"))
        .respond_with(ok(json!([
            {"date": "2025-11-01T00:00:00.000Z", "serviceFee": 10.0},
            {"date": "2025-11-02T00:00:00.000Z", "serviceFee": 32.5}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Merchant));
    let scope = AnalyticsScope::Merchant("m-1".into());

    let kpi = client
        .kpi(&scope, Metric::ServiceFee, &november())
        .await
        .unwrap();
    assert!((kpi - 42.5).abs() < f64::EPSILON);

    let points = client
        .chart(&scope, Metric::ServiceFee, &november())
        .await
        .unwrap();
    assert_eq!(points.len(), 2);
    assert!((points[1].value - 32.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_metric_series_with_forecast() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/gmv"))
        .respond_with(ok(json!(1000)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/gmv/chart"))
        .respond_with(ok(json!([{"date": "2025-11-01", "gmv": 1000}])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/gmv/forecast"))
        .and(query_param("model", "holt_winters"))
        .and(query_param("horizon", "14"))
        .respond_with(ok(json!([
            {"date": "2025-11-17", "gmv": 1100},
            {"date": "2025-11-18", "gmv": 1150}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Admin));
    let series = client
        .metric_series(
            &AnalyticsScope::Platform,
            Metric::Gmv,
            &november(),
            Some(ForecastQuery {
                model: ForecastModel::HoltWinters,
                horizon: 14,
            }),
        )
        .await
        .unwrap();

    assert_eq!(series.metric, "gmv");
    assert_eq!(series.points.len(), 1);
    assert_eq!(series.forecast.map(|f| f.len()), Some(2));
}

#[tokio::test]
async fn test_metric_series_survives_forecast_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/cr"))
        .respond_with(ok(json!(0.42)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/cr/chart"))
        .respond_with(ok(json!([{"date": "2025-11-01", "conversionRate": 0.42}])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/cr/forecast"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Admin));
    let series = client
        .metric_series(
            &AnalyticsScope::Platform,
            Metric::ConversionRate,
            &november(),
            Some(ForecastQuery::default()),
        )
        .await
        .unwrap();

    assert!(series.forecast.is_none());
    assert!((series.kpi - 0.42).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_unsupported_scope_is_rejected_locally() {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Admin));

    let result = client
        .kpi(&AnalyticsScope::Platform, Metric::AverageOrderValue, &november())
        .await;
    assert!(matches!(result, Err(ClientError::BadRequest(_))));

    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_alerts_and_slowest_transactions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin/alerts"))
        .respond_with(ok(json!(["GMV dropped 30% day over day"])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/admin/slowest-transactions"))
        .and(query_param("top", "5"))
        .and(query_param("endDate", "2025-11-16T00:00:00.000Z"))
        .respond_with(ok(json!([{
            "id": "t-1",
            "amount": 50.0,
            "serviceFee": 0.5,
            "hash": "0xabc",
            "confirmationTime": 812.0,
            "merchantId": "m-1",
            "createdAt": "2025-11-03T12:00:00.000Z"
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, store_with("a1", Some("r1"), Role::Admin));

    let alerts = client.alerts().await.unwrap();
    assert_eq!(alerts, vec!["GMV dropped 30% day over day".to_string()]);

    let slowest = client.slowest_transactions(&november(), 5).await.unwrap();
    assert_eq!(slowest[0].hash, "0xabc");
    assert_eq!(slowest[0].merchant_id, "m-1");
}

use super::*;
use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::error::ErrorCode;
use tokio::net::TcpListener;

#[tokio::test(start_paused = true)]
async fn mock_lists_fixed_catalog_after_latency() {
    let source = MockMenuSource::default();
    let started = tokio::time::Instant::now();

    let menus = source.list_menus().await.expect("menus");

    assert!(started.elapsed() >= MOCK_LIST_LATENCY);
    let names: Vec<_> = menus.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["espresso", "matcha latte", "vanilla latte"]);
}

#[tokio::test(start_paused = true)]
async fn mock_order_lists_items_and_issues_distinct_ids() {
    let source = MockMenuSource::default();
    let request = OrderRequest::new(["espresso", "vanilla latte"]);

    let first = source.submit_order(&request).await.expect("first order");
    let second = source.submit_order(&request).await.expect("second order");

    assert!(first.success);
    assert!(first.order_id.as_str().starts_with("ORD-"));
    assert_ne!(first.order_id, second.order_id);
    assert!(first.message.contains("espresso, vanilla latte"));
}

#[test]
fn order_ids_increase_within_the_same_millisecond() {
    let source = MockMenuSource::default();
    let ids: Vec<i64> = (0..50)
        .map(|_| {
            source
                .next_order_id()
                .as_str()
                .trim_start_matches("ORD-")
                .parse()
                .expect("numeric id")
        })
        .collect();
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn empty_order_is_rejected_before_any_latency() {
    let source = MockMenuSource::with_latency(Duration::ZERO, Duration::from_secs(3600));
    let err = source
        .submit_order(&OrderRequest::new(Vec::<String>::new()))
        .await
        .expect_err("empty order");
    assert!(err.is_validation());
}

#[test]
fn settings_toggle_selects_backend() {
    let live = ClientSettings {
        use_mock: false,
        api_base_url: "not a url".into(),
        ..ClientSettings::default()
    };
    assert!(matches!(
        menu_source_from_settings(&live),
        Err(ClientError::Config(_))
    ));
    assert!(menu_source_from_settings(&ClientSettings::default()).is_ok());
}

#[test]
fn endpoints_are_resolved_below_base_path() {
    let source = HttpMenuSource::new("http://127.0.0.1:9/api/v1", Duration::from_secs(1))
        .expect("source");
    assert_eq!(
        source.endpoint("menus").expect("url").as_str(),
        "http://127.0.0.1:9/api/v1/menus"
    );
}

async fn list_menus_handler() -> Json<Vec<MenuEntry>> {
    Json(vec![MenuEntry::new("10", "cold brew")])
}

async fn submit_order_handler(Json(request): Json<OrderRequest>) -> impl IntoResponse {
    if request.items.iter().any(|item| item == "sold out") {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::to_value(ApiError::new(ErrorCode::Validation, "sold out today")).unwrap()),
        );
    }
    if request.items.iter().any(|item| item == "declined") {
        return (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": false,
                "orderId": "",
                "message": "payment declined",
            })),
        );
    }
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "success": true,
            "orderId": "ORD-42",
            "message": order_confirmation(&request.items),
        })),
    )
}

/// Binds an ephemeral loopback port that reqwest reaches without a proxy.
async fn bind_loopback() -> TcpListener {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    TcpListener::bind("127.0.0.1:0").await.expect("bind")
}

async fn spawn_menu_server() -> (String, tokio::task::JoinHandle<()>) {
    let listener = bind_loopback().await;
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/menus", get(list_menus_handler))
        .route("/orders", post(submit_order_handler));
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn live_source_reads_menus_and_submits_orders() {
    let (server_url, _server) = spawn_menu_server().await;
    let source = HttpMenuSource::new(&server_url, Duration::from_secs(5)).expect("source");

    let menus = source.list_menus().await.expect("menus");
    assert_eq!(menus, vec![MenuEntry::new("10", "cold brew")]);

    let result = source
        .submit_order(&OrderRequest::new(["cold brew"]))
        .await
        .expect("order");
    assert_eq!(result.order_id.as_str(), "ORD-42");
    assert!(result.message.contains("cold brew"));
}

#[tokio::test]
async fn live_source_surfaces_api_error_message() {
    let (server_url, _server) = spawn_menu_server().await;
    let source = HttpMenuSource::new(&server_url, Duration::from_secs(5)).expect("source");

    let err = source
        .submit_order(&OrderRequest::new(["sold out"]))
        .await
        .expect_err("conflict");
    assert_eq!(err, ClientError::Submit("sold out today".into()));

    let err = source
        .submit_order(&OrderRequest::new(["declined"]))
        .await
        .expect_err("declined");
    assert_eq!(err, ClientError::Submit("payment declined".into()));
}

#[tokio::test]
async fn live_source_maps_transport_failure_to_fetch_error() {
    let listener = bind_loopback().await;
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let source =
        HttpMenuSource::new(&format!("http://{addr}"), Duration::from_secs(5)).expect("source");
    let err = source.list_menus().await.expect_err("connection refused");
    assert!(matches!(err, ClientError::Fetch(_)));
}

#[tokio::test]
async fn live_source_reports_status_for_unstructured_errors() {
    let listener = bind_loopback().await;
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/menus",
        get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let source =
        HttpMenuSource::new(&format!("http://{addr}"), Duration::from_secs(5)).expect("source");
    let err = source.list_menus().await.expect_err("503");
    assert_eq!(
        err.to_string(),
        "request failed with status 503 Service Unavailable"
    );
}

//! HTTP remote source and reachability probe against a local axum fixture.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

use storefront_sync::{
    ConnectivityOracle, HttpProbeConnectivity, HttpProductSource, RemoteProductSource, SyncError,
};

const CATALOG: [(i64, &str); 4] = [
    (1, "Red Shoe"),
    (2, "Blue Hat"),
    (3, "Redwood Table"),
    (4, "Green Scarf"),
];

fn window(params: &HashMap<String, String>, titles: Vec<(i64, &str)>) -> Value {
    let limit: usize = params.get("limit").and_then(|v| v.parse().ok()).unwrap_or(30);
    let skip: usize = params.get("skip").and_then(|v| v.parse().ok()).unwrap_or(0);
    let total = titles.len();

    let products: Vec<Value> = titles
        .into_iter()
        .skip(skip)
        .take(limit)
        .map(|(id, title)| {
            json!({
                "id": id,
                "title": title,
                "price": 9.99,
                "thumbnail": format!("https://cdn.example.com/{id}.jpg"),
                "rating": 4.5
            })
        })
        .collect();

    json!({ "products": products, "total": total, "skip": skip, "limit": limit })
}

async fn browse(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    Json(window(&params, CATALOG.to_vec()))
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default().to_lowercase();
    let hits = CATALOG
        .iter()
        .copied()
        .filter(|(_, title)| title.to_lowercase().contains(&q))
        .collect();
    Json(window(&params, hits))
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn catalog_router() -> Router {
    Router::new()
        .route("/products", get(browse))
        .route("/products/search", get(search))
}

fn source(base: &str) -> HttpProductSource {
    HttpProductSource::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_browse_page() {
    let base = serve(catalog_router()).await;

    let page = source(&base).fetch_page(None, 1, 2).await.unwrap();

    assert_eq!(page.total, 4);
    let ids: Vec<i64> = page.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(page.items[0].price.cents(), 999);
    assert_eq!(page.items[0].description, "");
}

#[tokio::test]
async fn test_search_page() {
    let base = serve(catalog_router()).await;

    let page = source(&base).fetch_page(Some("red"), 0, 20).await.unwrap();

    assert_eq!(page.total, 2);
    let titles: Vec<&str> = page.items.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Red Shoe", "Redwood Table"]);
}

#[tokio::test]
async fn test_server_error_is_network_error() {
    let router = Router::new().route(
        "/products",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base = serve(router).await;

    let result = source(&base).fetch_page(None, 0, 20).await;
    assert!(matches!(result, Err(SyncError::Network(_))));
}

#[tokio::test]
async fn test_unexpected_body_is_decode_error() {
    let router = Router::new().route(
        "/products",
        get(|| async { Json(json!({ "items": [], "count": 0 })) }),
    );
    let base = serve(router).await;

    let result = source(&base).fetch_page(None, 0, 20).await;
    assert!(matches!(result, Err(SyncError::Decode(_))));
}

#[tokio::test]
async fn test_non_json_body_is_decode_error() {
    let router = Router::new().route("/products", get(|| async { "<html>maintenance</html>" }));
    let base = serve(router).await;

    let result = source(&base).fetch_page(None, 0, 20).await;
    assert!(matches!(result, Err(SyncError::Decode(_))));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = source(&format!("http://127.0.0.1:{port}"))
        .fetch_page(None, 0, 20)
        .await;
    assert!(matches!(result, Err(SyncError::Network(_))));
}

#[tokio::test]
async fn test_probe_reports_reachable_fixture() {
    let base = serve(catalog_router()).await;
    let oracle = HttpProbeConnectivity::new(base, Duration::from_secs(2)).unwrap();

    // Any HTTP answer counts, even 404/405 for HEAD on the root
    assert!(oracle.is_online().await);
}

//! Integration test: Server API endpoints

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use visualdata::render::MemoryArtifactStore;
use visualdata::server::{create_router, AppState, ServerConfig};

const BOUNDARY: &str = "visualdata-test-boundary";

fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        project_root: root.to_path_buf(),
        storage_dir: root.join("storage"),
        public_url: "http://test.local".to_string(),
        max_upload_size: 10 * 1024 * 1024,
    }
}

fn test_app(root: &Path) -> axum::Router {
    let config = test_config(root);
    let state = Arc::new(AppState::new(config.clone()));
    create_router(state, &config)
}

fn test_app_with_memory_store(root: &Path, store: Arc<MemoryArtifactStore>) -> axum::Router {
    let config = test_config(root);
    let state = Arc::new(AppState::new(config.clone()).with_store(store));
    create_router(state, &config)
}

fn points_csv(rows: usize) -> String {
    let mut csv = String::from("a,b,c,d,kind\n");
    for i in 0..rows {
        let x = i as f64;
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            x,
            (x * 0.7).sin() * 10.0,
            (i * 7 % 11) as f64,
            x * x / 50.0,
            if i % 3 == 0 { "red" } else { "blue" }
        ));
    }
    csv
}

/// Build a multipart/form-data request. `file` is `(file_name, content)`.
fn multipart_request(uri: &str, file: Option<(&str, &str)>, fields: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    if let Some((file_name, content)) = file {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/csv\r\n\r\n{}\r\n",
            BOUNDARY, file_name, content
        ));
    }
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health_endpoint() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        test_app(tmp.path()),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_index_lists_endpoints() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        test_app(tmp.path()),
        Request::builder().uri("/").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["endpoints"].as_array().unwrap().len() >= 7);
}

#[tokio::test]
async fn test_unknown_route_returns_json_404() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        test_app(tmp.path()),
        Request::builder().uri("/nope").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], true);
}

#[tokio::test]
async fn test_describe_upload() {
    let tmp = tempfile::tempdir().unwrap();
    let request = multipart_request("/data/describe", Some(("points.csv", &points_csv(20))), &[]);
    let (status, body) = send(test_app(tmp.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["type"], "table");
    assert_eq!(body["summary"]["rows"], 20);
    assert_eq!(body["statistics"].as_array().unwrap().len(), 5);
    assert_eq!(body["statistics"][0]["kind"], "numeric");
}

#[tokio::test]
async fn test_describe_without_file_is_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let request = multipart_request("/data/describe", None, &[("method", "pca")]);
    let (status, body) = send(test_app(tmp.path()), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "bad_request");
}

#[tokio::test]
async fn test_describe_source_denies_traversal() {
    let tmp = tempfile::tempdir().unwrap();
    let request = json_request("/data/describe-remote", serde_json::json!({ "source": "../../etc/passwd" }));
    let (status, body) = send(test_app(tmp.path()), request).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "access_denied");
}

#[tokio::test]
async fn test_describe_source_reads_project_file() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("local.csv"), "x;y\n1;2\n3;4\n").unwrap();
    let request = json_request("/data/describe-remote", serde_json::json!({ "source": "local.csv" }));
    let (status, body) = send(test_app(tmp.path()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["columns"], 2);
}

#[tokio::test]
async fn test_clean_with_policy() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = "a,b\n1,2\n1,2\n,3\n4,5\n";
    let request = multipart_request(
        "/data/clean",
        Some(("dirty.csv", csv)),
        &[("params", r#"{"drop_missing": true, "drop_duplicates": true}"#)],
    );
    let (status, body) = send(test_app(tmp.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["duplicates_removed"], 1);
    assert_eq!(body["report"]["missing_rows_removed"], 1);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
    assert_eq!(body["records"][1]["a"], 4);
}

#[tokio::test]
async fn test_export_conflict_and_containment() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = points_csv(5);
    let params = r#"{"db_path": "out.db", "table": "points"}"#;

    let (status, body) = send(
        test_app(tmp.path()),
        multipart_request("/data/export", Some(("p.csv", &csv)), &[("params", params)]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows_written"], 5);
    assert!(tmp.path().join("out.db").exists());

    let (status, body) = send(
        test_app(tmp.path()),
        multipart_request("/data/export", Some(("p.csv", &csv)), &[("params", params)]),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "export_conflict");

    let outside = r#"{"db_path": "../escape.db", "table": "points"}"#;
    let (status, _) = send(
        test_app(tmp.path()),
        multipart_request("/data/export", Some(("p.csv", &csv)), &[("params", outside)]),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reduce_2d_stores_servable_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let request = multipart_request(
        "/reduce/2d",
        Some(("points.csv", &points_csv(40))),
        &[("method", "pca"), ("params", r#"{"label_column": "kind", "title": "Points"}"#)],
    );
    let (status, body) = send(test_app(tmp.path()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["method"], "linear");
    assert_eq!(body["result"]["rows"], 40);
    assert!(body["html"].as_str().unwrap().contains("Points (PCA 2D)"));

    let locator = body["locator"].as_str().unwrap();
    let path = locator.strip_prefix("http://test.local").unwrap();
    assert!(path.starts_with("/static/renders/render_"));

    let response = test_app(tmp.path())
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reduce_3d_auto_on_small_upload() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryArtifactStore::new());
    let request = multipart_request("/reduce/3d", Some(("points.csv", &points_csv(20))), &[]);
    let (status, body) = send(test_app_with_memory_store(tmp.path(), store.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["method"], "linear");
    assert_eq!(body["result"]["coordinate_columns"], serde_json::json!(["PC_1", "PC_2", "PC_3"]));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_reduce_missing_label_stores_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryArtifactStore::new());
    let request = multipart_request(
        "/reduce/2d",
        Some(("points.csv", &points_csv(30))),
        &[("method", "linear"), ("params", r#"{"label_column": "color"}"#)],
    );
    let (status, body) = send(test_app_with_memory_store(tmp.path(), store.clone()), request).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "label_column_not_found");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_reduce_rejects_bad_method_and_perplexity() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = points_csv(10);

    let (status, _) = send(
        test_app(tmp.path()),
        multipart_request("/reduce/2d", Some(("p.csv", &csv)), &[("method", "isomap")]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        test_app(tmp.path()),
        multipart_request(
            "/reduce/2d",
            Some(("p.csv", &csv)),
            &[("method", "tsne"), ("params", r#"{"perplexity": 10}"#)],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_hyperparameter");
}

#[tokio::test]
async fn test_reduce_rejects_unsupported_upload() {
    let tmp = tempfile::tempdir().unwrap();
    let (status, body) = send(
        test_app(tmp.path()),
        multipart_request("/reduce/2d", Some(("data.parquet", "PAR1")), &[]),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "unsupported_format");
}

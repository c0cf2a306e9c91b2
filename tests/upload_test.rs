use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use rust_file_uploader::config::UploadConfig;
use rust_file_uploader::infrastructure::storage::setup_storage;
use rust_file_uploader::{AppState, create_app};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "---------------------------123456789012345678901234567";

struct TestApp {
    _root: TempDir,
    config: UploadConfig,
    app: Router,
}

async fn setup_app() -> TestApp {
    let _ = tracing_subscriber::fmt::try_init();
    let root = tempfile::tempdir().unwrap();
    let config = UploadConfig {
        temp_path: root.path().join("data/temp"),
        files_path: root.path().join("data/files"),
        ..UploadConfig::default()
    };
    let storage = setup_storage(&config).await.unwrap();
    let app = create_app(AppState::new(config.clone(), storage));

    TestApp {
        _root: root,
        config,
        app,
    }
}

/// Unprovisioned roots, to observe that nothing gets created
fn setup_bare_app() -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let config = UploadConfig {
        temp_path: root.path().join("data/temp"),
        files_path: root.path().join("data/files"),
        ..UploadConfig::default()
    };
    let storage = std::sync::Arc::new(
        rust_file_uploader::services::storage::LocalStorageService::new(
            config.temp_path.clone(),
            config.files_path.clone(),
        ),
    );
    let app = create_app(AppState::new(config.clone(), storage));

    TestApp {
        _root: root,
        config,
        app,
    }
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(Option<&'a str>, &'a [u8]),
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(filename, data) => {
                let disposition = match filename {
                    Some(f) => format!("form-data; name=\"file\"; filename=\"{f}\""),
                    None => "form-data; name=\"file\"".to_string(),
                };
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: {disposition}\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_upload(app: &Router, parts: &[Part<'_>]) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_upload_report_csv() {
    let test = setup_app().await;

    let (status, json) = post_upload(
        &test.app,
        &[Part::File(Some("report.csv"), b"a,b\n1,2\n")],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({ "message": "File uploaded" }));
    assert_eq!(
        std::fs::read(test.config.files_path.join("report.csv")).unwrap(),
        b"a,b\n1,2\n"
    );
    assert!(!test.config.temp_path.join("report.csv~").exists());
}

#[tokio::test]
async fn test_committed_file_is_served() {
    let test = setup_app().await;
    let payload = b"\x00\x01binary\xffpayload";

    let (status, _) = post_upload(
        &test.app,
        &[
            Part::Text("total_size", &payload.len().to_string()),
            Part::File(Some("blob.bin"), payload),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/data/files/blob.bin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], payload);
}

#[tokio::test]
async fn test_empty_file_round_trips() {
    let test = setup_app().await;

    let (status, _) = post_upload(
        &test.app,
        &[
            Part::Text("total_size", "0"),
            Part::File(Some("empty.txt"), b""),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let meta = std::fs::metadata(test.config.files_path.join("empty.txt")).unwrap();
    assert_eq!(meta.len(), 0);
}

#[tokio::test]
async fn test_size_mismatch_keeps_staging_file() {
    let test = setup_app().await;
    let data = [b'x'; 50];

    let (status, json) = post_upload(
        &test.app,
        &[
            Part::Text("total_size", "100"),
            Part::File(Some("partial.log"), &data),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        json["message"]
            .as_str()
            .unwrap()
            .contains("different sizes")
    );
    assert_eq!(
        std::fs::read(test.config.temp_path.join("partial.log~")).unwrap(),
        data
    );
    assert!(!test.config.files_path.join("partial.log").exists());
}

#[tokio::test]
async fn test_missing_file_field_touches_nothing() {
    let test = setup_bare_app();

    let (status, json) = post_upload(&test.app, &[Part::Text("comment", "hello")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "It seems that the uploaded file is empty");
    assert!(!test.config.temp_path.exists());
    assert!(!test.config.files_path.exists());
}

#[tokio::test]
async fn test_file_part_without_filename() {
    let test = setup_bare_app();

    let (status, json) = post_upload(&test.app, &[Part::File(None, b"orphan bytes")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["message"], "No file was uploaded");
    assert!(!test.config.temp_path.exists());
}

#[tokio::test]
async fn test_traversal_filename_rejected() {
    let test = setup_app().await;

    let (status, _) = post_upload(&test.app, &[Part::File(Some("../escape.txt"), b"data")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!test.config.temp_path.parent().unwrap().join("escape.txt").exists());
    assert!(std::fs::read_dir(&test.config.temp_path).unwrap().next().is_none());
}

#[tokio::test]
async fn test_overlong_filename_is_client_error() {
    let test = setup_app().await;
    let name = "a".repeat(255);

    let (status, json) = post_upload(&test.app, &[Part::File(Some(&name), b"data")]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("maximum is 254"));
    assert!(std::fs::read_dir(&test.config.temp_path).unwrap().next().is_none());

    let name = "a".repeat(254);
    let (status, _) = post_upload(&test.app, &[Part::File(Some(&name), b"data")]).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(std::fs::read(test.config.files_path.join(&name)).unwrap(), b"data");
}

#[tokio::test]
async fn test_invalid_total_size_rejected() {
    let test = setup_app().await;

    let (status, _) = post_upload(
        &test.app,
        &[
            Part::Text("total_size", "lots"),
            Part::File(Some("file.txt"), b"data"),
        ],
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!test.config.files_path.join("file.txt").exists());
}

#[tokio::test]
async fn test_other_methods_not_allowed() {
    let test = setup_app().await;

    for method in ["GET", "PUT", "DELETE"] {
        let response = test
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/upload")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        assert_eq!(response.headers()[header::ALLOW], "POST");
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains("POST"));
    }
}

#[tokio::test]
async fn test_health_reports_storage() {
    let test = setup_app().await;

    let response = test
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["storage"], "available");
}

//! File view and download integration tests.
//!
//! Tests verify:
//! - Content types per extension
//! - Inline vs attachment disposition headers
//! - Error codes for bad tokens, bad types, and missing files
//! - Traversal attempts are rejected with 403

use axum::http::StatusCode;
use base64::Engine as _;

use routine_portal::codec::encode_path;

use super::test_utils::{
    body_bytes, body_json, decode_payload, get, segment, TestStorage, PDF_BYTES, PNG_BYTES,
    TEST_KEY,
};

fn view_uri(kind: &str, path: &str) -> String {
    format!("/api/view/{}/{}", kind, segment(&encode_path(path)))
}

fn download_uri(kind: &str, path: &str) -> String {
    format!("/api/download/{}/{}", kind, segment(&encode_path(path)))
}

// =============================================================================
// Content Types
// =============================================================================

#[tokio::test]
async fn test_content_types_by_extension() {
    let storage = TestStorage::new()
        .with_file("r/a.png", PNG_BYTES)
        .with_file("r/b.jpg", b"jpg")
        .with_file("r/c.jpeg", b"jpeg")
        .with_file("r/d.pdf", PDF_BYTES)
        .with_file("r/e.PNG", PNG_BYTES)
        .with_file("r/f.webp", b"webp")
        .with_file("r/noext", b"raw");
    let router = storage.router();

    let cases = [
        ("r/a.png", "image/png"),
        ("r/b.jpg", "image/jpeg"),
        ("r/c.jpeg", "image/jpeg"),
        ("r/d.pdf", "application/pdf"),
        ("r/e.PNG", "image/png"),
        ("r/f.webp", "application/octet-stream"),
        ("r/noext", "application/octet-stream"),
    ];

    for (path, expected) in cases {
        let response = get(&router, &view_uri("image", path), None).await;
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            expected,
            "{}",
            path
        );
    }
}

// =============================================================================
// View vs Download
// =============================================================================

#[tokio::test]
async fn test_view_streams_inline() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, &view_uri("image", "cse/49/a.png"), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "image/png");
    assert_eq!(
        headers.get("content-length").unwrap(),
        &PNG_BYTES.len().to_string()
    );
    assert!(headers.get("content-disposition").is_none());

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), PNG_BYTES);
}

#[tokio::test]
async fn test_download_sets_attachment() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, &download_uri("pdf", "cse/49/a.pdf"), Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers.get("content-type").unwrap(), "application/pdf");
    assert_eq!(
        headers.get("content-disposition").unwrap(),
        "attachment; filename=\"a.pdf\""
    );

    let body = body_bytes(response).await;
    assert_eq!(body.as_ref(), PDF_BYTES);
}

#[tokio::test]
async fn test_download_non_ascii_name() {
    let storage = TestStorage::new().with_file("bn/রুটিন.pdf", PDF_BYTES);
    let router = storage.router();

    let response = get(&router, &download_uri("pdf", "bn/রুটিন.pdf"), Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename=\""));
    assert!(disposition.contains("filename*=UTF-8''"));
}

#[tokio::test]
async fn test_large_file_streams_completely() {
    let data: Vec<u8> = (0..(512 * 1024)).map(|i| (i % 251) as u8).collect();
    let storage = TestStorage::new().with_file("big/scan.pdf", &data);
    let router = storage.router();

    let response = get(&router, &download_uri("pdf", "big/scan.pdf"), Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-length").unwrap(),
        &data.len().to_string()
    );

    let body = body_bytes(response).await;
    assert_eq!(body.len(), data.len());
    assert_eq!(body.as_ref(), data.as_slice());
}

#[tokio::test]
async fn test_standard_alphabet_token_accepted() {
    // "a>?b~~.png" encodes to a standard token containing '/' and '+'
    let storage = TestStorage::new().with_file("a>?b~~.png", PNG_BYTES);
    let router = storage.router();

    let token = base64::engine::general_purpose::STANDARD.encode("a>?b~~.png");
    assert!(token.contains('/'));

    let response = get(&router, &format!("/api/view/image/{}", segment(&token)), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_listing_token_used_verbatim_in_url() {
    let storage = TestStorage::new()
        .with_file("routine_images/রুটিন.png", PNG_BYTES)
        .with_file("routine_pages/রুটিন.pdf", PDF_BYTES)
        .with_catalog(
            r#"[{"program": "CSE", "intake": "49", "section": "A",
                 "image": "routine_images/রুটিন.png", "pdf": "routine_pages/রুটিন.pdf"}]"#,
        );
    let router = storage.router();

    let records = decode_payload(get(&router, "/api/routines/db", Some(TEST_KEY)).await).await;
    let image = records[0]["image"].as_str().unwrap();
    let pdf = records[0]["pdf"].as_str().unwrap();

    let response = get(&router, &format!("/api/view/image/{}", image), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await.as_ref(), PNG_BYTES);

    let response = get(&router, &format!("/api/download/pdf/{}", pdf), Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Client Errors
// =============================================================================

#[tokio::test]
async fn test_invalid_token() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, "/api/view/image/%25%25%25", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_reference");

    let response = get(&router, "/api/download/pdf/!!!", Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_utf8_token_segment() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    for (uri, key) in [
        ("/api/view/image/%FF", None),
        ("/api/download/pdf/%FF%FE", Some(TEST_KEY)),
    ] {
        let response = get(&router, uri, key).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let error = body_json(response).await;
        assert_eq!(error["error"], "invalid_reference");
        assert_eq!(error["status"], 400);
    }
}

#[tokio::test]
async fn test_invalid_type() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, &view_uri("video", "cse/49/a.png"), None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = body_json(response).await;
    assert_eq!(error["error"], "invalid_type");
    assert!(error["message"].as_str().unwrap().contains("video"));
}

#[tokio::test]
async fn test_missing_file() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, &view_uri("image", "cse/49/zzz.png"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let error = body_json(response).await;
    assert_eq!(error["error"], "not_found");
    // The decoded path is not echoed back
    assert!(!error["message"].as_str().unwrap().contains("zzz"));
}

#[tokio::test]
async fn test_directory_is_not_served() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, &view_uri("image", "cse/49"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Traversal
// =============================================================================

#[tokio::test]
async fn test_traversal_to_existing_file_denied() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    // tmp/outside.txt exists two levels above the root
    let response = get(&router, &view_uri("image", "../../outside.txt"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "access_denied");

    let response = get(
        &router,
        &download_uri("pdf", "../../outside.txt"),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_traversal_via_inner_segments_denied() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(
        &router,
        &view_uri("image", "cse/49/../../../../outside.txt"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_absolute_path_denied() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let outside = storage.base().join("outside.txt");
    let response = get(&router, &view_uri("image", outside.to_str().unwrap()), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_dot_segments_inside_root_allowed() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(&router, &view_uri("image", "./cse/../cse/49/a.png"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
}

#[cfg(unix)]
#[tokio::test]
async fn test_symlink_out_of_root_denied() {
    let storage = TestStorage::with_sample();
    std::os::unix::fs::symlink(
        storage.base().join("outside.txt"),
        storage.root().join("cse/49/escape.png"),
    )
    .unwrap();
    let router = storage.router();

    let response = get(&router, &view_uri("image", "cse/49/escape.png"), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

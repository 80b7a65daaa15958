//! End-to-end client flow.
//!
//! A single-record catalog is listed, its tokens are taken from the decoded
//! payload, and the file routes are exercised with those tokens exactly as the
//! web client would.

use axum::http::StatusCode;

use routine_portal::catalog::Catalog;
use routine_portal::codec::{decode_token, encode_path};
use routine_portal::FileCatalogSource;

use super::test_utils::{body_bytes, decode_payload, get, segment, TestStorage, PNG_BYTES, TEST_KEY};

#[tokio::test]
async fn test_full_client_flow() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    // 1. List the catalog
    let response = get(&router, "/api/routines/db", Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let records = decode_payload(response).await;
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["program"], "CSE");
    assert_eq!(record["intake"], "49");
    assert_eq!(record["section"], "A");

    let image_token = record["image"].as_str().unwrap().to_string();
    let pdf_token = record["pdf"].as_str().unwrap().to_string();
    assert_eq!(decode_token(&image_token).unwrap(), "cse/49/a.png");
    assert_eq!(decode_token(&pdf_token).unwrap(), "cse/49/a.pdf");

    // 2. View the image without a key
    let response = get(
        &router,
        &format!("/api/view/image/{}", segment(&image_token)),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert!(response.headers().get("content-disposition").is_none());
    assert_eq!(body_bytes(response).await.as_ref(), PNG_BYTES);

    // 3. Download with the key
    let download_uri = format!("/api/download/image/{}", segment(&image_token));
    let response = get(&router, &download_uri, Some(TEST_KEY)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"a.png\""
    );

    // 4. Download without or with a wrong key
    assert_eq!(
        get(&router, &download_uri, None).await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        get(&router, &download_uri, Some("guess")).await.status(),
        StatusCode::FORBIDDEN
    );

    // 5. Traversal token, regardless of key
    let evil = segment(&encode_path("../../etc/passwd"));
    for (uri, key) in [
        (format!("/api/view/image/{}", evil), None),
        (format!("/api/view/pdf/{}", evil), Some(TEST_KEY)),
        (format!("/api/download/pdf/{}", evil), Some(TEST_KEY)),
    ] {
        assert_eq!(
            get(&router, &uri, key).await.status(),
            StatusCode::FORBIDDEN,
            "{}",
            uri
        );
    }
}

#[tokio::test]
async fn test_lookup_then_download_pdf() {
    let storage = TestStorage::with_sample();
    let router = storage.router();

    let response = get(
        &router,
        "/api/routines/lookup?program=CSE&intake=49&section=A",
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let record: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    let pdf_token = record["pdf"].as_str().unwrap();

    let response = get(
        &router,
        &format!("/api/download/pdf/{}", segment(pdf_token)),
        Some(TEST_KEY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-disposition").unwrap(),
        "attachment; filename=\"a.pdf\""
    );
}

#[tokio::test]
async fn test_audit_reports_broken_references() {
    let storage = TestStorage::new()
        .with_file("ok/a.png", PNG_BYTES)
        .with_file("ok/a.pdf", b"%PDF")
        .with_catalog(
            r#"[
                {"program": "CSE", "intake": "49", "section": "A",
                 "image": "ok/a.png", "pdf": "ok/a.pdf"},
                {"program": "CSE", "intake": "49", "section": "B",
                 "image": "missing/b.png", "pdf": "../../outside.txt"}
            ]"#,
        );

    let catalog = Catalog::load(&FileCatalogSource::new(storage.catalog_path()))
        .await
        .unwrap();
    let issues = catalog.audit(&storage.store()).await;

    assert_eq!(issues.len(), 2);
    assert!(issues.iter().all(|i| i.index == 1));
    assert_eq!(issues[0].path, "missing/b.png");
    assert!(issues[0].to_string().contains("File not found"));
    assert_eq!(issues[1].path, "../../outside.txt");
    assert!(issues[1].to_string().contains("Access denied"));
}

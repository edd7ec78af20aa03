//! Router tests for the item JSON API.
//!
//! Drives the fully assembled application, middleware included, over
//! in-memory stores.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use stockroom_api::serve;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use test_support::{bare_request, json_request, TestApp};

#[tokio::test]
async fn test_inventory_scenario() {
    let app = TestApp::new();
    let token = app.access_token().await;
    let token = Some(token.as_str());

    let (status, created) = app
        .send_json(json_request(
            "POST",
            "/api/items/",
            token,
            json!({
                "name": "Sample Item",
                "description": "This is a sample item.",
                "quantity": 5,
                "price": 9999
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().expect("numeric id");
    let item_uri = format!("/api/items/{}/", id);

    let (status, list) = app.send_json(bare_request("GET", "/api/items/", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, item) = app.send_json(bare_request("GET", &item_uri, token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["name"], "Sample Item");

    let (status, updated) = app
        .send_json(json_request(
            "PUT",
            &item_uri,
            token,
            json!({
                "name": "Sample Item",
                "description": "This is a sample item.",
                "quantity": 7,
                "price": 9999
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["quantity"], 7);

    let (_, item) = app.send_json(bare_request("GET", &item_uri, token)).await;
    assert_eq!(item["quantity"], 7);

    let (status, body) = app.send_json(bare_request("DELETE", &item_uri, token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (_, list) = app.send_json(bare_request("GET", "/api/items/", token)).await;
    assert_eq!(list, json!([]));

    let (status, body) = app.send_json(bare_request("GET", &item_uri, token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "ENTITY_NOT_FOUND");
}

#[tokio::test]
async fn test_create_applies_defaults() {
    let app = TestApp::new();
    let token = app.access_token().await;

    let (status, item) = app
        .send_json(json_request("POST", "/api/items/", Some(&token), json!({ "name": "Washer" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["description"], "");
    assert_eq!(item["quantity"], 0);
    assert_eq!(item["price"], 0);
    assert!(item["created_at"].is_string());
}

#[tokio::test]
async fn test_duplicate_name_is_conflict() {
    let app = TestApp::new();
    let token = app.access_token().await;
    let body = json!({ "name": "Bolt", "quantity": 3 });

    let (status, _) = app
        .send_json(json_request("POST", "/api/items/", Some(&token), body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, err) = app
        .send_json(json_request(
            "POST",
            "/api/items/",
            Some(&token),
            json!({ "name": "Bolt", "quantity": 99 }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "ENTITY_ALREADY_EXISTS");

    // The original record is untouched.
    let (_, list) = app.send_json(bare_request("GET", "/api/items/", Some(&token))).await;
    assert_eq!(list.as_array().map(Vec::len), Some(1));
    assert_eq!(list[0]["quantity"], 3);
}

#[tokio::test]
async fn test_padded_duplicate_name_is_conflict() {
    let app = TestApp::new();
    let token = app.access_token().await;

    let (status, created) = app
        .send_json(json_request("POST", "/api/items/", Some(&token), json!({ "name": "  Bolt  " })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Bolt");

    let (status, err) = app
        .send_json(json_request("POST", "/api/items/", Some(&token), json!({ "name": "Bolt\t" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "ENTITY_ALREADY_EXISTS");
}

#[tokio::test]
async fn test_rename_onto_existing_name_is_conflict() {
    let app = TestApp::new();
    let token = app.access_token().await;

    for name in ["Nut", "Screw"] {
        app.send_json(json_request("POST", "/api/items/", Some(&token), json!({ "name": name })))
            .await;
    }
    let (_, list) = app.send_json(bare_request("GET", "/api/items/", Some(&token))).await;
    let screw_id = list
        .as_array()
        .and_then(|items| items.iter().find(|i| i["name"] == "Screw"))
        .and_then(|i| i["id"].as_i64())
        .expect("screw exists");

    let (status, _) = app
        .send_json(json_request(
            "PUT",
            &format!("/api/items/{}/", screw_id),
            Some(&token),
            json!({ "name": "Nut" }),
        ))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_validation_failures() {
    let app = TestApp::new();
    let token = app.access_token().await;

    let cases = [
        json!({ "name": "" }),
        json!({ "name": "   " }),
        json!({ "name": "Gear", "quantity": -1 }),
        json!({ "name": "Gear", "price": -5 }),
        json!({ "quantity": 2 }),
        json!({ "name": "Gear", "quantity": "many" }),
    ];
    for body in cases {
        let (status, err) = app
            .send_json(json_request("POST", "/api/items/", Some(&token), body.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {}", body);
        assert!(err["code"].is_string());
    }

    let (_, list) = app.send_json(bare_request("GET", "/api/items/", Some(&token))).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_malformed_json_and_path_ids() {
    let app = TestApp::new();
    let token = app.access_token().await;

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/items/")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", token))
        .body(axum::body::Body::from("{not json"))
        .expect("valid request");
    let (status, err) = app.send_json(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_FAILED");

    let (status, err) = app
        .send_json(bare_request("GET", "/api/items/abc/", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["details"]["field"], "id");
}

#[tokio::test]
async fn test_missing_items_are_not_found() {
    let app = TestApp::new();
    let token = app.access_token().await;

    for method in ["GET", "DELETE"] {
        let (status, _) = app
            .send_json(bare_request(method, "/api/items/404/", Some(&token)))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", method);
    }

    let (status, _) = app
        .send_json(json_request(
            "PUT",
            "/api/items/404/",
            Some(&token),
            json!({ "name": "Ghost" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_root_and_openapi_are_public() {
    let app = TestApp::new();

    let (status, root) = app.send_json(bare_request("GET", "/api/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["message"], "Welcome to the Inventory Management API!");
    assert_eq!(root["endpoints"]["items"], "/api/items/");

    let (status, doc) = app.send_json(bare_request("GET", "/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/items/"].is_object());
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let app = TestApp::new();

    let (status, ready) = app.send_json(bare_request("GET", "/health/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ready["status"], "healthy");

    let response = app.send(bare_request("GET", "/metrics", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_server_stops_cleanly_on_shutdown() {
    let app = TestApp::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(serve(listener, app.router.clone(), async move {
        let _ = stopped.await;
    }));

    let mut stream = tokio::net::TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(b"GET /health/ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .expect("write request");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read response");
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);

    stop.send(()).expect("server still running");
    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server stops after the signal")
        .expect("server task joins");
    assert!(result.is_ok());
}

//! Integration tests: load CSVs, query over HTTP, reload over the
//! control socket.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tempfile::tempdir;
use tokio::time::{Duration, sleep};
use tower::util::ServiceExt;

use dialscope_core::TableId;
use dialscope_server::control::ControlServer;
use dialscope_server::protocol::DnoFile;
use dialscope_server::state::AppState;
use dialscope_server::{ControlClient, http, loader};

fn write_fixtures(dir: &std::path::Path) -> (PathBuf, PathBuf, PathBuf) {
    let us = dir.join("us_lrn.csv");
    std::fs::write(&us, "2025551212,3045550000\n4155550001,4155550001\n").unwrap();
    let ca = dir.join("ca_lrn.csv");
    std::fs::write(&ca, "6045551234,6045559999\n").unwrap();
    let dnc = dir.join("dnc.csv");
    std::fs::write(&dnc, "2025551212\n").unwrap();
    (us, ca, dnc)
}

fn loaded_state(dir: &std::path::Path) -> Arc<AppState> {
    let (us, ca, dnc) = write_fixtures(dir);
    let state = Arc::new(AppState::default());
    loader::load_table(&state, TableId::UsLrn, &us).unwrap();
    loader::load_table(&state, TableId::CaLrn, &ca).unwrap();
    loader::load_table(&state, TableId::Dnc, &dnc).unwrap();
    state
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_target_unavailable_without_lrn() {
    let app = http::router(Arc::new(AppState::default()));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/target?phone%5B%5D=2025551212")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_target_text() {
    let dir = tempdir().unwrap();
    let app = http::router(loaded_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/target?phone%5B%5D=2025551212&phone%5B%5D=3105550000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("{pn=2025551212,lrn=3045550000"));
    assert!(lines[0].contains("is_dnc=yes"));
    assert!(lines[1].starts_with("{pn=3105550000,lrn=null"));
    assert!(lines[1].contains("is_dnc=no"));
}

#[tokio::test]
async fn test_target_json() {
    let dir = tempdir().unwrap();
    let app = http::router(loaded_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/target?phone%5B%5D=2025551212")
                .header(header::ACCEPT, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body = body_string(response).await;
    let rows: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(rows[0]["pn"], "2025551212");
    assert_eq!(rows[0]["rn"], "3045550000");
    assert_eq!(rows[0]["is_dnc"], "yes");
    assert_eq!(rows[0]["ocn"], serde_json::Value::Null);
}

#[tokio::test]
async fn test_target_post_form() {
    let dir = tempdir().unwrap();
    let app = http::router(loaded_state(dir.path()));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/target")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("phone[]=2025551212&phone[]=not-a-phone"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    // The unparseable phone is dropped, leaving one row.
    assert_eq!(body.lines().count(), 1);
    assert!(body.starts_with("{pn=2025551212"));
}

#[tokio::test]
async fn test_reverse_scan() {
    let dir = tempdir().unwrap();
    let app = http::router(loaded_state(dir.path()));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/reverse?prefix%5B%5D=304")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "2025551212,3045550000\n");

    // The CA table answers through the same surface.
    let response = app
        .oneshot(
            Request::builder()
                .uri("/reverse?prefix%5B%5D=6045559")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_string(response).await, "6045551234,6045559999\n");
}

async fn start_control_server(dir: &std::path::Path) -> (Arc<AppState>, PathBuf) {
    let state = Arc::new(AppState::default());
    let socket = dir.join("control.sock");
    let server = ControlServer::new(Arc::clone(&state), socket.clone());
    tokio::spawn(async move {
        server.run().await.unwrap();
    });
    // Give the server a moment to bind.
    sleep(Duration::from_millis(50)).await;
    (state, socket)
}

#[tokio::test]
async fn test_control_reload_status_meta() {
    let dir = tempdir().unwrap();
    let (us, ca, _dnc) = write_fixtures(dir.path());
    let (state, socket) = start_control_server(dir.path()).await;

    let mut client = ControlClient::connect(&socket).await.unwrap();
    client.ping().await.unwrap();

    let reply = client
        .reload("us_lrn", us.to_str().unwrap())
        .await
        .unwrap();
    assert_eq!(reply["rows"], 2);
    client
        .reload("ca_lrn", ca.to_str().unwrap())
        .await
        .unwrap();

    let status = client.status().await.unwrap();
    let tables = status["tables"].as_array().unwrap();
    let us_status = tables
        .iter()
        .find(|t| t["table"] == "us_lrn")
        .unwrap();
    assert_eq!(us_status["available"], true);
    assert_eq!(us_status["rows"], 2);
    let geo_status = tables.iter().find(|t| t["table"] == "geo").unwrap();
    assert_eq!(geo_status["available"], false);

    let meta = client.meta("us_lrn").await.unwrap();
    assert_eq!(meta["meta"]["path"], us.display().to_string());
    assert_eq!(meta["meta"]["lines"], 2);

    // The loaded registry serves HTTP traffic too.
    assert!(state.registry.us_lrn().is_available());
}

#[tokio::test]
async fn test_control_reload_dno() {
    let dir = tempdir().unwrap();
    let (state, socket) = start_control_server(dir.path()).await;

    let full = dir.path().join("dno_full.csv");
    std::fs::write(&full, "212-555-1001,carrier,2020\n").unwrap();
    let npa = dir.path().join("dno_npa.csv");
    std::fs::write(&npa, "213,carrier,2020\n").unwrap();

    let mut client = ControlClient::connect(&socket).await.unwrap();
    let reply = client
        .reload_dno(vec![
            DnoFile {
                path: full.display().to_string(),
                granularity: "full".to_string(),
            },
            DnoFile {
                path: npa.display().to_string(),
                granularity: "npa".to_string(),
            },
        ])
        .await
        .unwrap();
    assert_eq!(reply["rows"], 2);

    let dno = state.registry.dno().acquire().unwrap();
    assert!(dno.contains(2125551001));
    assert!(dno.contains(2135550000));
    assert!(!dno.contains(3105550000));
}

#[tokio::test]
async fn test_failed_reload_keeps_published_version() {
    let dir = tempdir().unwrap();
    let (us, _ca, _dnc) = write_fixtures(dir.path());
    let (state, socket) = start_control_server(dir.path()).await;

    let mut client = ControlClient::connect(&socket).await.unwrap();
    client
        .reload("us_lrn", us.to_str().unwrap())
        .await
        .unwrap();

    // A dump with a duplicate key aborts the rebuild.
    let broken = dir.path().join("broken.csv");
    std::fs::write(&broken, "2025551212,1111111111\n2025551212,2222222222\n").unwrap();
    let err = client
        .reload("us_lrn", broken.to_str().unwrap())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ReloadFailed"));

    // The previously published version is untouched.
    let table = state.registry.us_lrn().acquire().unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.get_rn(2025551212), 3045550000);
}

#[tokio::test]
async fn test_unknown_table_reload() {
    let dir = tempdir().unwrap();
    let (_state, socket) = start_control_server(dir.path()).await;

    let mut client = ControlClient::connect(&socket).await.unwrap();
    let err = client.reload("bogus", "/nonexistent.csv").await.unwrap_err();
    assert!(err.to_string().contains("ReloadFailed"));
}

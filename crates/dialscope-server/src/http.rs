//! HTTP query surface: `/target` and `/reverse`.
//!
//! Phones arrive as repeated `phone[]` parameters (query string or
//! form-urlencoded body); unparseable numbers are dropped. Reverse scans
//! take repeated `prefix[]` parameters of 1..10 digits. Content is
//! negotiated on the `Accept` header: `application/json` first, plain
//! text otherwise. Both endpoints refuse service with 503 until the US
//! and CA portability tables are loaded; every other table degrades to
//! explicit absent markers.

use std::sync::Arc;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Form, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tower_http::trace::TraceLayer;

use dialscope_core::{enrich, phone};

use crate::format;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/target", get(target_get).post(target_post))
        .route("/reverse", get(reverse_get))
        .layer(DefaultBodyLimit::max(state.max_query_length))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn target_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    run_target(&state, &headers, &params)
}

async fn target_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(params): Form<Vec<(String, String)>>,
) -> Response {
    run_target(&state, &headers, &params)
}

fn run_target(state: &AppState, headers: &HeaderMap, params: &[(String, String)]) -> Response {
    if !lrn_available(state) {
        return service_unavailable();
    }

    let pns: Vec<u64> = params
        .iter()
        .filter(|(name, _)| name.as_str() == "phone[]")
        .map(|(_, value)| phone::parse(value))
        .filter(|&pn| pn != phone::NONE)
        .collect();

    let reply = enrich(&state.registry, &pns);
    if wants_json(headers) {
        json_response(format::target_json(&reply))
    } else {
        text_response(format::target_text(&reply))
    }
}

async fn reverse_get(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    if !lrn_available(&state) {
        return service_unavailable();
    }

    let ranges: Vec<(u64, u64)> = params
        .iter()
        .filter(|(name, _)| name.as_str() == "prefix[]")
        .filter_map(|(_, value)| prefix_range(value))
        .collect();

    let us = state.registry.us_lrn().acquire();
    let ca = state.registry.ca_lrn().acquire();
    let json = wants_json(&headers);
    let body = format::reverse_body(us.as_deref(), ca.as_deref(), &ranges, json);
    if json {
        json_response(body)
    } else {
        text_response(body)
    }
}

/// Expand a 1..10 digit prefix into its half-open phone interval.
fn prefix_range(value: &str) -> Option<(u64, u64)> {
    if value.is_empty() || value.len() > 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let from: u64 = value.parse().ok()?;
    let scale = 10u64.pow((10 - value.len()) as u32);
    Some((from * scale, (from + 1) * scale))
}

/// The first Accept token selects JSON; anything else selects text.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|token| token.split(';').next().unwrap_or(token).trim() == "application/json")
        .unwrap_or(false)
}

fn lrn_available(state: &AppState) -> bool {
    state.registry.us_lrn().is_available() && state.registry.ca_lrn().is_available()
}

fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable").into_response()
}

fn json_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn text_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/plain")], body).into_response()
}

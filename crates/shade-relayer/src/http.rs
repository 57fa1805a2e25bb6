//! http surface
//!
//! four routes: relay, quote, details, ping. policy rejections on the
//! relay path come back as http 200 with `success: false` so clients can
//! correlate the persisted record; transport-level rejections map to
//! 4xx/5xx with a `{name, message, code, details}` body.

use std::sync::Arc;

use alloy::primitives::Address;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

use crate::error::RelayerError;
use crate::payload::{QuoteRequestBody, QuoteResponse, RelayRequestBody};
use crate::relay::RelayerService;
use crate::RelayerConfig;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsQuery {
    chain_id: u64,
    asset_address: Address,
}

fn error_response(e: RelayerError) -> Response {
    let body = json!({
        "name": e.code(),
        "message": e.to_string(),
        "code": e.code(),
        "details": {},
    });
    (e.status(), Json(body)).into_response()
}

async fn relay_request(
    State(service): State<Arc<RelayerService>>,
    Json(body): Json<RelayRequestBody>,
) -> Response {
    match service.handle_relay(body).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn quote(
    State(service): State<Arc<RelayerService>>,
    Json(body): Json<QuoteRequestBody>,
) -> Response {
    match service.handle_quote(body).await {
        Ok(quote) => {
            let response = QuoteResponse {
                fee_bps: quote.fee_bps.to_string(),
                gas_price: quote.gas_price.to_string(),
                path: quote.quote.path,
                fee_commitment: quote.commitment,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn details(
    State(service): State<Arc<RelayerService>>,
    Query(query): Query<DetailsQuery>,
) -> Response {
    match service.handle_details(query.chain_id, query.asset_address) {
        Ok(details) => (StatusCode::OK, Json(details)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn ping() -> &'static str {
    "pong"
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "name": "NOT_FOUND",
            "message": "no such route",
            "code": "NOT_FOUND",
            "details": {},
        })),
    )
        .into_response()
}

fn cors_layer(config: &RelayerConfig) -> CorsLayer {
    if config.cors_allow_all {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = config
        .allowed_domains
        .iter()
        .filter_map(|d| d.parse().ok())
        .collect();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

pub fn build_router(service: Arc<RelayerService>, config: &RelayerConfig) -> Router {
    Router::new()
        .route("/relayer/request", post(relay_request))
        .route("/relayer/quote", post(quote))
        .route("/relayer/details", get(details))
        .route("/ping", get(ping))
        .fallback(not_found)
        .layer(cors_layer(config))
        .with_state(service)
}

pub async fn serve(
    service: Arc<RelayerService>,
    config: &RelayerConfig,
    bind: &str,
    port: u16,
) -> anyhow::Result<()> {
    let router = build_router(service, config);
    let listener = tokio::net::TcpListener::bind((bind, port)).await?;
    info!("listening on {}:{}", bind, port);
    axum::serve(listener, router).await?;
    Ok(())
}

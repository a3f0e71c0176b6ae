//! # kbridge-api: Axum API Service for kbridge
//!
//! Turns client descriptions of entities into items and claims in a
//! public/federated knowledge-base pair, and records the resulting ids on
//! archival records.
//!
//! ## API Surface
//!
//! | Path                   | Module              | Purpose                          |
//! |------------------------|---------------------|----------------------------------|
//! | `/create_wiki_item`    | [`routes::items`]   | create item + statements         |
//! | `/copy_wikidata_item`  | [`routes::items`]   | import public item to federation |
//! | `/openapi.json`        | [`openapi`]         | OpenAPI document                 |
//! | `/health/*`            | here                | liveness / readiness probes      |
//!
//! ## Layers
//!
//! ```text
//! routes → orchestration → pipeline::{statements → resolver, claims} → kbridge-client
//! ```

pub mod error;
pub mod extractors;
pub mod openapi;
pub mod orchestration;
pub mod pipeline;
pub mod routes;
pub mod state;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::items::router())
        .merge(openapi::router())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}

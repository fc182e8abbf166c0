//! HTTP search endpoint

use crate::cli::ServeArgs;
use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sitesearch_core::{SearchResponse, SearchService};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
}

/// Serve the artifact until interrupted.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let service = SearchService::open(&args.artifact)
        .with_context(|| format!("Failed to load artifact {}", args.artifact.display()))?
        .with_snippet_options(args.snippet.options());
    info!("Serving {} documents", service.document_count());

    let addr: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", args.bind))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let route = route_path(&args.path);
    info!("Listening on http://{addr}{route}");

    axum::serve(listener, router(Arc::new(service), &route))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server shutdown")?;
    Ok(())
}

fn route_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn router(service: Arc<SearchService>, path: &str) -> Router {
    Router::new()
        .route(path, get(search_handler))
        .with_state(service)
}

async fn search_handler(
    State(service): State<Arc<SearchService>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, Json<ErrorBody>)> {
    service
        .search(params.q.as_deref())
        .await
        .map(Json)
        .map_err(|err| {
            error!("Search failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    message: err.to_string(),
                }),
            )
        })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

//! Serve command: the editable dashboard over HTTP
//!
//! `GET /` renders the dashboard from the files on disk. `POST /save` takes
//! `{admin_token, updates}`, applies the updates under per-path locks,
//! regenerates the outputs and publishes when enabled.

use anyhow::{Result, anyhow};
use dashgen_core::{BatchReport, DashConfig, Dashboard, RenderFormat, UpdateRequest};
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cli::app::ServeArgs;

/// Shared between all connections
pub struct AppState {
    dashboard: Arc<Dashboard>,
    /// Expected admin token; `None` rejects every save
    admin_token: Option<String>,
}

impl AppState {
    pub fn new(dashboard: Dashboard, admin_token: Option<String>) -> Self {
        Self { dashboard: Arc::new(dashboard), admin_token: admin_token.filter(|t| !t.is_empty()) }
    }

    fn token_matches(&self, given: Option<&str>) -> bool {
        match (self.admin_token.as_deref(), given) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SaveRequest {
    #[serde(default)]
    admin_token: Option<String>,
    #[serde(default)]
    updates: Vec<UpdateRequest>,
}

pub fn execute(args: ServeArgs, config: DashConfig) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    let token = std::env::var(&config.server.admin_token_env).ok();
    if token.as_deref().is_none_or(str::is_empty) {
        warn!("{} is not set, every save will be rejected", config.server.admin_token_env);
    }

    let state = Arc::new(AppState::new(Dashboard::new(config)?, token));

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(&bind, state))
}

/// Run the server until Ctrl-C
pub async fn serve(bind: &str, state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = bind.parse()?;

    let make_service = make_service_fn(move |_| {
        let state = Arc::clone(&state);
        async move {
            Ok::<_, Infallible>(service_fn(move |req: Request<Body>| handle(Arc::clone(&state), req)))
        }
    });

    let server = Server::try_bind(&addr)
        .map_err(|err| anyhow!("failed to bind dashboard server on {addr}: {err}"))?
        .serve(make_service);

    info!("Serving dashboard on http://{}", addr);
    println!("Dashboard available at http://{}", addr);

    server
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down dashboard server");
        })
        .await?;
    Ok(())
}

/// Route a single request
pub async fn handle(state: Arc<AppState>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") | (&Method::GET, "/index.html") => index(&state).await,
        (&Method::POST, "/save") => save(&state, req).await,
        _ => json_response(StatusCode::NOT_FOUND, json!({"status": "error", "msg": "Not found"})),
    };
    Ok(response)
}

async fn index(state: &AppState) -> Response<Body> {
    let dashboard = Arc::clone(&state.dashboard);
    match tokio::task::spawn_blocking(move || dashboard.render_html()).await {
        Ok(page) => {
            let mut response = Response::new(Body::from(page));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
            response
        }
        Err(e) => {
            error!("Rendering dashboard failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Rendering failed")
        }
    }
}

async fn save(state: &AppState, req: Request<Body>) -> Response<Body> {
    let bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("Unreadable body: {}", e)),
    };

    let payload: SaveRequest = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {}", e)),
    };

    if !state.token_matches(payload.admin_token.as_deref()) {
        warn!("Rejected save with invalid admin token");
        return error_response(StatusCode::FORBIDDEN, "Invalid admin token");
    }

    let dashboard = Arc::clone(&state.dashboard);
    let updates = payload.updates;
    let outcome = tokio::task::spawn_blocking(move || {
        dashboard.apply_and_publish(&updates, &[RenderFormat::Markdown, RenderFormat::Html], true)
    })
    .await;

    match outcome {
        Ok(Ok(result)) => json_response(StatusCode::OK, save_body(&result.report)),
        Ok(Err(e)) => {
            error!("Save failed: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &format!("{:#}", e))
        }
        Err(e) => {
            error!("Save task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Save task failed")
        }
    }
}

fn save_body(report: &BatchReport) -> serde_json::Value {
    let (status, msg) = if report.is_success() {
        ("success", "Updates applied successfully".to_string())
    } else {
        ("partial", format!("Some updates were skipped: {}", report.summary()))
    };
    json!({
        "status": status,
        "msg": msg,
        "applied": report.applied,
        "unchanged": report.unchanged,
        "skipped": report.skipped,
    })
}

fn error_response(status: StatusCode, msg: &str) -> Response<Body> {
    json_response(status, json!({"status": "error", "msg": msg}))
}

fn json_response(status: StatusCode, body: serde_json::Value) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

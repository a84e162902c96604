//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE, COOKIE, SET_COOKIE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Args;
use crate::routes;
use crate::services::EnvelopeWorkflow;
use crate::session::{self, spawn_cleanup_task, SessionStore};
use crate::types::{GatewayError, Result};

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Largest accepted form body
const MAX_FORM_BYTES: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Browser sessions and their credential slots
    pub sessions: Arc<SessionStore>,
    /// Envelope operations
    pub workflow: Arc<EnvelopeWorkflow>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, workflow: EnvelopeWorkflow) -> Self {
        let sessions = Arc::new(SessionStore::new(args.session_ttl()));
        Self {
            args,
            sessions,
            workflow: Arc::new(workflow),
            started_at: Instant::now(),
        }
    }
}

pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Envelope gateway listening on {}", state.args.listen);

    // Sweep at a tenth of the TTL, at least once a minute
    let sweep = (state.sessions.ttl() / 10).clamp(Duration::from_secs(1), Duration::from_secs(60));
    spawn_cleanup_task(Arc::clone(&state.sessions), sweep);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(String::from);

    info!("[{}] {} {}", addr, method, path);

    match (&method, path.as_str()) {
        (&Method::OPTIONS, _) => return Ok(to_boxed(preflight_response())),
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(to_boxed(routes::health_check(Arc::clone(&state))))
        }
        (&Method::GET, "/version") => return Ok(to_boxed(routes::version_info())),
        _ => {}
    }

    // Everything below runs inside a browser session
    let cookie = req
        .headers()
        .get(COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(session::session_id_from_cookie)
        .map(String::from);
    let (ctx, created) = state.sessions.resolve(cookie.as_deref());
    let workflow = &state.workflow;

    let mut response = match (method, path.as_str()) {
        (Method::GET, "/") => routes::index_page(),

        (Method::POST, "/form") => {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|h| h.to_str().ok())
                .map(String::from);
            match read_body(req).await {
                Ok(body) => {
                    routes::handle_submit_form(workflow, &ctx, content_type.as_deref(), body).await
                }
                Err(e) => routes::error_response(&e),
            }
        }

        (Method::GET, "/listStatus") => {
            routes::handle_list_status(workflow, &ctx, query.as_deref()).await
        }

        (Method::GET, "/listStatusChanges") => {
            routes::handle_list_status_changes(workflow, &ctx, query.as_deref()).await
        }

        (Method::GET, "/success") => routes::handle_success(workflow, &ctx, query.as_deref()),

        _ => not_found_response(&path),
    };

    if created {
        let cookie = session::session_cookie(ctx.session_id(), state.sessions.ttl().as_secs());
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
                debug!(session_id = %ctx.session_id(), "Issued session cookie");
            }
            Err(e) => error!("Invalid session cookie value: {}", e),
        }
    }

    Ok(to_boxed(response))
}

async fn read_body(req: Request<Incoming>) -> Result<Bytes> {
    Limited::new(req.into_body(), MAX_FORM_BYTES)
        .collect()
        .await
        .map(|collected| collected.to_bytes())
        .map_err(|e| GatewayError::Http(format!("Failed to read request body: {}", e)))
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    let headers = response.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert("Access-Control-Allow-Headers", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    response
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    routes::error_response(&GatewayError::NotFound(format!("No route for {}", path)))
}

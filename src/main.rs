mod feed;
mod http;
mod jobs;
mod metrics;
mod models;
mod security;
mod spapi;
#[cfg(test)]
mod testing;

use axum::{
    Json, Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use feed::{FeedConfig, FeedError, FeedErrorKind, FeedOrchestrator, ListingImageWorkflow};
use jobs::{JobInfo, JobQueue, JobRunner};
use models::{ApiError, EnqueueResponse, ListingImageUpdateRequest, SubmitFeedRequest};
use security::{AuthContext, AuthState, require_api_auth};
use serde_json::json;
use spapi::{LwaTokenProvider, SpApiClient, SpApiConfig, StaticToken, TokenSource};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "spapi.api", "server crashed: {err:#}");
    }
}

async fn run() -> eyre::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let spapi_config = SpApiConfig::from_env();
    let feed_config = FeedConfig::from_env();
    let tokens = token_source(&spapi_config)?;
    let client = Arc::new(SpApiClient::new(&spapi_config));
    info!(
        target = "spapi.api",
        endpoint = client.endpoint(),
        feed_type = %feed_config.feed_type,
        poll_interval_secs = feed_config.poll_interval.as_secs(),
        max_attempts = feed_config.max_attempts,
        "sp-api client configured"
    );

    let orchestrator = FeedOrchestrator::new(client.clone(), client.clone(), tokens.clone());
    let listing_images = ListingImageWorkflow::new(orchestrator.clone(), client, tokens);
    let (queue, _worker) = JobQueue::spawn(JobRunner {
        orchestrator,
        listing_images,
        policy: feed_config.poll_policy(),
    });

    let state = AppState {
        queue,
        feed_config: Arc::new(feed_config),
    };

    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    let protected = Router::new()
        .route("/feeds", post(enqueue_feed))
        .route("/listings/images", post(enqueue_listing_image))
        .route("/jobs/{id}", get(get_job_status).delete(cancel_job))
        .route_layer(middleware::from_fn_with_state(
            AuthState::from_env(),
            require_api_auth,
        ));

    let app = Router::new()
        .route("/health", get(health))
        .merge(protected)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::extract::DefaultBodyLimit::max(body_limit_from_env()));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "spapi.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Prefers LWA refresh credentials; falls back to a static token.
fn token_source(config: &SpApiConfig) -> eyre::Result<Arc<dyn TokenSource>> {
    if config.lwa.is_complete() {
        return Ok(Arc::new(LwaTokenProvider::new(config.lwa.clone())?));
    }
    match &config.static_access_token {
        Some(token) => Ok(Arc::new(StaticToken::new(token.clone()))),
        None => Err(eyre::eyre!(
            "set LWA_CLIENT_ID, LWA_CLIENT_SECRET and LWA_REFRESH_TOKEN, or SPAPI_ACCESS_TOKEN"
        )),
    }
}

#[derive(Clone)]
struct AppState {
    queue: JobQueue,
    feed_config: Arc<FeedConfig>,
}

/// Health check.
///
/// - Method: `GET`
/// - Path: `/health`
/// - Auth: none
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "spapi-feeds",
    }))
}

/// Enqueues submit → poll → report for an already uploaded feed document.
async fn enqueue_feed(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<SubmitFeedRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    metrics::inc_requests("/feeds");
    let submission = payload.into_submission(&state.feed_config)?;
    let id = state.queue.enqueue_feed(submission, &auth.org_id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            job_id: id.to_string(),
        }),
    ))
}

/// Enqueues a listing image update: build feed, upload, submit, poll, report.
async fn enqueue_listing_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<ListingImageUpdateRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>), AppError> {
    metrics::inc_requests("/listings/images");
    let request = payload.into_request(&state.feed_config);
    ListingImageWorkflow::validate(&request)?;
    let id = state
        .queue
        .enqueue_listing_image(request, &auth.org_id)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            job_id: id.to_string(),
        }),
    ))
}

/// Jobs of another organisation answer 404.
async fn get_job_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<JobInfo>, AppError> {
    let id = parse_job_id(&id)?;
    state
        .queue
        .get(id, &auth.org_id)
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn cancel_job(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = parse_job_id(&id)?;
    match state.queue.cancel(id, &auth.org_id) {
        Some(requested) => Ok(Json(json!({
            "job_id": id.to_string(),
            "cancel_requested": requested,
        }))),
        None => Err(AppError::NotFound),
    }
}

fn parse_job_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::Feed(FeedError::invalid_input("invalid job id")))
}

enum AppError {
    Feed(FeedError),
    Queue(ApiError),
    NotFound,
}

impl From<FeedError> for AppError {
    fn from(value: FeedError) -> Self {
        Self::Feed(value)
    }
}

impl From<ApiError> for AppError {
    fn from(value: ApiError) -> Self {
        Self::Queue(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Feed(err) => {
                let status = match err.kind() {
                    FeedErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let payload = ApiError {
                    error: err.kind().as_str().to_string(),
                    detail: Some(err.to_string()),
                };
                (status, Json(payload)).into_response()
            }
            AppError::Queue(payload) => {
                (StatusCode::SERVICE_UNAVAILABLE, Json(payload)).into_response()
            }
            AppError::NotFound => {
                let payload = ApiError {
                    error: "not_found".into(),
                    detail: Some("job not found".into()),
                };
                (StatusCode::NOT_FOUND, Json(payload)).into_response()
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));
    let _ = fmt().with_env_filter(filter).try_init();
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(256 * 1024)
}

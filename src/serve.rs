use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc as StdArc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::avatar::AvatarService;
use crate::error::AppError;
use crate::models::{ConfirmMedia, SaveLink, SaveSession, SaveTask, SaveUser};
use crate::service::TaskService;
use crate::user::UserService;

/// Header set by the authenticating gateway in front of the API
pub const USER_ID_HEADER: &str = "x-user-id";

// State for API handlers
pub struct AppState {
    pub tasks: TaskService,
    pub users: UserService,
    pub avatars: StdArc<AvatarService>,
}

/// What the failed request was doing; picks the generic 500 message
#[derive(Debug, Clone, Copy)]
enum Action {
    Load,
    Save,
    Delete,
}

impl Action {
    fn message(self) -> &'static str {
        match self {
            Action::Load => "failed to load data",
            Action::Save => "failed to save data",
            Action::Delete => "failed to delete data",
        }
    }
}

#[derive(Serialize)]
struct UrlResponse {
    url: Option<String>,
}

fn json_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({"error": msg.into()}))).into_response()
}

fn error_response(err: AppError, action: Action) -> Response {
    match err {
        AppError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, msg),
        AppError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, msg),
        other => {
            error!("{}: {}", action.message(), other);
            json_error(StatusCode::INTERNAL_SERVER_ERROR, action.message())
        }
    }
}

fn ok<T: Serialize>(result: crate::error::Result<T>, action: Action) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e, action),
    }
}

fn ok_empty(result: crate::error::Result<()>, action: Action) -> Response {
    match result {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response(e, action),
    }
}

fn user_id(headers: &HeaderMap) -> Result<Uuid, Response> {
    let value = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| json_error(StatusCode::UNAUTHORIZED, "missing user id"))?;
    Uuid::parse_str(value.trim())
        .map_err(|_| json_error(StatusCode::UNAUTHORIZED, "invalid user id"))
}

fn path_id<T>(path: Result<Path<T>, PathRejection>) -> Result<T, Response> {
    path.map(|Path(v)| v).map_err(|e| {
        warn!("Rejected path: {}", e);
        json_error(StatusCode::BAD_REQUEST, "invalid id")
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, e.body_text()))
}

/// Unwrap an extraction result or return its error response
macro_rules! extract {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(resp) => return resp,
        }
    };
}

pub fn build_router(state: StdArc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tasks", post(create_task_handler))
        .route("/api/tasks/active", get(active_tasks_handler))
        .route("/api/tasks/completed", get(completed_tasks_handler))
        .route(
            "/api/tasks/{id}",
            get(task_detail_handler).put(update_task_handler),
        )
        .route("/api/tasks/{id}/complete", put(complete_task_handler))
        .route("/api/tasks/{id}/sessions", post(create_session_handler))
        .route("/api/sessions/{id}", get(session_handler))
        .route(
            "/api/tasks/{id}/media/upload-url",
            post(upload_url_handler),
        )
        .route(
            "/api/tasks/{id}/media/{media_id}/confirm",
            post(confirm_upload_handler),
        )
        .route("/api/tasks/{id}/media", get(list_media_handler))
        .route("/api/media/{id}", delete(remove_media_handler))
        .route("/api/tasks/{id}/links", post(save_link_handler))
        .route("/api/links/{id}", delete(remove_link_handler))
        .route(
            "/api/users/me/avatar/upload-url",
            get(avatar_upload_url_handler),
        )
        .route("/api/users/me/avatar", get(avatar_handler))
        .route(
            "/api/users/me",
            get(profile_handler).put(update_profile_handler),
        )
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `port` until ctrl-c
pub async fn run_server(
    state: StdArc<AppState>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("[::]:{}", port))
        .await
        .map_err(|e| format!("Failed to bind to port {}: {}", port, e))?;
    info!("Listening on: http://[::]:{} (IPv4 + IPv6)", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn active_tasks_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let user_id = extract!(user_id(&headers));
    ok(state.tasks.active_tasks(user_id).await, Action::Load)
}

async fn completed_tasks_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let user_id = extract!(user_id(&headers));
    ok(state.tasks.completed_tasks(user_id).await, Action::Load)
}

async fn create_task_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SaveTask>, JsonRejection>,
) -> Response {
    let user_id = extract!(user_id(&headers));
    let req = extract!(body(payload));
    ok(state.tasks.create_task(user_id, req).await, Action::Save)
}

async fn task_detail_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let user_id = extract!(user_id(&headers));
    let id = extract!(path_id(path));
    ok(state.tasks.task_detail(user_id, id).await, Action::Load)
}

async fn update_task_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SaveTask>, JsonRejection>,
) -> Response {
    let user_id = extract!(user_id(&headers));
    let id = extract!(path_id(path));
    let req = extract!(body(payload));
    ok(state.tasks.update_task(user_id, id, req).await, Action::Save)
}

async fn complete_task_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let user_id = extract!(user_id(&headers));
    let id = extract!(path_id(path));
    ok(state.tasks.complete_task(user_id, id).await, Action::Save)
}

async fn create_session_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SaveSession>, JsonRejection>,
) -> Response {
    let task_id = extract!(path_id(path));
    let req = extract!(body(payload));
    ok(state.tasks.create_session(task_id, req).await, Action::Save)
}

async fn session_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = extract!(path_id(path));
    ok(state.tasks.session(id).await, Action::Load)
}

async fn upload_url_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let task_id = extract!(path_id(path));
    ok(state.tasks.request_upload_url(task_id).await, Action::Save)
}

async fn confirm_upload_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<(Uuid, Uuid)>, PathRejection>,
    payload: Result<Json<ConfirmMedia>, JsonRejection>,
) -> Response {
    let (task_id, media_id) = extract!(path_id(path));
    let req = extract!(body(payload));
    ok(
        state.tasks.confirm_upload(task_id, media_id, req).await,
        Action::Save,
    )
}

async fn list_media_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let task_id = extract!(path_id(path));
    ok(state.tasks.list_media(task_id).await, Action::Load)
}

async fn remove_media_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = extract!(path_id(path));
    ok_empty(state.tasks.remove_media(id).await, Action::Delete)
}

async fn save_link_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SaveLink>, JsonRejection>,
) -> Response {
    let task_id = extract!(path_id(path));
    let req = extract!(body(payload));
    ok(state.tasks.save_link(task_id, req).await, Action::Save)
}

async fn remove_link_handler(
    State(state): State<StdArc<AppState>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let id = extract!(path_id(path));
    ok_empty(state.tasks.remove_link(id).await, Action::Delete)
}

async fn avatar_upload_url_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let user_id = extract!(user_id(&headers));
    let result = state
        .avatars
        .upload_url(user_id)
        .await
        .map(|url| UrlResponse { url: Some(url) });
    ok(result, Action::Save)
}

async fn avatar_handler(State(state): State<StdArc<AppState>>, headers: HeaderMap) -> Response {
    let user_id = extract!(user_id(&headers));
    let result = state
        .avatars
        .download_url(user_id)
        .await
        .map(|url| UrlResponse { url });
    ok(result, Action::Load)
}

async fn profile_handler(State(state): State<StdArc<AppState>>, headers: HeaderMap) -> Response {
    let user_id = extract!(user_id(&headers));
    ok(state.users.profile(user_id).await, Action::Load)
}

async fn update_profile_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SaveUser>, JsonRejection>,
) -> Response {
    let user_id = extract!(user_id(&headers));
    let req = extract!(body(payload));
    ok(state.users.update_profile(user_id, req).await, Action::Save)
}

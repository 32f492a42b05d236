use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::{
    AuthApi, ConfigApi, ContainerApi, Envelope, HealthApi, MockBackend, UserApi, VolumeApi,
};
use crate::error::ApiError;
use crate::models::{
    Action, Container, ContainerAction, LoginCredentials, LoginResponse, NewUser, PublicConfig,
    RegisterRequest, SystemConfig, UpdateConfigRequest, User, Volume, VolumeFileContent,
    VolumeFileInfo,
};

/// Failure answered as `{"success": false, "error": ...}`.
#[derive(Debug)]
pub struct ServerError {
    status: StatusCode,
    message: String,
}

impl ServerError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ApiError> for ServerError {
    fn from(err: ApiError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, err.to_string())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<PathRejection> for ServerError {
    fn from(rejection: PathRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, error = %self.message, "Mock request failed");
        (self.status, Json(Envelope::<()>::failure(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ServerError>;

// Extractor rejections are answered as envelopes instead of axum's plain text.
type Body<T> = Result<Json<T>, JsonRejection>;
type Param<T> = Result<Path<T>, PathRejection>;
type Params<T> = Result<Query<T>, QueryRejection>;

fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope::success(data)))
}

fn ack(message: &str) -> ApiResult<()> {
    Ok(Json(Envelope::acknowledge(message)))
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    path: Option<String>,
}

impl PathQuery {
    fn required(self) -> Result<String, ServerError> {
        self.path
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServerError::new(StatusCode::BAD_REQUEST, "File path is required"))
    }
}

/// Build the `/api` router over `backend`.
pub fn router(backend: MockBackend) -> Router {
    let protected = Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", delete(delete_user))
        .route("/containers", get(list_containers))
        .route("/containers/{id}", get(get_container))
        .route("/containers/{id}/{action}", post(control_container))
        .route("/docker/health", get(docker_health))
        .route("/volumes", get(list_volumes))
        .route("/volumes/{name}", delete(delete_volume))
        .route("/volumes/{name}/files", get(explore_volume_files))
        .route(
            "/volumes/{name}/file",
            get(read_volume_file).delete(delete_volume_file),
        )
        .route(
            "/config",
            get(get_config).put(update_config).patch(patch_config),
        )
        .route_layer(middleware::from_fn_with_state(
            backend.clone(),
            require_token,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/config/public", get(public_config));

    Router::new()
        .nest("/api", public.merge(protected))
        .with_state(backend)
}

async fn require_token(
    State(backend): State<MockBackend>,
    request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if backend.accepts_token(token) => next.run(request).await,
        _ => {
            warn!(path = %request.uri().path(), "Rejected request without a valid token");
            ServerError::new(StatusCode::UNAUTHORIZED, "Invalid or missing token").into_response()
        }
    }
}

async fn health(State(backend): State<MockBackend>) -> ApiResult<()> {
    let report = backend.check_health().await?;
    ack(report.message.as_deref().unwrap_or("Server is running"))
}

async fn docker_health(State(backend): State<MockBackend>) -> ApiResult<()> {
    let report = backend.check_docker_health().await?;
    ack(report.message.as_deref().unwrap_or("Docker daemon is accessible"))
}

async fn login(
    State(backend): State<MockBackend>,
    body: Body<LoginCredentials>,
) -> ApiResult<LoginResponse> {
    let Json(credentials) = body?;
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(ServerError::new(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        ));
    }

    let result = backend
        .login(&credentials)
        .await
        .map_err(|e| ServerError::new(StatusCode::UNAUTHORIZED, e.to_string()))?;

    Ok(Json(Envelope::success_with_message(
        LoginResponse {
            token: result.token,
            username: result.user.username,
            nickname: Some(result.user.nickname),
        },
        "Login successful",
    )))
}

async fn register(
    State(backend): State<MockBackend>,
    body: Body<RegisterRequest>,
) -> Result<(StatusCode, Json<Envelope<User>>), ServerError> {
    let Json(request) = body?;
    let user = backend.register(&request).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success_with_message(user, "User registered successfully")),
    ))
}

async fn public_config(State(backend): State<MockBackend>) -> ApiResult<PublicConfig> {
    ok(backend.get_public_config().await?)
}

async fn list_users(State(backend): State<MockBackend>) -> ApiResult<Vec<User>> {
    ok(backend.get_users().await?)
}

async fn create_user(
    State(backend): State<MockBackend>,
    body: Body<NewUser>,
) -> Result<(StatusCode, Json<Envelope<User>>), ServerError> {
    let Json(user) = body?;
    let user = backend.create_user(&user).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::success_with_message(user, "User created successfully")),
    ))
}

async fn delete_user(State(backend): State<MockBackend>, id: Param<i64>) -> ApiResult<()> {
    let Path(id) = id?;
    backend
        .delete_user(id)
        .await
        .map_err(|e| ServerError::new(StatusCode::NOT_FOUND, e.to_string()))?;
    ack("User deleted successfully")
}

async fn list_containers(State(backend): State<MockBackend>) -> ApiResult<Vec<Container>> {
    ok(backend.get_containers().await?)
}

async fn get_container(
    State(backend): State<MockBackend>,
    id: Param<String>,
) -> ApiResult<Container> {
    let Path(id) = id?;
    let container = backend
        .get_container(&id)
        .await
        .map_err(|e| ServerError::new(StatusCode::NOT_FOUND, e.to_string()))?;
    ok(container)
}

async fn control_container(
    State(backend): State<MockBackend>,
    params: Param<(String, String)>,
) -> ApiResult<()> {
    let Path((id, action)) = params?;
    let (action, message) = match action.as_str() {
        "start" => (Action::Start, "Container started successfully"),
        "stop" => (Action::Stop, "Container stopped successfully"),
        "restart" => (Action::Restart, "Container restarted successfully"),
        other => {
            return Err(ServerError::new(
                StatusCode::NOT_FOUND,
                format!("Unknown container action: {other}"),
            ));
        }
    };

    backend
        .control_container(&ContainerAction {
            container_id: id,
            action,
        })
        .await
        .map_err(|e| ServerError::new(StatusCode::NOT_FOUND, e.to_string()))?;
    ack(message)
}

async fn list_volumes(State(backend): State<MockBackend>) -> ApiResult<Vec<Volume>> {
    ok(backend.get_volumes().await?)
}

async fn explore_volume_files(
    State(backend): State<MockBackend>,
    name: Param<String>,
    query: Params<PathQuery>,
) -> ApiResult<Vec<VolumeFileInfo>> {
    let Path(name) = name?;
    let Query(query) = query?;
    ok(backend
        .explore_volume_files(&name, query.path.as_deref())
        .await?)
}

async fn read_volume_file(
    State(backend): State<MockBackend>,
    name: Param<String>,
    query: Params<PathQuery>,
) -> ApiResult<VolumeFileContent> {
    let Path(name) = name?;
    let Query(query) = query?;
    let path = query.required()?;
    ok(backend.read_volume_file(&name, &path).await?)
}

async fn delete_volume_file(
    State(backend): State<MockBackend>,
    name: Param<String>,
    query: Params<PathQuery>,
) -> ApiResult<()> {
    let Path(name) = name?;
    let Query(query) = query?;
    let path = query.required()?;
    backend.delete_volume_file(&name, &path).await?;
    ack("File deleted successfully")
}

async fn delete_volume(
    State(backend): State<MockBackend>,
    name: Param<String>,
) -> ApiResult<()> {
    let Path(name) = name?;
    backend.delete_volume(&name).await?;
    ack("Volume deleted successfully")
}

async fn get_config(State(backend): State<MockBackend>) -> ApiResult<SystemConfig> {
    ok(backend.get_config().await?)
}

async fn update_config(
    State(backend): State<MockBackend>,
    body: Body<SystemConfig>,
) -> ApiResult<SystemConfig> {
    let Json(config) = body?;
    let config = backend.update_config(&config).await?;
    Ok(Json(Envelope::success_with_message(
        config,
        "Configuration updated successfully",
    )))
}

async fn patch_config(
    State(backend): State<MockBackend>,
    body: Body<UpdateConfigRequest>,
) -> ApiResult<SystemConfig> {
    let Json(patch) = body?;
    let config = backend.patch_config(&patch).await?;
    Ok(Json(Envelope::success_with_message(
        config,
        "Configuration updated successfully",
    )))
}

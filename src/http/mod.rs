use axum::{
    Json, Router,
    extract::{FromRequest, Request, State},
    http::{StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    admin_token::{AdminTokenHash, AdminTokenHashError},
    config::Config,
    smt::{ConfigProxy, ConfigSnapshot},
    yast::RemoteCallError,
};


#[derive(Clone)]
pub struct AppState {
    pub smt: ConfigProxy,
}

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
    details: Map<String, Value>,
}

impl ApiError {
    fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status,
            details: Map::new(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new("invalid_request", StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_gateway(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(code, StatusCode::BAD_GATEWAY, message)
    }

    fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl From<RemoteCallError> for ApiError {
    fn from(value: RemoteCallError) -> Self {
        let method = value.method().to_string();
        ApiError::bad_gateway("remote_call_failed", value.to_string()).with_detail("method", method)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    details: Map<String, Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code.to_string(),
                message: self.message,
                details: self.details,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S>,
    <axum::Json<T> as FromRequest<S>>::Rejection: std::fmt::Display,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = axum::Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::invalid_request(e.to_string()))?;
        Ok(Self(value))
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Fails when the configured admin token hash is set but unusable, so a bad
/// setting can never leave `/api/smt` open.
pub fn build_router(
    config: &Config,
    smt: ConfigProxy,
) -> Result<Router, AdminTokenHashError> {
    let auth = AdminAuthState {
        admin_token_hash: config.admin_token_hash()?,
    };
    if auth.admin_token_hash.is_none() {
        warn!("no admin token hash configured; /api/smt is unauthenticated");
    }

    let state = AppState { smt };

    let protected = Router::new()
        .route("/smt", get(get_smt).put(put_smt))
        .layer(middleware::from_fn_with_state(auth, require_admin_auth));

    let api = Router::new()
        .route("/health", get(health))
        .merge(protected);

    Ok(Router::new().nest("/api", api).with_state(state))
}

#[derive(Clone)]
struct AdminAuthState {
    admin_token_hash: Option<AdminTokenHash>,
}

async fn require_admin_auth(
    State(auth): State<AdminAuthState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = auth.admin_token_hash.as_ref() else {
        return Ok(next.run(req).await);
    };

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

    if !expected.verify(token) {
        return Err(ApiError::unauthorized("invalid bearer token"));
    }

    Ok(next.run(req).await)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::version::VERSION,
    })
}

async fn get_smt(State(state): State<AppState>) -> Result<Json<ConfigSnapshot>, ApiError> {
    let snapshot = state.smt.retrieve().await?;
    Ok(Json(snapshot))
}

async fn put_smt(
    State(state): State<AppState>,
    ApiJson(snapshot): ApiJson<ConfigSnapshot>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    state.smt.submit(&snapshot).await?;
    Ok(Json(Map::new()))
}

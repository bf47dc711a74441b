//! Thin `axum` marshalling layer implementing `spec.md` §6's two routes.
//! Holds no session-engine logic: parse query params, call the façade,
//! translate the `Session` back into headers/JSON. Malformed input never
//! reaches the façade (§7's Input error category).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use sablier::engine::Target;
use sablier::instance::InstanceState;
use sablier::provider::Provider;
use sablier::session::Session;
use sablier::strategy::{BlockingRequest, Strategy, StrategyRequest};
use serde::Serialize;

pub struct AppState<P> {
    pub strategy: Strategy<P>,
}

pub fn router<P>(base_path: &str, state: Arc<AppState<P>>) -> Router
where
    P: Provider + 'static,
{
    let base = normalize_base_path(base_path);
    Router::new()
        .route(&format!("{base}/api/strategies/dynamic"), get(dynamic::<P>))
        .route(&format!("{base}/api/strategies/blocking"), get(blocking::<P>))
        .with_state(state)
}

fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_end_matches('/');
    trimmed.to_string()
}

#[derive(Debug, Serialize)]
struct InstanceView {
    name: String,
    current_replicas: u32,
    desired_replicas: u32,
    status: String,
    message: String,
}

impl From<&InstanceState> for InstanceView {
    fn from(state: &InstanceState) -> Self {
        Self {
            name: state.name.clone(),
            current_replicas: state.current_replicas,
            desired_replicas: state.desired_replicas,
            status: state.status.to_string(),
            message: state.message.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionView {
    instances: Vec<InstanceView>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SessionBody {
    session: SessionView,
}

fn session_response(session: Session) -> Response {
    let status_header = if session.is_ready() { "ready" } else { "not-ready" };
    let body = SessionBody {
        session: SessionView {
            instances: session.instances.iter().map(InstanceView::from).collect(),
            status: status_header,
            error: session.error.clone(),
        },
    };
    let mut response = (StatusCode::OK, Json(body)).into_response();
    response
        .headers_mut()
        .insert("X-Sablier-Session-Status", HeaderValue::from_static(status_header));
    response
}

#[derive(Debug, thiserror::Error)]
enum InputError {
    #[error("at least one of `names` or `group` query parameters is required")]
    MissingTarget,
    #[error("`session_duration` query parameter is required")]
    MissingSessionDuration,
    #[error("`timeout` query parameter is required")]
    MissingTimeout,
    #[error("invalid duration {field}={value:?}: {source}")]
    InvalidDuration { field: &'static str, value: String, source: humantime::DurationError },
}

impl IntoResponse for InputError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

fn parse_target(params: &HashMap<String, String>) -> Result<Target, InputError> {
    if let Some(group) = params.get("group").filter(|g| !g.is_empty()) {
        return Ok(Target::Group(group.clone()));
    }
    if let Some(names) = params.get("names").filter(|n| !n.is_empty()) {
        let names = names.split(',').map(str::trim).filter(|n| !n.is_empty()).map(String::from).collect::<Vec<_>>();
        if !names.is_empty() {
            return Ok(Target::Names(names));
        }
    }
    Err(InputError::MissingTarget)
}

fn parse_duration_param(
    params: &HashMap<String, String>,
    field: &'static str,
    missing: InputError,
) -> Result<Duration, InputError> {
    let raw = params.get(field).ok_or(missing)?;
    humantime::parse_duration(raw).map_err(|source| InputError::InvalidDuration { field, value: raw.clone(), source })
}

async fn dynamic<P>(
    State(state): State<Arc<AppState<P>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, InputError>
where
    P: Provider + 'static,
{
    let target = parse_target(&params)?;
    let session_duration = parse_duration_param(&params, "session_duration", InputError::MissingSessionDuration)?;

    let session = state.strategy.request_dynamic(StrategyRequest { target, session_duration }).await;
    Ok(session_response(session))
}

async fn blocking<P>(
    State(state): State<Arc<AppState<P>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, InputError>
where
    P: Provider + 'static,
{
    let target = parse_target(&params)?;
    let session_duration = parse_duration_param(&params, "session_duration", InputError::MissingSessionDuration)?;
    let timeout = parse_duration_param(&params, "timeout", InputError::MissingTimeout)?;

    let session = state.strategy.request_blocking(BlockingRequest { target, session_duration, timeout }).await;
    Ok(session_response(session))
}

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::error::ApiError;
use super::response::{success, ApiResponse};
use crate::accessors::{
    self, AccessorResult, DataTable, FilterOptions, MapData, NetworkSummary,
};
use crate::app::AppState;
use crate::network::{ComponentKind, Network};
use crate::registry::NetworkSource;
use crate::selection::Event;
use crate::session::Outcome;

type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/networks", get(list_networks).post(upload_network))
        .route("/networks/:label/summary", get(get_summary))
        .route("/networks/:label/filters", get(get_filters))
        .route("/networks/:label/map", get(get_map))
        .route("/networks/:label/metadata", get(get_metadata))
        .route("/networks/:label/statistics/:metric", get(get_statistics))
        .route("/networks/:label/components/:component", get(get_component))
        .route(
            "/networks/:label/components/:component/series",
            get(list_series),
        )
        .route(
            "/networks/:label/components/:component/series/:attribute",
            get(get_series),
        )
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(close_session))
        .route("/sessions/:id/network", post(select_network))
        .route("/sessions/:id/tab", post(select_tab))
        .route("/sessions/:id/filters", post(set_filters))
        .route("/sessions/:id/events", post(post_event))
        .with_state(state)
}

fn network(st: &AppState, label: &str) -> Result<std::sync::Arc<Network>, ApiError> {
    Ok(st.sessions.network(label)?)
}

fn component(name: &str) -> Result<ComponentKind, ApiError> {
    ComponentKind::from_str(name).map_err(|_| ApiError::NotFound(format!("unknown component '{name}'")))
}

// ============================================================================
// Networks
// ============================================================================

#[derive(Debug, Serialize)]
pub struct NetworkList {
    pub labels: Vec<String>,
    pub default: Option<String>,
}

pub async fn list_networks(State(st): State<AppState>) -> ApiResponse<NetworkList> {
    let labels = st.sessions.labels();
    let count = labels.len();
    success(NetworkList {
        labels,
        default: st.sessions.default_label(),
    })
    .with_count(count)
}

#[derive(Debug, Deserialize, Validate)]
pub struct UploadQuery {
    #[validate(length(min = 1, max = 128))]
    pub label: String,
}

/// POST /networks?label=X with a JSON network bundle as the body.
pub async fn upload_network(
    State(st): State<AppState>,
    Query(q): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    q.validate()?;
    let started = Instant::now();
    let label = q.label;

    let sessions = st.sessions.clone();
    let task_label = label.clone();
    let handle = tokio::task::spawn_blocking(move || {
        sessions.register(&task_label, NetworkSource::Bytes(body.to_vec()))
    })
    .await
    .map_err(|e| ApiError::InternalError(e.to_string()))??;

    let elapsed = started.elapsed().as_millis() as u64;
    info!(%label, duration_ms = elapsed, "network uploaded");
    Ok((
        StatusCode::CREATED,
        success(accessors::network_summary(&handle)).with_duration(elapsed),
    ))
}

pub async fn get_summary(
    State(st): State<AppState>,
    Path(label): Path<String>,
) -> ApiResult<NetworkSummary> {
    let handle = network(&st, &label)?;
    Ok(success(accessors::network_summary(&handle)))
}

pub async fn get_filters(
    State(st): State<AppState>,
    Path(label): Path<String>,
) -> ApiResult<FilterOptions> {
    let handle = network(&st, &label)?;
    Ok(success(accessors::filter_options(&handle)))
}

pub async fn get_map(State(st): State<AppState>, Path(label): Path<String>) -> ApiResult<MapData> {
    let handle = network(&st, &label)?;
    Ok(success(accessors::get_map_data(&handle)))
}

pub async fn get_metadata(
    State(st): State<AppState>,
    Path(label): Path<String>,
) -> ApiResult<String> {
    let handle = network(&st, &label)?;
    let yaml = accessors::metadata_yaml(&handle).map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(success(yaml))
}

/// Comma separated filter lists; absent or blank means "all".
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub carriers: Option<String>,
    pub countries: Option<String>,
}

fn split_list(raw: Option<&str>) -> BTreeSet<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn get_statistics(
    State(st): State<AppState>,
    Path((label, metric)): Path<(String, String)>,
    Query(q): Query<FilterQuery>,
) -> ApiResult<AccessorResult> {
    let handle = network(&st, &label)?;
    let result = accessors::get_statistics(
        &handle,
        &metric,
        &split_list(q.carriers.as_deref()),
        &split_list(q.countries.as_deref()),
    )?;
    Ok(success(result))
}

pub async fn get_component(
    State(st): State<AppState>,
    Path((label, name)): Path<(String, String)>,
) -> ApiResult<DataTable> {
    let handle = network(&st, &label)?;
    let kind = component(&name)?;
    let table = accessors::component_table(&handle, kind, st.cfg.explorer.table_max_rows);
    let total = table.total_rows;
    Ok(success(table).with_count(total))
}

pub async fn list_series(
    State(st): State<AppState>,
    Path((label, name)): Path<(String, String)>,
) -> ApiResult<Vec<String>> {
    let handle = network(&st, &label)?;
    let kind = component(&name)?;
    Ok(success(accessors::series_attributes(&handle, kind)))
}

pub async fn get_series(
    State(st): State<AppState>,
    Path((label, name, attribute)): Path<(String, String, String)>,
) -> ApiResult<DataTable> {
    let handle = network(&st, &label)?;
    let kind = component(&name)?;
    let table = accessors::component_series(&handle, kind, &attribute, st.cfg.explorer.table_max_rows)
        .ok_or_else(|| ApiError::NotFound(format!("no '{attribute}' data for {name}")))?;
    Ok(success(table))
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: Uuid,
    #[serde(flatten)]
    pub outcome: Outcome,
}

pub async fn create_session(State(st): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (id, outcome) = st.sessions.create_session()?;
    Ok((StatusCode::CREATED, success(SessionCreated { id, outcome })))
}

pub async fn get_session(State(st): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Outcome> {
    Ok(success(st.sessions.current(id)?))
}

pub async fn close_session(
    State(st): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if st.sessions.close_session(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("session {id} does not exist")))
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectNetworkBody {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectTabBody {
    pub tab: String,
}

#[derive(Debug, Deserialize)]
pub struct FiltersBody {
    #[serde(default)]
    pub carriers: BTreeSet<String>,
    #[serde(default)]
    pub countries: BTreeSet<String>,
}

fn dispatch(st: &AppState, id: Uuid, event: Event) -> ApiResult<Outcome> {
    Ok(success(st.sessions.handle_event(id, &event)?))
}

pub async fn select_network(
    State(st): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectNetworkBody>,
) -> ApiResult<Outcome> {
    dispatch(&st, id, Event::SelectNetwork { label: body.label })
}

pub async fn select_tab(
    State(st): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SelectTabBody>,
) -> ApiResult<Outcome> {
    dispatch(&st, id, Event::SelectTab { tab: body.tab })
}

pub async fn set_filters(
    State(st): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FiltersBody>,
) -> ApiResult<Outcome> {
    dispatch(
        &st,
        id,
        Event::SetFilters {
            carriers: body.carriers,
            countries: body.countries,
        },
    )
}

pub async fn post_event(
    State(st): State<AppState>,
    Path(id): Path<Uuid>,
    Json(event): Json<Event>,
) -> ApiResult<Outcome> {
    dispatch(&st, id, event)
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! REST surface. Every handler returns `Envelope<T>`: `{data: ...}` on
//! success, `{error: ...}` mapped to the status `MissionError` names.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mission_core::{Mission, MissionError, RunMessage};
use mission_wire::{Envelope, MissionListEntry, RelayMessageRequest, RunListEntry, StartMissionRequest};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::ws::ws_handler;
use crate::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/missions", get(list_missions).post(create_mission))
        .route("/api/missions/templates", get(list_templates).post(save_template))
        .route("/api/missions/templates/{id}", get(get_template).delete(delete_template))
        .route("/api/missions/runs", get(list_runs))
        .route("/api/missions/runs/{id}", get(get_run))
        .route("/api/missions/runs/{id}/abort", post(abort_run))
        .route("/api/missions/runs/{id}/retry/{node_id}", post(retry_node))
        .route("/api/missions/runs/{id}/messages", get(list_messages).post(relay_message))
        .route("/api/missions/{id}", get(get_mission).put(update_mission).delete(delete_mission))
        .route("/api/missions/{id}/run", post(start_mission))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

struct ApiError(MissionError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Envelope::<()>::err(self.0.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<MissionError> for ApiError {
    fn from(e: MissionError) -> Self {
        Self(e)
    }
}

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

async fn list_missions(State(state): State<AppState>) -> ApiResult<Vec<MissionListEntry>> {
    let entries = state.missions.list().iter().map(MissionListEntry::from).collect();
    Ok(Json(Envelope::ok(entries)))
}

async fn create_mission(State(state): State<AppState>, Json(mission): Json<Mission>) -> ApiResult<Mission> {
    let created = state.missions.create(mission)?;
    Ok(Json(Envelope::ok(created)))
}

async fn get_mission(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Mission> {
    let mission = state.missions.get(&id).ok_or(MissionError::MissionNotFound(id))?;
    Ok(Json(Envelope::ok(mission)))
}

async fn update_mission(State(state): State<AppState>, Path(id): Path<String>, Json(mut mission): Json<Mission>) -> ApiResult<Mission> {
    mission.id = mission_core::MissionId::from_string(id);
    let updated = state.missions.update(mission)?;
    Ok(Json(Envelope::ok(updated)))
}

async fn delete_mission(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<bool> {
    let deleted = state.missions.delete(&id)?;
    Ok(Json(Envelope::ok(deleted)))
}

async fn list_templates(State(state): State<AppState>) -> ApiResult<Vec<MissionListEntry>> {
    let entries = state.missions.list_templates().iter().map(MissionListEntry::from).collect();
    Ok(Json(Envelope::ok(entries)))
}

async fn save_template(State(state): State<AppState>, Json(template): Json<Mission>) -> ApiResult<Mission> {
    let saved = state.missions.save_template(template)?;
    Ok(Json(Envelope::ok(saved)))
}

async fn get_template(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Mission> {
    let template = state.missions.get_template(&id).ok_or(MissionError::TemplateNotFound(id))?;
    Ok(Json(Envelope::ok(template)))
}

async fn delete_template(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<bool> {
    let deleted = state.missions.delete_template(&id)?;
    Ok(Json(Envelope::ok(deleted)))
}

async fn start_mission(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<StartMissionRequest>) -> ApiResult<mission_core::Run> {
    let run = state.engine.start_mission(&id, body.context).await?;
    Ok(Json(Envelope::ok(run)))
}

#[derive(Deserialize)]
struct ListRunsQuery {
    #[serde(rename = "missionId")]
    mission_id: Option<String>,
}

async fn list_runs(State(state): State<AppState>, Query(params): Query<ListRunsQuery>) -> ApiResult<Vec<RunListEntry>> {
    let entries = state.runs.list(params.mission_id.as_deref()).iter().map(RunListEntry::from).collect();
    Ok(Json(Envelope::ok(entries)))
}

async fn get_run(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<mission_core::Run> {
    let run = state.runs.get(&id).ok_or(MissionError::RunNotFound(id))?;
    Ok(Json(Envelope::ok(run)))
}

async fn abort_run(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.engine.abort_mission(&id).await?;
    Ok(Json(Envelope::ok(())))
}

async fn retry_node(State(state): State<AppState>, Path((id, node_id)): Path<(String, String)>) -> ApiResult<()> {
    state.engine.retry_node(&id, &node_id).await?;
    Ok(Json(Envelope::ok(())))
}

async fn list_messages(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<RunMessage>> {
    let run = state.runs.get(&id).ok_or(MissionError::RunNotFound(id))?;
    Ok(Json(Envelope::ok(run.messages)))
}

async fn relay_message(State(state): State<AppState>, Path(id): Path<String>, Json(body): Json<RelayMessageRequest>) -> ApiResult<()> {
    state.engine.relay_message(&id, &body.from, &body.to, &body.content)?;
    Ok(Json(Envelope::ok(())))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use mission_core::{Mission, Node, TaskFile, TaskFileStatus, TeamConfig};
use mission_provider::{write_task_file, AgentProvider, ProviderError, ProviderRegistry};
use mission_store::{MissionStore, RunStore, StoreRoot};
use mission_watcher::TeamWatcher;
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

use crate::{http, AppState};

/// A provider that resolves every node instantly with a canned output by
/// writing a completed task file, the same protocol a subprocess-backed
/// provider uses, so router tests exercise real engine state transitions
/// without spawning a subprocess.
struct FakeProvider {
    root: StoreRoot,
}

#[async_trait]
impl AgentProvider for FakeProvider {
    async fn initialize_team(&self, _run_id: &str, _mission: &Mission) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn execute_node(&self, node: &Node, _resolved_prompt: &str, run_id: &str, _workdir: Option<&std::path::Path>) -> Result<String, ProviderError> {
        let team_name = TeamConfig::run_team_name(run_id);
        let mut task = TaskFile::new_pending(&node.id, &node.id);
        task.status = TaskFileStatus::Completed;
        task.output = Some("done".to_string());
        let _ = write_task_file(&self.root, &team_name, &task);
        Ok(format!("agent-{}", node.id))
    }

    async fn abort_node(&self, _run_id: &str, _node_id: &str) {}

    fn cleanup_run(&self, _run_id: &str) {}

    fn is_process_alive(&self, _agent_id: &str) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supported_agent_types(&self) -> Vec<&'static str> {
        vec!["fake"]
    }

    fn provider_info(&self) -> &'static str {
        "fake"
    }
}

fn test_state(root: &StoreRoot) -> AppState {
    let mut providers = ProviderRegistry::new();
    providers.register("claude-code", Arc::new(FakeProvider { root: root.clone() }));
    let bus = mission_engine::EventBus::new();
    let engine = mission_engine::Engine::new(root.clone(), providers, bus.clone());
    AppState {
        engine,
        watcher: Arc::new(TeamWatcher::new(root.clone(), bus)),
        missions: Arc::new(MissionStore::new(root.clone())),
        runs: Arc::new(RunStore::new(root.clone())),
    }
}

fn sample_mission() -> Mission {
    Mission {
        id: mission_core::MissionId::new(),
        name: "demo".to_string(),
        description: String::new(),
        nodes: vec![Node {
            id: "a".to_string(),
            label: "A".to_string(),
            agent_type: "general".to_string(),
            prompt: "do the thing".to_string(),
            config: Default::default(),
            provider: "claude-code".to_string(),
            model: None,
            mcp_servers: vec![],
            skills: vec![],
            legacy_droid_class: None,
            unit_class: None,
        }],
        edges: vec![],
        context: Default::default(),
        updated_at: String::new(),
    }
}

#[tokio::test]
async fn missing_mission_returns_404_with_error_envelope() {
    let dir = tempdir().expect("tempdir");
    let root = StoreRoot::new(dir.path());
    let app = http::router(test_state(&root));

    let req = Request::builder().uri("/api/missions/msn-nope").body(Body::empty()).expect("request");
    let resp = app.oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    assert!(payload.get("error").is_some());
}

#[tokio::test]
async fn create_then_get_mission_round_trips() {
    let dir = tempdir().expect("tempdir");
    let root = StoreRoot::new(dir.path());
    let app = http::router(test_state(&root));

    let mission = sample_mission();
    let body = serde_json::to_vec(&mission).expect("serialize");
    let req = Request::builder().method("POST").uri("/api/missions").header("content-type", "application/json").body(Body::from(body)).expect("request");
    let resp = app.clone().oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    let id = payload["data"]["id"].as_str().expect("id").to_string();

    let req = Request::builder().uri(format!("/api/missions/{id}")).body(Body::empty()).expect("request");
    let resp = app.oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn starting_a_mission_runs_it_to_completion() {
    let dir = tempdir().expect("tempdir");
    let root = StoreRoot::new(dir.path());
    let state = test_state(&root);
    let mission = state.missions.create(sample_mission()).expect("create mission");
    let runs = state.runs.clone();
    let app = http::router(state);

    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/missions/{}/run", mission.id.as_str()))
        .header("content-type", "application/json")
        .body(Body::from("{}"))
        .expect("request");
    let resp = app.oneshot(req).await.expect("response");
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let payload: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(payload["data"]["status"], "RUNNING");
    let run_id = payload["data"]["id"].as_str().expect("run id").to_string();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(15);
    loop {
        if runs.get(&run_id).map(|r| r.status == mission_core::RunStatus::Completed).unwrap_or(false) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "run never completed");
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    }
}

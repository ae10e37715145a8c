// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mission_core::{NodeConfig, NodeStatus, RunStatus};
use mission_engine::{Engine, EventBus};
use mission_provider::ProviderRegistry;
use mission_store::{MissionStore, RunStore, StoreRoot};
use tempfile::tempdir;

use crate::support::{edge, mission, node, wait_until, Behavior, FakeProvider};

fn engine_with(root: &StoreRoot, behaviors: FakeProvider) -> Arc<Engine> {
    let mut providers = ProviderRegistry::new();
    providers.register("claude-code", Arc::new(behaviors));
    Engine::new(root.clone(), providers, EventBus::new())
}

#[tokio::test]
async fn linear_pipeline_completes_in_order() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());

    let m = missions
        .create(mission(
            "linear",
            vec![node("a", NodeConfig::default()), node("b", NodeConfig::default()), node("c", NodeConfig::default())],
            vec![edge("a", "b"), edge("b", "c")],
        ))
        .unwrap();

    let provider = FakeProvider::new(
        root.clone(),
        HashMap::from([("a".to_string(), Behavior::Succeed("a-out")), ("b".to_string(), Behavior::Succeed("b-out")), ("c".to_string(), Behavior::Succeed("c-out"))]),
    );
    let engine = engine_with(&root, provider);

    let run = engine.start_mission(m.id.as_str(), HashMap::new()).await.unwrap();
    let runs = RunStore::new(root.clone());

    let completed = wait_until(|| runs.get(run.id.as_str()).map(|r| r.status == RunStatus::Completed).unwrap_or(false), Duration::from_secs(30)).await;
    assert!(completed, "run never completed");

    let final_run = runs.get(run.id.as_str()).unwrap();
    for id in ["a", "b", "c"] {
        let state = &final_run.node_states[id];
        assert_eq!(state.status, NodeStatus::Completed);
    }
    assert_eq!(final_run.node_states["b"].output.as_deref(), Some("b-out"));
}

#[tokio::test]
async fn fan_out_fan_in_joins_at_final_node() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());

    let m = missions
        .create(mission(
            "diamond",
            vec![node("a", NodeConfig::default()), node("b", NodeConfig::default()), node("c", NodeConfig::default()), node("d", NodeConfig::default())],
            vec![edge("a", "b"), edge("a", "c"), edge("b", "d"), edge("c", "d")],
        ))
        .unwrap();

    let provider = FakeProvider::new(
        root.clone(),
        HashMap::from([
            ("a".to_string(), Behavior::Succeed("a-out")),
            ("b".to_string(), Behavior::Succeed("b-out")),
            ("c".to_string(), Behavior::Succeed("c-out")),
            ("d".to_string(), Behavior::Succeed("d-out")),
        ]),
    );
    let engine = engine_with(&root, provider);

    let run = engine.start_mission(m.id.as_str(), HashMap::new()).await.unwrap();
    let runs = RunStore::new(root.clone());

    let completed = wait_until(|| runs.get(run.id.as_str()).map(|r| r.status == RunStatus::Completed).unwrap_or(false), Duration::from_secs(60)).await;
    assert!(completed, "run never completed");

    let final_run = runs.get(run.id.as_str()).unwrap();
    for id in ["a", "b", "c", "d"] {
        assert_eq!(final_run.node_states[id].status, NodeStatus::Completed);
    }
}

#[tokio::test]
async fn retry_then_succeed_completes_after_retries() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());

    let config = NodeConfig { timeout_seconds: None, retries: 1 };
    let m = missions.create(mission("retry-ok", vec![node("a", config)], vec![])).unwrap();

    let provider = FakeProvider::single(root.clone(), "a", Behavior::FailThenSucceed { fail_times: 1, output: "eventually" });
    let engine = engine_with(&root, provider);

    let run = engine.start_mission(m.id.as_str(), HashMap::new()).await.unwrap();
    let runs = RunStore::new(root.clone());

    let completed = wait_until(|| runs.get(run.id.as_str()).map(|r| r.status == RunStatus::Completed).unwrap_or(false), Duration::from_secs(30)).await;
    assert!(completed, "run never completed after retry");

    let final_run = runs.get(run.id.as_str()).unwrap();
    let state = &final_run.node_states["a"];
    assert_eq!(state.status, NodeStatus::Completed);
    assert_eq!(state.retry_count, 1);
    assert_eq!(state.output.as_deref(), Some("eventually"));
}

#[tokio::test]
async fn retry_exhausted_fails_the_run() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());

    let config = NodeConfig { timeout_seconds: None, retries: 1 };
    let m = missions.create(mission("retry-exhausted", vec![node("a", config)], vec![])).unwrap();

    let provider = FakeProvider::single(root.clone(), "a", Behavior::AlwaysFail);
    let engine = engine_with(&root, provider);

    let run = engine.start_mission(m.id.as_str(), HashMap::new()).await.unwrap();
    let runs = RunStore::new(root.clone());

    let failed = wait_until(|| runs.get(run.id.as_str()).map(|r| r.status == RunStatus::Failed).unwrap_or(false), Duration::from_secs(20)).await;
    assert!(failed, "run never failed");

    let final_run = runs.get(run.id.as_str()).unwrap();
    assert_eq!(final_run.node_states["a"].status, NodeStatus::Failed);
    assert_eq!(final_run.node_states["a"].retry_count, 1);
}

#[tokio::test]
async fn timeout_kills_a_hung_node() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());

    let config = NodeConfig { timeout_seconds: Some(1), retries: 0 };
    let m = missions.create(mission("timeout", vec![node("a", config)], vec![])).unwrap();

    let provider = FakeProvider::single(root.clone(), "a", Behavior::Hang);
    let engine = engine_with(&root, provider);

    let run = engine.start_mission(m.id.as_str(), HashMap::new()).await.unwrap();
    let runs = RunStore::new(root.clone());

    let failed = wait_until(|| runs.get(run.id.as_str()).map(|r| r.status == RunStatus::Failed).unwrap_or(false), Duration::from_secs(15)).await;
    assert!(failed, "run never failed after node timeout");

    let final_run = runs.get(run.id.as_str()).unwrap();
    assert_eq!(final_run.node_states["a"].status, NodeStatus::Timeout);
}

#[tokio::test]
async fn abort_mid_run_marks_run_aborted() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());

    let m = missions
        .create(mission(
            "abort-me",
            vec![node("a", NodeConfig::default()), node("b", NodeConfig::default()), node("c", NodeConfig::default())],
            vec![],
        ))
        .unwrap();

    let provider = FakeProvider::new(
        root.clone(),
        HashMap::from([("a".to_string(), Behavior::Hang), ("b".to_string(), Behavior::Hang), ("c".to_string(), Behavior::Hang)]),
    );
    let engine = engine_with(&root, provider);

    let run = engine.start_mission(m.id.as_str(), HashMap::new()).await.unwrap();

    // Give the poller one tick to spawn all three root nodes before aborting.
    tokio::time::sleep(Duration::from_millis(200)).await;
    engine.abort_mission(run.id.as_str()).await.unwrap();

    let runs = RunStore::new(root.clone());
    let final_run = runs.get(run.id.as_str()).unwrap();
    assert_eq!(final_run.status, RunStatus::Aborted);
    for id in ["a", "b", "c"] {
        assert_eq!(final_run.node_states[id].status, NodeStatus::Failed);
        assert_eq!(final_run.node_states[id].error.as_deref(), Some("Run aborted"));
    }
}

#[tokio::test]
async fn resume_after_restart_reattaches_and_completes() {
    let dir = tempdir().unwrap();
    let root = StoreRoot::new(dir.path());
    let missions = MissionStore::new(root.clone());
    let runs = RunStore::new(root.clone());

    let m = missions.create(mission("resume", vec![node("a", NodeConfig::default())], vec![])).unwrap();

    // Simulate a run left behind by a previous, now-dead process: the
    // run record exists and is `RUNNING`, but nothing is polling it.
    let run = runs.create_run(&m, None, mission_core::format_utc_now(), HashMap::new()).unwrap();
    assert_eq!(run.status, RunStatus::Running);

    let provider = FakeProvider::single(root.clone(), "a", Behavior::Succeed("resumed-out"));
    let engine = engine_with(&root, provider);
    engine.resume_active_runs();

    let completed = wait_until(|| runs.get(run.id.as_str()).map(|r| r.status == RunStatus::Completed).unwrap_or(false), Duration::from_secs(15)).await;
    assert!(completed, "resumed run never completed");

    let final_run = runs.get(run.id.as_str()).unwrap();
    assert_eq!(final_run.node_states["a"].output.as_deref(), Some("resumed-out"));
}

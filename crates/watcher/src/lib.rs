// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The team watcher: a reverse filesystem poller that derives
//! UI-visible agent presence from the files the provider writes.
//!
//! The engine is authoritative about logical node/run state; this is
//! authoritative about *presence* — it is the only component that
//! notices an agent disappearing, since nothing else watches for a
//! provider process that stops writing.

use mission_core::{TaskFile, TaskFileStatus, TeamConfig, TeamMember};
use mission_engine::EventBus;
use mission_provider::remove_run_dirs;
use mission_store::{read_json, RunStore, StoreRoot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const POLL_INTERVAL: Duration = Duration::from_millis(2500);

const TEAM_LEAD: &str = "team-lead";

struct TrackedTeam {
    /// Member name -> last-observed task description.
    members: HashMap<String, Option<String>>,
}

pub struct TeamWatcher {
    store_root: StoreRoot,
    runs: RunStore,
    bus: EventBus,
    state: Mutex<HashMap<String, TrackedTeam>>,
}

impl TeamWatcher {
    pub fn new(store_root: StoreRoot, bus: EventBus) -> Self {
        Self { runs: RunStore::new(store_root.clone()), store_root, bus, state: Mutex::new(HashMap::new()) }
    }

    /// Spawn the 2.5 s poll loop.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            loop {
                interval.tick().await;
                self.tick();
            }
        })
    }

    /// One poll pass. Synchronous: the watcher's own state map is only
    /// ever touched from this method, so it is single-threaded by
    /// construction even though it runs inside an async task.
    fn tick(&self) {
        let Ok(entries) = std::fs::read_dir(self.store_root.teams_dir()) else { return };

        let mut current: HashMap<String, TeamConfig> = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let Some(team_name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            let Some(config) = read_json::<TeamConfig>(&path.join("config.json")) else { continue };

            if TeamConfig::is_run_team(team_name) && self.run_is_terminal_or_missing(team_name) {
                // The run ended but filesystem cleanup lagged; treat as absent
                // and finish the job cleanup ourselves.
                remove_run_dirs(&self.store_root, team_name);
                continue;
            }
            current.insert(team_name.to_string(), config);
        }

        let mut state = self.state.lock();

        let vanished: Vec<String> = state.keys().filter(|name| !current.contains_key(*name)).cloned().collect();
        for team_name in vanished {
            if let Some(team) = state.remove(&team_name) {
                for member_name in team.members.keys() {
                    self.bus.publish(mission_core::EngineEvent::AgentRemoved { agent_id: agent_id(&team_name, member_name) });
                }
            }
        }

        for (team_name, config) in &current {
            let team = state.entry(team_name.clone()).or_insert_with(|| {
                let mut members = HashMap::new();
                if !config.has_team_lead() {
                    members.insert(TEAM_LEAD.to_string(), None);
                    self.bus.publish(mission_core::EngineEvent::AgentSpawned {
                        agent_id: agent_id(team_name, TEAM_LEAD),
                        team: team_name.clone(),
                        task: None,
                    });
                }
                TrackedTeam { members }
            });

            let current_names: std::collections::HashSet<&str> =
                config.members.iter().map(|m| m.name.as_str()).collect();

            let departed: Vec<String> = team
                .members
                .keys()
                .filter(|name| name.as_str() != TEAM_LEAD && !current_names.contains(name.as_str()))
                .cloned()
                .collect();
            for member_name in departed {
                team.members.remove(&member_name);
                let id = agent_id(team_name, &member_name);
                self.bus.publish(mission_core::EngineEvent::AgentCompleting { agent_id: id.clone(), status: "success".to_string() });
                self.bus.publish(mission_core::EngineEvent::AgentRemoved { agent_id: id });
            }

            for member in &config.members {
                let task = self.resolve_task(team_name, member);
                match team.members.get(&member.name) {
                    None => {
                        team.members.insert(member.name.clone(), task.clone());
                        self.bus.publish(mission_core::EngineEvent::AgentSpawned {
                            agent_id: agent_id(team_name, &member.name),
                            team: team_name.clone(),
                            task,
                        });
                    }
                    Some(last) if *last != task => {
                        team.members.insert(member.name.clone(), task.clone());
                        self.bus.publish(mission_core::EngineEvent::AgentUpdated { agent_id: agent_id(team_name, &member.name), task });
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn run_is_terminal_or_missing(&self, team_name: &str) -> bool {
        let Some(run_id) = team_name.strip_prefix("run-") else { return false };
        match self.runs.get(run_id) {
            Some(run) => run.status.is_terminal(),
            None => true,
        }
    }

    /// Prefer an `in_progress` task file over a merely `pending` one
    /// when a member owns more than one.
    fn resolve_task(&self, team_name: &str, member: &TeamMember) -> Option<String> {
        let owner_key = member.node_id.as_deref().unwrap_or(&member.name);
        let dir = self.store_root.task_dir(team_name);
        let entries = std::fs::read_dir(&dir).ok()?;

        let mut best: Option<TaskFile> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(task) = read_json::<TaskFile>(&path) else { continue };
            if task.owner != owner_key {
                continue;
            }
            let take = match &best {
                None => true,
                Some(b) => task.status == TaskFileStatus::InProgress && b.status != TaskFileStatus::InProgress,
            };
            if take {
                best = Some(task);
            }
        }

        best.map(|t| if t.description.is_empty() { t.subject } else { t.description })
    }

    /// Snapshot of every agent id currently tracked, across all teams.
    /// Used to seed a new subscriber's init event.
    pub fn active_agent_ids(&self) -> std::collections::HashSet<String> {
        let state = self.state.lock();
        state.iter().flat_map(|(team_name, team)| team.members.keys().map(|member_name| agent_id(team_name, member_name))).collect()
    }

    /// Force-complete a team's tracked agents outside the normal poll
    /// cadence (e.g. an admin-triggered clear), emitting a single
    /// `agents_cleared` rather than one `agent_removed` per member.
    pub fn force_clear(&self, team_name: &str) {
        let mut state = self.state.lock();
        if state.remove(team_name).is_some() {
            self.bus.publish(mission_core::EngineEvent::AgentsCleared { team: team_name.to_string() });
        }
    }
}

fn agent_id(team_name: &str, member_name: &str) -> String {
    format!("team:{team_name}:{member_name}")
}

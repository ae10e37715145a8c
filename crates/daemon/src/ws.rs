// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single real-time channel: every `EngineEvent` pushed as JSON,
//! plus inbound control messages (`abort_run`, `retry_node`,
//! `relay_message`) equivalent to their REST counterparts.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use mission_core::InitSnapshot;
use mission_wire::Request;
use tracing::warn;

use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let mut events = state.engine.bus().subscribe();

    let snapshot = InitSnapshot {
        active_runs: state.engine.get_active_runs().into_iter().collect(),
        active_agents: state.watcher.active_agent_ids(),
    };
    if let Ok(text) = serde_json::to_string(&snapshot) {
        if socket.send(Message::Text(text.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => {
                let Ok(event) = event else { break };
                let Ok(text) = serde_json::to_string(&event) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Err(e) = handle_request(&state, &text).await {
                            warn!(error = %e, "websocket control message failed");
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

async fn handle_request(state: &AppState, text: &str) -> Result<(), mission_core::MissionError> {
    let request: Request = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "unparseable websocket control message");
            return Ok(());
        }
    };
    match request {
        Request::AbortRun { run_id } => state.engine.abort_mission(&run_id).await,
        Request::RetryNode { run_id, node_id } => state.engine.retry_node(&run_id, &node_id).await,
        Request::RelayMessage { run_id, from, to, content } => state.engine.relay_message(&run_id, &from, &to, &content),
    }
}

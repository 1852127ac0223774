// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Websocket handlers (§6): the dashboard snapshot stream and the
//! per-session terminal stream.

use super::AppState;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use schmux_core::SessionId;
use schmux_engine::TerminalFrame;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub async fn dashboard_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_dashboard(socket, state))
}

async fn handle_dashboard(mut socket: WebSocket, state: AppState) {
    let (subscriber_id, mut rx) = state.broadcaster.subscribe();
    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                let Ok(text) = serde_json::to_string(message.as_ref()) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
    let _ = socket.send(Message::Close(Some(CloseFrame { code: 1000, reason: "".into() }))).await;
    state.broadcaster.unsubscribe(subscriber_id);
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Input { data: String },
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Append { content: String },
    Full { content: String },
}

pub async fn terminal_ws(ws: WebSocketUpgrade, State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    ws.on_upgrade(move |socket| handle_terminal(socket, state, SessionId::from_string(session_id)))
}

async fn handle_terminal(mut socket: WebSocket, state: AppState, session_id: SessionId) {
    let (subscriber_id, mut rx) = match state.terminal.attach(&session_id).await {
        Ok(pair) => pair,
        Err(err) => {
            warn!(session_id = %session_id, error = %err, "terminal attach failed");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                let server_message = match frame {
                    TerminalFrame::Append(content) => ServerMessage::Append { content },
                    TerminalFrame::Full(content) => ServerMessage::Full { content },
                };
                let Ok(text) = serde_json::to_string(&server_message) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => handle_client_text(&state, &session_id, subscriber_id, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
    let _ = socket.send(Message::Close(Some(CloseFrame { code: 1000, reason: "".into() }))).await;
    state.terminal.detach(&session_id, subscriber_id);
}

async fn handle_client_text(state: &AppState, session_id: &SessionId, subscriber_id: u64, text: &str) {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("pause") {
        state.terminal.set_paused(session_id, subscriber_id, true);
        return;
    }
    if trimmed.eq_ignore_ascii_case("resume") {
        state.terminal.set_paused(session_id, subscriber_id, false);
        return;
    }
    if let Ok(ClientMessage::Input { data }) = serde_json::from_str::<ClientMessage>(text) {
        if let Err(err) = state.terminal.send_input(session_id, &data).await {
            warn!(session_id = %session_id, error = %err, "terminal send_input failed");
        }
    }
}

//! Group sync endpoints: the WebSocket channel and the HTTP fallback.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiJson};
use crate::models::Task;
use crate::server::AppState;
use crate::sync::{self, ClientMessage, GroupHub};

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupTasks {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Serialize)]
pub struct ReplaceResponse {
    pub success: bool,
    pub tasks: Vec<Task>,
}

fn check_group(group_id: &str) -> Result<(), ApiError> {
    if sync::valid_group_id(group_id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!("invalid group id: {group_id}")))
    }
}

/// `GET /api/groups/:group_id/tasks`
pub async fn get_group_tasks(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> Result<Json<GroupTasks>, ApiError> {
    check_group(&group_id)?;
    Ok(Json(GroupTasks {
        tasks: state.hub.tasks(&group_id),
    }))
}

/// `POST /api/groups/:group_id/tasks`: replace the list and broadcast it.
pub async fn replace_group_tasks(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    ApiJson(body): ApiJson<GroupTasks>,
) -> Result<Json<ReplaceResponse>, ApiError> {
    check_group(&group_id)?;
    let tasks = state.hub.replace_tasks(&group_id, body.tasks);
    Ok(Json(ReplaceResponse { success: true, tasks }))
}

/// `GET /ws` — upgrade to the sync channel.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

/// Pump frames between one socket and the hub until either side closes.
async fn handle_socket(mut socket: WebSocket, hub: Arc<GroupHub>) {
    let (client, mut outbox) = hub.connect();

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(cmd) => hub.handle(&client, cmd),
                        Err(e) => tracing::warn!(client = %client.id, error = %e, "undecodable sync frame"),
                    },
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }

            update = outbox.recv() => {
                let Some(update) = update else { break };
                let text = match serde_json::to_string(&update) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(client = %client.id, error = %e, "failed to encode update");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    hub.disconnect(client.id);
    let _ = socket.close().await;
}

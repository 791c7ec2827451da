//! WebSocket chat endpoint.
//!
//! Connection lifecycle:
//! 1. Client opens `GET /ws?username=<name>` (falls back to the configured user name)
//! 2. Server builds a [`ChatSession`] with its own DB connection and agents
//! 3. Server sends the greeting
//! 4. Each text frame gets exactly one text reply, in order
//! 5. Close (or a transport error) ends the session and drops its buffers
//!
//! Session setup and every turn run on the blocking pool: agent calls go
//! through a blocking HTTP client.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::api::types::ApiContext;
use crate::chat::{ChatError, ChatSession, Dispatcher, GREETING};
use crate::db::open_database;

#[derive(Deserialize)]
pub struct ChatQuery {
    username: Option<String>,
}

/// Name the session runs as: the query parameter verbatim if non-blank, else the fallback.
fn session_user_name(query: ChatQuery, fallback: &str) -> String {
    query
        .username
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// `GET /ws`
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(ctx): State<ApiContext>,
    Query(query): Query<ChatQuery>,
) -> impl IntoResponse {
    let user_name = session_user_name(query, &ctx.config.fallback_user_name);
    tracing::info!(user = %user_name, "Chat WebSocket upgrade accepted");
    ws.on_upgrade(move |socket| handle_ws(socket, ctx, user_name))
}

/// Build the per-connection session: store, agents, retriever, transcript.
fn open_session(ctx: &ApiContext, user_name: &str) -> Result<ChatSession, ChatError> {
    let directory = open_database(&ctx.config.database_path)?;
    let agents = ctx.agents.session_agents(user_name)?;
    let dispatcher = Dispatcher::new(
        Box::new(directory),
        agents,
        ctx.retriever.clone(),
        ctx.config.retrieval_top_k,
    );
    Ok(ChatSession::new(
        user_name,
        ctx.config.conversation_window,
        dispatcher,
        ctx.transcripts.clone(),
    )?)
}

async fn handle_ws(mut socket: WebSocket, ctx: ApiContext, user_name: String) {
    let opened = {
        let name = user_name.clone();
        tokio::task::spawn_blocking(move || open_session(&ctx, &name)).await
    };

    let mut session = match opened {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => {
            tracing::warn!(user = %user_name, "Chat session setup failed: {e}");
            let _ = socket.send(Message::Text(format!("Bot Error: {e}"))).await;
            let _ = socket.close().await;
            return;
        }
        Err(e) => {
            tracing::error!(user = %user_name, "Chat session setup panicked: {e}");
            let _ = socket.close().await;
            return;
        }
    };

    if socket.send(Message::Text(GREETING.to_string())).await.is_err() {
        return;
    }

    while let Some(frame) = socket.recv().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(user = %user_name, "WebSocket receive error: {e}");
                break;
            }
        };

        let turn = tokio::task::spawn_blocking(move || {
            let reply = session.handle_message(&text);
            (session, reply)
        })
        .await;

        let reply = match turn {
            Ok((returned, reply)) => {
                session = returned;
                reply
            }
            Err(e) => {
                tracing::error!(user = %user_name, "Chat turn panicked: {e}");
                return;
            }
        };

        if socket.send(Message::Text(reply)).await.is_err() {
            break;
        }
    }

    tracing::info!(user = %user_name, "Chat session closed");
    // Agents may own blocking HTTP clients; release them off the async workers.
    let _ = tokio::task::spawn_blocking(move || drop(session)).await;
}

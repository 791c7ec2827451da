//! HTTP API and chat WebSocket.
//!
//! `build_router()` returns the full axum `Router`; protected routes sit
//! behind a middleware stack of Auth → (Doctor gate) → Audit.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;
pub mod websocket;

pub use router::build_router;
pub use server::{serve_until_ctrl_c, start_server, ApiServer, ServerSession};
pub use types::ApiContext;

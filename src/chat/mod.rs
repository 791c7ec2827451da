//! Chat routing core behind the `/ws` endpoint.
//!
//! Each inbound message is classified by keyword ([`classify`]), optionally
//! augmented with pre-fetched slot data ([`prefetch`]), and handed to one of
//! three agents by the [`Dispatcher`]. A [`ChatSession`] owns the per-connection
//! conversation buffers and writes every turn to the user's transcript.

pub mod buffer;
pub mod classify;
pub mod dispatch;
pub mod prefetch;
pub mod session;

pub use buffer::{ConversationBuffer, ConversationEntry, Role};
pub use classify::{classify, wants_slot_listing, Intent, RoutingRule, ROUTING_RULES};
pub use dispatch::{Dispatcher, SessionBuffers};
pub use prefetch::SlotDirectory;
pub use session::{ChatSession, GREETING};

use thiserror::Error;

use crate::agents::AgentError;
use crate::db::DatabaseError;
use crate::transcript::TranscriptError;

/// Failures while handling one chat message. Rendered to the client as `Bot Error: <msg>`.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

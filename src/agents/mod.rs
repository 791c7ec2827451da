//! LLM-backed agents behind the chat router and the doctor endpoints.
//!
//! Conversation agents run a bounded tool-calling loop against an
//! [`LlmClient`](crate::llm::LlmClient). Tool traffic never leaves the agent:
//! callers see only the user/assistant conversation and the final answer.

pub mod appointments;
pub mod lab_report;
pub mod medical;
#[cfg(test)]
pub mod mock;
pub mod prompts;
pub mod provider;
pub mod runner;
pub mod summary;

pub use appointments::AppointmentAgent;
pub use medical::MedicalAgent;
pub use provider::LlmAgentProvider;
pub use runner::{Toolbox, ToolError, MAX_TOOL_ROUNDS};
pub use summary::ConsultationSummarizer;

use thiserror::Error;

use crate::chat::ConversationEntry;
use crate::db::DatabaseError;
use crate::knowledge::KnowledgeError;
use crate::llm::LlmError;
use crate::transcript::TranscriptError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Knowledge(#[from] KnowledgeError),

    #[error("Agent gave no answer after {0} tool rounds")]
    ToolLoopExhausted(usize),
}

/// Result of one agent invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    /// The conversation as the agent leaves it, without its final answer.
    pub conversation: Vec<ConversationEntry>,
    /// Text of the final assistant turn.
    pub response: String,
}

/// An agent that answers the last user turn of a conversation.
pub trait ConversationAgent: Send {
    fn invoke(&mut self, conversation: &[ConversationEntry]) -> Result<AgentReply, AgentError>;
}

/// Produces a consultation summary for a user from their stored transcript.
pub trait SummaryAgent: Send {
    fn summarize(&mut self, user_name: &str) -> Result<String, AgentError>;
}

/// The three agents a chat session dispatches to.
pub struct SessionAgents {
    pub medical: Box<dyn ConversationAgent>,
    pub appointments: Box<dyn ConversationAgent>,
    pub summary: Box<dyn SummaryAgent>,
}

/// Builds per-session agents and answers one-shot LLM requests.
///
/// All methods block; call them from `spawn_blocking`.
pub trait AgentProvider: Send + Sync {
    /// Fresh agents bound to `user_name`.
    fn session_agents(&self, user_name: &str) -> Result<SessionAgents, AgentError>;

    /// Short problem description for an appointment, from the patient's transcript.
    fn patient_problem(&self, patient: &str) -> Result<String, AgentError>;

    /// Plain-language analysis of lab report text.
    fn analyze_lab_report(&self, report_text: &str) -> Result<String, AgentError>;
}

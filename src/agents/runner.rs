use serde_json::Value;
use thiserror::Error;

use super::AgentError;
use crate::chat::{ConversationEntry, Role};
use crate::db::DatabaseError;
use crate::llm::{ChatMessage, LlmClient, ToolDefinition};

/// Model turns allowed per invocation before giving up.
pub const MAX_TOOL_ROUNDS: usize = 6;

#[derive(Error, Debug)]
pub enum ToolError {
    /// Reported back to the model so it can correct itself.
    #[error("{0}")]
    Rejected(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    Unknown(String),

    /// Aborts the invocation.
    #[error(transparent)]
    Store(#[from] DatabaseError),
}

/// A set of tools an agent offers the model.
pub trait Toolbox {
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn call(&mut self, name: &str, arguments: &Value) -> Result<String, ToolError>;
}

/// Drive the model until it answers without requesting tools.
pub fn run_tool_loop(
    llm: &dyn LlmClient,
    model: &str,
    system_prompt: &str,
    conversation: &[ConversationEntry],
    toolbox: &mut dyn Toolbox,
) -> Result<String, AgentError> {
    let definitions = toolbox.definitions();
    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.push(ChatMessage::system(system_prompt));
    messages.extend(conversation.iter().map(to_chat_message));

    for round in 0..MAX_TOOL_ROUNDS {
        let reply = llm.chat(model, &messages, &definitions)?;
        if reply.tool_calls.is_empty() {
            return Ok(reply.content);
        }

        let calls = reply.tool_calls.clone();
        messages.push(reply);
        for call in calls {
            let name = call.function.name;
            tracing::debug!(round, tool = %name, "Agent tool call");
            let output = match toolbox.call(&name, &call.function.arguments) {
                Ok(output) => output,
                Err(ToolError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    tracing::info!(tool = %name, "Tool call rejected: {e}");
                    format!("Error: {e}")
                }
            };
            messages.push(ChatMessage::tool_result(name, output));
        }
    }

    Err(AgentError::ToolLoopExhausted(MAX_TOOL_ROUNDS))
}

fn to_chat_message(entry: &ConversationEntry) -> ChatMessage {
    match entry.role {
        Role::User => ChatMessage::user(entry.content.clone()),
        Role::Assistant => ChatMessage::assistant(entry.content.clone()),
    }
}

// ═══════════════════════════════════════════
// Argument helpers
// ═══════════════════════════════════════════

pub(crate) fn str_arg<'a>(tool: &str, args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    optional_str_arg(args, key).ok_or_else(|| ToolError::InvalidArguments {
        tool: tool.to_string(),
        reason: format!("missing string '{key}'"),
    })
}

pub(crate) fn optional_str_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Integer argument. Models often send numbers as strings, so both are accepted.
pub(crate) fn int_arg(tool: &str, args: &Value, key: &str) -> Result<i64, ToolError> {
    let value = args.get(key);
    value
        .and_then(Value::as_i64)
        .or_else(|| value.and_then(Value::as_str).and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| ToolError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("missing integer '{key}'"),
        })
}

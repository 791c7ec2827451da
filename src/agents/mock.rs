//! Deterministic agents for router and endpoint tests.

use std::sync::{Arc, Mutex};

use super::{AgentError, AgentProvider, AgentReply, ConversationAgent, SessionAgents, SummaryAgent};
use crate::chat::{ConversationEntry, Role};
use crate::llm::LlmError;

type Responder = Box<dyn FnMut(&[ConversationEntry]) -> Result<String, AgentError> + Send>;

/// Conversation agent driven by a closure. Records every conversation it receives.
pub struct ScriptedAgent {
    respond: Responder,
    seen: Arc<Mutex<Vec<Vec<ConversationEntry>>>>,
}

impl ScriptedAgent {
    pub fn new(
        respond: impl FnMut(&[ConversationEntry]) -> Result<String, AgentError> + Send + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            seen: Arc::default(),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Replies with `prefix` followed by the last user turn.
    pub fn echo(prefix: &str) -> Self {
        let prefix = prefix.to_string();
        Self::new(move |conversation| {
            let last = conversation
                .iter()
                .rev()
                .find(|e| e.role == Role::User)
                .map(|e| e.content.as_str())
                .unwrap_or_default();
            Ok(format!("{prefix}{last}"))
        })
    }

    pub fn failing() -> Self {
        Self::new(|_| Err(LlmError::Connection("http://localhost:11434".into()).into()))
    }

    pub fn seen(&self) -> Arc<Mutex<Vec<Vec<ConversationEntry>>>> {
        self.seen.clone()
    }
}

impl ConversationAgent for ScriptedAgent {
    fn invoke(&mut self, conversation: &[ConversationEntry]) -> Result<AgentReply, AgentError> {
        self.seen.lock().unwrap().push(conversation.to_vec());
        let response = (self.respond)(conversation)?;
        Ok(AgentReply {
            conversation: conversation.to_vec(),
            response,
        })
    }
}

/// Summary agent returning fixed text and recording who asked.
pub struct FixedSummary {
    text: String,
    pub users: Arc<Mutex<Vec<String>>>,
}

impl FixedSummary {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            users: Arc::default(),
        }
    }
}

impl SummaryAgent for FixedSummary {
    fn summarize(&mut self, user_name: &str) -> Result<String, AgentError> {
        self.users.lock().unwrap().push(user_name.to_string());
        Ok(self.text.clone())
    }
}

pub fn scripted_agents(medical: ScriptedAgent, appointments: ScriptedAgent, summary: FixedSummary) -> SessionAgents {
    SessionAgents {
        medical: Box::new(medical),
        appointments: Box::new(appointments),
        summary: Box::new(summary),
    }
}

/// Provider whose agents echo the user: `"medical: ..."` and `"appointments: ..."`.
#[derive(Default)]
pub struct MockAgentProvider {
    pub failing: bool,
}

impl AgentProvider for MockAgentProvider {
    fn session_agents(&self, _user_name: &str) -> Result<SessionAgents, AgentError> {
        let medical = if self.failing {
            ScriptedAgent::failing()
        } else {
            ScriptedAgent::echo("medical: ")
        };
        Ok(scripted_agents(
            medical,
            ScriptedAgent::echo("appointments: "),
            FixedSummary::new("Consultation Summary:\n\n• Main symptoms: Not specified"),
        ))
    }

    fn patient_problem(&self, patient: &str) -> Result<String, AgentError> {
        Ok(format!("Headaches reported by {patient}"))
    }

    fn analyze_lab_report(&self, report_text: &str) -> Result<String, AgentError> {
        Ok(format!("Lab Report Analysis\n\nResults explained: {} characters read", report_text.len()))
    }
}

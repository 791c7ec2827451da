use std::sync::Arc;

use rusqlite::Connection;

use super::prompts::{PATIENT_PROBLEM_PROMPT, SUMMARY_AGENT_PROMPT};
use super::{AgentError, SummaryAgent};
use crate::db;
use crate::llm::{ChatMessage, LlmClient};
use crate::models::Reservation;
use crate::transcript::TranscriptLogger;

pub const EMPTY_HISTORY_SUMMARY: &str = "No consultation history available to summarize.";
pub const GENERAL_CONSULTATION: &str = "General consultation";
pub const PROBLEM_MAX_CHARS: usize = 200;

/// `"{doctor} ({specialization}) - {time}"` entries joined by `"; "`, or `"None"`.
pub fn format_appointments(reservations: &[Reservation]) -> String {
    if reservations.is_empty() {
        return "None".to_string();
    }
    reservations
        .iter()
        .map(|r| format!("{} ({}) - {}", r.doctor, r.specialization, r.time_slot))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn summary_request(appointments: &str, history: &str) -> String {
    format!(
        "Please analyze the following conversation and provide a structured consultation summary.\n\n\
         CURRENT USER APPOINTMENTS (from database): {appointments}\n\n\
         CONVERSATION HISTORY:\n{history}"
    )
}

/// Trim a generated problem line to the appointment card limit.
pub fn clamp_problem(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return GENERAL_CONSULTATION.to_string();
    }
    if text.chars().count() > PROBLEM_MAX_CHARS {
        let head: String = text.chars().take(PROBLEM_MAX_CHARS - 3).collect();
        return format!("{head}...");
    }
    text.to_string()
}

/// Summarizes a user's whole stored transcript, not just the session window.
pub struct ConsultationSummarizer {
    llm: Arc<dyn LlmClient>,
    model: String,
    conn: Connection,
    transcripts: TranscriptLogger,
}

impl ConsultationSummarizer {
    pub fn new(llm: Arc<dyn LlmClient>, model: &str, conn: Connection, transcripts: TranscriptLogger) -> Self {
        Self {
            llm,
            model: model.to_string(),
            conn,
            transcripts,
        }
    }
}

impl SummaryAgent for ConsultationSummarizer {
    fn summarize(&mut self, user_name: &str) -> Result<String, AgentError> {
        let history = self.transcripts.read(user_name)?;
        if history.trim().is_empty() {
            return Ok(EMPTY_HISTORY_SUMMARY.to_string());
        }

        let appointments = match db::get_reservations_matching(&self.conn, user_name) {
            Ok(reservations) => format_appointments(&reservations),
            Err(e) => {
                tracing::warn!(user = %user_name, "Cannot read appointments for summary: {e}");
                "Unable to retrieve".to_string()
            }
        };

        let messages = [
            ChatMessage::system(SUMMARY_AGENT_PROMPT),
            ChatMessage::user(summary_request(&appointments, &history)),
        ];
        let reply = self.llm.chat(&self.model, &messages, &[])?;
        Ok(reply.content)
    }
}

/// One-line problem description for a doctor's appointment card.
///
/// Model failures fall back to [`GENERAL_CONSULTATION`]; only transcript
/// errors propagate.
pub fn summarize_patient_problem(
    llm: &dyn LlmClient,
    model: &str,
    transcripts: &TranscriptLogger,
    patient: &str,
) -> Result<String, AgentError> {
    let history = transcripts.read(patient)?;
    if history.trim().is_empty() {
        return Ok(GENERAL_CONSULTATION.to_string());
    }

    let messages = [
        ChatMessage::system(PATIENT_PROBLEM_PROMPT),
        ChatMessage::user(history),
    ];
    match llm.chat(model, &messages, &[]) {
        Ok(reply) => Ok(clamp_problem(&reply.content)),
        Err(e) => {
            tracing::warn!(patient = %patient, "Problem summary failed: {e}");
            Ok(GENERAL_CONSULTATION.to_string())
        }
    }
}

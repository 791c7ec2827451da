use std::sync::Arc;

use rusqlite::Connection;
use serde_json::{json, Value};

use super::prompts::{PromptLinks, MEDICAL_AGENT_PROMPT};
use super::runner::{optional_str_arg, run_tool_loop, str_arg, Toolbox, ToolError};
use super::{AgentError, AgentReply, ConversationAgent};
use crate::chat::prefetch::format_slot_line;
use crate::chat::ConversationEntry;
use crate::db;
use crate::knowledge::MedicalRetriever;
use crate::llm::{LlmClient, ToolDefinition};
use crate::models::OpenSlot;

pub const NO_MEDICAL_INFO: &str = "No relevant medical information found.";

/// Tools for the medical question-answering agent.
pub struct MedicalToolbox {
    conn: Connection,
    retriever: Option<Arc<dyn MedicalRetriever>>,
    top_k: usize,
    user_name: String,
}

impl MedicalToolbox {
    pub fn new(
        conn: Connection,
        retriever: Option<Arc<dyn MedicalRetriever>>,
        top_k: usize,
        user_name: &str,
    ) -> Self {
        Self {
            conn,
            retriever,
            top_k,
            user_name: user_name.to_string(),
        }
    }

    fn search_medical_information(&self, query: &str) -> String {
        let Some(retriever) = &self.retriever else {
            return NO_MEDICAL_INFO.to_string();
        };
        match retriever.search(query, self.top_k) {
            Ok(Some(context)) => context,
            Ok(None) => NO_MEDICAL_INFO.to_string(),
            Err(e) => {
                tracing::warn!("Knowledge search failed: {e}");
                NO_MEDICAL_INFO.to_string()
            }
        }
    }

    fn patient_appointments(&self, doctor: Option<&str>) -> Result<String, ToolError> {
        let doctor = doctor.map(str::to_lowercase);
        let rows: Vec<Value> = db::get_reservations_matching(&self.conn, &self.user_name)?
            .into_iter()
            .filter(|r| {
                doctor
                    .as_deref()
                    .map_or(true, |d| r.doctor.to_lowercase().contains(d))
            })
            .map(|r| {
                json!({
                    "slot_id": r.id,
                    "doctor": r.doctor,
                    "specialization": r.specialization,
                    "time_slot": r.time_slot,
                })
            })
            .collect();
        Ok(Value::Array(rows).to_string())
    }
}

/// "AVAILABLE SLOTS" listing for one doctor search.
pub fn format_doctor_slots(doctor: &str, slots: &[OpenSlot]) -> String {
    if slots.is_empty() {
        return format!("No available slots found for doctor '{doctor}'.");
    }
    let lines: String = slots.iter().map(format_slot_line).collect();
    format!(
        "AVAILABLE SLOTS:\n{}\n\nTo book an appointment, the user needs to use the appointment management system with the slot ID.",
        lines.trim_end()
    )
}

/// All open slots grouped under their doctor, groups in first-seen order.
pub fn format_grouped_slots(slots: &[OpenSlot]) -> String {
    if slots.is_empty() {
        return "No available appointment slots at the moment.".to_string();
    }

    let mut groups: Vec<(&str, &str, Vec<&OpenSlot>)> = Vec::new();
    for slot in slots {
        match groups.iter_mut().find(|(doctor, _, _)| *doctor == slot.doctor) {
            Some((_, _, members)) => members.push(slot),
            None => groups.push((slot.doctor.as_str(), slot.specialization.as_str(), vec![slot])),
        }
    }

    let mut out = String::from("ALL AVAILABLE APPOINTMENT SLOTS (grouped by doctor):\n");
    for (doctor, specialization, members) in groups {
        out.push_str(&format!("\n**{doctor}** ({specialization}):\n"));
        for slot in members {
            out.push_str(&format!("  - Slot ID {}: {}\n", slot.id, slot.time_slot));
        }
    }
    out.push_str("\nTo book, the user should use the appointment management system with the desired slot ID.");
    out
}

impl Toolbox for MedicalToolbox {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "search_medical_information",
                "Search the medical knowledge base. Call this first for any symptom, condition or health question.",
                json!({
                    "type": "object",
                    "properties": {"query": {"type": "string", "description": "What to look up"}},
                    "required": ["query"]
                }),
            ),
            ToolDefinition::function(
                "search_available_doctor_appointments",
                "Open appointment slots for one doctor, with slot id and specialization.",
                json!({
                    "type": "object",
                    "properties": {"doctor": {"type": "string", "description": "Doctor name or part of it"}},
                    "required": ["doctor"]
                }),
            ),
            ToolDefinition::function(
                "get_all_available_slots",
                "Every open appointment slot, grouped by doctor. Use when no doctor was specified.",
                json!({"type": "object", "properties": {}}),
            ),
            ToolDefinition::function(
                "search_patient_appointments",
                "The current patient's booked appointments, optionally filtered by doctor.",
                json!({
                    "type": "object",
                    "properties": {"doctor": {"type": "string"}}
                }),
            ),
        ]
    }

    fn call(&mut self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        match name {
            "search_medical_information" => {
                let query = str_arg(name, arguments, "query")?;
                Ok(self.search_medical_information(query))
            }
            "search_available_doctor_appointments" => {
                let doctor = str_arg(name, arguments, "doctor")?;
                let slots = db::get_open_slots_by_doctor_like(&self.conn, doctor)?;
                Ok(format_doctor_slots(doctor, &slots))
            }
            "get_all_available_slots" => Ok(format_grouped_slots(&db::get_open_slots(&self.conn)?)),
            "search_patient_appointments" => self.patient_appointments(optional_str_arg(arguments, "doctor")),
            other => Err(ToolError::Unknown(other.to_string())),
        }
    }
}

/// Answers health questions from the knowledge base and suggests doctors.
pub struct MedicalAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    system_prompt: String,
    tools: MedicalToolbox,
}

impl MedicalAgent {
    pub fn new(llm: Arc<dyn LlmClient>, model: &str, links: &PromptLinks, tools: MedicalToolbox) -> Self {
        let system_prompt = links.render(MEDICAL_AGENT_PROMPT, &tools.user_name);
        Self {
            llm,
            model: model.to_string(),
            system_prompt,
            tools,
        }
    }
}

impl ConversationAgent for MedicalAgent {
    fn invoke(&mut self, conversation: &[ConversationEntry]) -> Result<AgentReply, AgentError> {
        let response = run_tool_loop(
            self.llm.as_ref(),
            &self.model,
            &self.system_prompt,
            conversation,
            &mut self.tools,
        )?;
        Ok(AgentReply {
            conversation: conversation.to_vec(),
            response,
        })
    }
}

use std::sync::Arc;

use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};

use super::prompts::{PromptLinks, APPOINTMENT_AGENT_PROMPT};
use super::runner::{int_arg, run_tool_loop, str_arg, Toolbox, ToolError};
use super::{AgentError, AgentReply, ConversationAgent};
use crate::chat::ConversationEntry;
use crate::db::{self, DatabaseError};
use crate::llm::{LlmClient, ToolDefinition};
use crate::models::OpenSlot;

#[derive(Serialize)]
struct SlotRow<'a> {
    slot_id: i64,
    doctor: &'a str,
    time_slot: &'a str,
    specialization: &'a str,
}

fn slots_json(slots: &[OpenSlot]) -> String {
    let rows: Vec<SlotRow<'_>> = slots
        .iter()
        .map(|s| SlotRow {
            slot_id: s.id,
            doctor: &s.doctor,
            time_slot: &s.time_slot,
            specialization: &s.specialization,
        })
        .collect();
    serde_json::to_string(&rows).unwrap_or_else(|_| "[]".into())
}

/// Reservation tools. Booking and cancelling always act for `patient`,
/// whatever the model passes.
pub struct AppointmentToolbox {
    conn: Connection,
    patient: String,
}

impl AppointmentToolbox {
    pub fn new(conn: Connection, patient: &str) -> Self {
        Self {
            conn,
            patient: patient.to_string(),
        }
    }

    fn book(&self, id: i64) -> Result<String, ToolError> {
        match db::book_slot(&self.conn, id, &self.patient) {
            Ok(slot) => Ok(format!(
                "✓ DATABASE UPDATED - BOOKING CONFIRMED: Appointment with {} booked for {}. Slot ID: {id}. The reservation has been saved to the database.",
                slot.doctor, slot.time_slot
            )),
            Err(DatabaseError::NotFound { .. }) => {
                Err(ToolError::Rejected(format!("Slot with ID {id} does not exist.")))
            }
            Err(DatabaseError::Conflict(_)) => {
                Err(ToolError::Rejected(format!("Slot with ID {id} is already booked.")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn cancel(&self, id: i64) -> Result<String, ToolError> {
        match db::cancel_slot(&self.conn, id, &self.patient) {
            Ok(slot) => Ok(format!(
                "✓ DATABASE UPDATED - CANCELLATION CONFIRMED: Appointment with {} on {} cancelled. Slot ID: {id}. The slot is now available for other patients.",
                slot.doctor, slot.time_slot
            )),
            Err(DatabaseError::NotFound { .. }) => {
                Err(ToolError::Rejected(format!("Slot with ID {id} does not exist.")))
            }
            Err(DatabaseError::Conflict(_)) => Err(ToolError::Rejected(format!(
                "Slot with ID {id} has no reservation to cancel."
            ))),
            Err(DatabaseError::Forbidden(_)) => Err(ToolError::Rejected(
                "You cannot cancel this reservation. It belongs to another patient.".into(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

fn slot_id_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"slot_id": {"type": "integer", "description": "Slot ID"}},
        "required": ["slot_id"]
    })
}

impl Toolbox for AppointmentToolbox {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let no_args = json!({"type": "object", "properties": {}});
        vec![
            ToolDefinition::function(
                "get_all_available_slots",
                "All open appointment slots with slot_id, doctor, specialization and time.",
                no_args.clone(),
            ),
            ToolDefinition::function(
                "get_user_reservations",
                "The current user's booked appointments.",
                no_args.clone(),
            ),
            ToolDefinition::function(
                "book_appointment",
                "Book an open slot for the current user.",
                slot_id_schema(),
            ),
            ToolDefinition::function(
                "cancel_appointment",
                "Cancel one of the current user's reservations.",
                slot_id_schema(),
            ),
            ToolDefinition::function(
                "get_doctors_list",
                "Every doctor with their specialization.",
                no_args,
            ),
            ToolDefinition::function(
                "get_slots_by_doctor",
                "Open slots for one doctor.",
                json!({
                    "type": "object",
                    "properties": {"doctor": {"type": "string"}},
                    "required": ["doctor"]
                }),
            ),
            ToolDefinition::function(
                "get_slots_by_specialization",
                "Open slots for a specialization such as Neurology or Cardiology.",
                json!({
                    "type": "object",
                    "properties": {"specialization": {"type": "string"}},
                    "required": ["specialization"]
                }),
            ),
        ]
    }

    fn call(&mut self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        match name {
            "get_all_available_slots" => Ok(slots_json(&db::get_open_slots(&self.conn)?)),
            "get_user_reservations" => {
                let reservations = db::get_reservations(&self.conn, &self.patient)?;
                Ok(serde_json::to_string(&reservations).unwrap_or_else(|_| "[]".into()))
            }
            "book_appointment" => self.book(int_arg(name, arguments, "slot_id")?),
            "cancel_appointment" => self.cancel(int_arg(name, arguments, "slot_id")?),
            "get_doctors_list" => {
                let doctors: Vec<Value> = db::get_doctor_roster(&self.conn)?
                    .into_iter()
                    .map(|d| json!({"name": d.name, "specialization": d.specialization}))
                    .collect();
                Ok(Value::Array(doctors).to_string())
            }
            "get_slots_by_doctor" => {
                let doctor = str_arg(name, arguments, "doctor")?;
                Ok(slots_json(&db::get_open_slots_by_doctor_like(&self.conn, doctor)?))
            }
            "get_slots_by_specialization" => {
                let specialization = str_arg(name, arguments, "specialization")?;
                Ok(slots_json(&db::get_open_slots_by_specialization_like(
                    &self.conn,
                    specialization,
                )?))
            }
            other => Err(ToolError::Unknown(other.to_string())),
        }
    }
}

/// Lists, books and cancels appointments for the session's user.
pub struct AppointmentAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
    system_prompt: String,
    tools: AppointmentToolbox,
}

impl AppointmentAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        model: &str,
        links: &PromptLinks,
        tools: AppointmentToolbox,
    ) -> Self {
        let system_prompt = links.render(APPOINTMENT_AGENT_PROMPT, &tools.patient);
        Self {
            llm,
            model: model.to_string(),
            system_prompt,
            tools,
        }
    }
}

impl ConversationAgent for AppointmentAgent {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_memory_database, seed_demo_data};
    use crate::llm::{ChatMessage, MockLlmClient, ToolCall};

    fn toolbox(patient: &str) -> AppointmentToolbox {
        let mut conn = open_memory_database().unwrap();
        seed_demo_data(&mut conn).unwrap();
        AppointmentToolbox::new(conn, patient)
    }

    fn first_open_slot(tools: &AppointmentToolbox) -> i64 {
        db::get_open_slots(&tools.conn).unwrap()[0].id
    }

    #[test]
    fn book_then_cancel_round_trip() {
        let mut tools = toolbox("John Doe");
        let id = first_open_slot(&tools);

        let booked = tools.call("book_appointment", &json!({"slot_id": id})).unwrap();
        assert!(booked.starts_with("✓ DATABASE UPDATED - BOOKING CONFIRMED: Appointment with Dr."));
        assert!(booked.contains(&format!("Slot ID: {id}.")));

        let mine: Vec<Value> =
            serde_json::from_str(&tools.call("get_user_reservations", &json!({})).unwrap()).unwrap();
        assert_eq!(mine.len(), 1);

        let again = tools.call("book_appointment", &json!({"slot_id": id})).unwrap_err();
        assert_eq!(again.to_string(), format!("Slot with ID {id} is already booked."));

        let cancelled = tools.call("cancel_appointment", &json!({"slot_id": id.to_string()})).unwrap();
        assert!(cancelled.starts_with("✓ DATABASE UPDATED - CANCELLATION CONFIRMED"));
    }

    #[test]
    fn cannot_cancel_someone_elses_slot() {
        let mut tools = toolbox("John Doe");
        let held_by_rossi = db::get_reservations(&tools.conn, "Mario Rossi").unwrap()[0].id;
        let err = tools
            .call("cancel_appointment", &json!({"slot_id": held_by_rossi, "patient": "Mario Rossi"}))
            .unwrap_err();
        assert!(err.to_string().contains("belongs to another patient"));
    }

    #[test]
    fn missing_slot_is_rejected() {
        let mut tools = toolbox("John Doe");
        let err = tools.call("book_appointment", &json!({"slot_id": 99999})).unwrap_err();
        assert!(matches!(err, ToolError::Rejected(_)));
        let err = tools.call("cancel_appointment", &json!({"slot_id": 99999})).unwrap_err();
        assert_eq!(err.to_string(), "Slot with ID 99999 does not exist.");
    }

    #[test]
    fn filters_by_doctor_and_specialization() {
        let mut tools = toolbox("John Doe");
        let ricci: Vec<Value> =
            serde_json::from_str(&tools.call("get_slots_by_doctor", &json!({"doctor": "ricci"})).unwrap()).unwrap();
        assert!(!ricci.is_empty());
        assert!(ricci.iter().all(|s| s["doctor"] == "Dr. Ricci"));

        let neuro: Vec<Value> = serde_json::from_str(
            &tools
                .call("get_slots_by_specialization", &json!({"specialization": "neuro"}))
                .unwrap(),
        )
        .unwrap();
        assert!(neuro.iter().all(|s| s["specialization"] == "Neurology"));

        let doctors: Vec<Value> =
            serde_json::from_str(&tools.call("get_doctors_list", &json!({})).unwrap()).unwrap();
        assert_eq!(doctors.len(), 10);
    }

    #[test]
    fn agent_books_through_tool_call() {
        let tools = toolbox("John Doe");
        let id = first_open_slot(&tools);
        let llm = Arc::new(MockLlmClient::new("✓ DATABASE UPDATED: booked!").with_replies(vec![
            ChatMessage {
                tool_calls: vec![ToolCall::new("book_appointment", json!({"slot_id": id}))],
                ..ChatMessage::assistant("")
            },
        ]));
        let mut agent = AppointmentAgent::new(llm.clone(), "llama3.1", &PromptLinks::default(), tools);

        let reply = agent
            .invoke(&[ConversationEntry::user(format!("book slot {id}"))])
            .unwrap();
        assert_eq!(reply.response, "✓ DATABASE UPDATED: booked!");
        let tool_turn = llm.requests()[1].last().cloned().unwrap();
        assert!(tool_turn.content.contains("BOOKING CONFIRMED"));
        assert_eq!(db::get_reservations(&agent.tools.conn, "John Doe").unwrap().len(), 1);
    }
}

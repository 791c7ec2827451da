//! One chat connection: buffers, dispatcher, transcript.

use super::classify::{classify, wants_slot_listing, Intent};
use super::dispatch::{Dispatcher, SessionBuffers};
use super::prefetch::{augment_message, build_slot_context};
use super::ChatError;
use crate::transcript::{TranscriptError, TranscriptLogger, TranscriptRole};

pub const GREETING: &str =
    "Bot: Hello! I'm ready to assist you. I can help with medical questions and manage your appointments.";

/// Per-connection chat state. Dropping it releases both buffers.
pub struct ChatSession {
    user_name: String,
    buffers: SessionBuffers,
    dispatcher: Dispatcher,
    transcripts: TranscriptLogger,
}

impl ChatSession {
    /// Bind a session to `user_name`, creating the user's transcript if needed.
    pub fn new(
        user_name: impl Into<String>,
        window: usize,
        dispatcher: Dispatcher,
        transcripts: TranscriptLogger,
    ) -> Result<Self, TranscriptError> {
        let user_name = user_name.into();
        transcripts.ensure_exists(&user_name)?;
        Ok(Self {
            user_name,
            buffers: SessionBuffers::new(window),
            dispatcher,
            transcripts,
        })
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn buffers(&self) -> &SessionBuffers {
        &self.buffers
    }

    /// Reply to one inbound message. Never fails: errors become `"Bot Error: <msg>"`.
    pub fn handle_message(&mut self, message: &str) -> String {
        match self.process(message) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(user = %self.user_name, "Chat message failed: {e}");
                format!("Bot Error: {e}")
            }
        }
    }

    fn process(&mut self, message: &str) -> Result<String, ChatError> {
        self.transcripts
            .log(TranscriptRole::User, message, &self.user_name)?;

        let intent = classify(message);
        tracing::debug!(user = %self.user_name, ?intent, "Routing chat message");

        let outbound = if intent == Intent::SqlAgent && wants_slot_listing(message) {
            let slots = build_slot_context(self.dispatcher.directory(), &self.buffers.medical)?;
            augment_message(&slots, message)
        } else {
            message.to_string()
        };

        let response = self
            .dispatcher
            .dispatch(intent, &self.user_name, &mut self.buffers, &outbound)?;

        self.transcripts
            .log(TranscriptRole::Bot, &response, &self.user_name)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::mock::{scripted_agents, FixedSummary, ScriptedAgent};
    use crate::chat::{ConversationEntry, SlotDirectory};
    use crate::db::{book_slot, get_open_slots_for_doctors, open_memory_database, seed_demo_data};
    use crate::transcript::TranscriptRecord;
    use rusqlite::Connection;

    fn seeded() -> Connection {
        let mut conn = open_memory_database().unwrap();
        seed_demo_data(&mut conn).unwrap();
        conn
    }

    fn session(
        directory: Connection,
        medical: ScriptedAgent,
        appointments: ScriptedAgent,
        dir: &std::path::Path,
    ) -> ChatSession {
        let dispatcher = Dispatcher::new(
            Box::new(directory),
            scripted_agents(medical, appointments, FixedSummary::new("Consultation Summary: none")),
            None,
            2,
        );
        ChatSession::new("Mario Rossi", 10, dispatcher, TranscriptLogger::new(dir)).unwrap()
    }

    #[test]
    fn new_session_creates_empty_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(
            seeded(),
            ScriptedAgent::replying("-"),
            ScriptedAgent::replying("-"),
            dir.path(),
        );
        assert_eq!(session.user_name(), "Mario Rossi");
        assert!(dir.path().join("mario rossi.txt").exists());
        assert!(session.buffers().medical.is_empty());
    }

    #[test]
    fn slot_request_after_doctor_mention_prefetches_that_doctor() {
        let conn = seeded();
        // Leave Dr. Ricci with exactly two open slots.
        let ricci = get_open_slots_for_doctors(&conn, &["Dr. Ricci".to_string()]).unwrap();
        for slot in &ricci[2..] {
            book_slot(&conn, slot.id, "Anna Verdi").unwrap();
        }
        let remaining: Vec<_> = ricci[..2].to_vec();

        let dir = tempfile::tempdir().unwrap();
        let appointments = ScriptedAgent::replying("Here are the slots.");
        let seen = appointments.seen();
        let mut session = session(
            conn,
            ScriptedAgent::replying("For a persistent cough I recommend Dr. Ricci."),
            appointments,
            dir.path(),
        );

        session.handle_message("I have a cough");
        let reply = session.handle_message("show available slots");
        assert_eq!(reply, "Here are the slots.");

        let sent = seen.lock().unwrap()[0].last().unwrap().content.clone();
        assert!(sent.starts_with(
            "[PRE-FETCHED SLOTS DATA - USE THIS EXACTLY, DO NOT QUERY AGAIN]:\nAVAILABLE SLOTS FOR Dr. Ricci:\n"
        ));
        for slot in &remaining {
            assert!(sent.contains(&format!("- Slot ID {}: Dr. Ricci", slot.id)));
        }
        assert_eq!(sent.matches("- Slot ID").count(), 2);
        assert!(sent.ends_with("User says: show available slots"));
    }

    #[test]
    fn booking_message_is_not_prefetched() {
        let dir = tempfile::tempdir().unwrap();
        let appointments = ScriptedAgent::replying("Booked.");
        let seen = appointments.seen();
        let mut session = session(seeded(), ScriptedAgent::replying("-"), appointments, dir.path());

        session.handle_message("book appointment 12");
        let sent = seen.lock().unwrap()[0].last().unwrap().content.clone();
        assert_eq!(sent, "book appointment 12");
        assert_eq!(
            session.buffers().appointments.last_assistant(),
            Some(&ConversationEntry::assistant("Booked."))
        );
    }

    #[test]
    fn both_turns_logged_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(
            seeded(),
            ScriptedAgent::replying("Rest and drink water."),
            ScriptedAgent::replying("-"),
            dir.path(),
        );
        session.handle_message("I have a headache");

        let records: Vec<TranscriptRecord> = TranscriptLogger::new(dir.path())
            .records("mario rossi")
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].role, TranscriptRole::User);
        assert_eq!(records[0].text, "I have a headache");
        assert_eq!(records[1].role, TranscriptRole::Bot);
        assert_eq!(records[1].text, "Rest and drink water.");
    }

    #[test]
    fn summary_reply_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(seeded(), ScriptedAgent::replying("-"), ScriptedAgent::replying("-"), dir.path());
        assert_eq!(session.handle_message("give me a summary"), "Consultation Summary: none");
        let records = TranscriptLogger::new(dir.path()).records("Mario Rossi").unwrap();
        assert_eq!(records[1].text, "Consultation Summary: none");
        assert!(session.buffers().medical.is_empty());
        assert!(session.buffers().appointments.is_empty());
    }

    #[test]
    fn agent_failure_becomes_bot_error_and_session_survives() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(seeded(), ScriptedAgent::failing(), ScriptedAgent::replying("ok"), dir.path());

        let reply = session.handle_message("my back hurts");
        assert_eq!(reply, "Bot Error: Cannot reach Ollama at http://localhost:11434");

        assert_eq!(session.handle_message("cancel my appointment"), "ok");
        let records = TranscriptLogger::new(dir.path()).records("Mario Rossi").unwrap();
        // The failed turn logs only the user line.
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn store_failure_becomes_bot_error() {
        let conn = Connection::open_in_memory().unwrap();
        let directory: &dyn SlotDirectory = &conn;
        assert!(directory.open_slots().is_err());

        let dir = tempfile::tempdir().unwrap();
        let mut session = session(conn, ScriptedAgent::replying("-"), ScriptedAgent::replying("-"), dir.path());
        let reply = session.handle_message("show available slots");
        assert!(reply.starts_with("Bot Error: SQLite error:"), "{reply}");
    }
}

//! Slot pre-fetching for sql-routed messages.
//!
//! When the user asks to see availability, the open slots are read up front
//! and prepended to the message so the appointment agent answers from them
//! without issuing its own queries. If the last assistant reply named
//! doctors, only their slots are listed.

use rusqlite::Connection;

use super::buffer::ConversationBuffer;
use crate::db::{self, DatabaseError};
use crate::models::{Doctor, OpenSlot};

pub const NO_SLOTS_MESSAGE: &str = "No appointment slots available at the moment.";

/// Read access to the roster and open slots.
pub trait SlotDirectory: Send {
    /// Doctors ordered by specialization, then name.
    fn doctor_roster(&self) -> Result<Vec<Doctor>, DatabaseError>;

    /// Doctor names in roster storage order.
    fn doctor_names(&self) -> Result<Vec<String>, DatabaseError>;

    /// All open slots, ordered by specialization then time.
    fn open_slots(&self) -> Result<Vec<OpenSlot>, DatabaseError>;

    /// Open slots of the named doctors, ordered by time.
    fn open_slots_for(&self, doctors: &[String]) -> Result<Vec<OpenSlot>, DatabaseError>;
}

impl SlotDirectory for Connection {
    fn doctor_roster(&self) -> Result<Vec<Doctor>, DatabaseError> {
        db::get_doctor_roster(self)
    }

    fn doctor_names(&self) -> Result<Vec<String>, DatabaseError> {
        db::get_doctor_names(self)
    }

    fn open_slots(&self) -> Result<Vec<OpenSlot>, DatabaseError> {
        db::get_open_slots(self)
    }

    fn open_slots_for(&self, doctors: &[String]) -> Result<Vec<OpenSlot>, DatabaseError> {
        db::get_open_slots_for_doctors(self, doctors)
    }
}

/// Roster names that appear (case-insensitively) in the most recent assistant
/// turn. Older turns are never searched. Order follows the roster.
pub fn extract_mentioned_doctors(history: &ConversationBuffer, roster: &[String]) -> Vec<String> {
    let Some(last) = history.last_assistant() else {
        return Vec::new();
    };
    let content = last.content.to_lowercase();
    roster
        .iter()
        .filter(|name| content.contains(&name.to_lowercase()))
        .cloned()
        .collect()
}

pub fn format_slot_line(slot: &OpenSlot) -> String {
    format!(
        "- Slot ID {}: {} ({}) - {}\n",
        slot.id, slot.doctor, slot.specialization, slot.time_slot
    )
}

fn with_slot_lines(mut header: String, slots: &[OpenSlot]) -> String {
    for slot in slots {
        header.push_str(&format_slot_line(slot));
    }
    header
}

/// Build the slot listing for the current state of the store.
pub fn build_slot_context(
    directory: &dyn SlotDirectory,
    history: &ConversationBuffer,
) -> Result<String, DatabaseError> {
    let roster = directory.doctor_names()?;
    let mentioned = extract_mentioned_doctors(history, &roster);

    if !mentioned.is_empty() {
        tracing::debug!(doctors = ?mentioned, "Doctors mentioned in last reply");
        let doctors = mentioned.join(", ");
        let slots = directory.open_slots_for(&mentioned)?;
        if !slots.is_empty() {
            return Ok(with_slot_lines(
                format!("AVAILABLE SLOTS FOR {doctors}:\n"),
                &slots,
            ));
        }

        let all = directory.open_slots()?;
        if all.is_empty() {
            return Ok(NO_SLOTS_MESSAGE.to_string());
        }
        return Ok(with_slot_lines(
            format!("No slots available for {doctors}. Here are ALL available slots:\n"),
            &all,
        ));
    }

    let all = directory.open_slots()?;
    if all.is_empty() {
        return Ok(NO_SLOTS_MESSAGE.to_string());
    }
    Ok(with_slot_lines("ALL AVAILABLE SLOTS:\n".to_string(), &all))
}

/// Prefix a message with pre-fetched slot data.
pub fn augment_message(slots_info: &str, message: &str) -> String {
    format!(
        "[PRE-FETCHED SLOTS DATA - USE THIS EXACTLY, DO NOT QUERY AGAIN]:\n{slots_info}\n\nUser says: {message}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::buffer::ConversationEntry;
    use crate::db::{book_slot, insert_doctor, insert_slot, open_memory_database};
    use std::collections::HashSet;

    fn directory() -> Connection {
        let conn = open_memory_database().unwrap();
        for (name, spec) in [
            ("Dr. Fontana", "Neurology"),
            ("Dr. Moretti", "Neurology"),
            ("Dr. Ricci", "Pneumology"),
        ] {
            insert_doctor(
                &conn,
                &Doctor {
                    name: name.into(),
                    specialization: spec.into(),
                    user_id: None,
                },
            )
            .unwrap();
        }
        conn
    }

    fn history(assistant_turns: &[&str]) -> ConversationBuffer {
        let mut buffer = ConversationBuffer::new(10);
        for turn in assistant_turns {
            buffer.append(ConversationEntry::user("question"));
            buffer.append(ConversationEntry::assistant(*turn));
        }
        buffer
    }

    fn roster() -> Vec<String> {
        vec!["Dr. Fontana".into(), "Dr. Moretti".into(), "Dr. Ricci".into()]
    }

    #[test]
    fn extraction_finds_mentioned_roster_names() {
        let buffer = history(&["I recommend Dr. Fontana or Dr. Moretti"]);
        let found: HashSet<_> = extract_mentioned_doctors(&buffer, &roster()).into_iter().collect();
        let expected: HashSet<_> = ["Dr. Fontana".to_string(), "Dr. Moretti".to_string()].into();
        assert_eq!(found, expected);
    }

    #[test]
    fn extraction_only_reads_last_assistant_turn() {
        let mut buffer = history(&["See Dr. Ricci", "Rest and drink water"]);
        assert!(extract_mentioned_doctors(&buffer, &roster()).is_empty());

        buffer.append(ConversationEntry::user("what about dr. ricci?"));
        assert!(extract_mentioned_doctors(&buffer, &roster()).is_empty());
    }

    #[test]
    fn extraction_is_case_insensitive() {
        let buffer = history(&["book with DR. RICCI tomorrow"]);
        assert_eq!(extract_mentioned_doctors(&buffer, &roster()), vec!["Dr. Ricci"]);
    }

    #[test]
    fn mentioned_doctor_slots_listed_with_header() {
        let conn = directory();
        let a = insert_slot(&conn, "Dr. Ricci", "10-03-2025 09:00:00").unwrap();
        let b = insert_slot(&conn, "Dr. Ricci", "10-03-2025 11:00:00").unwrap();
        insert_slot(&conn, "Dr. Fontana", "10-03-2025 10:00:00").unwrap();

        let context = build_slot_context(&conn, &history(&["Dr. Ricci can help with that"])).unwrap();
        assert_eq!(
            context,
            format!(
                "AVAILABLE SLOTS FOR Dr. Ricci:\n\
                 - Slot ID {a}: Dr. Ricci (Pneumology) - 10-03-2025 09:00:00\n\
                 - Slot ID {b}: Dr. Ricci (Pneumology) - 10-03-2025 11:00:00\n"
            )
        );
    }

    #[test]
    fn fallback_lists_every_open_slot() {
        let conn = directory();
        let taken = insert_slot(&conn, "Dr. Ricci", "10-03-2025 09:00:00").unwrap();
        book_slot(&conn, taken, "Mario Rossi").unwrap();
        insert_slot(&conn, "Dr. Fontana", "11-03-2025 10:00:00").unwrap();
        insert_slot(&conn, "Dr. Moretti", "12-03-2025 10:00:00").unwrap();

        let context = build_slot_context(&conn, &history(&["Try Dr. Ricci"])).unwrap();
        assert!(context.starts_with(
            "No slots available for Dr. Ricci. Here are ALL available slots:\n"
        ));
        assert!(context.contains("Dr. Fontana (Neurology) - 11-03-2025 10:00:00"));
        assert!(context.contains("Dr. Moretti (Neurology) - 12-03-2025 10:00:00"));
        assert_eq!(context.lines().count(), 3);
    }

    #[test]
    fn no_mention_lists_all_slots() {
        let conn = directory();
        insert_slot(&conn, "Dr. Ricci", "10-03-2025 09:00:00").unwrap();
        insert_slot(&conn, "Dr. Fontana", "10-03-2025 10:00:00").unwrap();

        let context = build_slot_context(&conn, &ConversationBuffer::new(10)).unwrap();
        let lines: Vec<_> = context.lines().collect();
        assert_eq!(lines[0], "ALL AVAILABLE SLOTS:");
        // Neurology sorts before Pneumology
        assert!(lines[1].contains("Dr. Fontana"));
        assert!(lines[2].contains("Dr. Ricci"));
    }

    #[test]
    fn empty_store_reports_no_slots() {
        let conn = directory();
        assert_eq!(
            build_slot_context(&conn, &ConversationBuffer::new(10)).unwrap(),
            NO_SLOTS_MESSAGE
        );
        assert_eq!(
            build_slot_context(&conn, &history(&["Dr. Moretti"])).unwrap(),
            NO_SLOTS_MESSAGE
        );
    }

    #[test]
    fn augmented_message_layout() {
        let msg = augment_message("ALL AVAILABLE SLOTS:\n", "show available slots");
        assert_eq!(
            msg,
            "[PRE-FETCHED SLOTS DATA - USE THIS EXACTLY, DO NOT QUERY AGAIN]:\n\
             ALL AVAILABLE SLOTS:\n\n\nUser says: show available slots"
        );
    }
}

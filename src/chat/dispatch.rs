use std::collections::BTreeMap;
use std::sync::Arc;

use super::buffer::{ConversationBuffer, ConversationEntry};
use super::classify::Intent;
use super::prefetch::SlotDirectory;
use super::ChatError;
use crate::agents::{ConversationAgent, SessionAgents};
use crate::db::DatabaseError;
use crate::knowledge::MedicalRetriever;
use crate::models::Doctor;

pub const MEDICAL_INSTRUCTIONS: &str = "INSTRUCTIONS: Based on the user's symptoms, choose the most appropriate doctor from the list above and give advice based on the symptoms and the medical knowledge base.";

/// The two per-session conversation windows. They are never merged.
#[derive(Debug, Clone)]
pub struct SessionBuffers {
    pub medical: ConversationBuffer,
    pub appointments: ConversationBuffer,
}

impl SessionBuffers {
    pub fn new(bound: usize) -> Self {
        Self {
            medical: ConversationBuffer::new(bound),
            appointments: ConversationBuffer::new(bound),
        }
    }
}

/// Routes a classified message to exactly one agent.
pub struct Dispatcher {
    directory: Box<dyn SlotDirectory>,
    agents: SessionAgents,
    retriever: Option<Arc<dyn MedicalRetriever>>,
    top_k: usize,
}

impl Dispatcher {
    pub fn new(
        directory: Box<dyn SlotDirectory>,
        agents: SessionAgents,
        retriever: Option<Arc<dyn MedicalRetriever>>,
        top_k: usize,
    ) -> Self {
        Self {
            directory,
            agents,
            retriever,
            top_k,
        }
    }

    pub fn directory(&self) -> &dyn SlotDirectory {
        self.directory.as_ref()
    }

    pub fn dispatch(
        &mut self,
        intent: Intent,
        user_name: &str,
        buffers: &mut SessionBuffers,
        message: &str,
    ) -> Result<String, ChatError> {
        match intent {
            Intent::Summary => Ok(self.agents.summary.summarize(user_name)?),
            Intent::SqlAgent => run_agent(
                self.agents.appointments.as_mut(),
                &mut buffers.appointments,
                message.to_string(),
            ),
            Intent::MedicalQa => {
                let augmented = self.medical_message(message)?;
                run_agent(self.agents.medical.as_mut(), &mut buffers.medical, augmented)
            }
        }
    }

    /// The user message followed by the doctor roster, any retrieved
    /// knowledge, and the fixed instructions.
    pub fn medical_message(&self, message: &str) -> Result<String, DatabaseError> {
        let roster = format_doctor_roster(&self.directory.doctor_roster()?);
        let knowledge = self.knowledge_context(message);
        Ok(build_medical_message(message, &roster, knowledge.as_deref()))
    }

    fn knowledge_context(&self, message: &str) -> Option<String> {
        let retriever = self.retriever.as_ref()?;
        if message.trim().is_empty() {
            return None;
        }
        match retriever.search(message, self.top_k) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Medical retrieval failed, continuing without it: {e}");
                None
            }
        }
    }
}

fn run_agent(
    agent: &mut dyn ConversationAgent,
    buffer: &mut ConversationBuffer,
    message: String,
) -> Result<String, ChatError> {
    buffer.append(ConversationEntry::user(message));
    let reply = agent.invoke(&buffer.to_vec())?;
    buffer.replace(reply.conversation);
    buffer.append(ConversationEntry::assistant(reply.response.clone()));
    Ok(reply.response)
}

/// `"- {specialization}: {names}"` lines under a fixed header, specializations sorted.
pub fn format_doctor_roster(doctors: &[Doctor]) -> String {
    if doctors.is_empty() {
        return "NO DOCTORS AVAILABLE in the system.".to_string();
    }

    let mut by_specialization: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for doctor in doctors {
        by_specialization
            .entry(doctor.specialization.as_str())
            .or_default()
            .push(doctor.name.as_str());
    }

    let mut lines = vec!["AVAILABLE DOCTORS IN OUR SYSTEM:".to_string()];
    for (specialization, names) in by_specialization {
        lines.push(format!("- {specialization}: {}", names.join(", ")));
    }
    lines.join("\n")
}

pub fn build_medical_message(message: &str, roster: &str, knowledge: Option<&str>) -> String {
    let mut out = format!("{message}\n\n[SYSTEM - DOCTORS DATABASE]:\n{roster}\n\n");
    if let Some(context) = knowledge.filter(|c| !c.trim().is_empty()) {
        out.push_str(&format!("[SYSTEM - MEDICAL KNOWLEDGE BASE]:\n{context}\n\n"));
    }
    out.push_str(MEDICAL_INSTRUCTIONS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::mock::{scripted_agents, FixedSummary, ScriptedAgent};
    use crate::chat::Role;
    use crate::db::{open_memory_database, seed_demo_data};
    use crate::knowledge::KnowledgeError;

    struct StubRetriever(Result<Option<&'static str>, ()>);

    impl MedicalRetriever for StubRetriever {
        fn search(&self, _query: &str, _top_k: usize) -> Result<Option<String>, KnowledgeError> {
            match &self.0 {
                Ok(found) => Ok(found.map(String::from)),
                Err(()) => Err(KnowledgeError::Io(std::io::Error::other("index unreadable"))),
            }
        }
    }

    fn directory() -> Box<dyn SlotDirectory> {
        let mut conn = open_memory_database().unwrap();
        seed_demo_data(&mut conn).unwrap();
        Box::new(conn)
    }

    fn doctor(name: &str, spec: &str) -> Doctor {
        Doctor {
            name: name.into(),
            specialization: spec.into(),
            user_id: None,
        }
    }

    #[test]
    fn roster_grouped_by_specialization() {
        let text = format_doctor_roster(&[
            doctor("Dr. Colombo", "Cardiology"),
            doctor("Dr. Ferrari", "Cardiology"),
            doctor("Dr. Fontana", "Neurology"),
        ]);
        assert_eq!(
            text,
            "AVAILABLE DOCTORS IN OUR SYSTEM:\n- Cardiology: Dr. Colombo, Dr. Ferrari\n- Neurology: Dr. Fontana"
        );
        assert_eq!(format_doctor_roster(&[]), "NO DOCTORS AVAILABLE in the system.");
    }

    #[test]
    fn headache_without_index_gets_roster_but_no_knowledge() {
        let medical = ScriptedAgent::replying("See Dr. Fontana.");
        let seen = medical.seen();
        let mut dispatcher = Dispatcher::new(
            directory(),
            scripted_agents(medical, ScriptedAgent::replying("-"), FixedSummary::new("-")),
            None,
            2,
        );
        let mut buffers = SessionBuffers::new(10);

        let response = dispatcher
            .dispatch(Intent::MedicalQa, "Mario Rossi", &mut buffers, "I have a headache")
            .unwrap();
        assert_eq!(response, "See Dr. Fontana.");

        let sent = &seen.lock().unwrap()[0];
        let augmented = &sent.last().unwrap().content;
        assert!(augmented.starts_with("I have a headache\n\n[SYSTEM - DOCTORS DATABASE]:\nAVAILABLE DOCTORS IN OUR SYSTEM:\n"));
        assert!(augmented.contains("- Neurology: Dr. Fontana, Dr. Moretti"));
        assert!(augmented.ends_with(MEDICAL_INSTRUCTIONS));
        assert!(!augmented.contains("[SYSTEM - MEDICAL KNOWLEDGE BASE]"));

        assert_eq!(buffers.medical.len(), 2);
        assert_eq!(buffers.medical.last_assistant().unwrap().content, "See Dr. Fontana.");
        assert!(buffers.appointments.is_empty());
    }

    #[test]
    fn retrieved_knowledge_is_embedded() {
        let medical = ScriptedAgent::replying("ok");
        let seen = medical.seen();
        let mut dispatcher = Dispatcher::new(
            directory(),
            scripted_agents(medical, ScriptedAgent::replying("-"), FixedSummary::new("-")),
            Some(Arc::new(StubRetriever(Ok(Some("Tension headaches are common."))))),
            2,
        );
        let mut buffers = SessionBuffers::new(10);
        dispatcher
            .dispatch(Intent::MedicalQa, "u", &mut buffers, "headache")
            .unwrap();
        let augmented = seen.lock().unwrap()[0][0].content.clone();
        assert!(augmented.contains("[SYSTEM - MEDICAL KNOWLEDGE BASE]:\nTension headaches are common.\n\nINSTRUCTIONS:"));
    }

    #[test]
    fn retrieval_failure_degrades_silently() {
        let medical = ScriptedAgent::replying("ok");
        let seen = medical.seen();
        let mut dispatcher = Dispatcher::new(
            directory(),
            scripted_agents(medical, ScriptedAgent::replying("-"), FixedSummary::new("-")),
            Some(Arc::new(StubRetriever(Err(())))),
            2,
        );
        let mut buffers = SessionBuffers::new(10);
        assert!(dispatcher.dispatch(Intent::MedicalQa, "u", &mut buffers, "cough").is_ok());
        assert!(!seen.lock().unwrap()[0][0].content.contains("KNOWLEDGE BASE"));
    }

    #[test]
    fn summary_bypasses_both_buffers() {
        let summary = FixedSummary::new("Consultation Summary: ...");
        let users = summary.users.clone();
        let medical = ScriptedAgent::replying("-");
        let appointments = ScriptedAgent::replying("-");
        let (medical_seen, appointments_seen) = (medical.seen(), appointments.seen());
        let mut dispatcher = Dispatcher::new(directory(), scripted_agents(medical, appointments, summary), None, 2);
        let mut buffers = SessionBuffers::new(10);
        buffers.medical.append(ConversationEntry::user("earlier"));

        let response = dispatcher
            .dispatch(Intent::Summary, "Mario Rossi", &mut buffers, "give me a summary")
            .unwrap();
        assert_eq!(response, "Consultation Summary: ...");
        assert_eq!(*users.lock().unwrap(), vec!["Mario Rossi"]);
        assert_eq!(buffers.medical.len(), 1);
        assert!(buffers.appointments.is_empty());
        assert!(medical_seen.lock().unwrap().is_empty());
        assert!(appointments_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn sql_buffer_stays_within_bound() {
        let mut dispatcher = Dispatcher::new(
            directory(),
            scripted_agents(ScriptedAgent::replying("-"), ScriptedAgent::echo("ack: "), FixedSummary::new("-")),
            None,
            2,
        );
        let mut buffers = SessionBuffers::new(3);
        for i in 0..5 {
            let response = dispatcher
                .dispatch(Intent::SqlAgent, "u", &mut buffers, &format!("book slot {i}"))
                .unwrap();
            assert_eq!(response, format!("ack: book slot {i}"));
            assert!(buffers.appointments.len() <= 3);
        }
        let roles: Vec<Role> = buffers.appointments.iter().map(|e| e.role).collect();
        assert_eq!(roles, vec![Role::Assistant, Role::User, Role::Assistant]);
        assert!(buffers.medical.is_empty());
    }

    #[test]
    fn agent_failure_propagates() {
        let mut dispatcher = Dispatcher::new(
            directory(),
            scripted_agents(ScriptedAgent::failing(), ScriptedAgent::replying("-"), FixedSummary::new("-")),
            None,
            2,
        );
        let mut buffers = SessionBuffers::new(10);
        let err = dispatcher
            .dispatch(Intent::MedicalQa, "u", &mut buffers, "hello")
            .unwrap_err();
        assert!(err.to_string().contains("Cannot reach Ollama"));
    }
}

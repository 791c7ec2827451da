use std::path::PathBuf;
use std::sync::Arc;

use super::appointments::{AppointmentAgent, AppointmentToolbox};
use super::lab_report::analyze_lab_report;
use super::medical::{MedicalAgent, MedicalToolbox};
use super::prompts::PromptLinks;
use super::summary::{summarize_patient_problem, ConsultationSummarizer};
use super::{AgentError, AgentProvider, SessionAgents};
use crate::config::Config;
use crate::db::open_database;
use crate::knowledge::MedicalRetriever;
use crate::llm::LlmClient;
use crate::transcript::TranscriptLogger;

/// Builds the production agents. Each session agent gets its own SQLite connection.
pub struct LlmAgentProvider {
    llm: Arc<dyn LlmClient>,
    model: String,
    database_path: PathBuf,
    transcripts: TranscriptLogger,
    retriever: Option<Arc<dyn MedicalRetriever>>,
    top_k: usize,
    links: PromptLinks,
}

impl LlmAgentProvider {
    pub fn new(
        config: &Config,
        llm: Arc<dyn LlmClient>,
        retriever: Option<Arc<dyn MedicalRetriever>>,
    ) -> Self {
        Self {
            llm,
            model: config.chat_model.clone(),
            database_path: config.database_path.clone(),
            transcripts: TranscriptLogger::new(&config.transcripts_dir),
            retriever,
            top_k: config.retrieval_top_k,
            links: PromptLinks::from_config(config),
        }
    }
}

impl AgentProvider for LlmAgentProvider {
    fn session_agents(&self, user_name: &str) -> Result<SessionAgents, AgentError> {
        let medical_tools = MedicalToolbox::new(
            open_database(&self.database_path)?,
            self.retriever.clone(),
            self.top_k,
            user_name,
        );
        let appointment_tools = AppointmentToolbox::new(open_database(&self.database_path)?, user_name);
        let summarizer = ConsultationSummarizer::new(
            self.llm.clone(),
            &self.model,
            open_database(&self.database_path)?,
            self.transcripts.clone(),
        );

        Ok(SessionAgents {
            medical: Box::new(MedicalAgent::new(self.llm.clone(), &self.model, &self.links, medical_tools)),
            appointments: Box::new(AppointmentAgent::new(
                self.llm.clone(),
                &self.model,
                &self.links,
                appointment_tools,
            )),
            summary: Box::new(summarizer),
        })
    }

    fn patient_problem(&self, patient: &str) -> Result<String, AgentError> {
        summarize_patient_problem(self.llm.as_ref(), &self.model, &self.transcripts, patient)
    }

    fn analyze_lab_report(&self, report_text: &str) -> Result<String, AgentError> {
        analyze_lab_report(
            self.llm.as_ref(),
            &self.model,
            self.retriever.as_deref(),
            report_text,
        )
    }
}

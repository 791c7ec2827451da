//! Shared state for the HTTP and WebSocket layer.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::agents::AgentProvider;
use crate::api::error::ApiError;
use crate::auth::SessionStore;
use crate::config::Config;
use crate::db::open_database;
use crate::knowledge::MedicalRetriever;
use crate::transcript::TranscriptLogger;

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<Config>,
    pub sessions: Arc<Mutex<SessionStore>>,
    pub agents: Arc<dyn AgentProvider>,
    pub retriever: Option<Arc<dyn MedicalRetriever>>,
    pub transcripts: TranscriptLogger,
}

impl ApiContext {
    pub fn new(
        config: Config,
        agents: Arc<dyn AgentProvider>,
        retriever: Option<Arc<dyn MedicalRetriever>>,
    ) -> Self {
        let transcripts = TranscriptLogger::new(&config.transcripts_dir);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(SessionStore::new())),
            agents,
            retriever,
            transcripts,
        }
    }

    /// Fresh connection to the application database.
    pub fn open_db(&self) -> Result<Connection, ApiError> {
        open_database(&self.config.database_path).map_err(ApiError::from)
    }

    pub fn lock_sessions(&self) -> Result<MutexGuard<'_, SessionStore>, ApiError> {
        self.sessions
            .lock()
            .map_err(|_| ApiError::Internal("session store lock poisoned".into()))
    }
}

//! Per-user plain-text chat transcripts.
//!
//! Each user has one append-only file, `<transcripts_dir>/<lowercased name>.txt`.
//! Every turn is a single write of
//! `"[DD-MM-YYYY HH:MM:SS] role: text\n\n"`, where role is `user` or `bot`.
//! [`parse_transcript`] reads the same layout back for the history APIs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::{Local, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// Matches one record header. The body runs until the next `"\n["` or end of file.
static RECORD_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d{2}-\d{2}-\d{4} \d{2}:\d{2}:\d{2})\] (user|bot): ").unwrap()
});

#[derive(Error, Debug)]
pub enum TranscriptError {
    #[error("Transcript I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid transcript user name: {0:?}")]
    InvalidUserName(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Bot,
}

impl TranscriptRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

/// One parsed transcript turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub timestamp: String,
    pub role: TranscriptRole,
    pub text: String,
}

/// Render a single transcript line.
pub fn format_record(timestamp: &NaiveDateTime, role: TranscriptRole, text: &str) -> String {
    format!(
        "[{}] {}: {}\n\n",
        timestamp.format(TIMESTAMP_FORMAT),
        role.as_str(),
        text
    )
}

/// Parse a transcript into records, trimming each body.
///
/// A body ends at the first `"\n["` after it starts, so text containing a
/// newline followed by `[` is cut short. Content before the first header is ignored.
pub fn parse_transcript(content: &str) -> Vec<TranscriptRecord> {
    let mut records = Vec::new();
    let mut pos = 0;

    while let Some(caps) = RECORD_HEADER.captures_at(content, pos) {
        let (Some(header), Some(timestamp), Some(role)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            break;
        };

        let body_start = header.end();
        // The body holds at least one character, even if that is the newline of "\n[".
        let Some(first) = content[body_start..].chars().next() else {
            break;
        };
        let scan_from = body_start + first.len_utf8();
        let body_end = content[scan_from..]
            .find("\n[")
            .map(|i| scan_from + i)
            .unwrap_or(content.len());

        records.push(TranscriptRecord {
            timestamp: timestamp.as_str().to_string(),
            role: if role.as_str() == "user" {
                TranscriptRole::User
            } else {
                TranscriptRole::Bot
            },
            text: content[body_start..body_end].trim().to_string(),
        });
        pos = body_end;
    }

    records
}

/// Writes and reads transcript files under one directory.
#[derive(Debug, Clone)]
pub struct TranscriptLogger {
    dir: PathBuf,
}

impl TranscriptLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File for a user, keyed by the lower-cased name.
    pub fn path_for(&self, user_name: &str) -> Result<PathBuf, TranscriptError> {
        let key = user_name.trim().to_lowercase();
        let safe = !key.is_empty()
            && key != "."
            && key != ".."
            && !key.contains(['/', '\\', '\0']);
        if !safe {
            return Err(TranscriptError::InvalidUserName(user_name.to_string()));
        }
        Ok(self.dir.join(format!("{key}.txt")))
    }

    /// Create an empty transcript if the user has none yet.
    pub fn ensure_exists(&self, user_name: &str) -> Result<PathBuf, TranscriptError> {
        let path = self.path_for(user_name)?;
        std::fs::create_dir_all(&self.dir)?;
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(path)
    }

    /// Append one turn stamped with the local time.
    pub fn log(&self, role: TranscriptRole, text: &str, user_name: &str) -> Result<(), TranscriptError> {
        self.log_at(&Local::now().naive_local(), role, text, user_name)
    }

    pub fn log_at(
        &self,
        timestamp: &NaiveDateTime,
        role: TranscriptRole,
        text: &str,
        user_name: &str,
    ) -> Result<(), TranscriptError> {
        let path = self.path_for(user_name)?;
        std::fs::create_dir_all(&self.dir)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        // One write per record so concurrent appenders never interleave within a line.
        file.write_all(format_record(timestamp, role, text).as_bytes())?;
        Ok(())
    }

    /// Raw transcript content, empty if the user has no file.
    pub fn read(&self, user_name: &str) -> Result<String, TranscriptError> {
        let path = self.path_for(user_name)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn records(&self, user_name: &str) -> Result<Vec<TranscriptRecord>, TranscriptError> {
        Ok(parse_transcript(&self.read(user_name)?))
    }
}

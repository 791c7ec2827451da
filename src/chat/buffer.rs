use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
}

impl ConversationEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sliding window over the most recent `bound` entries.
///
/// Every append past the bound drops entries from the front, so the
/// oldest turn is always the first to go.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    entries: VecDeque<ConversationEntry>,
    bound: usize,
}

impl ConversationBuffer {
    /// A bound of zero is raised to one.
    pub fn new(bound: usize) -> Self {
        let bound = bound.max(1);
        Self {
            entries: VecDeque::with_capacity(bound + 1),
            bound,
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn append(&mut self, entry: ConversationEntry) {
        self.entries.push_back(entry);
        self.truncate_to(self.bound);
    }

    /// Keep only the trailing `bound` entries.
    pub fn truncate_to(&mut self, bound: usize) {
        while self.entries.len() > bound {
            self.entries.pop_front();
        }
    }

    /// Swap in the conversation an agent handed back.
    pub fn replace(&mut self, entries: Vec<ConversationEntry>) {
        self.entries = entries.into();
        self.truncate_to(self.bound);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ConversationEntry> {
        self.entries.iter()
    }

    /// Most recent assistant turn, if any.
    pub fn last_assistant(&self) -> Option<&ConversationEntry> {
        self.entries.iter().rev().find(|e| e.role == Role::Assistant)
    }

    pub fn to_vec(&self) -> Vec<ConversationEntry> {
        self.entries.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_never_exceeds_bound() {
        let mut buffer = ConversationBuffer::new(3);
        for i in 0..10 {
            buffer.append(ConversationEntry::user(format!("m{i}")));
            assert!(buffer.len() <= 3);
        }
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn append_at_bound_drops_exactly_the_oldest() {
        let mut buffer = ConversationBuffer::new(3);
        buffer.append(ConversationEntry::user("a"));
        buffer.append(ConversationEntry::assistant("b"));
        buffer.append(ConversationEntry::user("c"));
        buffer.append(ConversationEntry::assistant("d"));

        let contents: Vec<_> = buffer.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["b", "c", "d"]);
    }

    #[test]
    fn replace_then_append_keeps_window() {
        let mut buffer = ConversationBuffer::new(2);
        buffer.replace(vec![
            ConversationEntry::user("1"),
            ConversationEntry::assistant("2"),
            ConversationEntry::user("3"),
        ]);
        assert_eq!(buffer.len(), 2);
        buffer.append(ConversationEntry::assistant("4"));
        let contents: Vec<_> = buffer.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["3", "4"]);
    }

    #[test]
    fn last_assistant_scans_backward() {
        let mut buffer = ConversationBuffer::new(10);
        assert!(buffer.last_assistant().is_none());
        buffer.append(ConversationEntry::assistant("old"));
        buffer.append(ConversationEntry::assistant("new"));
        buffer.append(ConversationEntry::user("question"));
        assert_eq!(buffer.last_assistant().unwrap().content, "new");
    }

    #[test]
    fn zero_bound_is_raised() {
        let mut buffer = ConversationBuffer::new(0);
        buffer.append(ConversationEntry::user("only"));
        assert_eq!(buffer.bound(), 1);
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn entries_serialize_with_lowercase_roles() {
        let json = serde_json::to_value(ConversationEntry::assistant("hi")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}

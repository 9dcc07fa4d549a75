use serde::{Deserialize, Serialize};

/// Caller-owned conversation context. The pipeline and router read only the
/// current index name; the history exists for the interactive surface and
/// never influences retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    index_name: Option<String>,
    history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(name: impl Into<String>) -> Self {
        Self {
            index_name: Some(name.into()),
            history: Vec::new(),
        }
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn set_index(&mut self, name: impl Into<String>) {
        self.index_name = Some(name.into());
    }

    pub fn record(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.history.push(HistoryEntry {
            role: role.into(),
            content: content.into(),
        });
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

//! Planned query tasks.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which kind of backend a task is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendClass {
    /// Broad web search ("find companies that ...").
    WebSearch,

    /// Generation grounded in the model's own knowledge.
    KnowledgeGrounded,

    /// Directory-style enumeration, usually per country.
    Directory,
}

impl BackendClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendClass::WebSearch => "web_search",
            BackendClass::KnowledgeGrounded => "knowledge_grounded",
            BackendClass::Directory => "directory",
        }
    }
}

impl fmt::Display for BackendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned query. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    text: String,
    backend: BackendClass,
    round: usize,
}

impl Task {
    /// Create a new task.
    pub fn new(text: impl Into<String>, backend: BackendClass, round: usize) -> Self {
        Self {
            text: text.into(),
            backend,
            round,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn backend(&self) -> BackendClass {
        self.backend
    }

    pub fn round(&self) -> usize {
        self.round
    }
}

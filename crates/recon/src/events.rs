//! Structured run events.
//!
//! The engine never logs. Every entry point appends to an [`EventLog`] and
//! hands it back to the caller, which routes events to a terminal, a log file
//! or a UI. Events are append-only and ordered by emission.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for EventLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunEvent {
    pub level: EventLevel,
    pub message: String,
}

/// Append-only event collector.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<RunEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(EventLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(EventLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(EventLevel::Error, message);
    }

    fn push(&mut self, level: EventLevel, message: impl Into<String>) {
        self.events.push(RunEvent { level, message: message.into() });
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RunEvent> {
        self.events.iter().filter(|e| e.level == EventLevel::Warning)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<RunEvent> {
        self.events
    }
}

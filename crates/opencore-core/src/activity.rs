// ABOUTME: Records agent-to-agent interactions and per-request activity for the swarm.
// ABOUTME: InteractionLog is a fixed-capacity ring buffer that evicts its oldest entry on append.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of interactions retained by the swarm.
pub const INTERACTION_CAPACITY: usize = 20;

/// Maximum characters kept in an interaction or activity summary.
pub const SUMMARY_LIMIT: usize = 100;

/// A single message passed between two agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub source: String,
    pub target: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    /// Create an interaction stamped with the current time; the summary is truncated.
    pub fn new(source: impl Into<String>, target: impl Into<String>, summary: &str) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            summary: summary_of(summary),
            timestamp: Utc::now(),
        }
    }
}

/// Bounded history of interactions. Appending past capacity drops the oldest entry.
#[derive(Debug, Clone)]
pub struct InteractionLog {
    entries: VecDeque<Interaction>,
    capacity: usize,
}

impl InteractionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, interaction: Interaction) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(interaction);
    }

    /// Snapshot of the retained interactions, oldest first.
    pub fn to_vec(&self) -> Vec<Interaction> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InteractionLog {
    fn default() -> Self {
        Self::new(INTERACTION_CAPACITY)
    }
}

/// What kind of thing happened during a top-level request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// An agent or team was created, removed, toggled or reconfigured.
    Lifecycle,
    /// One agent handed a task to another.
    Delegation,
    /// A delegated agent answered.
    Response,
}

/// One line of the per-request activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub source: String,
    pub target: Option<String>,
    pub summary: String,
}

impl ActivityEntry {
    pub fn lifecycle(source: impl Into<String>, summary: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: ActivityKind::Lifecycle,
            source: source.into(),
            target: None,
            summary: summary_of(summary),
        }
    }

    /// Mirror an interaction into the activity log with the given kind.
    pub fn from_interaction(kind: ActivityKind, interaction: &Interaction) -> Self {
        Self {
            timestamp: interaction.timestamp,
            kind,
            source: interaction.source.clone(),
            target: Some(interaction.target.clone()),
            summary: interaction.summary.clone(),
        }
    }
}

/// Truncate a summary to `SUMMARY_LIMIT` characters, marking the cut with an ellipsis.
pub fn summary_of(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SUMMARY_LIMIT {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(SUMMARY_LIMIT).collect();
    cut.push_str("...");
    cut
}

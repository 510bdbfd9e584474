//! Decision entities and the typed events that mutate them.
//!
//! Decisions are never persisted directly. The event log is the source of
//! truth; `Decision` values exist only inside replayed indexes. Each event
//! kind carries exactly the payload fields that kind can apply, and payload
//! validation happens at decode time, not at apply time.

use serde::{Deserialize, Serialize};

/// Lifecycle states of a decision. `Active` is the only state eligible for
/// duplicate/conflict checks and context surfacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Draft,
    Active,
    Rejected,
    Superseded,
}

impl DecisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionStatus::Draft => "draft",
            DecisionStatus::Active => "active",
            DecisionStatus::Rejected => "rejected",
            DecisionStatus::Superseded => "superseded",
        }
    }

    pub fn parse(value: &str) -> Option<DecisionStatus> {
        match value {
            "draft" => Some(DecisionStatus::Draft),
            "active" => Some(DecisionStatus::Active),
            "rejected" => Some(DecisionStatus::Rejected),
            "superseded" => Some(DecisionStatus::Superseded),
            _ => None,
        }
    }
}

/// Closed category set shared by the rule tables and the external
/// classifier contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Architecture,
    Tooling,
    Policy,
    Data,
    Quality,
    Workflow,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Architecture => "architecture",
            Category::Tooling => "tooling",
            Category::Policy => "policy",
            Category::Data => "data",
            Category::Quality => "quality",
            Category::Workflow => "workflow",
        }
    }

    pub fn parse(value: &str) -> Option<Category> {
        match value {
            "architecture" => Some(Category::Architecture),
            "tooling" => Some(Category::Tooling),
            "policy" => Some(Category::Policy),
            "data" => Some(Category::Data),
            "quality" => Some(Category::Quality),
            "workflow" => Some(Category::Workflow),
            _ => None,
        }
    }
}

/// A materialized decision, rebuilt from the log on every load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
    pub status: DecisionStatus,
    /// Id of the decision this one replaced, if any.
    pub supersedes: Option<String>,
    /// Ids of active decisions this one was recorded as contradicting.
    pub conflicts_with: Vec<String>,
    pub reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// Actor recorded on the creating event (`user`, `rule`, `external`).
    pub created_by: Option<String>,
    /// Classifier confidence at capture time, when captured.
    pub confidence: Option<f64>,
    pub category: Option<Category>,
}

impl Decision {
    /// Canonical matching text: the full text, or the title when the text
    /// is blank. Duplicate and conflict checks run against this.
    pub fn content(&self) -> &str {
        if self.text.trim().is_empty() { &self.title } else { &self.text }
    }
}

/// Payload of an `Add` event. Every field is optional on the wire; apply
/// fills defaults (empty strings/lists, status `active`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddPayload {
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<DecisionStatus>,
    pub reason: Option<String>,
    pub supersedes: Option<String>,
    pub conflicts_with: Option<Vec<String>>,
    pub source: Option<String>,
    pub confidence: Option<f64>,
    pub category: Option<Category>,
}

/// Sparse merge payload for `Edit` (and the reserved `Supersede` code).
/// Present fields overwrite the decision's fields; absent fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangePayload {
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<DecisionStatus>,
    pub reason: Option<String>,
    pub supersedes: Option<String>,
    pub conflicts_with: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Add(AddPayload),
    Edit(ChangePayload),
    SetStatus {
        status: DecisionStatus,
        reason: Option<String>,
    },
    /// Reserved wire code `su`: decoded and applied as a sparse merge for
    /// log compatibility, but never emitted. Supersession is written as a
    /// `SetStatus` on the old decision plus an `Add` for the replacement.
    Supersede(ChangePayload),
    Remove,
}

impl EventKind {
    /// Single-letter wire code stored under the `e` key.
    pub fn code(&self) -> &'static str {
        match self {
            EventKind::Add(_) => "a",
            EventKind::Edit(_) => "ed",
            EventKind::SetStatus { .. } => "st",
            EventKind::Supersede(_) => "su",
            EventKind::Remove => "rm",
        }
    }
}

/// One mutation record in the append-only log.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEvent {
    /// ISO-8601 UTC timestamp with millisecond precision.
    pub timestamp: String,
    pub project_id: String,
    /// Id of the decision this event targets.
    pub target_id: String,
    pub kind: EventKind,
    pub actor: Option<String>,
}

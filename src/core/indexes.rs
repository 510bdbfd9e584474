//! Derived in-memory indexes over the decision event log.
//!
//! Indexes are disposable: replaying the full log from empty state yields
//! the same maps every time. Every apply keeps the id map and the
//! status/tag memberships consistent with each other; there is no point
//! between events where a decision is in one and not the other.

use crate::core::event::{ChangePayload, Decision, DecisionEvent, DecisionStatus, EventKind};
use rustc_hash::FxHashMap;

/// `by_id` owns the decisions. `by_status` and `by_tag` hold ids in
/// last-indexed order: an id moves to the end of its status list whenever
/// the decision is re-indexed, which is what "most recent actives" context
/// selection relies on.
#[derive(Debug, Default)]
pub struct DecisionIndexes {
    by_id: FxHashMap<String, Decision>,
    by_status: FxHashMap<DecisionStatus, Vec<String>>,
    by_tag: FxHashMap<String, Vec<String>>,
}

impl DecisionIndexes {
    pub fn new() -> DecisionIndexes {
        DecisionIndexes::default()
    }

    /// Replays an ordered event sequence from empty state.
    pub fn replay(events: &[DecisionEvent]) -> DecisionIndexes {
        let mut indexes = DecisionIndexes::new();
        for event in events {
            indexes.apply_event(event);
        }
        indexes
    }

    pub fn get(&self, id: &str) -> Option<&Decision> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn decisions(&self) -> impl Iterator<Item = &Decision> {
        self.by_id.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.by_id.keys()
    }

    /// Ids currently holding `status`, oldest first.
    pub fn ids_with_status(&self, status: DecisionStatus) -> &[String] {
        self.by_status.get(&status).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ids_with_tag(&self, tag: &str) -> &[String] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Active decisions in index order.
    pub fn active_decisions(&self) -> Vec<&Decision> {
        self.ids_with_status(DecisionStatus::Active)
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .collect()
    }

    /// Applies one event. Events that target an unknown id are silent
    /// no-ops except `Add`, which creates the entity.
    pub fn apply_event(&mut self, event: &DecisionEvent) {
        match &event.kind {
            EventKind::Add(payload) => {
                if let Some(previous) = self.by_id.remove(&event.target_id) {
                    self.unindex(&previous);
                }
                let decision = Decision {
                    id: event.target_id.clone(),
                    project_id: event.project_id.clone(),
                    title: payload.title.clone().unwrap_or_default(),
                    text: payload.text.clone().unwrap_or_default(),
                    tags: payload.tags.clone().unwrap_or_default(),
                    status: payload.status.unwrap_or(DecisionStatus::Active),
                    supersedes: payload.supersedes.clone(),
                    conflicts_with: payload.conflicts_with.clone().unwrap_or_default(),
                    reason: payload.reason.clone(),
                    created_at: event.timestamp.clone(),
                    updated_at: event.timestamp.clone(),
                    created_by: event.actor.clone(),
                    confidence: payload.confidence,
                    category: payload.category,
                };
                self.index(&decision);
                self.by_id.insert(decision.id.clone(), decision);
            }
            EventKind::Edit(payload) | EventKind::Supersede(payload) => {
                self.merge(event, payload);
            }
            EventKind::SetStatus { status, reason } => {
                let payload = ChangePayload {
                    status: Some(*status),
                    reason: reason.clone(),
                    ..ChangePayload::default()
                };
                self.merge(event, &payload);
            }
            EventKind::Remove => {
                if let Some(previous) = self.by_id.remove(&event.target_id) {
                    self.unindex(&previous);
                }
            }
        }
    }

    fn merge(&mut self, event: &DecisionEvent, payload: &ChangePayload) {
        let Some(mut decision) = self.by_id.remove(&event.target_id) else {
            return;
        };
        self.unindex(&decision);
        if let Some(title) = &payload.title {
            decision.title = title.clone();
        }
        if let Some(text) = &payload.text {
            decision.text = text.clone();
        }
        if let Some(tags) = &payload.tags {
            decision.tags = tags.clone();
        }
        if let Some(status) = payload.status {
            decision.status = status;
        }
        if let Some(reason) = &payload.reason {
            decision.reason = Some(reason.clone());
        }
        if let Some(supersedes) = &payload.supersedes {
            decision.supersedes = Some(supersedes.clone());
        }
        if let Some(conflicts) = &payload.conflicts_with {
            decision.conflicts_with = conflicts.clone();
        }
        decision.updated_at = event.timestamp.clone();
        self.index(&decision);
        self.by_id.insert(decision.id.clone(), decision);
    }

    fn index(&mut self, decision: &Decision) {
        let ids = self.by_status.entry(decision.status).or_default();
        if !ids.contains(&decision.id) {
            ids.push(decision.id.clone());
        }
        for tag in &decision.tags {
            let ids = self.by_tag.entry(tag.clone()).or_default();
            if !ids.contains(&decision.id) {
                ids.push(decision.id.clone());
            }
        }
    }

    fn unindex(&mut self, decision: &Decision) {
        if let Some(ids) = self.by_status.get_mut(&decision.status) {
            ids.retain(|id| id != &decision.id);
        }
        for tag in &decision.tags {
            if let Some(ids) = self.by_tag.get_mut(tag) {
                ids.retain(|id| id != &decision.id);
            }
        }
    }
}

use chrono::{Duration, Utc};
use edict::core::error::EdictError;
use edict::core::event::{ChangePayload, DecisionEvent, DecisionStatus, EventKind};
use edict::core::identity::ProjectIdentity;
use edict::core::indexes::DecisionIndexes;
use edict::core::journal;
use edict::core::store::Store;
use edict::core::time;
use edict::plugins::memory::{
    AddOutcome, ConflictAction, DuplicateAction, MemoryState, ToggleScope, add_decision,
    edit_decision, list_decisions, memory_status, purge_decisions, remove_decision,
    reset_decisions, search_decisions, set_enabled_scope, supersede_decision,
};
use std::fs;
use tempfile::tempdir;

const PROJECT: &str = "abcd1234abcd1234";

/// State wired to a temp journal, bypassing identity/config resolution.
fn test_state(store: &Store) -> MemoryState {
    let mut state = MemoryState::unready();
    state.ready = true;
    state.identity = Some(ProjectIdentity {
        project_id: PROJECT.to_string(),
        root: store.root.clone(),
    });
    state.journal_path = Some(store.events_path());
    state
}

fn added_id(outcome: &AddOutcome) -> String {
    match outcome {
        AddOutcome::Added { id, .. } => id.clone(),
        other => panic!("expected Added, got {:?}", other),
    }
}

#[test]
fn test_add_edit_remove_lifecycle() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    // 1. Add
    let outcome = add_decision(
        &mut state,
        "  Use Postgres for persistence  ",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    let id = added_id(&outcome);
    let decision = state.indexes.get(&id).unwrap();
    assert_eq!(decision.text, "Use Postgres for persistence");
    assert_eq!(decision.title, "Use Postgres for persistence");
    assert_eq!(decision.status, DecisionStatus::Active);
    assert_eq!(decision.created_by.as_deref(), Some("user"));
    assert_eq!(decision.confidence, None);

    // 2. Edit
    edit_decision(&mut state, &id, "Use Postgres 16 for persistence").unwrap();
    let decision = state.indexes.get(&id).unwrap();
    assert_eq!(decision.text, "Use Postgres 16 for persistence");
    assert_eq!(decision.title, "Use Postgres 16 for persistence");

    // 3. Everything so far is in the journal
    let events = journal::load_events(&store.events_path()).unwrap();
    assert_eq!(events.len(), 2);
    let replayed = DecisionIndexes::replay(&events);
    assert_eq!(replayed.get(&id), state.indexes.get(&id));

    // 4. Remove
    remove_decision(&mut state, &id).unwrap();
    assert!(state.indexes.is_empty());
    assert!(list_decisions(&state).unwrap().is_empty());

    // 5. Unknown ids are reported, not ignored
    let err = edit_decision(&mut state, &id, "ghost").unwrap_err();
    assert!(matches!(err, EdictError::NotFound(_)));
}

#[test]
fn test_add_rejects_blank_text() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    let err = add_decision(&mut state, "   ", DuplicateAction::Cancel, ConflictAction::Cancel)
        .unwrap_err();
    assert!(matches!(err, EdictError::ValidationError(_)));
}

#[test]
fn test_unready_state_refuses_operations() {
    let mut state = MemoryState::unready();
    let err = add_decision(&mut state, "Use tabs", DuplicateAction::Cancel, ConflictAction::Cancel)
        .unwrap_err();
    assert!(matches!(err, EdictError::NotReady(_)));
}

#[test]
fn test_duplicate_actions() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let first = add_decision(
        &mut state,
        "Use Postgres for persistence",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    let first_id = added_id(&first);

    // 1. Default cancels and names the duplicate; spacing and case do not matter
    let outcome = add_decision(
        &mut state,
        "use   POSTGRES for persistence",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    assert_eq!(outcome, AddOutcome::DuplicateCancelled { id: first_id.clone() });
    assert_eq!(state.indexes.len(), 1);

    // 2. Update rewrites the existing decision in place
    let outcome = add_decision(
        &mut state,
        "use   POSTGRES for persistence",
        DuplicateAction::Update,
        ConflictAction::Cancel,
    )
    .unwrap();
    assert_eq!(outcome, AddOutcome::Updated { id: first_id.clone() });
    assert_eq!(state.indexes.len(), 1);
    assert_eq!(state.indexes.get(&first_id).unwrap().text, "use   POSTGRES for persistence");

    // 3. New adds a second decision anyway
    let outcome = add_decision(
        &mut state,
        "Use Postgres for persistence",
        DuplicateAction::New,
        ConflictAction::Cancel,
    )
    .unwrap();
    let second_id = added_id(&outcome);
    assert_ne!(second_id, first_id);
    assert_eq!(state.indexes.len(), 2);
}

#[test]
fn test_conflict_cancel_and_keep() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let first = add_decision(
        &mut state,
        "Use MySQL as the primary database",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    let first_id = added_id(&first);

    // 1. Opposite polarity over shared keywords cancels by default
    let outcome = add_decision(
        &mut state,
        "Do not use MySQL as the primary database",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    assert_eq!(outcome, AddOutcome::ConflictCancelled { conflicts_with: vec![first_id.clone()] });
    assert_eq!(state.indexes.len(), 1);

    // 2. Keep records the conflict on the new decision
    let outcome = add_decision(
        &mut state,
        "Do not use MySQL as the primary database",
        DuplicateAction::Cancel,
        ConflictAction::Keep,
    )
    .unwrap();
    let new_id = added_id(&outcome);
    let decision = state.indexes.get(&new_id).unwrap();
    assert_eq!(decision.conflicts_with, vec![first_id.clone()]);
    assert_eq!(state.indexes.get(&first_id).unwrap().status, DecisionStatus::Active);
    assert_eq!(state.indexes.len(), 2);
}

#[test]
fn test_conflict_supersede_replaces_the_loser() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let first = add_decision(
        &mut state,
        "Use MySQL as the primary database",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    let first_id = added_id(&first);

    let outcome = add_decision(
        &mut state,
        "Never use MySQL as the primary database",
        DuplicateAction::Cancel,
        ConflictAction::Supersede,
    )
    .unwrap();
    let AddOutcome::Superseded { id: new_id, supersedes } = outcome else {
        panic!("expected Superseded");
    };
    assert_eq!(supersedes, first_id);

    let old = state.indexes.get(&first_id).unwrap();
    assert_eq!(old.status, DecisionStatus::Superseded);
    assert_eq!(old.reason.as_deref(), Some("Superseded by conflicting new decision"));

    let new = state.indexes.get(&new_id).unwrap();
    assert_eq!(new.status, DecisionStatus::Active);
    assert_eq!(new.supersedes.as_deref(), Some(first_id.as_str()));
    // the replacement lands after the status flip in the log
    assert!(new.created_at > old.updated_at);

    let events = journal::load_events(&store.events_path()).unwrap();
    assert_eq!(events.len(), 3);
}

#[test]
fn test_supersede_command() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let first = add_decision(
        &mut state,
        "Pin Rust to the 2021 edition",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();
    let first_id = added_id(&first);

    let (new_id, old_id) =
        supersede_decision(&mut state, &first_id, "Pin Rust to the 2024 edition").unwrap();
    assert_eq!(old_id, first_id);
    assert_ne!(new_id, old_id);
    assert_eq!(
        state.indexes.get(&old_id).unwrap().reason.as_deref(),
        Some("Superseded by new decision")
    );
    assert_eq!(state.indexes.get(&new_id).unwrap().text, "Pin Rust to the 2024 edition");

    let err = supersede_decision(&mut state, "D-1999-01-01-0001", "whatever").unwrap_err();
    assert!(matches!(err, EdictError::NotFound(_)));
}

#[test]
fn test_ids_sequence_within_a_day() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let first = added_id(
        &add_decision(&mut state, "Use tabs", DuplicateAction::Cancel, ConflictAction::Cancel)
            .unwrap(),
    );
    let second = added_id(
        &add_decision(&mut state, "Ban println", DuplicateAction::Cancel, ConflictAction::Cancel)
            .unwrap(),
    );
    assert_ne!(first, second);
    let (first_day, first_seq) = first.rsplit_once('-').unwrap();
    let (second_day, second_seq) = second.rsplit_once('-').unwrap();
    if first_day == second_day {
        assert_eq!(
            second_seq.parse::<u32>().unwrap(),
            first_seq.parse::<u32>().unwrap() + 1
        );
    }
}

#[test]
fn test_search_filters_and_terms() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let postgres = added_id(
        &add_decision(
            &mut state,
            "Use Postgres for persistence",
            DuplicateAction::Cancel,
            ConflictAction::Cancel,
        )
        .unwrap(),
    );
    let tabs = added_id(
        &add_decision(&mut state, "Use tabs", DuplicateAction::Cancel, ConflictAction::Cancel)
            .unwrap(),
    );

    // tag and status changes arrive as events, same as any other mutation
    state
        .commit(&DecisionEvent {
            timestamp: time::now_iso(),
            project_id: PROJECT.to_string(),
            target_id: postgres.clone(),
            kind: EventKind::Edit(ChangePayload {
                tags: Some(vec!["Storage".to_string()]),
                ..ChangePayload::default()
            }),
            actor: Some("user".to_string()),
        })
        .unwrap();
    state
        .commit(&DecisionEvent {
            timestamp: time::now_iso(),
            project_id: PROJECT.to_string(),
            target_id: tabs.clone(),
            kind: EventKind::SetStatus { status: DecisionStatus::Rejected, reason: None },
            actor: Some("user".to_string()),
        })
        .unwrap();

    // 1. Free terms match any field, case-insensitively
    let hits = search_decisions(&state, "POSTGRES").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, postgres);

    // 2. status: filters
    let hits = search_decisions(&state, "status:rejected").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, tabs);

    // 3. tag: filters are case-insensitive on the tag
    let hits = search_decisions(&state, "tag:storage").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, postgres);

    // 4. filters and terms combine; all must hold
    assert_eq!(search_decisions(&state, "status:active postgres").unwrap().len(), 1);
    assert!(search_decisions(&state, "status:active tabs").unwrap().is_empty());
    assert!(search_decisions(&state, "nonexistent-term").unwrap().is_empty());
}

#[test]
fn test_purge_respects_retention_windows() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let now = Utc::now();

    let aged = |days: i64, seq: u32, status: DecisionStatus| DecisionEvent {
        timestamp: time::iso_from(now - Duration::days(days)),
        project_id: PROJECT.to_string(),
        target_id: format!("D-2026-01-01-{:04}", seq),
        kind: EventKind::Add(edict::core::event::AddPayload {
            title: Some(format!("decision {}", seq)),
            text: Some(format!("decision {} body", seq)),
            status: Some(status),
            ..edict::core::event::AddPayload::default()
        }),
        actor: Some("user".to_string()),
    };

    // rejected past its 90-day window, rejected inside it, stale active,
    // superseded past its 180-day window
    let events = vec![
        aged(100, 1, DecisionStatus::Rejected),
        aged(10, 2, DecisionStatus::Rejected),
        aged(400, 3, DecisionStatus::Active),
        aged(200, 4, DecisionStatus::Superseded),
    ];
    for event in &events {
        journal::append_event(&store.events_path(), event).unwrap();
    }

    let mut state = test_state(&store);
    state.indexes = DecisionIndexes::replay(&events);
    state.events_loaded = events.len();

    // 1. Dry run reports without removing
    let report = purge_decisions(&mut state, false).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.removed, 0);
    assert_eq!(
        report.candidates,
        vec!["D-2026-01-01-0001".to_string(), "D-2026-01-01-0004".to_string()]
    );
    assert_eq!(state.indexes.len(), 4);

    // 2. --yes removes exactly the candidates
    let report = purge_decisions(&mut state, true).unwrap();
    assert!(!report.dry_run);
    assert_eq!(report.removed, 2);
    assert_eq!(state.indexes.len(), 2);
    assert!(state.indexes.get("D-2026-01-01-0002").is_some());
    assert!(state.indexes.get("D-2026-01-01-0003").is_some());

    // 3. Removals are events; a fresh replay agrees
    let replayed = DecisionIndexes::replay(&journal::load_events(&store.events_path()).unwrap());
    assert_eq!(replayed.len(), 2);
}

#[test]
fn test_reset_removes_everything() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    add_decision(&mut state, "Use tabs", DuplicateAction::Cancel, ConflictAction::Cancel)
        .unwrap();
    add_decision(&mut state, "Ban println", DuplicateAction::Cancel, ConflictAction::Cancel)
        .unwrap();

    let report = reset_decisions(&mut state, false).unwrap();
    assert!(report.dry_run);
    assert_eq!(report.candidates.len(), 2);
    assert_eq!(state.indexes.len(), 2);

    let report = reset_decisions(&mut state, true).unwrap();
    assert_eq!(report.removed, 2);
    assert!(state.indexes.is_empty());
}

#[test]
fn test_status_report() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    add_decision(&mut state, "Use tabs", DuplicateAction::Cancel, ConflictAction::Cancel)
        .unwrap();

    let status = memory_status(&state);
    assert!(status.enabled);
    assert_eq!(status.project, PROJECT);
    assert_eq!(status.decisions, 1);
    assert_eq!(status.events_loaded, 1);

    let status = memory_status(&MemoryState::unready());
    assert_eq!(status.project, "<unresolved>");
    assert_eq!(status.decisions, 0);
}

#[test]
fn test_enable_disable_write_scoped_config() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());

    let path = set_enabled_scope(&store, ToggleScope::Project, false).unwrap();
    assert_eq!(path, store.project_config_path());
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["enabled"], serde_json::json!(false));

    set_enabled_scope(&store, ToggleScope::Project, true).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["enabled"], serde_json::json!(true));
}

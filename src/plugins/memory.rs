//! Decision memory: owned state, command surface, and event commits.
//!
//! `MemoryState` bundles everything a loaded project needs: resolved
//! identity, effective config, the replayed indexes, and the per-turn
//! capture scratch space. There are no process globals; every operation
//! takes the state it works on, and a `ready` flag gates operations until
//! a load has completed.

use crate::core::config::{self, MemoryConfig};
use crate::core::error::EdictError;
use crate::core::event::{
    AddPayload, ChangePayload, Decision, DecisionEvent, DecisionStatus, EventKind,
};
use crate::core::identity::{self, ProjectIdentity};
use crate::core::indexes::DecisionIndexes;
use crate::core::journal;
use crate::core::output;
use crate::core::store::{self, Store};
use crate::core::time;
use crate::plugins::capture::TurnStage;
use crate::plugins::classifier::Classification;
use crate::plugins::conflict;
use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::path::PathBuf;

/// Rows shown by `list` and `search`.
pub const LIST_LIMIT: usize = 25;

/// Chars of decision text promoted into the stored title.
const TITLE_CHARS: usize = 80;

/// Everything one loaded project carries between operations.
#[derive(Debug)]
pub struct MemoryState {
    /// False until identity, config, and the journal have been loaded.
    /// Operations on an unready state fail with `NotReady`.
    pub ready: bool,
    pub config: MemoryConfig,
    pub identity: Option<ProjectIdentity>,
    pub journal_path: Option<PathBuf>,
    pub indexes: DecisionIndexes,
    /// Events that decoded successfully during the last load.
    pub events_loaded: usize,
    /// Candidates extracted this turn, awaiting finalize.
    pub pending_candidates: Vec<String>,
    pub stage: TurnStage,
}

impl MemoryState {
    /// Scaffold that fails every gated operation until `load` replaces it.
    pub fn unready() -> MemoryState {
        MemoryState {
            ready: false,
            config: MemoryConfig::default(),
            identity: None,
            journal_path: None,
            indexes: DecisionIndexes::new(),
            events_loaded: 0,
            pending_candidates: Vec::new(),
            stage: TurnStage::Idle,
        }
    }

    /// Resolves identity, merges config layers, and replays the journal.
    pub fn load(store: &Store) -> Result<MemoryState, EdictError> {
        let identity = identity::resolve_identity(&store.root);
        let config = config::load_effective_config(
            store::global_config_path().as_deref(),
            &store.project_config_path(),
        );
        let journal_path = store.events_path();
        let events = journal::load_events(&journal_path)?;
        let indexes = DecisionIndexes::replay(&events);
        Ok(MemoryState {
            ready: true,
            config,
            identity: Some(identity),
            journal_path: Some(journal_path),
            indexes,
            events_loaded: events.len(),
            pending_candidates: Vec::new(),
            stage: TurnStage::Idle,
        })
    }

    pub fn require_ready(&self) -> Result<(), EdictError> {
        if self.ready {
            Ok(())
        } else {
            Err(EdictError::NotReady(
                "decision memory is still initializing, try again".to_string(),
            ))
        }
    }

    fn require_identity(&self) -> Result<&ProjectIdentity, EdictError> {
        self.identity.as_ref().ok_or_else(|| {
            EdictError::NotReady("project identity is not resolved yet".to_string())
        })
    }

    fn require_journal(&self) -> Result<PathBuf, EdictError> {
        self.journal_path.clone().ok_or_else(|| {
            EdictError::NotReady("decision journal path is not resolved yet".to_string())
        })
    }

    /// Appends to the journal and applies to the indexes as one unit. A
    /// caller never observes the event in one place and not the other.
    pub fn commit(&mut self, event: &DecisionEvent) -> Result<(), EdictError> {
        let path = self.require_journal()?;
        journal::append_event(&path, event)?;
        self.indexes.apply_event(event);
        self.events_loaded += 1;
        Ok(())
    }

    /// Next day-scoped id, recomputed from the ids currently indexed.
    pub fn next_decision_id(&self, now: DateTime<Utc>) -> String {
        next_decision_id(self.indexes.ids(), now)
    }

    /// Builds an `Add` event for `text`. Provenance (source, confidence,
    /// category, reason) flows in from the classification when the text
    /// arrived through capture; command-line adds pass `None` and record
    /// `user` as the actor.
    pub fn create_add_event(
        &self,
        text: &str,
        now: DateTime<Utc>,
        supersedes: Option<&str>,
        classification: Option<&Classification>,
    ) -> Result<DecisionEvent, EdictError> {
        let identity = self.require_identity()?;
        let payload = AddPayload {
            title: Some(text.chars().take(TITLE_CHARS).collect()),
            text: Some(text.to_string()),
            tags: Some(Vec::new()),
            status: Some(DecisionStatus::Active),
            reason: classification.map(|c| c.reason.clone()),
            supersedes: supersedes.map(str::to_string),
            conflicts_with: Some(Vec::new()),
            source: classification.map(|c| c.source.clone()),
            confidence: classification.map(|c| c.confidence),
            category: classification.map(|c| c.category),
        };
        Ok(DecisionEvent {
            timestamp: time::iso_from(now),
            project_id: identity.project_id.clone(),
            target_id: self.next_decision_id(now),
            kind: EventKind::Add(payload),
            actor: Some(
                classification.map(|c| c.source.clone()).unwrap_or_else(|| "user".to_string()),
            ),
        })
    }
}

/// Day-scoped id: `D-YYYY-MM-DD-NNNN`. The suffix is the maximum existing
/// suffix for today's prefix plus one, starting from 0001; it is never
/// stored separately, so it stays correct across replays.
pub fn next_decision_id<'a>(
    existing: impl Iterator<Item = &'a String>,
    now: DateTime<Utc>,
) -> String {
    let prefix = time::day_prefix(now);
    let mut max_for_day = 0u32;
    for id in existing {
        let Some(suffix) = id.strip_prefix(&prefix) else {
            continue;
        };
        if let Ok(value) = suffix.parse::<u32>() {
            max_for_day = max_for_day.max(value);
        }
    }
    format!("{}{:04}", prefix, max_for_day + 1)
}

/// Resolution when new text exactly duplicates an active decision.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DuplicateAction {
    /// Edit the existing decision's text instead of adding.
    Update,
    /// Add anyway.
    New,
    /// Do nothing and report the duplicate.
    Cancel,
}

/// Resolution when new text conflicts with active decisions.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ConflictAction {
    /// Mark the first conflicting decision superseded by the new one.
    Supersede,
    /// Add with the conflicting ids recorded on the new decision.
    Keep,
    /// Do nothing and report the conflicts.
    Cancel,
}

/// What `add` did, for both the CLI and library callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AddOutcome {
    Added { id: String, conflicts_with: Vec<String> },
    Updated { id: String },
    Superseded { id: String, supersedes: String },
    DuplicateCancelled { id: String },
    ConflictCancelled { conflicts_with: Vec<String> },
}

/// Records a decision, resolving duplicates and conflicts per the given
/// actions. The default action for both is `Cancel`, which reports instead
/// of mutating.
pub fn add_decision(
    state: &mut MemoryState,
    text: &str,
    on_duplicate: DuplicateAction,
    on_conflict: ConflictAction,
) -> Result<AddOutcome, EdictError> {
    state.require_ready()?;
    let text = text.trim();
    if text.is_empty() {
        return Err(EdictError::ValidationError("decision text is required".to_string()));
    }

    if let Some(duplicate) = conflict::find_duplicate_active(&state.indexes, text) {
        let duplicate_id = duplicate.id.clone();
        match on_duplicate {
            DuplicateAction::Cancel => {
                return Ok(AddOutcome::DuplicateCancelled { id: duplicate_id });
            }
            DuplicateAction::Update => {
                let event = edit_event_for(state, &duplicate_id, text)?;
                state.commit(&event)?;
                return Ok(AddOutcome::Updated { id: duplicate_id });
            }
            DuplicateAction::New => {}
        }
    }

    let conflicts: Vec<String> =
        conflict::find_conflicts(&state.indexes, text).iter().map(|d| d.id.clone()).collect();
    if !conflicts.is_empty() {
        match on_conflict {
            ConflictAction::Cancel => {
                return Ok(AddOutcome::ConflictCancelled { conflicts_with: conflicts });
            }
            ConflictAction::Supersede => {
                let (new_id, old_id) = supersede_pair(
                    state,
                    &conflicts[0],
                    text,
                    "Superseded by conflicting new decision",
                )?;
                return Ok(AddOutcome::Superseded { id: new_id, supersedes: old_id });
            }
            ConflictAction::Keep => {
                let mut event = state.create_add_event(text, Utc::now(), None, None)?;
                if let EventKind::Add(payload) = &mut event.kind {
                    payload.conflicts_with = Some(conflicts.clone());
                }
                state.commit(&event)?;
                return Ok(AddOutcome::Added {
                    id: event.target_id,
                    conflicts_with: conflicts,
                });
            }
        }
    }

    let event = state.create_add_event(text, Utc::now(), None, None)?;
    state.commit(&event)?;
    Ok(AddOutcome::Added { id: event.target_id, conflicts_with: Vec::new() })
}

fn edit_event_for(
    state: &MemoryState,
    id: &str,
    text: &str,
) -> Result<DecisionEvent, EdictError> {
    let Some(existing) = state.indexes.get(id) else {
        return Err(EdictError::NotFound(format!("decision not found: {}", id)));
    };
    Ok(DecisionEvent {
        timestamp: time::now_iso(),
        project_id: existing.project_id.clone(),
        target_id: existing.id.clone(),
        kind: EventKind::Edit(ChangePayload {
            title: Some(text.chars().take(TITLE_CHARS).collect()),
            text: Some(text.to_string()),
            ..ChangePayload::default()
        }),
        actor: Some("user".to_string()),
    })
}

/// Replaces a decision's text (title follows).
pub fn edit_decision(state: &mut MemoryState, id: &str, text: &str) -> Result<(), EdictError> {
    state.require_ready()?;
    let event = edit_event_for(state, id, text.trim())?;
    state.commit(&event)
}

/// Deletes a decision from replayed state via a `Remove` event.
pub fn remove_decision(state: &mut MemoryState, id: &str) -> Result<(), EdictError> {
    state.require_ready()?;
    let Some(existing) = state.indexes.get(id) else {
        return Err(EdictError::NotFound(format!("decision not found: {}", id)));
    };
    let event = DecisionEvent {
        timestamp: time::now_iso(),
        project_id: existing.project_id.clone(),
        target_id: existing.id.clone(),
        kind: EventKind::Remove,
        actor: Some("user".to_string()),
    };
    state.commit(&event)
}

/// Marks `old_id` superseded and records the replacement. The replacement
/// lands one millisecond after the status change so the log stays ordered.
/// Returns `(new_id, old_id)`.
pub fn supersede_decision(
    state: &mut MemoryState,
    old_id: &str,
    text: &str,
) -> Result<(String, String), EdictError> {
    state.require_ready()?;
    supersede_pair(state, old_id, text, "Superseded by new decision")
}

fn supersede_pair(
    state: &mut MemoryState,
    old_id: &str,
    text: &str,
    reason: &str,
) -> Result<(String, String), EdictError> {
    let Some(existing) = state.indexes.get(old_id) else {
        return Err(EdictError::NotFound(format!("decision not found: {}", old_id)));
    };
    let project_id = existing.project_id.clone();
    let now = Utc::now();
    let mark = DecisionEvent {
        timestamp: time::iso_from(now),
        project_id,
        target_id: old_id.to_string(),
        kind: EventKind::SetStatus {
            status: DecisionStatus::Superseded,
            reason: Some(reason.to_string()),
        },
        actor: Some("user".to_string()),
    };
    let replacement =
        state.create_add_event(text, now + Duration::milliseconds(1), Some(old_id), None)?;
    state.commit(&mark)?;
    state.commit(&replacement)?;
    Ok((replacement.target_id, old_id.to_string()))
}

/// All decisions, most recently updated first, capped at `LIST_LIMIT`.
pub fn list_decisions(state: &MemoryState) -> Result<Vec<Decision>, EdictError> {
    state.require_ready()?;
    let mut decisions: Vec<Decision> = state.indexes.decisions().cloned().collect();
    decisions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    decisions.truncate(LIST_LIMIT);
    Ok(decisions)
}

/// Term-based search. `status:x` filters by status (last one wins),
/// `tag:x` terms must all be present on a decision, and every remaining
/// term must appear somewhere in the decision's normalized fields.
pub fn search_decisions(state: &MemoryState, query: &str) -> Result<Vec<Decision>, EdictError> {
    state.require_ready()?;
    let mut status_filter: Option<String> = None;
    let mut tag_filters: Vec<String> = Vec::new();
    let mut free_terms: Vec<String> = Vec::new();
    for term in query.split_whitespace() {
        if let Some(status) = term.strip_prefix("status:") {
            status_filter = Some(status.to_lowercase());
        } else if let Some(tag) = term.strip_prefix("tag:") {
            tag_filters.push(tag.to_lowercase());
        } else {
            free_terms.push(conflict::normalize_text(term));
        }
    }

    let mut matches: Vec<Decision> = state
        .indexes
        .decisions()
        .filter(|decision| {
            if let Some(status) = &status_filter {
                if decision.status.as_str() != status {
                    return false;
                }
            }
            if !tag_filters.is_empty() {
                let tags: Vec<String> =
                    decision.tags.iter().map(|tag| tag.to_lowercase()).collect();
                if !tag_filters.iter().all(|filter| tags.contains(filter)) {
                    return false;
                }
            }
            if free_terms.is_empty() {
                return true;
            }
            let haystack = conflict::normalize_text(&format!(
                "{} {} {} {} {} {}",
                decision.id,
                decision.title,
                decision.text,
                decision.tags.join(" "),
                decision.reason.as_deref().unwrap_or(""),
                decision.status.as_str(),
            ));
            free_terms.iter().all(|term| haystack.contains(term.as_str()))
        })
        .cloned()
        .collect();
    matches.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    matches.truncate(LIST_LIMIT);
    Ok(matches)
}

#[derive(Debug, Serialize)]
pub struct MemoryStatus {
    pub enabled: bool,
    pub project: String,
    pub decisions: usize,
    pub events_loaded: usize,
}

/// Works on unready state too; `project` reads `<unresolved>` then.
pub fn memory_status(state: &MemoryState) -> MemoryStatus {
    MemoryStatus {
        enabled: state.config.enabled,
        project: state
            .identity
            .as_ref()
            .map(|identity| identity.project_id.clone())
            .unwrap_or_else(|| "<unresolved>".to_string()),
        decisions: state.indexes.len(),
        events_loaded: state.events_loaded,
    }
}

/// Result of `purge` and `reset`. Without `--yes` these report candidates
/// and mutate nothing.
#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub candidates: Vec<String>,
    pub removed: usize,
    pub dry_run: bool,
}

/// Removes non-active decisions whose last update is older than the
/// retention window for their status. Unparseable timestamps keep a
/// decision out of the candidate set.
pub fn purge_decisions(state: &mut MemoryState, yes: bool) -> Result<SweepReport, EdictError> {
    state.require_ready()?;
    let now = Utc::now();
    let candidates = state
        .indexes
        .decisions()
        .filter(|decision| {
            let Some(retention) = state.config.retention_days.for_status(decision.status) else {
                return false;
            };
            let Some(updated) = time::parse_iso(&decision.updated_at) else {
                return false;
            };
            now.signed_duration_since(updated) > Duration::days(retention as i64)
        })
        .map(|decision| (decision.id.clone(), decision.project_id.clone()))
        .collect();
    sweep(state, candidates, yes, now)
}

/// Removes every decision. Same confirmation contract as `purge`.
pub fn reset_decisions(state: &mut MemoryState, yes: bool) -> Result<SweepReport, EdictError> {
    state.require_ready()?;
    let now = Utc::now();
    let candidates = state
        .indexes
        .decisions()
        .map(|decision| (decision.id.clone(), decision.project_id.clone()))
        .collect();
    sweep(state, candidates, yes, now)
}

fn sweep(
    state: &mut MemoryState,
    mut candidates: Vec<(String, String)>,
    yes: bool,
    now: DateTime<Utc>,
) -> Result<SweepReport, EdictError> {
    candidates.sort();
    let ids: Vec<String> = candidates.iter().map(|(id, _)| id.clone()).collect();
    if !yes {
        return Ok(SweepReport { candidates: ids, removed: 0, dry_run: true });
    }
    for (index, (id, project_id)) in candidates.iter().enumerate() {
        let event = DecisionEvent {
            // offset keeps batch removals strictly ordered in the log
            timestamp: time::iso_offset(now, index as i64),
            project_id: project_id.clone(),
            target_id: id.clone(),
            kind: EventKind::Remove,
            actor: Some("user".to_string()),
        };
        state.commit(&event)?;
    }
    let removed = ids.len();
    Ok(SweepReport { candidates: ids, removed, dry_run: false })
}

/// Config scope targeted by enable/disable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ToggleScope {
    Global,
    Project,
}

/// Flips the `enabled` key in the targeted config file, creating the file
/// if needed. Returns the path written.
pub fn set_enabled_scope(
    store: &Store,
    scope: ToggleScope,
    enabled: bool,
) -> Result<PathBuf, EdictError> {
    let path = match scope {
        ToggleScope::Global => store::global_config_path().ok_or_else(|| {
            EdictError::PathError("HOME is not set; cannot locate the global config".to_string())
        })?,
        ToggleScope::Project => store.project_config_path(),
    };
    config::set_enabled(&path, enabled)?;
    Ok(path)
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "memory", about = "Manage the project's durable decision memory.")]
pub struct MemoryCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: MemoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Record a decision.
    Add {
        /// Decision text (positional argument)
        #[clap(value_name = "TEXT")]
        text: String,
        /// What to do when the text duplicates an active decision.
        #[clap(long, value_enum, default_value = "cancel")]
        on_duplicate: DuplicateAction,
        /// What to do when the text conflicts with active decisions.
        #[clap(long, value_enum, default_value = "cancel")]
        on_conflict: ConflictAction,
    },
    /// List decisions, most recently updated first.
    List,
    /// Search decisions. `status:` and `tag:` terms filter; the rest match
    /// anywhere in the decision.
    Search {
        #[clap(value_name = "QUERY", required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Replace a decision's text.
    Edit {
        #[clap(long)]
        id: String,
        #[clap(long)]
        text: String,
    },
    /// Delete a decision.
    Remove {
        #[clap(long)]
        id: String,
    },
    /// Mark a decision superseded and record its replacement.
    Supersede {
        #[clap(long)]
        id: String,
        #[clap(long)]
        text: String,
    },
    /// Show memory status for this project.
    Status,
    /// Remove non-active decisions past their retention window.
    Purge {
        /// Actually remove. Without this, reports candidates only.
        #[clap(long)]
        yes: bool,
    },
    /// Remove every decision.
    Reset {
        /// Actually remove. Without this, reports the count only.
        #[clap(long)]
        yes: bool,
    },
    /// Turn decision memory on.
    Enable {
        #[clap(long, value_enum)]
        scope: ToggleScope,
    },
    /// Turn decision memory off.
    Disable {
        #[clap(long, value_enum)]
        scope: ToggleScope,
    },
    /// Print the memory subsystem schema.
    Schema,
}

fn is_mutating(command: &MemoryCommand) -> bool {
    matches!(
        command,
        MemoryCommand::Add { .. }
            | MemoryCommand::Edit { .. }
            | MemoryCommand::Remove { .. }
            | MemoryCommand::Supersede { .. }
            | MemoryCommand::Purge { .. }
            | MemoryCommand::Reset { .. }
    )
}

pub fn run_memory_cli(store: &Store, cli: MemoryCli) -> Result<(), EdictError> {
    match cli.command {
        MemoryCommand::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema()).unwrap());
            Ok(())
        }
        MemoryCommand::Enable { scope } => {
            let path = set_enabled_scope(store, scope, true)?;
            println!("Decision memory enabled ({}).", path.display());
            Ok(())
        }
        MemoryCommand::Disable { scope } => {
            let path = set_enabled_scope(store, scope, false)?;
            println!("Decision memory disabled ({}).", path.display());
            Ok(())
        }
        command => run_store_command(store, cli.format, command),
    }
}

fn run_store_command(
    store: &Store,
    format: OutputFormat,
    command: MemoryCommand,
) -> Result<(), EdictError> {
    let mut state = MemoryState::load(store)?;

    if !state.config.enabled && is_mutating(&command) {
        println!(
            "{}",
            "Decision memory is disabled; enable it with `edict memory enable --scope project`."
                .yellow()
        );
        return Ok(());
    }

    let out = match &command {
        MemoryCommand::Add { text, on_duplicate, on_conflict } => {
            let outcome = add_decision(&mut state, text, *on_duplicate, *on_conflict)?;
            envelope("memory.add", serde_json::json!({ "result": outcome }))
        }
        MemoryCommand::List => {
            let decisions = list_decisions(&state)?;
            envelope("memory.list", serde_json::json!({ "items": decisions }))
        }
        MemoryCommand::Search { query } => {
            let decisions = search_decisions(&state, &query.join(" "))?;
            envelope("memory.search", serde_json::json!({ "items": decisions }))
        }
        MemoryCommand::Edit { id, text } => {
            edit_decision(&mut state, id, text)?;
            envelope("memory.edit", serde_json::json!({ "id": id }))
        }
        MemoryCommand::Remove { id } => {
            remove_decision(&mut state, id)?;
            envelope("memory.remove", serde_json::json!({ "id": id }))
        }
        MemoryCommand::Supersede { id, text } => {
            let (new_id, old_id) = supersede_decision(&mut state, id, text)?;
            envelope(
                "memory.supersede",
                serde_json::json!({ "id": new_id, "supersedes": old_id }),
            )
        }
        MemoryCommand::Status => {
            envelope("memory.status", serde_json::json!({ "report": memory_status(&state) }))
        }
        MemoryCommand::Purge { yes } => {
            let report = purge_decisions(&mut state, *yes)?;
            envelope("memory.purge", serde_json::json!({ "report": report }))
        }
        MemoryCommand::Reset { yes } => {
            let report = reset_decisions(&mut state, *yes)?;
            envelope("memory.reset", serde_json::json!({ "report": report }))
        }
        // dispatched in run_memory_cli before the state load
        _ => unreachable!(),
    };

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&out).unwrap());
        }
        OutputFormat::Text => print_text(&command, &out),
    }
    Ok(())
}

fn envelope(cmd: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "ts": time::now_iso(),
        "cmd": cmd,
        "status": "ok",
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (key, value) in extra_obj {
            base_obj.insert(key.clone(), value.clone());
        }
    }
    base
}

fn print_text(command: &MemoryCommand, out: &JsonValue) {
    match command {
        MemoryCommand::Add { .. } => {
            let result = out.get("result").cloned().unwrap_or(JsonValue::Null);
            match result.get("outcome").and_then(|v| v.as_str()) {
                Some("added") => {
                    let id = result.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                    let conflicts = result
                        .get("conflicts_with")
                        .and_then(|v| v.as_array())
                        .map(|items| {
                            items.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    if conflicts.is_empty() {
                        println!("Added decision {}", id);
                    } else {
                        println!(
                            "Added decision {} with conflict marker ({})",
                            id,
                            conflicts.join(", ")
                        );
                    }
                }
                Some("updated") => {
                    let id = result.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                    println!("Updated existing decision {}", id);
                }
                Some("superseded") => {
                    let id = result.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                    let old = result.get("supersedes").and_then(|v| v.as_str()).unwrap_or("?");
                    println!("Added decision {} (supersedes {})", id, old);
                }
                Some("duplicate_cancelled") => {
                    let id = result.get("id").and_then(|v| v.as_str()).unwrap_or("?");
                    println!(
                        "{}",
                        format!(
                            "Duplicate active decision: {}. Re-run with --on-duplicate update|new.",
                            id
                        )
                        .yellow()
                    );
                }
                Some("conflict_cancelled") => {
                    let conflicts = result
                        .get("conflicts_with")
                        .and_then(|v| v.as_array())
                        .map(|items| {
                            items.iter().filter_map(|v| v.as_str()).collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    println!(
                        "{}",
                        format!(
                            "Conflicts with active decision(s): {}. Re-run with --on-conflict supersede|keep.",
                            conflicts.join(", ")
                        )
                        .yellow()
                    );
                }
                _ => {}
            }
        }
        MemoryCommand::List | MemoryCommand::Search { .. } => {
            let empty_message = match command {
                MemoryCommand::Search { .. } => "No matching decisions found.",
                _ => "No decisions found.",
            };
            match out.get("items").and_then(|v| v.as_array()) {
                Some(items) if !items.is_empty() => {
                    for item in items {
                        println!("{}", render_item(item));
                    }
                }
                _ => println!("{}", empty_message),
            }
        }
        MemoryCommand::Edit { .. } => {
            let id = out.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            println!("Edited decision {}", id);
        }
        MemoryCommand::Remove { .. } => {
            let id = out.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            println!("Removed decision {}", id);
        }
        MemoryCommand::Supersede { .. } => {
            let id = out.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            let old = out.get("supersedes").and_then(|v| v.as_str()).unwrap_or("?");
            println!("Superseded {} with {}", old, id);
        }
        MemoryCommand::Status => {
            let report = out.get("report").cloned().unwrap_or(JsonValue::Null);
            let enabled = report.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false);
            let project =
                report.get("project").and_then(|v| v.as_str()).unwrap_or("<unresolved>");
            let decisions = report.get("decisions").and_then(|v| v.as_u64()).unwrap_or(0);
            println!(
                "Decision memory: {} | project={} | decisions={}",
                if enabled { "enabled" } else { "disabled" },
                project,
                decisions
            );
        }
        MemoryCommand::Purge { .. } | MemoryCommand::Reset { .. } => {
            let verb = match command {
                MemoryCommand::Purge { .. } => ("Purge", "purge"),
                _ => ("Reset", "reset"),
            };
            let report = out.get("report").cloned().unwrap_or(JsonValue::Null);
            let dry_run = report.get("dry_run").and_then(|v| v.as_bool()).unwrap_or(true);
            let count = report
                .get("candidates")
                .and_then(|v| v.as_array())
                .map(|items| items.len())
                .unwrap_or(0);
            if dry_run {
                if count == 0 {
                    println!("No {} candidates found.", verb.1);
                } else {
                    println!(
                        "{} would remove {} decisions. Re-run with `edict memory {} --yes`.",
                        verb.0, count, verb.1
                    );
                }
            } else {
                println!("Removed {} decisions.", count);
            }
        }
        MemoryCommand::Schema
        | MemoryCommand::Enable { .. }
        | MemoryCommand::Disable { .. } => {}
    }
}

fn render_item(item: &JsonValue) -> String {
    let id = item.get("id").and_then(|v| v.as_str()).unwrap_or("?");
    let status = item.get("status").and_then(|v| v.as_str()).unwrap_or("?");
    let text = item.get("text").and_then(|v| v.as_str()).unwrap_or("");
    let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("");
    let body = if text.trim().is_empty() { title } else { text };
    let tags = item
        .get("tags")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .take(output::SUMMARY_TAG_COUNT)
                .map(|tag| format!("#{}", tag))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();
    let short = output::truncate_chars(body.trim(), output::SUMMARY_TEXT_CHARS);
    if tags.is_empty() {
        format!("{} | {} | {}", id, status, short)
    } else {
        format!("{} | {} | {} | {}", id, status, short, tags)
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "memory",
        "description": "Event-sourced decision memory with day-scoped ids",
        "storage": [".edict/data/decisions.events.jsonl"],
        "statuses": ["draft", "active", "rejected", "superseded"],
        "commands": [
            { "name": "add", "description": "Record a decision; duplicates and conflicts resolve per --on-duplicate/--on-conflict" },
            { "name": "list", "description": "List decisions, most recently updated first" },
            { "name": "search", "description": "Search decisions with status:/tag: filters and free terms" },
            { "name": "edit", "description": "Replace a decision's text" },
            { "name": "remove", "description": "Delete a decision" },
            { "name": "supersede", "description": "Mark a decision superseded and record its replacement" },
            { "name": "status", "description": "Show enablement, project id, and decision count" },
            { "name": "purge", "description": "Remove non-active decisions past retention (requires --yes)" },
            { "name": "reset", "description": "Remove every decision (requires --yes)" },
            { "name": "enable", "description": "Enable decision memory globally or per project" },
            { "name": "disable", "description": "Disable decision memory globally or per project" }
        ]
    })
}

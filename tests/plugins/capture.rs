use edict::core::error::EdictError;
use edict::core::event::Category;
use edict::core::identity::ProjectIdentity;
use edict::core::journal;
use edict::core::store::Store;
use edict::plugins::capture::{
    AcceptAll, ConfirmSurface, ScanMode, TurnOutcome, TurnStage, finalize, prepare,
};
use edict::plugins::memory::{ConflictAction, DuplicateAction, MemoryState, add_decision};
use tempfile::tempdir;

const PROJECT: &str = "abcd1234abcd1234";

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

/// Batch surface that always keeps only the first candidate.
struct SelectFirst;

impl ConfirmSurface for SelectFirst {
    fn select(&mut self, _prompt: &str, _items: &[String]) -> Result<Vec<usize>, EdictError> {
        Ok(vec![0])
    }

    fn confirm(&mut self, _prompt: &str, _item: &str) -> Result<bool, EdictError> {
        Ok(true)
    }
}

/// Surface without batch selection; answers per-item confirms from a list.
struct PerItemFallback {
    answers: Vec<bool>,
    calls: usize,
}

impl ConfirmSurface for PerItemFallback {
    fn select(&mut self, _prompt: &str, _items: &[String]) -> Result<Vec<usize>, EdictError> {
        Err(EdictError::ValidationError("batch selection unavailable".to_string()))
    }

    fn confirm(&mut self, _prompt: &str, _item: &str) -> Result<bool, EdictError> {
        let answer = self.answers.get(self.calls).copied().unwrap_or(false);
        self.calls += 1;
        Ok(answer)
    }
}

#[test]
fn test_prepare_extracts_and_stages() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    state.config.auto_capture.max_per_turn = 5;

    let prompt = "Decision: use Postgres for all new services\n\
                  How should we handle caching?\n\
                  Never commit directly to main\n\
                  just some narration\n";
    let candidates = prepare(&mut state, prompt).unwrap();
    assert_eq!(
        candidates,
        vec![
            "use Postgres for all new services".to_string(),
            "Never commit directly to main".to_string(),
        ]
    );
    assert_eq!(state.pending_candidates, candidates);
    assert_eq!(state.stage, TurnStage::PendingExtracted);
}

#[test]
fn test_prepare_explicit_mode_ignores_directives() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    state.config.auto_capture.scan = ScanMode::Explicit;

    let prompt = "Never commit directly to main\nDecision: use tabs everywhere\n";
    let candidates = prepare(&mut state, prompt).unwrap();
    assert_eq!(candidates, vec!["use tabs everywhere".to_string()]);
}

#[test]
fn test_prepare_respects_toggles_and_blank_prompts() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());

    let mut state = test_state(&store);
    state.config.auto_capture.enabled = false;
    assert!(prepare(&mut state, "Never commit directly to main").unwrap().is_empty());
    assert_eq!(state.stage, TurnStage::Idle);

    let mut state = test_state(&store);
    state.config.enabled = false;
    assert!(prepare(&mut state, "Never commit directly to main").unwrap().is_empty());

    let mut state = test_state(&store);
    assert!(prepare(&mut state, "   \n\n").unwrap().is_empty());
    assert_eq!(state.stage, TurnStage::Idle);
}

#[test]
fn test_prepare_caps_then_dedupes() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    // max_per_turn defaults to 2: extraction stops there before dedupe
    let prompt = "Use tabs\nuse   TABS\nUse spaces for indentation\n";
    let candidates = prepare(&mut state, prompt).unwrap();
    assert_eq!(candidates, vec!["Use tabs".to_string()]);
}

#[test]
fn test_prepare_drops_candidates_already_active() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    add_decision(
        &mut state,
        "Use tabs for indentation",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();

    let candidates = prepare(&mut state, "use tabs for indentation\n").unwrap();
    assert!(candidates.is_empty());
    assert_eq!(state.stage, TurnStage::Idle);
}

#[test]
fn test_finalize_discards_on_bad_outcome() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    prepare(&mut state, "Never commit directly to main\n").unwrap();

    let report = finalize(&mut state, TurnOutcome::Error, None, &mut AcceptAll).unwrap();
    assert_eq!(report.stage, TurnStage::Finalized);
    assert_eq!(report.extracted, 1);
    assert!(report.captured.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, "turn did not finish cleanly");
    assert!(state.pending_candidates.is_empty());
    assert!(journal::load_events(&store.events_path()).unwrap().is_empty());
}

#[test]
fn test_finalize_commits_with_provenance() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    let prompt = "Decision: use Postgres for all new services\n\
                  Decision: never commit directly to main\n";
    prepare(&mut state, prompt).unwrap();

    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut AcceptAll).unwrap();
    assert_eq!(report.stage, TurnStage::Finalized);
    assert_eq!(report.extracted, 2);
    assert_eq!(report.classified, 2);
    assert_eq!(report.captured.len(), 2);
    assert!(report.skipped.is_empty());

    let postgres = &report.captured[0];
    assert_eq!(postgres.text, "use Postgres for all new services");
    assert_eq!(postgres.source, "rule");
    assert_eq!(postgres.category, Category::Tooling);
    assert!(postgres.confidence >= 0.6);

    // provenance lands on the decision itself
    let decision = state.indexes.get(&postgres.id).unwrap();
    assert_eq!(decision.created_by.as_deref(), Some("rule"));
    assert_eq!(decision.confidence, Some(postgres.confidence));
    assert_eq!(decision.category, Some(Category::Tooling));
    assert_eq!(decision.reason.as_deref(), Some("stack/tooling directive"));

    let events = journal::load_events(&store.events_path()).unwrap();
    assert_eq!(events.len(), 2);
}

#[test]
fn test_finalize_skips_below_threshold() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    prepare(&mut state, "Decision: run tests now\n").unwrap();

    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut AcceptAll).unwrap();
    assert_eq!(report.extracted, 1);
    assert_eq!(report.classified, 0);
    assert!(report.captured.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].reason.starts_with("below capture threshold"));
    assert!(journal::load_events(&store.events_path()).unwrap().is_empty());
}

#[test]
fn test_finalize_batch_selection_subset() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    let prompt = "Decision: use Postgres for all new services\n\
                  Decision: never commit directly to main\n";
    prepare(&mut state, prompt).unwrap();

    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut SelectFirst).unwrap();
    assert_eq!(report.captured.len(), 1);
    assert_eq!(report.captured[0].text, "use Postgres for all new services");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, "not confirmed");
    assert_eq!(state.indexes.len(), 1);
}

#[test]
fn test_finalize_falls_back_to_per_item_confirm() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    let prompt = "Decision: use Postgres for all new services\n\
                  Decision: never commit directly to main\n";
    prepare(&mut state, prompt).unwrap();

    let mut surface = PerItemFallback { answers: vec![false, true], calls: 0 };
    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut surface).unwrap();
    assert_eq!(surface.calls, 2);
    assert_eq!(report.captured.len(), 1);
    assert_eq!(report.captured[0].text, "never commit directly to main");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].text, "use Postgres for all new services");
}

#[test]
fn test_finalize_skips_surface_when_confirm_disabled() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    state.config.auto_capture.confirm = false;
    prepare(&mut state, "Decision: never commit directly to main\n").unwrap();

    // this surface would reject everything if it were consulted
    let mut surface = PerItemFallback { answers: vec![], calls: 0 };
    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut surface).unwrap();
    assert_eq!(surface.calls, 0);
    assert_eq!(report.captured.len(), 1);
}

#[test]
fn test_finalize_rechecks_duplicates_at_commit() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);
    prepare(&mut state, "Decision: never commit directly to main\n").unwrap();

    // the same decision lands through another path mid-turn
    add_decision(
        &mut state,
        "never commit directly to main",
        DuplicateAction::Cancel,
        ConflictAction::Cancel,
    )
    .unwrap();

    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut AcceptAll).unwrap();
    assert!(report.captured.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].reason, "duplicate of an active decision");
    assert_eq!(state.indexes.len(), 1);
}

#[test]
fn test_finalize_without_pending_is_idle() {
    let tmp = tempdir().unwrap();
    let store = Store::new(tmp.path());
    let mut state = test_state(&store);

    let report = finalize(&mut state, TurnOutcome::Ok, None, &mut AcceptAll).unwrap();
    assert_eq!(report.stage, TurnStage::Idle);
    assert_eq!(report.extracted, 0);
    assert_eq!(state.stage, TurnStage::Idle);
}

//! Auto-capture: extract decision candidates from a prompt, classify the
//! survivors, confirm, and commit the accepted ones.
//!
//! The pipeline runs in two halves around the agent's turn. `prepare`
//! scans the prompt up front and parks candidates on the state;
//! `finalize` runs after the turn and only persists anything when the
//! turn finished cleanly. Between the halves nothing is written, so an
//! aborted turn leaves no trace in the journal.

use crate::core::error::EdictError;
use crate::core::event::Category;
use crate::core::store::Store;
use crate::plugins::classifier::{self, ExternalClassifier};
use crate::plugins::conflict;
use crate::plugins::memory::MemoryState;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::io::{self, BufRead, Read, Write};
use std::mem;
use std::sync::LazyLock;

pub use crate::core::config::ScanMode;

/// Candidate lines longer than this are noise, not decisions.
pub const MAX_CANDIDATE_CHARS: usize = 220;

/// Where a turn is in the capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    Idle,
    PendingExtracted,
    PendingClassified,
    Finalized,
}

/// How the agent's turn ended. Only `Ok` turns persist captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TurnOutcome {
    Ok,
    Error,
    Aborted,
}

/// Asks the user which classified candidates to keep.
///
/// `select` is the batch path: it presents every candidate at once and
/// returns the chosen indexes. When a surface cannot complete a batch
/// selection it returns an error and the caller degrades to calling
/// `confirm` once per candidate.
pub trait ConfirmSurface {
    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Vec<usize>, EdictError>;
    fn confirm(&mut self, prompt: &str, item: &str) -> Result<bool, EdictError>;
}

/// Accepts everything. Used by `--yes` and when confirmation is off.
pub struct AcceptAll;

impl ConfirmSurface for AcceptAll {
    fn select(&mut self, _prompt: &str, items: &[String]) -> Result<Vec<usize>, EdictError> {
        Ok((0..items.len()).collect())
    }

    fn confirm(&mut self, _prompt: &str, _item: &str) -> Result<bool, EdictError> {
        Ok(true)
    }
}

/// Interactive surface on stdin/stdout.
pub struct TerminalSurface;

impl ConfirmSurface for TerminalSurface {
    fn select(&mut self, prompt: &str, items: &[String]) -> Result<Vec<usize>, EdictError> {
        println!("{}", prompt.bold());
        for (index, item) in items.iter().enumerate() {
            println!("  {}. {}", index + 1, item);
        }
        print!("Keep which? (numbers, `all`, or empty for none): ");
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let line = line.trim();
        if line.is_empty() || line.eq_ignore_ascii_case("none") {
            return Ok(Vec::new());
        }
        if line.eq_ignore_ascii_case("all") {
            return Ok((0..items.len()).collect());
        }
        let mut chosen = Vec::new();
        for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
            if token.is_empty() {
                continue;
            }
            let number: usize = token.parse().map_err(|_| {
                EdictError::ValidationError(format!("not a selection number: {}", token))
            })?;
            if number == 0 || number > items.len() {
                return Err(EdictError::ValidationError(format!(
                    "selection out of range: {}",
                    number
                )));
            }
            if !chosen.contains(&(number - 1)) {
                chosen.push(number - 1);
            }
        }
        Ok(chosen)
    }

    fn confirm(&mut self, prompt: &str, item: &str) -> Result<bool, EdictError> {
        print!("{}: {} [y/N] ", prompt.bold(), item);
        io::stdout().flush()?;
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let answer = line.trim().to_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

static EXPLICIT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[-*]\s*)?decision\s*:\s*(.+)$").unwrap());

static DIRECTIVE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:[-*]\s*)?(?:use|adopt|build|implement|enforce|standardize|avoid|do not|don't|never|must|should|please use|please avoid)\b",
    )
    .unwrap()
});

static CANDIDATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[-*\s]+").unwrap());

fn clean_candidate(line: &str) -> String {
    CANDIDATE_PREFIX.replace(line, "").trim().to_string()
}

/// Scans prompt lines for decision candidates. `Decision:` markers are
/// honored in both modes; `Directive` mode additionally takes imperative
/// lines. Questions and over-long lines never qualify.
pub fn extract_candidates(prompt: &str, scan: ScanMode, max: usize) -> Vec<String> {
    let mut candidates = Vec::new();
    for raw in prompt.lines() {
        if candidates.len() >= max {
            break;
        }
        let line = raw.trim();
        if line.is_empty() || line.chars().count() > MAX_CANDIDATE_CHARS || line.ends_with('?') {
            continue;
        }
        if let Some(captures) = EXPLICIT_LINE.captures(line) {
            let candidate = clean_candidate(&captures[1]);
            if !candidate.is_empty() {
                candidates.push(candidate);
            }
            continue;
        }
        if scan == ScanMode::Directive && DIRECTIVE_LINE.is_match(line) {
            let candidate = clean_candidate(line);
            if !candidate.is_empty() {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

/// Drops candidates that normalize to the same text, keeping the first.
pub fn dedupe_candidates(candidates: Vec<String>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(conflict::normalize_text(candidate)))
        .collect()
}

/// First half of the pipeline. Extracts, dedupes, and drops candidates
/// that already duplicate an active decision, then parks the rest on the
/// state for `finalize`. Returns the parked candidates.
pub fn prepare(state: &mut MemoryState, prompt: &str) -> Result<Vec<String>, EdictError> {
    state.pending_candidates.clear();
    state.stage = TurnStage::Idle;
    state.require_ready()?;
    if !state.config.enabled || !state.config.auto_capture.enabled {
        return Ok(Vec::new());
    }
    if prompt.trim().is_empty() {
        return Ok(Vec::new());
    }
    let extracted = extract_candidates(
        prompt,
        state.config.auto_capture.scan,
        state.config.auto_capture.max_per_turn as usize,
    );
    let candidates: Vec<String> = dedupe_candidates(extracted)
        .into_iter()
        .filter(|candidate| conflict::find_duplicate_active(&state.indexes, candidate).is_none())
        .collect();
    if !candidates.is_empty() {
        state.pending_candidates = candidates.clone();
        state.stage = TurnStage::PendingExtracted;
    }
    Ok(candidates)
}

#[derive(Debug, Serialize)]
pub struct CapturedDecision {
    pub id: String,
    pub text: String,
    pub confidence: f64,
    pub category: Category,
    pub source: String,
}

#[derive(Debug, Serialize)]
pub struct SkippedCandidate {
    pub text: String,
    pub reason: String,
}

/// What a finalized turn did with each candidate.
#[derive(Debug, Serialize)]
pub struct CaptureReport {
    pub stage: TurnStage,
    pub extracted: usize,
    pub classified: usize,
    pub captured: Vec<CapturedDecision>,
    pub skipped: Vec<SkippedCandidate>,
}

impl CaptureReport {
    fn empty(stage: TurnStage) -> CaptureReport {
        CaptureReport {
            stage,
            extracted: 0,
            classified: 0,
            captured: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Second half of the pipeline. Classifies the parked candidates,
/// confirms through `surface`, re-checks duplicates, and commits the
/// accepted ones. A turn that did not end `Ok` discards everything.
pub fn finalize(
    state: &mut MemoryState,
    outcome: TurnOutcome,
    external: Option<&dyn ExternalClassifier>,
    surface: &mut dyn ConfirmSurface,
) -> Result<CaptureReport, EdictError> {
    state.require_ready()?;
    let pending = mem::take(&mut state.pending_candidates);
    if !state.config.enabled || !state.config.auto_capture.enabled {
        state.stage = TurnStage::Idle;
        return Ok(CaptureReport::empty(TurnStage::Idle));
    }
    if pending.is_empty() {
        state.stage = TurnStage::Idle;
        return Ok(CaptureReport::empty(TurnStage::Idle));
    }

    let extracted = pending.len();
    if outcome != TurnOutcome::Ok {
        state.stage = TurnStage::Finalized;
        return Ok(CaptureReport {
            stage: TurnStage::Finalized,
            extracted,
            classified: 0,
            captured: Vec::new(),
            skipped: pending
                .into_iter()
                .map(|text| SkippedCandidate {
                    text,
                    reason: "turn did not finish cleanly".to_string(),
                })
                .collect(),
        });
    }

    let threshold = state.config.classifier.threshold;
    let mut survivors = Vec::new();
    let mut skipped = Vec::new();
    for candidate in pending {
        let classification = classifier::classify_with(&state.config.classifier, external, &candidate);
        if classification.is_decision && classification.confidence >= threshold {
            survivors.push((candidate, classification));
        } else {
            skipped.push(SkippedCandidate {
                text: candidate,
                reason: format!(
                    "below capture threshold ({:.2} < {:.2})",
                    classification.confidence, threshold
                ),
            });
        }
    }
    state.stage = TurnStage::PendingClassified;
    let classified = survivors.len();

    if survivors.is_empty() {
        state.stage = TurnStage::Finalized;
        return Ok(CaptureReport {
            stage: TurnStage::Finalized,
            extracted,
            classified,
            captured: Vec::new(),
            skipped,
        });
    }

    let texts: Vec<String> = survivors.iter().map(|(text, _)| text.clone()).collect();
    let chosen: Vec<usize> = if !state.config.auto_capture.confirm {
        (0..survivors.len()).collect()
    } else {
        match surface.select("Auto-capture decisions", &texts) {
            Ok(indexes) => {
                let mut seen = FxHashSet::default();
                indexes
                    .into_iter()
                    .filter(|index| *index < survivors.len() && seen.insert(*index))
                    .collect()
            }
            // Batch selection unavailable; ask per item. A confirm error
            // counts as a decline.
            Err(_) => (0..survivors.len())
                .filter(|index| {
                    surface.confirm("Auto-capture decision", &texts[*index]).unwrap_or(false)
                })
                .collect(),
        }
    };

    let mut captured = Vec::new();
    for (index, (text, classification)) in survivors.into_iter().enumerate() {
        if !chosen.contains(&index) {
            skipped.push(SkippedCandidate { text, reason: "not confirmed".to_string() });
            continue;
        }
        // Confirmation can race another writer; check duplicates again
        // against the indexes as of this commit.
        if conflict::find_duplicate_active(&state.indexes, &text).is_some() {
            skipped.push(SkippedCandidate {
                text,
                reason: "duplicate of an active decision".to_string(),
            });
            continue;
        }
        let event = state.create_add_event(&text, Utc::now(), None, Some(&classification))?;
        state.commit(&event)?;
        captured.push(CapturedDecision {
            id: event.target_id,
            text,
            confidence: classification.confidence,
            category: classification.category,
            source: classification.source,
        });
    }

    state.stage = TurnStage::Finalized;
    Ok(CaptureReport { stage: TurnStage::Finalized, extracted, classified, captured, skipped })
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[clap(name = "capture", about = "Capture durable decisions from prompts.")]
pub struct CaptureCli {
    /// Output format for this command group.
    #[clap(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
    #[clap(subcommand)]
    command: CaptureCommand,
}

#[derive(Subcommand, Debug)]
pub enum CaptureCommand {
    /// Run the full pipeline over a prompt and commit accepted decisions.
    Run {
        /// Prompt text to scan; `-` reads it from stdin.
        #[clap(long, value_name = "TEXT")]
        prompt: String,
        /// How the turn ended. Anything but `ok` discards the candidates.
        #[clap(long, value_enum, default_value = "ok")]
        outcome: TurnOutcome,
        /// Accept every classified candidate without confirmation.
        #[clap(long)]
        yes: bool,
    },
    /// Show what would be extracted, without classifying or writing.
    Extract {
        /// Prompt text to scan; `-` reads it from stdin.
        #[clap(long, value_name = "TEXT")]
        prompt: String,
    },
    /// Print the capture subsystem schema.
    Schema,
}

fn read_prompt(prompt: &str) -> Result<String, EdictError> {
    if prompt == "-" {
        let mut buffer = String::new();
        io::stdin().lock().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(prompt.to_string())
    }
}

pub fn run_capture_cli(store: &Store, cli: CaptureCli) -> Result<(), EdictError> {
    match cli.command {
        CaptureCommand::Schema => {
            println!("{}", serde_json::to_string_pretty(&schema()).unwrap());
            Ok(())
        }
        CaptureCommand::Extract { prompt } => {
            let prompt = read_prompt(&prompt)?;
            let mut state = MemoryState::load(store)?;
            let candidates = prepare(&mut state, &prompt)?;
            match cli.format {
                OutputFormat::Json => {
                    let out = serde_json::json!({
                        "ts": crate::core::time::now_iso(),
                        "cmd": "capture.extract",
                        "status": "ok",
                        "candidates": candidates,
                    });
                    println!("{}", serde_json::to_string_pretty(&out).unwrap());
                }
                OutputFormat::Text => {
                    if candidates.is_empty() {
                        println!("No candidates found.");
                    } else {
                        for candidate in &candidates {
                            println!("{}", candidate);
                        }
                    }
                }
            }
            Ok(())
        }
        CaptureCommand::Run { prompt, outcome, yes } => {
            let prompt = read_prompt(&prompt)?;
            let mut state = MemoryState::load(store)?;
            prepare(&mut state, &prompt)?;
            let external = classifier::external_from_config(&state.config.classifier);
            let external_ref =
                external.as_ref().map(|classifier| classifier as &dyn ExternalClassifier);
            let mut accept_all = AcceptAll;
            let mut terminal = TerminalSurface;
            let surface: &mut dyn ConfirmSurface = if yes || !state.config.auto_capture.confirm {
                &mut accept_all
            } else {
                &mut terminal
            };
            let report = finalize(&mut state, outcome, external_ref, surface)?;
            match cli.format {
                OutputFormat::Json => {
                    let out = serde_json::json!({
                        "ts": crate::core::time::now_iso(),
                        "cmd": "capture.run",
                        "status": "ok",
                        "report": report,
                    });
                    println!("{}", serde_json::to_string_pretty(&out).unwrap());
                }
                OutputFormat::Text => {
                    if report.captured.is_empty() && report.skipped.is_empty() {
                        println!("No decisions captured.");
                    }
                    for captured in &report.captured {
                        println!("Captured {} | {}", captured.id, captured.text);
                    }
                    for skipped in &report.skipped {
                        println!(
                            "{}",
                            format!("Skipped: {} ({})", skipped.text, skipped.reason).yellow()
                        );
                    }
                }
            }
            Ok(())
        }
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "capture",
        "description": "Two-phase auto-capture of durable decisions from prompt text",
        "stages": ["idle", "pending_extracted", "pending_classified", "finalized"],
        "scan_modes": ["directive", "explicit"],
        "commands": [
            { "name": "run", "description": "Extract, classify, confirm, and commit decisions from a prompt" },
            { "name": "extract", "description": "Preview extraction without classifying or writing" }
        ]
    })
}

//! Context injection: render the active decision set as a compact text
//! block an agent can prepend to its working context.

use crate::core::error::EdictError;
use crate::core::event::Decision;
use crate::core::output;
use crate::core::store::Store;
use crate::plugins::memory::MemoryState;

/// Upper bound on injected decisions, regardless of config.
pub const MAX_DECISIONS_HARD: usize = 20;

/// Chars of decision text per rendered line.
pub const MAX_CHARS_PER_DECISION: usize = 160;

/// Chars for the whole section, header included.
pub const MAX_SECTION_CHARS: usize = 2200;

pub const SECTION_HEADER: &str = "Active project decisions:";

const TAG_CHARS: usize = 12;

/// One injected line: id, title (text as fallback), up to two tags.
/// Status is omitted; everything in the section is active.
fn decision_line(decision: &Decision) -> String {
    let title = decision.title.trim();
    let body = if title.is_empty() { decision.text.trim() } else { title };
    let short = output::truncate_chars(body, MAX_CHARS_PER_DECISION);
    let tags = decision
        .tags
        .iter()
        .take(output::SUMMARY_TAG_COUNT)
        .map(|tag| format!("#{}", output::truncate_chars(tag, TAG_CHARS)))
        .collect::<Vec<_>>()
        .join(" ");
    if tags.is_empty() {
        format!("{} | {}", decision.id, short)
    } else {
        format!("{} | {} | {}", decision.id, short, tags)
    }
}

/// Renders the injection block, newest active decisions last, or `None`
/// when the state is unready, memory is disabled, or nothing is active.
/// The block never exceeds the hard size caps.
pub fn build_context_section(state: &MemoryState) -> Option<String> {
    if !state.ready || !state.config.enabled {
        return None;
    }
    let active = state.indexes.active_decisions();
    if active.is_empty() {
        return None;
    }
    let limit = (state.config.context.max_decisions as usize).min(MAX_DECISIONS_HARD);
    let start = active.len().saturating_sub(limit);
    let mut section = String::from(SECTION_HEADER);
    for decision in &active[start..] {
        section.push('\n');
        section.push_str(&decision_line(decision));
    }
    Some(output::truncate_chars(&section, MAX_SECTION_CHARS))
}

pub fn run_context_cli(store: &Store) -> Result<(), EdictError> {
    let state = MemoryState::load(store)?;
    match build_context_section(&state) {
        Some(section) => println!("{}", section),
        None => println!("No active decisions."),
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "context",
        "description": "Render active decisions as a bounded context block",
        "limits": {
            "max_decisions": MAX_DECISIONS_HARD,
            "max_chars_per_decision": MAX_CHARS_PER_DECISION,
            "max_section_chars": MAX_SECTION_CHARS,
        }
    })
}

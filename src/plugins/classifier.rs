//! Decision candidate classification.
//!
//! The rule engine is a fixed sequence of regex tables evaluated in
//! priority order: transient-instruction openers reject first, then the
//! durable pattern groups run first-match-wins, then a general directive
//! fallback. Classification is a pure function of the input line.
//!
//! An external classifier can be layered on through [`ExternalClassifier`].
//! Its JSON response contract is validated strictly; any missing or
//! mistyped field discards the whole response and the rule result stands.

use crate::core::config::{ClassifierConfig, ClassifierMode};
use crate::core::event::Category;
use crate::plugins::conflict::normalize_text;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

/// Source tag carried by rule-engine verdicts.
pub const RULE_SOURCE: &str = "rule";
/// Source tag carried by validated external verdicts.
pub const EXTERNAL_SOURCE: &str = "external";

/// Lines shorter than this after cleanup are rejected outright.
pub const MIN_INFORMATIVE_CHARS: usize = 8;

/// Verdict for one candidate line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub is_decision: bool,
    /// Cleaned line: bullet markers stripped, first letter capitalized.
    pub normalized_text: String,
    /// In `0.0..=1.0`.
    pub confidence: f64,
    pub category: Category,
    /// Short justification, e.g. `"stack/tooling directive"`.
    pub reason: String,
    pub source: String,
}

static BULLET_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(?:[-*]\s*)?").unwrap());

/// One-off task language. Any match rejects the line before the durable
/// tables run.
static TRANSIENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^create\b",
        r"(?i)^run\b",
        r"(?i)^fix\b",
        r"(?i)^update\b",
        r"(?i)^implement\b.*\bnow\b",
        r"(?i)^do\b.*\btoday\b",
        r"(?i)^what\b",
        r"(?i)^can you\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// Durable decision pattern groups, evaluated in order, first match wins.
/// Each row carries the category, a confidence weight reflecting how
/// unambiguous that phrasing is, and the justification string.
static DURABLE_PATTERNS: LazyLock<Vec<(Regex, Category, f64, &'static str)>> =
    LazyLock::new(|| {
        vec![
            (
                Regex::new(r"(?i)\b(clean architecture|hexagonal|ddd|cqrs)\b").unwrap(),
                Category::Architecture,
                0.92,
                "architecture choice",
            ),
            (
                Regex::new(r"(?i)\b(use|adopt|standardize|prefer|choose|we will use)\b.*\b(react|tailwind|postgres|redis|mysql|prisma|typeorm)\b").unwrap(),
                Category::Tooling,
                0.88,
                "stack/tooling directive",
            ),
            (
                Regex::new(r"(?i)\b(do not|don't|never|must not|avoid)\b").unwrap(),
                Category::Policy,
                0.86,
                "explicit prohibition/policy",
            ),
            (
                Regex::new(r"(?i)\b(convention|guideline|policy|rule|standard)\b").unwrap(),
                Category::Policy,
                0.8,
                "project policy wording",
            ),
            (
                Regex::new(r"(?i)\b(table|schema|database|model)\b").unwrap(),
                Category::Data,
                0.74,
                "data design decision",
            ),
            (
                Regex::new(r"(?i)\b(clean code|testability|maintainability|quality)\b").unwrap(),
                Category::Quality,
                0.76,
                "quality standard",
            ),
        ]
    });

static DIRECTIVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(we will|must|should|always|never)\b").unwrap());

/// Trim, then capitalize the first letter.
fn ensure_sentence(text: &str) -> String {
    let trimmed = text.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn clean_line(line: &str) -> String {
    ensure_sentence(&BULLET_PREFIX.replace(line, ""))
}

fn rule_result(
    is_decision: bool,
    normalized_text: String,
    confidence: f64,
    category: Category,
    reason: &str,
) -> Classification {
    Classification {
        is_decision,
        normalized_text,
        confidence,
        category,
        reason: reason.to_string(),
        source: RULE_SOURCE.to_string(),
    }
}

/// Rule-engine classification of one trimmed line.
pub fn classify(line: &str) -> Classification {
    let cleaned = clean_line(line);
    if cleaned.chars().count() < MIN_INFORMATIVE_CHARS {
        return rule_result(false, cleaned, 0.1, Category::Workflow, "too short");
    }
    if TRANSIENT_PATTERNS.iter().any(|pattern| pattern.is_match(&cleaned)) {
        return rule_result(false, cleaned, 0.2, Category::Workflow, "transient instruction");
    }
    for (pattern, category, confidence, reason) in DURABLE_PATTERNS.iter() {
        if pattern.is_match(&cleaned) {
            return rule_result(true, cleaned, *confidence, *category, reason);
        }
    }
    if DIRECTIVE_PATTERN.is_match(&cleaned) {
        return rule_result(true, cleaned, 0.68, Category::Workflow, "directive statement");
    }
    // Longer unmatched lines keep a little more confidence than noise.
    let confidence = if normalize_text(&cleaned).chars().count() > 40 { 0.35 } else { 0.15 };
    rule_result(false, cleaned, confidence, Category::Workflow, "low confidence")
}

/// Instruction contract sent to external classifiers ahead of the line.
pub const EXTERNAL_CONTRACT: &str = "You classify whether a line is a durable project decision.\n\
Return ONLY valid JSON with keys:\n\
- isDecision: boolean\n\
- normalizedText: string\n\
- confidence: number (0..1)\n\
- category: one of architecture|tooling|policy|data|quality|workflow\n\
- reason: short string\n\
\n\
Mark isDecision=true only for durable rules/choices that should guide future work across tasks.\n\
Mark isDecision=false for one-off execution instructions (e.g. create file, run tests, update route now).\n";

/// An out-of-process classifier. Implementations return `None` whenever
/// the call fails or the response deviates from the contract; the caller
/// falls back to the rule engine.
pub trait ExternalClassifier {
    fn classify(&self, line: &str) -> Option<Classification>;
}

/// Runs a configured argv as the external classifier. The contract plus
/// the candidate line go to the child's stdin; stdout must contain a JSON
/// object honoring the response contract.
pub struct CommandClassifier {
    argv: Vec<String>,
}

impl CommandClassifier {
    pub fn new(argv: Vec<String>) -> Option<CommandClassifier> {
        if argv.is_empty() { None } else { Some(CommandClassifier { argv }) }
    }
}

impl ExternalClassifier for CommandClassifier {
    fn classify(&self, line: &str) -> Option<Classification> {
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;
        if let Some(mut stdin) = child.stdin.take() {
            // Ignore write errors: a child that exited early still gets its
            // stdout validated below.
            let _ = stdin.write_all(format!("{}\n{}\n", EXTERNAL_CONTRACT, line).as_bytes());
        }
        let output = child.wait_with_output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_external_response(&String::from_utf8_lossy(&output.stdout))
    }
}

/// First `{` through last `}`; external tools often wrap JSON in prose.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Strict contract validation. Every field must be present with the right
/// type and the category must come from the closed set; otherwise the
/// whole response is discarded.
pub fn parse_external_response(text: &str) -> Option<Classification> {
    let blob = extract_json_object(text)?;
    let parsed: Value = serde_json::from_str(blob).ok()?;
    let obj = parsed.as_object()?;
    let is_decision = obj.get("isDecision")?.as_bool()?;
    let normalized_text = obj.get("normalizedText")?.as_str()?.trim().to_string();
    let confidence = obj.get("confidence")?.as_f64()?.clamp(0.0, 1.0);
    let category = Category::parse(obj.get("category")?.as_str()?)?;
    let reason = obj.get("reason")?.as_str()?.trim().to_string();
    Some(Classification {
        is_decision,
        normalized_text,
        confidence,
        category,
        reason,
        source: EXTERNAL_SOURCE.to_string(),
    })
}

/// Classifies `line` under the configured mode. External failures always
/// fall back to the rule engine; a blended tie keeps the rule result.
pub fn classify_with(
    config: &ClassifierConfig,
    external: Option<&dyn ExternalClassifier>,
    line: &str,
) -> Classification {
    let rule = classify(line);
    let external_result = match config.mode {
        ClassifierMode::Rule => None,
        ClassifierMode::External | ClassifierMode::Blended => {
            external.and_then(|classifier| classifier.classify(line))
        }
    };
    match (config.mode, external_result) {
        (ClassifierMode::External, Some(result)) => result,
        (ClassifierMode::Blended, Some(result)) if result.confidence > rule.confidence => result,
        _ => rule,
    }
}

/// Builds the configured external classifier, if any argv is configured.
pub fn external_from_config(config: &ClassifierConfig) -> Option<CommandClassifier> {
    CommandClassifier::new(config.command.clone())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "classifier",
        "description": "Rule-table classification of decision candidates with optional external blending",
        "modes": ["rule", "external", "blended"],
        "categories": ["architecture", "tooling", "policy", "data", "quality", "workflow"],
        "external_contract": {
            "request": "instruction contract plus the candidate line on stdin",
            "response": {
                "isDecision": "boolean",
                "normalizedText": "string",
                "confidence": "number (0..1)",
                "category": "architecture|tooling|policy|data|quality|workflow",
                "reason": "string"
            }
        }
    })
}

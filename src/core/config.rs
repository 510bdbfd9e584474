//! Layered JSON configuration for decision memory.
//!
//! Two files contribute: the global `~/.edict/config.json` and the
//! project's `.edict/config.json`. Parsing is field-by-field tolerant. A
//! mistyped field or an unreadable file contributes nothing and the
//! default stands. A global `enabled: false` is a kill switch: the project
//! layer is not consulted at all.
//!
//! Config keys stay camelCase on disk (`retentionDays`, `autoCapture`,
//! `maxPerTurn`) so files written by earlier releases keep working.

use crate::core::error::EdictError;
use crate::core::event::DecisionStatus;
use serde_json::{Map, Value, json};
use std::path::Path;

pub const MIN_CONTEXT_DECISIONS: u32 = 1;
pub const MAX_CONTEXT_DECISIONS: u32 = 20;
pub const MIN_CAPTURE_PER_TURN: u32 = 1;
pub const MAX_CAPTURE_PER_TURN: u32 = 5;

/// Which classifier verdict wins during capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierMode {
    /// Rule tables only.
    Rule,
    /// External classifier, falling back to the rule result when the call
    /// fails or returns an invalid shape.
    External,
    /// Whichever of the two results carries the higher confidence; the
    /// rule result wins ties and external failures.
    Blended,
}

impl ClassifierMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierMode::Rule => "rule",
            ClassifierMode::External => "external",
            ClassifierMode::Blended => "blended",
        }
    }

    pub fn parse(value: &str) -> Option<ClassifierMode> {
        match value {
            "rule" => Some(ClassifierMode::Rule),
            "external" => Some(ClassifierMode::External),
            "blended" => Some(ClassifierMode::Blended),
            _ => None,
        }
    }
}

/// Which prompt lines become capture candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Explicit `Decision: …` lines plus directive-phrased lines.
    Directive,
    /// Explicit `Decision: …` lines only.
    Explicit,
}

impl ScanMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScanMode::Directive => "directive",
            ScanMode::Explicit => "explicit",
        }
    }

    pub fn parse(value: &str) -> Option<ScanMode> {
        match value {
            "directive" => Some(ScanMode::Directive),
            "explicit" => Some(ScanMode::Explicit),
            _ => None,
        }
    }
}

/// Days a non-active decision survives before `purge` offers to remove it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetentionDays {
    pub draft: u32,
    pub rejected: u32,
    pub superseded: u32,
}

impl RetentionDays {
    /// Active decisions never age out, so they have no retention window.
    pub fn for_status(&self, status: DecisionStatus) -> Option<u32> {
        match status {
            DecisionStatus::Draft => Some(self.draft),
            DecisionStatus::Rejected => Some(self.rejected),
            DecisionStatus::Superseded => Some(self.superseded),
            DecisionStatus::Active => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextConfig {
    /// Clamped to `1..=20`; the renderer also enforces the hard cap.
    pub max_decisions: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoCaptureConfig {
    pub enabled: bool,
    /// When false the pipeline accepts every surviving candidate.
    pub confirm: bool,
    /// Clamped to `1..=5`.
    pub max_per_turn: u32,
    pub scan: ScanMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub mode: ClassifierMode,
    /// Minimum capture confidence, clamped to `0.0..=1.0`.
    pub threshold: f64,
    /// Argv of the external classifier process; empty means none is
    /// configured and external/blended modes degrade to rule-only.
    pub command: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> ClassifierConfig {
        ClassifierConfig { mode: ClassifierMode::Rule, threshold: 0.6, command: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub retention_days: RetentionDays,
    pub context: ContextConfig,
    pub auto_capture: AutoCaptureConfig,
    pub classifier: ClassifierConfig,
}

impl Default for MemoryConfig {
    fn default() -> MemoryConfig {
        MemoryConfig {
            enabled: true,
            retention_days: RetentionDays { draft: 30, rejected: 90, superseded: 180 },
            context: ContextConfig { max_decisions: 20 },
            auto_capture: AutoCaptureConfig {
                enabled: true,
                confirm: true,
                max_per_turn: 2,
                scan: ScanMode::Directive,
            },
            classifier: ClassifierConfig::default(),
        }
    }
}

fn clamped_count(value: &Value, min: u32, max: u32) -> Option<u32> {
    let number = value.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    Some((number.floor().max(0.0) as u32).clamp(min, max))
}

fn day_count(value: &Value) -> Option<u32> {
    let number = value.as_f64()?;
    if !number.is_finite() {
        return None;
    }
    Some(number.floor().max(0.0) as u32)
}

impl MemoryConfig {
    /// Overlays one raw config object onto `self`, field by field. Anything
    /// missing or mistyped leaves the current value in place.
    fn apply_layer(&mut self, raw: &Value) {
        let Some(obj) = raw.as_object() else {
            return;
        };
        if let Some(enabled) = obj.get("enabled").and_then(Value::as_bool) {
            self.enabled = enabled;
        }
        if let Some(retention) = obj.get("retentionDays").and_then(Value::as_object) {
            if let Some(days) = retention.get("draft").and_then(day_count) {
                self.retention_days.draft = days;
            }
            if let Some(days) = retention.get("rejected").and_then(day_count) {
                self.retention_days.rejected = days;
            }
            if let Some(days) = retention.get("superseded").and_then(day_count) {
                self.retention_days.superseded = days;
            }
        }
        if let Some(context) = obj.get("context").and_then(Value::as_object) {
            if let Some(max) = context
                .get("maxDecisions")
                .and_then(|v| clamped_count(v, MIN_CONTEXT_DECISIONS, MAX_CONTEXT_DECISIONS))
            {
                self.context.max_decisions = max;
            }
        }
        if let Some(capture) = obj.get("autoCapture").and_then(Value::as_object) {
            if let Some(enabled) = capture.get("enabled").and_then(Value::as_bool) {
                self.auto_capture.enabled = enabled;
            }
            if let Some(confirm) = capture.get("confirm").and_then(Value::as_bool) {
                self.auto_capture.confirm = confirm;
            }
            if let Some(max) = capture
                .get("maxPerTurn")
                .and_then(|v| clamped_count(v, MIN_CAPTURE_PER_TURN, MAX_CAPTURE_PER_TURN))
            {
                self.auto_capture.max_per_turn = max;
            }
            if let Some(scan) = capture.get("scan").and_then(Value::as_str).and_then(ScanMode::parse)
            {
                self.auto_capture.scan = scan;
            }
        }
        if let Some(classifier) = obj.get("classifier").and_then(Value::as_object) {
            if let Some(mode) = classifier
                .get("mode")
                .and_then(Value::as_str)
                .and_then(ClassifierMode::parse)
            {
                self.classifier.mode = mode;
            }
            if let Some(threshold) = classifier.get("threshold").and_then(Value::as_f64) {
                if threshold.is_finite() {
                    self.classifier.threshold = threshold.clamp(0.0, 1.0);
                }
            }
            if let Some(command) = classifier.get("command").and_then(Value::as_array) {
                self.classifier.command =
                    command.iter().filter_map(Value::as_str).map(str::to_string).collect();
            }
        }
    }
}

/// Raw file contents as a JSON value; missing or unparseable files read as
/// `Null` and contribute nothing.
fn load_raw(path: &Path) -> Value {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Value::Null;
    };
    serde_json::from_str(&content).unwrap_or(Value::Null)
}

/// Resolves the effective config: defaults, then the global layer, then
/// (unless the global layer disabled memory outright) the project layer.
pub fn load_effective_config(global_path: Option<&Path>, project_path: &Path) -> MemoryConfig {
    let mut config = MemoryConfig::default();
    if let Some(global) = global_path {
        config.apply_layer(&load_raw(global));
        if !config.enabled {
            return config;
        }
    }
    config.apply_layer(&load_raw(project_path));
    config
}

/// Rewrites only the `enabled` key of a raw config file, preserving every
/// other key the file already carries.
pub fn set_enabled(path: &Path, enabled: bool) -> Result<(), EdictError> {
    let mut raw = match load_raw(path) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    raw.insert("enabled".to_string(), json!(enabled));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(EdictError::IoError)?;
    }
    let content =
        serde_json::to_string_pretty(&Value::Object(raw)).map_err(EdictError::JsonError)?;
    std::fs::write(path, format!("{}\n", content)).map_err(EdictError::IoError)?;
    Ok(())
}

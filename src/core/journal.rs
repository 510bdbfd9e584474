//! Line-oriented codec and append-only persistence for decision events.
//!
//! Each log line is one self-contained JSON object with single-letter keys:
//! `{"v":1,"t":"…","p":"…","e":"a|ed|st|su|rm","i":"…","d":{…},"u":"…"}`.
//! Decoding is tolerant in one direction only: a missing or mistyped
//! envelope field (`v`, `t`, `p`, `e`, `i`) rejects the whole line, while
//! malformed optional payload fields under `d` are dropped one at a time.
//! Loading never fails on a corrupt line; it skips it and keeps going, so a
//! truncated final line from a crash cannot poison the rest of the log.

use crate::core::error::EdictError;
use crate::core::event::{
    AddPayload, Category, ChangePayload, DecisionEvent, DecisionStatus, EventKind,
};
use serde_json::{Map, Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// The only log schema version this build reads or writes.
pub const SCHEMA_VERSION: u64 = 1;

/// Wire payload keys, kept short to keep log lines compact:
/// `ti` title, `tx` text, `tg` tags, `s` status, `r` reason,
/// `sp` supersedes, `c` conflicts-with, `so` source, `cf` confidence,
/// `cg` category.
pub fn encode_event(event: &DecisionEvent) -> String {
    let mut data = Map::new();
    match &event.kind {
        EventKind::Add(payload) => {
            put_change_fields(&mut data, &change_view(payload));
            if let Some(source) = &payload.source {
                data.insert("so".to_string(), json!(source));
            }
            if let Some(confidence) = payload.confidence {
                data.insert("cf".to_string(), json!(confidence));
            }
            if let Some(category) = payload.category {
                data.insert("cg".to_string(), json!(category.as_str()));
            }
        }
        EventKind::Edit(payload) | EventKind::Supersede(payload) => {
            put_change_fields(&mut data, payload);
        }
        EventKind::SetStatus { status, reason } => {
            data.insert("s".to_string(), json!(status.as_str()));
            if let Some(reason) = reason {
                data.insert("r".to_string(), json!(reason));
            }
        }
        EventKind::Remove => {}
    }

    let mut line = Map::new();
    line.insert("v".to_string(), json!(SCHEMA_VERSION));
    line.insert("t".to_string(), json!(event.timestamp));
    line.insert("p".to_string(), json!(event.project_id));
    line.insert("e".to_string(), json!(event.kind.code()));
    line.insert("i".to_string(), json!(event.target_id));
    if !data.is_empty() {
        line.insert("d".to_string(), Value::Object(data));
    }
    if let Some(actor) = &event.actor {
        line.insert("u".to_string(), json!(actor));
    }
    Value::Object(line).to_string()
}

fn change_view(payload: &AddPayload) -> ChangePayload {
    ChangePayload {
        title: payload.title.clone(),
        text: payload.text.clone(),
        tags: payload.tags.clone(),
        status: payload.status,
        reason: payload.reason.clone(),
        supersedes: payload.supersedes.clone(),
        conflicts_with: payload.conflicts_with.clone(),
    }
}

fn put_change_fields(data: &mut Map<String, Value>, payload: &ChangePayload) {
    if let Some(title) = &payload.title {
        data.insert("ti".to_string(), json!(title));
    }
    if let Some(text) = &payload.text {
        data.insert("tx".to_string(), json!(text));
    }
    if let Some(tags) = &payload.tags {
        data.insert("tg".to_string(), json!(tags));
    }
    if let Some(status) = payload.status {
        data.insert("s".to_string(), json!(status.as_str()));
    }
    if let Some(reason) = &payload.reason {
        data.insert("r".to_string(), json!(reason));
    }
    if let Some(supersedes) = &payload.supersedes {
        data.insert("sp".to_string(), json!(supersedes));
    }
    if let Some(conflicts) = &payload.conflicts_with {
        data.insert("c".to_string(), json!(conflicts));
    }
}

/// Decodes one log line. `None` means the line is unusable: not JSON, wrong
/// version, a required envelope field missing or mistyped, an unknown event
/// code, or a `st` event without a valid status.
pub fn decode_event(line: &str) -> Option<DecisionEvent> {
    let parsed: Value = serde_json::from_str(line).ok()?;
    let obj = parsed.as_object()?;
    if obj.get("v").and_then(Value::as_u64) != Some(SCHEMA_VERSION) {
        return None;
    }
    let timestamp = obj.get("t")?.as_str()?.to_string();
    let project_id = obj.get("p")?.as_str()?.to_string();
    let target_id = obj.get("i")?.as_str()?.to_string();
    let data = obj.get("d");

    let kind = match obj.get("e")?.as_str()? {
        "a" => EventKind::Add(parse_add(data)),
        "ed" => EventKind::Edit(parse_change(data)),
        "su" => EventKind::Supersede(parse_change(data)),
        "st" => EventKind::SetStatus {
            status: parse_status(data)?,
            reason: parse_string(data, "r"),
        },
        "rm" => EventKind::Remove,
        _ => return None,
    };

    Some(DecisionEvent {
        timestamp,
        project_id,
        target_id,
        kind,
        actor: obj.get("u").and_then(Value::as_str).map(str::to_string),
    })
}

fn parse_string(data: Option<&Value>, key: &str) -> Option<String> {
    data?.get(key)?.as_str().map(str::to_string)
}

fn parse_string_list(data: Option<&Value>, key: &str) -> Option<Vec<String>> {
    let items = data?.get(key)?.as_array()?;
    Some(items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

fn parse_status(data: Option<&Value>) -> Option<DecisionStatus> {
    data?.get("s")?.as_str().and_then(DecisionStatus::parse)
}

fn parse_change(data: Option<&Value>) -> ChangePayload {
    ChangePayload {
        title: parse_string(data, "ti"),
        text: parse_string(data, "tx"),
        tags: parse_string_list(data, "tg"),
        status: parse_status(data),
        reason: parse_string(data, "r"),
        supersedes: parse_string(data, "sp"),
        conflicts_with: parse_string_list(data, "c"),
    }
}

fn parse_add(data: Option<&Value>) -> AddPayload {
    let base = parse_change(data);
    AddPayload {
        title: base.title,
        text: base.text,
        tags: base.tags,
        status: base.status,
        reason: base.reason,
        supersedes: base.supersedes,
        conflicts_with: base.conflicts_with,
        source: parse_string(data, "so"),
        confidence: data.and_then(|d| d.get("cf")).and_then(Value::as_f64),
        category: data
            .and_then(|d| d.get("cg"))
            .and_then(Value::as_str)
            .and_then(Category::parse),
    }
}

/// Appends one encoded event as a new last line, creating the containing
/// directory on first write. Existing lines are never rewritten.
pub fn append_event(path: &Path, event: &DecisionEvent) -> Result<(), EdictError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(EdictError::IoError)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(EdictError::IoError)?;
    writeln!(file, "{}", encode_event(event)).map_err(EdictError::IoError)?;
    Ok(())
}

/// Loads every decodable event in file order. A missing file is an empty
/// log; blank and undecodable lines are skipped.
pub fn load_events(path: &Path) -> Result<Vec<DecisionEvent>, EdictError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = File::open(path).map_err(EdictError::IoError)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => continue,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(event) = decode_event(trimmed) {
            events.push(event);
        }
    }
    Ok(events)
}

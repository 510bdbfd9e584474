//! Store abstraction for Edict's on-disk state.
//!
//! All durable state lives under a `.edict/` directory: the decision event
//! log under `data/` and an optional `config.json` beside it. A second,
//! user-global `~/.edict/config.json` participates in config resolution
//! only; decisions are always project-scoped.

use std::path::PathBuf;

/// Event log file name under `.edict/data/`.
pub const EVENTS_FILE: &str = "decisions.events.jsonl";
/// Config file name, both project-scoped and global.
pub const CONFIG_FILE: &str = "config.json";

/// Store handle representing one project's Edict state workspace.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the project root (the directory holding `.edict/`)
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Store {
        Store { root: root.into() }
    }

    pub fn edict_dir(&self) -> PathBuf {
        self.root.join(".edict")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.edict_dir().join("data")
    }

    /// Path of the append-only decision event log.
    pub fn events_path(&self) -> PathBuf {
        self.data_dir().join(EVENTS_FILE)
    }

    pub fn project_config_path(&self) -> PathBuf {
        self.edict_dir().join(CONFIG_FILE)
    }
}

/// Global config path under the user's home directory. `None` when the
/// environment carries no home (the global layer is skipped then).
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".edict").join(CONFIG_FILE))
}

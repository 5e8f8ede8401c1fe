//! Snapshot persistence for resuming a prior run.
//!
//! Layout on disk:
//!
//! - `<dir>/<agent_name>/long_term.json` -- the agent's long-term records
//! - `<dir>/short_term.json` -- one map of agent name to short-term
//!   memory snapshot
//!
//! Loads are forgiving: a missing file means "no prior state" and yields
//! the empty value, so a fresh run and a resumed run share one code path.
//! Writes create the directory tree as needed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::MemoryError;
use crate::long_term::MemoryRecord;
use crate::short_term::ShortTermMemory;

/// File name of a per-agent long-term snapshot.
const LONG_TERM_FILE: &str = "long_term.json";

/// File name of the shared short-term snapshot map.
const SHORT_TERM_FILE: &str = "short_term.json";

/// Path of an agent's long-term snapshot file.
fn long_term_path(dir: &Path, agent_name: &str) -> PathBuf {
    dir.join(agent_name).join(LONG_TERM_FILE)
}

/// Write an agent's long-term records under its subdirectory.
///
/// # Errors
///
/// Returns [`MemoryError::Io`] or [`MemoryError::Serde`] on failure.
pub fn save_long_term(
    dir: &Path,
    agent_name: &str,
    records: &[MemoryRecord],
) -> Result<(), MemoryError> {
    let path = long_term_path(dir, agent_name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(&path, json)?;
    info!(agent = agent_name, records = records.len(), "long-term snapshot saved");
    Ok(())
}

/// Load an agent's long-term records, or an empty list when no snapshot
/// exists.
///
/// # Errors
///
/// Returns [`MemoryError::Serde`] when a snapshot exists but is corrupt,
/// or [`MemoryError::Io`] on other read failures.
pub fn load_long_term(
    dir: &Path,
    agent_name: &str,
) -> Result<Vec<MemoryRecord>, MemoryError> {
    let path = long_term_path(dir, agent_name);
    match std::fs::read_to_string(&path) {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(MemoryError::Io(e)),
    }
}

/// Write the short-term snapshot map keyed by agent name.
///
/// # Errors
///
/// Returns [`MemoryError::Io`] or [`MemoryError::Serde`] on failure.
pub fn save_short_term(
    dir: &Path,
    snapshots: &BTreeMap<String, ShortTermMemory>,
) -> Result<(), MemoryError> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(snapshots)?;
    std::fs::write(dir.join(SHORT_TERM_FILE), json)?;
    info!(agents = snapshots.len(), "short-term snapshot saved");
    Ok(())
}

/// Load the short-term snapshot map, or an empty map when no snapshot
/// exists.
///
/// # Errors
///
/// Returns [`MemoryError::Serde`] when a snapshot exists but is corrupt,
/// or [`MemoryError::Io`] on other read failures.
pub fn load_short_term(
    dir: &Path,
) -> Result<BTreeMap<String, ShortTermMemory>, MemoryError> {
    match std::fs::read_to_string(dir.join(SHORT_TERM_FILE)) {
        Ok(json) => Ok(serde_json::from_str(&json)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(MemoryError::Io(e)),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbedder;
    use crate::long_term::LongTermMemory;

    fn temp_dir(label: &str) -> PathBuf {
        let unique = format!(
            "commons_snapshots_{label}_{}_{:?}",
            std::process::id(),
            std::thread::current().id(),
        );
        let dir = std::env::temp_dir().join(unique);
        std::fs::create_dir_all(&dir).ok();
        dir
    }

    #[test]
    fn long_term_roundtrip() {
        let dir = temp_dir("lt");
        let mut store = LongTermMemory::new(Box::new(HashingEmbedder::default()));
        let added = store.add_memory(
            "saw an apple by the wall",
            "2024-06-01 08:00:00",
            3,
            &BTreeMap::new(),
        );
        assert!(added.is_ok());

        let saved = save_long_term(&dir, "Kora", store.records());
        assert!(saved.is_ok());

        let restored = load_long_term(&dir, "Kora");
        assert!(restored.is_ok());
        let records = restored.unwrap_or_default();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records.first().map(|r| r.text.as_str()),
            Some("saw an apple by the wall")
        );

        // A restored store answers queries like the original.
        let resumed = LongTermMemory::from_records(
            Box::new(HashingEmbedder::default()),
            records,
        );
        assert_eq!(resumed.len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_long_term_snapshot_is_empty() {
        let dir = temp_dir("lt_missing");
        let restored = load_long_term(&dir, "Nobody");
        assert!(restored.is_ok());
        assert!(restored.unwrap_or_default().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn short_term_roundtrip() {
        let dir = temp_dir("st");
        let mut memory = ShortTermMemory::new();
        memory.set_current_plan(String::from("harvest slowly"));
        let mut snapshots = BTreeMap::new();
        snapshots.insert(String::from("Kora"), memory);

        assert!(save_short_term(&dir, &snapshots).is_ok());
        let restored = load_short_term(&dir);
        assert!(restored.is_ok());
        let restored = restored.unwrap_or_default();
        assert_eq!(
            restored.get("Kora").and_then(|m| m.current_plan()),
            Some("harvest slowly")
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_short_term_snapshot_is_empty() {
        let dir = temp_dir("st_missing");
        let restored = load_short_term(&dir);
        assert!(restored.is_ok());
        assert!(restored.unwrap_or_default().is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}

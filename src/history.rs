use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use dirs::data_dir;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "codemate";
const HISTORY_FILE_NAME: &str = "history.jsonl";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub model: String,
    pub outcome: String,
}

pub fn history_path() -> Result<PathBuf> {
    let base = data_dir().context("unable to resolve OS data directory")?;
    Ok(base.join(APP_DIR_NAME).join(HISTORY_FILE_NAME))
}

pub fn append_record(record: &HistoryRecord) -> Result<()> {
    let path = history_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating history dir: {}", parent.display()))?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening history for append: {}", path.display()))?;
    let line = serde_json::to_string(record)?;
    f.write_all(line.as_bytes())?;
    f.write_all(b"\n")?;
    Ok(())
}

/// Most recent records, oldest first. Unreadable lines are skipped.
pub fn load_recent(limit: usize) -> Result<Vec<HistoryRecord>> {
    let path = history_path()?;
    if !path.exists() {
        return Ok(vec![]);
    }
    let content =
        fs::read_to_string(&path).with_context(|| format!("reading history: {}", path.display()))?;
    let mut out: Vec<HistoryRecord> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryRecord>(line) {
            Ok(r) => out.push(r),
            Err(_) => continue,
        }
    }
    if out.len() > limit {
        out.drain(..out.len() - limit);
    }
    Ok(out)
}

pub fn clear() -> Result<()> {
    let path = history_path()?;
    if path.exists() {
        fs::remove_file(&path)
            .with_context(|| format!("removing history: {}", path.display()))?;
    }
    Ok(())
}

// ABOUTME: Append-only JSONL activity log backing the admin dashboard's log view.
// ABOUTME: Provides fsync'd append, sequential replay, backwards tail reads, and truncation repair.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during activity log operations.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One line of the activity log: something an editor or visitor did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActivityEntry {
    pub fn new(action: impl Into<String>, target: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            target,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Bytes read per step when scanning the log from its end.
const TAIL_CHUNK: u64 = 8 * 1024;

/// An append-only JSONL activity log backed by a file.
pub struct ActivityLog {
    path: PathBuf,
    file: File,
}

impl ActivityLog {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (or create) the log in append mode, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, ActivityError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Append one entry as a JSON line and fsync.
    pub fn append(&mut self, entry: &ActivityEntry) -> Result<(), ActivityError> {
        let json = serde_json::to_string(entry)?;
        writeln!(self.file, "{}", json)?;
        self.file.sync_all()?;
        Ok(())
    }

    /// Read every entry in order. A missing file reads as empty.
    pub fn replay(path: &Path) -> Result<Vec<ActivityEntry>, ActivityError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }

    /// The newest `limit` entries, newest first. Reads backwards from the
    /// end of the file and stops once `limit` entries are found. An
    /// unterminated final line is a partial write and is skipped.
    pub fn tail(path: &Path, limit: usize) -> Result<Vec<ActivityEntry>, ActivityError> {
        if limit == 0 || !path.exists() {
            return Ok(Vec::new());
        }
        let mut file = File::open(path)?;
        let mut pos = file.metadata()?.len();
        let mut entries = Vec::new();
        // Start of the line cut by the previous chunk boundary
        let mut pending: Vec<u8> = Vec::new();
        let mut last_line = true;

        while pos > 0 && entries.len() < limit {
            let step = TAIL_CHUNK.min(pos);
            pos -= step;
            let mut buf = vec![0u8; step as usize];
            file.seek(SeekFrom::Start(pos))?;
            file.read_exact(&mut buf)?;
            buf.extend_from_slice(&pending);

            let mut pieces = buf.split(|b| *b == b'\n');
            let head = if pos > 0 { pieces.next() } else { None };
            let lines: Vec<&[u8]> = pieces.collect();

            for line in lines.into_iter().rev() {
                let unterminated = std::mem::take(&mut last_line) && !line.is_empty();
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<ActivityEntry>(line) {
                    Ok(entry) => entries.push(entry),
                    Err(_) if unterminated => {}
                    Err(e) => return Err(e.into()),
                }
                if entries.len() == limit {
                    break;
                }
            }

            pending = head.map(<[u8]>::to_vec).unwrap_or_default();
        }

        Ok(entries)
    }

    /// Keep only complete, parseable lines, dropping any partial trailing
    /// write. Uses temp file + fsync + rename. Returns the entries retained.
    pub fn repair(path: &Path) -> Result<usize, ActivityError> {
        let reader = BufReader::new(File::open(path)?);
        let mut valid_lines: Vec<String> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if serde_json::from_str::<ActivityEntry>(&line).is_ok() {
                valid_lines.push(line);
            }
        }

        let count = valid_lines.len();

        let tmp_path = path.with_extension("jsonl.tmp");
        let mut tmp_file = File::create(&tmp_path)?;
        for line in &valid_lines {
            writeln!(tmp_file, "{}", line)?;
        }
        tmp_file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // Best-effort: the rename already succeeded
        if let Some(parent) = path.parent()
            && let Ok(dir) = File::open(parent)
        {
            let _ = dir.sync_all();
        }

        Ok(count)
    }
}

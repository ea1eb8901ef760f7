use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde_json::json;

use crate::record::Record;

pub const INDEX_FILE: &str = "detections.jsonl";
const UNLABELED: &str = "unlabeled";

/// Writes received payloads to disk and keeps a JSON lines index of them.
pub struct FrameStore {
    dir: PathBuf,
    index: File,
    seq: u64,
}

impl FrameStore {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let index_path = dir.join(INDEX_FILE);
        let index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&index_path)
            .with_context(|| format!("failed to open {}", index_path.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            index,
            seq: 0,
        })
    }

    pub fn saved(&self) -> u64 {
        self.seq
    }

    pub fn save(
        &mut self,
        record: &Record,
        peer: &str,
        received_at: DateTime<Local>,
    ) -> Result<PathBuf> {
        let label = sanitize_label(record.top_label().unwrap_or(UNLABELED));
        let ext = if record.is_jpeg() { "jpg" } else { "bin" };
        let name = format!(
            "{}_{:06}_{}.{}",
            received_at.format("%Y%m%d_%H%M%S_%3f"),
            self.seq,
            label,
            ext
        );
        let path = self.dir.join(&name);
        fs::write(&path, &record.payload)
            .with_context(|| format!("failed to write {}", path.display()))?;

        let entry = json!({
            "received_at": received_at.to_rfc3339(),
            "peer": peer,
            "file": name,
            "bytes": record.payload.len(),
            "detections": record.detections,
        });
        writeln!(self.index, "{entry}")
            .with_context(|| format!("failed to append to {INDEX_FILE}"))?;

        self.seq += 1;
        Ok(path)
    }
}

fn sanitize_label(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(32)
        .collect();
    if cleaned.is_empty() {
        UNLABELED.to_string()
    } else {
        cleaned
    }
}

//! Listing records and the append-only record sink
//!
//! Records are the terminal output of leaf pages. They are immutable once
//! extracted; the sink may therefore contain exact duplicates (the same
//! listing reachable through several facet combinations), which the offline
//! dedup pass repairs afterwards.

mod dedup;

pub use dedup::{dedup_records, dedup_sink_file, derive_clean_path, DedupOptions, DedupStats};

use crate::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Sentinel for a field whose extraction failed or whose value is absent
pub const FIELD_SENTINEL: &str = "N/A";

/// One extracted listing.
///
/// Equality and hashing are field-for-field and positional: two records whose
/// list fields hold the same tokens in a different order are distinct. This
/// is the record's own dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Listing title
    pub title: String,

    /// Free-text description tokens, whitespace-compacted, in source order
    pub des: Vec<String>,

    /// Bottom tag line entries
    pub bottom: Vec<String>,

    /// Managing brand, or the sentinel
    pub brand: String,

    /// Price with currency unit, or the sentinel
    pub price: String,
}

/// Append-only JSON-lines record sink.
///
/// Appends may come from any leaf page's extraction concurrently; each append
/// is one serialized line guarded by the writer lock. No ordering among
/// appends is promised or needed.
pub struct RecordSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl RecordSink {
    /// Creates (or truncates) the sink file for a fresh run
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| HarvestError::Sink {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Appends one record as a JSON line
    pub fn append(&self, record: &ListingRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().unwrap();
        writeln!(writer, "{}", line).map_err(|e| HarvestError::Sink {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    /// Flushes buffered records to disk
    pub fn flush(&self) -> Result<()> {
        let mut writer = self.writer.lock().unwrap();
        writer.flush().map_err(|e| HarvestError::Sink {
            path: self.path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads a sink file back wholesale, preserving append order.
///
/// Blank lines are skipped; a malformed line fails the read rather than
/// silently dropping records.
pub fn read_records(path: &Path) -> Result<Vec<ListingRecord>> {
    let file = File::open(path).map_err(|e| HarvestError::Sink {
        path: path.display().to_string(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| HarvestError::Sink {
            path: path.display().to_string(),
            source: e,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Writes a record sequence to a fresh JSON-lines file
pub fn write_records(path: &Path, records: &[ListingRecord]) -> Result<()> {
    let file = File::create(path).map_err(|e| HarvestError::Sink {
        path: path.display().to_string(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(writer, "{}", line).map_err(|e| HarvestError::Sink {
            path: path.display().to_string(),
            source: e,
        })?;
    }
    writer.flush().map_err(|e| HarvestError::Sink {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_record(title: &str) -> ListingRecord {
        ListingRecord {
            title: title.to_string(),
            des: vec!["南山区".to_string(), "60㎡".to_string()],
            bottom: vec!["近地铁".to_string()],
            brand: "链家".to_string(),
            price: "3500元/月".to_string(),
        }
    }

    #[test]
    fn test_sink_round_trip_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let sink = RecordSink::create(&path).unwrap();
        sink.append(&sample_record("a")).unwrap();
        sink.append(&sample_record("b")).unwrap();
        sink.flush().unwrap();

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "a");
        assert_eq!(records[1].title, "b");
    }

    #[test]
    fn test_create_truncates_previous_run() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.jsonl");

        let sink = RecordSink::create(&path).unwrap();
        sink.append(&sample_record("old")).unwrap();
        sink.flush().unwrap();
        drop(sink);

        let sink = RecordSink::create(&path).unwrap();
        sink.flush().unwrap();
        drop(sink);

        assert!(read_records(&path).unwrap().is_empty());
    }

    #[test]
    fn test_list_field_order_is_data() {
        let mut a = sample_record("a");
        let mut b = sample_record("a");
        assert_eq!(a, b);

        b.des.reverse();
        assert_ne!(a, b);
        a.des.reverse();
        assert_eq!(a, b);
    }
}

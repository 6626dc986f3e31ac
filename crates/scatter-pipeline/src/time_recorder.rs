//! Per-stage timing aggregation, grounded in `time_record.py`'s
//! `TimeRecorder`: named sections accumulate a list of durations each,
//! recorders from different workers merge by concatenating those lists,
//! and a table summarizes count/mean/total per section.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimeRecorderError {
    #[error("could not write time record to {0}: {1}")]
    Write(std::path::PathBuf, std::io::Error),
    #[error("could not read time record from {0}: {1}")]
    Read(std::path::PathBuf, std::io::Error),
    #[error("malformed time record file: {0}")]
    Corrupt(#[from] Box<bincode::ErrorKind>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordSnapshot {
    name: String,
    records: BTreeMap<String, Vec<f64>>,
}

/// Accumulates named, nested timing sections (`"stage/substage"`) as
/// lists of elapsed seconds. Cheap to merge across workers: records
/// from the same section name are concatenated, never averaged.
#[derive(Debug, Clone)]
pub struct TimeRecorder {
    name: String,
    no_record: bool,
    records: BTreeMap<String, Vec<f64>>,
}

impl TimeRecorder {
    pub fn new(name: impl Into<String>, no_record: bool) -> Self {
        Self {
            name: name.into(),
            no_record,
            records: BTreeMap::new(),
        }
    }

    /// Times `f`, recording its elapsed seconds under `section` (joined
    /// with this recorder's name, mirroring `_get_record_name`).
    pub fn time<T>(&mut self, section: &str, f: impl FnOnce() -> T) -> T {
        if self.no_record {
            return f();
        }
        let start = Instant::now();
        let result = f();
        self.push(section, start.elapsed());
        result
    }

    pub fn push(&mut self, section: &str, elapsed: Duration) {
        if self.no_record {
            return;
        }
        let key = format!("{}/{}", self.name, section);
        self.records.entry(key).or_default().push(elapsed.as_secs_f64());
    }

    pub fn merge(&mut self, other: &TimeRecorder) {
        for (k, v) in &other.records {
            self.records.entry(k.clone()).or_default().extend(v);
        }
    }

    pub fn total_time(&self) -> f64 {
        self.records.values().flatten().sum()
    }

    pub fn total_number_of_records(&self) -> usize {
        self.records.values().map(|v| v.len()).sum()
    }

    /// A `[name, num_records, mean_seconds, total_seconds]` row per
    /// section, sorted by name, plus a header row.
    pub fn to_table(&self) -> Vec<Vec<String>> {
        let mut table = vec![vec![
            String::new(),
            "Num records".to_string(),
            "Mean (s)".to_string(),
            "Total (s)".to_string(),
        ]];
        for (name, values) in &self.records {
            let n = values.len();
            let total: f64 = values.iter().sum();
            let mean = if n > 0 { total / n as f64 } else { 0.0 };
            table.push(vec![name.clone(), n.to_string(), format!("{mean:.2e}"), format!("{total:.2e}")]);
        }
        table
    }

    pub fn table_string(&self) -> String {
        let table = self.to_table();
        if table.is_empty() {
            return String::new();
        }
        let cols = table[0].len();
        let widths: Vec<usize> = (0..cols)
            .map(|c| table.iter().map(|row| row[c].len()).max().unwrap_or(0) + 3)
            .collect();

        table
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&widths)
                    .map(|(cell, width)| format!("{cell:>width$}"))
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn save(&self, path: &Path) -> Result<(), TimeRecorderError> {
        let snapshot = RecordSnapshot {
            name: self.name.clone(),
            records: self.records.clone(),
        };
        let bytes = bincode::serialize(&snapshot)?;
        std::fs::write(path, bytes).map_err(|e| TimeRecorderError::Write(path.to_path_buf(), e))
    }

    pub fn load(path: &Path) -> Result<Self, TimeRecorderError> {
        let bytes = std::fs::read(path).map_err(|e| TimeRecorderError::Read(path.to_path_buf(), e))?;
        let snapshot: RecordSnapshot = bincode::deserialize(&bytes)?;
        Ok(Self {
            name: snapshot.name,
            no_record: false,
            records: snapshot.records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn time_records_elapsed_seconds() {
        let mut rec = TimeRecorder::new("stage", false);
        rec.time("work", || sleep(Duration::from_millis(5)));
        assert_eq!(rec.total_number_of_records(), 1);
        assert!(rec.total_time() > 0.0);
    }

    #[test]
    fn no_record_skips_bookkeeping_but_still_runs_the_closure() {
        let mut rec = TimeRecorder::new("stage", true);
        let value = rec.time("work", || 42);
        assert_eq!(value, 42);
        assert_eq!(rec.total_number_of_records(), 0);
    }

    #[test]
    fn merge_concatenates_sections() {
        let mut a = TimeRecorder::new("stage", false);
        a.push("read", Duration::from_millis(10));
        let mut b = TimeRecorder::new("stage", false);
        b.push("read", Duration::from_millis(20));

        a.merge(&b);
        assert_eq!(a.records.get("stage/read").unwrap().len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.bin");
        let mut rec = TimeRecorder::new("stage", false);
        rec.push("read", Duration::from_millis(10));
        rec.save(&path).unwrap();

        let loaded = TimeRecorder::load(&path).unwrap();
        assert_eq!(loaded.total_number_of_records(), 1);
    }
}

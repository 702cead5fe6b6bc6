use serde::{Deserialize, Deserializer, Serialize};

/// A completed task, as shown in the summary and written to storage and csv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub task: String,
    #[serde(default)]
    pub description: String,
    pub start: String,
    pub end: String,
    pub duration: String,
    /// Source of truth for totals; `start`, `end` and `duration` are display strings.
    #[serde(default, deserialize_with = "seconds_or_zero")]
    pub seconds: u64,
}

// A missing or null `seconds` counts as zero.
fn seconds_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Ordered record list, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Log {
    records: Vec<LogRecord>,
}

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<LogRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn prepend(&mut self, record: LogRecord) {
        self.records.insert(0, record);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn newest(&self) -> Option<&LogRecord> {
        self.records.first()
    }

    pub fn total_seconds(&self) -> u64 {
        self.records.iter().map(|r| r.seconds).sum()
    }
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inventory written by the external scan tool to `<candidate>/.freight/scan.json`.
///
/// An unreadable `directory_mtime` does not invalidate the record: the size
/// data stays usable and the problem is kept in `mtime_error` for the scan
/// scheduler to report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawScanRecord")]
pub struct ScanRecord {
    pub size_bytes: u64,
    pub file_count: u64,
    pub scan_time: Option<String>,
    /// Directory mtime (epoch seconds) observed when the scan ran.
    pub directory_mtime: Option<i64>,
    #[serde(skip)]
    pub mtime_error: Option<String>,
}

#[derive(Deserialize)]
struct RawScanRecord {
    #[serde(default)]
    size_bytes: u64,
    #[serde(default)]
    file_count: u64,
    #[serde(default)]
    scan_time: Option<String>,
    #[serde(default)]
    directory_mtime: Option<Value>,
}

impl From<RawScanRecord> for ScanRecord {
    fn from(raw: RawScanRecord) -> Self {
        let (directory_mtime, mtime_error) = match raw.directory_mtime.as_ref().map(parse_epoch) {
            None => (None, None),
            Some(Ok(mtime)) => (mtime, None),
            Some(Err(e)) => (None, Some(e)),
        };
        Self {
            size_bytes: raw.size_bytes,
            file_count: raw.file_count,
            scan_time: raw.scan_time,
            directory_mtime,
            mtime_error,
        }
    }
}

/// Cleanup-candidate report written by the external clean tool to
/// `<candidate>/.freight/clean.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    #[serde(default)]
    pub bytes_cleaned: u64,
    #[serde(default)]
    pub patterns: Vec<CleanPattern>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanPattern {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub bytes_saved: u64,
}

impl CleanRecord {
    /// Patterns that would actually free space.
    pub fn problem_directories(&self) -> impl Iterator<Item = &CleanPattern> {
        self.patterns.iter().filter(|p| p.bytes_saved > 0)
    }

    pub fn problem_bytes(&self) -> u64 {
        self.problem_directories().map(|p| p.bytes_saved).sum()
    }
}

/// The scan tool has emitted the mtime both as a JSON number and as a string.
fn parse_epoch(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(Some)
            .ok_or_else(|| format!("invalid directory_mtime {}", n)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .or_else(|_| trimmed.parse::<f64>().map(|f| f as i64))
                .map(Some)
                .map_err(|_| format!("invalid directory_mtime '{}'", s))
        }
        other => Err(format!("invalid directory_mtime {}", other)),
    }
}

//! Pipeline error taxonomy
//!
//! Every variant carries enough context (target date, stage) to be
//! actionable from the log line alone. An empty upstream response is not
//! an error - see `IngestOutcome::NoData`.

use super::fiscal_api::FetchError;
use chrono::NaiveDate;

#[derive(Debug)]
pub enum PipelineError {
    /// Network/HTTP failure or timeout talking to the upstream source.
    UpstreamFetch {
        start: NaiveDate,
        end: NaiveDate,
        source: FetchError,
    },
    /// Database unreachable or a query failed.
    Persistence {
        stage: &'static str,
        date: Option<NaiveDate>,
        source: rusqlite::Error,
    },
    /// Schema directory missing or unreadable.
    SchemaDir(String),
    /// Reading a schema file failed.
    SchemaIo(std::io::Error),
    /// Writing the side-channel raw-row snapshot failed.
    SideChannel {
        date: NaiveDate,
        source: std::io::Error,
    },
    /// Serializing the raw payload failed.
    Encode(serde_json::Error),
    /// Year parameter outside the supported bound.
    InvalidYear(i32),
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Encode(err)
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::UpstreamFetch { start, end, source } => {
                write!(f, "Upstream fetch failed for {}..{}: {}", start, end, source)
            }
            PipelineError::Persistence { stage, date, source } => match date {
                Some(date) => write!(f, "Persistence error during {} for {}: {}", stage, date, source),
                None => write!(f, "Persistence error during {}: {}", stage, source),
            },
            PipelineError::SchemaDir(dir) => write!(f, "Schema directory not found: {}", dir),
            PipelineError::SchemaIo(e) => write!(f, "Failed to read schema file: {}", e),
            PipelineError::SideChannel { date, source } => {
                write!(f, "Failed to write raw-row snapshot for {}: {}", date, source)
            }
            PipelineError::Encode(e) => write!(f, "Failed to encode raw payload: {}", e),
            PipelineError::InvalidYear(year) => write!(f, "Year out of range: {}", year),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::UpstreamFetch { source, .. } => Some(source),
            PipelineError::Persistence { source, .. } => Some(source),
            PipelineError::SchemaIo(e) => Some(e),
            PipelineError::SideChannel { source, .. } => Some(source),
            PipelineError::Encode(e) => Some(e),
            PipelineError::SchemaDir(_) | PipelineError::InvalidYear(_) => None,
        }
    }
}

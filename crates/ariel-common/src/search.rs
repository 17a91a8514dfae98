//! Ariel search resources.
//!
//! These mirror the JSON documents returned by the `searches` endpoints. The
//! client itself never parses responses; callers use these types when they
//! need to look inside one.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of an Ariel search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum SearchStatus {
    /// Queued, not yet running.
    Wait,
    /// Running.
    Execute,
    /// Results are being sorted.
    Sorting,
    /// Finished; results can be fetched.
    Completed,
    /// Cancelled by a user or an update request.
    Canceled,
    /// Failed. See the search's `error_messages`.
    Error,
}

impl SearchStatus {
    /// Whether the search will not change state any more.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled | Self::Error)
    }
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wait => write!(f, "WAIT"),
            Self::Execute => write!(f, "EXECUTE"),
            Self::Sorting => write!(f, "SORTING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Canceled => write!(f, "CANCELED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for SearchStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "WAIT" => Ok(Self::Wait),
            "EXECUTE" => Ok(Self::Execute),
            "SORTING" => Ok(Self::Sorting),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED" | "CANCELLED" => Ok(Self::Canceled),
            "ERROR" => Ok(Self::Error),
            _ => anyhow::bail!("Unknown search status: {s}"),
        }
    }
}

/// A message attached to a search, usually explaining a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMessage {
    /// Vendor error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Human-readable text.
    #[serde(default)]
    pub description: Option<String>,
    /// Severity such as `ERROR` or `WARN`.
    #[serde(default)]
    pub severity: Option<String>,
}

/// State of a submitted search as returned by `GET api/ariel/searches/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Search {
    /// Identifier used in every follow-up request.
    pub search_id: String,
    /// Current lifecycle state.
    pub status: SearchStatus,
    /// Completion percentage.
    #[serde(default)]
    pub progress: u32,
    /// Number of records found so far.
    #[serde(default)]
    pub record_count: u64,
    /// Whether the search has finished.
    #[serde(default)]
    pub completed: bool,
    /// Whether results are kept after the search expires.
    #[serde(default)]
    pub save_results: bool,
    /// Failure details, if any.
    #[serde(default)]
    pub error_messages: Vec<SearchMessage>,
    /// Fields not modelled above.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Search {
    /// Whether the search has reached a final state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}

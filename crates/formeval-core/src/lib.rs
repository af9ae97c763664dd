use std::path::PathBuf;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub mod batch;
pub mod classify;
pub mod compare;
pub mod config_file;
pub mod path;
pub mod similarity;
pub mod summary;

// Re-export for convenience
pub use batch::{BatchOutcome, BatchStats, EvalJob, discover_pairs, evaluate_batch, load_document};
pub use classify::{Lookup, ValueKind, classify};
pub use compare::{compare, compare_serializable};
pub use path::{FieldPath, Segment};
pub use similarity::{PARTIAL_MATCH_THRESHOLD, SequenceMatcher, similarity_ratio};
pub use summary::SummaryMetrics;

/// Marker written in place of an actual value that does not exist at all.
pub const MISSING_MARKER: &str = "MISSING";

#[derive(Error, Debug)]
pub enum EvalError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("unsupported value kind: {0}")]
    UnsupportedValue(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// The blocking task running a comparison panicked or was cancelled.
    #[error("evaluation task failed: {0}")]
    Task(String),
}

/// Outcome of scoring one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    ExactMatch,
    PartialMatch,
    Mismatch,
    Missing,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::ExactMatch,
        Status::PartialMatch,
        Status::Mismatch,
        Status::Missing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::ExactMatch => "exact_match",
            Status::PartialMatch => "partial_match",
            Status::Mismatch => "mismatch",
            Status::Missing => "missing",
        }
    }
}

/// The extracted value a field was scored against.
///
/// `Absent` means the key (or one of its ancestors) does not exist in the
/// extracted document, which is not the same as an explicit `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum ActualValue {
    Present(Value),
    Absent,
}

impl ActualValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ActualValue::Present(v) => Some(v),
            ActualValue::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ActualValue::Absent)
    }
}

impl Serialize for ActualValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActualValue::Present(v) => v.serialize(serializer),
            ActualValue::Absent => serializer.serialize_str(MISSING_MARKER),
        }
    }
}

/// Verdict for a single field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldResult {
    #[serde(skip)]
    pub path: FieldPath,
    pub expected: Value,
    pub actual: ActualValue,
    pub status: Status,
}

/// Static description of the scoring rules, emitted with every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EvaluationMethod {
    pub exact_match: &'static str,
    pub partial_match: &'static str,
    pub mismatch: &'static str,
}

pub const EVALUATION_METHOD: EvaluationMethod = EvaluationMethod {
    exact_match: "Direct equality comparison",
    partial_match: "String similarity ratio >= 0.8 using SequenceMatcher",
    mismatch: "String similarity ratio < 0.8 or type mismatch",
};

/// Field results keyed by rendered path, in depth-first order of the
/// expected document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailedResults(pub Vec<FieldResult>);

impl Serialize for DetailedResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in &self.0 {
            map.serialize_entry(&result.path, result)?;
        }
        map.end()
    }
}

/// Result of comparing one expected document with one extracted document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub summary_metrics: SummaryMetrics,
    pub evaluation_method: EvaluationMethod,
    pub detailed_results: DetailedResults,
}

impl Report {
    pub fn from_results(results: Vec<FieldResult>) -> Self {
        let summary_metrics = SummaryMetrics::from_results(&results);
        Self {
            summary_metrics,
            evaluation_method: EVALUATION_METHOD,
            detailed_results: DetailedResults(results),
        }
    }

    pub fn results(&self) -> &[FieldResult] {
        &self.detailed_results.0
    }

    /// Look up the verdict for a rendered path such as `donor_details.surname`.
    pub fn field(&self, path: &str) -> Option<&FieldResult> {
        self.results().iter().find(|r| r.path.to_string() == path)
    }

    /// All results with the given status, in report order.
    pub fn iter_status(&self, status: Status) -> impl Iterator<Item = &FieldResult> {
        self.results().iter().filter(move |r| r.status == status)
    }

    /// The report as a JSON value in wire format.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// The report as pretty-printed JSON with 2-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Progress events emitted during batch evaluation.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Evaluating {
        index: usize,
        total: usize,
        name: String,
    },
    Completed {
        index: usize,
        total: usize,
        name: String,
        summary: SummaryMetrics,
    },
    Failed {
        index: usize,
        total: usize,
        name: String,
        message: String,
    },
}

/// Configuration for batch evaluation.
#[derive(Debug, Clone)]
pub struct Config {
    pub num_workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { num_workers: 4 }
    }
}

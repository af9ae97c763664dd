//! Batch evaluation over a directory of document pairs.
//!
//! A pair is `<stem>.expected.json` plus `<stem>.actual.json` in the same
//! directory. Jobs are fanned out to a fixed set of worker tasks over an
//! async channel; each comparison runs on the blocking pool since it is pure
//! CPU work. Results come back through oneshot channels and are returned in
//! job order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::{Config, EvalError, ProgressEvent, Report, SummaryMetrics, compare};

const EXPECTED_SUFFIX: &str = ".expected.json";
const ACTUAL_SUFFIX: &str = ".actual.json";

/// One expected/actual document pair to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalJob {
    pub name: String,
    pub expected_path: PathBuf,
    pub actual_path: PathBuf,
}

impl EvalJob {
    pub fn new(
        name: impl Into<String>,
        expected_path: impl Into<PathBuf>,
        actual_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            expected_path: expected_path.into(),
            actual_path: actual_path.into(),
        }
    }

    /// Load both documents and compare them.
    pub fn run(&self) -> Result<Report, EvalError> {
        let expected = load_document(&self.expected_path)?;
        let actual = load_document(&self.actual_path)?;
        Ok(compare(&expected, &actual))
    }
}

/// Result of one batch job.
#[derive(Debug)]
pub struct BatchOutcome {
    pub name: String,
    pub result: Result<Report, EvalError>,
}

/// Totals across a finished batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub evaluated: usize,
    pub failed: usize,
    /// Field counts pooled over every successful job.
    pub summary: SummaryMetrics,
}

impl BatchStats {
    pub fn from_outcomes(outcomes: &[BatchOutcome]) -> Self {
        outcomes
            .iter()
            .fold(BatchStats::default(), |mut stats, outcome| {
                match &outcome.result {
                    Ok(report) => {
                        stats.evaluated += 1;
                        stats.summary = stats.summary.merge(&report.summary_metrics);
                    }
                    Err(_) => stats.failed += 1,
                }
                stats
            })
    }
}

/// Read and parse a JSON document.
pub fn load_document(path: &Path) -> Result<Value, EvalError> {
    let text = std::fs::read_to_string(path).map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| EvalError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Find every `<stem>.expected.json` that has a matching `<stem>.actual.json`
/// in `dir`, sorted by stem. Unpaired files are skipped.
pub fn discover_pairs(dir: &Path) -> Result<Vec<EvalJob>, EvalError> {
    let io_err = |source| EvalError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut expected_stems: HashSet<String> = HashSet::new();
    let mut actual_stems: HashSet<String> = HashSet::new();

    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(stem) = name.strip_suffix(EXPECTED_SUFFIX) {
            expected_stems.insert(stem.to_string());
        } else if let Some(stem) = name.strip_suffix(ACTUAL_SUFFIX) {
            actual_stems.insert(stem.to_string());
        }
    }

    for stem in expected_stems.symmetric_difference(&actual_stems) {
        tracing::warn!(stem, "skipping unpaired document");
    }

    let mut jobs: Vec<EvalJob> = expected_stems
        .intersection(&actual_stems)
        .filter(|stem| !stem.is_empty())
        .map(|stem| {
            EvalJob::new(
                stem.clone(),
                dir.join(format!("{stem}{EXPECTED_SUFFIX}")),
                dir.join(format!("{stem}{ACTUAL_SUFFIX}")),
            )
        })
        .collect();

    jobs.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(dir = %dir.display(), pairs = jobs.len(), "discovered document pairs");
    Ok(jobs)
}

struct WorkItem {
    job: EvalJob,
    index: usize,
    total: usize,
    result_tx: oneshot::Sender<BatchOutcome>,
}

/// Evaluate every job with `config.num_workers` concurrent workers.
///
/// Progress events are emitted via the callback. Once `cancel` fires, no
/// further jobs are started and unstarted jobs are left out of the result.
/// A failing job does not stop the batch; its error is carried in the
/// outcome.
pub async fn evaluate_batch(
    jobs: Vec<EvalJob>,
    config: Config,
    progress: impl Fn(ProgressEvent) + Send + Sync + 'static,
    cancel: CancellationToken,
) -> Vec<BatchOutcome> {
    let total = jobs.len();
    if total == 0 {
        return vec![];
    }

    let num_workers = config.num_workers.max(1).min(total);
    let progress: Arc<dyn Fn(ProgressEvent) + Send + Sync> = Arc::new(progress);
    let (job_tx, job_rx) = async_channel::unbounded::<WorkItem>();

    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        handles.push(tokio::spawn(worker_loop(
            job_rx.clone(),
            progress.clone(),
            cancel.clone(),
        )));
    }
    drop(job_rx);

    let mut receivers = Vec::with_capacity(total);
    for (index, job) in jobs.into_iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let (result_tx, result_rx) = oneshot::channel();
        let item = WorkItem {
            job,
            index,
            total,
            result_tx,
        };
        if job_tx.send(item).await.is_err() {
            break;
        }
        receivers.push(result_rx);
    }
    job_tx.close();

    let mut outcomes = Vec::with_capacity(receivers.len());
    for rx in receivers {
        if let Ok(outcome) = rx.await {
            outcomes.push(outcome);
        }
    }

    for h in handles {
        if let Err(e) = h.await {
            tracing::error!(error = %e, "batch worker failed");
        }
    }

    outcomes
}

async fn worker_loop(
    job_rx: async_channel::Receiver<WorkItem>,
    progress: Arc<dyn Fn(ProgressEvent) + Send + Sync>,
    cancel: CancellationToken,
) {
    while let Ok(item) = job_rx.recv().await {
        if cancel.is_cancelled() {
            break;
        }

        let WorkItem {
            job,
            index,
            total,
            result_tx,
        } = item;
        let name = job.name.clone();

        progress(ProgressEvent::Evaluating {
            index,
            total,
            name: name.clone(),
        });

        let result = flatten_join(tokio::task::spawn_blocking(move || job.run()).await);

        match &result {
            Ok(report) => progress(ProgressEvent::Completed {
                index,
                total,
                name: name.clone(),
                summary: report.summary_metrics.clone(),
            }),
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "evaluation failed");
                progress(ProgressEvent::Failed {
                    index,
                    total,
                    name: name.clone(),
                    message: e.to_string(),
                });
            }
        }

        let _ = result_tx.send(BatchOutcome { name, result });
    }
}

fn flatten_join(
    joined: Result<Result<Report, EvalError>, tokio::task::JoinError>,
) -> Result<Report, EvalError> {
    joined.unwrap_or_else(|e| Err(EvalError::Task(e.to_string())))
}

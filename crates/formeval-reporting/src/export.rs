use std::path::Path;

use formeval_core::{
    ActualValue, BatchOutcome, BatchStats, MISSING_MARKER, Report, Status, SummaryMetrics,
};
use serde_json::{Value, json};

use crate::{ExportError, ExportFormat};

/// Render a single report in the given format.
pub fn export_report(report: &Report, format: ExportFormat) -> Result<String, ExportError> {
    Ok(match format {
        ExportFormat::Json => {
            let mut out = report.to_json_pretty()?;
            out.push('\n');
            out
        }
        ExportFormat::Text => export_text(report),
        ExportFormat::Markdown => export_markdown(report),
        ExportFormat::Csv => export_csv(report),
    })
}

/// Render the per-document summaries of a batch plus the pooled total.
pub fn export_batch(outcomes: &[BatchOutcome], format: ExportFormat) -> Result<String, ExportError> {
    let stats = BatchStats::from_outcomes(outcomes);
    Ok(match format {
        ExportFormat::Json => {
            let mut out = serde_json::to_string_pretty(&batch_json(outcomes, &stats))?;
            out.push('\n');
            out
        }
        ExportFormat::Text => batch_text(outcomes, &stats),
        ExportFormat::Markdown => batch_markdown(outcomes, &stats),
        ExportFormat::Csv => batch_csv(outcomes, &stats),
    })
}

/// Render `report` and write it to `path`, creating parent directories.
pub fn write_report(report: &Report, format: ExportFormat, path: &Path) -> Result<(), ExportError> {
    let content = export_report(report, format)?;
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, content).map_err(io_err)?;
    tracing::debug!(path = %path.display(), %format, "report written");
    Ok(())
}

fn status_label(s: Status) -> &'static str {
    match s {
        Status::ExactMatch => "EXACT",
        Status::PartialMatch => "PARTIAL",
        Status::Mismatch => "MISMATCH",
        Status::Missing => "MISSING",
    }
}

/// Compact single-line rendering of a value; strings keep their quotes.
fn value_str(v: &Value) -> String {
    v.to_string()
}

fn actual_str(a: &ActualValue) -> String {
    match a {
        ActualValue::Present(v) => value_str(v),
        ActualValue::Absent => MISSING_MARKER.to_string(),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "(root)" } else { path }
}

fn summary_line(s: &SummaryMetrics) -> String {
    format!(
        "{} fields | {} exact | {} partial | {} mismatch | {} missing | {:.2}% accuracy",
        s.total(),
        s.exact_matches,
        s.partial_matches,
        s.mismatches,
        s.missing_fields,
        s.total_accuracy,
    )
}

// ── Single report ───────────────────────────────────────────────────────

fn export_text(report: &Report) -> String {
    let s = &report.summary_metrics;
    let mut out = String::from("Form Evaluation Report\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out.push_str(&format!("  {}\n", summary_line(s)));
    out.push_str(&format!(
        "  exact {:.2}% | partial {:.2}%\n\n",
        s.exact_match_percentage, s.partial_match_percentage
    ));

    for r in report.results() {
        let path = r.path.to_string();
        out.push_str(&format!(
            "  [{:<8}] {}\n",
            status_label(r.status),
            display_path(&path)
        ));
        if r.status != Status::ExactMatch {
            out.push_str(&format!("       expected: {}\n", value_str(&r.expected)));
            out.push_str(&format!("       actual:   {}\n", actual_str(&r.actual)));
        }
    }
    out
}

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn md_summary_table(out: &mut String, s: &SummaryMetrics) {
    out.push_str("| Metric | Value |\n|---|---|\n");
    out.push_str(&format!("| Exact matches | {} |\n", s.exact_matches));
    out.push_str(&format!("| Partial matches | {} |\n", s.partial_matches));
    out.push_str(&format!("| Mismatches | {} |\n", s.mismatches));
    out.push_str(&format!("| Missing fields | {} |\n", s.missing_fields));
    out.push_str(&format!("| Exact match % | {:.2} |\n", s.exact_match_percentage));
    out.push_str(&format!("| Partial match % | {:.2} |\n", s.partial_match_percentage));
    out.push_str(&format!("| **Total accuracy %** | **{:.2}** |\n\n", s.total_accuracy));
}

fn export_markdown(report: &Report) -> String {
    let mut out = String::from("# Form Evaluation Report\n\n## Summary\n\n");
    md_summary_table(&mut out, &report.summary_metrics);

    out.push_str("## Fields\n\n| Field | Status | Expected | Actual |\n|---|---|---|---|\n");
    for r in report.results() {
        let path = r.path.to_string();
        out.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            display_path(&path),
            r.status.as_str(),
            md_escape(&value_str(&r.expected)),
            md_escape(&actual_str(&r.actual)),
        ));
    }
    out
}

fn csv_escape(s: &str) -> String {
    if s.contains('"') || s.contains(',') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// CSV cells hold raw string values; other kinds use their JSON text.
fn csv_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn export_csv(report: &Report) -> String {
    let mut out = String::from("path,status,expected,actual\n");
    for r in report.results() {
        let actual = match &r.actual {
            ActualValue::Present(v) => csv_value(v),
            ActualValue::Absent => MISSING_MARKER.to_string(),
        };
        out.push_str(&format!(
            "{},{},{},{}\n",
            csv_escape(&r.path.to_string()),
            r.status.as_str(),
            csv_escape(&csv_value(&r.expected)),
            csv_escape(&actual),
        ));
    }
    out
}

// ── Batch ───────────────────────────────────────────────────────────────

fn batch_json(outcomes: &[BatchOutcome], stats: &BatchStats) -> Value {
    let documents: Vec<Value> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(report) => json!({"name": o.name, "summary_metrics": report.summary_metrics}),
            Err(e) => json!({"name": o.name, "error": e.to_string()}),
        })
        .collect();
    json!({
        "documents": documents,
        "evaluated": stats.evaluated,
        "failed": stats.failed,
        "overall": stats.summary,
    })
}

fn batch_text(outcomes: &[BatchOutcome], stats: &BatchStats) -> String {
    let mut out = String::from("Form Evaluation Batch\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    for o in outcomes {
        match &o.result {
            Ok(report) => out.push_str(&format!(
                "  {}: {}\n",
                o.name,
                summary_line(&report.summary_metrics)
            )),
            Err(e) => out.push_str(&format!("  {}: FAILED ({})\n", o.name, e)),
        }
    }
    out.push_str(&"-".repeat(60));
    out.push('\n');
    out.push_str(&format!(
        "  {} evaluated, {} failed\n  overall: {}\n",
        stats.evaluated,
        stats.failed,
        summary_line(&stats.summary)
    ));
    out
}

fn batch_markdown(outcomes: &[BatchOutcome], stats: &BatchStats) -> String {
    let mut out = String::from("# Form Evaluation Batch\n\n");
    out.push_str(&format!(
        "**{}** evaluated | **{}** failed\n\n",
        stats.evaluated, stats.failed
    ));
    out.push_str("| Document | Fields | Exact | Partial | Mismatch | Missing | Accuracy % |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for o in outcomes {
        match &o.result {
            Ok(report) => {
                let s = &report.summary_metrics;
                out.push_str(&format!(
                    "| {} | {} | {} | {} | {} | {} | {:.2} |\n",
                    md_escape(&o.name),
                    s.total(),
                    s.exact_matches,
                    s.partial_matches,
                    s.mismatches,
                    s.missing_fields,
                    s.total_accuracy,
                ));
            }
            Err(e) => out.push_str(&format!(
                "| {} | failed: {} | | | | | |\n",
                md_escape(&o.name),
                md_escape(&e.to_string())
            )),
        }
    }
    out.push_str("\n## Overall\n\n");
    md_summary_table(&mut out, &stats.summary);
    out
}

fn batch_csv(outcomes: &[BatchOutcome], stats: &BatchStats) -> String {
    let mut out = String::from(
        "document,exact_matches,partial_matches,mismatches,missing_fields,total_accuracy,error\n",
    );
    let row = |name: &str, s: &SummaryMetrics| {
        format!(
            "{},{},{},{},{},{:.2},\n",
            csv_escape(name),
            s.exact_matches,
            s.partial_matches,
            s.mismatches,
            s.missing_fields,
            s.total_accuracy,
        )
    };
    for o in outcomes {
        match &o.result {
            Ok(report) => out.push_str(&row(&o.name, &report.summary_metrics)),
            Err(e) => out.push_str(&format!(
                "{},,,,,,{}\n",
                csv_escape(&o.name),
                csv_escape(&e.to_string())
            )),
        }
    }
    out.push_str(&row("(overall)", &stats.summary));
    out
}

use std::io::Write;

use formeval_core::{BatchOutcome, BatchStats, ProgressEvent, Report, Status, SummaryMetrics};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn accuracy(pct: f64, color: ColorMode) -> String {
    let text = format!("{pct:.2}%");
    if !color.enabled() {
        return text;
    }
    if pct >= 90.0 {
        text.green().bold().to_string()
    } else if pct >= 70.0 {
        text.yellow().bold().to_string()
    } else {
        text.red().bold().to_string()
    }
}

fn status_label(status: Status, color: ColorMode) -> String {
    paint_status(status, status.as_str(), color)
}

/// Color `text` by `status`. Pad before painting: escape bytes count
/// toward format widths.
fn paint_status(status: Status, text: &str, color: ColorMode) -> String {
    if !color.enabled() {
        return text.to_string();
    }
    match status {
        Status::ExactMatch => text.green().to_string(),
        Status::PartialMatch => text.yellow().to_string(),
        Status::Mismatch => text.red().to_string(),
        Status::Missing => text.magenta().to_string(),
    }
}

/// Print the counts block for one report or a pooled batch.
pub fn print_summary(
    w: &mut dyn Write,
    title: &str,
    s: &SummaryMetrics,
    color: ColorMode,
) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{sep}")?;
        writeln!(w, "{title}")?;
        writeln!(w, "{sep}")?;
    }
    writeln!(w, "  Fields scored:   {}", s.total())?;
    for status in Status::ALL {
        let label = format!("{:<16}", format!("{}:", status.as_str()));
        writeln!(
            w,
            "  {} {}",
            paint_status(status, &label, color),
            s.count(status)
        )?;
    }
    writeln!(
        w,
        "  Exact / partial: {:.2}% / {:.2}%",
        s.exact_match_percentage, s.partial_match_percentage
    )?;
    writeln!(w, "  Total accuracy:  {}", accuracy(s.total_accuracy, color))?;
    Ok(())
}

/// List every field that did not match exactly.
pub fn print_problems(w: &mut dyn Write, report: &Report, color: ColorMode) -> std::io::Result<()> {
    let problems: Vec<_> = report
        .results()
        .iter()
        .filter(|r| r.status != Status::ExactMatch)
        .collect();
    if problems.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    for r in problems {
        let path = r.path.to_string();
        let path = if path.is_empty() { "(root)" } else { path.as_str() };
        let actual = r
            .actual
            .as_value()
            .map_or_else(|| formeval_core::MISSING_MARKER.to_string(), |v| v.to_string());
        if color.enabled() {
            writeln!(
                w,
                "  {} {}: expected {} got {}",
                status_label(r.status, color),
                path.bold(),
                r.expected.cyan(),
                actual.dimmed()
            )?;
        } else {
            writeln!(
                w,
                "  {} {}: expected {} got {}",
                r.status.as_str(),
                path,
                r.expected,
                actual
            )?;
        }
    }
    Ok(())
}

/// One line per document plus the pooled totals.
pub fn print_batch_summary(
    w: &mut dyn Write,
    outcomes: &[BatchOutcome],
    stats: &BatchStats,
    color: ColorMode,
) -> std::io::Result<()> {
    for o in outcomes {
        match &o.result {
            Ok(report) => writeln!(
                w,
                "  {:<32} {:>4} fields  {}",
                o.name,
                report.summary_metrics.total(),
                accuracy(report.summary_metrics.total_accuracy, color)
            )?,
            Err(e) => {
                if color.enabled() {
                    writeln!(w, "  {:<32} {} {}", o.name, "FAILED".red().bold(), e)?;
                } else {
                    writeln!(w, "  {:<32} FAILED {}", o.name, e)?;
                }
            }
        }
    }
    writeln!(w)?;
    let title = format!(
        "Overall ({} evaluated, {} failed)",
        stats.evaluated, stats.failed
    );
    print_summary(w, &title, &stats.summary, color)
}

/// Message for the progress bar line.
pub fn progress_message(event: &ProgressEvent) -> String {
    match event {
        ProgressEvent::Evaluating { name, .. } => format!("Evaluating {name}"),
        ProgressEvent::Completed { name, summary, .. } => {
            format!("{name}: {:.2}%", summary.total_accuracy)
        }
        ProgressEvent::Failed { name, message, .. } => format!("{name} failed: {message}"),
    }
}

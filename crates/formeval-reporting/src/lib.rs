//! Rendering of evaluation reports for people and for other tools.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

mod export;

pub use export::{export_batch, export_report, write_report};

/// Output format for a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Text,
    Markdown,
    Csv,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[
            ExportFormat::Json,
            ExportFormat::Text,
            ExportFormat::Markdown,
            ExportFormat::Csv,
        ]
    }

    pub fn label(self) -> &'static str {
        match self {
            ExportFormat::Json => "JSON",
            ExportFormat::Text => "Plain text",
            ExportFormat::Markdown => "Markdown",
            ExportFormat::Csv => "CSV",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "text" | "txt" => Ok(ExportFormat::Text),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Json => "json",
            ExportFormat::Text => "text",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Csv => "csv",
        })
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("unknown export format '{0}' (expected json, text, markdown or csv)")]
    UnknownFormat(String),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::EvalError;

/// Per-directory config file, checked before the platform one.
pub const LOCAL_CONFIG_FILE: &str = ".formeval.toml";

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub evaluation: Option<EvaluationConfig>,
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    pub num_workers: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format name: json, text, markdown or csv.
    pub format: Option<String>,
    pub color: Option<bool>,
    /// Default directory for batch reports.
    pub directory: Option<String>,
}

impl ConfigFile {
    pub fn num_workers(&self) -> Option<usize> {
        self.evaluation.as_ref().and_then(|e| e.num_workers)
    }

    pub fn format(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.format.as_deref())
    }

    pub fn color(&self) -> Option<bool> {
        self.output.as_ref().and_then(|o| o.color)
    }

    pub fn directory(&self) -> Option<&str> {
        self.output.as_ref().and_then(|o| o.directory.as_deref())
    }
}

/// Platform config directory path: `<config_dir>/formeval/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("formeval").join("config.toml"))
}

/// Load config by cascading CWD `.formeval.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(LOCAL_CONFIG_FILE));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
            None
        }
    }
}

/// Parse config text.
pub fn parse(content: &str) -> Result<ConfigFile, EvalError> {
    toml::from_str(content).map_err(|e| EvalError::Config(e.to_string()))
}

/// Render a config as TOML, e.g. for `config show`.
pub fn to_toml(config: &ConfigFile) -> Result<String, EvalError> {
    toml::to_string_pretty(config).map_err(|e| EvalError::Config(e.to_string()))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        evaluation: Some(EvaluationConfig {
            num_workers: overlay.num_workers().or(base.num_workers()),
        }),
        output: Some(OutputConfig {
            format: overlay
                .format()
                .or(base.format())
                .map(str::to_string),
            color: overlay.color().or(base.color()),
            directory: overlay
                .directory()
                .or(base.directory())
                .map(str::to_string),
        }),
    }
}

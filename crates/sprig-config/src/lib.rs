//! Configuration for sprig: recognised annotation tables, source scanning limits and
//! logging.
//!
//! Configuration lives in a TOML file discovered per workspace root (see
//! [`discover_config_path`]). A missing file is not an error; every section has
//! defaults.

use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;

mod diagnostics;
mod validation;

pub use diagnostics::{ConfigDiagnostics, ConfigValidationError, ConfigWarning, ValidationDiagnostics};

/// Environment variable overriding config discovery.
pub const SPRIG_CONFIG_ENV_VAR: &str = "SPRIG_CONFIG_PATH";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SprigConfig {
    /// Which annotations define beans, request beans, qualify or mark a primary bean.
    #[serde(default)]
    pub annotations: AnnotationsConfig,

    /// Source discovery limits.
    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Overrides for the recognised-annotation tables.
///
/// Entries are fully-qualified annotation names. With `extend_defaults = true`
/// (the default) they are added to the built-in Spring/JSR-330 tables; with
/// `false` they replace them, which is how other annotation-driven frameworks
/// are supported.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationsConfig {
    #[serde(default = "default_true")]
    pub extend_defaults: bool,

    #[serde(default)]
    pub bean_definitions: Vec<String>,

    #[serde(default)]
    pub injections: Vec<String>,

    #[serde(default)]
    pub qualifiers: Vec<String>,

    #[serde(default)]
    pub primary: Vec<String>,

    /// Accept an unresolved simple annotation name (no import) when a recognised
    /// annotation has that simple name. Off by default; same-named annotations from
    /// unrelated libraries would be misclassified.
    #[serde(default)]
    pub match_simple_names: bool,
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            extend_defaults: true,
            bean_definitions: Vec::new(),
            injections: Vec::new(),
            qualifiers: Vec::new(),
            primary: Vec::new(),
            match_simple_names: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Directory names skipped while walking a workspace.
    #[serde(default = "ScanConfig::default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,

    /// Java files larger than this are skipped.
    #[serde(default = "ScanConfig::default_max_file_bytes")]
    pub max_file_bytes: u64,
}

impl ScanConfig {
    fn default_exclude_dirs() -> Vec<String> {
        ["target", "build", "out", ".git", "node_modules"]
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    fn default_max_file_bytes() -> u64 {
        2 * 1024 * 1024
    }

    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|dir| dir == name)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude_dirs: Self::default_exclude_dirs(),
            max_file_bytes: Self::default_max_file_bytes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Logging level, or a full `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs in JSON format.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr. When disabled, logs are dropped.
    #[serde(default = "default_true")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            "off" | "none" => "off".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        })
    }

    /// The effective `EnvFilter`: configured directives with `RUST_LOG` merged on top.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        match env_directives {
            Some(env_directives) => {
                let config_directives = Self::normalize_level_directives(&self.level);
                tracing_subscriber::EnvFilter::try_new(format!("{config_directives},{env_directives}"))
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` embeds a source snippet; keep just the message.
        ConfigError::Toml(err.message().to_string())
    }
}

impl SprigConfig {
    /// Load a config file and report unknown keys and semantic problems.
    pub fn load_from_path_with_diagnostics(
        path: impl AsRef<Path>,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str_with_diagnostics(&text)
    }

    pub fn load_from_str_with_diagnostics(
        text: &str,
    ) -> Result<(Self, ConfigDiagnostics), ConfigError> {
        let (config, unknown_keys) =
            diagnostics::deserialize_toml_with_unknown_keys::<SprigConfig>(text)?;

        let mut diagnostics = ConfigDiagnostics {
            unknown_keys,
            ..ConfigDiagnostics::default()
        };
        diagnostics.extend_validation(config.validate());

        Ok((config, diagnostics))
    }
}

fn config_env_lock() -> &'static ReentrantMutex<()> {
    static LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding the lock that serialises reads of [`SPRIG_CONFIG_ENV_VAR`].
///
/// Tests that mutate the variable should hold this lock too.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Find the config file for a workspace root.
///
/// Search order:
/// 1) `SPRIG_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `sprig.toml` in `workspace_root`
/// 3) `.sprig.toml` in `workspace_root`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(SPRIG_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    ["sprig.toml", ".sprig.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the configuration for a workspace root.
///
/// If no config is present, returns [`SprigConfig::default`], `None`, and empty diagnostics.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(SprigConfig, Option<PathBuf>, ConfigDiagnostics), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((SprigConfig::default(), None, ConfigDiagnostics::default()));
    };

    let (config, diagnostics) = SprigConfig::load_from_path_with_diagnostics(&path)?;
    tracing::debug!(target: "sprig.config", path = %path.display(), "loaded config");
    Ok((config, Some(path), diagnostics))
}

static TRACING_INIT: Once = Once::new();

/// Install the global `tracing` subscriber.
///
/// Safe to call multiple times; only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let writer = if config.stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::sink)
        };

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        let layer: Box<dyn tracing_subscriber::Layer<_> + Send + Sync> = if config.json {
            layer.json().boxed()
        } else {
            layer.boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            // Another subscriber (e.g. from a test harness) is already installed.
            tracing::debug!(target: "sprig.config", "global tracing subscriber already set");
        }
    });
}

use std::collections::BTreeMap;

use crate::diagnostics::{ConfigValidationError, ConfigWarning, ValidationDiagnostics};
use crate::{LoggingConfig, SprigConfig};

impl SprigConfig {
    /// Validate semantic invariants, reporting as many problems as possible in one pass.
    #[must_use]
    pub fn validate(&self) -> ValidationDiagnostics {
        let mut out = ValidationDiagnostics::default();
        validate_annotations(self, &mut out);
        validate_scan(self, &mut out);
        validate_logging(self, &mut out);
        out
    }
}

fn validate_annotations(config: &SprigConfig, out: &mut ValidationDiagnostics) {
    let annotations = &config.annotations;
    let tables: [(&'static str, &Vec<String>); 4] = [
        ("bean_definitions", &annotations.bean_definitions),
        ("injections", &annotations.injections),
        ("qualifiers", &annotations.qualifiers),
        ("primary", &annotations.primary),
    ];

    let mut roles: BTreeMap<&str, &'static str> = BTreeMap::new();
    for (table, entries) in tables {
        for (idx, entry) in entries.iter().enumerate() {
            if !entry.contains('.') || entry.starts_with('.') || entry.ends_with('.') {
                out.warnings.push(ConfigWarning::AnnotationNotQualified {
                    toml_path: format!("annotations.{table}[{idx}]"),
                    value: entry.clone(),
                });
            }
            match roles.get(entry.as_str()) {
                Some(&first) if first != table => {
                    out.warnings.push(ConfigWarning::AnnotationRoleConflict {
                        annotation: entry.clone(),
                        first,
                        second: table,
                    });
                }
                Some(_) => {}
                None => {
                    roles.insert(entry.as_str(), table);
                }
            }
        }
    }

    if !annotations.extend_defaults
        && (annotations.bean_definitions.is_empty() || annotations.injections.is_empty())
    {
        out.warnings.push(ConfigWarning::AnnotationTablesEmpty);
    }
}

fn validate_scan(config: &SprigConfig, out: &mut ValidationDiagnostics) {
    if config.scan.max_file_bytes == 0 {
        out.errors.push(ConfigValidationError::InvalidValue {
            toml_path: "scan.max_file_bytes".to_string(),
            message: "must be >= 1".to_string(),
        });
    }
}

fn validate_logging(config: &SprigConfig, out: &mut ValidationDiagnostics) {
    let normalized = LoggingConfig::normalize_level_directives(&config.logging.level);
    if !config.logging.level.trim().is_empty()
        && tracing_subscriber::EnvFilter::try_new(normalized.clone()).is_err()
    {
        out.warnings.push(ConfigWarning::LoggingLevelInvalid {
            value: config.logging.level.clone(),
            normalized,
        });
    }
}

//! Errors raised while layering and checking the pool configuration.

use std::path::PathBuf;

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no pool configuration at {}", .0.display())]
    MissingFile(PathBuf),

    /// `DTNPOOL_ENV` was set explicitly but its overlay file is absent.
    #[error("DTNPOOL_ENV={env} but {} does not exist", path.display())]
    MissingOverlay { env: String, path: PathBuf },

    #[error("cannot read pool configuration: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("rejected pool configuration: {}", violations(.0).join("; "))]
    Invalid(#[source] ValidationErrors),
}

impl ConfigError {
    /// Offending settings as dotted keys, e.g. `workers.threads`.
    pub fn keys(&self) -> Vec<String> {
        match self {
            ConfigError::Invalid(errors) => {
                let mut keys = Vec::new();
                walk(errors, "", &mut |key, _| keys.push(key.to_owned()));
                keys.sort();
                keys
            }
            _ => Vec::new(),
        }
    }
}

/// One `key: reason` line per failed check, sorted by key.
fn violations(errors: &ValidationErrors) -> Vec<String> {
    let mut lines = Vec::new();
    walk(errors, "", &mut |key, reason| lines.push(format!("{key}: {reason}")));
    lines.sort();
    lines
}

fn walk(errors: &ValidationErrors, prefix: &str, visit: &mut dyn FnMut(&str, String)) {
    for (field, kind) in errors.errors() {
        let key = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(failed) => {
                for error in failed {
                    let mut reason = error
                        .message
                        .as_ref()
                        .map_or_else(|| error.code.to_string(), |m| m.to_string());
                    if let Some(value) = error.params.get("value") {
                        reason.push_str(&format!(" (got {value})"));
                    }
                    visit(&key, reason);
                }
            }
            ValidationErrorsKind::Struct(inner) => walk(inner, &key, visit),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    walk(inner, &format!("{key}[{index}]"), visit);
                }
            }
        }
    }
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Invalid(errors)
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::Extract(Box::new(error))
    }
}

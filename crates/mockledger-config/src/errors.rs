use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// One finding about a configuration, addressed by JSON pointer.
///
/// Whether it blocks a run depends on which list of a [`ValidationReport`]
/// holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: String,
    pub path: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            path: path.into(),
            message: message.into(),
            hint: None,
        }
    }

    /// Attach a suggested fix.
    pub fn hint(&mut self, hint: impl Into<String>) -> &mut Self {
        self.hint = Some(hint.into());
        self
    }

    /// Top-level configuration field the path points into.
    pub fn field(&self) -> Option<String> {
        self.path
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.path, self.message, self.code)?;
        match &self.hint {
            Some(hint) => write!(f, "; {hint}"),
            None => Ok(()),
        }
    }
}

/// Blocking errors and advisory warnings for one configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a problem that prevents generation.
    pub fn reject(
        &mut self,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut ValidationIssue {
        self.errors.push(ValidationIssue::new(code, path, message));
        let last = self.errors.len() - 1;
        &mut self.errors[last]
    }

    /// Record a problem that is logged and otherwise ignored.
    pub fn warn(
        &mut self,
        code: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> &mut ValidationIssue {
        self.warnings.push(ValidationIssue::new(code, path, message));
        let last = self.warnings.len() - 1;
        &mut self.warnings[last]
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|issue| issue.code == code)
    }

    /// The warnings of a passing report, or the whole report as an error.
    pub fn into_warnings(self) -> Result<Vec<ValidationIssue>> {
        if self.is_ok() {
            Ok(self.warnings)
        } else {
            Err(ConfigError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.errors.iter().enumerate() {
            if idx > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

/// Configuration errors that abort a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("invalid configuration: {0}")]
    Validation(ValidationReport),
    /// Unknown attribute type, entity kind or item mode name.
    #[error(transparent)]
    Catalog(#[from] mockledger_core::Error),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

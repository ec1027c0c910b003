//! Error types for code generation

use sheet2py_formula::FormulaError;
use thiserror::Error;

/// Result type for generation operations
pub type GenerateResult<T> = std::result::Result<T, GenerationError>;

/// Errors raised while generating a calculation class
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A formula could not be parsed
    #[error("Cannot parse the formula of {name} at {location}: {source}")]
    Parse {
        name: String,
        location: String,
        #[source]
        source: FormulaError,
    },

    /// Discovery kept finding new references past the configured budget
    #[error("Reference discovery did not settle after {limit} references ({pending} still pending)")]
    UnresolvedReferenceCycle { limit: usize, pending: usize },

    /// No section accepts a name
    #[error("No section accepts {name}: {reason}")]
    UnclassifiedName { name: String, reason: String },

    /// The workbook could not answer for a name
    #[error("Workbook error for {name}: {source}")]
    Source {
        name: String,
        #[source]
        source: sheet2py_core::Error,
    },

    /// The configuration is inconsistent
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The configuration file is malformed
    #[error("Invalid configuration file: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    /// Writing the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        GenerationError::Config(msg.into())
    }

    /// Whether the run can still produce output despite this error
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GenerationError::UnclassifiedName { .. })
    }
}

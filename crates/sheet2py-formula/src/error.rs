//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors that can occur while compiling a formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// The text does not match the formula grammar
    #[error("Parse error at offset {position}: {message}")]
    Parse {
        /// Byte offset into the formula payload (after the `=`)
        position: usize,
        message: String,
    },

    /// Formula text without the leading `=`
    #[error("Not a formula: '{0}'")]
    NotAFormula(String),

    /// Several space-separated expressions where one value is needed
    #[error("{count} top-level expressions where one is expected")]
    MultipleExpressions { count: usize },
}

impl FormulaError {
    pub(crate) fn parse(position: usize, message: impl Into<String>) -> Self {
        FormulaError::Parse {
            position,
            message: message.into(),
        }
    }
}

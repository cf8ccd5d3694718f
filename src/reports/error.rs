//! Report subsystem errors.

/// Errors raised by report submission and generation.
///
/// `Validation` is returned synchronously from `submit`; every other variant
/// is recorded on the failed job's `error` field.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("{0}")]
    Validation(String),

    #[error("Formato no soportado: {0}")]
    UnsupportedFormat(String),

    #[error("{0:#}")]
    Generation(#[from] anyhow::Error),

    #[error("report job '{0}' not found")]
    NotFound(String),
}

impl ReportError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ReportError::Validation(_))
    }
}

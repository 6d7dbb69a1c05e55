use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Result alias for errors emitted by the analyzer host.
pub type LintResult<T> = Result<T, PtrLintError>;

/// Structured error type for the host side of the analyzer.
///
/// Rules never produce errors; these cover loading models, reading config
/// and wiring the registry.
#[derive(Debug, Error)]
pub enum PtrLintError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed translation unit: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid model: {0}")]
    Model(String),

    #[error("{0}")]
    Other(String),
}

impl PtrLintError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for PtrLintError {
    fn from(err: AnyhowError) -> Self {
        PtrLintError::other(err.to_string())
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning a model error.
#[macro_export]
macro_rules! model_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::PtrLintError::model(format!($($arg)*)));
    };
}

/// Convenience macro mirroring `anyhow::ensure!` for model validation.
#[macro_export]
macro_rules! model_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::model_bail!($($arg)*);
        }
    };
}

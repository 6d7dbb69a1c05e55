use serde::{Deserialize, Serialize};

/// Severity assigned to a finding after config resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    /// Finding is dropped before it reaches the output.
    Allow,
    #[default]
    Warn,
    Error,
}

impl LintLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintLevel::Allow => "allow",
            LintLevel::Warn => "warning",
            LintLevel::Error => "error",
        }
    }

    /// Whether findings at this level are emitted at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, LintLevel::Allow)
    }

    /// Whether a finding at this level fails the run.
    pub fn is_failure(&self, deny_warnings: bool) -> bool {
        match self {
            LintLevel::Allow => false,
            LintLevel::Warn => deny_warnings,
            LintLevel::Error => true,
        }
    }
}

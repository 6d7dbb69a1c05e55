use crate::ast::BinaryOperator;
use crate::engine::CheckerContext;
use crate::error::{LintResult, PtrLintError};
use crate::level::LintLevel;
use std::collections::{HashMap, HashSet};

// ============================================================================
// Rule Groups
// ============================================================================

/// Classification of checkers by stability level.
///
/// New checkers start in `Preview` and graduate to `Stable` once their false
/// positive rate is understood.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum RuleGroup {
    /// Enabled by default.
    #[default]
    Stable,

    /// Requires `--preview` or `preview = true` in config.
    Preview,
}

impl RuleGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleGroup::Stable => "stable",
            RuleGroup::Preview => "preview",
        }
    }
}

// ============================================================================
// Lint Categories
// ============================================================================

/// High-level categories used to group checkers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LintCategory {
    /// Code that is most likely wrong but may be intentional.
    Suspicious,
}

impl LintCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintCategory::Suspicious => "suspicious",
        }
    }
}

/// Human-facing identity of a family of findings.
///
/// Reports with the same bug type at the same location are one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BugType {
    pub name: &'static str,
    pub category: &'static str,
}

/// Static metadata describing a checker.
#[derive(Debug)]
pub struct LintDescriptor {
    pub name: &'static str,
    pub category: LintCategory,
    pub description: &'static str,
    /// Stability group: Stable or Preview.
    pub group: RuleGroup,
    pub bug_type: BugType,
    /// Longer explanation shown by `explain`.
    pub explanation: &'static str,
}

/// A path-sensitive checker invoked by the engine.
///
/// Checkers are stateless: all per-path facts live in the
/// [`CheckerContext`], so one instance may serve many paths and threads.
pub trait Checker: Send + Sync {
    fn descriptor(&self) -> &'static LintDescriptor;

    /// Whether the checker should be installed for this analysis.
    fn should_register(&self, _settings: &LintSettings) -> bool {
        true
    }

    /// Called for every binary operator after its operands are evaluated
    /// and before the operator itself is.
    fn check_pre_binary(&self, bin: BinaryOperator<'_>, ctx: &mut CheckerContext<'_>);
}

/// Per-checker configuration derived from `ptr-scale-lint.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintSettings {
    levels: HashMap<String, LintLevel>,
}

impl LintSettings {
    #[must_use]
    pub fn with_config_levels(mut self, levels: HashMap<String, LintLevel>) -> Self {
        self.levels.extend(levels);
        self
    }

    #[must_use]
    pub fn disable(mut self, disabled: impl IntoIterator<Item = String>) -> Self {
        for name in disabled {
            self.levels.insert(name, LintLevel::Allow);
        }
        self
    }

    pub fn level_for(&self, lint_name: &str) -> LintLevel {
        self.levels.get(lint_name).copied().unwrap_or_default()
    }
}

/// Every checker shipped with the crate, in registration order.
pub fn builtin_checkers() -> Vec<Box<dyn Checker>> {
    crate::rules::all()
}

pub fn all_known_lints() -> HashSet<&'static str> {
    builtin_checkers()
        .iter()
        .map(|c| c.descriptor().name)
        .collect()
}

pub fn find_descriptor(name: &str) -> Option<&'static LintDescriptor> {
    builtin_checkers()
        .into_iter()
        .map(|c| c.descriptor())
        .find(|d| d.name == name)
}

/// The active checker set for one analysis run.
pub struct CheckerRegistry {
    checkers: Vec<Box<dyn Checker>>,
}

impl Default for CheckerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            checkers: Vec::new(),
        }
    }

    /// Install a checker once. Returns `false` if it declined registration
    /// or a checker with the same name is already installed.
    pub fn register(&mut self, checker: Box<dyn Checker>, settings: &LintSettings) -> bool {
        let name = checker.descriptor().name;
        if self.checkers.iter().any(|c| c.descriptor().name == name) {
            return false;
        }
        if !checker.should_register(settings) {
            return false;
        }
        self.checkers.push(checker);
        true
    }

    pub fn checkers(&self) -> impl Iterator<Item = &dyn Checker> {
        self.checkers.iter().map(|c| c.as_ref())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &'static LintDescriptor> + '_ {
        self.checkers.iter().map(|c| c.descriptor())
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    #[must_use = "registry should be used to create an engine"]
    pub fn default_checkers() -> Self {
        let settings = LintSettings::default();
        let mut reg = Self::new();
        for checker in builtin_checkers() {
            reg.register(checker, &settings);
        }
        reg
    }

    /// Build the registry from CLI/config selections.
    ///
    /// # Errors
    ///
    /// Returns error if any name in `only`, `skip`, or `disabled` is unknown.
    pub fn default_checkers_filtered(
        only: &[String],
        skip: &[String],
        disabled: &[String],
        preview: bool,
        settings: &LintSettings,
    ) -> LintResult<Self> {
        let known = all_known_lints();
        for n in only.iter().chain(skip.iter()).chain(disabled.iter()) {
            if !known.contains(n.as_str()) {
                return Err(PtrLintError::config(format!("unknown lint: {n}")));
            }
        }

        let only_set: Option<HashSet<&str>> = if only.is_empty() {
            None
        } else {
            Some(only.iter().map(String::as_str).collect())
        };
        let skip_set: HashSet<&str> = skip
            .iter()
            .chain(disabled.iter())
            .map(String::as_str)
            .collect();

        let mut reg = Self::new();
        for checker in builtin_checkers() {
            let descriptor = checker.descriptor();
            if let Some(ref only) = only_set
                && !only.contains(descriptor.name)
            {
                continue;
            }
            if skip_set.contains(descriptor.name) {
                continue;
            }
            if descriptor.group == RuleGroup::Preview && !preview {
                continue;
            }
            reg.register(checker, settings);
        }

        Ok(reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::pointer_arith::BadScaledPointerArithmetic;

    #[test]
    fn default_registry_installs_builtin_checkers_once() {
        let mut reg = CheckerRegistry::default_checkers();
        assert!(
            reg.descriptors()
                .any(|d| d.name == "bad_scaled_pointer_arithmetic")
        );
        let before = reg.descriptors().count();
        assert!(!reg.register(
            Box::new(BadScaledPointerArithmetic),
            &LintSettings::default()
        ));
        assert_eq!(reg.descriptors().count(), before);
    }

    #[test]
    fn unknown_lint_names_are_rejected() {
        let err = CheckerRegistry::default_checkers_filtered(
            &["no_such_lint".to_string()],
            &[],
            &[],
            false,
            &LintSettings::default(),
        )
        .err()
        .expect("unknown lint should fail");
        assert!(err.to_string().contains("unknown lint: no_such_lint"));
    }

    #[test]
    fn skip_removes_checker() {
        let reg = CheckerRegistry::default_checkers_filtered(
            &[],
            &["bad_scaled_pointer_arithmetic".to_string()],
            &[],
            false,
            &LintSettings::default(),
        )
        .expect("registry");
        assert!(reg.is_empty());
    }

    #[test]
    fn settings_resolve_levels() {
        let settings = LintSettings::default()
            .with_config_levels(HashMap::from([(
                "bad_scaled_pointer_arithmetic".to_string(),
                LintLevel::Error,
            )]))
            .disable(["other".to_string()]);
        assert_eq!(
            settings.level_for("bad_scaled_pointer_arithmetic"),
            LintLevel::Error
        );
        assert_eq!(settings.level_for("other"), LintLevel::Allow);
        assert_eq!(settings.level_for("unset"), LintLevel::Warn);
    }
}

//! Path-sensitive detection of badly scaled pointer arithmetic.
//!
//! Function bodies are supplied as a small C-like model (see [`ast`]),
//! evaluated along every feasible path by the [`engine`], and checked by
//! the rules in [`rules`]. Findings come back as [`Diagnostic`]s with
//! their configured level applied.

#![allow(clippy::new_without_default)] // CheckerRegistry::new() is the explicit empty set

pub mod ast;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod level;
pub mod lint;
pub mod rules;
pub mod svalue;
pub mod telemetry;
pub mod types;

use std::path::Path;

use crate::ast::{Function, TranslationUnit};
use crate::diagnostics::Diagnostic;
use crate::engine::{EngineOptions, ExprEngine};
use crate::error::LintResult;
use crate::lint::{CheckerRegistry, LintSettings};

/// Runs the registered checkers over translation units.
pub struct AnalysisEngine {
    registry: CheckerRegistry,
    settings: LintSettings,
    options: EngineOptions,
}

impl AnalysisEngine {
    /// Create a new engine with default lint settings.
    pub fn new(registry: CheckerRegistry) -> Self {
        Self {
            registry,
            settings: LintSettings::default(),
            options: EngineOptions::default(),
        }
    }

    /// Create a new engine with explicit lint settings (e.g. from config).
    pub fn new_with_settings(registry: CheckerRegistry, settings: LintSettings) -> Self {
        Self {
            registry,
            settings,
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn analyze_function(&self, function: &Function, file: Option<&str>) -> Vec<Diagnostic> {
        ExprEngine::new(&self.registry, self.options)
            .analyze_function(function)
            .into_diagnostics(&self.settings, file, &function.name)
    }

    pub fn analyze_unit(&self, unit: &TranslationUnit) -> Vec<Diagnostic> {
        instrument_block!("analyze_unit", {
            let file = unit.file.as_deref();
            let diags: Vec<Diagnostic> = unit
                .functions
                .iter()
                .flat_map(|f| self.analyze_function(f, file))
                .collect();

            #[cfg(feature = "telemetry")]
            tracing::info!(
                file = file.unwrap_or("<stdin>"),
                functions = unit.functions.len(),
                findings = diags.len(),
                "analysis complete"
            );

            diags
        })
    }

    /// Analyze a translation unit given in its JSON form.
    pub fn analyze_json(&self, raw: &str) -> LintResult<Vec<Diagnostic>> {
        let unit = TranslationUnit::from_json_str(raw)?;
        Ok(self.analyze_unit(&unit))
    }

    pub fn analyze_path(&self, path: &Path) -> LintResult<Vec<Diagnostic>> {
        let unit = TranslationUnit::load(path)?;
        Ok(self.analyze_unit(&unit))
    }
}

/// Construct an `AnalysisEngine` with every stable built-in checker.
pub fn create_default_engine() -> AnalysisEngine {
    AnalysisEngine::new(CheckerRegistry::default_checkers())
}

//! Path-sensitive evaluation of function bodies.
//!
//! The engine walks statements in order, forking the program state at
//! branches whose condition it cannot decide. Every binary operator is
//! evaluated operands-first; registered checkers see the node after its
//! operands have values and before the operator itself is applied.

#![allow(clippy::too_many_arguments)]

use crate::ast::{BinaryOperator, Expr, ExprId, ExprKind, Function, Stmt};
use crate::diagnostics::{Diagnostic, Span};
use crate::instrument_block;
use crate::lint::{CheckerRegistry, LintDescriptor, LintSettings};
use crate::svalue::SVal;
use crate::types::TargetInfo;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const DEFAULT_MAX_PATHS: usize = 64;

/// Knobs for one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub target: TargetInfo,
    /// Live paths kept per function; extra forks are dropped.
    pub max_paths: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            target: TargetInfo::default(),
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

/// Facts known on one path: variable bindings and branch assumptions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProgramState {
    store: BTreeMap<String, SVal>,
    assumptions: BTreeMap<String, bool>,
    returned: bool,
}

impl ProgramState {
    pub fn bind(&mut self, name: &str, value: SVal) {
        self.store.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<&SVal> {
        self.store.get(name)
    }

    pub fn has_returned(&self) -> bool {
        self.returned
    }

    /// Truth value of `cond` on this path, if decided.
    pub fn truthiness(&self, cond: &SVal) -> Option<bool> {
        if let Some(v) = cond.as_concrete() {
            return Some(v != 0);
        }
        cond.symbol_name()
            .and_then(|name| self.assumptions.get(name).copied())
    }

    /// State refined by assuming `cond` evaluates to `truth`, or `None`
    /// when that contradicts what is already known.
    pub fn assume(&self, cond: &SVal, truth: bool) -> Option<ProgramState> {
        match self.truthiness(cond) {
            Some(known) if known != truth => None,
            Some(_) => Some(self.clone()),
            None => {
                let mut next = self.clone();
                if let Some(name) = cond.symbol_name() {
                    next.assumptions.insert(name.to_string(), truth);
                }
                Some(next)
            }
        }
    }
}

/// Values of the expressions evaluated so far in the current statement.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    values: HashMap<ExprId, SVal>,
}

impl Environment {
    pub fn bind(&mut self, id: ExprId, value: SVal) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: ExprId) -> Option<&SVal> {
        self.values.get(&id)
    }
}

/// Anchor for a report: program point plus the path it was reached on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorNode {
    pub point: ExprId,
    pub span: Span,
    pub path: u32,
}

#[derive(Debug, Clone)]
pub struct BugReport {
    pub descriptor: &'static LintDescriptor,
    pub message: String,
    pub node: ErrorNode,
}

impl BugReport {
    pub fn new(descriptor: &'static LintDescriptor, message: impl Into<String>, node: ErrorNode) -> Self {
        Self {
            descriptor,
            message: message.into(),
            node,
        }
    }
}

/// Collects reports for one function.
#[derive(Debug, Default)]
pub struct BugReporter {
    claimed: HashSet<(&'static str, ExprId, ProgramState)>,
    reports: Vec<BugReport>,
}

impl BugReporter {
    /// Claim the (checker, point, state) node. Fails if it was claimed before.
    fn claim_node(&mut self, checker: &'static str, point: ExprId, state: &ProgramState) -> bool {
        self.claimed.insert((checker, point, state.clone()))
    }

    pub fn emit(&mut self, report: BugReport) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[BugReport] {
        &self.reports
    }

    /// Collapse equivalent reports and resolve levels.
    ///
    /// Reports with the same checker, message and location from different
    /// paths are one finding; the first path that reached it is kept.
    pub fn into_diagnostics(
        self,
        settings: &LintSettings,
        file: Option<&str>,
        function: &str,
    ) -> Vec<Diagnostic> {
        self.reports
            .into_iter()
            .unique_by(|r| (r.descriptor.name, r.message.clone(), r.node.span))
            .filter_map(|r| {
                let level = settings.level_for(r.descriptor.name);
                level.is_enabled().then(|| Diagnostic {
                    lint: r.descriptor,
                    level,
                    file: file.map(str::to_string),
                    function: Some(function.to_string()),
                    span: r.node.span,
                    message: r.message,
                    path: r.node.path,
                })
            })
            .collect()
    }
}

/// What a checker sees while handling one callback.
pub struct CheckerContext<'a> {
    checker: &'static LintDescriptor,
    point: &'a Expr,
    state: &'a ProgramState,
    env: &'a Environment,
    target: &'a TargetInfo,
    path: u32,
    reporter: &'a mut BugReporter,
}

impl<'a> CheckerContext<'a> {
    pub fn new(
        checker: &'static LintDescriptor,
        point: &'a Expr,
        state: &'a ProgramState,
        env: &'a Environment,
        target: &'a TargetInfo,
        path: u32,
        reporter: &'a mut BugReporter,
    ) -> Self {
        Self {
            checker,
            point,
            state,
            env,
            target,
            path,
            reporter,
        }
    }

    /// Current symbolic value of `expr` on this path.
    pub fn sval(&self, expr: &Expr) -> SVal {
        self.env
            .get(expr.id)
            .cloned()
            .unwrap_or_else(SVal::unknown)
    }

    pub fn target(&self) -> &TargetInfo {
        self.target
    }

    pub fn path(&self) -> u32 {
        self.path
    }

    /// Anchor a non-fatal report at the current point.
    ///
    /// Returns `None` when this checker already holds a node for the same
    /// point and state; the path is then not worth reporting again.
    pub fn generate_non_fatal_error_node(&mut self) -> Option<ErrorNode> {
        if !self
            .reporter
            .claim_node(self.checker.name, self.point.id, self.state)
        {
            return None;
        }
        Some(ErrorNode {
            point: self.point.id,
            span: self.point.span,
            path: self.path,
        })
    }

    pub fn emit_report(&mut self, report: BugReport) {
        self.reporter.emit(report);
    }
}

struct Path {
    id: u32,
    state: ProgramState,
}

struct Run {
    next_path: u32,
    reporter: BugReporter,
}

/// Drives registered checkers over function bodies.
pub struct ExprEngine<'r> {
    registry: &'r CheckerRegistry,
    options: EngineOptions,
}

impl<'r> ExprEngine<'r> {
    pub fn new(registry: &'r CheckerRegistry, options: EngineOptions) -> Self {
        Self { registry, options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Explore every path through `function` and return the raw reports.
    pub fn analyze_function(&self, function: &Function) -> BugReporter {
        instrument_block!("engine::analyze_function", {
            let mut function = function.clone();
            function.prepare();

            let mut run = Run {
                next_path: 1,
                reporter: BugReporter::default(),
            };
            let entry = Path {
                id: 0,
                state: self.initial_state(&function),
            };
            let _finished = self.exec_block(&function.body, vec![entry], &mut run);

            #[cfg(feature = "telemetry")]
            tracing::debug!(
                function = %function.name,
                paths = run.next_path,
                reports = run.reporter.reports().len(),
                "analyzed function"
            );

            run.reporter
        })
    }

    fn initial_state(&self, function: &Function) -> ProgramState {
        let mut state = ProgramState::default();
        for param in &function.params {
            let value = if param.ty.is_any_pointer() {
                SVal::loc(param.name.clone())
            } else if param.ty.is_integer() {
                SVal::symbol(param.name.clone())
            } else {
                SVal::unknown()
            };
            state.bind(&param.name, value);
        }
        state
    }

    fn exec_block(&self, stmts: &[Stmt], mut paths: Vec<Path>, run: &mut Run) -> Vec<Path> {
        for stmt in stmts {
            let mut next = Vec::with_capacity(paths.len());
            for path in paths {
                if path.state.has_returned() {
                    next.push(path);
                } else {
                    next.extend(self.exec_stmt(stmt, path, run));
                }
            }
            paths = self.limit_paths(next);
        }
        paths
    }

    fn limit_paths(&self, mut paths: Vec<Path>) -> Vec<Path> {
        if paths.len() > self.options.max_paths {
            #[cfg(feature = "telemetry")]
            tracing::warn!(
                live = paths.len(),
                max = self.options.max_paths,
                "path limit reached; dropping paths"
            );
            paths.truncate(self.options.max_paths);
        }
        paths
    }

    fn exec_stmt(&self, stmt: &Stmt, mut path: Path, run: &mut Run) -> Vec<Path> {
        match stmt {
            Stmt::Decl { name, init, .. } => {
                let value = match init {
                    Some(init) => self.eval_root(init, &mut path, run),
                    None => SVal::unknown(),
                };
                path.state.bind(name, value);
                vec![path]
            }
            Stmt::Expr(expr) => {
                self.eval_root(expr, &mut path, run);
                vec![path]
            }
            Stmt::Block(inner) => self.exec_block(inner, vec![path], run),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.eval_root(value, &mut path, run);
                }
                path.state.returned = true;
                vec![path]
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval_root(cond, &mut path, run);
                let on_true = path.state.assume(&cond, true);
                let on_false = path.state.assume(&cond, false);

                match (on_true, on_false) {
                    (Some(t), Some(f)) => {
                        let else_id = run.next_path;
                        run.next_path += 1;

                        #[cfg(feature = "telemetry")]
                        tracing::debug!(parent = path.id, child = else_id, "forking on {cond}");

                        let mut out = self.exec_block(
                            then,
                            vec![Path {
                                id: path.id,
                                state: t,
                            }],
                            run,
                        );
                        out.extend(self.exec_block(
                            otherwise,
                            vec![Path {
                                id: else_id,
                                state: f,
                            }],
                            run,
                        ));
                        out
                    }
                    (Some(t), None) => self.exec_block(
                        then,
                        vec![Path {
                            id: path.id,
                            state: t,
                        }],
                        run,
                    ),
                    (None, Some(f)) => self.exec_block(
                        otherwise,
                        vec![Path {
                            id: path.id,
                            state: f,
                        }],
                        run,
                    ),
                    (None, None) => Vec::new(),
                }
            }
        }
    }

    fn eval_root(&self, expr: &Expr, path: &mut Path, run: &mut Run) -> SVal {
        let mut env = Environment::default();
        self.eval(expr, &mut path.state, path.id, &mut env, run)
    }

    fn eval(
        &self,
        expr: &Expr,
        state: &mut ProgramState,
        path: u32,
        env: &mut Environment,
        run: &mut Run,
    ) -> SVal {
        let target = &self.options.target;
        let value = match &expr.kind {
            ExprKind::IntLiteral(v) => SVal::concrete(*v),
            ExprKind::DeclRef(name) => state
                .lookup(name)
                .cloned()
                .unwrap_or_else(|| SVal::symbol(name.clone())),
            ExprKind::SizeOf(ty) => size_value(target.size_in_chars(ty)).from_sizeof(),
            ExprKind::AlignOf(ty) => size_value(target.align_in_chars(ty)),
            ExprKind::OffsetOf { record, member } => {
                size_value(target.offset_of(record, member)).from_sizeof()
            }
            ExprKind::Cast(inner) | ExprKind::Paren(inner) => {
                self.eval(inner, state, path, env, run)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.eval(lhs, state, path, env, run);
                let r = self.eval(rhs, state, path, env, run);

                if let Some(bin) = expr.as_binary() {
                    self.run_pre_binary_checkers(bin, state, path, env, run);
                }

                let result = l.binary(*op, &r);
                if op.is_assignment()
                    && let ExprKind::DeclRef(name) = &lhs.ignore_paren_casts().kind
                {
                    state.bind(name, result.clone());
                }
                result
            }
            ExprKind::Unknown => SVal::unknown(),
        };

        env.bind(expr.id, value.clone());
        value
    }

    fn run_pre_binary_checkers(
        &self,
        bin: BinaryOperator<'_>,
        state: &ProgramState,
        path: u32,
        env: &Environment,
        run: &mut Run,
    ) {
        for checker in self.registry.checkers() {
            let mut ctx = CheckerContext::new(
                checker.descriptor(),
                bin.expr,
                state,
                env,
                &self.options.target,
                path,
                &mut run.reporter,
            );
            checker.check_pre_binary(bin, &mut ctx);
        }
    }
}

fn size_value(bytes: Option<u64>) -> SVal {
    bytes
        .and_then(|n| i64::try_from(n).ok())
        .map_or_else(SVal::unknown, SVal::concrete)
}

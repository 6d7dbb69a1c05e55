//! Typed expression and statement model handed to the engine.
//!
//! Front-ends emit a [`TranslationUnit`] as JSON; tests build one with the
//! constructors below. Either way [`Function::prepare`] runs before analysis
//! to number expressions and fill in types the producer left out.

use crate::diagnostics::Span;
use crate::error::LintResult;
use crate::model_ensure;
use crate::types::{IntKind, QualType, Type};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    LAnd,
    LOr,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Comma,
}

impl BinaryOpKind {
    /// `+` or `-`.
    pub fn is_additive(&self) -> bool {
        matches!(self, BinaryOpKind::Add | BinaryOpKind::Sub)
    }

    pub fn is_compound_assign(&self) -> bool {
        matches!(
            self,
            BinaryOpKind::AddAssign
                | BinaryOpKind::SubAssign
                | BinaryOpKind::MulAssign
                | BinaryOpKind::DivAssign
        )
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self, BinaryOpKind::Assign) || self.is_compound_assign()
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOpKind::Lt
                | BinaryOpKind::Gt
                | BinaryOpKind::Le
                | BinaryOpKind::Ge
                | BinaryOpKind::Eq
                | BinaryOpKind::Ne
        )
    }

    /// The arithmetic operator applied, with compound assignments mapped to
    /// their base operator. `None` for comparisons, logic, `=` and `,`.
    pub fn arithmetic_part(&self) -> Option<BinaryOpKind> {
        use BinaryOpKind as B;
        match self {
            B::Add | B::Sub | B::Mul | B::Div | B::Rem | B::Shl | B::Shr | B::And | B::Or
            | B::Xor => Some(*self),
            B::AddAssign => Some(B::Add),
            B::SubAssign => Some(B::Sub),
            B::MulAssign => Some(B::Mul),
            B::DivAssign => Some(B::Div),
            _ => None,
        }
    }
}

/// Identity of an expression node within one function. `0` is unassigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub id: ExprId,
    pub kind: ExprKind,
    #[serde(default)]
    pub ty: QualType,
    #[serde(default)]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExprKind {
    IntLiteral(i64),
    DeclRef(String),
    SizeOf(Type),
    AlignOf(Type),
    OffsetOf {
        record: Type,
        member: String,
    },
    Binary {
        op: BinaryOpKind,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cast(Box<Expr>),
    Paren(Box<Expr>),
    /// Anything the engine does not model (calls, loads through pointers).
    Unknown,
}

/// Borrowed view of a binary operator node handed to checkers.
#[derive(Debug, Clone, Copy)]
pub struct BinaryOperator<'a> {
    pub expr: &'a Expr,
    pub op: BinaryOpKind,
    pub lhs: &'a Expr,
    pub rhs: &'a Expr,
}

impl Expr {
    pub fn new(kind: ExprKind, ty: impl Into<QualType>) -> Self {
        Self {
            id: ExprId::default(),
            kind,
            ty: ty.into(),
            span: Span::default(),
        }
    }

    pub fn int(value: i64) -> Self {
        Self::new(ExprKind::IntLiteral(value), Type::int())
    }

    pub fn var(name: &str, ty: Type) -> Self {
        Self::new(ExprKind::DeclRef(name.to_string()), ty)
    }

    pub fn size_of(ty: Type) -> Self {
        Self::new(ExprKind::SizeOf(ty), Type::size_t())
    }

    pub fn align_of(ty: Type) -> Self {
        Self::new(ExprKind::AlignOf(ty), Type::size_t())
    }

    pub fn offset_of(record: Type, member: &str) -> Self {
        Self::new(
            ExprKind::OffsetOf {
                record,
                member: member.to_string(),
            },
            Type::size_t(),
        )
    }

    pub fn binary(op: BinaryOpKind, lhs: Expr, rhs: Expr) -> Self {
        let ty = binary_result_type(op, &lhs.ty, &rhs.ty);
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            ty,
        )
    }

    pub fn cast(inner: Expr, ty: Type) -> Self {
        Self::new(ExprKind::Cast(Box::new(inner)), ty)
    }

    pub fn paren(inner: Expr) -> Self {
        let ty = inner.ty.clone();
        Self::new(ExprKind::Paren(Box::new(inner)), ty)
    }

    pub fn unknown(ty: Type) -> Self {
        Self::new(ExprKind::Unknown, ty)
    }

    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Place the expression at `row:column` (1-based).
    #[must_use]
    pub fn at_line(self, row: usize, column: usize) -> Self {
        self.at(Span::on_line(row, column, column + 1))
    }

    /// Skip any parentheses and casts wrapping this expression.
    pub fn ignore_paren_casts(&self) -> &Expr {
        match &self.kind {
            ExprKind::Paren(inner) | ExprKind::Cast(inner) => inner.ignore_paren_casts(),
            _ => self,
        }
    }

    pub fn as_binary(&self) -> Option<BinaryOperator<'_>> {
        match &self.kind {
            ExprKind::Binary { op, lhs, rhs } => Some(BinaryOperator {
                expr: self,
                op: *op,
                lhs,
                rhs,
            }),
            _ => None,
        }
    }
}

/// Static type of `lhs op rhs` under simplified C conversion rules.
pub fn binary_result_type(op: BinaryOpKind, lhs: &QualType, rhs: &QualType) -> QualType {
    use BinaryOpKind as B;
    match op {
        B::Lt | B::Gt | B::Le | B::Ge | B::Eq | B::Ne | B::LAnd | B::LOr => Type::int().into(),
        B::Comma => rhs.clone(),
        _ if op.is_assignment() => lhs.clone(),
        B::Sub if lhs.is_pointer() && rhs.is_pointer() => Type::Int(IntKind::Long).into(),
        B::Add | B::Sub if lhs.is_pointer() => lhs.clone(),
        B::Add if rhs.is_pointer() => rhs.clone(),
        _ if lhs.is_null() => rhs.clone(),
        _ => lhs.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Decl {
        name: String,
        ty: Type,
        #[serde(default)]
        init: Option<Expr>,
    },
    Expr(Expr),
    If {
        cond: Expr,
        #[serde(default)]
        then: Vec<Stmt>,
        #[serde(default, rename = "else")]
        otherwise: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Return(Option<Expr>),
}

impl Stmt {
    pub fn decl(name: &str, ty: Type) -> Self {
        Stmt::Decl {
            name: name.to_string(),
            ty,
            init: None,
        }
    }

    pub fn decl_init(name: &str, ty: Type, init: Expr) -> Self {
        Stmt::Decl {
            name: name.to_string(),
            ty,
            init: Some(init),
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr(expr)
    }

    pub fn if_else(cond: Expr, then: Vec<Stmt>, otherwise: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn param(mut self, name: &str, ty: Type) -> Self {
        self.params.push(Param {
            name: name.to_string(),
            ty,
        });
        self
    }

    #[must_use]
    pub fn stmt(mut self, stmt: Stmt) -> Self {
        self.body.push(stmt);
        self
    }

    /// Number every expression and infer missing types.
    ///
    /// Variable references take the type of the nearest enclosing
    /// declaration; operators take the usual result type of their operands.
    pub fn prepare(&mut self) {
        let mut scope: HashMap<String, QualType> = self
            .params
            .iter()
            .map(|p| (p.name.clone(), QualType::from(p.ty.clone())))
            .collect();
        let mut next_id = 1u32;
        prepare_block(&mut self.body, &mut scope, &mut next_id);
    }
}

fn prepare_block(stmts: &mut [Stmt], scope: &mut HashMap<String, QualType>, next_id: &mut u32) {
    for stmt in stmts {
        match stmt {
            Stmt::Decl { name, ty, init } => {
                if let Some(init) = init {
                    prepare_expr(init, scope, next_id);
                }
                scope.insert(name.clone(), QualType::from(ty.clone()));
            }
            Stmt::Expr(expr) => prepare_expr(expr, scope, next_id),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                prepare_expr(cond, scope, next_id);
                prepare_block(then, &mut scope.clone(), next_id);
                prepare_block(otherwise, &mut scope.clone(), next_id);
            }
            Stmt::Block(inner) => prepare_block(inner, &mut scope.clone(), next_id),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    prepare_expr(value, scope, next_id);
                }
            }
        }
    }
}

fn prepare_expr(expr: &mut Expr, scope: &HashMap<String, QualType>, next_id: &mut u32) {
    expr.id = ExprId(*next_id);
    *next_id += 1;

    let inferred = match &mut expr.kind {
        ExprKind::DeclRef(name) => scope.get(name.as_str()).cloned(),
        ExprKind::Binary { op, lhs, rhs } => {
            prepare_expr(lhs, scope, next_id);
            prepare_expr(rhs, scope, next_id);
            Some(binary_result_type(*op, &lhs.ty, &rhs.ty))
        }
        ExprKind::Paren(inner) => {
            prepare_expr(inner, scope, next_id);
            Some(inner.ty.clone())
        }
        ExprKind::Cast(inner) => {
            prepare_expr(inner, scope, next_id);
            None
        }
        ExprKind::IntLiteral(_) => Some(Type::int().into()),
        ExprKind::SizeOf(_) | ExprKind::AlignOf(_) | ExprKind::OffsetOf { .. } => {
            Some(Type::size_t().into())
        }
        ExprKind::Unknown => None,
    };

    if expr.ty.is_null()
        && let Some(ty) = inferred
    {
        expr.ty = ty;
    }
}

/// A set of function bodies from one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub functions: Vec<Function>,
}

impl TranslationUnit {
    /// Parse and prepare a unit from its JSON form.
    pub fn from_json_str(raw: &str) -> LintResult<Self> {
        let mut unit: TranslationUnit = serde_json::from_str(raw)?;
        unit.validate()?;
        for function in &mut unit.functions {
            function.prepare();
        }
        Ok(unit)
    }

    /// Load a unit from disk, defaulting `file` to the path it came from.
    pub fn load(path: &Path) -> LintResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut unit = Self::from_json_str(&raw)?;
        if unit.file.is_none() {
            unit.file = Some(path.display().to_string());
        }
        Ok(unit)
    }

    fn validate(&self) -> LintResult<()> {
        let mut seen = std::collections::HashSet::new();
        for function in &self.functions {
            model_ensure!(!function.name.is_empty(), "function with an empty name");
            model_ensure!(
                seen.insert(function.name.as_str()),
                "function `{}` is defined more than once",
                function.name
            );
            for param in &function.params {
                model_ensure!(
                    !param.name.is_empty(),
                    "function `{}` has a parameter with an empty name",
                    function.name
                );
            }
        }
        Ok(())
    }
}

#![allow(dead_code)]

use ptr_scale_lint::ast::{BinaryOpKind, Expr, Function, Stmt};
use ptr_scale_lint::create_default_engine;
use ptr_scale_lint::diagnostics::Diagnostic;
use ptr_scale_lint::types::Type;
use std::fs;
use tempfile::TempDir;

pub const LINT: &str = "bad_scaled_pointer_arithmetic";

/// `struct Widget { int a, b, c; }`
pub fn widget() -> Type {
    Type::structure(
        "Widget",
        [("a", Type::int()), ("b", Type::int()), ("c", Type::int())],
    )
}

/// `struct S { char c[8]; }`
pub fn byte_array_struct() -> Type {
    Type::structure("S", [("c", Type::char().array_of(8))])
}

/// A function taking `p` of the given type and evaluating `expr` once.
pub fn single_expr(param_ty: Type, expr: Expr) -> Function {
    Function::new("f").param("p", param_ty).stmt(Stmt::expr(expr))
}

pub fn ptr(ty: &Type) -> Expr {
    Expr::var("p", ty.clone())
}

pub fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::binary(BinaryOpKind::Add, lhs, rhs)
}

pub fn run(function: Function) -> Vec<Diagnostic> {
    create_default_engine().analyze_function(&function, None)
}

pub fn messages(diags: &[Diagnostic]) -> Vec<&str> {
    diags.iter().map(|d| d.message.as_str()).collect()
}

/// Lay out a project directory with an optional config and JSON units.
pub fn create_temp_project(config: Option<&str>, units: &[(&str, &str)]) -> std::io::Result<TempDir> {
    let tmp = tempfile::tempdir()?;
    if let Some(config) = config {
        fs::write(tmp.path().join("ptr-scale-lint.toml"), config)?;
    }

    let src = tmp.path().join("src");
    fs::create_dir_all(&src)?;
    for (name, content) in units {
        fs::write(src.join(name), content)?;
    }

    Ok(tmp)
}

//! End-to-end behaviour of `bad_scaled_pointer_arithmetic`.

mod support;

use ptr_scale_lint::ast::{BinaryOpKind, Expr, Function, Stmt};
use ptr_scale_lint::level::LintLevel;
use ptr_scale_lint::types::{ArraySize, Type};
use support::model_harness::{
    LINT, add, byte_array_struct, messages, ptr, run, single_expr, widget,
};

const LEFT: &str =
    "In pointer arithmetic left argument is calculated from a sizeof or offsetof expression";
const RIGHT: &str =
    "In pointer arithmetic right argument is calculated from a sizeof or offsetof expression";

// ---------------------------------------------------------------------------
// Concrete scenarios
// ---------------------------------------------------------------------------

#[test]
fn byte_array_pointee_is_not_reported() {
    // struct S { char c[8]; }; S *p; (char *)p + sizeof(int)
    let s = byte_array_struct().pointer_to();
    let member = Expr::cast(ptr(&s), Type::char().pointer_to());
    let diags = run(single_expr(s.clone(), add(member, Expr::size_of(Type::int()))));
    assert!(diags.is_empty());

    let one = Type::char().array_of(1).pointer_to();
    let diags = run(single_expr(one.clone(), add(ptr(&one), Expr::size_of(Type::int()))));
    assert!(diags.is_empty());
}

#[test]
fn pointer_to_the_whole_byte_array_struct_is_reported() {
    // sizeof(struct S) is 8: each unit of `p + n` skips a whole S.
    let s = byte_array_struct().pointer_to();
    let diags = run(single_expr(s.clone(), add(ptr(&s), Expr::size_of(Type::int()))));
    assert_eq!(messages(&diags), vec![RIGHT]);
}

#[test]
fn wide_pointee_plus_sizeof_is_reported_on_the_right() {
    let w = widget().pointer_to();
    let diags = run(single_expr(w.clone(), add(ptr(&w), Expr::size_of(Type::int()))));
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].lint.name, LINT);
    assert_eq!(diags[0].message, RIGHT);
    assert_eq!(diags[0].level, LintLevel::Warn);
    assert_eq!(diags[0].lint.bug_type.name, "Badly scaled pointer arithmetic");
    assert_eq!(diags[0].lint.bug_type.category, "Suspicious operation");
}

#[test]
fn literal_offset_is_not_reported() {
    let w = widget().pointer_to();
    let diags = run(single_expr(w.clone(), add(ptr(&w), Expr::int(4))));
    assert!(diags.is_empty());
}

#[test]
fn sizeof_first_is_reported_on_the_left() {
    let w = widget().pointer_to();
    let diags = run(single_expr(w.clone(), add(Expr::size_of(widget()), ptr(&w))));
    assert_eq!(messages(&diags), vec![LEFT]);
}

#[test]
fn compound_assignment_with_offsetof_is_reported() {
    let w = widget().pointer_to();
    let expr = Expr::binary(
        BinaryOpKind::AddAssign,
        ptr(&w),
        Expr::offset_of(widget(), "c"),
    );
    assert_eq!(messages(&run(single_expr(w, expr))), vec![RIGHT]);
}

#[test]
fn opaque_pointee_is_reported() {
    let handle = Type::opaque("Handle").pointer_to();
    let diags = run(single_expr(
        handle.clone(),
        add(ptr(&handle), Expr::size_of(Type::int())),
    ));
    assert_eq!(messages(&diags), vec![RIGHT]);
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn non_additive_operators_never_report() {
    let w = widget().pointer_to();
    for op in [
        BinaryOpKind::Mul,
        BinaryOpKind::Div,
        BinaryOpKind::Shl,
        BinaryOpKind::And,
        BinaryOpKind::Lt,
        BinaryOpKind::Eq,
        BinaryOpKind::LAnd,
        BinaryOpKind::Assign,
        BinaryOpKind::MulAssign,
        BinaryOpKind::DivAssign,
        BinaryOpKind::Comma,
    ] {
        let expr = Expr::binary(op, ptr(&w), Expr::size_of(widget()));
        assert!(run(single_expr(w.clone(), expr)).is_empty(), "{op:?}");
    }
}

#[test]
fn only_mixed_pointer_integer_shapes_report() {
    let w = widget().pointer_to();
    let f = Function::new("f")
        .param("p", w.clone())
        .param("q", w.clone())
        .stmt(Stmt::expr(Expr::binary(
            BinaryOpKind::Sub,
            ptr(&w),
            Expr::var("q", w.clone()),
        )))
        .stmt(Stmt::expr(add(Expr::size_of(widget()), Expr::int(1))))
        .stmt(Stmt::expr(add(
            Expr::size_of(widget()),
            Expr::unknown(Type::Float(ptr_scale_lint::types::FloatKind::Double)),
        )));
    assert!(run(f).is_empty());
}

#[test]
fn byte_sized_pointees_never_report() {
    for pointee in [
        Type::char(),
        Type::Int(ptr_scale_lint::types::IntKind::UChar),
        Type::Int(ptr_scale_lint::types::IntKind::SChar),
        Type::Bool,
        Type::structure("One", [("b", Type::char())]),
    ] {
        let p = pointee.clone().pointer_to();
        let f = Function::new("f")
            .param("p", p.clone())
            .stmt(Stmt::expr(add(ptr(&p), Expr::size_of(widget()))))
            .stmt(Stmt::expr(add(Expr::offset_of(widget(), "b"), ptr(&p))))
            .stmt(Stmt::expr(Expr::binary(
                BinaryOpKind::SubAssign,
                ptr(&p),
                Expr::size_of(Type::int()),
            )));
        assert!(run(f).is_empty(), "{pointee}");
    }
}

#[test]
fn operand_orders_and_compound_forms_are_symmetric() {
    let w = widget().pointer_to();
    let n = || Expr::size_of(Type::int());
    let cases = [
        (add(ptr(&w), n()), RIGHT),
        (add(n(), ptr(&w)), LEFT),
        (Expr::binary(BinaryOpKind::Sub, ptr(&w), n()), RIGHT),
        (Expr::binary(BinaryOpKind::AddAssign, ptr(&w), n()), RIGHT),
        (Expr::binary(BinaryOpKind::SubAssign, ptr(&w), n()), RIGHT),
    ];
    for (expr, expected) in cases {
        let diags = run(single_expr(w.clone(), expr));
        assert_eq!(messages(&diags), vec![expected]);
    }
}

#[test]
fn same_node_on_same_state_reports_once() {
    let w = widget().pointer_to();
    let f = Function::new("f")
        .param("p", w.clone())
        .param("n", Type::int())
        .stmt(Stmt::if_else(Expr::var("n", Type::int()), vec![], vec![]))
        .stmt(Stmt::expr(add(ptr(&w), Expr::size_of(Type::int())).at_line(3, 5)));
    let diags = run(f);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].span.start.row, 3);
}

#[test]
fn size_origin_survives_casts_parens_and_arithmetic() {
    let w = widget().pointer_to();
    let scaled = Expr::binary(
        BinaryOpKind::Mul,
        Expr::var("n", Type::int()),
        Expr::paren(Expr::cast(Expr::size_of(widget()), Type::int())),
    );
    let f = Function::new("f")
        .param("p", w.clone())
        .param("n", Type::int())
        .stmt(Stmt::decl_init("off", Type::size_t(), scaled))
        .stmt(Stmt::expr(add(ptr(&w), Expr::var("off", Type::size_t()))));
    assert_eq!(messages(&run(f)), vec![RIGHT]);
}

#[test]
fn alignof_and_comparisons_are_plain() {
    let w = widget().pointer_to();
    let f = Function::new("f")
        .param("p", w.clone())
        .stmt(Stmt::expr(add(ptr(&w), Expr::align_of(widget()))))
        .stmt(Stmt::expr(add(
            ptr(&w),
            Expr::binary(BinaryOpKind::Gt, Expr::size_of(widget()), Expr::int(4)),
        )));
    assert!(run(f).is_empty());
}

#[test]
fn unsizable_pointees_are_reported() {
    for pointee in [
        Type::Void,
        Type::opaque("Opaque"),
        Type::type_param("T"),
        Type::char().vla_of(),
        Type::char().array_of(4).vla_of(),
        Type::Array {
            element: Box::new(Type::char()),
            size: ArraySize::Incomplete,
        },
        Type::Array {
            element: Box::new(Type::char()),
            size: ArraySize::Dependent,
        },
        Type::Function {
            ret: Box::new(Type::int()),
            params: vec![],
        },
    ] {
        let p = pointee.clone().pointer_to();
        let diags = run(single_expr(p.clone(), add(ptr(&p), Expr::size_of(Type::int()))));
        assert_eq!(messages(&diags), vec![RIGHT], "{pointee}");
    }
}

#[test]
fn objc_object_pointer_operands_are_not_candidates() {
    let obj = Type::ObjCObjectPointer(Box::new(Type::opaque("NSObject")));
    let diags = run(single_expr(obj.clone(), add(ptr(&obj), Expr::size_of(Type::int()))));
    assert!(diags.is_empty());
}

#[test]
fn each_tainted_site_is_reported_separately() {
    let w = widget().pointer_to();
    let f = Function::new("f")
        .param("p", w.clone())
        .stmt(Stmt::expr(add(ptr(&w), Expr::size_of(Type::int())).at_line(2, 3)))
        .stmt(Stmt::expr(add(Expr::size_of(Type::int()), ptr(&w)).at_line(3, 3)));
    let diags = run(f);
    assert_eq!(diags.len(), 2);
    assert_eq!(messages(&diags), vec![RIGHT, LEFT]);
}

#[test]
fn sizeof_of_an_unrepresentable_record_is_still_size_derived() {
    let big = Type::structure(
        "Big",
        [("c", Type::char().array_of(u64::MAX - 1)), ("i", Type::int())],
    );
    let w = widget().pointer_to();
    let diags = run(single_expr(w.clone(), add(ptr(&w), Expr::size_of(big))));
    assert_eq!(messages(&diags), vec![RIGHT]);
}

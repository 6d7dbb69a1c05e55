//! Pointer arithmetic scaled by a byte count.
//!
//! `p + sizeof(T)` advances `p` by `sizeof(T) * sizeof(*p)` bytes. That is
//! only the intended byte offset when `*p` is one byte wide.

use crate::ast::{BinaryOpKind, BinaryOperator, Expr};
use crate::engine::{BugReport, CheckerContext};
use crate::lint::{BugType, Checker, LintCategory, LintDescriptor, RuleGroup};
use crate::svalue::SVal;
use crate::types::{QualType, TargetInfo};

pub static BAD_SCALED_POINTER_ARITHMETIC: LintDescriptor = LintDescriptor {
    name: "bad_scaled_pointer_arithmetic",
    category: LintCategory::Suspicious,
    description: "Pointer offset computed from sizeof/offsetof on a pointer to a type wider than one byte",
    group: RuleGroup::Stable,
    bug_type: BugType {
        name: "Badly scaled pointer arithmetic",
        category: "Suspicious operation",
    },
    explanation: "\
Pointer arithmetic is scaled by the size of the pointee: `p + n` moves `p`
by `n * sizeof(*p)` bytes. Adding a value computed by `sizeof` or
`offsetof` to a pointer whose pointee is wider than one byte usually means
a byte offset was intended, and the result lands `sizeof(*p)` times too far.

    struct Widget *w = ...;
    int *c = (int *)(w + offsetof(struct Widget, c));   /* flagged */
    int *c = (int *)((char *)w + offsetof(struct Widget, c));

Pointers to one-byte types (`char`, `unsigned char`, `char[1]`, ...) are not
flagged. Pointees without a statically known size (`void`, opaque records,
variable length arrays) are never treated as one byte wide.",
};

/// Operand of the pointer expression holding the size-derived value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// A candidate node split into its pointer and integer halves.
#[derive(Debug, Clone, Copy)]
pub struct Operands<'a> {
    pub pointer: &'a Expr,
    pub scalar: &'a Expr,
    pub side: Side,
}

/// Outcome of the decision procedure for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    NotCandidate,
    Safe,
    Reportable(Side),
}

/// Pick out the pointer and the integer operand of `ptr ± n`, `n + ptr`,
/// `ptr += n` and `ptr -= n`. Anything else is not a candidate.
pub fn classify_operands<'a>(bin: &BinaryOperator<'a>) -> Option<Operands<'a>> {
    if !bin.op.is_additive() && !matches!(bin.op, BinaryOpKind::AddAssign | BinaryOpKind::SubAssign)
    {
        return None;
    }

    let (lhs, rhs) = (&bin.lhs.ty, &bin.rhs.ty);
    if lhs.is_pointer() && rhs.is_integer() {
        Some(Operands {
            pointer: bin.lhs,
            scalar: bin.rhs,
            side: Side::Right,
        })
    } else if lhs.is_integer() && rhs.is_pointer() {
        Some(Operands {
            pointer: bin.rhs,
            scalar: bin.lhs,
            side: Side::Left,
        })
    } else {
        None
    }
}

/// Whether each unit of arithmetic on `ty` already moves one byte.
///
/// Any pointee whose size cannot be established answers `false`.
pub fn is_byte_like_pointee(ty: &QualType, target: &TargetInfo) -> bool {
    let Some(ty) = ty.get() else {
        return false;
    };
    if !ty.is_any_pointer() {
        return false;
    }
    let Some(pointee) = ty.pointee() else {
        return false;
    };
    if pointee.is_incomplete()
        || pointee.is_dependent()
        || pointee.is_dependent_sized_array()
        || !pointee.is_constant_size()
    {
        return false;
    }
    target.size_in_chars(pointee) == Some(1)
}

/// Decide what to do with `operands` given the scalar's current value.
pub fn assess(operands: &Operands<'_>, scalar: &SVal, target: &TargetInfo) -> Assessment {
    if !scalar.is_from_sizeof() {
        return Assessment::Safe;
    }
    if is_byte_like_pointee(&operands.pointer.ty, target) {
        return Assessment::Safe;
    }
    Assessment::Reportable(operands.side)
}

pub fn message(side: Side) -> String {
    format!(
        "In pointer arithmetic {} argument is calculated from a sizeof or offsetof expression",
        side.as_str()
    )
}

pub struct BadScaledPointerArithmetic;

impl BadScaledPointerArithmetic {
    fn evaluate(&self, bin: &BinaryOperator<'_>, ctx: &CheckerContext<'_>) -> Assessment {
        let Some(operands) = classify_operands(bin) else {
            return Assessment::NotCandidate;
        };
        let scalar = ctx.sval(operands.scalar);
        assess(&operands, &scalar, ctx.target())
    }
}

impl Checker for BadScaledPointerArithmetic {
    fn descriptor(&self) -> &'static LintDescriptor {
        &BAD_SCALED_POINTER_ARITHMETIC
    }

    fn check_pre_binary(&self, bin: BinaryOperator<'_>, ctx: &mut CheckerContext<'_>) {
        let Assessment::Reportable(side) = self.evaluate(&bin, ctx) else {
            return;
        };
        let Some(node) = ctx.generate_non_fatal_error_node() else {
            return;
        };
        ctx.emit_report(BugReport::new(self.descriptor(), message(side), node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExprId, ExprKind};
    use crate::engine::{BugReporter, Environment, ProgramState};
    use crate::types::{ArraySize, Type};

    fn widget() -> Type {
        Type::structure(
            "Widget",
            [("a", Type::int()), ("b", Type::int()), ("c", Type::int())],
        )
    }

    fn target() -> TargetInfo {
        TargetInfo::default()
    }

    #[test]
    fn classifies_both_operand_orders() {
        let p = Expr::var("p", widget().pointer_to());
        let n = Expr::size_of(Type::int());

        let right = Expr::binary(BinaryOpKind::Add, p.clone(), n.clone());
        let ops = classify_operands(&right.as_binary().unwrap()).unwrap();
        assert_eq!(ops.side, Side::Right);
        assert_eq!(ops.pointer, &p);

        let left = Expr::binary(BinaryOpKind::Add, n, p.clone());
        let ops = classify_operands(&left.as_binary().unwrap()).unwrap();
        assert_eq!(ops.side, Side::Left);
        assert_eq!(ops.pointer, &p);
    }

    #[test]
    fn rejects_other_operators_and_shapes() {
        let p = || Expr::var("p", widget().pointer_to());
        let q = || Expr::var("q", widget().pointer_to());
        let n = || Expr::size_of(Type::int());

        for op in [
            BinaryOpKind::Mul,
            BinaryOpKind::Assign,
            BinaryOpKind::MulAssign,
            BinaryOpKind::Lt,
            BinaryOpKind::Comma,
        ] {
            let e = Expr::binary(op, p(), n());
            assert!(classify_operands(&e.as_binary().unwrap()).is_none(), "{op:?}");
        }

        let both_ptr = Expr::binary(BinaryOpKind::Sub, p(), q());
        assert!(classify_operands(&both_ptr.as_binary().unwrap()).is_none());

        let both_int = Expr::binary(BinaryOpKind::Add, n(), Expr::int(3));
        assert!(classify_operands(&both_int.as_binary().unwrap()).is_none());

        let untyped = Expr::binary(
            BinaryOpKind::Add,
            p(),
            Expr::new(ExprKind::Unknown, QualType::null()),
        );
        assert!(classify_operands(&untyped.as_binary().unwrap()).is_none());
    }

    #[test]
    fn byte_like_pointees() {
        let t = target();
        let byte_array = Type::structure("S", [("c", Type::char().array_of(8))]);

        assert!(is_byte_like_pointee(&Type::char().pointer_to().into(), &t));
        assert!(is_byte_like_pointee(&Type::Bool.pointer_to().into(), &t));
        assert!(is_byte_like_pointee(&Type::char().array_of(1).pointer_to().into(), &t));
        assert!(!is_byte_like_pointee(&byte_array.pointer_to().into(), &t));
        assert!(!is_byte_like_pointee(&widget().pointer_to().into(), &t));
    }

    #[test]
    fn unsizable_pointees_are_not_byte_like() {
        let t = target();
        for ty in [
            Type::Void.pointer_to(),
            Type::opaque("Handle").pointer_to(),
            Type::type_param("T").pointer_to(),
            Type::char().vla_of().pointer_to(),
            Type::char().array_of(0).pointer_to(),
            Type::Array {
                element: Box::new(Type::char()),
                size: ArraySize::Incomplete,
            }
            .pointer_to(),
            Type::Array {
                element: Box::new(Type::char()),
                size: ArraySize::Dependent,
            }
            .pointer_to(),
            Type::char(),
        ] {
            assert!(!is_byte_like_pointee(&ty.clone().into(), &t), "{ty}");
        }
        assert!(!is_byte_like_pointee(&QualType::null(), &t));
    }

    #[test]
    fn objc_object_pointers_go_through_the_size_check() {
        let t = target();
        let one_byte = Type::ObjCObjectPointer(Box::new(Type::char()));
        assert!(is_byte_like_pointee(&one_byte.into(), &t));
        let wide = Type::ObjCObjectPointer(Box::new(widget()));
        assert!(!is_byte_like_pointee(&wide.into(), &t));
    }

    #[test]
    fn assessment_requires_size_origin() {
        let p = Expr::var("p", widget().pointer_to());
        let n = Expr::var("n", Type::size_t());
        let e = Expr::binary(BinaryOpKind::Add, p, n);
        let bin = e.as_binary().unwrap();
        let ops = classify_operands(&bin).unwrap();

        assert_eq!(assess(&ops, &SVal::concrete(4), &target()), Assessment::Safe);
        assert_eq!(
            assess(&ops, &SVal::concrete(4).from_sizeof(), &target()),
            Assessment::Reportable(Side::Right)
        );
    }

    #[test]
    fn message_names_the_side() {
        assert_eq!(
            message(Side::Left),
            "In pointer arithmetic left argument is calculated from a sizeof or offsetof expression"
        );
        assert!(message(Side::Right).contains(" right argument "));
    }

    #[test]
    fn second_report_on_same_node_and_state_is_suppressed() {
        let mut e = Expr::binary(
            BinaryOpKind::Add,
            Expr::var("p", widget().pointer_to()),
            Expr::size_of(Type::int()),
        );
        e.id = ExprId(1);
        if let ExprKind::Binary { lhs, rhs, .. } = &mut e.kind {
            lhs.id = ExprId(2);
            rhs.id = ExprId(3);
        }

        let mut env = Environment::default();
        env.bind(ExprId(2), SVal::loc("p"));
        env.bind(ExprId(3), SVal::concrete(4).from_sizeof());
        let state = ProgramState::default();
        let t = target();
        let mut reporter = BugReporter::default();
        let checker = BadScaledPointerArithmetic;

        for _ in 0..2 {
            let mut ctx = CheckerContext::new(
                checker.descriptor(),
                &e,
                &state,
                &env,
                &t,
                0,
                &mut reporter,
            );
            checker.check_pre_binary(e.as_binary().unwrap(), &mut ctx);
        }
        assert_eq!(reporter.reports().len(), 1);
        assert!(reporter.reports()[0].message.contains(" right argument "));
    }
}

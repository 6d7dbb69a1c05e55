//! Symbolic values with origin tracking.
//!
//! Every value the engine computes carries an [`OriginTag`]. A value built
//! from `sizeof(T)` or `offsetof(T, m)` is tagged, and the tag survives
//! casts, assignment through variables and integer arithmetic, so a rule
//! can ask whether a scalar "came from" a size computation without walking
//! the expression tree itself.

use crate::ast::BinaryOpKind;
use std::fmt;

/// Where a value was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OriginTag {
    #[default]
    Plain,
    /// Derived from a `sizeof` or `offsetof` expression.
    SizeOrOffsetDerived,
}

impl OriginTag {
    /// Tag of a value computed from two inputs.
    pub fn merge(self, other: OriginTag) -> OriginTag {
        if self == OriginTag::SizeOrOffsetDerived || other == OriginTag::SizeOrOffsetDerived {
            OriginTag::SizeOrOffsetDerived
        } else {
            OriginTag::Plain
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SValKind {
    /// A known integer.
    Concrete(i64),
    /// An unknown but named integer (parameters, globals).
    Symbol(String),
    /// Address inside the named memory region.
    Loc(String),
    /// Nothing is known.
    Unknown,
}

/// Symbolic value of an expression on one analysis path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SVal {
    pub kind: SValKind,
    pub origin: OriginTag,
}

impl SVal {
    pub fn concrete(value: i64) -> Self {
        Self {
            kind: SValKind::Concrete(value),
            origin: OriginTag::Plain,
        }
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self {
            kind: SValKind::Symbol(name.into()),
            origin: OriginTag::Plain,
        }
    }

    pub fn loc(region: impl Into<String>) -> Self {
        Self {
            kind: SValKind::Loc(region.into()),
            origin: OriginTag::Plain,
        }
    }

    pub fn unknown() -> Self {
        Self {
            kind: SValKind::Unknown,
            origin: OriginTag::Plain,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: OriginTag) -> Self {
        self.origin = origin;
        self
    }

    /// Mark the value as produced by `sizeof`/`offsetof`.
    #[must_use]
    pub fn from_sizeof(self) -> Self {
        self.with_origin(OriginTag::SizeOrOffsetDerived)
    }

    /// Whether this value was computed from a `sizeof` or `offsetof` expression.
    pub fn is_from_sizeof(&self) -> bool {
        self.origin == OriginTag::SizeOrOffsetDerived
    }

    pub fn as_concrete(&self) -> Option<i64> {
        match self.kind {
            SValKind::Concrete(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, SValKind::Unknown)
    }

    /// Name of the symbol or region backing the value, if any.
    pub fn symbol_name(&self) -> Option<&str> {
        match &self.kind {
            SValKind::Symbol(name) | SValKind::Loc(name) => Some(name),
            _ => None,
        }
    }

    /// Evaluate `self op rhs`.
    ///
    /// Integer arithmetic keeps the size/offset tag of either operand.
    /// Pointer arithmetic yields a location and never carries the tag;
    /// comparisons and logical operators yield plain values.
    pub fn binary(&self, op: BinaryOpKind, rhs: &SVal) -> SVal {
        use BinaryOpKind as B;

        match op {
            B::Assign | B::Comma => rhs.clone(),
            _ if op.is_comparison() || matches!(op, B::LAnd | B::LOr) => {
                match (self.as_concrete(), rhs.as_concrete()) {
                    (Some(a), Some(b)) => SVal::concrete(i64::from(compare(op, a, b))),
                    _ => SVal::unknown(),
                }
            }
            _ => {
                let Some(arith) = op.arithmetic_part() else {
                    return SVal::unknown();
                };
                match (&self.kind, &rhs.kind) {
                    // Pointer difference is an integer we do not model.
                    (SValKind::Loc(_), SValKind::Loc(_)) => return SVal::unknown(),
                    (SValKind::Loc(region), _) | (_, SValKind::Loc(region)) => {
                        return if matches!(arith, B::Add | B::Sub) {
                            SVal::loc(region.clone())
                        } else {
                            SVal::unknown()
                        };
                    }
                    _ => {}
                }

                let origin = self.origin.merge(rhs.origin);
                match (&self.kind, &rhs.kind) {
                    (SValKind::Concrete(a), SValKind::Concrete(b)) => {
                        fold(arith, *a, *b).map_or_else(SVal::unknown, SVal::concrete)
                    }
                    _ => SVal::unknown(),
                }
                .with_origin(origin)
            }
        }
    }
}

fn compare(op: BinaryOpKind, a: i64, b: i64) -> bool {
    use BinaryOpKind as B;
    match op {
        B::Lt => a < b,
        B::Gt => a > b,
        B::Le => a <= b,
        B::Ge => a >= b,
        B::Eq => a == b,
        B::Ne => a != b,
        B::LAnd => a != 0 && b != 0,
        B::LOr => a != 0 || b != 0,
        _ => false,
    }
}

fn fold(op: BinaryOpKind, a: i64, b: i64) -> Option<i64> {
    use BinaryOpKind as B;
    match op {
        B::Add => a.checked_add(b),
        B::Sub => a.checked_sub(b),
        B::Mul => a.checked_mul(b),
        B::Div => a.checked_div(b),
        B::Rem => a.checked_rem(b),
        B::Shl => u32::try_from(b).ok().and_then(|s| a.checked_shl(s)),
        B::Shr => u32::try_from(b).ok().and_then(|s| a.checked_shr(s)),
        B::And => Some(a & b),
        B::Or => Some(a | b),
        B::Xor => Some(a ^ b),
        _ => None,
    }
}

impl fmt::Display for SVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SValKind::Concrete(v) => write!(f, "{v}")?,
            SValKind::Symbol(name) => write!(f, "${name}")?,
            SValKind::Loc(region) => write!(f, "&{region}")?,
            SValKind::Unknown => f.write_str("unknown")?,
        }
        if self.is_from_sizeof() {
            f.write_str(" [sizeof]")?;
        }
        Ok(())
    }
}

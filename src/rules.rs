pub mod pointer_arith;

use crate::lint::Checker;

pub use pointer_arith::BadScaledPointerArithmetic;

/// Every built-in checker, in registration order.
pub fn all() -> Vec<Box<dyn Checker>> {
    vec![Box::new(BadScaledPointerArithmetic)]
}

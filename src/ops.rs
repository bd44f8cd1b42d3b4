//! `std::ops` implementations.
//!
//! Operators cannot carry a [`Context`], so they derive one: the wider of
//! the two operands' precisions, round-to-nearest. Code that needs a
//! specific precision or rounding mode calls the inherent methods instead.

use crate::{BigFloat, Context, RoundingMode};
use std::ops::{Add, Div, Mul, Neg, Sub};

fn derived_ctx(a: &BigFloat, b: &BigFloat) -> Context {
    Context::raw(a.precision().max(b.precision()), RoundingMode::Nearest)
}

macro_rules! binop {
    ($trait:ident, $fn:ident) => {
        impl<'a, 'b> $trait<&'b BigFloat> for &'a BigFloat {
            type Output = BigFloat;
            fn $fn(self, rhs: &'b BigFloat) -> BigFloat {
                BigFloat::$fn(self, rhs, derived_ctx(self, rhs))
            }
        }

        impl $trait<BigFloat> for BigFloat {
            type Output = BigFloat;
            fn $fn(self, rhs: BigFloat) -> BigFloat {
                $trait::$fn(&self, &rhs)
            }
        }
    };
}

binop!(Add, add);
binop!(Sub, sub);
binop!(Mul, mul);
binop!(Div, div);

impl<'a> Neg for &'a BigFloat {
    type Output = BigFloat;
    fn neg(self) -> BigFloat {
        self.negated()
    }
}

impl Neg for BigFloat {
    type Output = BigFloat;
    fn neg(self) -> BigFloat {
        self.negated()
    }
}

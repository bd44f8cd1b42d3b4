//! Natural logarithm and exponential.
//!
//! Both functions run their series at a widened working precision (60 guard
//! bits) in round-to-nearest and round the final sum into the caller's
//! context once, so the guard bits absorb the series truncation and the
//! per-term rounding errors.
//!
//! Argument reduction is base-2: `ln` strips the binary exponent and `exp`
//! splits off an integer multiple of `ln 2`, so both series run on arguments
//! well inside their fast-convergence zone. The `ln 2` constant itself is
//! cached per thread at the widest precision requested so far.

use crate::{BigFloat, Context, RoundingMode, MAX_PRECISION};
use log::debug;
use std::cell::RefCell;

thread_local! {
    /// Cached `ln 2` and the precision it was computed at.
    static LN_2: RefCell<Option<(u32, BigFloat)>> = RefCell::new(None);
}

fn working(ctx: Context) -> Context {
    Context::raw((ctx.precision() + 60).min(MAX_PRECISION), RoundingMode::Nearest)
}

/// A series term no longer affects the sum once it drops `wp + 2` binary
/// orders below it.
fn converged(term: &BigFloat, sum: &BigFloat, wp: u32) -> bool {
    term.is_zero() || term.binary_exponent() < sum.binary_exponent() - wp as i64 - 2
}

/// `atanh(y)` by its Taylor series, `y + y^3/3 + y^5/5 + ...`.
///
/// The callers keep `|y| <= 1/5`, so every term gains at least four bits.
fn atanh_series(y: &BigFloat, wp: Context) -> BigFloat {
    if y.is_zero() {
        return BigFloat::zero(wp);
    }
    let y2 = y.mul(y, wp);
    let mut sum = y.clone();
    let mut pow = y.clone();
    let mut n = 1u64;
    loop {
        pow = pow.mul(&y2, wp);
        n += 2;
        let term = pow.div_f64(n as f64, wp);
        if converged(&term, &sum, wp.precision()) {
            break;
        }
        sum = sum.add(&term, wp);
    }
    debug!("atanh series: {} terms at {} bits", n / 2, wp.precision());
    sum
}

/// `ln 2` at (at least) `wp` working precision, from the per-thread cache.
///
/// Computed as `2 * atanh(1/3)` with 30 extra guard bits, then rounded down
/// to the requested precision.
fn ln_2(wp: Context) -> BigFloat {
    LN_2.with(|cell| {
        let mut cached = cell.borrow_mut();
        let stale = match *cached {
            Some((prec, _)) => prec < wp.precision(),
            None => true,
        };
        if stale {
            let cp = Context::raw(
                (wp.precision() + 30).min(MAX_PRECISION),
                RoundingMode::Nearest,
            );
            debug!("computing ln 2 at {} bits", cp.precision());
            let third = BigFloat::from_f64(1.0, cp).div(&BigFloat::from_f64(3.0, cp), cp);
            let ln2 = atanh_series(&third, cp).scale_by_pow2(1);
            *cached = Some((wp.precision(), ln2));
        }
        cached.as_ref().unwrap().1.with_context(wp)
    })
}

impl BigFloat {
    /// Natural logarithm, rounded into `ctx`.
    ///
    /// `ln(0)` is `-Inf`, negative arguments produce NaN. Exact cases stay
    /// exact: `ln(1)` is zero.
    ///
    /// The argument is written as `r * 2^k` with `r` in `[0.75, 1.5)`; then
    /// `ln(x) = 2 * atanh((r-1)/(r+1)) + k * ln 2`, with `|...| <= 1/5` for
    /// the series argument.
    pub fn ln(&self, ctx: Context) -> BigFloat {
        match self.sign() {
            crate::Sign::Nan | crate::Sign::Negative | crate::Sign::NegInfinity => {
                return BigFloat::nan(ctx)
            }
            crate::Sign::Zero => return BigFloat::neg_infinity(ctx),
            crate::Sign::Infinity => return BigFloat::infinity(ctx),
            crate::Sign::Positive => {}
        }
        let wp = working(ctx);
        let mut k = self.binary_exponent() - 1;
        let mut r = self.with_context(wp).scale_by_pow2(-k);
        // r in [1, 2); fold the upper part down so the series argument is
        // small on both sides of 1.
        if r >= BigFloat::from_f64(1.5, wp) {
            r = r.scale_by_pow2(-1);
            k += 1;
        }

        let one = BigFloat::from_f64(1.0, wp);
        let y = r.sub(&one, wp).div(&r.add(&one, wp), wp);
        let mut result = atanh_series(&y, wp).scale_by_pow2(1);
        if k != 0 {
            result = result.add(&ln_2(wp).mul_f64(k as f64, wp), wp);
        }
        result.with_context(ctx)
    }

    /// Exponential function, rounded into `ctx`.
    ///
    /// `exp(0)` is exactly 1; `exp(-Inf)` is zero. Arguments of magnitude
    /// 2^34 or more short-circuit to infinity or zero, far past any exponent
    /// the conversions can express.
    ///
    /// The argument is reduced by the nearest integer multiple of `ln 2`,
    /// leaving a remainder of magnitude at most `0.35` for the Taylor
    /// series; the result is scaled back by `2^n`.
    pub fn exp(&self, ctx: Context) -> BigFloat {
        match self.sign() {
            crate::Sign::Nan => return BigFloat::nan(ctx),
            crate::Sign::Infinity => return BigFloat::infinity(ctx),
            crate::Sign::NegInfinity => return BigFloat::zero(ctx),
            crate::Sign::Zero => return BigFloat::from_f64(1.0, ctx),
            _ => {}
        }
        if self.binary_exponent() >= 34 {
            return if self.sign() == crate::Sign::Negative {
                BigFloat::zero(ctx)
            } else {
                BigFloat::infinity(ctx)
            };
        }

        let wp = working(ctx);
        let n = (self.to_f64(RoundingMode::Nearest) / std::f64::consts::LN_2).round() as i64;
        let r = if n == 0 {
            self.with_context(wp)
        } else {
            self.with_context(wp).sub(&ln_2(wp).mul_f64(n as f64, wp), wp)
        };
        debug!("exp: reduced by {} * ln 2", n);

        let one = BigFloat::from_f64(1.0, wp);
        let mut sum = one.add(&r, wp);
        let mut term = r.clone();
        let mut i = 1u64;
        while !term.is_zero() {
            i += 1;
            term = term.mul(&r, wp).div_f64(i as f64, wp);
            if converged(&term, &sum, wp.precision()) {
                break;
            }
            sum = sum.add(&term, wp);
        }
        sum.scale_by_pow2(n).with_context(ctx)
    }
}

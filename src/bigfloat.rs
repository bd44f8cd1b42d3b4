//! The `BigFloat` type: sign, limb exponent and mantissa, plus conversions
//! to and from the IEEE-754 host types.

use crate::kernels::{
    add_mantissas, div_mantissas, div_mantissas_newton, mul_mantissas, mul_mantissas_windowed,
    sub_mantissas,
};
use crate::limb::{clz, cmp_limbs, limbs_for, shr_bits, LIMB_BITS, LIMB_MASK};
use crate::round::{round_in_place, round_into, Trailing};
use crate::{Context, RoundingMode};
use ieee754::Ieee754;
use log::debug;
use std::cmp::Ordering;
use std::fmt;

/// Sign and class of a `BigFloat`.
///
/// Non-finite values carry no mantissa, so the class lives in the sign. Zero
/// is unsigned. The variants are ordered by value, which gives comparison of
/// distinct classes for free; the numeric [`value`](Sign::value) projection
/// additionally lets multiplication and division compose signs (and produce
/// `Nan` for `0 * Inf` and friends) with plain host arithmetic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sign {
    NegInfinity,
    Negative,
    Zero,
    Positive,
    Infinity,
    Nan,
}

impl Sign {
    fn value(self) -> f64 {
        match self {
            Sign::NegInfinity => f64::NEG_INFINITY,
            Sign::Negative => -1.0,
            Sign::Zero => 0.0,
            Sign::Positive => 1.0,
            Sign::Infinity => f64::INFINITY,
            Sign::Nan => f64::NAN,
        }
    }

    fn from_value(v: f64) -> Sign {
        if v.is_nan() {
            Sign::Nan
        } else if v == 0.0 {
            Sign::Zero
        } else if v == f64::INFINITY {
            Sign::Infinity
        } else if v == f64::NEG_INFINITY {
            Sign::NegInfinity
        } else if v > 0.0 {
            Sign::Positive
        } else {
            Sign::Negative
        }
    }

    fn negate(self) -> Sign {
        match self {
            Sign::NegInfinity => Sign::Infinity,
            Sign::Negative => Sign::Positive,
            Sign::Positive => Sign::Negative,
            Sign::Infinity => Sign::NegInfinity,
            s => s,
        }
    }

    /// Ordering rank; `Nan` has none.
    fn rank(self) -> Option<u8> {
        match self {
            Sign::NegInfinity => Some(0),
            Sign::Negative => Some(1),
            Sign::Zero => Some(2),
            Sign::Positive => Some(3),
            Sign::Infinity => Some(4),
            Sign::Nan => None,
        }
    }
}

/// An arbitrary-precision binary floating-point number.
///
/// The value of a finite nonzero `BigFloat` is
/// `sign * mant * (2^30)^exp`, where `mant` is read as a base-2^30
/// fraction `0.mant[0] mant[1] ...` normalized into `[2^-30, 1)`. The
/// precision is a property of the value: it was set by the [`Context`] of
/// the operation that produced it, and determines how many significant bits
/// the mantissa carries.
///
/// Arithmetic never mutates its operands; each operation allocates its
/// result at the context's precision and rounds exactly once.
#[derive(Clone)]
pub struct BigFloat {
    pub(crate) sign: Sign,
    pub(crate) exp: i32,
    pub(crate) prec: u32,
    pub(crate) mant: Vec<u32>,
}

impl BigFloat {
    fn special(sign: Sign, ctx: Context) -> BigFloat {
        BigFloat {
            sign,
            exp: 0,
            prec: ctx.precision(),
            mant: Vec::new(),
        }
    }

    pub fn zero(ctx: Context) -> BigFloat {
        BigFloat::special(Sign::Zero, ctx)
    }

    pub fn nan(ctx: Context) -> BigFloat {
        BigFloat::special(Sign::Nan, ctx)
    }

    pub fn infinity(ctx: Context) -> BigFloat {
        BigFloat::special(Sign::Infinity, ctx)
    }

    pub fn neg_infinity(ctx: Context) -> BigFloat {
        BigFloat::special(Sign::NegInfinity, ctx)
    }

    /// Converts an `f64`, rounding to the context's precision. At 53 bits or
    /// more the conversion is exact.
    pub fn from_f64(v: f64, ctx: Context) -> BigFloat {
        let (neg, raw, sig) = v.decompose_raw();
        if raw == 0x7FF {
            let s = if sig != 0 {
                Sign::Nan
            } else if neg {
                Sign::NegInfinity
            } else {
                Sign::Infinity
            };
            return BigFloat::special(s, ctx);
        }
        if raw == 0 && sig == 0 {
            return BigFloat::zero(ctx);
        }
        let (s, t) = if raw == 0 {
            (sig, -1074)
        } else {
            (sig | 1 << 52, raw as i64 - 1075)
        };
        BigFloat::from_scaled_int(neg, s, t, ctx)
    }

    /// Converts an `f32`, rounding to the context's precision.
    pub fn from_f32(v: f32, ctx: Context) -> BigFloat {
        let (neg, raw, sig) = v.decompose_raw();
        if raw == 0xFF {
            let s = if sig != 0 {
                Sign::Nan
            } else if neg {
                Sign::NegInfinity
            } else {
                Sign::Infinity
            };
            return BigFloat::special(s, ctx);
        }
        if raw == 0 && sig == 0 {
            return BigFloat::zero(ctx);
        }
        let (s, t) = if raw == 0 {
            (sig as u64, -149)
        } else {
            ((sig | 1 << 23) as u64, raw as i64 - 150)
        };
        BigFloat::from_scaled_int(neg, s, t, ctx)
    }

    /// Builds `±s * 2^t` for a nonzero integer significand of at most 53
    /// bits. The significand is aligned into a four-limb window, then rounded
    /// into the target precision.
    fn from_scaled_int(neg: bool, s: u64, t: i64, ctx: Context) -> BigFloat {
        debug_assert!(s != 0 && s < 1 << 53);
        let bl = (64 - s.leading_zeros()) as i64;
        // Smallest limb exponent whose fraction window contains the top bit.
        let e = (t + bl + LIMB_BITS as i64 - 1).div_euclid(LIMB_BITS as i64);
        let offset = (e * LIMB_BITS as i64 - (t + bl)) as u32;
        debug_assert!(offset < LIMB_BITS);

        let big = (s as u128) << (120 - offset as i64 - bl);
        let src = [
            (big >> 90) as u32 & LIMB_MASK,
            (big >> 60) as u32 & LIMB_MASK,
            (big >> 30) as u32 & LIMB_MASK,
            big as u32 & LIMB_MASK,
        ];

        let mut mant = vec![0; limbs_for(ctx.precision())];
        let shift = round_into(
            &src,
            ctx.precision(),
            &mut mant,
            ctx.rounding().magnitude(neg),
            Trailing::Exact,
        );
        BigFloat {
            sign: if neg { Sign::Negative } else { Sign::Positive },
            exp: (e + shift as i64) as i32,
            prec: ctx.precision(),
            mant,
        }
    }

    /// Converts to `f64` under the given rounding mode, handling overflow to
    /// infinity and underflow through the subnormal range down to zero.
    pub fn to_f64(&self, mode: RoundingMode) -> f64 {
        let neg = match self.sign {
            Sign::Nan => return f64::NAN,
            Sign::Infinity => return f64::INFINITY,
            Sign::NegInfinity => return f64::NEG_INFINITY,
            Sign::Zero => return 0.0,
            Sign::Positive => false,
            Sign::Negative => true,
        };
        let mmode = mode.magnitude(neg);

        let mut rounded = self.mant.clone();
        let s = round_in_place(&mut rounded, 53, mmode, Trailing::Exact) as i64;
        let e2r = (self.exp as i64 + s) * LIMB_BITS as i64 - clz(rounded[0]) as i64;
        if e2r >= 1025 {
            return if carries_on_overflow(mmode) {
                if neg { f64::NEG_INFINITY } else { f64::INFINITY }
            } else if neg {
                -f64::MAX
            } else {
                f64::MAX
            };
        }
        if e2r >= -1021 {
            let sig = top_bits(&rounded, 53);
            return f64::recompose_raw(neg, (e2r + 1022) as u16, sig & ((1 << 52) - 1));
        }

        // Subnormal range: fewer than 53 significand bits are available, so
        // the 53-bit rounding above used the wrong boundary. Redo it from
        // the original mantissa at the width the exponent leaves room for.
        let e2 = self.binary_exponent();
        let avail = e2 + 1074;
        let tiny = sign_apply(neg, f64::from_bits(1));
        let zero = sign_apply(neg, 0.0);
        if avail >= 1 {
            let mut rounded = self.mant.clone();
            let s = round_in_place(&mut rounded, avail as u32, mmode, Trailing::Exact) as i64;
            let e2s = (self.exp as i64 + s) * LIMB_BITS as i64 - clz(rounded[0]) as i64;
            if e2s >= -1021 {
                // Rounding up crossed back into the normal range.
                let sig = top_bits(&rounded, 53);
                return f64::recompose_raw(neg, (e2s + 1022) as u16, sig & ((1 << 52) - 1));
            }
            let m = top_bits(&rounded, (e2s + 1074) as u32);
            return f64::recompose_raw(neg, 0, m);
        }
        // Below the smallest subnormal's own ulp. `avail == 0` means the
        // value lies in [2^-1075, 2^-1074): at or above the halfway point to
        // the smallest subnormal, a tie exactly when the mantissa is a
        // single bit.
        match mmode {
            m if m.is_away() => tiny,
            RoundingMode::Nearest => {
                if avail == 0 && !is_single_bit(&self.mant) {
                    tiny
                } else {
                    zero
                }
            }
            RoundingMode::TiesAway => {
                if avail == 0 {
                    tiny
                } else {
                    zero
                }
            }
            _ => zero,
        }
    }

    /// Converts to `f32` under the given rounding mode.
    pub fn to_f32(&self, mode: RoundingMode) -> f32 {
        let neg = match self.sign {
            Sign::Nan => return f32::NAN,
            Sign::Infinity => return f32::INFINITY,
            Sign::NegInfinity => return f32::NEG_INFINITY,
            Sign::Zero => return 0.0,
            Sign::Positive => false,
            Sign::Negative => true,
        };
        let mmode = mode.magnitude(neg);

        let mut rounded = self.mant.clone();
        let s = round_in_place(&mut rounded, 24, mmode, Trailing::Exact) as i64;
        let e2r = (self.exp as i64 + s) * LIMB_BITS as i64 - clz(rounded[0]) as i64;
        if e2r >= 129 {
            return if carries_on_overflow(mmode) {
                if neg { f32::NEG_INFINITY } else { f32::INFINITY }
            } else if neg {
                -f32::MAX
            } else {
                f32::MAX
            };
        }
        if e2r >= -125 {
            let sig = top_bits(&rounded, 24) as u32;
            return f32::recompose_raw(neg, (e2r + 126) as u8, sig & ((1 << 23) - 1));
        }

        let e2 = self.binary_exponent();
        let avail = e2 + 149;
        let tiny = sign_apply_f32(neg, f32::from_bits(1));
        let zero = sign_apply_f32(neg, 0.0);
        if avail >= 1 {
            let mut rounded = self.mant.clone();
            let s = round_in_place(&mut rounded, avail as u32, mmode, Trailing::Exact) as i64;
            let e2s = (self.exp as i64 + s) * LIMB_BITS as i64 - clz(rounded[0]) as i64;
            if e2s >= -125 {
                let sig = top_bits(&rounded, 24) as u32;
                return f32::recompose_raw(neg, (e2s + 126) as u8, sig & ((1 << 23) - 1));
            }
            let m = top_bits(&rounded, (e2s + 149) as u32) as u32;
            return f32::recompose_raw(neg, 0, m);
        }
        match mmode {
            m if m.is_away() => tiny,
            RoundingMode::Nearest => {
                if avail == 0 && !is_single_bit(&self.mant) {
                    tiny
                } else {
                    zero
                }
            }
            RoundingMode::TiesAway => {
                if avail == 0 {
                    tiny
                } else {
                    zero
                }
            }
            _ => zero,
        }
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    /// The precision (in bits) this value was rounded to.
    pub fn precision(&self) -> u32 {
        self.prec
    }

    /// The limb-radix exponent. Meaningful for finite nonzero values only.
    pub fn exponent(&self) -> i32 {
        self.exp
    }

    /// The raw mantissa limbs (base-2^30 fraction, most significant first).
    /// Empty for zero and non-finite values.
    pub fn mantissa_limbs(&self) -> &[u32] {
        &self.mant
    }

    pub fn is_nan(&self) -> bool {
        self.sign == Sign::Nan
    }

    pub fn is_zero(&self) -> bool {
        self.sign == Sign::Zero
    }

    pub fn is_finite(&self) -> bool {
        match self.sign {
            Sign::Negative | Sign::Zero | Sign::Positive => true,
            _ => false,
        }
    }

    fn is_negative(&self) -> bool {
        match self.sign {
            Sign::Negative | Sign::NegInfinity => true,
            _ => false,
        }
    }

    /// Power-of-two exponent: the value's magnitude lies in
    /// `[2^(b-1), 2^b)`. Finite nonzero values only.
    pub(crate) fn binary_exponent(&self) -> i64 {
        debug_assert!(self.is_finite() && !self.is_zero());
        self.exp as i64 * LIMB_BITS as i64 - clz(self.mant[0]) as i64
    }

    pub fn negated(&self) -> BigFloat {
        let mut r = self.clone();
        r.sign = r.sign.negate();
        r
    }

    /// Re-rounds the value into a new context. Exact when the target
    /// precision is at least the current one.
    pub fn with_context(&self, ctx: Context) -> BigFloat {
        if !self.is_finite() || self.is_zero() {
            return BigFloat::special(self.sign, ctx);
        }
        let mut mant = vec![0; limbs_for(ctx.precision())];
        let s = round_into(
            &self.mant,
            ctx.precision(),
            &mut mant,
            ctx.rounding().magnitude(self.is_negative()),
            Trailing::Exact,
        );
        BigFloat {
            sign: self.sign,
            exp: self.exp + s as i32,
            prec: ctx.precision(),
            mant,
        }
    }

    /// Multiplies by `2^k`, exactly. The precision is unchanged; no rounding
    /// occurs because scaling by a power of two only moves the exponent and
    /// shifts bits.
    pub fn scale_by_pow2(&self, k: i64) -> BigFloat {
        if !self.is_finite() || self.is_zero() {
            return self.clone();
        }
        let q = k.div_euclid(LIMB_BITS as i64);
        let r = k.rem_euclid(LIMB_BITS as i64) as u32;
        let mut out = self.clone();
        if r == 0 {
            out.exp = (out.exp as i64 + q) as i32;
            return out;
        }
        // 2^k = 2^(r - 30) * (2^30)^(q + 1) with 0 < r < 30: shift the
        // mantissa down by 30 - r bits into one extra limb.
        let mut scratch = vec![0; self.mant.len() + 1];
        scratch[..self.mant.len()].copy_from_slice(&self.mant);
        shr_bits(&mut scratch, LIMB_BITS - r);
        let mut e = self.exp as i64 + q + 1;
        if scratch[0] == 0 {
            let n = scratch.len();
            scratch.copy_within(1.., 0);
            scratch[n - 1] = 0;
            e -= 1;
        }
        let s = round_into(
            &scratch,
            self.prec,
            &mut out.mant,
            RoundingMode::Nearest,
            Trailing::Exact,
        );
        debug_assert_eq!(s, 0, "power-of-two scaling cannot round");
        out.exp = e as i32;
        out
    }

    /// Adds two values, rounding the result into `ctx`.
    pub fn add(&self, rhs: &BigFloat, ctx: Context) -> BigFloat {
        use self::Sign::*;
        match (self.sign, rhs.sign) {
            (Nan, _) | (_, Nan) => return BigFloat::nan(ctx),
            (Infinity, NegInfinity) | (NegInfinity, Infinity) => return BigFloat::nan(ctx),
            (Infinity, _) | (_, Infinity) => return BigFloat::infinity(ctx),
            (NegInfinity, _) | (_, NegInfinity) => return BigFloat::neg_infinity(ctx),
            (Zero, _) => return rhs.with_context(ctx),
            (_, Zero) => return self.with_context(ctx),
            _ => {}
        }

        if self.sign == rhs.sign {
            // Same sign: magnitudes add. Order by exponent so the shift is
            // non-negative.
            let (a, b) = if self.exp >= rhs.exp { (self, rhs) } else { (rhs, self) };
            return magnitude_add(a, b, a.sign, ctx);
        }

        // Opposite signs: magnitudes subtract, larger magnitude wins.
        let (a, b) = match cmp_magnitude(self, rhs) {
            Ordering::Equal => return BigFloat::zero(ctx),
            Ordering::Greater => (self, rhs),
            Ordering::Less => (rhs, self),
        };
        magnitude_sub(a, b, a.sign, ctx)
    }

    /// Subtracts `rhs`, rounding the result into `ctx`.
    pub fn sub(&self, rhs: &BigFloat, ctx: Context) -> BigFloat {
        self.add(&rhs.negated(), ctx)
    }

    /// Multiplies two values, rounding the result into `ctx`.
    ///
    /// Under [`RoundingMode::Whatever`] the windowed multiplier is used: it
    /// skips product columns that cannot reach the requested precision.
    pub fn mul(&self, rhs: &BigFloat, ctx: Context) -> BigFloat {
        let sign = match (self.sign, rhs.sign) {
            (Sign::Positive, Sign::Positive) | (Sign::Negative, Sign::Negative) => Sign::Positive,
            (Sign::Positive, Sign::Negative) | (Sign::Negative, Sign::Positive) => Sign::Negative,
            (a, b) => return BigFloat::special(Sign::from_value(a.value() * b.value()), ctx),
        };
        let mode = ctx.rounding().magnitude(sign == Sign::Negative);
        let mut mant = vec![0; limbs_for(ctx.precision())];
        let s = if ctx.rounding() == RoundingMode::Whatever {
            mul_mantissas_windowed(&self.mant, &rhs.mant, ctx.precision(), &mut mant, mode)
        } else {
            mul_mantissas(&self.mant, &rhs.mant, ctx.precision(), &mut mant, mode)
        };
        BigFloat {
            sign,
            exp: self.exp + rhs.exp + s,
            prec: ctx.precision(),
            mant,
        }
    }

    /// Divides by `rhs`, rounding the result into `ctx`.
    ///
    /// The restoring divider produces correctly rounded quotients in every
    /// mode; under [`RoundingMode::Whatever`] the Newton-Raphson divider is
    /// used instead, trading exactness of the guard bits for fewer limb
    /// operations at high precision.
    pub fn div(&self, rhs: &BigFloat, ctx: Context) -> BigFloat {
        let sign = match (self.sign, rhs.sign) {
            (Sign::Positive, Sign::Positive) | (Sign::Negative, Sign::Negative) => Sign::Positive,
            (Sign::Positive, Sign::Negative) | (Sign::Negative, Sign::Positive) => Sign::Negative,
            (a, b) => return BigFloat::special(Sign::from_value(a.value() / b.value()), ctx),
        };
        let mode = ctx.rounding().magnitude(sign == Sign::Negative);
        let mut mant = vec![0; limbs_for(ctx.precision())];
        let s = if ctx.rounding() == RoundingMode::Whatever {
            div_mantissas_newton(&self.mant, &rhs.mant, ctx.precision(), &mut mant, mode)
        } else {
            div_mantissas(&self.mant, &rhs.mant, ctx.precision(), &mut mant, mode)
        };
        BigFloat {
            sign,
            exp: self.exp - rhs.exp + s,
            prec: ctx.precision(),
            mant,
        }
    }

    /// `self + f`, converting the `f64` exactly first.
    pub fn add_f64(&self, f: f64, ctx: Context) -> BigFloat {
        self.add(&BigFloat::from_f64(f, f64_ctx(ctx)), ctx)
    }

    /// `self - f`, converting the `f64` exactly first.
    pub fn sub_f64(&self, f: f64, ctx: Context) -> BigFloat {
        self.sub(&BigFloat::from_f64(f, f64_ctx(ctx)), ctx)
    }

    /// `self * f`, converting the `f64` exactly first.
    pub fn mul_f64(&self, f: f64, ctx: Context) -> BigFloat {
        self.mul(&BigFloat::from_f64(f, f64_ctx(ctx)), ctx)
    }

    /// `self / f`, converting the `f64` exactly first.
    pub fn div_f64(&self, f: f64, ctx: Context) -> BigFloat {
        self.div(&BigFloat::from_f64(f, f64_ctx(ctx)), ctx)
    }

    /// Renders the mantissa as a binary fraction, bracketing the significant
    /// window: ghost bits before `[`, retained bits inside, storage slack
    /// after `]`.
    pub fn to_bit_string(&self) -> String {
        match self.sign {
            Sign::Nan => return "NaN".to_string(),
            Sign::Infinity => return "+Inf".to_string(),
            Sign::NegInfinity => return "-Inf".to_string(),
            Sign::Zero => return "0".to_string(),
            _ => {}
        }
        let mut s = String::new();
        if self.is_negative() {
            s.push('-');
        }
        s.push_str("0.");
        let offset = clz(self.mant[0]) as usize;
        let total = self.mant.len() * LIMB_BITS as usize;
        for pos in 0..total {
            if pos == offset {
                s.push('[');
            }
            let limb = self.mant[pos / LIMB_BITS as usize];
            let bit = (limb >> (LIMB_BITS as usize - 1 - pos % LIMB_BITS as usize)) & 1;
            s.push(if bit == 1 { '1' } else { '0' });
            if pos + 1 == offset + self.prec as usize {
                s.push(']');
                if pos + 1 == total {
                    break;
                }
            }
        }
        s.push_str(&format!(" * 2^(30*{})", self.exp));
        s
    }
}

/// Conversion context for `f64` operands of the `*_f64` convenience methods:
/// wide enough to hold any double exactly, same rounding mode as the
/// operation (irrelevant, since nothing is discarded).
fn f64_ctx(ctx: Context) -> Context {
    Context::raw(crate::DEFAULT_PRECISION.max(ctx.precision()), ctx.rounding())
}

fn sign_apply(neg: bool, v: f64) -> f64 {
    if neg { -v } else { v }
}

fn sign_apply_f32(neg: bool, v: f32) -> f32 {
    if neg { -v } else { v }
}

/// Whether an overflowing conversion produces infinity (as opposed to
/// saturating at the largest finite value). `mode` is magnitude-level.
fn carries_on_overflow(mode: RoundingMode) -> bool {
    match mode {
        RoundingMode::Nearest | RoundingMode::TiesAway => true,
        m => m.is_away(),
    }
}

fn is_single_bit(mant: &[u32]) -> bool {
    mant.iter().map(|w| w.count_ones()).sum::<u32>() == 1
}

/// Top `nbits` bits of a normalized mantissa, as an integer. The mantissa
/// must carry no set bits past `offset + nbits`, or they are truncated.
fn top_bits(mant: &[u32], nbits: u32) -> u64 {
    debug_assert!(nbits >= 1 && nbits <= 53);
    let offset = clz(mant[0]);
    let mut w = 0u128;
    for i in 0..4 {
        let limb = mant.get(i).copied().unwrap_or(0) as u128;
        w |= limb << (90 - 30 * i);
    }
    ((w >> (120 - offset - nbits)) & ((1u128 << nbits) - 1)) as u64
}

/// Compares the magnitudes of two finite nonzero values. Normalized
/// fractions make this a lexicographic (exponent, limbs) comparison.
fn cmp_magnitude(a: &BigFloat, b: &BigFloat) -> Ordering {
    a.exp.cmp(&b.exp).then_with(|| cmp_limbs(&a.mant, &b.mant))
}

/// `|a| + |b|` with `a.exp >= b.exp`, signed `sign`, rounded into `ctx`.
fn magnitude_add(a: &BigFloat, b: &BigFloat, sign: Sign, ctx: Context) -> BigFloat {
    let tl = limbs_for(ctx.precision());
    let mode = ctx.rounding().magnitude(sign == Sign::Negative);
    let mut mant = vec![0; tl];
    let shift = a.exp as i64 - b.exp as i64;
    let reach = a.mant.len().max(tl) as i64 + 2;

    let s = if shift > reach {
        // The smaller operand lies entirely below the result window; it only
        // matters as a sticky bit. Pad the kept mantissa to the target width
        // first: the rounding boundary must sit at the requested precision,
        // not at the end of a possibly narrower operand.
        debug!("add: far operand, {} limbs apart", shift);
        let mut wide = vec![0u32; a.mant.len().max(tl)];
        wide[..a.mant.len()].copy_from_slice(&a.mant);
        round_into(&wide, ctx.precision(), &mut mant, mode, Trailing::Below) as i32
    } else {
        add_mantissas(&a.mant, &b.mant, shift as usize, ctx.precision(), &mut mant, mode) as i32
    };
    BigFloat {
        sign,
        exp: a.exp + s,
        prec: ctx.precision(),
        mant,
    }
}

/// `|a| - |b|` with `|a| > |b|`, signed `sign`, rounded into `ctx`.
fn magnitude_sub(a: &BigFloat, b: &BigFloat, sign: Sign, ctx: Context) -> BigFloat {
    let tl = limbs_for(ctx.precision());
    let mode = ctx.rounding().magnitude(sign == Sign::Negative);
    let mut mant = vec![0; tl];
    let shift = a.exp as i64 - b.exp as i64;
    // One limb past this and the subtrahend cannot flip any bit the rounding
    // step can see; it still must nudge truncating modes off the exact value.
    let sentinel = a.mant.len().max(tl) + 3;

    let s = if shift > sentinel as i64 {
        debug!("sub: far operand, {} limbs apart", shift);
        sub_mantissas(&a.mant, &[1], sentinel, ctx.precision(), &mut mant, mode)
    } else {
        sub_mantissas(&a.mant, &b.mant, shift as usize, ctx.precision(), &mut mant, mode)
    };
    match s {
        None => BigFloat::zero(ctx),
        Some(s) => BigFloat {
            sign,
            exp: a.exp + s,
            prec: ctx.precision(),
            mant,
        },
    }
}

impl PartialEq for BigFloat {
    fn eq(&self, other: &BigFloat) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for BigFloat {
    fn partial_cmp(&self, other: &BigFloat) -> Option<Ordering> {
        let ra = self.sign.rank()?;
        let rb = other.sign.rank()?;
        if ra != rb {
            return Some(ra.cmp(&rb));
        }
        if !self.is_finite() || self.is_zero() {
            // Same non-finite class, or both zero.
            return Some(Ordering::Equal);
        }
        let mag = cmp_magnitude(self, other);
        Some(if self.sign == Sign::Negative { mag.reverse() } else { mag })
    }
}

impl fmt::Debug for BigFloat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BigFloat({})", self.to_bit_string())
    }
}

//! Limb-level arithmetic kernels.
//!
//! Kernels operate on raw mantissas (normalized base-2^30 fractions) and
//! leave all sign and exponent bookkeeping to the `BigFloat` facade. Each
//! kernel follows the same two-phase shape: compute the unrounded result
//! (into the target where possible, into a scratch buffer where
//! cancellation or length demands it), then call the rounding engine exactly
//! once, folding any never-materialized bits in as [`Trailing`] info.
//!
//! Rounding modes passed down here must already be magnitude-level: the
//! facade resolves directed modes against the result's sign first.

use crate::limb::{clz, shl_bits, shr_bits, LIMB_BITS, LIMB_HALF, LIMB_MASK};
use crate::round::{round_in_place, round_into, Trailing};
use crate::RoundingMode;
use log::trace;
use std::cmp::Ordering;

/// Guard limbs the windowed multiplier computes past the target buffer.
///
/// Skipped columns start at least `30 * MUL_WINDOW_GUARD` bits below the
/// target's last limb; with mantissas capped at 2^24 bits (< 2^20 limbs) the
/// sum of all skipped partial products stays far below half a unit at the
/// window's end, so reporting them as a sticky bit is sound.
const MUL_WINDOW_GUARD: usize = 4;

fn get(m: &[u32], i: usize) -> u64 {
    m.get(i).copied().map_or(0, u64::from)
}

/// Limb of `m` as seen after shifting it `shift` limbs towards the bottom.
fn get_shifted(m: &[u32], shift: usize, i: usize) -> u64 {
    if i < shift {
        0
    } else {
        get(m, i - shift)
    }
}

/// Summarizes a dropped tail (`top` limb plus a sticky flag for everything
/// below it) against half of one unit in the position above `top`.
fn summarize_tail(top: u32, rest_nonzero: bool) -> Trailing {
    if top > LIMB_HALF {
        Trailing::Above
    } else if top == LIMB_HALF {
        if rest_nonzero {
            Trailing::Above
        } else {
            Trailing::Half
        }
    } else if top != 0 || rest_nonzero {
        Trailing::Below
    } else {
        Trailing::Exact
    }
}

/// Folds one more dropped limb *above* existing trailing info (which now
/// describes strictly smaller positions).
fn fold_dropped_limb(limb: u32, old: Trailing) -> Trailing {
    summarize_tail(limb, old != Trailing::Exact)
}

/// Adds `m1` and `m2 >> (30 * m2_shift)` into `dst`, rounding to `prec`.
///
/// `m1` must be the operand with the larger (or equal) limb exponent, so
/// `m2_shift >= 0`. Carries propagate towards limb 0; whatever part of the
/// smaller operand falls past `dst`'s capacity is summarized as trailing
/// info rather than materialized. Returns the exponent shift (0 or 1).
pub(crate) fn add_mantissas(
    m1: &[u32],
    m2: &[u32],
    m2_shift: usize,
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
) -> u32 {
    let tl = dst.len();
    let ml = m1.len().max(m2_shift + m2.len());

    let mut carry = 0u64;
    let mut trailing = Trailing::Exact;
    if ml > tl {
        // Sum the tail that will never fit, bottom-up, keeping only its top
        // limb and a sticky flag. Carries continue into the stored region.
        let mut top = 0u32;
        let mut rest = false;
        for p in (tl..ml).rev() {
            let v = get(m1, p) + get_shifted(m2, m2_shift, p) + carry;
            let limb = (v & LIMB_MASK as u64) as u32;
            carry = v >> LIMB_BITS;
            if p == tl {
                top = limb;
            } else if limb != 0 {
                rest = true;
            }
        }
        trailing = summarize_tail(top, rest);
    }

    for p in (0..tl).rev() {
        let v = get(m1, p) + get_shifted(m2, m2_shift, p) + carry;
        dst[p] = (v & LIMB_MASK as u64) as u32;
        carry = v >> LIMB_BITS;
    }

    let mut shift = 0;
    if carry != 0 {
        debug_assert_eq!(carry, 1);
        // The fraction overflowed into a new integer limb: shift everything
        // one limb down and fold the dropped low limb into the trailing info.
        let dropped = dst[tl - 1];
        for i in (1..tl).rev() {
            dst[i] = dst[i - 1];
        }
        dst[0] = 1;
        trailing = fold_dropped_limb(dropped, trailing);
        shift = 1;
    }
    trace!("add: ml={} tl={} shift={} trailing={:?}", ml, tl, shift, trailing);

    shift + round_in_place(dst, prec, mode, trailing)
}

/// Subtracts `m2 >> (30 * m2_shift)` from `m1` into `dst`, rounding to
/// `prec`. The caller must guarantee `|m1| >= |m2 * 2^(-30*m2_shift)|`.
///
/// Leading cancellation is normalized away by a limb shift, reported as a
/// negative exponent shift. Returns `None` when the difference is exactly
/// zero.
pub(crate) fn sub_mantissas(
    m1: &[u32],
    m2: &[u32],
    m2_shift: usize,
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
) -> Option<i32> {
    let ml = m1.len().max(m2_shift + m2.len());

    // Skip limbs where the operands agree; everything above the first
    // difference cancels to zero exactly.
    let mut first_diff = None;
    for p in 0..ml {
        if get(m1, p) != get_shifted(m2, m2_shift, p) {
            first_diff = Some(p);
            break;
        }
    }
    let first_diff = first_diff?;

    let mut scratch = vec![0u32; ml];
    let mut borrow = 0i64;
    for p in (first_diff..ml).rev() {
        let mut v = get(m1, p) as i64 - get_shifted(m2, m2_shift, p) as i64 - borrow;
        if v < 0 {
            v += 1 << LIMB_BITS;
            borrow = 1;
        } else {
            borrow = 0;
        }
        scratch[p] = v as u32;
    }
    debug_assert_eq!(borrow, 0, "caller must order operands by magnitude");

    // Borrowing can zero the first differing limb too; find the true lead.
    let lead = match scratch.iter().position(|&w| w != 0) {
        Some(lead) => lead,
        None => return None,
    };
    if lead > 0 {
        scratch.copy_within(lead.., 0);
        for w in scratch[ml - lead..].iter_mut() {
            *w = 0;
        }
    }
    trace!("sub: ml={} cancelled {} limbs", ml, lead);

    let r = round_into(&scratch, prec, dst, mode, Trailing::Exact);
    Some(r as i32 - lead as i32)
}

/// Schoolbook multiplication of two mantissas into `dst`, rounded to `prec`.
///
/// The full double-loop product is computed exactly; 30-bit limbs keep every
/// `limb * limb + acc + carry` term inside a `u64`. Returns the exponent
/// shift: `-1` when the product's leading limb fell one position low
/// (product below the limb radix point), plus a possible `+1` from rounding.
pub(crate) fn mul_mantissas(
    m1: &[u32],
    m2: &[u32],
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
) -> i32 {
    let (n1, n2) = (m1.len(), m2.len());
    let mut prod = vec![0u32; n1 + n2];
    for j in (0..n1).rev() {
        let a = m1[j] as u64;
        if a == 0 {
            continue;
        }
        let mut carry = 0u64;
        for k in (0..n2).rev() {
            let p = j + k + 1;
            let t = a * m2[k] as u64 + prod[p] as u64 + carry;
            prod[p] = (t & LIMB_MASK as u64) as u32;
            carry = t >> LIMB_BITS;
        }
        deposit_carry(&mut prod, j, carry);
    }

    finish_product(&mut prod, prec, dst, mode, Trailing::Exact)
}

/// Windowed multiplication: computes only the product columns that can reach
/// the requested precision (plus guard limbs), reporting everything skipped
/// as a sticky trailing bit.
///
/// Columns more than `MUL_WINDOW_GUARD` limbs past the target cannot move
/// the rounding boundary by more than a sticky bit, so the only cost is a
/// possible mis-rounding of results whose discarded part is *exactly* a
/// tie, acceptable for the `Whatever`-grade intermediates this variant
/// serves.
pub(crate) fn mul_mantissas_windowed(
    m1: &[u32],
    m2: &[u32],
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
) -> i32 {
    let (n1, n2) = (m1.len(), m2.len());
    let cw = (dst.len() + MUL_WINDOW_GUARD).min(n1 + n2);
    let mut prod = vec![0u32; cw];
    let mut skipped = false;
    for j in (0..n1).rev() {
        let a = m1[j] as u64;
        if a == 0 {
            continue;
        }
        if j + 1 >= cw {
            // The whole row lands past the window.
            skipped = true;
            continue;
        }
        // Positions are j+k+1; clamp k so they stay inside the window.
        let k_max = (cw - 2 - j).min(n2 - 1);
        if k_max < n2 - 1 {
            skipped = true;
        }
        let mut carry = 0u64;
        for k in (0..=k_max).rev() {
            let p = j + k + 1;
            let t = a * m2[k] as u64 + prod[p] as u64 + carry;
            prod[p] = (t & LIMB_MASK as u64) as u32;
            carry = t >> LIMB_BITS;
        }
        deposit_carry(&mut prod, j, carry);
    }

    let trailing = if skipped { Trailing::Below } else { Trailing::Exact };
    finish_product(&mut prod, prec, dst, mode, trailing)
}

/// Adds a leftover carry at `pos`, rippling towards limb 0.
fn deposit_carry(prod: &mut [u32], pos: usize, mut carry: u64) {
    let mut i = pos;
    while carry > 0 {
        let t = prod[i] as u64 + carry;
        prod[i] = (t & LIMB_MASK as u64) as u32;
        carry = t >> LIMB_BITS;
        if i == 0 {
            debug_assert_eq!(carry, 0, "product of fractions cannot reach 1");
            break;
        }
        i -= 1;
    }
}

/// Normalizes a raw product (at most one leading zero limb, since both
/// inputs are at least one limb-radix unit inverse) and rounds it.
fn finish_product(
    prod: &mut [u32],
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
    trailing: Trailing,
) -> i32 {
    let mut shift = 0i32;
    if prod[0] == 0 {
        let n = prod.len();
        prod.copy_within(1.., 0);
        prod[n - 1] = 0;
        shift = -1;
    }
    debug_assert!(prod[0] != 0);
    shift + round_into(prod, prec, dst, mode, trailing) as i32
}

/// Restoring (bit-by-bit) division of two mantissas into `dst`, rounded to
/// `prec`. This is the correctness reference: exact quotient bits plus a
/// remainder-derived trailing classification, so every rounding mode
/// resolves correctly, including perfect ties.
///
/// A zero divisor is a contract violation at this level; the facade maps it
/// to signed infinity / NaN beforehand. Returns the exponent shift: the
/// quotient of two fractions in `[2^-30, 1)` lands in `(2^-30, 2^30)`, so
/// the shift is 0 or 1 before rounding.
pub(crate) fn div_mantissas(
    m1: &[u32],
    m2: &[u32],
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
) -> i32 {
    debug_assert!(m2.iter().any(|&w| w != 0), "division by zero magnitude");
    let tl = dst.len();

    // Fixed-point working layout: limb 0 is an integer headroom limb, the
    // fraction limbs follow. `den` holds frac(m2) * 2^30 so the generated
    // bits are those of frac(m1) / (frac(m2) * 2^30), which lies in
    // (2^-60, 1).
    let ln = m1.len().max(m2.len()) + 1;
    let mut rem = vec![0u32; ln];
    rem[1..1 + m1.len()].copy_from_slice(m1);
    let mut den = vec![0u32; ln];
    den[..m2.len()].copy_from_slice(m2);

    // Skip leading zero quotient bits; there are at most 59.
    let mut z = 0u32;
    loop {
        shl1(&mut rem);
        if rem[..].cmp(&den[..]) != Ordering::Less {
            sub_in_place(&mut rem, &den);
            break;
        }
        z += 1;
        debug_assert!(z < 60);
    }

    // Place the leading 1 so the exponent correction stays a whole number of
    // limbs: ghost offset z % 30, shift (in limb-radix units) 1 - z / 30.
    let w = z / LIMB_BITS;
    let offset = z % LIMB_BITS;
    for word in dst.iter_mut() {
        *word = 0;
    }
    dst[0] = 1 << (LIMB_BITS - 1 - offset);

    let mut pos = offset as usize + 1;
    while pos < tl * LIMB_BITS as usize {
        shl1(&mut rem);
        if rem[..].cmp(&den[..]) != Ordering::Less {
            sub_in_place(&mut rem, &den);
            dst[pos / LIMB_BITS as usize] |=
                1 << (LIMB_BITS as usize - 1 - pos % LIMB_BITS as usize);
        }
        pos += 1;
    }

    // One more quotient bit plus the remainder classify the infinite tail.
    shl1(&mut rem);
    let next_bit = rem[..].cmp(&den[..]) != Ordering::Less;
    if next_bit {
        sub_in_place(&mut rem, &den);
    }
    let rest = rem.iter().any(|&w| w != 0);
    let trailing = match (next_bit, rest) {
        (false, false) => Trailing::Exact,
        (false, true) => Trailing::Below,
        (true, false) => Trailing::Half,
        (true, true) => Trailing::Above,
    };
    trace!("div: z={} trailing={:?}", z, trailing);

    (1 - w as i32) + round_in_place(dst, prec, mode, trailing) as i32
}

/// Doubles a fixed-point value in place. Limb 0 is the integer headroom limb
/// and may temporarily hold 31 bits; all others stay within 30.
fn shl1(m: &mut [u32]) {
    let n = m.len();
    m[0] = (m[0] << 1) | (m[1] >> (LIMB_BITS - 1));
    for i in 1..n - 1 {
        m[i] = ((m[i] << 1) | (m[i + 1] >> (LIMB_BITS - 1))) & LIMB_MASK;
    }
    m[n - 1] = (m[n - 1] << 1) & LIMB_MASK;
}

/// `a -= b` over equal-length limb slices; `a >= b` required.
fn sub_in_place(a: &mut [u32], b: &[u32]) {
    let mut borrow = 0i64;
    for i in (0..a.len()).rev() {
        let mut v = a[i] as i64 - b[i] as i64 - borrow;
        if v < 0 {
            v += 1 << LIMB_BITS;
            borrow = 1;
        } else {
            borrow = 0;
        }
        a[i] = v as u32;
    }
    debug_assert_eq!(borrow, 0);
}

/// Newton–Raphson division: approximates the reciprocal of the normalized
/// divisor with the linear estimate `48/17 - 32/17 * D` for `D` in
/// `(1/2, 1)`, refines it with `X <- X + X * (1 - D * X)` (quadratic
/// convergence), and multiplies by the dividend.
///
/// The iteration count is derived, not assumed: the initial estimate is
/// correct to `log2(17) ≈ 4.09` bits and each step doubles that, so
/// `ceil(log2((wp + 2) / 4))` steps cover a working precision of `wp` bits.
/// This is an approximation algorithm: the low guard bits of the quotient
/// are untrusted (reported as a sticky trailing bit), so exact ties can
/// mis-round. Use [`div_mantissas`] when correct rounding is required.
pub(crate) fn div_mantissas_newton(
    m1: &[u32],
    m2: &[u32],
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
) -> i32 {
    debug_assert!(m2.iter().any(|&w| w != 0), "division by zero magnitude");
    let tl = dst.len();
    let off2 = clz(m2[0]);

    // A power-of-two divisor reduces division to a shift; it is also the
    // one case where the normalized divisor hits exactly 1/2, which the
    // reciprocal iteration's fraction layout cannot represent.
    if is_power_of_two(m2) {
        let mut scratch = vec![0u32; m1.len() + 1];
        scratch[..m1.len()].copy_from_slice(m1);
        shr_bits(&mut scratch, LIMB_BITS - 1 - off2);
        let mut shift = 1i32;
        if scratch[0] == 0 {
            let n = scratch.len();
            scratch.copy_within(1.., 0);
            scratch[n - 1] = 0;
            shift = 0;
        }
        return shift + round_into(&scratch, prec, dst, mode, Trailing::Exact) as i32;
    }

    // Fixed-point working values: one integer limb plus tl + 3 fraction
    // limbs (around 90 guard bits past the target precision).
    let fl = tl + 3;
    let l = fl + 1;
    let wp = fl as u32 * LIMB_BITS;

    // D = frac(m2) * 2^off2, normalized into (1/2, 1).
    let mut d = vec![0u32; l];
    let nd = m2.len().min(fl);
    d[1..1 + nd].copy_from_slice(&m2[..nd]);
    shl_bits(&mut d[1..], off2);
    debug_assert!(d[0] == 0 && d[1] >= LIMB_HALF);

    let one = fx_one(l);
    // X0 = 48/17 - 32/17 * D, within 1/17 of 1/D.
    let mut x = fx_sub(&fx_from_ratio(48, 17, l), &fx_mul(&fx_from_ratio(32, 17, l), &d));

    let mut iters = 0u32;
    let mut correct_bits = 4u32;
    while correct_bits < wp + 2 {
        correct_bits *= 2;
        iters += 1;
    }
    trace!("newton div: wp={} iterations={}", wp, iters);
    for _ in 0..iters {
        let dx = fx_mul(&d, &x);
        // X * (1 - D*X) applied with the sign of the residual.
        if dx[..].cmp(&one[..]) == Ordering::Greater {
            let err = fx_sub(&dx, &one);
            x = fx_sub(&x, &fx_mul(&x, &err));
        } else {
            let err = fx_sub(&one, &dx);
            x = fx_add(&x, &fx_mul(&x, &err));
        }
    }

    // q = frac(m1) * X * 2^off2 = frac(m1) / frac(m2), up to guard error.
    let mut f1 = vec![0u32; l];
    let n1 = m1.len().min(fl);
    f1[1..1 + n1].copy_from_slice(&m1[..n1]);
    let mut q = fx_mul(&x, &f1);
    shl_bits(&mut q, off2);

    // Renormalize into a fraction mantissa plus a limb-exponent shift.
    let (mant, mut shift) = if q[0] != 0 {
        (&q[..], 1i32)
    } else {
        (&q[1..], 0i32)
    };
    // Approximation error can leave spurious leading zero limbs when the
    // quotient sits just above a limb boundary.
    let lead = mant.iter().position(|&w| w != 0).unwrap_or(0);
    shift -= lead as i32;

    shift + round_into(&mant[lead..], prec, dst, mode, Trailing::Below) as i32
}

fn is_power_of_two(m: &[u32]) -> bool {
    let mut seen = false;
    for &w in m {
        if w != 0 {
            if seen || !w.is_power_of_two() {
                return false;
            }
            seen = true;
        }
    }
    seen
}

// Fixed-point helpers for the reciprocal iteration: slices of equal length
// where limb 0 carries the integer part (small, at most a few units) and the
// rest is the fraction.

fn fx_one(l: usize) -> Vec<u32> {
    let mut v = vec![0u32; l];
    v[0] = 1;
    v
}

/// `num / den` in fixed point via long division; `den` must be small enough
/// that `rem * 2^30` fits a `u64`.
fn fx_from_ratio(num: u32, den: u32, l: usize) -> Vec<u32> {
    let mut out = vec![0u32; l];
    out[0] = num / den;
    let mut rem = (num % den) as u64;
    for w in out[1..].iter_mut() {
        rem <<= LIMB_BITS;
        *w = (rem / den as u64) as u32;
        rem %= den as u64;
    }
    out
}

/// Truncating fixed-point multiply. Column sums stay far below 2^64: each
/// column takes at most `2 * l` terms of 30-bit halves.
fn fx_mul(a: &[u32], b: &[u32]) -> Vec<u32> {
    let l = a.len();
    debug_assert_eq!(l, b.len());
    let mut cols = vec![0u64; l];
    for i in 0..l {
        if a[i] == 0 {
            continue;
        }
        let ai = a[i] as u64;
        for j in 0..l - i {
            let t = ai * b[j] as u64;
            cols[i + j] += t >> LIMB_BITS;
            if i + j + 1 < l {
                cols[i + j + 1] += t & LIMB_MASK as u64;
            }
        }
    }
    let mut out = vec![0u32; l];
    let mut carry = 0u64;
    for p in (0..l).rev() {
        let v = cols[p] + carry;
        out[p] = (v & LIMB_MASK as u64) as u32;
        carry = v >> LIMB_BITS;
    }
    // Integer limb keeps whatever overflowed; values here never exceed a
    // few units, so this cannot happen for in-contract inputs.
    debug_assert_eq!(carry, 0);
    out
}

fn fx_add(a: &[u32], b: &[u32]) -> Vec<u32> {
    let l = a.len();
    let mut out = vec![0u32; l];
    let mut carry = 0u64;
    for i in (0..l).rev() {
        let v = a[i] as u64 + b[i] as u64 + carry;
        out[i] = (v & LIMB_MASK as u64) as u32;
        carry = v >> LIMB_BITS;
    }
    // Carry out of the integer limb would mean a value >= 2^30.
    debug_assert_eq!(carry, 0);
    out
}

fn fx_sub(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = a.to_vec();
    sub_in_place(&mut out, b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limb::limbs_for;
    use crate::RoundingMode::*;

    // 1.0 as a mantissa: [1], exponent 1.
    // 0.5 as a mantissa: [LIMB_HALF], exponent 0.

    #[test]
    fn add_aligned() {
        // 1 + 1 = 2 at matching exponents: [1] + [1] -> [2].
        let mut dst = [0u32; 2];
        let s = add_mantissas(&[1, 0], &[1, 0], 0, 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([2, 0], 0));
    }

    #[test]
    fn add_carry_overflows_into_new_limb() {
        // 0.(2^30-1) + 0.(2^30-1) in limb fractions: sum is >= 1, so the
        // result shifts one limb down with shift 1.
        let mut dst = [0u32; 2];
        let s = add_mantissas(&[LIMB_MASK, 0], &[LIMB_MASK, 0], 0, 40, &mut dst, Nearest);
        assert_eq!(s, 1);
        assert_eq!(dst, [1, 0x3FFF_FFFE]);
    }

    #[test]
    fn add_far_tail_becomes_trailing_info() {
        // The second operand lies entirely past the target buffer; its
        // presence must still push an Up-rounding over the edge.
        let mut dst = [0u32; 2];
        let s = add_mantissas(&[0x2000_0000, 0], &[1], 2, 30, &mut dst, Up);
        assert_eq!(s, 0);
        assert_eq!(dst, [0x2000_0001, 0]);

        let mut dst = [0u32; 2];
        let s = add_mantissas(&[0x2000_0000, 0], &[1], 2, 30, &mut dst, Down);
        assert_eq!(s, 0);
        assert_eq!(dst, [0x2000_0000, 0]);
    }

    #[test]
    fn sub_simple() {
        let mut dst = [0u32; 2];
        let s = sub_mantissas(&[3, 0], &[1, 0], 0, 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([2, 0], Some(0)));
    }

    #[test]
    fn sub_cancellation_shifts_left() {
        // [1, 5] - [1, 2] cancels the leading limb: result [3, 0], shift -1.
        let mut dst = [0u32; 2];
        let s = sub_mantissas(&[1, 5], &[1, 2], 0, 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([3, 0], Some(-1)));
    }

    #[test]
    fn sub_exact_zero() {
        let mut dst = [0u32; 2];
        assert_eq!(sub_mantissas(&[7, 7], &[7, 7], 0, 30, &mut dst, Nearest), None);
    }

    #[test]
    fn sub_borrow_across_limbs() {
        // [2, 0] - [1, 1] = [0, 2^30 - 1] -> normalized [2^30-1, 0], shift -1.
        let mut dst = [0u32; 2];
        let s = sub_mantissas(&[2, 0], &[1, 1], 0, 35, &mut dst, Nearest);
        assert_eq!((dst, s), ([LIMB_MASK, 0], Some(-1)));
    }

    #[test]
    fn mul_small() {
        // frac [2] * frac [3]: (2*2^-30) * (3*2^-30) = 6*2^-60 -> [0, 6]
        // normalized to [6, 0] with shift -1.
        let mut dst = [0u32; 2];
        let s = mul_mantissas(&[2, 0], &[3, 0], 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([6, 0], -1));
    }

    #[test]
    fn mul_keeps_position_when_leading_limb_set() {
        // Large fractions: [2^29] * [2^29] = 2^58 * 2^-60 = 2^-2 -> leading
        // limb 2^28, no shift.
        let mut dst = [0u32; 2];
        let s = mul_mantissas(&[LIMB_HALF, 0], &[LIMB_HALF, 0], 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([1 << 28, 0], 0));
    }

    #[test]
    fn mul_windowed_matches_schoolbook_when_window_covers() {
        let a = [0x123, 0x3FFF_FFFF, 0x2AB5_4321];
        let b = [0x0F0F_0F0F, 0x1111_1111, 0x3333_3333];
        let mut exact = [0u32; 4];
        let mut windowed = [0u32; 4];
        let s1 = mul_mantissas(&a, &b, 90, &mut exact, Nearest);
        let s2 = mul_mantissas_windowed(&a, &b, 90, &mut windowed, Nearest);
        assert_eq!((exact, s1), (windowed, s2));
    }

    #[test]
    fn mul_windowed_close_to_schoolbook_when_truncating() {
        // Mantissas long enough that the window actually skips columns. The
        // results must agree to the requested precision.
        let a: Vec<u32> = (0u32..12).map(|i| (0x1234_5 + i * 0x0777_7777) & LIMB_MASK).collect();
        let b: Vec<u32> = (0u32..12)
            .map(|i| 0x3FED_CBA9u32.wrapping_sub(i.wrapping_mul(0x0123_4567)) & LIMB_MASK)
            .collect();
        let prec = 64;
        let tl = limbs_for(prec);
        let mut exact = vec![0u32; tl];
        let mut windowed = vec![0u32; tl];
        let s1 = mul_mantissas(&a, &b, prec, &mut exact, Nearest);
        let s2 = mul_mantissas_windowed(&a, &b, prec, &mut windowed, Nearest);
        assert_eq!(s1, s2);
        assert_eq!(exact, windowed);
    }

    #[test]
    fn div_exact_halving() {
        // (1/2^30) / (2/2^30) = 1/2: frac [2^29], shift 0.
        let mut dst = [0u32; 2];
        let s = div_mantissas(&[1, 0], &[2, 0], 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([LIMB_HALF, 0], 0));
    }

    #[test]
    fn div_ratio_above_one() {
        // (2/2^30) / (1/2^30) = 2 = [2] * 2^30: shift 1.
        let mut dst = [0u32; 2];
        let s = div_mantissas(&[2, 0], &[1, 0], 30, &mut dst, Nearest);
        assert_eq!((dst, s), ([2, 0], 1));
    }

    #[test]
    fn div_one_third_repeating() {
        // 1/3 = 0.0101...: limbs repeat 0x15555555 with one ghost bit. At 60
        // significant bits the boundary sits one bit into the third limb and
        // the 0101... tail lies above the halfway point, so nearest rounds
        // that single kept bit up.
        let mut dst = [0u32; 3];
        let s = div_mantissas(&[1, 0], &[3, 0], 60, &mut dst, Nearest);
        assert_eq!(s, 0);
        assert_eq!(dst, [0x1555_5555, 0x1555_5555, 0x2000_0000]);
    }

    #[test]
    fn newton_agrees_with_restoring() {
        let pairs: &[(&[u32], &[u32])] = &[
            (&[1, 0, 0], &[3, 0, 0]),
            (&[0x2B67_89AB, 0x1234_5678, 0x0DEF_0123], &[0x3FFF_FFFF, 0x0000_0001, 0x2222_2222]),
            (&[0x0000_0007, 0x3A5A_5A5A, 0x1F1F_1F1F], &[0x0000_0009, 0x0C0C_0C0C, 0x3B3B_3B3B]),
            (&[0x1357_9BDF, 0, 0x2468_ACE0], &[0x0101_0101, 0x3232_3232, 0x0F0F_0F0F]),
        ];
        for &(a, b) in pairs {
            let prec = 70;
            let tl = limbs_for(prec);
            let mut reference = vec![0u32; tl];
            let mut newton = vec![0u32; tl];
            let s1 = div_mantissas(a, b, prec, &mut reference, Whatever);
            let s2 = div_mantissas_newton(a, b, prec, &mut newton, Whatever);
            assert_eq!(s1, s2, "shift mismatch for {:?} / {:?}", a, b);
            // Whatever-mode results are raw truncations; the Newton variant
            // may differ in its guard limbs but must agree on the leading
            // two limbs (60 bits) comfortably covering `prec`'s leading part.
            assert_eq!(reference[0], newton[0], "{:?} / {:?}", a, b);
            let diff = (reference[1] as i64 - newton[1] as i64).abs();
            assert!(diff <= 1, "{:?} / {:?}: {:?} vs {:?}", a, b, reference, newton);
        }
    }

    #[test]
    fn newton_power_of_two_divisor() {
        // Dividing by 0.5 doubles: 2^-30 / 0.5 = 2^-29, still a plain
        // fraction, so no limb shift.
        let mut dst = [0u32; 3];
        let s = div_mantissas_newton(&[1, 0, 0], &[LIMB_HALF, 0, 0], 60, &mut dst, Nearest);
        assert_eq!((dst, s), ([2, 0, 0], 0));
    }

    #[test]
    fn fixed_point_ratio() {
        // 48/17 = 2.8235...: integer limb 2, first fraction limb
        // floor((48/17 - 2) * 2^30) = floor(0.8235... * 2^30).
        let v = fx_from_ratio(48, 17, 3);
        assert_eq!(v[0], 2);
        assert_eq!(v[1], (((48u64 % 17) << 30) / 17) as u32);
    }
}

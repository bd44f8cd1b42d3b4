//! The rounding engine.
//!
//! Every arithmetic kernel funnels its (conceptually unrounded) result
//! through here exactly once to enforce the output's precision. The engine
//! locates the first significant bit of the mantissa (the leading limb may
//! carry up to 29 ghost zero bits), truncates `prec` bits after it, and
//! decides whether to carry based on the rounding mode, the discarded
//! in-buffer bits, and any [`Trailing`] information about bits that were
//! never materialized by the producing operation.

use crate::limb::{clz, LIMB_BITS, LIMB_MASK};
use crate::RoundingMode;
use log::trace;

/// Compressed knowledge about the value of the bits past the *end* of a
/// buffer, measured against half a unit in the buffer's last limb position.
///
/// Produced by one arithmetic step and consumed by the rounding step of a
/// subsequent one, so a correct rounding decision can be made without ever
/// materializing the full intermediate result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Trailing {
    /// Exactly zero beyond this point.
    Exact,
    /// Strictly between zero and half.
    Below,
    /// Exactly half: a tie.
    Half,
    /// Strictly between half and one.
    Above,
}

/// Where the discarded remainder sits relative to half a unit in the last
/// retained place.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Remainder {
    Zero,
    BelowHalf,
    Half,
    AboveHalf,
}

/// The resolved truncation plan: keep `full_words` limbs, plus the top bits
/// of one partial limb when `low_len > 0` (`low_len` is the number of
/// discarded low bits in that limb). The carry unit is `1 << low_len` at the
/// partial limb, or `1` at the last fully kept limb.
struct Plan {
    full_words: usize,
    low_len: u32,
    carry: bool,
}

/// Rounds `mant` to `prec` significant bits in place.
///
/// `mode` must already be magnitude-level (directed modes resolved against
/// the value's sign). Returns `1` when a carry cascaded through every limb,
/// leaving the mantissa as `[1, 0, ...]`; the caller must then bump the
/// exponent by one limb-radix unit. Returns `0` otherwise.
///
/// Re-applying the same precision and mode to the result changes nothing.
pub(crate) fn round_in_place(
    mant: &mut [u32],
    prec: u32,
    mode: RoundingMode,
    trailing: Trailing,
) -> u32 {
    if mode == RoundingMode::Whatever {
        return 0;
    }
    let plan = decide(mant, prec, mode, trailing);
    apply_in_place(mant, &plan)
}

/// Rounds `src` to `prec` significant bits into `dst`, zero-filling the
/// remainder of `dst`.
///
/// `src` may be longer than `dst`; the truncation boundary always fits in a
/// buffer of `limbs_for(prec)` limbs, so the retained region is never cut.
pub(crate) fn round_into(
    src: &[u32],
    prec: u32,
    dst: &mut [u32],
    mode: RoundingMode,
    trailing: Trailing,
) -> u32 {
    if mode == RoundingMode::Whatever {
        // Fast path: a plain copy is a valid truncation.
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        for w in dst[n..].iter_mut() {
            *w = 0;
        }
        return 0;
    }
    let plan = decide(src, prec, mode, trailing);
    apply_into(src, dst, &plan)
}

fn decide(src: &[u32], prec: u32, mode: RoundingMode, trailing: Trailing) -> Plan {
    let n = src.len();
    debug_assert!(n > 0 && src[0] != 0, "rounding requires a normalized mantissa");
    debug_assert!(prec >= 1);

    let offset = clz(src[0]);
    // Index of the first discarded bit, counted from the top of limb 0.
    let trunc = offset as usize + prec as usize;
    let trunc_word = trunc / LIMB_BITS as usize;

    let (full_words, low_len, rem, low_bit) = if trunc_word >= n {
        // The boundary lies past the buffer: everything stored is retained
        // and only the trailing info was discarded. Rounding applies at the
        // buffer's last limb.
        let rem = match trailing {
            Trailing::Exact => Remainder::Zero,
            Trailing::Below => Remainder::BelowHalf,
            Trailing::Half => Remainder::Half,
            Trailing::Above => Remainder::AboveHalf,
        };
        (n, 0, rem, src[n - 1] & 1)
    } else {
        // In-buffer truncation. The never-materialized tail is strictly
        // below one unit at the buffer's last limb, so relative to an
        // interior boundary any nonzero trailing info acts as a sticky bit:
        // it can break a tie, never create one.
        let sticky = trailing != Trailing::Exact
            || src[trunc_word + 1..].iter().any(|&w| w != 0);

        let kept = (trunc % LIMB_BITS as usize) as u32;
        let (low_len, rem_bits, half, low_bit) = if kept == 0 {
            // The whole limb at trunc_word is discarded.
            (0, src[trunc_word], LIMB_MASK / 2 + 1, src[trunc_word - 1] & 1)
        } else {
            let low_len = LIMB_BITS - kept;
            let mask = (1u32 << low_len) - 1;
            (
                low_len,
                src[trunc_word] & mask,
                1 << (low_len - 1),
                (src[trunc_word] >> low_len) & 1,
            )
        };
        let rem = if rem_bits > half {
            Remainder::AboveHalf
        } else if rem_bits == half {
            if sticky {
                Remainder::AboveHalf
            } else {
                Remainder::Half
            }
        } else if rem_bits != 0 || sticky {
            Remainder::BelowHalf
        } else {
            Remainder::Zero
        };
        (trunc_word, low_len, rem, low_bit)
    };

    let carry = match mode {
        RoundingMode::Down | RoundingMode::TowardZero => false,
        m if m.is_away() => rem != Remainder::Zero,
        RoundingMode::TiesAway => rem == Remainder::AboveHalf || rem == Remainder::Half,
        RoundingMode::Nearest => {
            rem == Remainder::AboveHalf || (rem == Remainder::Half && low_bit == 1)
        }
        _ => unreachable!("Whatever handled by the callers"),
    };
    trace!(
        "round: offset={} trunc={} rem={:?} mode={:?} carry={}",
        offset, trunc, rem, mode, carry
    );

    Plan { full_words, low_len, carry }
}

fn apply_in_place(mant: &mut [u32], plan: &Plan) -> u32 {
    let kw = plan.full_words;
    if plan.low_len > 0 {
        mant[kw] &= !((1u32 << plan.low_len) - 1);
        for w in mant[kw + 1..].iter_mut() {
            *w = 0;
        }
    } else {
        for w in mant[kw..].iter_mut() {
            *w = 0;
        }
    }
    if plan.carry {
        carry_up(mant, plan)
    } else {
        0
    }
}

fn apply_into(src: &[u32], dst: &mut [u32], plan: &Plan) -> u32 {
    let kw = plan.full_words;
    debug_assert!(kw <= dst.len() && (plan.low_len == 0 || kw < dst.len()));
    for (i, w) in dst.iter_mut().enumerate() {
        *w = if i < kw {
            src[i]
        } else if i == kw && plan.low_len > 0 {
            src[kw] & !((1u32 << plan.low_len) - 1)
        } else {
            0
        };
    }
    if plan.carry {
        carry_up(dst, plan)
    } else {
        0
    }
}

/// Adds one unit in the last retained place and propagates the carry towards
/// limb 0. A cascade out of limb 0 (an all-ones mantissa rounding up) leaves
/// `[1, 0, ...]` and returns `1` so the caller can bump the exponent.
fn carry_up(mant: &mut [u32], plan: &Plan) -> u32 {
    let (mut i, unit) = if plan.low_len > 0 {
        (plan.full_words, 1u32 << plan.low_len)
    } else {
        debug_assert!(plan.full_words >= 1);
        (plan.full_words - 1, 1)
    };
    let mut add = unit as u64;
    loop {
        let v = mant[i] as u64 + add;
        mant[i] = (v & LIMB_MASK as u64) as u32;
        add = v >> LIMB_BITS;
        if add == 0 {
            return 0;
        }
        if i == 0 {
            // Carry out of the most significant limb: the magnitude crossed
            // into the next limb-radix unit.
            for w in mant.iter_mut() {
                *w = 0;
            }
            mant[0] = 1;
            return 1;
        }
        i -= 1;
    }
}

//! The limb representation underlying every mantissa.
//!
//! A mantissa is a slice of unsigned 30-bit digits ("limbs") stored in `u32`
//! words, most significant limb first. Interpreted as a base-2^30 fraction
//! `0.m[0] m[1] ...`, a normalized nonzero mantissa lies in `[2^-30, 1)`:
//! the leading limb is nonzero, but its top bits may be clear, leaving up to
//! 29 "ghost" zero bits before the first significant bit.
//!
//! 30 bits per limb keeps a limb-by-limb product inside 60 bits, so a `u64`
//! accumulator can absorb partial products and carries without overflow.

use std::cmp::Ordering;

/// Bits per limb.
pub(crate) const LIMB_BITS: u32 = 30;
/// All valid limb bits set.
pub(crate) const LIMB_MASK: u32 = (1 << LIMB_BITS) - 1;
/// Half of one limb unit; the tie point when a whole limb is discarded.
pub(crate) const LIMB_HALF: u32 = 1 << (LIMB_BITS - 1);

/// Number of limbs allocated for a mantissa of `prec` significant bits.
///
/// The extra limb absorbs the case where the first significant bit is not
/// aligned to a limb boundary.
pub(crate) fn limbs_for(prec: u32) -> usize {
    (prec as usize + LIMB_BITS as usize - 1) / LIMB_BITS as usize + 1
}

/// Leading zero bits of a limb within its 30-bit window.
pub(crate) fn clz(limb: u32) -> u32 {
    debug_assert!(limb != 0 && limb <= LIMB_MASK);
    limb.leading_zeros() - 2
}

/// Compares two mantissas as base-2^30 fractions, zero-padding the shorter.
pub(crate) fn cmp_limbs(a: &[u32], b: &[u32]) -> Ordering {
    let n = a.len().max(b.len());
    for i in 0..n {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }
    Ordering::Equal
}

/// Shifts a mantissa towards the most significant limb by `bits`, in place,
/// zero-filling vacated positions at the end.
///
/// Each output limb combines the bottom of one source limb with the top of
/// the next. Iteration ascends, so every source limb is read before the
/// write index advances past it.
pub(crate) fn shl_bits(m: &mut [u32], bits: u32) {
    let n = m.len();
    let limb_shift = (bits / LIMB_BITS) as usize;
    let bit_shift = bits % LIMB_BITS;
    for i in 0..n {
        let hi = m.get(i + limb_shift).copied().unwrap_or(0);
        m[i] = if bit_shift == 0 {
            hi
        } else {
            let lo = m.get(i + limb_shift + 1).copied().unwrap_or(0);
            ((hi << bit_shift) | (lo >> (LIMB_BITS - bit_shift))) & LIMB_MASK
        };
    }
}

/// Shifts a mantissa towards the least significant limb by `bits`, in place,
/// zero-filling at the front. Bits shifted past the end are discarded.
///
/// Iteration descends so reads stay ahead of writes.
pub(crate) fn shr_bits(m: &mut [u32], bits: u32) {
    let n = m.len();
    let limb_shift = (bits / LIMB_BITS) as usize;
    let bit_shift = bits % LIMB_BITS;
    for i in (0..n).rev() {
        let lo = if i >= limb_shift { m[i - limb_shift] } else { 0 };
        m[i] = if bit_shift == 0 {
            lo
        } else {
            let hi = if i >= limb_shift + 1 { m[i - limb_shift - 1] } else { 0 };
            ((lo >> bit_shift) | (hi << (LIMB_BITS - bit_shift))) & LIMB_MASK
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limb_counts() {
        assert_eq!(limbs_for(4), 2);
        assert_eq!(limbs_for(30), 2);
        assert_eq!(limbs_for(31), 3);
        assert_eq!(limbs_for(53), 3);
        assert_eq!(limbs_for(60), 3);
        assert_eq!(limbs_for(61), 4);
    }

    #[test]
    fn clz_window() {
        assert_eq!(clz(1), 29);
        assert_eq!(clz(LIMB_MASK), 0);
        assert_eq!(clz(LIMB_HALF), 0);
        assert_eq!(clz(LIMB_HALF - 1), 1);
    }

    #[test]
    fn shift_left_across_limbs() {
        let mut m = [0, 0b11, 0x1000_0000];
        shl_bits(&mut m, 31);
        assert_eq!(m, [0b110, 0x2000_0000, 0]);
    }

    #[test]
    fn shift_right_across_limbs() {
        let mut m = [0b110, 0x2000_0000, 0];
        shr_bits(&mut m, 31);
        assert_eq!(m, [0, 0b11, 0x1000_0000]);
    }

    #[test]
    fn shift_by_whole_limbs() {
        let mut m = [1, 2, 3];
        shl_bits(&mut m, 30);
        assert_eq!(m, [2, 3, 0]);
        shr_bits(&mut m, 60);
        assert_eq!(m, [0, 0, 2]);
    }

    #[test]
    fn fraction_compare_pads_with_zeros() {
        assert_eq!(cmp_limbs(&[5, 0], &[5]), Ordering::Equal);
        assert_eq!(cmp_limbs(&[5, 1], &[5]), Ordering::Greater);
        assert_eq!(cmp_limbs(&[4, LIMB_MASK], &[5]), Ordering::Less);
    }
}

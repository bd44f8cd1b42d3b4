//! Concrete end-to-end scenarios with hand-checked expectations.

use bigfloat::{BigFloat, Context, RoundingMode, Sign};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn nearest(b: &BigFloat) -> f64 {
    b.to_f64(RoundingMode::Nearest)
}

#[test]
fn point_one_plus_point_two() {
    init_logger();
    let c = Context::default();
    let a = BigFloat::from_f64(0.1, c);
    let b = BigFloat::from_f64(0.2, c);
    // The classic: at 53 bits the sum rounds up past 0.3.
    assert_eq!(nearest(&a.add(&b, c)), 0.30000000000000004);
    // With enough precision the artifact disappears on conversion.
    let wide = Context::new(200, RoundingMode::Nearest).unwrap();
    let aw = BigFloat::from_f64(0.1, wide);
    let bw = BigFloat::from_f64(0.2, wide);
    // Still not 0.3 (the inputs already carry double-rounding error), but
    // exactly the sum of the two doubles.
    assert_eq!(nearest(&aw.add(&bw, wide)), 0.1 + 0.2);
}

#[test]
fn one_third_at_different_precisions() {
    init_logger();
    let one = 1.0;
    for &bits in &[53u32, 64, 120, 300] {
        let c = Context::new(bits, RoundingMode::Nearest).unwrap();
        let q = BigFloat::from_f64(one, c).div(&BigFloat::from_f64(3.0, c), c);
        assert_eq!(nearest(&q), 1.0 / 3.0, "prec {}", bits);
    }
    // At 4 bits, 1/3 = 0.0101010...b rounds to 0.01011b * 2^-1 = 0.34375.
    let c4 = Context::new(4, RoundingMode::Nearest).unwrap();
    let q = BigFloat::from_f64(one, c4).div(&BigFloat::from_f64(3.0, c4), c4);
    assert_eq!(nearest(&q), 0.34375);
}

#[test]
fn directed_rounding_of_one_third() {
    init_logger();
    let c_down = Context::new(53, RoundingMode::Down).unwrap();
    let c_up = Context::new(53, RoundingMode::Up).unwrap();
    let one = BigFloat::from_f64(1.0, c_down);
    let three = BigFloat::from_f64(3.0, c_down);
    let lo = one.div(&three, c_down);
    let hi = one.div(&three, c_up);
    assert!(lo < hi);
    // 1/3's binary tail is below the halfway point, so the host's nearest
    // result coincides with the round-down one, and up is one ulp above.
    let v = 1.0f64 / 3.0;
    assert_eq!(nearest(&lo), v);
    assert_eq!(nearest(&hi), f64::from_bits(v.to_bits() + 1));
    let ulp = hi.sub(&lo, Context::default());
    assert_eq!(nearest(&ulp), f64::from_bits(v.to_bits() + 1) - v);
}

#[test]
fn catastrophic_cancellation_is_exact() {
    init_logger();
    let c = Context::default();
    // (1 + 2^-52) - 1 must recover 2^-52 exactly, not zero.
    let a = BigFloat::from_f64(1.0 + f64::EPSILON, c);
    let b = BigFloat::from_f64(1.0, c);
    assert_eq!(nearest(&a.sub(&b, c)), f64::EPSILON);
}

#[test]
fn huge_exponent_gap_addition() {
    init_logger();
    let c = Context::default();
    let big = BigFloat::from_f64(1e300, c);
    let tiny = BigFloat::from_f64(1e-300, c);
    assert_eq!(nearest(&big.add(&tiny, c)), 1e300);
    assert_eq!(nearest(&big.sub(&tiny, c)), 1e300);
    let c_down = Context::new(53, RoundingMode::Down).unwrap();
    // Rounding down, the invisible subtrahend must still step one ulp.
    let stepped = big.sub(&tiny, c_down);
    assert!(stepped < big);
}

#[test]
fn narrow_operands_feeding_a_wide_addition() {
    init_logger();
    // A 30-bit 1.0 plus a far-away tail, rounded into 120 bits: truncating
    // modes keep 1.0 exactly, and the away step is one ulp at 120 bits.
    let narrow = Context::new(30, RoundingMode::Nearest).unwrap();
    let one = BigFloat::from_f64(1.0, narrow);
    let tiny = BigFloat::from_f64(1e-300, narrow);

    let wide = Context::new(120, RoundingMode::Nearest).unwrap();
    assert_eq!(nearest(&one.add(&tiny, wide)), 1.0);
    let down = Context::new(120, RoundingMode::Down).unwrap();
    assert_eq!(nearest(&one.add(&tiny, down)), 1.0);

    let up = Context::new(120, RoundingMode::Up).unwrap();
    let stepped = one.add(&tiny, up);
    let step = stepped.sub(&BigFloat::from_f64(1.0, wide), wide);
    assert_eq!(nearest(&step), 2f64.powi(-119));
}

#[test]
fn discarded_tail_tying_at_the_storage_edge() {
    init_logger();
    // 1 + 2^-61 at 53 bits: the addend is exactly half a unit past the
    // three stored limbs, and the quotient below reproduces the same shape
    // through the divider's remainder classification. Relative to the
    // 53-bit boundary both are mere sticky bits.
    let c = Context::default();
    let one = BigFloat::from_f64(1.0, c);
    let tiny = BigFloat::from_f64(2f64.powi(-61), c);
    assert_eq!(nearest(&one.add(&tiny, c)), 1.0);
    let c_up = Context::new(53, RoundingMode::Up).unwrap();
    assert_eq!(nearest(&one.add(&tiny, c_up)), 1.0 + f64::EPSILON);

    let c70 = Context::new(70, RoundingMode::Nearest).unwrap();
    let three = BigFloat::from_f64(3.0, c70);
    let numer = BigFloat::from_f64(1.0, c70)
        .add(&BigFloat::from_f64(2f64.powi(-61), c70), c70)
        .mul(&three, c70);
    assert_eq!(nearest(&numer.div(&three, c)), 1.0);
    assert_eq!(nearest(&numer.div(&three, c_up)), 1.0 + f64::EPSILON);
}

#[test]
fn precision_is_a_result_property() {
    init_logger();
    let narrow = Context::new(20, RoundingMode::Nearest).unwrap();
    let wide = Context::new(120, RoundingMode::Nearest).unwrap();
    let a = BigFloat::from_f64(std::f64::consts::PI, wide);
    let r = a.add(&BigFloat::zero(wide), narrow);
    assert_eq!(r.precision(), 20);
    let r = a.mul(&a, wide);
    assert_eq!(r.precision(), 120);
}

#[test]
fn ln_of_two_at_high_precision_is_stable() {
    init_logger();
    // ln 2 computed at two very different precisions must agree after
    // rounding the wider one down.
    let lo = Context::new(53, RoundingMode::Nearest).unwrap();
    let hi = Context::new(400, RoundingMode::Nearest).unwrap();
    let a = BigFloat::from_f64(2.0, lo).ln(lo);
    let b = BigFloat::from_f64(2.0, hi).ln(hi);
    assert_eq!(nearest(&a), std::f64::consts::LN_2);
    assert_eq!(nearest(&b.with_context(lo)), std::f64::consts::LN_2);
}

#[test]
fn exp_of_ln_of_ten() {
    init_logger();
    let c = Context::new(100, RoundingMode::Nearest).unwrap();
    let ten = BigFloat::from_f64(10.0, c);
    let back = ten.ln(c).exp(c);
    // 100-bit intermediate precision leaves the 53-bit projection exact.
    assert_eq!(nearest(&back), 10.0);
}

#[test]
fn infinities_and_nans_propagate() {
    init_logger();
    let c = Context::default();
    let inf = BigFloat::infinity(c);
    let one = BigFloat::from_f64(1.0, c);
    assert_eq!(inf.add(&one, c).sign(), Sign::Infinity);
    assert!(inf.sub(&inf, c).is_nan());
    assert!(BigFloat::zero(c).mul(&inf, c).is_nan());
    assert!(inf.div(&inf, c).is_nan());
    assert!(BigFloat::nan(c).add(&one, c).is_nan());
    assert!(one.div(&BigFloat::zero(c), c).sign() == Sign::Infinity);
}

#[test]
fn whatever_mode_results_rebound_cleanly() {
    init_logger();
    // Whatever-grade intermediates re-rounded into a narrower nearest
    // context match the directly computed value.
    let fast = Context::new(120, RoundingMode::Whatever).unwrap();
    let exact = Context::new(53, RoundingMode::Nearest).unwrap();
    let a = BigFloat::from_f64(std::f64::consts::PI, fast);
    let b = BigFloat::from_f64(std::f64::consts::E, fast);
    let via_fast = a.div(&b, fast).with_context(exact);
    let direct = BigFloat::from_f64(std::f64::consts::PI, exact)
        .div(&BigFloat::from_f64(std::f64::consts::E, exact), exact);
    assert_eq!(nearest(&via_fast), nearest(&direct));
}

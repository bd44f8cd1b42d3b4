//! Arbitrary-precision binary floating point.
//!
//! A `BigFloat` is a software float with a user-selected precision (in bits)
//! and explicit rounding-mode control. The mantissa is stored as 30-bit limbs
//! in base 2^30; the exponent is a power of the limb radix. Every arithmetic
//! operation computes an unrounded intermediate result and rounds exactly
//! once into the output's precision.
//!
//! The engine is a single-threaded computational kernel: no I/O, no locking,
//! no implicit parallelism.

#![doc(html_root_url = "https://docs.rs/bigfloat/0.1.0")]
#![warn(missing_debug_implementations)]

mod bigfloat;
mod kernels;
mod limb;
mod ops;
mod round;
mod transcendental;

pub use bigfloat::*;

use std::error::Error;
use std::fmt;

/// Smallest precision (in bits) a `BigFloat` may carry.
pub const MIN_PRECISION: u32 = 4;
/// Largest precision (in bits) a `BigFloat` may carry.
pub const MAX_PRECISION: u32 = 1 << 24;
/// Precision of the default [`Context`], matching an IEEE-754 double.
pub const DEFAULT_PRECISION: u32 = 53;

/// The supported rounding modes.
///
/// `Up` and `Down` are directed (towards `+Inf` / `-Inf`); at the mantissa
/// level they flip into away-from-zero / toward-zero depending on the sign
/// of the value being rounded.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RoundingMode {
    /// Round to the nearest representable number. If both surrounding
    /// numbers have the same distance, round to the even number ("ties to
    /// even").
    Nearest,
    /// Round towards `+Inf`.
    Up,
    /// Round towards `-Inf`.
    Down,
    /// Round away from zero.
    TowardInf,
    /// Round towards zero (truncate).
    TowardZero,
    /// Round to nearest, ties away from zero.
    TiesAway,
    /// No guarantee beyond "some valid truncation".
    ///
    /// Used for intermediate values that will immediately be re-rounded;
    /// skips the rounding decision entirely.
    Whatever,
}

impl Default for RoundingMode {
    fn default() -> Self {
        RoundingMode::Nearest
    }
}

impl RoundingMode {
    /// Translates a signed rounding mode into the magnitude-level mode the
    /// kernels understand. For negative values the directed modes swap.
    pub(crate) fn magnitude(self, negative: bool) -> RoundingMode {
        match (self, negative) {
            (RoundingMode::Up, true) => RoundingMode::Down,
            (RoundingMode::Down, true) => RoundingMode::Up,
            (mode, _) => mode,
        }
    }

    /// `true` for modes that carry whenever any discarded bit is set
    /// (at the magnitude level: away from zero).
    pub(crate) fn is_away(self) -> bool {
        match self {
            RoundingMode::Up | RoundingMode::TowardInf => true,
            _ => false,
        }
    }
}

/// Precision and rounding mode for an operation.
///
/// Every arithmetic call takes a `Context` describing the *output*: how many
/// significant bits it keeps and how the discarded bits are resolved. The
/// default is 53 bits / round-to-nearest, which reproduces IEEE-754 double
/// arithmetic bit for bit.
///
/// This is deliberately a plain value passed at each call site; there is no
/// mutable process-wide default that tests or concurrent callers could
/// trample on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Context {
    precision: u32,
    rounding: RoundingMode,
}

impl Context {
    /// Creates a context, validating the precision range.
    pub fn new(precision: u32, rounding: RoundingMode) -> Result<Context, PrecisionError> {
        if precision < MIN_PRECISION || precision > MAX_PRECISION {
            return Err(PrecisionError { requested: precision });
        }
        Ok(Context { precision, rounding })
    }

    /// Creates a round-to-nearest context with the given precision.
    pub fn with_precision(precision: u32) -> Result<Context, PrecisionError> {
        Context::new(precision, RoundingMode::Nearest)
    }

    /// Internal constructor for precisions already known to be valid.
    pub(crate) fn raw(precision: u32, rounding: RoundingMode) -> Context {
        debug_assert!(precision >= 1 && precision <= MAX_PRECISION);
        Context { precision, rounding }
    }

    /// The number of significant mantissa bits results carry.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// The rounding mode applied to results.
    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }
}

impl Default for Context {
    fn default() -> Self {
        Context {
            precision: DEFAULT_PRECISION,
            rounding: RoundingMode::Nearest,
        }
    }
}

/// A requested precision fell outside `[MIN_PRECISION, MAX_PRECISION]`.
///
/// Out-of-range precisions are rejected at construction time, never silently
/// clamped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrecisionError {
    requested: u32,
}

impl PrecisionError {
    /// The precision that was asked for.
    pub fn requested(&self) -> u32 {
        self.requested
    }
}

impl fmt::Display for PrecisionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "precision {} outside the supported range [{}, {}]",
            self.requested, MIN_PRECISION, MAX_PRECISION
        )
    }
}

impl Error for PrecisionError {}

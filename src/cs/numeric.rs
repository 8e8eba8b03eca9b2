//! Tolerance-aware comparisons for floating point capacities.
//!
//! Flow algorithms subtract bottlenecks from capacities over and over, so a
//! value that should be exactly zero can end up as `1e-17`. Every zero test in
//! the solver goes through this module instead of `==`.

use approx::AbsDiffEq;
use num_traits::Float;

/// Absolute tolerance used when no other value is configured.
pub const DEFAULT_EPSILON: f64 = 1e-9;

/// Returns [`DEFAULT_EPSILON`] in the capacity type, falling back to the type's
/// machine epsilon if it cannot be represented.
pub fn default_epsilon<W: Float>() -> W {
    W::from(DEFAULT_EPSILON).unwrap_or_else(W::epsilon)
}

/// `|a - b| <= epsilon`
#[inline]
pub fn equal<W>(a: W, b: W, epsilon: W) -> bool
where
    W: Float + AbsDiffEq<Epsilon = W>,
{
    a.abs_diff_eq(&b, epsilon)
}

#[inline]
pub fn is_zero<W>(x: W, epsilon: W) -> bool
where
    W: Float + AbsDiffEq<Epsilon = W>,
{
    equal(x, W::zero(), epsilon)
}

/// Strictly greater than zero by more than `epsilon`.
#[inline]
pub fn is_positive<W>(x: W, epsilon: W) -> bool
where
    W: Float + AbsDiffEq<Epsilon = W>,
{
    x > W::zero() && !is_zero(x, epsilon)
}

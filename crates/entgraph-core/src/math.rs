//! Fixed-point integer arithmetic matching on-chain semantics.
//!
//! All derived ratios are carried as `U256` scaled by 10^18 (one "wad").
//! Division floors, exactly as the EVM does; aggregates recomputed here must
//! agree with on-chain computations to the last unit.

use alloy_primitives::{U256, U512};

/// 10^18, the fixed-point scale.
pub fn one() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

/// 100% in 18-decimal fixed point (`100 * 10^18`).
pub fn hundred_percent() -> U256 {
    U256::from(100u64) * one()
}

/// Floor of `a * b / d`. Returns zero when `d` is zero (callers guard the
/// zero-denominator cases that have defined fallbacks themselves).
///
/// The product is taken at 512 bits so wad-scale intermediates cannot wrap;
/// a quotient past 2^256 saturates to `U256::MAX`.
pub fn mul_div(a: U256, b: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }
    let wide: U512 = a.widening_mul(b);
    (wide / U512::from(d)).saturating_to()
}

/// `a / b` as an 18-decimal fixed-point ratio, flooring.
pub fn ratio(a: U256, b: U256) -> U256 {
    mul_div(a, one(), b)
}

/// `n / d` as a percentage in 18-decimal fixed point.
///
/// A zero denominator yields exactly 100%, the Sale projector's rule for
/// `minimum_raise == 0`.
pub fn percent(n: U256, d: U256) -> U256 {
    if d.is_zero() {
        return hundred_percent();
    }
    mul_div(n, hundred_percent(), d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_div_floors() {
        // 10 * 3 / 4 = 7.5 -> 7
        assert_eq!(
            mul_div(U256::from(10), U256::from(3), U256::from(4)),
            U256::from(7)
        );
    }

    #[test]
    fn mul_div_zero_denominator() {
        assert_eq!(mul_div(U256::from(10), U256::from(3), U256::ZERO), U256::ZERO);
    }

    #[test]
    fn mul_div_survives_wide_intermediates() {
        // The 2^400 product overflows 256 bits; the quotient does not.
        let a = U256::from(1) << 200;
        let d = U256::from(1) << 190;
        assert_eq!(mul_div(a, a, d), U256::from(1) << 210);
    }

    #[test]
    fn mul_div_saturates_oversized_quotients() {
        assert_eq!(mul_div(U256::MAX, U256::MAX, U256::from(1)), U256::MAX);
    }

    #[test]
    fn ratio_scales_by_wad() {
        assert_eq!(ratio(U256::from(1), U256::from(2)), one() / U256::from(2));
    }

    #[test]
    fn percent_of_half_is_fifty() {
        let p = percent(U256::from(50), U256::from(100));
        assert_eq!(p, U256::from(50u64) * one());
    }

    #[test]
    fn percent_with_zero_denominator_is_exactly_hundred() {
        assert_eq!(percent(U256::from(12345), U256::ZERO), hundred_percent());
        assert_eq!(percent(U256::ZERO, U256::ZERO), hundred_percent());
    }
}

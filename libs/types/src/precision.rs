//! Exact Unit Conversion for On-Chain Amounts
//!
//! Dollar amounts and spot prices arrive as decimals; the ledger wants integer amounts in
//! the smallest unit (wei, 18 decimals). Every conversion here is performed on integers:
//!
//! ```text
//! n = n_m / 10^n_s        d = d_m / 10^d_s
//!
//! floor(n / d * 10^k) = floor(n_m * 10^(d_s + k) / (d_m * 10^n_s))
//! ```
//!
//! `rust_decimal` gives us the exact mantissa/scale of both operands, and `U256` holds the
//! widened product (at most 96 + 153 bits), so there is no intermediate rounding at all.
//!
//! ## Critical Rules
//!
//! 1. **NO FLOATING POINT**: never route a money value through f32/f64
//! 2. **Floor, not round**: the sender never pays more than the requested dollar value
//! 3. **Checked arithmetic**: overflow is an error, never a wrap

use ethers_core::types::U256;
use rust_decimal::Decimal;

use crate::errors::PrecisionError;

/// Decimal places of the base currency smallest unit (wei)
pub const WEI_DECIMALS: u32 = 18;

/// Decimal places between gwei and wei
pub const GWEI_DECIMALS: u32 = 9;

pub type Result<T> = std::result::Result<T, PrecisionError>;

/// Compute `floor(numerator / denominator * 10^decimals)` exactly.
pub fn scaled_quotient_floor(
    numerator: Decimal,
    denominator: Decimal,
    decimals: u32,
) -> Result<U256> {
    if numerator.is_sign_negative() && !numerator.is_zero() {
        return Err(PrecisionError::Negative(numerator.to_string()));
    }
    if denominator.is_zero() {
        return Err(PrecisionError::DivisionByZero);
    }
    if denominator.is_sign_negative() {
        return Err(PrecisionError::Negative(denominator.to_string()));
    }

    let numerator_mantissa = U256::from(numerator.mantissa().unsigned_abs());
    let denominator_mantissa = U256::from(denominator.mantissa().unsigned_abs());

    let scaled_numerator = numerator_mantissa
        .checked_mul(U256::exp10((denominator.scale() + decimals) as usize))
        .ok_or_else(|| PrecisionError::Overflow(format!("{numerator} * 10^{decimals}")))?;
    let scaled_denominator = denominator_mantissa
        .checked_mul(U256::exp10(numerator.scale() as usize))
        .ok_or_else(|| PrecisionError::Overflow(denominator.to_string()))?;

    // U256 division truncates, which is floor for non-negative operands
    Ok(scaled_numerator / scaled_denominator)
}

/// Convert a dollar amount into wei at the given USD-per-ether spot price.
pub fn dollars_to_wei(dollars: Decimal, usd_per_ether: Decimal) -> Result<U256> {
    scaled_quotient_floor(dollars, usd_per_ether, WEI_DECIMALS)
}

/// Convert a (possibly fractional) gwei fee rate into wei, flooring sub-wei remainders.
pub fn gwei_to_wei(gwei: Decimal) -> Result<U256> {
    scaled_quotient_floor(gwei, Decimal::ONE, GWEI_DECIMALS)
}

/// Exact sum of on-chain amounts.
pub fn checked_sum<'a, I>(amounts: I) -> Result<U256>
where
    I: IntoIterator<Item = &'a U256>,
{
    amounts.into_iter().try_fold(U256::zero(), |total, amount| {
        total
            .checked_add(*amount)
            .ok_or_else(|| PrecisionError::Overflow(format!("{total} + {amount}")))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_whole_dollars_at_round_price() {
        // $5 at $2500/ETH = 0.002 ETH
        let wei = dollars_to_wei(dec!(5), dec!(2500)).unwrap();
        assert_eq!(wei, U256::from(2_000_000_000_000_000u64));
    }

    #[test]
    fn test_non_terminating_quotient_is_floored() {
        // 1 / 3 ETH = 333333333333333333.33.. wei
        let wei = dollars_to_wei(dec!(1), dec!(3)).unwrap();
        assert_eq!(wei, U256::from(333_333_333_333_333_333u64));
    }

    #[test]
    fn test_fractional_price_and_amount() {
        // 2.5 / 1234.56 * 1e18 = 2025012960082944.08...
        let wei = dollars_to_wei(dec!(2.5), dec!(1234.56)).unwrap();
        assert_eq!(wei, U256::from(2_025_012_960_082_944u64));
    }

    #[test]
    fn test_zero_dollars_is_zero_wei() {
        assert_eq!(dollars_to_wei(dec!(0), dec!(3000)).unwrap(), U256::zero());
    }

    #[test]
    fn test_zero_price_is_rejected() {
        assert_eq!(
            dollars_to_wei(dec!(5), Decimal::ZERO),
            Err(PrecisionError::DivisionByZero)
        );
    }

    #[test]
    fn test_negative_inputs_are_rejected() {
        assert!(matches!(
            dollars_to_wei(dec!(-1), dec!(3000)),
            Err(PrecisionError::Negative(_))
        ));
        assert!(matches!(
            dollars_to_wei(dec!(1), dec!(-3000)),
            Err(PrecisionError::Negative(_))
        ));
    }

    #[test]
    fn test_gwei_to_wei() {
        assert_eq!(gwei_to_wei(dec!(10)).unwrap(), U256::from(10_000_000_000u64));
        assert_eq!(gwei_to_wei(dec!(1.5)).unwrap(), U256::from(1_500_000_000u64));
        // Sub-wei remainder is dropped
        assert_eq!(gwei_to_wei(dec!(0.0000000015)).unwrap(), U256::from(1u64));
    }

    #[test]
    fn test_checked_sum() {
        let amounts = vec![U256::from(1u64), U256::from(2u64), U256::from(3u64)];
        assert_eq!(checked_sum(&amounts).unwrap(), U256::from(6u64));
        assert_eq!(checked_sum(&Vec::<U256>::new()).unwrap(), U256::zero());

        let overflowing = vec![U256::MAX, U256::one()];
        assert!(matches!(
            checked_sum(&overflowing),
            Err(PrecisionError::Overflow(_))
        ));
    }
}

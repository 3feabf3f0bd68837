use bigdecimal::num_bigint::{BigInt, BigUint};
use bigdecimal::BigDecimal;

/// Number of wei in one gwei.
pub const WEI_PER_GWEI: u64 = 1_000_000_000;

pub fn to_decimal(value: &BigUint) -> BigDecimal {
    BigDecimal::new(BigInt::from(value.clone()), 0)
}

/// Integer part of `value`, rounding toward zero. `value` must not be negative.
pub fn truncate(value: &BigDecimal) -> BigUint {
    let (integer, _) = value.with_scale(0).into_bigint_and_exponent();
    let (_, magnitude) = integer.into_parts();

    magnitude
}

/// Converts a wei amount into gwei, dropping the remainder.
pub fn wei_to_gwei(amount: &BigUint) -> BigUint {
    amount / BigUint::from(WEI_PER_GWEI)
}

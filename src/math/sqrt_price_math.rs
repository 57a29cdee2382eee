//! Sqrt Price Math
//!
//! Token amount deltas between two sqrt prices at constant liquidity, and
//! the inverse (next price after an input/output amount). Rounding always
//! favours the pool: amounts in round up, amounts out round down, and next
//! prices round so the trader never gets more than the curve allows.

use alloy::primitives::U256;

use super::full_math::{div_rounding_up, mul_div, mul_div_rounding_up};
use super::{Q96, RESOLUTION, U160_MAX};
use crate::error::{SimError, SimResult};

/// Next price after adding/removing `amount` of token0. Rounds up.
///
/// new = L * sqrtP / (L + amount * sqrtP), with a fallback form
/// L / (L / sqrtP + amount) when the product overflows.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> SimResult<U256> {
    if amount.is_zero() {
        return Ok(sqrt_price_x96);
    }
    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let product = amount.checked_mul(sqrt_price_x96);

    if add {
        if let Some(product) = product {
            if let Some(denominator) = numerator1.checked_add(product) {
                return mul_div_rounding_up(numerator1, sqrt_price_x96, denominator);
            }
        }
        let denominator = (numerator1 / sqrt_price_x96)
            .checked_add(amount)
            .ok_or(SimError::AmountOverflow)?;
        div_rounding_up(numerator1, denominator)
    } else {
        // Removing token0 the pool does not hold
        let product = product.ok_or(SimError::InsufficientLiquidity)?;
        if numerator1 <= product {
            return Err(SimError::InsufficientLiquidity);
        }
        mul_div_rounding_up(numerator1, sqrt_price_x96, numerator1 - product)
    }
}

/// Next price after adding/removing `amount` of token1. Rounds down.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount: U256,
    add: bool,
) -> SimResult<U256> {
    let liquidity = U256::from(liquidity);
    if liquidity.is_zero() {
        return Err(SimError::DivisionByZero);
    }

    if add {
        let quotient = if amount <= U160_MAX {
            (amount << RESOLUTION) / liquidity
        } else {
            mul_div(amount, Q96, liquidity)?
        };
        let next = sqrt_price_x96
            .checked_add(quotient)
            .ok_or(SimError::AmountOverflow)?;
        if next > U160_MAX {
            return Err(SimError::InvalidSqrtPrice(next));
        }
        Ok(next)
    } else {
        let quotient = if amount <= U160_MAX {
            div_rounding_up(amount << RESOLUTION, liquidity)?
        } else {
            mul_div_rounding_up(amount, Q96, liquidity)?
        };
        if sqrt_price_x96 <= quotient {
            return Err(SimError::InsufficientLiquidity);
        }
        Ok(sqrt_price_x96 - quotient)
    }
}

/// Next price after `amount_in` enters the pool in the given direction.
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_in: U256,
    zero_for_one: bool,
) -> SimResult<U256> {
    if sqrt_price_x96.is_zero() {
        return Err(SimError::InvalidSqrtPrice(sqrt_price_x96));
    }
    if liquidity == 0 {
        return Err(SimError::InsufficientLiquidity);
    }
    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x96, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x96, liquidity, amount_in, true)
    }
}

/// Next price after `amount_out` leaves the pool in the given direction.
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x96: U256,
    liquidity: u128,
    amount_out: U256,
    zero_for_one: bool,
) -> SimResult<U256> {
    if sqrt_price_x96.is_zero() {
        return Err(SimError::InvalidSqrtPrice(sqrt_price_x96));
    }
    if liquidity == 0 {
        return Err(SimError::InsufficientLiquidity);
    }
    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x96, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x96, liquidity, amount_out, false)
    }
}

/// Token0 between two prices: L * (sqrtB - sqrtA) / (sqrtA * sqrtB).
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> SimResult<U256> {
    let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    if lower.is_zero() {
        return Err(SimError::InvalidSqrtPrice(lower));
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = upper - lower;

    if round_up {
        div_rounding_up(mul_div_rounding_up(numerator1, numerator2, upper)?, lower)
    } else {
        Ok(mul_div(numerator1, numerator2, upper)? / lower)
    }
}

/// Token1 between two prices: L * (sqrtB - sqrtA).
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> SimResult<U256> {
    let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, upper - lower, Q96)
    } else {
        mul_div(liquidity, upper - lower, Q96)
    }
}

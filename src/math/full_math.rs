//! 512-bit mulDiv (Uniswap FullMath)
//!
//! `a * b / d` without losing the high half of the product. The
//! algorithm is Remco Bloemen's: split the product into two limbs, factor
//! powers of two out of the denominator, and invert it mod 2^256 with
//! Newton-Raphson.

use alloy::primitives::U256;

use crate::error::{SimError, SimResult};

const TWO: U256 = U256::from_limbs([2, 0, 0, 0]);
const THREE: U256 = U256::from_limbs([3, 0, 0, 0]);

/// `floor(a * b / denominator)` with a full 512-bit intermediate.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> SimResult<U256> {
    if denominator.is_zero() {
        return Err(SimError::DivisionByZero);
    }

    // [prod1 prod0] = a * b
    let mm = a.mul_mod(b, U256::MAX);
    let mut prod0 = a.wrapping_mul(b);
    let (mut prod1, borrow) = mm.overflowing_sub(prod0);
    if borrow {
        prod1 = prod1.wrapping_sub(U256::ONE);
    }

    if prod1.is_zero() {
        return Ok(prod0.wrapping_div(denominator));
    }

    if denominator <= prod1 {
        return Err(SimError::MulDivOverflow);
    }

    // Make the division exact by subtracting the remainder
    let remainder = a.mul_mod(b, denominator);
    let (sub, borrow) = prod0.overflowing_sub(remainder);
    prod0 = sub;
    if borrow {
        prod1 = prod1.wrapping_sub(U256::ONE);
    }

    // Largest power of two dividing the denominator
    let twos = denominator & denominator.wrapping_neg();
    let denominator = denominator.wrapping_div(twos);
    prod0 = prod0.wrapping_div(twos);

    // Shift bits from prod1 into prod0
    let flip = twos.wrapping_neg().wrapping_div(twos).wrapping_add(U256::ONE);
    prod0 |= prod1.wrapping_mul(flip);

    // Inverse mod 2^256, correct to 4 bits then doubled six times
    let mut inv = THREE.wrapping_mul(denominator) ^ TWO;
    for _ in 0..6 {
        inv = inv.wrapping_mul(TWO.wrapping_sub(denominator.wrapping_mul(inv)));
    }

    Ok(prod0.wrapping_mul(inv))
}

/// `ceil(a * b / denominator)`.
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> SimResult<U256> {
    let result = mul_div(a, b, denominator)?;
    if a.mul_mod(b, denominator).is_zero() {
        return Ok(result);
    }
    result.checked_add(U256::ONE).ok_or(SimError::MulDivOverflow)
}

/// `ceil(a / b)`.
pub fn div_rounding_up(a: U256, b: U256) -> SimResult<U256> {
    if b.is_zero() {
        return Err(SimError::DivisionByZero);
    }
    let (quotient, remainder) = a.div_rem(b);
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::ONE)
    }
}

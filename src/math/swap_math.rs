//! Single Swap Step
//!
//! One segment of a swap at constant liquidity: from the current price
//! toward a target (next initialized tick or the caller's limit), consuming
//! as much of the remaining amount as the segment allows.

use alloy::primitives::{I256, U256};

use super::full_math::{mul_div, mul_div_rounding_up};
use super::sqrt_price_math::{
    get_amount_0_delta, get_amount_1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use super::FEE_DENOMINATOR;
use crate::error::{SimError, SimResult};

/// Result of a swap step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwapStep {
    /// Price after the step, never past the target
    pub sqrt_price_next: U256,
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_amount: U256,
}

/// Compute one swap step.
///
/// `amount_remaining` is positive for exact input and negative for exact
/// output. Direction is implied by the relative order of current and
/// target price.
pub fn compute_swap_step(
    sqrt_price_current: U256,
    sqrt_price_target: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> SimResult<SwapStep> {
    if fee_pips >= FEE_DENOMINATOR {
        return Err(SimError::InvalidFee(fee_pips));
    }
    let zero_for_one = sqrt_price_current >= sqrt_price_target;
    let exact_in = !amount_remaining.is_negative();
    let remaining = amount_remaining.unsigned_abs();
    let fee = U256::from(fee_pips);
    let denominator = U256::from(FEE_DENOMINATOR);

    let mut step = SwapStep::default();

    if exact_in {
        let remaining_less_fee = mul_div(remaining, denominator - fee, denominator)?;
        step.amount_in = if zero_for_one {
            get_amount_0_delta(sqrt_price_target, sqrt_price_current, liquidity, true)?
        } else {
            get_amount_1_delta(sqrt_price_current, sqrt_price_target, liquidity, true)?
        };
        step.sqrt_price_next = if remaining_less_fee >= step.amount_in {
            sqrt_price_target
        } else {
            get_next_sqrt_price_from_input(
                sqrt_price_current,
                liquidity,
                remaining_less_fee,
                zero_for_one,
            )?
        };
    } else {
        step.amount_out = if zero_for_one {
            get_amount_1_delta(sqrt_price_target, sqrt_price_current, liquidity, false)?
        } else {
            get_amount_0_delta(sqrt_price_current, sqrt_price_target, liquidity, false)?
        };
        step.sqrt_price_next = if remaining >= step.amount_out {
            sqrt_price_target
        } else {
            get_next_sqrt_price_from_output(sqrt_price_current, liquidity, remaining, zero_for_one)?
        };
    }

    // Reached the target: the precomputed side is already exact
    let max = sqrt_price_target == step.sqrt_price_next;

    if zero_for_one {
        if !(max && exact_in) {
            step.amount_in =
                get_amount_0_delta(step.sqrt_price_next, sqrt_price_current, liquidity, true)?;
        }
        if !(max && !exact_in) {
            step.amount_out =
                get_amount_1_delta(step.sqrt_price_next, sqrt_price_current, liquidity, false)?;
        }
    } else {
        if !(max && exact_in) {
            step.amount_in =
                get_amount_1_delta(sqrt_price_current, step.sqrt_price_next, liquidity, true)?;
        }
        if !(max && !exact_in) {
            step.amount_out =
                get_amount_0_delta(sqrt_price_current, step.sqrt_price_next, liquidity, false)?;
        }
    }

    if !exact_in && step.amount_out > remaining {
        step.amount_out = remaining;
    }

    step.fee_amount = if exact_in && step.sqrt_price_next != sqrt_price_target {
        // Target not reached: the dust left over is the fee
        remaining - step.amount_in
    } else {
        mul_div_rounding_up(step.amount_in, fee, denominator - fee)?
    };

    Ok(step)
}

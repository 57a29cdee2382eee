//! Sandwich Profitability Evaluator
//!
//! Purpose:
//!     Chains three exact swap simulations against one pool snapshot:
//!     attacker buy (A->B), victim buy (A->B), attacker sell (B->A), and
//!     reports the attacker's net result in token A.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - The victim's amountOutMinimum is enforced after the front-run; if it
//!       would revert on-chain the whole plan is aborted with zero profit
//!     - A front-run that drives the price to the end of its range leaves the
//!       victim nothing (its swap reverts on-chain); that is the same abort
//!     - Each leg consumes only the previous leg's end state, so an outcome can
//!       be reproduced from (state, ticks, plan) alone

use alloy::primitives::{I256, U256};
use rust_decimal::Decimal;

use crate::error::{SimError, SimResult};
use crate::pool::simulator::{is_price_exhausted, simulate, SwapDirection, SwapRequest};
use crate::pool::state::PoolState;
use crate::pool::tick_store::TickStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Victim's minimum output would not be met after the front-run
    VictimSlippageExceeded,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::VictimSlippageExceeded => write!(f, "victim slippage exceeded"),
        }
    }
}

/// Amounts are raw token units. Attacker budget and victim input are both
/// in the victim's input token (A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandwichPlan {
    pub attacker_budget: U256,
    pub victim_amount_in: U256,
    pub victim_minimum_out: U256,
    /// Direction of the victim's (and the front-run's) trade
    pub direction: SwapDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandwichOutcome {
    pub aborted: bool,
    pub abort_reason: Option<AbortReason>,
    /// attacker_amount_received - attacker_budget, in token A
    pub profit: I256,
    /// Token B bought by the front-run, sold back by the back-run
    pub attacker_tokens_to_resell: U256,
    pub victim_amount_out: U256,
    pub attacker_amount_received: U256,
    /// Pool state after the last simulated leg
    pub end_state: PoolState,
}

impl SandwichOutcome {
    pub fn is_profitable(&self) -> bool {
        !self.aborted && self.profit > I256::ZERO
    }

    /// Profit in whole token A units (e.g. WETH, not wei).
    /// None if the raw value does not fit a Decimal.
    pub fn profit_in_units(&self, decimals: u8) -> Option<Decimal> {
        let magnitude = u128::try_from(self.profit.unsigned_abs()).ok()?;
        let magnitude = i128::try_from(magnitude).ok()?;
        let value = Decimal::try_from_i128_with_scale(magnitude, decimals as u32).ok()?;
        Some(if self.profit.is_negative() { -value } else { value })
    }
}

fn signed(value: U256) -> SimResult<I256> {
    I256::try_from(value).map_err(|_| SimError::AmountOverflow)
}

/// Evaluate a sandwich around the victim's trade.
pub fn evaluate(
    initial: &PoolState,
    ticks: &TickStore,
    plan: &SandwichPlan,
) -> SimResult<SandwichOutcome> {
    let buy = plan.direction;

    let front_run = simulate(
        initial,
        &SwapRequest::exact_in(plan.attacker_budget, buy)?,
        ticks,
    )?;
    let attacker_bought = front_run.amount_out;

    if !plan.victim_amount_in.is_zero() && is_price_exhausted(&front_run.end_state, buy) {
        return Ok(SandwichOutcome {
            aborted: true,
            abort_reason: Some(AbortReason::VictimSlippageExceeded),
            profit: I256::ZERO,
            attacker_tokens_to_resell: attacker_bought,
            victim_amount_out: U256::ZERO,
            attacker_amount_received: U256::ZERO,
            end_state: front_run.end_state,
        });
    }

    let victim = simulate(
        &front_run.end_state,
        &SwapRequest::exact_in(plan.victim_amount_in, buy)?,
        ticks,
    )?;

    if victim.amount_out < plan.victim_minimum_out {
        return Ok(SandwichOutcome {
            aborted: true,
            abort_reason: Some(AbortReason::VictimSlippageExceeded),
            profit: I256::ZERO,
            attacker_tokens_to_resell: attacker_bought,
            victim_amount_out: victim.amount_out,
            attacker_amount_received: U256::ZERO,
            end_state: victim.end_state,
        });
    }

    let back_run = simulate(
        &victim.end_state,
        &SwapRequest::exact_in(attacker_bought, buy.reverse())?,
        ticks,
    )?;
    let received = back_run.amount_out;

    Ok(SandwichOutcome {
        aborted: false,
        abort_reason: None,
        profit: signed(received)? - signed(plan.attacker_budget)?,
        attacker_tokens_to_resell: attacker_bought,
        victim_amount_out: victim.amount_out,
        attacker_amount_received: received,
        end_state: back_run.end_state,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::{MIN_SQRT_RATIO, MIN_TICK};
    use rust_decimal_macros::dec;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn int(v: u64) -> I256 {
        I256::from_raw(U256::from(v))
    }

    fn pool(liquidity: u128) -> (PoolState, TickStore) {
        (
            PoolState::at_tick(0, liquidity, 3000, 60).unwrap(),
            TickStore::full_range(liquidity, 60).unwrap(),
        )
    }

    fn plan(budget: u128, victim_in: u128, min_out: u128, direction: SwapDirection) -> SandwichPlan {
        SandwichPlan {
            attacker_budget: U256::from(budget),
            victim_amount_in: U256::from(victim_in),
            victim_minimum_out: U256::from(min_out),
            direction,
        }
    }

    #[test]
    fn test_profitable_sandwich() {
        let (state, ticks) = pool(E18);
        let plan = plan(10u128.pow(16), 10u128.pow(17), 0, SwapDirection::ZeroForOne);
        let outcome = evaluate(&state, &ticks, &plan).unwrap();

        assert!(!outcome.aborted);
        assert!(outcome.is_profitable());
        assert_eq!(outcome.profit, int(1_988_150_076_494_883));
        assert_eq!(outcome.attacker_tokens_to_resell, U256::from(9_871_580_343_970_612u64));
        assert_eq!(outcome.victim_amount_out, U256::from(88_959_603_701_736_669u64));
        assert_eq!(outcome.attacker_amount_received, U256::from(11_988_150_076_494_883u64));
    }

    #[test]
    fn test_tokens_to_resell_equal_front_run_output() {
        let (state, ticks) = pool(E18);
        let plan = plan(10u128.pow(16), 10u128.pow(17), 0, SwapDirection::OneForZero);
        let outcome = evaluate(&state, &ticks, &plan).unwrap();

        let front_run = simulate(
            &state,
            &SwapRequest::exact_in(plan.attacker_budget, plan.direction).unwrap(),
            &ticks,
        )
        .unwrap();
        assert_eq!(outcome.attacker_tokens_to_resell, front_run.amount_out);
        assert!(outcome.is_profitable());
    }

    #[test]
    fn test_aborts_when_victim_minimum_not_met() {
        let (state, ticks) = pool(E18);
        // Baseline victim output is 90_661_089_388_014_913; front-run pushes it below 9e16
        let plan = plan(10u128.pow(16), 10u128.pow(17), 9 * 10u128.pow(16), SwapDirection::ZeroForOne);
        let outcome = evaluate(&state, &ticks, &plan).unwrap();

        assert!(outcome.aborted);
        assert_eq!(outcome.abort_reason, Some(AbortReason::VictimSlippageExceeded));
        assert_eq!(outcome.profit, I256::ZERO);
        assert_eq!(outcome.victim_amount_out, U256::from(88_959_603_701_736_669u64));
        assert!(!outcome.is_profitable());
    }

    #[test]
    fn test_zero_budget_leaves_victim_unharmed() {
        let (state, ticks) = pool(E18);
        let plan = plan(0, 10u128.pow(17), 9 * 10u128.pow(16), SwapDirection::ZeroForOne);
        let outcome = evaluate(&state, &ticks, &plan).unwrap();

        assert!(!outcome.aborted);
        assert_eq!(outcome.profit, I256::ZERO);
        assert_eq!(outcome.attacker_tokens_to_resell, U256::ZERO);
        assert_eq!(outcome.victim_amount_out, U256::from(90_661_089_388_014_913u64));
    }

    #[test]
    fn test_front_run_never_improves_victim_price() {
        let (state, ticks) = pool(E18);
        let victim_out = |budget: u128| {
            evaluate(&state, &ticks, &plan(budget, 10u128.pow(17), 0, SwapDirection::ZeroForOne))
                .unwrap()
                .victim_amount_out
        };
        let baseline = victim_out(0);
        let mut previous = baseline;
        for budget in [10u128.pow(14), 10u128.pow(15), 10u128.pow(16), 10u128.pow(17), E18] {
            let out = victim_out(budget);
            assert!(out <= baseline, "budget {} improved victim output", budget);
            assert!(out <= previous);
            previous = out;
        }
    }

    #[test]
    fn test_slippage_abort_holds_for_any_budget() {
        let (state, ticks) = pool(E18);
        for budget in [0u128, 10u128.pow(15), 10u128.pow(17)] {
            // Minimum one wei above whatever the victim gets after this front-run
            let probe = evaluate(&state, &ticks, &plan(budget, 10u128.pow(17), 0, SwapDirection::ZeroForOne)).unwrap();
            let strict = SandwichPlan {
                victim_minimum_out: probe.victim_amount_out + U256::ONE,
                ..plan(budget, 10u128.pow(17), 0, SwapDirection::ZeroForOne)
            };
            let outcome = evaluate(&state, &ticks, &strict).unwrap();
            assert_eq!(outcome.abort_reason, Some(AbortReason::VictimSlippageExceeded));
        }
    }

    #[test]
    fn test_tiny_victim_is_not_worth_sandwiching() {
        // Victim impact (500 / 1e9) is far below the 0.3% fee paid twice
        let (state, ticks) = pool(1_000_000_000);
        let outcome = evaluate(&state, &ticks, &plan(1_000, 500, 0, SwapDirection::ZeroForOne)).unwrap();

        assert!(!outcome.aborted);
        assert_eq!(outcome.attacker_tokens_to_resell, U256::from(996u32));
        assert_eq!(outcome.attacker_amount_received, U256::from(993u32));
        assert_eq!(outcome.profit, -int(7));
        assert!(!outcome.is_profitable());
    }

    #[test]
    fn test_front_run_draining_the_pool_aborts() {
        let (state, ticks) = pool(1_000_000_000);
        let budget = U256::from(10u64).pow(U256::from(40u64));
        for (direction, min_out) in [
            (SwapDirection::ZeroForOne, 1u128),
            (SwapDirection::ZeroForOne, 0),
            (SwapDirection::OneForZero, 1),
        ] {
            let plan = SandwichPlan {
                attacker_budget: budget,
                ..plan(0, 500, min_out, direction)
            };
            let outcome = evaluate(&state, &ticks, &plan).unwrap();

            assert!(outcome.aborted);
            assert_eq!(outcome.abort_reason, Some(AbortReason::VictimSlippageExceeded));
            assert_eq!(outcome.victim_amount_out, U256::ZERO);
            assert_eq!(outcome.profit, I256::ZERO);
            assert!(is_price_exhausted(&outcome.end_state, direction));
        }
    }

    #[test]
    fn test_pool_already_at_price_bound_aborts() {
        // Below the full range, so no active liquidity
        let state = PoolState::new(MIN_SQRT_RATIO + U256::ONE, MIN_TICK, 0, 3000, 60).unwrap();
        let ticks = TickStore::full_range(E18, 60).unwrap();

        let outcome = evaluate(&state, &ticks, &plan(0, 10u128.pow(17), 0, SwapDirection::ZeroForOne)).unwrap();
        assert_eq!(outcome.abort_reason, Some(AbortReason::VictimSlippageExceeded));
        assert_eq!(outcome.end_state, state);

        // The other direction still trades normally
        let outcome = evaluate(&state, &ticks, &plan(0, 10u128.pow(17), 0, SwapDirection::OneForZero)).unwrap();
        assert!(!outcome.aborted);
        assert!(outcome.victim_amount_out > U256::ZERO);
    }

    #[test]
    fn test_profit_in_units() {
        let (state, ticks) = pool(E18);
        let outcome = evaluate(&state, &ticks, &plan(10u128.pow(16), 10u128.pow(17), 0, SwapDirection::ZeroForOne)).unwrap();
        assert_eq!(outcome.profit_in_units(18), Some(dec!(0.001988150076494883)));

        let (state, ticks) = pool(1_000_000_000);
        let loss = evaluate(&state, &ticks, &plan(1_000, 500, 0, SwapDirection::ZeroForOne)).unwrap();
        assert_eq!(loss.profit_in_units(6), Some(dec!(-0.000007)));
    }

    #[test]
    fn test_simulation_errors_propagate() {
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let ticks = TickStore::full_range(E18, 10).unwrap();
        let r = evaluate(&state, &ticks, &plan(1, 1, 0, SwapDirection::ZeroForOne));
        assert_eq!(r, Err(SimError::InvalidTickSpacing(10)));
    }
}

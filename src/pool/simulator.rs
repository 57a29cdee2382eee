//! V3 Swap Simulator (multi-tick)
//!
//! Purpose:
//!     Exact off-chain replica of UniswapV3Pool.swap(): walks the tick bitmap
//!     word by word, runs one swap step per segment of constant liquidity and
//!     crosses initialized ticks, returning realized amounts and the new state.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - Pure: takes a PoolState by reference and a TickStore snapshot, returns
//!       a fresh PoolState inside SwapResult
//!     - Iterations are bounded by the number of bitmap words spanning the full
//!       tick range plus the initialized tick count; exceeding that means the
//!       input data is corrupt (SwapDidNotConverge). A consistent TickStore
//!       never hits it; `simulate_with_step_limit` exists to exercise the bound
//!     - Zero amount is a no-op (unlike the contract, which reverts)

use alloy::primitives::{I256, U256};

use super::state::PoolState;
use super::tick_store::TickStore;
use crate::error::{SimError, SimResult};
use crate::math::liquidity_math::add_delta;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{
    sqrt_price_for_tick, tick_for_sqrt_price, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapDirection {
    /// token0 in, token1 out (price moves down)
    ZeroForOne,
    /// token1 in, token0 out (price moves up)
    OneForZero,
}

impl SwapDirection {
    pub fn zero_for_one(self) -> bool {
        matches!(self, Self::ZeroForOne)
    }

    pub fn reverse(self) -> Self {
        match self {
            Self::ZeroForOne => Self::OneForZero,
            Self::OneForZero => Self::ZeroForOne,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    /// Positive: exact input. Negative: exact output.
    pub amount_specified: I256,
    pub direction: SwapDirection,
    /// Defaults to the extreme price in the swap direction
    pub sqrt_price_limit_x96: Option<U256>,
}

impl SwapRequest {
    pub fn exact_in(amount: U256, direction: SwapDirection) -> SimResult<Self> {
        let amount_specified = I256::from_raw(amount);
        if amount_specified.is_negative() {
            return Err(SimError::AmountOverflow);
        }
        Ok(Self {
            amount_specified,
            direction,
            sqrt_price_limit_x96: None,
        })
    }

    pub fn exact_out(amount: U256, direction: SwapDirection) -> SimResult<Self> {
        let magnitude = I256::from_raw(amount);
        if magnitude.is_negative() {
            return Err(SimError::AmountOverflow);
        }
        Ok(Self {
            amount_specified: -magnitude,
            direction,
            sqrt_price_limit_x96: None,
        })
    }

    pub fn with_price_limit(mut self, sqrt_price_limit_x96: U256) -> Self {
        self.sqrt_price_limit_x96 = Some(sqrt_price_limit_x96);
        self
    }

    pub fn is_exact_input(&self) -> bool {
        !self.amount_specified.is_negative()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapResult {
    /// Total paid in, fees included
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee_paid: U256,
    pub ticks_crossed: u32,
    pub end_state: PoolState,
}

/// Upper bound on loop iterations for a well-formed snapshot.
fn max_swap_steps(ticks: &TickStore) -> usize {
    let compressed_span = (2 * MAX_TICK / ticks.tick_spacing()) as usize;
    compressed_span / 256 + 2 + 2 * ticks.len() + 2
}

/// True when the price already sits at the furthest point a swap in
/// `direction` may reach; any non-zero swap that way reverts on-chain.
pub fn is_price_exhausted(state: &PoolState, direction: SwapDirection) -> bool {
    if direction.zero_for_one() {
        state.sqrt_price_x96 <= MIN_SQRT_RATIO + U256::ONE
    } else {
        state.sqrt_price_x96 >= MAX_SQRT_RATIO - U256::ONE
    }
}

fn resolve_price_limit(state: &PoolState, request: &SwapRequest) -> SimResult<U256> {
    let zero_for_one = request.direction.zero_for_one();
    let limit = match request.sqrt_price_limit_x96 {
        Some(limit) => limit,
        None if zero_for_one => MIN_SQRT_RATIO + U256::ONE,
        None => MAX_SQRT_RATIO - U256::ONE,
    };
    let valid = if zero_for_one {
        limit < state.sqrt_price_x96 && limit > MIN_SQRT_RATIO
    } else {
        limit > state.sqrt_price_x96 && limit < MAX_SQRT_RATIO
    };
    if valid {
        Ok(limit)
    } else {
        Err(SimError::InvalidPriceLimit)
    }
}

/// Simulate a swap against `state` using the initialized ticks in `ticks`.
pub fn simulate(state: &PoolState, request: &SwapRequest, ticks: &TickStore) -> SimResult<SwapResult> {
    simulate_with_step_limit(state, request, ticks, max_swap_steps(ticks))
}

pub(crate) fn simulate_with_step_limit(
    state: &PoolState,
    request: &SwapRequest,
    ticks: &TickStore,
    max_steps: usize,
) -> SimResult<SwapResult> {
    state.validate()?;
    if ticks.tick_spacing() != state.tick_spacing {
        return Err(SimError::InvalidTickSpacing(ticks.tick_spacing()));
    }
    if request.amount_specified == I256::MIN {
        return Err(SimError::AmountOverflow);
    }

    let mut result = SwapResult {
        amount_in: U256::ZERO,
        amount_out: U256::ZERO,
        fee_paid: U256::ZERO,
        ticks_crossed: 0,
        end_state: *state,
    };
    if request.amount_specified.is_zero() {
        return Ok(result);
    }

    let zero_for_one = request.direction.zero_for_one();
    let exact_in = request.is_exact_input();
    let limit = resolve_price_limit(state, request)?;

    let mut remaining = request.amount_specified.unsigned_abs();
    let mut sqrt_price = state.sqrt_price_x96;
    let mut tick = state.tick;
    let mut liquidity = state.liquidity;
    let mut steps = 0usize;

    while !remaining.is_zero() && sqrt_price != limit {
        steps += 1;
        if steps > max_steps {
            return Err(SimError::SwapDidNotConverge(max_steps));
        }

        let sqrt_price_start = sqrt_price;
        let (tick_next, initialized) =
            ticks.next_initialized_tick_within_one_word(tick, zero_for_one)?;
        let tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);
        let sqrt_price_next = sqrt_price_for_tick(tick_next)?;

        let target = if zero_for_one {
            sqrt_price_next.max(limit)
        } else {
            sqrt_price_next.min(limit)
        };

        // remaining < 2^255 here, so the raw cast keeps its sign
        let signed_remaining = if exact_in {
            I256::from_raw(remaining)
        } else {
            -I256::from_raw(remaining)
        };
        let step = compute_swap_step(sqrt_price, target, liquidity, signed_remaining, state.fee_pips)?;
        sqrt_price = step.sqrt_price_next;

        let paid = step.amount_in + step.fee_amount;
        let consumed = if exact_in { paid } else { step.amount_out };
        remaining = remaining.checked_sub(consumed).ok_or(SimError::AmountOverflow)?;
        result.amount_in = result.amount_in.checked_add(paid).ok_or(SimError::AmountOverflow)?;
        result.amount_out = result
            .amount_out
            .checked_add(step.amount_out)
            .ok_or(SimError::AmountOverflow)?;
        result.fee_paid += step.fee_amount;

        if sqrt_price == sqrt_price_next {
            if initialized {
                let net = ticks.get_tick(tick_next)?.liquidity_net;
                let net = if zero_for_one {
                    net.checked_neg().ok_or(SimError::InsufficientLiquidity)?
                } else {
                    net
                };
                liquidity = add_delta(liquidity, net)?;
                result.ticks_crossed += 1;
            }
            tick = if zero_for_one { tick_next - 1 } else { tick_next };
        } else if sqrt_price != sqrt_price_start {
            tick = tick_for_sqrt_price(sqrt_price)?;
        }
    }

    result.end_state = PoolState {
        sqrt_price_x96: sqrt_price,
        tick,
        liquidity,
        ..*state
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::sqrt_price_math::{get_amount_1_delta, get_next_sqrt_price_from_input};
    use crate::math::full_math::mul_div;
    use crate::pool::tick_store::Tick;

    const E18: u128 = 1_000_000_000_000_000_000;

    fn u(s: &str) -> U256 {
        s.parse().unwrap()
    }

    /// Full-range L1 plus a concentrated [-600, 600] position of L2
    fn layered_pool() -> (PoolState, TickStore) {
        let l1 = E18;
        let l2 = 2 * E18;
        let ticks = TickStore::new(
            [
                Tick::new(-887220, l1 as i128, l1),
                Tick::new(887220, -(l1 as i128), l1),
                Tick::new(-600, l2 as i128, l2),
                Tick::new(600, -(l2 as i128), l2),
            ],
            60,
        )
        .unwrap();
        (PoolState::at_tick(0, l1 + l2, 3000, 60).unwrap(), ticks)
    }

    fn exact_in(amount: u128, direction: SwapDirection) -> SwapRequest {
        SwapRequest::exact_in(U256::from(amount), direction).unwrap()
    }

    #[test]
    fn test_single_range_matches_closed_form() {
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let ticks = TickStore::full_range(E18, 60).unwrap();
        let amount = U256::from(10u64.pow(15));

        let result = simulate(&state, &exact_in(10u128.pow(15), SwapDirection::ZeroForOne), &ticks).unwrap();

        let less_fee = mul_div(amount, U256::from(997_000u32), U256::from(1_000_000u32)).unwrap();
        let next = get_next_sqrt_price_from_input(state.sqrt_price_x96, E18, less_fee, true).unwrap();
        let out = get_amount_1_delta(next, state.sqrt_price_x96, E18, false).unwrap();

        assert_eq!(result.end_state.sqrt_price_x96, next);
        assert_eq!(result.amount_out, out);
        assert_eq!(result.amount_out, U256::from(996_006_981_039_903u64));
        assert_eq!(result.amount_in, amount);
        assert_eq!(result.end_state.tick, -20);
        assert_eq!(result.end_state.liquidity, E18);
        assert_eq!(result.ticks_crossed, 0);
    }

    #[test]
    fn test_input_state_untouched() {
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let before = state;
        let ticks = TickStore::full_range(E18, 60).unwrap();
        let _ = simulate(&state, &exact_in(10u128.pow(15), SwapDirection::OneForZero), &ticks).unwrap();
        assert_eq!(state, before);
    }

    #[test]
    fn test_crosses_initialized_tick_downward() {
        let (state, ticks) = layered_pool();
        let r = simulate(&state, &exact_in(2 * 10u128.pow(17), SwapDirection::ZeroForOne), &ticks).unwrap();

        assert_eq!(r.amount_in, U256::from(2 * 10u64.pow(17)));
        assert_eq!(r.amount_out, U256::from(180_752_706_255_611_292u64));
        assert_eq!(r.ticks_crossed, 1);
        assert_eq!(r.end_state.liquidity, E18);
        assert_eq!(r.end_state.tick, -2595);
        assert_eq!(r.end_state.sqrt_price_x96, u("69590319225587885248916741401"));
    }

    #[test]
    fn test_crosses_initialized_tick_upward() {
        let (state, ticks) = layered_pool();
        let r = simulate(&state, &exact_in(2 * 10u128.pow(17), SwapDirection::OneForZero), &ticks).unwrap();

        assert_eq!(r.amount_out, U256::from(180_752_706_255_611_292u64));
        assert_eq!(r.ticks_crossed, 1);
        assert_eq!(r.end_state.liquidity, E18);
        assert_eq!(r.end_state.tick, 2594);
    }

    #[test]
    fn test_small_swap_stays_in_range() {
        let (state, ticks) = layered_pool();
        let r = simulate(&state, &exact_in(10u128.pow(16), SwapDirection::ZeroForOne), &ticks).unwrap();
        assert_eq!(r.amount_out, U256::from(9_936_976_116_041_023u64));
        assert_eq!(r.end_state.tick, -67);
        assert_eq!(r.end_state.liquidity, 3 * E18);
        assert_eq!(r.ticks_crossed, 0);
    }

    #[test]
    fn test_exact_output_across_tick() {
        let (state, ticks) = layered_pool();
        let request = SwapRequest::exact_out(U256::from(2 * 10u64.pow(17)), SwapDirection::ZeroForOne).unwrap();
        let r = simulate(&state, &request, &ticks).unwrap();

        assert_eq!(r.amount_out, U256::from(2 * 10u64.pow(17)));
        assert_eq!(r.amount_in, U256::from(225_583_414_539_651_717u64));
        assert_eq!(r.end_state.tick, -3038);
        assert_eq!(r.ticks_crossed, 1);
    }

    #[test]
    fn test_stops_at_price_limit() {
        let (state, ticks) = layered_pool();
        let limit = sqrt_price_for_tick(-300).unwrap();
        let request = exact_in(2 * 10u128.pow(17), SwapDirection::ZeroForOne).with_price_limit(limit);
        let r = simulate(&state, &request, &ticks).unwrap();

        assert_eq!(r.end_state.sqrt_price_x96, limit);
        assert_eq!(r.end_state.tick, -300);
        assert_eq!(r.amount_in, U256::from(45_473_329_985_830_974u64));
        assert_eq!(r.amount_out, U256::from(44_661_964_835_872_540u64));
    }

    #[test]
    fn test_runs_out_of_liquidity_at_global_bound() {
        let l2 = 2 * E18;
        let ticks = TickStore::new(
            [Tick::new(-600, l2 as i128, l2), Tick::new(600, -(l2 as i128), l2)],
            60,
        )
        .unwrap();
        let state = PoolState::at_tick(0, l2, 3000, 60).unwrap();
        let r = simulate(&state, &exact_in(10u128.pow(20), SwapDirection::ZeroForOne), &ticks).unwrap();

        // Only what the single position could absorb is taken
        assert_eq!(r.amount_in, U256::from(61_089_244_485_281_360u64));
        assert_eq!(r.amount_out, U256::from(59_106_021_758_274_339u64));
        assert_eq!(r.end_state.liquidity, 0);
        assert_eq!(r.end_state.sqrt_price_x96, MIN_SQRT_RATIO + U256::ONE);
        assert_eq!(r.end_state.tick, MIN_TICK);
    }

    #[test]
    fn test_negative_liquidity_is_rejected() {
        // Upper tick removes more than is active
        let ticks = TickStore::new([Tick::new(600, -(5 * E18 as i128), E18)], 60).unwrap();
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let r = simulate(&state, &exact_in(10u128.pow(18), SwapDirection::OneForZero), &ticks);
        assert_eq!(r, Err(SimError::InsufficientLiquidity));
    }

    #[test]
    fn test_step_limit_stops_a_long_walk() {
        let liquidity = 10u128.pow(18);
        let state = PoolState::at_tick(0, liquidity, 3000, 60).unwrap();
        let ticks = TickStore::full_range(liquidity, 60).unwrap();
        // Price falls ~1e12x: one step per empty bitmap word on the way
        let request = exact_in(10u128.pow(24), SwapDirection::ZeroForOne);

        assert_eq!(
            simulate_with_step_limit(&state, &request, &ticks, 3).unwrap_err(),
            SimError::SwapDidNotConverge(3)
        );
        let result = simulate(&state, &request, &ticks).unwrap();
        assert_eq!(result.ticks_crossed, 0);
        assert!(result.end_state.tick < -3 * 256 * 60);
    }

    #[test]
    fn test_zero_amount_is_noop() {
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let ticks = TickStore::full_range(E18, 60).unwrap();
        let r = simulate(&state, &exact_in(0, SwapDirection::ZeroForOne), &ticks).unwrap();
        assert_eq!(r.amount_in, U256::ZERO);
        assert_eq!(r.amount_out, U256::ZERO);
        assert_eq!(r.end_state, state);
    }

    #[test]
    fn test_invalid_price_limit() {
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let ticks = TickStore::full_range(E18, 60).unwrap();
        let above = sqrt_price_for_tick(10).unwrap();
        let request = exact_in(1_000, SwapDirection::ZeroForOne).with_price_limit(above);
        assert_eq!(simulate(&state, &request, &ticks), Err(SimError::InvalidPriceLimit));
    }

    #[test]
    fn test_spacing_mismatch_rejected() {
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        let ticks = TickStore::full_range(E18, 10).unwrap();
        let r = simulate(&state, &exact_in(1_000, SwapDirection::ZeroForOne), &ticks);
        assert_eq!(r, Err(SimError::InvalidTickSpacing(10)));
    }

    #[test]
    fn test_partial_snapshot_refuses_unloaded_words() {
        let ticks = TickStore::full_range(E18, 60).unwrap().with_loaded_words(-2..=1);
        let state = PoolState::at_tick(0, E18, 3000, 60).unwrap();
        // Large enough to walk past word -2
        let r = simulate(&state, &exact_in(10u128.pow(21), SwapDirection::ZeroForOne), &ticks);
        assert_eq!(r, Err(SimError::TickWordNotLoaded(-3)));
    }

    #[test]
    fn test_request_constructors() {
        assert!(SwapRequest::exact_in(U256::MAX, SwapDirection::ZeroForOne).is_err());
        let out = SwapRequest::exact_out(U256::from(5u8), SwapDirection::OneForZero).unwrap();
        assert!(!out.is_exact_input());
        assert_eq!(out.amount_specified.unsigned_abs(), U256::from(5u8));
        assert_eq!(SwapDirection::ZeroForOne.reverse(), SwapDirection::OneForZero);
    }
}

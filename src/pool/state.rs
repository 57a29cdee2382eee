//! V3 Pool State (value type)
//!
//! Purpose:
//!     Point-in-time slot0/liquidity view of a single V3 pool. Copy type:
//!     every simulation returns a fresh PoolState and never mutates its input,
//!     so chained simulations (front-run -> victim -> back-run) compose and
//!     replay deterministically.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - tick normally equals floor(tick(sqrtPrice)). After a downward swap that
//!       stops exactly on an initialized tick, the pool records tick - 1 at that
//!       tick's price (the tick is already crossed); that state is accepted too.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::math::tick_math::{sqrt_price_for_tick, tick_for_sqrt_price, MAX_SQRT_RATIO, MIN_SQRT_RATIO};
use crate::math::FEE_DENOMINATOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    /// Q64.96 square root of token1/token0
    pub sqrt_price_x96: U256,
    pub tick: i32,
    /// Active in-range liquidity
    pub liquidity: u128,
    /// Swap fee in hundredths of a bip (3000 = 0.30%)
    pub fee_pips: u32,
    pub tick_spacing: i32,
}

impl PoolState {
    /// Build a state from slot0 values, validating consistency.
    pub fn new(
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
        fee_pips: u32,
        tick_spacing: i32,
    ) -> SimResult<Self> {
        let state = Self {
            sqrt_price_x96,
            tick,
            liquidity,
            fee_pips,
            tick_spacing,
        };
        state.validate()?;
        Ok(state)
    }

    /// State sitting exactly on `tick`'s price.
    pub fn at_tick(tick: i32, liquidity: u128, fee_pips: u32, tick_spacing: i32) -> SimResult<Self> {
        Self::new(sqrt_price_for_tick(tick)?, tick, liquidity, fee_pips, tick_spacing)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.fee_pips >= FEE_DENOMINATOR {
            return Err(SimError::InvalidFee(self.fee_pips));
        }
        if self.tick_spacing <= 0 {
            return Err(SimError::InvalidTickSpacing(self.tick_spacing));
        }
        if self.sqrt_price_x96 < MIN_SQRT_RATIO || self.sqrt_price_x96 >= MAX_SQRT_RATIO {
            return Err(SimError::InvalidSqrtPrice(self.sqrt_price_x96));
        }

        let floor = tick_for_sqrt_price(self.sqrt_price_x96)?;
        let on_crossed_boundary =
            self.tick == floor - 1 && sqrt_price_for_tick(floor)? == self.sqrt_price_x96;
        if self.tick != floor && !on_crossed_boundary {
            return Err(SimError::InconsistentPoolState);
        }
        Ok(())
    }

    /// Human price of token0 in token1, decimal-adjusted. Display only.
    pub fn price(&self, decimals0: u8, decimals1: u8) -> f64 {
        let limbs = self.sqrt_price_x96.as_limbs();
        let sqrt_price = (limbs[0] as f64
            + limbs[1] as f64 * 2f64.powi(64)
            + limbs[2] as f64 * 2f64.powi(128))
            / 2f64.powi(96);
        sqrt_price * sqrt_price * 10f64.powi(decimals0 as i32 - decimals1 as i32)
    }
}

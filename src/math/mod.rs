//! V3 Fixed-Point Math
//!
//! Integer-exact ports of the Uniswap V3 core libraries (TickMath,
//! SqrtPriceMath, SwapMath, FullMath, LiquidityMath). Everything here is
//! pure and allocation-free; results match the on-chain contracts to the wei.

pub mod full_math;
pub mod liquidity_math;
pub mod sqrt_price_math;
pub mod swap_math;
pub mod tick_math;

use alloy::primitives::U256;

pub use swap_math::{compute_swap_step, SwapStep};
pub use tick_math::{
    nearest_usable_tick, sqrt_price_for_tick, tick_for_sqrt_price, MAX_SQRT_RATIO, MAX_TICK,
    MIN_SQRT_RATIO, MIN_TICK,
};

/// Fractional bits of a Q64.96 value
pub const RESOLUTION: usize = 96;
/// 2^96
pub const Q96: U256 = U256::from_limbs([0, 1 << 32, 0, 0]);
/// 2^160 - 1
pub const U160_MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, u32::MAX as u64, 0]);
/// Fees are expressed in hundredths of a bip
pub const FEE_DENOMINATOR: u32 = 1_000_000;

//! Tick ↔ sqrtPriceX96 Conversions
//!
//! Purpose:
//!     Exact integer conversions between V3 tick indices and Q64.96 square
//!     root prices, bit-for-bit with the on-chain TickMath library.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - sqrt_price_for_tick uses the magic-constant multiplier chain
//!       (each constant is 1/sqrt(1.0001)^(2^i) in Q128)
//!     - tick_for_sqrt_price starts from an f64 log estimate and corrects it
//!       against sqrt_price_for_tick, so it is the exact floor inverse

use alloy::primitives::U256;

use crate::error::{SimError, SimResult};

pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

/// sqrt_price_for_tick(MIN_TICK)
pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
/// sqrt_price_for_tick(MAX_TICK)
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

const ODD_TICK_RATIO: u128 = 0xfffcb933bd6fad37aa2d162d1a594001;

const TICK_MULTIPLIERS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// Q64.96 sqrt price at `tick`, rounded up.
pub fn sqrt_price_for_tick(tick: i32) -> SimResult<U256> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(SimError::OutOfRangeTick(tick));
    }

    // Q128.128
    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from(ODD_TICK_RATIO)
    } else {
        U256::ONE << 128
    };
    for (bit, multiplier) in TICK_MULTIPLIERS {
        if abs_tick & bit != 0 {
            ratio = ratio.wrapping_mul(U256::from(multiplier)) >> 128;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the result is never below the true price
    let round_up = ratio.as_limbs()[0] & 0xffff_ffff != 0;
    Ok((ratio >> 32) + U256::from(round_up as u8))
}

/// Greatest tick whose sqrt price is `<= sqrt_price_x96`.
///
/// Valid for `MIN_SQRT_RATIO <= sqrt_price_x96 < MAX_SQRT_RATIO`.
pub fn tick_for_sqrt_price(sqrt_price_x96: U256) -> SimResult<i32> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(SimError::InvalidSqrtPrice(sqrt_price_x96));
    }

    let mut tick = estimate_tick(sqrt_price_x96).clamp(MIN_TICK, MAX_TICK - 1);
    while tick > MIN_TICK && sqrt_price_for_tick(tick)? > sqrt_price_x96 {
        tick -= 1;
    }
    while tick < MAX_TICK - 1 && sqrt_price_for_tick(tick + 1)? <= sqrt_price_x96 {
        tick += 1;
    }
    Ok(tick)
}

/// tick ≈ floor(2 * ln(sqrtPrice / 2^96) / ln(1.0001)), within a tick or two.
fn estimate_tick(sqrt_price_x96: U256) -> i32 {
    let limbs = sqrt_price_x96.as_limbs();
    let value = limbs[0] as f64
        + limbs[1] as f64 * 2f64.powi(64)
        + limbs[2] as f64 * 2f64.powi(128);
    let ln_ratio = value.ln() - 96.0 * std::f64::consts::LN_2;
    (2.0 * ln_ratio / 1.0001_f64.ln()).floor() as i32
}

/// Nearest multiple of `tick_spacing` (halves round up), kept inside
/// [MIN_TICK, MAX_TICK].
pub fn nearest_usable_tick(tick: i32, tick_spacing: i32) -> SimResult<i32> {
    if tick_spacing <= 0 {
        return Err(SimError::InvalidTickSpacing(tick_spacing));
    }
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(SimError::OutOfRangeTick(tick));
    }

    let quotient = tick.div_euclid(tick_spacing);
    let remainder = tick.rem_euclid(tick_spacing);
    let rounded = if remainder * 2 >= tick_spacing {
        (quotient + 1) * tick_spacing
    } else {
        quotient * tick_spacing
    };

    if rounded < MIN_TICK {
        Ok(rounded + tick_spacing)
    } else if rounded > MAX_TICK {
        Ok(rounded - tick_spacing)
    } else {
        Ok(rounded)
    }
}

/// Standard tick spacing for the canonical V3 fee tiers.
pub fn tick_spacing_for_fee(fee: u32) -> Option<i32> {
    match fee {
        100 => Some(1),
        500 => Some(10),
        3000 => Some(60),
        10000 => Some(200),
        _ => None,
    }
}

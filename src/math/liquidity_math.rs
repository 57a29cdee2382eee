use crate::error::{SimError, SimResult};

/// Apply a signed liquidity delta. Going below zero means the tick data
/// is inconsistent with the active liquidity.
pub fn add_delta(liquidity: u128, delta: i128) -> SimResult<u128> {
    if delta < 0 {
        liquidity
            .checked_sub(delta.unsigned_abs())
            .ok_or(SimError::InsufficientLiquidity)
    } else {
        liquidity
            .checked_add(delta as u128)
            .ok_or(SimError::AmountOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_delta() {
        assert_eq!(add_delta(100, 20).unwrap(), 120);
        assert_eq!(add_delta(100, -20).unwrap(), 80);
        assert_eq!(add_delta(1_000, -1_000).unwrap(), 0);
        assert_eq!(add_delta(7, 0).unwrap(), 7);
    }

    #[test]
    fn test_add_delta_underflow() {
        assert_eq!(add_delta(100, -200), Err(SimError::InsufficientLiquidity));
        assert_eq!(add_delta(0, i128::MIN), Err(SimError::InsufficientLiquidity));
    }

    #[test]
    fn test_add_delta_overflow() {
        assert_eq!(add_delta(u128::MAX, 1), Err(SimError::AmountOverflow));
    }
}

//! Tick Store (per-evaluation snapshot)
//!
//! Purpose:
//!     Read-only set of initialized ticks for one pool plus the word bitmap
//!     that indexes them. Built once per evaluation from chain data and
//!     dropped afterwards; never shared between unrelated candidates.
//!
//! Created: 2026-10-19
//!
//! Notes:
//!     - Bitmap layout matches the pool contract: compressed tick c = tick / spacing
//!       (floored), word = c >> 8, bit = c & 0xff
//!     - A store built from a partial load (a window of words around the current
//!       tick) remembers the loaded word range and refuses to answer outside it

use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::math::tick_math::{nearest_usable_tick, MAX_TICK, MIN_TICK};

/// An initialized tick as read from `ticks(int24)` / TickLens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub index: i32,
    /// Added to active liquidity when crossed upward, subtracted downward
    pub liquidity_net: i128,
    pub liquidity_gross: u128,
}

impl Tick {
    pub fn new(index: i32, liquidity_net: i128, liquidity_gross: u128) -> Self {
        Self {
            index,
            liquidity_net,
            liquidity_gross,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TickStore {
    ticks: BTreeMap<i32, Tick>,
    bitmap: HashMap<i16, U256>,
    tick_spacing: i32,
    loaded_words: Option<RangeInclusive<i16>>,
}

/// (word, bit) coordinates of a compressed tick
fn position(compressed: i32) -> (i16, u8) {
    ((compressed >> 8) as i16, (compressed & 0xff) as u8)
}

impl TickStore {
    pub fn new(ticks: impl IntoIterator<Item = Tick>, tick_spacing: i32) -> SimResult<Self> {
        if tick_spacing <= 0 {
            return Err(SimError::InvalidTickSpacing(tick_spacing));
        }

        let mut store = Self {
            ticks: BTreeMap::new(),
            bitmap: HashMap::new(),
            tick_spacing,
            loaded_words: None,
        };
        for tick in ticks {
            if !(MIN_TICK..=MAX_TICK).contains(&tick.index) || tick.index % tick_spacing != 0 {
                return Err(SimError::OutOfRangeTick(tick.index));
            }
            // Uninitialized entries carry no liquidity and are not in the bitmap
            if tick.liquidity_gross == 0 && tick.liquidity_net == 0 {
                continue;
            }
            if store.ticks.insert(tick.index, tick).is_none() {
                let (word, bit) = position(tick.index / tick_spacing);
                *store.bitmap.entry(word).or_insert(U256::ZERO) |= U256::ONE << bit as usize;
            }
        }
        Ok(store)
    }

    /// Single position spanning the whole usable range.
    pub fn full_range(liquidity: u128, tick_spacing: i32) -> SimResult<Self> {
        let lower = nearest_usable_tick(MIN_TICK, tick_spacing)?;
        let upper = nearest_usable_tick(MAX_TICK, tick_spacing)?;
        let net = i128::try_from(liquidity).map_err(|_| SimError::AmountOverflow)?;
        Self::new(
            [
                Tick::new(lower, net, liquidity),
                Tick::new(upper, -net, liquidity),
            ],
            tick_spacing,
        )
    }

    /// Restrict lookups to the bitmap words that were actually fetched.
    pub fn with_loaded_words(mut self, words: RangeInclusive<i16>) -> Self {
        self.loaded_words = Some(words);
        self
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn ticks(&self) -> impl Iterator<Item = &Tick> {
        self.ticks.values()
    }

    pub fn loaded_words(&self) -> Option<&RangeInclusive<i16>> {
        self.loaded_words.as_ref()
    }

    pub fn get_tick(&self, index: i32) -> SimResult<&Tick> {
        self.ticks.get(&index).ok_or(SimError::TickNotInitialized(index))
    }

    /// True when every position's liquidity is both added and removed.
    pub fn is_balanced(&self) -> bool {
        self.ticks
            .values()
            .try_fold(0i128, |acc, t| acc.checked_add(t.liquidity_net))
            == Some(0)
    }

    fn word(&self, word: i16) -> SimResult<U256> {
        if let Some(range) = &self.loaded_words {
            if !range.contains(&word) {
                return Err(SimError::TickWordNotLoaded(word));
            }
        }
        Ok(self.bitmap.get(&word).copied().unwrap_or(U256::ZERO))
    }

    /// Next initialized tick in the same bitmap word as `tick`.
    ///
    /// `lte` searches left (at or below `tick`), otherwise right (strictly
    /// above). When the word holds no further initialized tick, returns the
    /// word boundary with `false`; the caller steps to it and asks again.
    /// Results can fall outside [MIN_TICK, MAX_TICK] and must be clamped.
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        lte: bool,
    ) -> SimResult<(i32, bool)> {
        let spacing = self.tick_spacing;
        let mut compressed = tick / spacing;
        if tick < 0 && tick % spacing != 0 {
            compressed -= 1;
        }

        if lte {
            let (word, bit) = position(compressed);
            // All bits at or to the right of the current bit
            let mask = (U256::ONE << bit as usize) - U256::ONE + (U256::ONE << bit as usize);
            let masked = self.word(word)? & mask;

            if masked.is_zero() {
                Ok(((compressed - bit as i32) * spacing, false))
            } else {
                let msb = (masked.bit_len() - 1) as i32;
                Ok(((compressed - (bit as i32 - msb)) * spacing, true))
            }
        } else {
            let (word, bit) = position(compressed + 1);
            // All bits at or to the left of the current bit
            let mask = !((U256::ONE << bit as usize) - U256::ONE);
            let masked = self.word(word)? & mask;

            if masked.is_zero() {
                Ok(((compressed + 1 + (255 - bit as i32)) * spacing, false))
            } else {
                let lsb = masked.trailing_zeros() as i32;
                Ok(((compressed + 1 + (lsb - bit as i32)) * spacing, true))
            }
        }
    }
}

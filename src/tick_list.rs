//! Sorted list of initialized ticks with a bounded nearest-tick search.

use crate::error::TickListError;
use alloy_primitives::U256;

/// Half-width of the default search window around the current tick. Events
/// and quotes only ever walk this far before the state is declared stale.
pub const TICK_SEARCH_DISTANCE: i32 = 480;

/// Snapshot of one initialized tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInfo {
    pub index: i32,
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub tick_cumulative_outside: i64,
    pub seconds_per_liquidity_outside_x128: U256,
    pub seconds_outside: u64,
    pub initialized: bool,
}

/// Initialized ticks sorted ascending by index, one entry per index.
#[derive(Debug, Clone, Default)]
pub struct TickList(Vec<TickInfo>);

impl TickList {
    /// Builds a list from arbitrary order, sorting by tick index.
    pub fn new(mut ticks: Vec<TickInfo>) -> Self {
        ticks.sort_by_key(|t| t.index);
        TickList(ticks)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickInfo> {
        self.0.iter()
    }

    /// Index of the largest entry at or below `tick`.
    /// Precondition: the list is non-empty and `tick` is not below the
    /// smallest entry.
    fn binary_search(&self, tick: i32) -> usize {
        let mut l = 0usize;
        let mut r = self.0.len() - 1;
        loop {
            let i = (l + r) / 2;
            if self.0[i].index <= tick && (i == self.0.len() - 1 || self.0[i + 1].index > tick) {
                return i;
            }
            if self.0[i].index < tick {
                l = i + 1;
            } else {
                r = i - 1;
            }
        }
    }

    /// Looks up the tick with exactly this index.
    pub fn get(&self, index: i32) -> Result<&TickInfo, TickListError> {
        if self.is_below_smallest(index)? {
            return Err(TickListError::NotContained);
        }
        let tick = &self.0[self.binary_search(index)];
        if tick.index != index {
            return Err(TickListError::NotContained);
        }
        Ok(tick)
    }

    /// True when `tick` is strictly below the smallest initialized tick.
    pub fn is_below_smallest(&self, tick: i32) -> Result<bool, TickListError> {
        let first = self.0.first().ok_or(TickListError::EmptyList)?;
        Ok(tick < first.index)
    }

    /// True when `tick` is at or above the largest initialized tick.
    pub fn is_at_or_above_largest(&self, tick: i32) -> Result<bool, TickListError> {
        let last = self.0.last().ok_or(TickListError::EmptyList)?;
        Ok(tick >= last.index)
    }

    /// The next initialized tick at or below `tick` (`lte`), or strictly
    /// above it otherwise.
    pub fn next_initialized_tick(&self, tick: i32, lte: bool) -> Result<&TickInfo, TickListError> {
        if lte {
            if self.is_below_smallest(tick)? {
                return Err(TickListError::BelowSmallest);
            }
            if self.is_at_or_above_largest(tick)? {
                return Ok(&self.0[self.0.len() - 1]);
            }
            Ok(&self.0[self.binary_search(tick)])
        } else {
            if self.is_at_or_above_largest(tick)? {
                return Err(TickListError::AtOrAboveLargest);
            }
            if self.is_below_smallest(tick)? {
                return Ok(&self.0[0]);
            }
            Ok(&self.0[self.binary_search(tick) + 1])
        }
    }

    /// Bounded variant of [`next_initialized_tick`]: the result is clamped
    /// to a window of `distance` ticks around `tick`, and the flag reports
    /// whether the returned tick is actually initialized.
    ///
    /// An empty list fails with [`TickListError::OutOfRange`], the signal
    /// for callers to zero their quotes and resync.
    pub fn next_initialized_tick_within_fixed_distance(
        &self,
        tick: i32,
        lte: bool,
        distance: i32,
    ) -> Result<(i32, bool), TickListError> {
        if self.is_empty() {
            return Err(TickListError::OutOfRange);
        }
        if lte {
            let minimum = tick - distance;
            if self.is_below_smallest(tick)? {
                return Ok((minimum, false));
            }
            let index = self.next_initialized_tick(tick, lte)?.index;
            let next = minimum.max(index);
            Ok((next, next == index))
        } else {
            let maximum = tick + distance;
            if self.is_at_or_above_largest(tick)? {
                return Ok((maximum, false));
            }
            let index = self.next_initialized_tick(tick, lte)?.index;
            let next = maximum.min(index);
            Ok((next, next == index))
        }
    }
}

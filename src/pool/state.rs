use crate::error::StateError;
use crate::hash::FastMap;
use crate::tick_list::{TickInfo, TickList};
use alloy_primitives::U256;

/// Factory-enabled fee tiers, denominated in hundredths of a bip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeeAmount {
    Lowest = 4,
    Stable = 8,
    Low = 40,
    Medium = 300,
    High = 1000,
}

impl FeeAmount {
    pub const fn fee_units(self) -> u32 {
        self as u32
    }

    pub const fn tick_spacing(self) -> i32 {
        match self {
            FeeAmount::Lowest => 1,
            FeeAmount::Stable => 1,
            FeeAmount::Low => 8,
            FeeAmount::Medium => 60,
            FeeAmount::High => 200,
        }
    }
}

impl TryFrom<u32> for FeeAmount {
    type Error = StateError;

    fn try_from(fee: u32) -> Result<Self, StateError> {
        match fee {
            4 => Ok(FeeAmount::Lowest),
            8 => Ok(FeeAmount::Stable),
            40 => Ok(FeeAmount::Low),
            300 => Ok(FeeAmount::Medium),
            1000 => Ok(FeeAmount::High),
            other => Err(StateError::UnsupportedFee(other)),
        }
    }
}

/// Replicated pool state.
///
/// `ticks` and `tick_list` hold the same entries; the map serves point
/// lookups during event replay, the sorted list serves the bounded
/// nearest-tick searches. [`PoolState::set_ticks`] keeps them in sync.
///
/// `is_valid` turns false whenever an event cannot be applied cleanly; from
/// then on the state must not be used for pricing until a full resync.
#[derive(Debug, Clone)]
pub struct PoolState {
    pub fee: FeeAmount,
    pub tick_spacing: i32,
    pub sqrt_price_x96: U256,
    pub current_tick: i32,
    pub liquidity: u128,
    pub reinvest_liquidity: u128,
    pub ticks: FastMap<i32, TickInfo>,
    pub tick_list: TickList,
    pub is_valid: bool,
}

impl PoolState {
    pub fn new(fee: FeeAmount) -> Self {
        PoolState {
            fee,
            tick_spacing: fee.tick_spacing(),
            sqrt_price_x96: U256::ZERO,
            current_tick: 0,
            liquidity: 0,
            reinvest_liquidity: 0,
            ticks: FastMap::default(),
            tick_list: TickList::default(),
            is_valid: true,
        }
    }

    /// Replaces the tick map and rebuilds the sorted list from it.
    pub fn set_ticks(&mut self, ticks: FastMap<i32, TickInfo>) {
        self.tick_list = TickList::new(ticks.values().cloned().collect());
        self.ticks = ticks;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_amount_tick_spacings() {
        assert_eq!(FeeAmount::Lowest.tick_spacing(), 1);
        assert_eq!(FeeAmount::Stable.tick_spacing(), 1);
        assert_eq!(FeeAmount::Low.tick_spacing(), 8);
        assert_eq!(FeeAmount::Medium.tick_spacing(), 60);
        assert_eq!(FeeAmount::High.tick_spacing(), 200);
    }

    #[test]
    fn fee_amount_round_trips_through_u32() {
        for fee in [
            FeeAmount::Lowest,
            FeeAmount::Stable,
            FeeAmount::Low,
            FeeAmount::Medium,
            FeeAmount::High,
        ] {
            assert_eq!(FeeAmount::try_from(fee.fee_units()).unwrap(), fee);
            // every tier is a proper fraction of the fee denominator
            assert!(fee.fee_units() < crate::FEE_UNITS);
        }
        assert!(matches!(
            FeeAmount::try_from(3000),
            Err(StateError::UnsupportedFee(3000))
        ));
    }

    #[test]
    fn set_ticks_rebuilds_sorted_list() {
        let mut state = PoolState::new(FeeAmount::Medium);
        let mut ticks = FastMap::default();
        for index in [60, -120, 0] {
            ticks.insert(
                index,
                TickInfo {
                    index,
                    initialized: true,
                    ..Default::default()
                },
            );
        }
        state.set_ticks(ticks);

        let indices: Vec<i32> = state.tick_list.iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![-120, 0, 60]);
        assert_eq!(state.ticks.len(), 3);
    }

}

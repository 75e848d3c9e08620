//! Incremental state maintenance from decoded pool events.

use crate::error::{Error, StateError};
use crate::math::liquidity_math::add_delta;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, MAX_TICK, MIN_TICK};
use crate::pool::state::PoolState;
use crate::tick_list::TICK_SEARCH_DISTANCE;
use alloy_primitives::{I256, U256};
use tracing::{error, trace};

/// Decoded pool log. The set is closed: anything else a pool emits does not
/// affect pricing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    Swap {
        sqrt_price_x96: U256,
        amount0: I256,
        tick: i32,
        liquidity: u128,
    },
    Mint {
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    },
    Burn {
        tick_lower: i32,
        tick_upper: i32,
        amount: u128,
    },
}

/// Applies an event to a copy of the state and returns the copy.
///
/// The canonical state is never mutated in place. Any failure marks the
/// returned state invalid: an out-of-window tick walk is only a resync hint
/// and logs at trace level, everything else logs as an error.
pub fn apply_event(state: &PoolState, event: &PoolEvent) -> PoolState {
    let mut next = state.clone();
    if let Err(err) = dispatch(&mut next, event) {
        if err.is_out_of_range() {
            trace!(%err, "pool walked outside the replicated tick window, resync needed");
        } else {
            error!(%err, ?event, "failed to apply pool event");
        }
        next.is_valid = false;
    }
    next
}

fn dispatch(state: &mut PoolState, event: &PoolEvent) -> Result<(), Error> {
    match *event {
        PoolEvent::Swap {
            sqrt_price_x96,
            amount0,
            tick,
            liquidity,
        } => {
            if amount0.is_zero() {
                // the pool never emits a swap that moves no token0
                return Err(StateError::ZeroAmountSwap.into());
            }
            let zero_for_one = amount0 > I256::ZERO;
            swap_from_event(state, amount0, sqrt_price_x96, tick, liquidity, zero_for_one)
        }
        PoolEvent::Mint {
            tick_lower,
            tick_upper,
            amount,
        } => {
            modify_position(state, tick_lower, tick_upper, amount as i128)?;
            Ok(())
        }
        PoolEvent::Burn {
            tick_lower,
            tick_upper,
            amount,
        } => {
            modify_position(state, tick_lower, tick_upper, (amount as i128).wrapping_neg())?;
            Ok(())
        }
    }
}

/// Replays a swap far enough to cross every initialized tick between the old
/// and the new price, then snaps price, tick and liquidity to the event's
/// authoritative values.
///
/// Reinvestment liquidity accumulated during the replay stays transient: the
/// event does not carry it, so the stored value is left untouched and the
/// next resync reconciles it.
pub fn swap_from_event(
    state: &mut PoolState,
    amount_specified: I256,
    new_sqrt_price_x96: U256,
    new_tick: i32,
    new_liquidity: u128,
    zero_for_one: bool,
) -> Result<(), Error> {
    let exact_input = amount_specified >= I256::ZERO;

    let mut amount_remaining = amount_specified;
    let mut sqrt_price_x96 = state.sqrt_price_x96;
    let mut tick = state.current_tick;
    let mut liquidity = state.liquidity;
    let mut reinvest_liquidity = state.reinvest_liquidity;

    // The loop only exists to evaluate tick crossings on the way to the
    // event's price; the event itself tells us where it ends.
    while tick != new_tick && sqrt_price_x96 != new_sqrt_price_x96 {
        let sqrt_price_start_x96 = sqrt_price_x96;
        let tick_start = tick;

        let (mut tick_next, initialized) = state.tick_list.next_initialized_tick_within_fixed_distance(
            tick,
            zero_for_one,
            TICK_SEARCH_DISTANCE,
        )?;
        tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);

        let sqrt_price_next_x96 = get_sqrt_ratio_at_tick(tick_next)?;
        let target = if zero_for_one && sqrt_price_next_x96 < new_sqrt_price_x96
            || !zero_for_one && sqrt_price_next_x96 > new_sqrt_price_x96
        {
            new_sqrt_price_x96
        } else {
            sqrt_price_next_x96
        };

        let step = compute_swap_step(
            sqrt_price_x96,
            target,
            U256::from(liquidity) + U256::from(reinvest_liquidity),
            amount_remaining,
            state.fee.fee_units(),
            exact_input,
            zero_for_one,
        )?;

        sqrt_price_x96 = step.sqrt_ratio_next_x96;
        amount_remaining -= step.amount_used;
        reinvest_liquidity = add_delta(
            reinvest_liquidity,
            i128::try_from(step.delta_l).map_err(|_| crate::error::MathError::Overflow)?,
        )?;

        if sqrt_price_x96 == sqrt_price_next_x96 {
            if initialized {
                let mut liquidity_net = state.tick_list.get(tick_next)?.liquidity_net;
                if zero_for_one {
                    liquidity_net = liquidity_net.wrapping_neg();
                }
                liquidity = add_delta(liquidity, liquidity_net)?;
            }
            tick = if zero_for_one { tick_next - 1 } else { tick_next };
        } else if sqrt_price_x96 != sqrt_price_start_x96 {
            tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;
        }

        if tick == tick_start && sqrt_price_x96 == sqrt_price_start_x96 {
            // a malformed event would otherwise spin here forever
            return Err(StateError::ReplayStalled.into());
        }
    }

    state.sqrt_price_x96 = new_sqrt_price_x96;
    state.current_tick = new_tick;
    state.liquidity = new_liquidity;
    Ok(())
}

/// Settles a liquidity delta over `[tick_lower, tick_upper)` against the
/// current price, returning the signed token amounts owed.
///
/// Pure position accounting: in-range deltas adjust the pool's active
/// liquidity, nothing else is touched.
pub fn modify_position(
    state: &mut PoolState,
    tick_lower: i32,
    tick_upper: i32,
    liquidity_delta: i128,
) -> Result<(I256, I256), Error> {
    check_ticks(tick_lower, tick_upper)?;

    let mut amount0 = I256::ZERO;
    let mut amount1 = I256::ZERO;
    if liquidity_delta != 0 {
        if state.current_tick < tick_lower {
            // range entirely above the price, only token0 backs it
            amount0 = get_amount_0_delta(
                get_sqrt_ratio_at_tick(tick_lower)?,
                get_sqrt_ratio_at_tick(tick_upper)?,
                liquidity_delta,
            )?;
        } else if state.current_tick < tick_upper {
            amount0 = get_amount_0_delta(
                state.sqrt_price_x96,
                get_sqrt_ratio_at_tick(tick_upper)?,
                liquidity_delta,
            )?;
            amount1 = get_amount_1_delta(
                get_sqrt_ratio_at_tick(tick_lower)?,
                state.sqrt_price_x96,
                liquidity_delta,
            )?;

            state.liquidity = add_delta(state.liquidity, liquidity_delta)?;
        } else {
            // range entirely below the price, only token1 backs it
            amount1 = get_amount_1_delta(
                get_sqrt_ratio_at_tick(tick_lower)?,
                get_sqrt_ratio_at_tick(tick_upper)?,
                liquidity_delta,
            )?;
        }
    }
    Ok((amount0, amount1))
}

fn check_ticks(tick_lower: i32, tick_upper: i32) -> Result<(), StateError> {
    if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(StateError::InvalidTickRange);
    }
    Ok(())
}

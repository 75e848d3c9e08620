//! Multi-size quoting against a replicated pool snapshot.

use crate::error::{Error, TickListError};
use crate::math::liquidity_math::add_delta;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{
    get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO,
    MIN_TICK,
};
use crate::pool::state::PoolState;
use crate::tick_list::TICK_SEARCH_DISTANCE;
use alloy_primitives::{I256, U256};
use tracing::{debug, error};

/// Which side of the pool the caller quotes: selling the input token for as
/// much output as possible, or buying an exact output amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapSide {
    Sell,
    Buy,
}

/// Running swap-loop state, carried across quote sizes so that each size
/// resumes from the previous one instead of walking the ticks from scratch.
#[derive(Debug, Clone)]
struct PriceComputationState {
    amount_specified_remaining: I256,
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    protocol_fee: I256,
    liquidity: u128,
    is_first_cycle_state: bool,
}

impl PriceComputationState {
    fn from_pool(pool: &PoolState) -> Self {
        PriceComputationState {
            amount_specified_remaining: I256::ZERO,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: pool.sqrt_price_x96,
            tick: pool.current_tick,
            protocol_fee: I256::ZERO,
            liquidity: pool.liquidity,
            is_first_cycle_state: true,
        }
    }
}

enum CycleOutcome {
    Completed {
        state: PriceComputationState,
        latest_full_cycle_state: PriceComputationState,
    },
    /// The walk left the replicated tick window; every quote from here on is
    /// worthless until a resync.
    OutOfRange,
}

fn price_computation_cycles(
    pool: &PoolState,
    mut state: PriceComputationState,
    sqrt_price_limit_x96: U256,
    exact_input: bool,
    zero_for_one: bool,
    fee_protocol: u32,
) -> Result<CycleOutcome, Error> {
    let mut latest_full_cycle_state = state.clone();

    while !state.amount_specified_remaining.is_zero()
        && state.sqrt_price_x96 != sqrt_price_limit_x96
    {
        let (tick_next, initialized) = match pool
            .tick_list
            .next_initialized_tick_within_fixed_distance(
                state.tick,
                zero_for_one,
                TICK_SEARCH_DISTANCE,
            ) {
            Ok(next) => next,
            Err(TickListError::OutOfRange) => return Ok(CycleOutcome::OutOfRange),
            Err(err) => return Err(err.into()),
        };
        let tick_next = tick_next.clamp(MIN_TICK, MAX_TICK);

        let sqrt_price_next_x96 = get_sqrt_ratio_at_tick(tick_next)?;
        let target = if zero_for_one && sqrt_price_next_x96 < sqrt_price_limit_x96
            || !zero_for_one && sqrt_price_next_x96 > sqrt_price_limit_x96
        {
            sqrt_price_limit_x96
        } else {
            sqrt_price_next_x96
        };

        let step = compute_swap_step(
            state.sqrt_price_x96,
            target,
            U256::from(state.liquidity) + U256::from(pool.reinvest_liquidity),
            state.amount_specified_remaining,
            pool.fee.fee_units(),
            exact_input,
            zero_for_one,
        )?;

        let sqrt_price_start_x96 = state.sqrt_price_x96;
        state.sqrt_price_x96 = step.sqrt_ratio_next_x96;
        state.amount_specified_remaining -= step.amount_used;
        state.amount_calculated += step.amount_out;

        if fee_protocol > 0 {
            // the government take on compounded fees never reaches the pool
            let skim = step.delta_l / I256::from_raw(U256::from(fee_protocol));
            state.protocol_fee += skim;
        }

        if state.sqrt_price_x96 == sqrt_price_next_x96 {
            if initialized {
                let mut liquidity_net = pool.tick_list.get(tick_next)?.liquidity_net;
                if zero_for_one {
                    liquidity_net = liquidity_net.wrapping_neg();
                }
                state.liquidity = add_delta(state.liquidity, liquidity_net)?;
            }
            state.tick = if zero_for_one { tick_next - 1 } else { tick_next };
        } else if state.sqrt_price_x96 != sqrt_price_start_x96 {
            state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
        }

        // only a cycle that did not exhaust the amount is a safe resume point
        if !state.amount_specified_remaining.is_zero() {
            latest_full_cycle_state = state.clone();
        }
    }

    Ok(CycleOutcome::Completed {
        state,
        latest_full_cycle_state,
    })
}

/// Quotes every size in `amounts` against the pool snapshot.
///
/// `amounts` must be ascending: each size resumes the tick walk of the
/// previous one. Selling quotes the output received for each input size,
/// buying quotes the input required for each output size. A size that cannot
/// be priced yields zero: a math failure zeroes just that size and the next
/// one retries from the last good resume point, while an exhausted tick
/// window zeroes that size and every later one.
///
/// Yields to the runtime between sizes so a batch of large quotes does not
/// monopolize the worker.
pub async fn query_outputs(
    pool: &PoolState,
    amounts: &[U256],
    zero_for_one: bool,
    side: SwapSide,
) -> Vec<U256> {
    let is_sell = side == SwapSide::Sell;

    let sqrt_price_limit_x96 = if zero_for_one {
        MIN_SQRT_RATIO + U256::ONE
    } else {
        MAX_SQRT_RATIO - U256::ONE
    };
    let limit_ok = if zero_for_one {
        sqrt_price_limit_x96 < pool.sqrt_price_x96 && sqrt_price_limit_x96 > MIN_SQRT_RATIO
    } else {
        sqrt_price_limit_x96 > pool.sqrt_price_x96 && sqrt_price_limit_x96 < MAX_SQRT_RATIO
    };
    if !limit_ok {
        debug!(
            sqrt_price_x96 = %pool.sqrt_price_x96,
            zero_for_one,
            "pool price is pinned at the range boundary, nothing to quote"
        );
        return vec![U256::ZERO; amounts.len()];
    }

    let fee = pool.fee.fee_units();
    let fee_protocol = if zero_for_one { fee % 16 } else { fee >> 4 };

    let mut state = PriceComputationState::from_pool(pool);
    let mut previous_amount = I256::ZERO;
    let mut dead = false;

    let mut outputs = Vec::with_capacity(amounts.len());
    for &amount in amounts {
        if dead || amount.is_zero() {
            outputs.push(U256::ZERO);
            continue;
        }

        let amount_specified = if is_sell {
            I256::from_raw(amount)
        } else {
            I256::from_raw(amount).wrapping_neg()
        };
        let mut attempt = state.clone();
        if attempt.is_first_cycle_state {
            attempt.amount_specified_remaining = amount_specified;
            attempt.is_first_cycle_state = false;
        } else {
            // carry over what the previous, smaller size left unconsumed
            attempt.amount_specified_remaining =
                amount_specified - (previous_amount - attempt.amount_specified_remaining);
        }
        let exact_input = amount_specified > I256::ZERO;

        match price_computation_cycles(
            pool,
            attempt,
            sqrt_price_limit_x96,
            exact_input,
            zero_for_one,
            fee_protocol,
        ) {
            Ok(CycleOutcome::Completed {
                state: finished,
                latest_full_cycle_state,
            }) => {
                let (amount0, amount1) = if zero_for_one == exact_input {
                    (
                        amount_specified - finished.amount_specified_remaining,
                        finished.amount_calculated,
                    )
                } else {
                    (
                        finished.amount_calculated,
                        amount_specified - finished.amount_specified_remaining,
                    )
                };
                let output = if is_sell {
                    let received = if zero_for_one { amount1 } else { amount0 };
                    received.wrapping_neg().into_raw()
                } else {
                    let paid = if zero_for_one { amount0 } else { amount1 };
                    paid.into_raw()
                };
                outputs.push(output);

                if !finished.protocol_fee.is_zero() {
                    tracing::trace!(protocol_fee = %finished.protocol_fee, "protocol fee skimmed from reinvestment");
                }

                state = latest_full_cycle_state;
                previous_amount = amount_specified;
            }
            Ok(CycleOutcome::OutOfRange) => {
                dead = true;
                outputs.push(U256::ZERO);
            }
            Err(err) => {
                // the resume state is untouched, larger sizes still get a try
                error!(%err, %amount, "quote failed, zeroing this size");
                outputs.push(U256::ZERO);
            }
        }

        tokio::task::yield_now().await;
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::FastMap;
    use crate::pool::state::FeeAmount;
    use crate::tick_list::TickInfo;

    fn single_tick_pool() -> PoolState {
        let mut state = PoolState::new(FeeAmount::Medium);
        state.sqrt_price_x96 = get_sqrt_ratio_at_tick(0).unwrap();
        state.current_tick = 0;
        state.liquidity = 1e18 as u128;

        let mut ticks = FastMap::default();
        ticks.insert(
            0,
            TickInfo {
                index: 0,
                liquidity_gross: 1e18 as u128,
                liquidity_net: 0,
                initialized: true,
                ..Default::default()
            },
        );
        state.set_ticks(ticks);
        state
    }

    #[tokio::test]
    async fn sell_quote_close_to_spot_minus_fee() {
        let pool = single_tick_pool();
        let amounts = vec![U256::from(1e15 as u64)];

        let outputs = query_outputs(&pool, &amounts, true, SwapSide::Sell).await;
        assert_eq!(outputs.len(), 1);
        // price near 1.0, 0.03% fee, tiny slippage: output just below input
        assert!(outputs[0] > U256::from(9.9e14 as u64));
        assert!(outputs[0] < U256::from(1e15 as u64));
    }

    #[tokio::test]
    async fn sell_quotes_are_monotonic() {
        let pool = single_tick_pool();
        let amounts: Vec<U256> = [1e14, 5e14, 1e15, 5e15, 1e16]
            .iter()
            .map(|&a| U256::from(a as u64))
            .collect();

        for zero_for_one in [true, false] {
            let outputs = query_outputs(&pool, &amounts, zero_for_one, SwapSide::Sell).await;
            assert_eq!(outputs.len(), amounts.len());
            for pair in outputs.windows(2) {
                assert!(pair[0] <= pair[1]);
            }
            assert!(outputs[0] > U256::ZERO);
        }
    }

    #[tokio::test]
    async fn buy_quote_costs_more_than_spot() {
        let pool = single_tick_pool();
        let amounts = vec![U256::from(1e15 as u64)];

        let outputs = query_outputs(&pool, &amounts, true, SwapSide::Buy).await;
        // buying 1e15 of token1 must cost more than 1e15 of token0
        assert!(outputs[0] > U256::from(1e15 as u64));
        assert!(outputs[0] < U256::from(1.01e15 as u64));
    }

    #[tokio::test]
    async fn zero_amount_quotes_to_zero() {
        let pool = single_tick_pool();
        let amounts = vec![U256::ZERO, U256::from(1e15 as u64)];

        let outputs = query_outputs(&pool, &amounts, true, SwapSide::Sell).await;
        assert_eq!(outputs[0], U256::ZERO);
        assert!(outputs[1] > U256::ZERO);
    }

    #[tokio::test]
    async fn repeated_queries_on_one_snapshot_agree() {
        let pool = single_tick_pool();
        let amounts: Vec<U256> = [1e14, 1e15, 1e16]
            .iter()
            .map(|&a| U256::from(a as u64))
            .collect();

        let first = query_outputs(&pool, &amounts, true, SwapSide::Sell).await;
        let second = query_outputs(&pool, &amounts, true, SwapSide::Sell).await;
        assert_eq!(first, second);
        assert!(first[0] > U256::ZERO);
    }

    #[tokio::test]
    async fn math_failure_zeroes_only_that_size() {
        // crossing the tick at 60 pushes active liquidity past u128::MAX
        let mut pool = PoolState::new(FeeAmount::Medium);
        pool.sqrt_price_x96 = get_sqrt_ratio_at_tick(0).unwrap();
        pool.current_tick = 0;
        pool.liquidity = u128::MAX - 10;

        let mut ticks = FastMap::default();
        for (index, net) in [(0, 0i128), (60, i128::MAX)] {
            ticks.insert(
                index,
                TickInfo {
                    index,
                    liquidity_gross: net.unsigned_abs().max(1),
                    liquidity_net: net,
                    initialized: true,
                    ..Default::default()
                },
            );
        }
        pool.set_ticks(ticks);

        // the first size stays inside the current range, the second is large
        // enough to cross
        let amounts = vec![
            U256::from(1e18 as u128),
            U256::from(2e36 as u128),
        ];
        let outputs = query_outputs(&pool, &amounts, false, SwapSide::Sell).await;
        assert!(outputs[0] > U256::ZERO);
        assert_eq!(outputs[1], U256::ZERO);
    }

    #[tokio::test]
    async fn empty_tick_list_zeroes_everything() {
        let mut pool = PoolState::new(FeeAmount::Medium);
        pool.sqrt_price_x96 = get_sqrt_ratio_at_tick(0).unwrap();
        pool.liquidity = 1e18 as u128;

        let amounts = vec![U256::from(1e15 as u64), U256::from(2e15 as u64)];
        let outputs = query_outputs(&pool, &amounts, true, SwapSide::Sell).await;
        assert_eq!(outputs, vec![U256::ZERO, U256::ZERO]);
    }

    #[tokio::test]
    async fn uninitialized_price_quotes_to_zero() {
        // a pool that was never synced sits at price zero
        let pool = PoolState::new(FeeAmount::Low);
        let amounts = vec![U256::from(1e15 as u64)];
        let outputs = query_outputs(&pool, &amounts, true, SwapSide::Sell).await;
        assert_eq!(outputs, vec![U256::ZERO]);
    }
}

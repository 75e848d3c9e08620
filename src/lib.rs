//! Off-chain replica of a KyberSwap-Elastic-style concentrated liquidity pool.
//!
//! This crate exposes:
//! - Low-level math primitives (`math::*`) for ticks, prices, full-precision
//!   mul/div and the reinvestment-fee swap step.
//! - A sorted [`TickList`] with the bounded nearest-initialized-tick search
//!   used to cap per-swap work.
//! - An in-memory [`PoolState`] that is kept current by applying decoded
//!   `Swap`/`Mint`/`Burn` events, plus an async quote engine
//!   ([`pool::quote::query_outputs`]) that prices a batch of trade sizes
//!   against an immutable snapshot.
//! - Optional `onchain` helpers to rebuild the replica from a live pool.
//!
//! # Examples
//!
//! ## Pure math
//! ```no_run
//! use elastic_clmm::{math::tick_math, RESOLUTION, U256};
//!
//! let sqrt_price = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
//! assert!(sqrt_price > U256::ZERO);
//! assert_eq!(RESOLUTION, 96);
//! ```
//!
//! ## Quoting against an in-memory pool
//! ```no_run
//! use elastic_clmm::{
//!     math::tick_math::get_sqrt_ratio_at_tick,
//!     pool::quote::query_outputs,
//!     pool::{FeeAmount, SwapSide},
//!     PoolState, U256,
//! };
//!
//! # async fn quote() {
//! let mut state = PoolState::new(FeeAmount::Medium);
//! state.sqrt_price_x96 = get_sqrt_ratio_at_tick(0).unwrap();
//! state.current_tick = 0;
//! state.liquidity = 1_000_000_000_000_000_000u128;
//!
//! // Sizes must be monotonically increasing; each quote resumes from the
//! // previous one instead of re-walking the tick list from scratch.
//! let amounts = vec![U256::from(1_000_000u64), U256::from(2_000_000u64)];
//! let outputs = query_outputs(&state, &amounts, true, SwapSide::Sell).await;
//! println!("outputs: {outputs:?}");
//! # }
//! ```

pub use alloy_primitives::{Address, I256, U256, U512};

pub mod error;
mod hash;
pub mod math;
pub mod tick_list;

pub use hash::FastMap;

pub mod pool;

pub use pool::PoolState;
pub use tick_list::{TickInfo, TickList};

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);

/// Fee tiers are denominated in hundredths of a bip out of this unit.
pub const FEE_UNITS: u32 = 1_000_000;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("Math error - sqrt of negative value")]
    NegativeSqrt,
    #[error("Math error - insufficient liquidity")]
    InsufficientLiquidity,
}

#[derive(Debug, Error)]
pub enum TickListError {
    #[error("TickList error - list is empty")]
    EmptyList,
    #[error("TickList error - tick is not contained in the list")]
    NotContained,
    #[error("TickList error - tick is below the smallest initialized tick")]
    BelowSmallest,
    #[error("TickList error - tick is at or above the largest initialized tick")]
    AtOrAboveLargest,
    /// The bounded search window holds no usable entry. Recoverable: callers
    /// zero the affected quotes and schedule a full resync.
    #[error("TickList error - no initialized tick within the search window")]
    OutOfRange,
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State error - tick out of bounds")]
    TickOutOfBounds,

    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,

    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - invalid tick range")]
    InvalidTickRange,

    #[error("State error - swap event carries no amount0")]
    ZeroAmountSwap,

    #[error("State error - event replay made no progress")]
    ReplayStalled,

    #[error("State error - unsupported fee tier {0}")]
    UnsupportedFee(u32),
}

#[cfg(feature = "onchain")]
#[derive(Debug, Error)]
pub enum OnchainError {
    #[error("Onchain error - no pool for pair ({token0}, {token1}) at fee {fee}")]
    PoolNotFound {
        token0: alloy_primitives::Address,
        token1: alloy_primitives::Address,
        fee: u32,
    },
    #[error("Onchain error - pool address has not been resolved yet")]
    PoolNotResolved,
    #[error("Onchain error - failed to get pool state: {0}")]
    FailedToGetPoolState(String),
    #[error("Onchain error - failed to get liquidity state: {0}")]
    FailedToGetLiquidityState(String),
    #[error("Onchain error - failed to get initialized ticks: {0}")]
    FailedToGetTicks(String),
    #[error("Onchain error - multicall failed: {0}")]
    FailedToCallMulticall(String),
    #[error("Onchain error - failed to decode tick data: {0}")]
    FailedToDecodeTick(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] crate::error::MathError),

    #[error(transparent)]
    TickListError(#[from] crate::error::TickListError),

    #[error(transparent)]
    StateError(#[from] crate::error::StateError),

    #[cfg(feature = "onchain")]
    #[error(transparent)]
    OnchainError(#[from] crate::error::OnchainError),
}

impl Error {
    /// True when the failure only signals that the price walked outside the
    /// bounded tick window, which a resync repairs.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Error::TickListError(TickListError::OutOfRange))
    }
}

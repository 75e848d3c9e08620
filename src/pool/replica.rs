//! On-chain resync: rebuilds a full [`PoolState`] snapshot over JSON-RPC.

use crate::error::{Error, OnchainError};
use crate::hash::FastMap;
use crate::pool::state::{FeeAmount, PoolState};
use crate::tick_list::TickInfo;
use alloy_primitives::aliases::{I24, U24};
use alloy_primitives::{Address, BlockNumber, U256};
use alloy_provider::Provider;
use alloy_sol_macro::sol;
use std::sync::Arc;

sol! {
    #[sol(rpc)]
    interface IElasticFactory {
        function getPool(address tokenA, address tokenB, uint24 swapFeeUnits)
            external view returns (address pool);
    }

    #[sol(rpc)]
    interface ITickReader {
        function getAllTicks(address pool) external view returns (int24[] allTicks);
    }

    #[sol(rpc)]
    interface IElasticPool {
        function getPoolState() external view returns (
            uint160 sqrtP,
            int24 currentTick,
            int24 nearestCurrentTick,
            bool locked
        );
        function getLiquidityState() external view returns (
            uint128 baseL,
            uint128 reinvestL,
            uint128 reinvestLLast
        );
        function ticks(int24 tick) external view returns (
            uint128 liquidityGross,
            int128 liquidityNet,
            uint256 feeGrowthOutside,
            uint128 secondsPerLiquidityOutside
        );
    }
}

sol! {
    struct Call {
        address target;
        bytes callData;
    }

    #[sol(rpc)]
    interface IMulticall {
        function aggregate(Call[] calls)
            external
            view
            returns (uint256 blockNumber, bytes[] returnData);
    }
}

pub type OnchainProvider<P> = Arc<P>;

/// Returns the token pair in the canonical order the factory indexes by.
pub fn sort_tokens(token0: Address, token1: Address) -> (Address, Address) {
    if token0 < token1 {
        (token0, token1)
    } else {
        (token1, token0)
    }
}

/// One replicated pool bound to a provider.
///
/// The pool contract address is looked up from the factory on the first
/// [`ElasticPool::generate_state`] call and cached for the lifetime of the
/// instance.
#[derive(Clone, Debug)]
pub struct ElasticPool<P> {
    pub token0: Address,
    pub token1: Address,
    pub fee: FeeAmount,
    pool_address: Option<Address>,
    factory: IElasticFactory::IElasticFactoryInstance<OnchainProvider<P>>,
    tick_reader: ITickReader::ITickReaderInstance<OnchainProvider<P>>,
    multicall: IMulticall::IMulticallInstance<OnchainProvider<P>>,
    provider: OnchainProvider<P>,
}

impl<P> ElasticPool<P>
where
    P: Provider + Send + Sync + 'static,
{
    pub fn new(
        token0: Address,
        token1: Address,
        fee: FeeAmount,
        factory_address: Address,
        tick_reader_address: Address,
        multicall_address: Address,
        provider: OnchainProvider<P>,
    ) -> Self {
        let (token0, token1) = sort_tokens(token0, token1);

        let factory = IElasticFactory::IElasticFactoryInstance::new(factory_address, provider.clone());
        let tick_reader = ITickReader::ITickReaderInstance::new(tick_reader_address, provider.clone());
        let multicall = IMulticall::IMulticallInstance::new(multicall_address, provider.clone());

        Self {
            token0,
            token1,
            fee,
            pool_address: None,
            factory,
            tick_reader,
            multicall,
            provider,
        }
    }

    /// The resolved pool contract address. Fails until the first successful
    /// [`ElasticPool::generate_state`].
    pub fn pool_address(&self) -> Result<Address, OnchainError> {
        self.pool_address.ok_or(OnchainError::PoolNotResolved)
    }

    async fn resolve_pool_address(&mut self) -> Result<Address, OnchainError> {
        if let Some(address) = self.pool_address {
            return Ok(address);
        }

        let address = self
            .factory
            .getPool(self.token0, self.token1, U24::from(self.fee.fee_units()))
            .call()
            .await
            .map_err(|e| OnchainError::FailedToGetPoolState(e.to_string()))?;

        if address == Address::ZERO {
            return Err(OnchainError::PoolNotFound {
                token0: self.token0,
                token1: self.token1,
                fee: self.fee.fee_units(),
            });
        }

        self.pool_address = Some(address);
        Ok(address)
    }

    /// Rebuilds the complete pool snapshot at `block_number`: price and tick,
    /// base and reinvestment liquidity, and every initialized tick.
    pub async fn generate_state(&mut self, block_number: BlockNumber) -> Result<PoolState, Error> {
        let pool_address = self.resolve_pool_address().await?;
        let pool = IElasticPool::IElasticPoolInstance::new(pool_address, self.provider.clone());

        let pool_state = pool.getPoolState().block(block_number.into()).call();
        let liquidity_state = pool.getLiquidityState().block(block_number.into()).call();
        let all_ticks = self
            .tick_reader
            .getAllTicks(pool_address)
            .block(block_number.into())
            .call();

        let (pool_state, liquidity_state, all_ticks) = futures::try_join!(
            async {
                pool_state
                    .await
                    .map_err(|e| OnchainError::FailedToGetPoolState(e.to_string()))
            },
            async {
                liquidity_state
                    .await
                    .map_err(|e| OnchainError::FailedToGetLiquidityState(e.to_string()))
            },
            async {
                all_ticks
                    .await
                    .map_err(|e| OnchainError::FailedToGetTicks(e.to_string()))
            },
        )?;

        // the reader pads its answer with zero entries
        let tick_indices: Vec<i32> = all_ticks
            .iter()
            .map(|t| t.as_i32())
            .filter(|&t| t != 0)
            .collect();

        let ticks = self
            .fetch_tick_details(&pool, pool_address, &tick_indices, block_number)
            .await?;

        let mut state = PoolState::new(self.fee);
        state.sqrt_price_x96 = U256::from(pool_state.sqrtP);
        state.current_tick = pool_state.currentTick.as_i32();
        state.liquidity = liquidity_state.baseL;
        state.reinvest_liquidity = liquidity_state.reinvestL;
        state.set_ticks(ticks);
        state.is_valid = !pool_state.locked;

        Ok(state)
    }

    /// Batched `ticks(int24)` lookups through the multicall contract.
    async fn fetch_tick_details(
        &self,
        pool: &IElasticPool::IElasticPoolInstance<OnchainProvider<P>>,
        pool_address: Address,
        tick_indices: &[i32],
        block_number: BlockNumber,
    ) -> Result<FastMap<i32, TickInfo>, OnchainError> {
        if tick_indices.is_empty() {
            return Ok(FastMap::default());
        }

        let mut tick_calls: Vec<Call> = Vec::with_capacity(tick_indices.len());
        for &index in tick_indices {
            let i24 = I24::try_from(index)
                .map_err(|e| OnchainError::FailedToDecodeTick(e.to_string()))?;
            tick_calls.push(Call {
                target: pool_address,
                callData: pool.ticks(i24).calldata().to_owned(),
            });
        }

        let return_data = self
            .multicall
            .aggregate(tick_calls)
            .block(block_number.into())
            .call()
            .await
            .map_err(|e| OnchainError::FailedToCallMulticall(e.to_string()))?;

        let mut ticks: FastMap<i32, TickInfo> = FastMap::with_capacity(tick_indices.len());
        for (i, raw) in return_data.returnData.into_iter().enumerate() {
            let index = tick_indices[i];
            let i24 = I24::try_from(index)
                .map_err(|e| OnchainError::FailedToDecodeTick(e.to_string()))?;
            let decoded = pool
                .ticks(i24)
                .decode_output(raw)
                .map_err(|e| OnchainError::FailedToDecodeTick(e.to_string()))?;

            if decoded.liquidityGross == 0 {
                continue;
            }
            ticks.insert(
                index,
                TickInfo {
                    index,
                    liquidity_gross: decoded.liquidityGross,
                    liquidity_net: decoded.liquidityNet,
                    seconds_per_liquidity_outside_x128: U256::from(
                        decoded.secondsPerLiquidityOutside,
                    ),
                    initialized: true,
                    ..Default::default()
                },
            );
        }

        Ok(ticks)
    }
}

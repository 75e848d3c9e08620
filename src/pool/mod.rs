pub mod events;
pub mod quote;
#[cfg(feature = "onchain")]
pub mod replica;
pub mod state;

pub use events::{apply_event, modify_position, PoolEvent};
pub use quote::{query_outputs, SwapSide};
#[cfg(feature = "onchain")]
pub use replica::ElasticPool;
pub use state::{FeeAmount, PoolState};

pub mod balanced;
pub mod capabilities;
pub mod constants;
pub mod descriptor;
pub mod estimate;
pub mod metadata;
pub mod operations;
pub mod pool;
pub mod registry;
pub mod slippage;
pub mod staking;
pub mod strategies;

pub mod abi;
pub mod allowance;
pub mod coin;
pub mod gas;
pub mod prices;
pub mod transport;

pub mod context;
pub mod core;
pub mod curve;
pub mod errors;
pub mod math;

pub use crate::errors::CurveError;

pub use crate::context::{CurveContext, NetworkConfig};
pub use crate::core::coin::Coin;
pub use crate::core::gas::GasEstimate;
pub use crate::core::prices::{PriceOracle, StaticPrices};
pub use crate::core::transport::{AlloyTransport, ChainTransport};
pub use crate::curve::descriptor::PoolDescriptor;
pub use crate::curve::pool::CurvePool;
pub use crate::curve::registry::{DescriptorSource, PoolRegistry, StaticDescriptors};
pub use crate::curve::slippage::SlippageTolerance;
pub use crate::math::{Amount, ToDecimal};

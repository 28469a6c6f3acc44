pub mod decimal;
pub mod fixed_point;

pub use decimal::{Rounding, ToDecimal};
pub use fixed_point::{Amount, format_units, parse_units};

mod fee_rate;
mod micro_units;

pub mod helpers;
pub mod op;
mod secret;

pub use fee_rate::{FeeRate, FeeRateError, BPS_DENOMINATOR, DEFAULT_FEE_RATE_BPS};
pub use micro_units::{MicroUnits, MicroUnitsConversionError, MICRO_UNITS_PER_UNIT};
pub use secret::Secret;

mod money;

pub mod helpers;
pub mod op;
pub mod remote;
mod secret;

pub use money::{Money, MoneyConversionError, MICROS_PER_UNIT};
pub use secret::Secret;

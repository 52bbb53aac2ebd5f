pub mod helpers;
mod money;
mod secret;

pub use money::{Money, MoneyConversionError, DEFAULT_CURRENCY};
pub use secret::Secret;

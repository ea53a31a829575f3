//! Value types shared across the SDK

pub mod amount;
pub mod tx;

pub use amount::MonetaryAmount;
pub use tx::{CallRequest, Receipt, TxRequest};

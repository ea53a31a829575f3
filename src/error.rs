//! Error types for the DonoPot SDK
//!
//! Public operations fail with a [`ClientError`], a small closed set of categories
//! suitable for status display. Transport plumbing uses `eyre` for ergonomic
//! error handling with context.

use crate::abi::resolver::Intent;
use crate::constants::READ_RPC_ENV;
use alloy::primitives::TxHash;
use std::time::Duration;

pub use eyre::{eyre, Context, Report, Result};

/// Failure categories surfaced by [`crate::ContractClient`]
///
/// None of these are fatal to the process; every operation can be retried.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The ABI has no function for the requested operation. Fix the ABI or config.
    #[error("contract ABI has no usable function for {0}")]
    AbiMismatch(Intent),

    /// No read endpoint answered the liveness probe
    #[error("no working read endpoint; set {READ_RPC_ENV} to a reachable RPC URL")]
    NoReachableEndpoint,

    /// No wallet provider was injected
    #[error("no wallet provider detected")]
    WalletUnavailable,

    /// The user declined to authorize the wallet (or to sign)
    #[error("wallet authorization rejected: {0}")]
    AuthorizationRejected(String),

    /// The wallet is not on the expected network and could not be switched
    #[error("wallet is not on chain {expected}: {reason}")]
    NetworkMismatch { expected: u64, reason: String },

    /// The contract call or transaction failed
    #[error("contract call failed: {0}")]
    CallReverted(String),

    /// The transaction was not mined within the caller's bound
    #[error("transaction {hash} not confirmed within {waited:?}")]
    Timeout { hash: TxHash, waited: Duration },

    /// A decimal amount that cannot be represented exactly in base units
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}

impl ClientError {
    /// Build a `CallReverted` from an `eyre` report, keeping its context chain
    pub(crate) fn reverted(report: Report) -> Self {
        Self::CallReverted(format!("{report:#}"))
    }
}

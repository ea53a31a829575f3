//! DonoPot SDK for Rust
//!
//! A Rust client for a donation-pot contract on the Sepolia testnet.
//!
//! # Features
//!
//! - Read the aggregate total and a single account's donations
//! - Donate native currency from a connected wallet
//! - Pick a live read endpoint from an ordered fallback list
//! - Resolve contract functions by conventional name or shape from a runtime ABI
//!
//! # Example
//!
//! ```rust,ignore
//! use donopot_sdk::{AbiDescription, ContractClient, LocalWallet, NetworkConfig};
//! use std::{sync::Arc, time::Duration};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = NetworkConfig::from_env()?;
//!     let abi = AbiDescription::from_file("abi/FheDonoPotMock.json")?;
//!     let wallet = LocalWallet::from_private_key("0x...", &config.chain.rpc_urls[0])?;
//!     let client = ContractClient::new(config, abi).with_wallet(Arc::new(wallet));
//!
//!     println!("Pot holds {} ETH", client.read_aggregate().await?);
//!
//!     let handle = client.submit("0.001".parse()?).await?;
//!     let receipt = handle.await_confirmation(Duration::from_secs(120)).await?;
//!     println!("Mined in block {}", receipt.block_number);
//!
//!     Ok(())
//! }
//! ```

pub mod abi;
pub mod client;
pub mod config;
pub mod constants;
pub mod endpoint;
pub mod error;
pub mod types;
pub mod wallet;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use abi::resolver::Intent;
pub use abi::{AbiDescription, FunctionDescriptor, Mutability};
pub use client::{ActiveConnection, ContractClient, TxHandle};
pub use config::{ChainParams, NetworkConfig};
pub use endpoint::{EndpointConnector, EndpointSelector, HttpConnector, ReadEndpoint};
pub use error::{eyre, ClientError, Context, Report, Result};
pub use types::{CallRequest, MonetaryAmount, Receipt, TxRequest};
pub use wallet::{
    LocalWallet, ProviderRpcError, Subscription, WalletEvent, WalletProvider, WalletSession,
};

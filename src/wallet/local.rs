//! Private key wallet for running outside a browser

use super::{ListenerId, ProviderRpcError, WalletListener, WalletProvider};
use crate::config::ChainParams;
use crate::constants::rpc_codes;
use crate::types::{CallRequest, Receipt, TxRequest};
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use eyre::{Context, Result};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Wallet provider backed by a raw EVM private key
///
/// The key is always authorized and the wallet is bound to the chain of its RPC
/// endpoint, so switch and add requests for other chains are refused. Accounts and
/// chain never change, so registered listeners are kept but never fire.
pub struct LocalWallet {
    /// Provider with wallet filler - handles nonce, gas, chain_id, and signing
    provider: Arc<dyn Provider<Ethereum>>,
    address: Address,
    listeners: Mutex<BTreeMap<ListenerId, WalletListener>>,
    next_listener: AtomicU64,
}

impl LocalWallet {
    /// Create a new LocalWallet from a private key hex string
    ///
    /// # Arguments
    ///
    /// * `private_key` - Hex-encoded private key (with or without 0x prefix)
    /// * `rpc_url` - RPC endpoint URL
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let wallet = LocalWallet::from_private_key(
    ///     "0x...",
    ///     "https://ethereum-sepolia.publicnode.com"
    /// )?;
    /// ```
    pub fn from_private_key(private_key: impl AsRef<str>, rpc_url: impl AsRef<str>) -> Result<Self> {
        let key = private_key.as_ref().trim();
        let key = key.strip_prefix("0x").unwrap_or(key);

        let signer: PrivateKeySigner = key.parse().context("Failed to parse private key")?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let url: Url = rpc_url.as_ref().parse().context("Invalid RPC URL")?;

        // Build provider with wallet filler - this handles nonce, gas, and signing
        let provider = ProviderBuilder::new().wallet(wallet).connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            address,
            listeners: Mutex::new(BTreeMap::new()),
            next_listener: AtomicU64::new(0),
        })
    }

    /// The signing account
    pub fn address(&self) -> Address {
        self.address
    }
}

fn transport_error(context: &str, e: impl std::fmt::Display) -> ProviderRpcError {
    ProviderRpcError::internal(format!("{context}: {e}"))
}

#[async_trait]
impl WalletProvider for LocalWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        Ok(vec![self.address])
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        Ok(vec![self.address])
    }

    async fn chain_id(&self) -> Result<u64, ProviderRpcError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| transport_error("Failed to get chain id", e))
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderRpcError> {
        if self.chain_id().await? == chain_id {
            return Ok(());
        }
        Err(ProviderRpcError::new(
            rpc_codes::UNSUPPORTED_METHOD,
            "A private key wallet cannot switch chains; point it at an RPC for the target chain",
        ))
    }

    async fn add_chain(&self, chain: &ChainParams) -> Result<(), ProviderRpcError> {
        Err(ProviderRpcError::new(
            rpc_codes::UNSUPPORTED_METHOD,
            format!("A private key wallet cannot add {}", chain.chain_name),
        ))
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ProviderRpcError> {
        self.provider
            .call(request.to_rpc())
            .await
            .map_err(|e| transport_error("eth_call failed", e))
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<TxHash, ProviderRpcError> {
        let tx_request = alloy::rpc::types::TransactionRequest::default()
            .with_from(tx.from.unwrap_or(self.address))
            .with_to(tx.to)
            .with_value(tx.value)
            .with_input(tx.data.clone());

        // Send transaction - provider will fill nonce, gas, chain_id and sign
        let pending_tx = self
            .provider
            .send_transaction(tx_request)
            .await
            .map_err(|e| transport_error("Failed to send transaction", e))?;

        Ok(*pending_tx.tx_hash())
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ProviderRpcError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| transport_error("Failed to get transaction receipt", e))?;

        Ok(receipt.as_ref().and_then(Receipt::from_rpc))
    }

    fn add_listener(&self, listener: WalletListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}

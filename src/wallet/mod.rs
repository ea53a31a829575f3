//! Wallet boundary and session management
//!
//! [`WalletProvider`] mirrors an injected EIP-1193 provider: authorization,
//! account and chain queries, chain switching, calls, transactions and change
//! notifications. [`WalletSession`] layers the session rules on top of it.

mod local;

pub use local::LocalWallet;

use crate::config::ChainParams;
use crate::constants::rpc_codes;
use crate::error::ClientError;
use crate::types::{CallRequest, Receipt, TxRequest};
use alloy::primitives::{Address, Bytes, TxHash};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Error returned by a wallet provider, carrying an EIP-1193 code
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("wallet error {code}: {message}")]
pub struct ProviderRpcError {
    pub code: i64,
    pub message: String,
}

impl ProviderRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn user_rejected() -> Self {
        Self::new(rpc_codes::USER_REJECTED, "User rejected the request")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(rpc_codes::INTERNAL, message)
    }

    /// The user declined, or the origin is not authorized
    pub fn is_rejection(&self) -> bool {
        matches!(self.code, rpc_codes::USER_REJECTED | rpc_codes::UNAUTHORIZED)
    }

    pub fn is_unrecognized_chain(&self) -> bool {
        self.code == rpc_codes::UNRECOGNIZED_CHAIN
    }
}

/// Change notification emitted by a wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// Authorized accounts changed; the first is the active one
    AccountsChanged(Vec<Address>),
    /// The wallet moved to another chain
    ChainChanged(u64),
}

pub type ListenerId = u64;
pub type WalletListener = Arc<dyn Fn(&WalletEvent) + Send + Sync>;

/// An injected wallet provider
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// `eth_requestAccounts`: may prompt the user
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderRpcError>;

    /// `eth_accounts`: accounts already authorized, never prompts
    async fn accounts(&self) -> Result<Vec<Address>, ProviderRpcError>;

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, ProviderRpcError>;

    /// `wallet_switchEthereumChain`
    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderRpcError>;

    /// `wallet_addEthereumChain`
    async fn add_chain(&self, chain: &ChainParams) -> Result<(), ProviderRpcError>;

    /// `eth_call` through the wallet's own node connection
    async fn call(&self, request: &CallRequest) -> Result<Bytes, ProviderRpcError>;

    /// `eth_sendTransaction`: returns once the node accepted the transaction
    async fn send_transaction(&self, tx: &TxRequest) -> Result<TxHash, ProviderRpcError>;

    /// `eth_getTransactionReceipt`; `None` while pending
    async fn transaction_receipt(&self, hash: TxHash) -> Result<Option<Receipt>, ProviderRpcError>;

    /// Register for change notifications
    fn add_listener(&self, listener: WalletListener) -> ListenerId;

    /// Remove a listener; unknown ids are ignored
    fn remove_listener(&self, id: ListenerId);
}

/// Detaches wallet listeners. Detaching is idempotent and also happens on drop.
pub struct Subscription {
    provider: Arc<dyn WalletProvider>,
    listeners: Mutex<Vec<ListenerId>>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        let ids = std::mem::take(&mut *self.listeners.lock().unwrap_or_else(PoisonError::into_inner));
        for id in ids {
            self.provider.remove_listener(id);
        }
    }

    pub fn is_active(&self) -> bool {
        !self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Wallet session: authorization state plus network enforcement
pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    account: Mutex<Option<Address>>,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            account: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &Arc<dyn WalletProvider> {
        &self.provider
    }

    /// Account authorized by the last successful [`connect`](Self::connect)
    pub fn authorized_account(&self) -> Option<Address> {
        *self.account.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask the user to authorize the wallet
    pub async fn connect(&self) -> Result<Address, ClientError> {
        let accounts = self
            .provider
            .request_accounts()
            .await
            .map_err(|e| {
                if e.is_rejection() {
                    ClientError::AuthorizationRejected(e.message)
                } else {
                    ClientError::CallReverted(format!("account request failed: {e}"))
                }
            })?;
        let account = accounts.first().copied().ok_or_else(|| {
            ClientError::AuthorizationRejected("wallet returned no accounts".to_string())
        })?;

        *self.account.lock().unwrap_or_else(PoisonError::into_inner) = Some(account);
        debug!(%account, "Wallet connected");
        Ok(account)
    }

    /// Account authorized in an earlier session, without prompting
    pub async fn current_account(&self) -> Option<Address> {
        match self.provider.accounts().await {
            Ok(accounts) => accounts.first().copied(),
            Err(e) => {
                debug!(error = %e, "Wallet account query failed");
                None
            }
        }
    }

    /// Whether the wallet currently sits on `chain_id`; query failures count as no
    pub async fn is_on_chain(&self, chain_id: u64) -> bool {
        match self.provider.chain_id().await {
            Ok(current) => current == chain_id,
            Err(e) => {
                debug!(error = %e, "Wallet chain query failed");
                false
            }
        }
    }

    /// Make sure the wallet is on `expected`, switching (and adding) the network if needed
    pub async fn ensure_network(&self, expected: &ChainParams) -> Result<(), ClientError> {
        let mismatch = |e: ProviderRpcError| ClientError::NetworkMismatch {
            expected: expected.chain_id,
            reason: e.to_string(),
        };

        let current = self.provider.chain_id().await.map_err(mismatch)?;
        if current == expected.chain_id {
            return Ok(());
        }

        info!(from = current, to = expected.chain_id, "Requesting wallet network switch");
        match self.provider.switch_chain(expected.chain_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_unrecognized_chain() => {
                info!(chain = %expected.chain_name, "Wallet does not know the network, requesting it be added");
                self.provider.add_chain(expected).await.map_err(mismatch)?;
                self.provider
                    .switch_chain(expected.chain_id)
                    .await
                    .map_err(mismatch)
            }
            Err(e) => Err(mismatch(e)),
        }
    }

    /// Register for account and network changes
    ///
    /// `on_account` receives the newly active account (`None` once all are revoked),
    /// `on_network` the new chain ID.
    pub fn subscribe(
        &self,
        on_account: impl Fn(Option<Address>) + Send + Sync + 'static,
        on_network: impl Fn(u64) + Send + Sync + 'static,
    ) -> Subscription {
        let accounts = self.provider.add_listener(Arc::new(move |event: &WalletEvent| {
            if let WalletEvent::AccountsChanged(accounts) = event {
                on_account(accounts.first().copied());
            }
        }));
        let chain = self.provider.add_listener(Arc::new(move |event: &WalletEvent| {
            if let WalletEvent::ChainChanged(chain_id) = event {
                on_network(*chain_id);
            }
        }));

        Subscription {
            provider: self.provider.clone(),
            listeners: Mutex::new(vec![accounts, chain]),
        }
    }
}

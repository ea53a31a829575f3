//! ContractClient - main entry point for the SDK

use crate::abi::resolver::{self, AmountEncoding, Binding, Intent, Resolved};
use crate::abi::{AbiDescription, Invocation};
use crate::config::NetworkConfig;
use crate::endpoint::{EndpointConnector, EndpointSelector, HttpConnector, ReadEndpoint};
use crate::error::ClientError;
use crate::types::{CallRequest, MonetaryAmount, Receipt};
use crate::wallet::{Subscription, WalletProvider, WalletSession};
use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use eyre::{Context, Result};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection used for a read
#[derive(Clone)]
pub enum ActiveConnection {
    /// The wallet's own node connection, used when it is already on the right network
    Wallet(Arc<dyn WalletProvider>),
    /// A probed read-only endpoint
    ReadOnly(Arc<dyn ReadEndpoint>),
}

impl ActiveConnection {
    pub async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        match self {
            Self::Wallet(wallet) => wallet.call(request).await.context("Wallet eth_call failed"),
            Self::ReadOnly(endpoint) => endpoint
                .call(request)
                .await
                .with_context(|| format!("eth_call via {} failed", endpoint.url())),
        }
    }

    pub fn is_wallet(&self) -> bool {
        matches!(self, Self::Wallet(_))
    }
}

impl std::fmt::Debug for ActiveConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wallet(_) => f.write_str("Wallet"),
            Self::ReadOnly(endpoint) => f.debug_tuple("ReadOnly").field(&endpoint.url()).finish(),
        }
    }
}

/// A submitted transaction
///
/// Submission and finality are separate: the handle exists as soon as the node
/// accepts the transaction, and [`await_confirmation`](Self::await_confirmation)
/// consumes it to wait for the receipt.
pub struct TxHandle {
    hash: TxHash,
    wallet: Arc<dyn WalletProvider>,
    poll_interval: Duration,
}

impl TxHandle {
    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Wait until the transaction is mined, for at most `timeout`
    ///
    /// Fails with `CallReverted` if it reverted on-chain and with `Timeout` if no
    /// receipt showed up in time. Failed receipt queries are logged and retried.
    pub async fn await_confirmation(self, timeout: Duration) -> Result<Receipt, ClientError> {
        match tokio::time::timeout(timeout, self.poll_receipt()).await {
            Ok(receipt) => receipt,
            Err(_) => Err(ClientError::Timeout {
                hash: self.hash,
                waited: timeout,
            }),
        }
    }

    async fn poll_receipt(&self) -> Result<Receipt, ClientError> {
        loop {
            match self.wallet.transaction_receipt(self.hash).await {
                Ok(Some(receipt)) if !receipt.success => {
                    return Err(ClientError::CallReverted(format!(
                        "transaction {} reverted in block {}",
                        self.hash, receipt.block_number
                    )));
                }
                Ok(Some(receipt)) => {
                    info!(tx = %self.hash, block = receipt.block_number, "Transaction confirmed");
                    return Ok(receipt);
                }
                Ok(None) => {}
                // Retried until the caller's timeout
                Err(e) => warn!(tx = %self.hash, error = %e, "Receipt query failed"),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

impl std::fmt::Debug for TxHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxHandle").field("hash", &self.hash).finish()
    }
}

/// Main client for reading from and donating to the contract
pub struct ContractClient {
    config: NetworkConfig,
    abi: AbiDescription,
    endpoints: EndpointSelector,
    wallet: Option<WalletSession>,
    resolutions: [OnceLock<Option<Resolved>>; 3],
}

fn slot(intent: Intent) -> usize {
    match intent {
        Intent::AggregateTotal => 0,
        Intent::AccountValue => 1,
        Intent::Donate => 2,
    }
}

impl ContractClient {
    /// Create a client that reads over HTTP JSON-RPC
    pub fn new(config: NetworkConfig, abi: AbiDescription) -> Self {
        Self::with_connector(config, abi, Arc::new(HttpConnector))
    }

    /// Create a client with a custom endpoint connector
    pub fn with_connector(
        config: NetworkConfig,
        abi: AbiDescription,
        connector: Arc<dyn EndpointConnector>,
    ) -> Self {
        let endpoints =
            EndpointSelector::new(config.read_endpoints(), connector, config.probe_timeout);

        Self {
            config,
            abi,
            endpoints,
            wallet: None,
            resolutions: Default::default(),
        }
    }

    /// Attach an injected wallet provider
    pub fn with_wallet(mut self, provider: Arc<dyn WalletProvider>) -> Self {
        self.wallet = Some(WalletSession::new(provider));
        self
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn abi(&self) -> &AbiDescription {
        &self.abi
    }

    /// The wallet session, if a provider was injected
    pub fn wallet(&self) -> Result<&WalletSession, ClientError> {
        self.wallet.as_ref().ok_or(ClientError::WalletUnavailable)
    }

    /// The function serving `intent`; resolved once and memoized
    pub fn resolve(&self, intent: Intent) -> Result<&Resolved, ClientError> {
        self.resolutions[slot(intent)]
            .get_or_init(|| {
                let resolved = resolver::resolve(&self.abi, intent);
                match &resolved {
                    Some(r) => debug!(%intent, function = %r.function, binding = ?r.binding, "Resolved contract function"),
                    None => warn!(%intent, "No contract function matches"),
                }
                resolved
            })
            .as_ref()
            .ok_or(ClientError::AbiMismatch(intent))
    }

    // ========== Connections ==========

    /// Connection for reads: the wallet if it is already on the right network,
    /// otherwise the first live read endpoint
    pub async fn read_connection(&self) -> Result<ActiveConnection, ClientError> {
        if let Some(session) = &self.wallet {
            if session.is_on_chain(self.config.chain.chain_id).await {
                debug!("Reusing wallet connection for reads");
                return Ok(ActiveConnection::Wallet(session.provider().clone()));
            }
        }

        Ok(ActiveConnection::ReadOnly(self.endpoints.connection().await?))
    }

    /// Forget the cached read endpoint; the next read probes the list again
    pub fn reset_read_connection(&self) {
        self.endpoints.invalidate();
    }

    // ========== Wallet ==========

    /// Ask the user to authorize the wallet
    pub async fn connect_wallet(&self) -> Result<Address, ClientError> {
        self.wallet()?.connect().await
    }

    /// Account already authorized, without prompting
    pub async fn current_account(&self) -> Option<Address> {
        match &self.wallet {
            Some(session) => session.current_account().await,
            None => None,
        }
    }

    /// Switch the wallet to the configured network if needed
    pub async fn ensure_network(&self) -> Result<(), ClientError> {
        self.wallet()?.ensure_network(&self.config.chain).await
    }

    /// Register for wallet account and network changes
    pub fn subscribe(
        &self,
        on_account: impl Fn(Option<Address>) + Send + Sync + 'static,
        on_network: impl Fn(u64) + Send + Sync + 'static,
    ) -> Result<Subscription, ClientError> {
        Ok(self.wallet()?.subscribe(on_account, on_network))
    }

    // ========== Reads ==========

    /// Aggregate total held by the contract
    pub async fn read_aggregate(&self) -> Result<MonetaryAmount, ClientError> {
        let resolved = self.resolve(Intent::AggregateTotal)?;
        self.read_amount(Invocation::new(resolved.function.clone()))
            .await
    }

    /// Value attributed to `account`; zero without any network traffic when absent
    pub async fn read_account_value(
        &self,
        account: Option<Address>,
    ) -> Result<MonetaryAmount, ClientError> {
        let Some(account) = account else {
            return Ok(MonetaryAmount::ZERO);
        };

        let resolved = self.resolve(Intent::AccountValue)?;
        let invocation = Invocation::new(resolved.function.clone());
        let invocation = match resolved.binding {
            Binding::SenderOverride => invocation.with_sender(account),
            _ => invocation.with_arg(DynSolValue::Address(account)),
        };
        self.read_amount(invocation).await
    }

    async fn read_amount(&self, invocation: Invocation) -> Result<MonetaryAmount, ClientError> {
        let request = invocation
            .call_request(self.config.contract)
            .map_err(ClientError::reverted)?;
        let connection = self.read_connection().await?;

        let raw = connection
            .call(&request)
            .await
            .map_err(ClientError::reverted)?;
        let value = invocation.decode_amount(&raw).map_err(ClientError::reverted)?;

        Ok(MonetaryAmount::from_base_units(value))
    }

    // ========== Writes ==========

    /// Donate `amount` from the connected wallet
    ///
    /// Authorizes the wallet and enforces the network before anything is built.
    /// Returns as soon as the node accepts the transaction. Callers must not run
    /// two submissions concurrently.
    pub async fn submit(&self, amount: MonetaryAmount) -> Result<TxHandle, ClientError> {
        let session = self.wallet()?;
        let account = session.connect().await?;
        session.ensure_network(&self.config.chain).await?;

        let resolved = self.resolve(Intent::Donate)?;
        let tx = donation(resolved, amount)?
            .tx_request(self.config.contract)
            .map_err(ClientError::reverted)?
            .with_from(account);

        info!(
            from = %account,
            function = %resolved.function,
            value = %tx.value,
            amount = %amount,
            "Submitting donation"
        );

        let hash = session.provider().send_transaction(&tx).await.map_err(|e| {
            if e.is_rejection() {
                ClientError::AuthorizationRejected(e.message)
            } else {
                ClientError::CallReverted(e.to_string())
            }
        })?;

        Ok(TxHandle {
            hash,
            wallet: session.provider().clone(),
            poll_interval: self.config.receipt_poll_interval,
        })
    }

    // ========== Utility Methods ==========

    /// Explorer page for the contract
    pub fn contract_url(&self) -> String {
        self.config.contract_url()
    }

    /// Explorer page for a transaction
    pub fn tx_url(&self, tx_hash: TxHash) -> String {
        self.config.tx_url(tx_hash)
    }
}

/// Bind a donation of `amount` to the resolved `donate` function
pub fn donation(resolved: &Resolved, amount: MonetaryAmount) -> Result<Invocation, ClientError> {
    let Binding::Donation(encoding) = resolved.binding else {
        return Err(ClientError::AbiMismatch(Intent::Donate));
    };

    let wei = amount.base_units();
    let invocation = Invocation::new(resolved.function.clone());
    let amount_arg = || {
        crate::abi::uint_arg(&resolved.function.inputs[0], wei)
            .map_err(|e| ClientError::InvalidAmount(format!("{e:#}")))
    };

    Ok(match encoding {
        AmountEncoding::ValueOnly => invocation.with_value(wei),
        AmountEncoding::ArgumentAndValue => invocation.with_arg(amount_arg()?).with_value(wei),
        AmountEncoding::ArgumentOnly => invocation.with_arg(amount_arg()?).with_value(U256::ZERO),
    })
}

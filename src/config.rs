//! Network configuration for the DonoPot SDK

use crate::constants::{
    ADDRESSES_CONTRACT, ADDRESSES_FILE_ENV, ADDRESSES_NETWORK, CONTRACT_ADDRESS_ENV,
    DEFAULT_PROBE_TIMEOUT, DEFAULT_RECEIPT_POLL_INTERVAL, NATIVE_DECIMALS, PUBLIC_SEPOLIA_RPCS,
    READ_RPC_ENV, SEPOLIA_CHAIN_ID, SEPOLIA_CHAIN_NAME, SEPOLIA_CURRENCY_NAME,
    SEPOLIA_CURRENCY_SYMBOL, SEPOLIA_EXPLORER,
};
use alloy::primitives::{Address, TxHash};
use eyre::{Context, ContextCompat, Result};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Native currency metadata, as wallets expect it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Chain description in the `wallet_addEthereumChain` shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    /// Serialized as a 0x-prefixed hex string
    #[serde(serialize_with = "hex_chain_id")]
    pub chain_id: u64,
    pub chain_name: String,
    pub native_currency: NativeCurrency,
    pub rpc_urls: Vec<String>,
    pub block_explorer_urls: Vec<String>,
}

fn hex_chain_id<S: Serializer>(chain_id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{chain_id:#x}"))
}

impl ChainParams {
    /// Sepolia testnet, with `rpc_url` as the fallback RPC wallets should use
    pub fn sepolia(rpc_url: impl Into<String>) -> Self {
        Self {
            chain_id: SEPOLIA_CHAIN_ID,
            chain_name: SEPOLIA_CHAIN_NAME.to_string(),
            native_currency: NativeCurrency {
                name: SEPOLIA_CURRENCY_NAME.to_string(),
                symbol: SEPOLIA_CURRENCY_SYMBOL.to_string(),
                decimals: NATIVE_DECIMALS,
            },
            rpc_urls: vec![rpc_url.into()],
            block_explorer_urls: vec![SEPOLIA_EXPLORER.to_string()],
        }
    }

    /// Explorer base URL without a trailing slash
    pub fn explorer(&self) -> &str {
        self.block_explorer_urls
            .first()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_default()
    }
}

/// Network configuration: chain, read endpoints, and the deployed contract
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Chain the contract lives on
    pub chain: ChainParams,
    /// Read endpoints, tried in order
    pub read_rpc_urls: Vec<String>,
    /// Deployed contract address
    pub contract: Address,
    /// Upper bound for each endpoint liveness probe
    pub probe_timeout: Duration,
    /// Interval between receipt polls
    pub receipt_poll_interval: Duration,
}

impl NetworkConfig {
    /// Sepolia configuration using the built-in public read endpoints
    pub fn sepolia(contract: Address) -> Self {
        Self {
            chain: ChainParams::sepolia(PUBLIC_SEPOLIA_RPCS[0]),
            read_rpc_urls: PUBLIC_SEPOLIA_RPCS.iter().map(|url| url.to_string()).collect(),
            contract,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
        }
    }

    /// Load from the environment (and `.env`, if present)
    ///
    /// The contract address comes from `DONOPOT_CONTRACT_ADDRESS`, or else from the
    /// addresses.json named by `DONOPOT_ADDRESSES_FILE`. `DONOPOT_READ_RPC` is optional
    /// and is tried before the public endpoints.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let contract = match std::env::var(CONTRACT_ADDRESS_ENV) {
            Ok(address) => address
                .trim()
                .parse()
                .with_context(|| format!("Invalid {CONTRACT_ADDRESS_ENV}"))?,
            Err(_) => {
                let path = std::env::var(ADDRESSES_FILE_ENV).with_context(|| {
                    format!("Set {CONTRACT_ADDRESS_ENV} or {ADDRESSES_FILE_ENV}")
                })?;
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {path}"))?;
                contract_from_addresses(&json, ADDRESSES_NETWORK, ADDRESSES_CONTRACT)?
            }
        };

        let config = Self::sepolia(contract);
        Ok(match std::env::var(READ_RPC_ENV) {
            Ok(url) if !url.trim().is_empty() => config.with_read_rpc(url.trim()),
            _ => config,
        })
    }

    /// Put an operator endpoint ahead of the others; wallets are pointed at it too
    pub fn with_read_rpc(mut self, rpc_url: impl Into<String>) -> Self {
        let rpc_url = rpc_url.into();
        self.chain.rpc_urls = vec![rpc_url.clone()];
        self.read_rpc_urls.insert(0, rpc_url);
        self
    }

    /// Replace the read endpoint list
    pub fn with_read_rpc_urls(mut self, urls: Vec<String>) -> Self {
        self.read_rpc_urls = urls;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_receipt_poll_interval(mut self, interval: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self
    }

    /// Configured read endpoints, skipping blank entries
    pub fn read_endpoints(&self) -> impl Iterator<Item = &str> {
        self.read_rpc_urls
            .iter()
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
    }

    /// Explorer page for the contract
    pub fn contract_url(&self) -> String {
        format!("{}/address/{}", self.chain.explorer(), self.contract)
    }

    /// Explorer page for a transaction
    pub fn tx_url(&self, tx_hash: TxHash) -> String {
        format!("{}/tx/{}", self.chain.explorer(), tx_hash)
    }
}

/// Look up a contract address in the deployment tooling's addresses.json
/// (`{ "<network>": { "<contract>": "0x..." } }`)
pub fn contract_from_addresses(json: &str, network: &str, contract: &str) -> Result<Address> {
    let addresses: serde_json::Value =
        serde_json::from_str(json).context("Invalid addresses JSON")?;
    addresses
        .get(network)
        .and_then(|deployed| deployed.get(contract))
        .and_then(|address| address.as_str())
        .with_context(|| format!("Missing {network}.{contract} in addresses JSON"))?
        .parse()
        .with_context(|| format!("Invalid address for {network}.{contract}"))
}

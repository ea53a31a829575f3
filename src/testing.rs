//! Recording test doubles for the wallet and endpoint boundaries

use crate::config::ChainParams;
use crate::constants::rpc_codes;
use crate::endpoint::{EndpointConnector, ReadEndpoint};
use crate::types::{CallRequest, Receipt, TxRequest};
use crate::wallet::{ListenerId, ProviderRpcError, WalletEvent, WalletListener, WalletProvider};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use async_trait::async_trait;
use eyre::{bail, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn word(value: U256) -> Bytes {
    Bytes::from(value.to_be_bytes::<32>().to_vec())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Liveness {
    Live,
    Dead,
    Stalled,
}

/// Read endpoint that answers every call with one fixed amount
pub(crate) struct SpyEndpoint {
    url: String,
    liveness: Liveness,
    answer: U256,
    delay: Duration,
    probes: AtomicUsize,
    calls: Mutex<Vec<CallRequest>>,
}

impl SpyEndpoint {
    fn with_liveness(url: &str, liveness: Liveness) -> Self {
        Self {
            url: url.to_string(),
            liveness,
            answer: U256::ZERO,
            delay: Duration::ZERO,
            probes: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn live(url: &str) -> Self {
        Self::with_liveness(url, Liveness::Live)
    }

    pub(crate) fn dead(url: &str) -> Self {
        Self::with_liveness(url, Liveness::Dead)
    }

    /// Probe never completes
    pub(crate) fn stalled(url: &str) -> Self {
        Self::with_liveness(url, Liveness::Stalled)
    }

    pub(crate) fn answering(mut self, answer: U256) -> Self {
        self.answer = answer;
        self
    }

    /// Live, but each probe takes `delay`
    pub(crate) fn slow(url: &str, delay: Duration) -> Self {
        let mut endpoint = Self::live(url);
        endpoint.delay = delay;
        endpoint
    }

    /// Same behavior, separate instance and counters
    fn duplicate(&self) -> Self {
        let mut endpoint = Self::with_liveness(&self.url, self.liveness).answering(self.answer);
        endpoint.delay = self.delay;
        endpoint
    }

    pub(crate) fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReadEndpoint for SpyEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn block_number(&self) -> Result<u64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        match self.liveness {
            Liveness::Live => {
                tokio::time::sleep(self.delay).await;
                Ok(7_000_000)
            }
            Liveness::Dead => bail!("connection refused"),
            Liveness::Stalled => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(0)
            }
        }
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        self.calls.lock().unwrap().push(request.clone());
        match self.liveness {
            Liveness::Live => Ok(word(self.answer)),
            _ => bail!("connection refused"),
        }
    }
}

/// Connector over a fixed set of spy endpoints; unknown URLs fail to open
pub(crate) struct SpyConnector {
    endpoints: BTreeMap<String, Arc<SpyEndpoint>>,
    opened: Mutex<Vec<String>>,
    fresh: bool,
}

impl SpyConnector {
    pub(crate) fn new() -> Self {
        Self {
            endpoints: BTreeMap::new(),
            opened: Mutex::new(Vec::new()),
            fresh: false,
        }
    }

    /// Every open returns a new instance instead of the registered one
    pub(crate) fn opening_fresh(mut self) -> Self {
        self.fresh = true;
        self
    }

    pub(crate) fn with(mut self, endpoint: SpyEndpoint) -> Self {
        self.endpoints.insert(endpoint.url.clone(), Arc::new(endpoint));
        self
    }

    pub(crate) fn endpoint(&self, url: &str) -> Arc<SpyEndpoint> {
        self.endpoints[url].clone()
    }

    pub(crate) fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// Probes plus calls across every endpoint
    pub(crate) fn network_calls(&self) -> usize {
        self.endpoints
            .values()
            .map(|e| e.probes() + e.calls().len())
            .sum()
    }
}

impl EndpointConnector for SpyConnector {
    fn open(&self, url: &str) -> Result<Arc<dyn ReadEndpoint>> {
        self.opened.lock().unwrap().push(url.to_string());
        match self.endpoints.get(url) {
            Some(endpoint) if self.fresh => Ok(Arc::new(endpoint.duplicate())),
            Some(endpoint) => Ok(endpoint.clone()),
            None => bail!("dns error: {url}"),
        }
    }
}

/// Scriptable wallet that records every request
pub(crate) struct SpyWallet {
    accounts: Mutex<Vec<Address>>,
    chain: Mutex<u64>,
    known_chains: Mutex<HashSet<u64>>,
    connect_error: Option<i64>,
    reject_switch: bool,
    reject_send: bool,
    answer: U256,
    receipt: Mutex<Option<Receipt>>,
    failing_receipt_queries: AtomicUsize,
    receipt_queries: AtomicUsize,
    request_accounts_calls: AtomicUsize,
    chain_queries: AtomicUsize,
    switch_requests: Mutex<Vec<u64>>,
    add_requests: Mutex<Vec<ChainParams>>,
    calls: Mutex<Vec<CallRequest>>,
    sent: Mutex<Vec<TxRequest>>,
    listeners: Mutex<BTreeMap<ListenerId, WalletListener>>,
    next_listener: AtomicUsize,
}

impl SpyWallet {
    pub(crate) fn new(chain_id: u64) -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            chain: Mutex::new(chain_id),
            known_chains: Mutex::new(HashSet::from([chain_id])),
            connect_error: None,
            reject_switch: false,
            reject_send: false,
            answer: U256::ZERO,
            receipt: Mutex::new(None),
            failing_receipt_queries: AtomicUsize::new(0),
            receipt_queries: AtomicUsize::new(0),
            request_accounts_calls: AtomicUsize::new(0),
            chain_queries: AtomicUsize::new(0),
            switch_requests: Mutex::new(Vec::new()),
            add_requests: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            sent: Mutex::new(Vec::new()),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener: AtomicUsize::new(0),
        }
    }

    /// Accounts already authorized
    pub(crate) fn with_accounts(self, accounts: Vec<Address>) -> Self {
        *self.accounts.lock().unwrap() = accounts;
        self
    }

    pub(crate) fn knowing_chain(self, chain_id: u64) -> Self {
        self.known_chains.lock().unwrap().insert(chain_id);
        self
    }

    pub(crate) fn rejecting_connect(mut self) -> Self {
        self.connect_error = Some(rpc_codes::USER_REJECTED);
        self
    }

    /// Account requests fail with an internal error
    pub(crate) fn failing_connect(mut self) -> Self {
        self.connect_error = Some(rpc_codes::INTERNAL);
        self
    }

    pub(crate) fn rejecting_switch(mut self) -> Self {
        self.reject_switch = true;
        self
    }

    pub(crate) fn rejecting_send(mut self) -> Self {
        self.reject_send = true;
        self
    }

    pub(crate) fn answering(mut self, answer: U256) -> Self {
        self.answer = answer;
        self
    }

    /// The next `count` receipt queries fail with an internal error
    pub(crate) fn failing_receipt_queries(self, count: usize) -> Self {
        self.failing_receipt_queries.store(count, Ordering::SeqCst);
        self
    }

    /// Receipt returned for any hash from now on
    pub(crate) fn mine(&self, receipt: Receipt) {
        *self.receipt.lock().unwrap() = Some(receipt);
    }

    pub(crate) fn emit(&self, event: WalletEvent) {
        let listeners: Vec<_> = self.listeners.lock().unwrap().values().cloned().collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub(crate) fn current_chain(&self) -> u64 {
        *self.chain.lock().unwrap()
    }

    pub(crate) fn receipt_queries(&self) -> usize {
        self.receipt_queries.load(Ordering::SeqCst)
    }

    pub(crate) fn request_accounts_calls(&self) -> usize {
        self.request_accounts_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn chain_queries(&self) -> usize {
        self.chain_queries.load(Ordering::SeqCst)
    }

    pub(crate) fn switch_requests(&self) -> Vec<u64> {
        self.switch_requests.lock().unwrap().clone()
    }

    pub(crate) fn add_requests(&self) -> Vec<ChainParams> {
        self.add_requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

#[async_trait]
impl WalletProvider for SpyWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        self.request_accounts_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(code) = self.connect_error {
            return Err(ProviderRpcError::new(code, "account request failed"));
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, ProviderRpcError> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderRpcError> {
        self.chain_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.current_chain())
    }

    async fn switch_chain(&self, chain_id: u64) -> Result<(), ProviderRpcError> {
        self.switch_requests.lock().unwrap().push(chain_id);
        if self.reject_switch {
            return Err(ProviderRpcError::user_rejected());
        }
        if !self.known_chains.lock().unwrap().contains(&chain_id) {
            return Err(ProviderRpcError::new(rpc_codes::UNRECOGNIZED_CHAIN, "Unrecognized chain ID"));
        }
        *self.chain.lock().unwrap() = chain_id;
        Ok(())
    }

    async fn add_chain(&self, chain: &ChainParams) -> Result<(), ProviderRpcError> {
        self.add_requests.lock().unwrap().push(chain.clone());
        self.known_chains.lock().unwrap().insert(chain.chain_id);
        Ok(())
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes, ProviderRpcError> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(word(self.answer))
    }

    async fn send_transaction(&self, tx: &TxRequest) -> Result<TxHash, ProviderRpcError> {
        if self.reject_send {
            return Err(ProviderRpcError::user_rejected());
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx.clone());
        Ok(TxHash::with_last_byte(sent.len() as u8))
    }

    async fn transaction_receipt(&self, _hash: TxHash) -> Result<Option<Receipt>, ProviderRpcError> {
        self.receipt_queries.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_receipt_queries.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(ProviderRpcError::internal("rate limited"));
        }
        Ok(self.receipt.lock().unwrap().clone())
    }

    fn add_listener(&self, listener: WalletListener) -> ListenerId {
        let id = self.next_listener.fetch_add(1, Ordering::SeqCst) as ListenerId;
        self.listeners.lock().unwrap().insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.lock().unwrap().remove(&id);
    }
}

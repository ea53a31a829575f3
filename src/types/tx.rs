//! Request and receipt shapes at the contract call boundary

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionReceipt;

/// A read-only `eth_call` against the contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    /// Target contract address
    pub to: Address,
    /// Encoded calldata
    pub data: Bytes,
    /// Execution sender override (`msg.sender` as seen by the contract).
    /// This is not an argument; it is carried as the call's `from`.
    pub from: Option<Address>,
}

impl CallRequest {
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
            from: None,
        }
    }

    /// Simulate the call as if issued by `sender`
    pub fn with_sender(mut self, sender: Address) -> Self {
        self.from = Some(sender);
        self
    }

    pub(crate) fn to_rpc(&self) -> alloy::rpc::types::TransactionRequest {
        use alloy::network::TransactionBuilder;

        let mut request = alloy::rpc::types::TransactionRequest::default()
            .with_to(self.to)
            .with_input(self.data.clone());
        if let Some(from) = self.from {
            request = request.with_from(from);
        }
        request
    }
}

/// Transaction request parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Sending account
    pub from: Option<Address>,
    /// Target contract address
    pub to: Address,
    /// Transaction value in wei
    pub value: U256,
    /// Encoded calldata
    pub data: Bytes,
}

impl TxRequest {
    /// Create a new transaction request
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            value: U256::ZERO,
            data: data.into(),
        }
    }

    /// Set the sending account
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set transaction value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub transaction_hash: TxHash,
    /// Block the transaction was included in
    pub block_number: u64,
    /// False when the transaction reverted on-chain
    pub success: bool,
}

impl Receipt {
    /// Convert an RPC receipt; pending receipts (no block yet) yield `None`
    pub fn from_rpc(receipt: &TransactionReceipt) -> Option<Self> {
        Some(Self {
            transaction_hash: receipt.transaction_hash(),
            block_number: receipt.block_number()?,
            success: receipt.status(),
        })
    }
}

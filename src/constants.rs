//! Constants for the DonoPot SDK

use std::time::Duration;

/// Sepolia chain ID
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Display name used when asking a wallet to add Sepolia
pub const SEPOLIA_CHAIN_NAME: &str = "Sepolia";

/// Native currency metadata for Sepolia
pub const SEPOLIA_CURRENCY_NAME: &str = "SepoliaETH";
pub const SEPOLIA_CURRENCY_SYMBOL: &str = "ETH";

/// Native amounts use 18 decimals (wei)
pub const NATIVE_DECIMALS: u8 = 18;

/// Block explorer base URL (trailing slash included)
pub const SEPOLIA_EXPLORER: &str = "https://sepolia.etherscan.io/";

/// Public read endpoints, tried in order after the operator endpoint
pub const PUBLIC_SEPOLIA_RPCS: [&str; 3] = [
    "https://ethereum-sepolia.publicnode.com",
    "https://rpc.sepolia.org",
    "https://endpoints.omniatech.io/v1/eth/sepolia/public",
];

/// Operator-supplied read endpoint (tried first)
pub const READ_RPC_ENV: &str = "DONOPOT_READ_RPC";

/// Deployed contract address
pub const CONTRACT_ADDRESS_ENV: &str = "DONOPOT_CONTRACT_ADDRESS";

/// Path to the deployment tooling's addresses.json (used when no address is set)
pub const ADDRESSES_FILE_ENV: &str = "DONOPOT_ADDRESSES_FILE";

/// Network key and contract name inside addresses.json
pub const ADDRESSES_NETWORK: &str = "sepolia";
pub const ADDRESSES_CONTRACT: &str = "FheDonoPotMock";

/// Upper bound for a single endpoint liveness probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between receipt polls while awaiting confirmation
pub const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// EIP-1193 provider error codes
pub mod rpc_codes {
    /// User rejected the request
    pub const USER_REJECTED: i64 = 4001;
    /// The requested account or method has not been authorized
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the requested method
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The chain has not been added to the wallet
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// Internal JSON-RPC error
    pub const INTERNAL: i64 = -32603;
}

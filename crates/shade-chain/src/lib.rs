//! shade chain
//!
//! typed encoding and decoding of everything that crosses the contract
//! boundary: deposits, withdrawals, relays, ragequits, scope and asset
//! lookups, plus the context hash binding a proof to its withdrawal
//! payload. higher layers never see raw abi.

pub mod client;
pub mod context;
pub mod encoding;
pub mod error;
pub mod types;

pub use client::PoolClient;
pub use context::calculate_context;
pub use encoding::{pack_ragequit_proof, pack_withdrawal_proof};
pub use error::ChainError;
pub use types::{
    AssetConfig, RelayData, ScopeData, Withdrawal, FEE_DENOMINATOR, NATIVE_ASSET,
};

//! relayer error taxonomy
//!
//! every rejection carries a stable code the http layer serializes as
//! `{name, message, code, details}`. policy rejections are recoverable
//! per request; store and artifact failures terminate the process.

use alloy::primitives::{Address, U256};
use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unsupported chain {0}")]
    UnsupportedChain(u64),
    #[error("asset {0} is not supported on this chain")]
    AssetNotSupported(Address),
    #[error("processooor {got} does not match entrypoint {expected}")]
    ProcessooorMismatch { expected: Address, got: Address },
    #[error("fee recipient {got} does not match {expected}")]
    FeeReceiverMismatch { expected: Address, got: Address },
    #[error("relay fee {got} bps below required {required} bps")]
    FeeTooLow { required: U256, got: U256 },
    #[error("context mismatch: proof was built for a different payload")]
    ContextMismatch,
    #[error("relayer commitment rejected: {0}")]
    RelayerCommitmentRejected(String),
    #[error("withdrawn value too small")]
    InsufficientWithdrawnValue,
    #[error("proof verification failed")]
    InvalidProof,
    #[error("gas price {current} above ceiling {max}")]
    MaxGasPrice { current: u128, max: u128 },
    #[error("transaction failed: {0}")]
    TransactionError(String),
    #[error("scope lookup failed: {0}")]
    ScopeData(String),
    #[error("extra gas requested but no wrapped native token is configured")]
    MissingWrappedNative,
    #[error("price quote failed: {0}")]
    Quote(String),
    #[error("request store error: {0}")]
    Store(String),
    #[error("chain error: {0}")]
    Chain(String),
    #[error("prover error: {0}")]
    Proof(String),
}

pub type Result<T> = std::result::Result<T, RelayerError>;

impl RelayerError {
    /// stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RelayerError::InvalidInput(_) => "INVALID_INPUT",
            RelayerError::UnsupportedChain(_) => "UNSUPPORTED_CHAIN",
            RelayerError::AssetNotSupported(_) => "ASSET_NOT_SUPPORTED",
            RelayerError::ProcessooorMismatch { .. } => "PROCESSOOOR_MISMATCH",
            RelayerError::FeeReceiverMismatch { .. } => "FEE_RECEIVER_MISMATCH",
            RelayerError::FeeTooLow { .. } => "FEE_TOO_LOW",
            RelayerError::ContextMismatch => "CONTEXT_MISMATCH",
            RelayerError::RelayerCommitmentRejected(_) => "RELAYER_COMMITMENT_REJECTED",
            RelayerError::InsufficientWithdrawnValue => "INSUFFICIENT_WITHDRAWN_VALUE",
            RelayerError::InvalidProof => "INVALID_PROOF",
            RelayerError::MaxGasPrice { .. } => "MAX_GAS_PRICE",
            RelayerError::TransactionError(_) => "TRANSACTION_ERROR",
            RelayerError::ScopeData(_) => "SCOPE_DATA_ERROR",
            RelayerError::MissingWrappedNative => "MISSING_WRAPPED_NATIVE",
            RelayerError::Quote(_) => "QUOTE_ERROR",
            RelayerError::Store(_) => "STORE_ERROR",
            RelayerError::Chain(_) => "CHAIN_ERROR",
            RelayerError::Proof(_) => "PROOF_ERROR",
        }
    }

    /// transport-level status for errors surfaced outside the relay
    /// response envelope
    pub fn status(&self) -> StatusCode {
        match self {
            RelayerError::InvalidInput(_)
            | RelayerError::UnsupportedChain(_)
            | RelayerError::AssetNotSupported(_)
            | RelayerError::MaxGasPrice { .. }
            | RelayerError::ScopeData(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<shade_chain::ChainError> for RelayerError {
    fn from(e: shade_chain::ChainError) -> Self {
        match e {
            shade_chain::ChainError::Revert(msg) => RelayerError::TransactionError(msg),
            shade_chain::ChainError::ScopeData(msg) => RelayerError::ScopeData(msg),
            other => RelayerError::Chain(other.to_string()),
        }
    }
}

impl From<shade_prover::ProofError> for RelayerError {
    fn from(e: shade_prover::ProofError) -> Self {
        RelayerError::Proof(e.to_string())
    }
}

impl From<shade_core::field::FieldError> for RelayerError {
    fn from(e: shade_core::field::FieldError) -> Self {
        RelayerError::InvalidInput(e.to_string())
    }
}

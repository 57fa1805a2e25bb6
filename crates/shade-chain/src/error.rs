//! chain error taxonomy

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("rpc transport error: {0}")]
    Transport(String),
    #[error("transaction reverted: {0}")]
    Revert(String),
    #[error("scope lookup failed: {0}")]
    ScopeData(String),
    #[error("abi decode failed: {0}")]
    AbiDecode(String),
    #[error("bad field element: {0}")]
    BadField(String),
}

pub type Result<T> = std::result::Result<T, ChainError>;

impl From<shade_core::field::FieldError> for ChainError {
    fn from(e: shade_core::field::FieldError) -> Self {
        ChainError::BadField(e.to_string())
    }
}

//! signed fee commitments
//!
//! a quote becomes binding when the relayer signs an eip-712
//! `RelayerCommitment` over the exact withdrawal data, asset, amount,
//! extra-gas flag and expiration. until the expiration the relayer must
//! honor the quoted fee for that byte-identical payload.

use alloy::primitives::{Address, Bytes, Signature, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use alloy::sol;
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};

use crate::error::{RelayerError, Result};

sol! {
    /// typed struct the relayer signs; field order is part of the wire
    /// contract
    struct RelayerCommitment {
        bytes withdrawalData;
        address asset;
        uint256 expiration;
        uint256 amount;
        bool extraGas;
    }
}

/// the signed quote as it travels in requests and responses
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeeCommitment {
    pub withdrawal_data: Bytes,
    pub asset: Address,
    pub amount: U256,
    pub extra_gas: bool,
    /// unix milliseconds
    pub expiration: u64,
    pub signed_relayer_commitment: Bytes,
}

fn domain(chain_id: u64) -> Eip712Domain {
    Eip712Domain {
        name: Some("Privacy Pools Relayer".into()),
        version: Some("1".into()),
        chain_id: Some(U256::from(chain_id)),
        verifying_contract: None,
        salt: None,
    }
}

fn typed_struct(commitment: &FeeCommitment) -> RelayerCommitment {
    RelayerCommitment {
        withdrawalData: commitment.withdrawal_data.clone(),
        asset: commitment.asset,
        expiration: U256::from(commitment.expiration),
        amount: commitment.amount,
        extraGas: commitment.extra_gas,
    }
}

/// sign a fee commitment for the given chain
pub fn sign_commitment(
    signer: &PrivateKeySigner,
    chain_id: u64,
    withdrawal_data: Bytes,
    asset: Address,
    amount: U256,
    extra_gas: bool,
    expiration: u64,
) -> Result<FeeCommitment> {
    let mut commitment = FeeCommitment {
        withdrawal_data,
        asset,
        amount,
        extra_gas,
        expiration,
        signed_relayer_commitment: Bytes::new(),
    };
    let hash = typed_struct(&commitment).eip712_signing_hash(&domain(chain_id));
    let signature = signer
        .sign_hash_sync(&hash)
        .map_err(|e| RelayerError::RelayerCommitmentRejected(e.to_string()))?;
    commitment.signed_relayer_commitment = Bytes::from(signature.as_bytes().to_vec());
    Ok(commitment)
}

/// check expiration and recover the signer; any mismatch rejects the
/// commitment
pub fn verify_commitment(
    commitment: &FeeCommitment,
    chain_id: u64,
    expected_signer: Address,
    now_ms: u64,
) -> Result<()> {
    if commitment.expiration < now_ms {
        return Err(RelayerError::RelayerCommitmentRejected(
            "commitment expired".into(),
        ));
    }

    let signature = Signature::try_from(commitment.signed_relayer_commitment.as_ref())
        .map_err(|e| RelayerError::RelayerCommitmentRejected(format!("bad signature: {e}")))?;
    let hash = typed_struct(commitment).eip712_signing_hash(&domain(chain_id));
    let recovered = signature
        .recover_address_from_prehash(&hash)
        .map_err(|e| RelayerError::RelayerCommitmentRejected(format!("recover: {e}")))?;
    if recovered != expected_signer {
        return Err(RelayerError::RelayerCommitmentRejected(format!(
            "signed by {recovered}, expected {expected_signer}"
        )));
    }
    Ok(())
}

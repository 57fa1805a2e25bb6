//! withdrawal admission
//!
//! every relay request passes this gauntlet before a single wei of gas
//! is spent: payload consistency against any signed fee commitment,
//! processor and fee-recipient identity, context binding, asset policy,
//! fee floor, minimum amount and finally the groth16 proof itself. the
//! order matters — cheap structural checks run before chain reads, chain
//! reads before proof verification.

use alloy::primitives::{Address, Bytes, U256};

use shade_chain::{calculate_context, RelayData, ScopeData, Withdrawal, NATIVE_ASSET};
use shade_core::fr_to_u256;
use shade_prover::{verify_withdrawal, ArtifactStore, WithdrawalProof};

use crate::commitment::verify_commitment;
use crate::config::{AssetEntry, ResolvedChain};
use crate::error::{RelayerError, Result};
use crate::fee::FeeSource;
use crate::payload::ParsedRelayRequest;
use crate::reader::PoolReader;

/// a request that cleared every admission rule
#[derive(Debug)]
pub struct ValidatedRelay {
    pub withdrawal: Withdrawal,
    pub relay_data: RelayData,
    pub proof: WithdrawalProof,
    pub scope: U256,
    pub scope_data: ScopeData,
    pub asset: Address,
    pub asset_entry: AssetEntry,
    pub extra_gas: bool,
    pub withdrawn_value: U256,
}

pub async fn validate_relay_request<R, F>(
    request: &ParsedRelayRequest,
    chain: &ResolvedChain,
    reader: &R,
    fees: &F,
    artifacts: &ArtifactStore,
    now_ms: u64,
) -> Result<ValidatedRelay>
where
    R: PoolReader,
    F: FeeSource,
{
    let entrypoint = chain.entrypoint_address;
    let fee_receiver = chain.fee_receiver_address;
    let signer = chain
        .signer()
        .map_err(|e| RelayerError::InvalidInput(e.to_string()))?
        .address();

    let extra_gas = request
        .fee_commitment
        .as_ref()
        .map(|c| c.extra_gas)
        .unwrap_or(false);

    // a commitment only binds the exact bytes it was signed over
    let withdrawal_data: Bytes = match &request.fee_commitment {
        Some(fc) => {
            if fc.withdrawal_data != request.withdrawal.data {
                return Err(RelayerError::RelayerCommitmentRejected(
                    "withdrawal data differs from the committed bytes".into(),
                ));
            }
            fc.withdrawal_data.clone()
        }
        None => request.withdrawal.data.clone(),
    };

    let relay_data = RelayData::decode(&withdrawal_data)
        .map_err(|e| RelayerError::InvalidInput(e.to_string()))?;
    let signals = request.proof.public_signals;
    let withdrawn_value = fr_to_u256(&signals.withdrawn_value);

    if let Some(fc) = &request.fee_commitment {
        if fc.amount > withdrawn_value {
            return Err(RelayerError::InsufficientWithdrawnValue);
        }
    }

    if request.withdrawal.processooor != entrypoint {
        return Err(RelayerError::ProcessooorMismatch {
            expected: entrypoint,
            got: request.withdrawal.processooor,
        });
    }

    // in extra-gas mode the signer fronts native funds and must collect
    // the fee itself
    let expected_fee_recipient = if extra_gas && signer != fee_receiver {
        signer
    } else {
        fee_receiver
    };
    if relay_data.feeRecipient != expected_fee_recipient {
        return Err(RelayerError::FeeReceiverMismatch {
            expected: expected_fee_recipient,
            got: relay_data.feeRecipient,
        });
    }

    let bound = Withdrawal::new(request.withdrawal.processooor, withdrawal_data.clone());
    if calculate_context(&bound, request.scope) != signals.context {
        return Err(RelayerError::ContextMismatch);
    }

    let scope_data = reader.scope_data(request.scope).await?;
    let asset = scope_data.asset_address;
    let asset_entry = chain
        .asset(asset)
        .ok_or(RelayerError::AssetNotSupported(asset))?
        .clone();
    if reader.asset_config(asset).await?.is_none() {
        return Err(RelayerError::AssetNotSupported(asset));
    }

    match &request.fee_commitment {
        Some(fc) => {
            if fc.asset != asset {
                return Err(RelayerError::RelayerCommitmentRejected(
                    "commitment signed for a different asset".into(),
                ));
            }
            verify_commitment(fc, chain.chain_id, signer, now_ms)?;
        }
        None => {
            let required = fees
                .required_fee_bps(asset, withdrawn_value, extra_gas)
                .await?;
            if relay_data.relayFeeBPS < required {
                return Err(RelayerError::FeeTooLow {
                    required,
                    got: relay_data.relayFeeBPS,
                });
            }
        }
    }

    if withdrawn_value < asset_entry.min_withdraw_amount {
        return Err(RelayerError::InsufficientWithdrawnValue);
    }

    match verify_withdrawal(artifacts, &request.proof) {
        Ok(true) => {}
        Ok(false) => return Err(RelayerError::InvalidProof),
        Err(_) => return Err(RelayerError::InvalidProof),
    }

    // the refund swap needs its wiring before any gas is spent
    if extra_gas
        && asset != NATIVE_ASSET
        && (chain.wrapped_native_address.is_none() || chain.swap_router_address.is_none())
    {
        return Err(RelayerError::MissingWrappedNative);
    }

    Ok(ValidatedRelay {
        withdrawal: bound,
        relay_data,
        proof: request.proof.clone(),
        scope: request.scope,
        scope_data,
        asset,
        asset_entry,
        extra_gas,
        withdrawn_value,
    })
}

//! http wire types and payload parsing
//!
//! request bodies carry field elements and proof points as decimal or
//! 0x-hex strings; everything is validated into typed form before any
//! policy logic runs. malformed values are `InvalidInput`, never panics.

use alloy::primitives::{Address, Bytes, U256};
use ark_bn254::{Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::PrimeField;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use shade_prover::{WithdrawalProof, WithdrawalPublicSignals};

use crate::commitment::FeeCommitment;
use crate::error::{RelayerError, Result};
use crate::store::bigint_json;

// === request bodies ===

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequestBody {
    pub chain_id: u64,
    pub scope: String,
    pub withdrawal: WithdrawalBody,
    pub proof: ProofBody,
    #[serde(default)]
    pub fee_commitment: Option<FeeCommitment>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalBody {
    pub processooor: Address,
    pub data: Bytes,
}

/// groth16 proof in wire form; b-matrix rows are in mathematical order
/// (real component first) — the calldata row swap happens at packing
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofBody {
    pub pi_a: [String; 2],
    pub pi_b: [[String; 2]; 2],
    pub pi_c: [String; 2],
    pub public_signals: [String; 8],
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestBody {
    pub chain_id: u64,
    pub asset: Address,
    pub amount_in: String,
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default)]
    pub extra_gas: Option<bool>,
}

// === responses ===

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub success: bool,
    pub timestamp: u64,
    pub request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_swap: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub fee_bps: String,
    pub gas_price: String,
    pub path: Vec<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_commitment: Option<FeeCommitment>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsResponse {
    pub chain_id: u64,
    pub asset_address: Address,
    pub fee_bps: u64,
    pub min_withdraw_amount: String,
    pub fee_receiver_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_gas_price: Option<String>,
}

// === parsed request ===

pub struct ParsedRelayRequest {
    pub chain_id: u64,
    pub scope: U256,
    pub withdrawal: shade_chain::Withdrawal,
    pub proof: WithdrawalProof,
    pub fee_commitment: Option<FeeCommitment>,
}

impl RelayRequestBody {
    pub fn parse(&self) -> Result<ParsedRelayRequest> {
        let scope = parse_u256(&self.scope)?;
        let proof = parse_proof(&self.proof)?;
        Ok(ParsedRelayRequest {
            chain_id: self.chain_id,
            scope,
            withdrawal: shade_chain::Withdrawal::new(
                self.withdrawal.processooor,
                self.withdrawal.data.clone(),
            ),
            proof,
            fee_commitment: self.fee_commitment.clone(),
        })
    }

    /// persisted form, big integers wrapped for lossless round trips
    pub fn to_record_json(&self) -> Result<Value> {
        let scope = parse_u256(&self.scope)?;
        let mut record = json!({
            "chainId": self.chain_id,
            "scope": bigint_json(scope),
            "withdrawal": {
                "processooor": self.withdrawal.processooor,
                "data": self.withdrawal.data,
            },
            "proof": {
                "piA": self.proof.pi_a,
                "piB": self.proof.pi_b,
                "piC": self.proof.pi_c,
                "publicSignals": self.proof.public_signals,
            },
        });
        if let Some(fc) = &self.fee_commitment {
            record["feeCommitment"] = json!({
                "withdrawalData": fc.withdrawal_data,
                "asset": fc.asset,
                "amount": bigint_json(fc.amount),
                "extraGas": fc.extra_gas,
                "expiration": fc.expiration,
                "signedRelayerCommitment": fc.signed_relayer_commitment,
            });
        }
        Ok(record)
    }
}

// === scalar parsing ===

fn parse_uint(s: &str) -> Result<BigUint> {
    let parsed = match s.strip_prefix("0x") {
        Some(hex) => BigUint::parse_bytes(hex.as_bytes(), 16),
        None => BigUint::parse_bytes(s.as_bytes(), 10),
    };
    parsed.ok_or_else(|| RelayerError::InvalidInput(format!("bad integer: {s}")))
}

pub fn parse_u256(s: &str) -> Result<U256> {
    let value = parse_uint(s)?;
    if value.bits() > 256 {
        return Err(RelayerError::InvalidInput(format!("integer too wide: {s}")));
    }
    let bytes = value.to_bytes_be();
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(U256::from_be_bytes(padded))
}

pub fn parse_fr(s: &str) -> Result<Fr> {
    let value = parse_uint(s)?;
    if value >= shade_core::field::modulus() {
        return Err(RelayerError::InvalidInput(format!("scalar out of field: {s}")));
    }
    Ok(Fr::from(value))
}

fn parse_fq(s: &str) -> Result<Fq> {
    let value = parse_uint(s)?;
    let modulus = BigUint::from_bytes_be(&{
        use ark_ff::BigInteger;
        Fq::MODULUS.to_bytes_be()
    });
    if value >= modulus {
        return Err(RelayerError::InvalidInput(format!(
            "coordinate out of field: {s}"
        )));
    }
    Ok(Fq::from(value))
}

fn parse_g1(words: &[String; 2]) -> Result<G1Affine> {
    let point = G1Affine::new_unchecked(parse_fq(&words[0])?, parse_fq(&words[1])?);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(RelayerError::InvalidProof);
    }
    Ok(point)
}

fn parse_g2(rows: &[[String; 2]; 2]) -> Result<G2Affine> {
    let x = Fq2::new(parse_fq(&rows[0][0])?, parse_fq(&rows[0][1])?);
    let y = Fq2::new(parse_fq(&rows[1][0])?, parse_fq(&rows[1][1])?);
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(RelayerError::InvalidProof);
    }
    Ok(point)
}

fn parse_proof(body: &ProofBody) -> Result<WithdrawalProof> {
    let mut signals = [Fr::from(0u64); 8];
    for (slot, raw) in signals.iter_mut().zip(body.public_signals.iter()) {
        *slot = parse_fr(raw)?;
    }
    Ok(WithdrawalProof {
        proof: ark_groth16::Proof {
            a: parse_g1(&body.pi_a)?,
            b: parse_g2(&body.pi_b)?,
            c: parse_g1(&body.pi_c)?,
        },
        public_signals: WithdrawalPublicSignals::from_array(&signals),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u256_both_radixes() {
        assert_eq!(parse_u256("255").unwrap(), U256::from(255u64));
        assert_eq!(parse_u256("0xff").unwrap(), U256::from(255u64));
        assert!(parse_u256("0xzz").is_err());
        assert!(parse_u256("").is_err());
    }

    #[test]
    fn test_parse_fr_rejects_oversized() {
        // the scalar field modulus, decimal
        let modulus =
            "21888242871839275222246405745257275088548364400416034343698204186575808495617";
        assert!(parse_fr(modulus).is_err());
        assert_eq!(parse_fr("7").unwrap(), Fr::from(7u64));
    }

    #[test]
    fn test_parse_g1_rejects_off_curve() {
        let bogus = ["5".to_string(), "5".to_string()];
        assert!(matches!(
            parse_g1(&bogus),
            Err(RelayerError::InvalidProof)
        ));
        // the generator (1, 2) parses
        let generator = ["1".to_string(), "2".to_string()];
        assert!(parse_g1(&generator).is_ok());
    }
}

//! wire types shared with the entrypoint and pool contracts

use alloy::primitives::{address, Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolValue;

use crate::error::{ChainError, Result};

/// canonical pseudo-address of the chain's native asset
pub const NATIVE_ASSET: Address = address!("0xEeEeEEEEeEeEEEEeeEeEeeEeEeEeEeeEeEEEEEEE");

/// basis-point denominator used by every fee computation
pub const FEE_DENOMINATOR: u64 = 10_000;

sol! {
    /// a withdrawal as the pool contract sees it: the only processor
    /// allowed to execute it, and an opaque relay-data payload bound into
    /// the proof's context
    #[derive(Debug)]
    struct Withdrawal {
        address processooor;
        bytes data;
    }

    /// relay instructions abi-packed into `Withdrawal.data`
    #[derive(Debug)]
    struct RelayData {
        address recipient;
        address feeRecipient;
        uint256 relayFeeBPS;
    }

    /// groth16 proof calldata, b-matrix rows already swapped
    struct WithdrawalProofCalldata {
        uint256[2] pA;
        uint256[2][2] pB;
        uint256[2] pC;
        uint256[8] pubSignals;
    }

    struct RagequitProofCalldata {
        uint256[2] pA;
        uint256[2][2] pB;
        uint256[2] pC;
        uint256[4] pubSignals;
    }

    #[sol(rpc)]
    interface IEntrypoint {
        struct AssetConfigData {
            address pool;
            uint256 minimumDepositAmount;
            uint256 vettingFeeBPS;
            uint256 maxRelayFeeBPS;
        }

        struct ScopeDataReturn {
            address poolAddress;
            address assetAddress;
        }

        function deposit(uint256 precommitmentHash) external payable returns (uint256 commitment);
        function depositERC20(address asset, uint256 amount, uint256 precommitmentHash) external returns (uint256 commitment);
        function relay(Withdrawal calldata withdrawal, WithdrawalProofCalldata calldata proof, uint256 scope) external;
        function scopeData(uint256 scope) external view returns (ScopeDataReturn memory);
        function assetConfig(address asset) external view returns (AssetConfigData memory);
    }

    #[sol(rpc)]
    interface IPrivacyPool {
        function withdraw(Withdrawal calldata withdrawal, WithdrawalProofCalldata calldata proof) external;
        function ragequit(RagequitProofCalldata calldata proof) external;
        function SCOPE() external view returns (uint256);
        function currentRoot() external view returns (uint256);
        function currentTreeSize() external view returns (uint256);
    }

    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
        function allowance(address owner, address spender) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

impl Withdrawal {
    pub fn new(processooor: Address, data: Bytes) -> Self {
        Self { processooor, data }
    }
}

impl RelayData {
    pub fn new(recipient: Address, fee_recipient: Address, relay_fee_bps: U256) -> Self {
        Self {
            recipient,
            feeRecipient: fee_recipient,
            relayFeeBPS: relay_fee_bps,
        }
    }

    /// abi-pack into a `Withdrawal.data` payload
    pub fn encode(&self) -> Bytes {
        self.abi_encode().into()
    }

    /// decode a `Withdrawal.data` payload
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::abi_decode(data).map_err(|e| ChainError::AbiDecode(e.to_string()))
    }
}

/// reverse lookup of a pool scope
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScopeData {
    pub pool_address: Address,
    pub asset_address: Address,
}

/// per-asset fee parameters from the entrypoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetConfig {
    pub pool_address: Address,
    pub minimum_deposit_amount: U256,
    pub vetting_fee_bps: U256,
    pub max_relay_fee_bps: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_data_roundtrip() {
        let relay = RelayData::new(
            address!("0x1111111111111111111111111111111111111111"),
            address!("0x2222222222222222222222222222222222222222"),
            U256::from(150u64),
        );
        let encoded = relay.encode();
        // static tuple of three words
        assert_eq!(encoded.len(), 96);
        let decoded = RelayData::decode(&encoded).unwrap();
        assert_eq!(decoded.recipient, relay.recipient);
        assert_eq!(decoded.feeRecipient, relay.feeRecipient);
        assert_eq!(decoded.relayFeeBPS, relay.relayFeeBPS);
    }

    #[test]
    fn test_relay_data_decode_rejects_garbage() {
        assert!(RelayData::decode(&[0u8; 13]).is_err());
    }

    #[test]
    fn test_native_asset_sentinel() {
        assert_eq!(
            format!("{NATIVE_ASSET:?}").to_lowercase(),
            "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
        );
    }
}

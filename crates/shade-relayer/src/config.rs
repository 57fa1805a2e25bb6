//! relayer configuration
//!
//! a json document with chain entries that fall back to `defaults` for
//! anything they do not override, plus environment overrides for the
//! secrets and paths an operator injects at deploy time:
//! `SHADE_RPC_URL_<CHAIN_ID>`, `SHADE_SIGNER_KEY`, `SHADE_DB_PATH`.

use std::path::{Path, PathBuf};

use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {0}: {1}")]
    Read(PathBuf, String),
    #[error("cannot parse config: {0}")]
    Parse(String),
    #[error("bad signer key for chain {0}: {1}")]
    BadSignerKey(u64, String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct RelayerConfig {
    pub defaults: Defaults,
    pub chains: Vec<ChainConfig>,
    #[serde(alias = "sqlite_db_path")]
    pub db_path: PathBuf,
    #[serde(default)]
    pub cors_allow_all: bool,
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    pub artifacts: ArtifactConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Defaults {
    pub fee_receiver_address: Address,
    pub signer_private_key: String,
    pub entrypoint_address: Address,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    #[serde(default)]
    pub max_gas_price: Option<u128>,
    pub supported_assets: Vec<AssetEntry>,
    pub native_currency: NativeCurrency,
    // per-chain overrides of the defaults
    #[serde(default)]
    pub fee_receiver_address: Option<Address>,
    #[serde(default)]
    pub signer_private_key: Option<String>,
    #[serde(default)]
    pub entrypoint_address: Option<Address>,
    // dex wiring for the extra-gas refund path
    #[serde(default)]
    pub wrapped_native_address: Option<Address>,
    #[serde(default)]
    pub swap_router_address: Option<Address>,
    #[serde(default)]
    pub pool_factory_address: Option<Address>,
    #[serde(default)]
    pub intermediary_tokens: Vec<Address>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AssetEntry {
    pub asset_address: Address,
    pub asset_name: String,
    pub fee_bps: u64,
    pub min_withdraw_amount: U256,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NativeCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// artifact source selection; a flag, never runtime detection
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum ArtifactConfig {
    Filesystem { base_dir: PathBuf },
    Http { base_url: String },
}

/// one chain's configuration with every fallback already applied
#[derive(Clone, Debug)]
pub struct ResolvedChain {
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub max_gas_price: Option<u128>,
    pub fee_receiver_address: Address,
    pub signer_private_key: String,
    pub entrypoint_address: Address,
    pub supported_assets: Vec<AssetEntry>,
    pub native_currency: NativeCurrency,
    pub wrapped_native_address: Option<Address>,
    pub swap_router_address: Option<Address>,
    pub pool_factory_address: Option<Address>,
    pub intermediary_tokens: Vec<Address>,
}

impl ResolvedChain {
    pub fn asset(&self, address: Address) -> Option<&AssetEntry> {
        self.supported_assets
            .iter()
            .find(|a| a.asset_address == address)
    }

    pub fn signer(&self) -> Result<PrivateKeySigner, ConfigError> {
        self.signer_private_key
            .parse()
            .map_err(|e: alloy::signers::local::LocalSignerError| {
                ConfigError::BadSignerKey(self.chain_id, e.to_string())
            })
    }
}

impl RelayerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e.to_string()))?;
        let mut config: RelayerConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// environment beats file for secrets and deployment-local paths
    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("SHADE_SIGNER_KEY") {
            self.defaults.signer_private_key = key;
        }
        if let Ok(path) = std::env::var("SHADE_DB_PATH") {
            self.db_path = PathBuf::from(path);
        }
        for chain in &mut self.chains {
            if let Ok(url) = std::env::var(format!("SHADE_RPC_URL_{}", chain.chain_id)) {
                chain.rpc_url = url;
            }
        }
    }

    pub fn resolve(&self, chain_id: u64) -> Option<ResolvedChain> {
        let chain = self.chains.iter().find(|c| c.chain_id == chain_id)?;
        Some(ResolvedChain {
            chain_id: chain.chain_id,
            chain_name: chain.chain_name.clone(),
            rpc_url: chain.rpc_url.clone(),
            max_gas_price: chain.max_gas_price,
            fee_receiver_address: chain
                .fee_receiver_address
                .unwrap_or(self.defaults.fee_receiver_address),
            signer_private_key: chain
                .signer_private_key
                .clone()
                .unwrap_or_else(|| self.defaults.signer_private_key.clone()),
            entrypoint_address: chain
                .entrypoint_address
                .unwrap_or(self.defaults.entrypoint_address),
            supported_assets: chain.supported_assets.clone(),
            native_currency: chain.native_currency.clone(),
            wrapped_native_address: chain.wrapped_native_address,
            swap_router_address: chain.swap_router_address,
            pool_factory_address: chain.pool_factory_address,
            intermediary_tokens: chain.intermediary_tokens.clone(),
        })
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        self.chains.iter().map(|c| c.chain_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "defaults": {
            "fee_receiver_address": "0x1000000000000000000000000000000000000001",
            "signer_private_key": "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "entrypoint_address": "0x2000000000000000000000000000000000000002"
        },
        "chains": [
            {
                "chain_id": 1,
                "chain_name": "mainnet",
                "rpc_url": "http://localhost:8545",
                "max_gas_price": 200000000000,
                "supported_assets": [
                    {
                        "asset_address": "0xEeEeEEEEeEeEEEEeeEeEeeEeEeEeEeeEeEEEEEEE",
                        "asset_name": "ETH",
                        "fee_bps": 100,
                        "min_withdraw_amount": "10000000000000000"
                    }
                ],
                "native_currency": { "name": "Ether", "symbol": "ETH", "decimals": 18 }
            },
            {
                "chain_id": 100,
                "chain_name": "sidechain",
                "rpc_url": "http://localhost:9545",
                "supported_assets": [],
                "native_currency": { "name": "Coin", "symbol": "C", "decimals": 18 },
                "entrypoint_address": "0x3000000000000000000000000000000000000003"
            }
        ],
        "sqlite_db_path": "/tmp/shade-relayer-test-db",
        "cors_allow_all": false,
        "allowed_domains": ["https://app.example.org"],
        "artifacts": { "backend": "filesystem", "base_dir": "/tmp/shade-artifacts" }
    }"#;

    fn parse() -> RelayerConfig {
        serde_json::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_chain_falls_back_to_defaults() {
        let config = parse();
        let mainnet = config.resolve(1).unwrap();
        assert_eq!(
            mainnet.entrypoint_address,
            "0x2000000000000000000000000000000000000002".parse::<Address>().unwrap()
        );

        let sidechain = config.resolve(100).unwrap();
        assert_eq!(
            sidechain.entrypoint_address,
            "0x3000000000000000000000000000000000000003".parse::<Address>().unwrap()
        );
        assert_eq!(
            sidechain.fee_receiver_address,
            config.defaults.fee_receiver_address
        );
    }

    #[test]
    fn test_unknown_chain_is_none() {
        assert!(parse().resolve(42).is_none());
    }

    #[test]
    fn test_asset_lookup() {
        let config = parse();
        let chain = config.resolve(1).unwrap();
        let asset = chain.asset(shade_chain::NATIVE_ASSET).unwrap();
        assert_eq!(asset.fee_bps, 100);
        assert_eq!(
            asset.min_withdraw_amount,
            U256::from(10_000_000_000_000_000u64)
        );
        assert!(chain
            .asset("0x4000000000000000000000000000000000000004".parse().unwrap())
            .is_none());
    }

    #[test]
    fn test_signer_parses() {
        let config = parse();
        let chain = config.resolve(1).unwrap();
        assert!(chain.signer().is_ok());
    }

    #[test]
    fn test_sqlite_alias_accepted() {
        let config = parse();
        assert_eq!(config.db_path, PathBuf::from("/tmp/shade-relayer-test-db"));
    }
}

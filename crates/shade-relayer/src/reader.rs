//! chain read seam
//!
//! the validator only ever needs three reads from the chain; routing
//! them through a trait keeps the whole admission path testable against
//! a stub chain.

use alloy::primitives::{Address, U256};

use shade_chain::{AssetConfig, PoolClient, ScopeData};

use crate::error::Result;

pub trait PoolReader {
    fn scope_data(&self, scope: U256) -> impl std::future::Future<Output = Result<ScopeData>> + Send;
    fn asset_config(
        &self,
        asset: Address,
    ) -> impl std::future::Future<Output = Result<Option<AssetConfig>>> + Send;
    fn gas_price(&self) -> impl std::future::Future<Output = Result<u128>> + Send;
}

impl PoolReader for PoolClient {
    async fn scope_data(&self, scope: U256) -> Result<ScopeData> {
        Ok(PoolClient::scope_data(self, scope).await?)
    }

    async fn asset_config(&self, asset: Address) -> Result<Option<AssetConfig>> {
        Ok(PoolClient::asset_config(self, asset).await?)
    }

    async fn gas_price(&self) -> Result<u128> {
        Ok(PoolClient::gas_price(self).await?)
    }
}

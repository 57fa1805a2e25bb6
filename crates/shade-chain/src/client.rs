//! entrypoint and pool client
//!
//! every write follows the same pipeline: simulate the call (surfacing
//! the revert reason verbatim), estimate gas, then send and wait for the
//! receipt. reads are plain view calls.

use alloy::contract::{CallBuilder, CallDecoder};
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use ark_bn254::Fr;
use tracing::{debug, info};

use shade_core::fr_to_u256;

use crate::error::{ChainError, Result};
use crate::types::{
    AssetConfig, IEntrypoint, IPrivacyPool, RagequitProofCalldata, ScopeData, Withdrawal,
    WithdrawalProofCalldata, IERC20,
};

/// outcome of a mined write
#[derive(Clone, Copy, Debug)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub gas_used: u64,
    pub effective_gas_price: u128,
}

/// typed client over one chain's entrypoint
#[derive(Clone)]
pub struct PoolClient {
    provider: DynProvider,
    entrypoint: Address,
    signer: Address,
}

impl PoolClient {
    pub fn connect(rpc_url: &str, signer: PrivateKeySigner, entrypoint: Address) -> Result<Self> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::Transport(e.to_string()))?;
        let signer_address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(url)
            .erased();
        Ok(Self {
            provider,
            entrypoint,
            signer: signer_address,
        })
    }

    pub fn entrypoint_address(&self) -> Address {
        self.entrypoint
    }

    pub fn signer_address(&self) -> Address {
        self.signer
    }

    pub async fn gas_price(&self) -> Result<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))
    }

    // === deposits ===

    /// native deposit; returns the assigned commitment hash and tx hash
    pub async fn deposit_native(
        &self,
        amount: U256,
        precommitment: Fr,
    ) -> Result<(U256, B256)> {
        let entry = IEntrypoint::new(self.entrypoint, self.provider.clone());
        let call = entry
            .deposit(fr_to_u256(&precommitment))
            .value(amount)
            .from(self.signer);
        let commitment = call.call().await.map_err(reverted)?;
        let outcome = send_checked(call).await?;
        info!(tx = %outcome.tx_hash, "native deposit broadcast");
        Ok((commitment, outcome.tx_hash))
    }

    /// erc20 deposit; approves the entrypoint first when the current
    /// allowance is short
    pub async fn deposit_erc20(
        &self,
        asset: Address,
        amount: U256,
        precommitment: Fr,
    ) -> Result<(U256, B256)> {
        let token = IERC20::new(asset, self.provider.clone());
        let allowance = token
            .allowance(self.signer, self.entrypoint)
            .call()
            .await
            .map_err(transport)?;
        if allowance < amount {
            let approve = token.approve(self.entrypoint, amount).from(self.signer);
            let outcome = send_checked(approve).await?;
            debug!(tx = %outcome.tx_hash, "allowance raised");
        }

        let entry = IEntrypoint::new(self.entrypoint, self.provider.clone());
        let call = entry
            .depositERC20(asset, amount, fr_to_u256(&precommitment))
            .from(self.signer);
        let commitment = call.call().await.map_err(reverted)?;
        let outcome = send_checked(call).await?;
        info!(tx = %outcome.tx_hash, "erc20 deposit broadcast");
        Ok((commitment, outcome.tx_hash))
    }

    // === withdrawals ===

    /// relay a withdrawal through the entrypoint
    pub async fn relay(
        &self,
        withdrawal: Withdrawal,
        proof: WithdrawalProofCalldata,
        scope: U256,
    ) -> Result<TxOutcome> {
        let entry = IEntrypoint::new(self.entrypoint, self.provider.clone());
        let call = entry.relay(withdrawal, proof, scope).from(self.signer);
        let outcome = send_checked(call).await?;
        info!(tx = %outcome.tx_hash, gas = outcome.gas_used, "relay broadcast");
        Ok(outcome)
    }

    /// direct withdrawal on the pool; the processooor must be the caller
    pub async fn withdraw(
        &self,
        pool: Address,
        withdrawal: Withdrawal,
        proof: WithdrawalProofCalldata,
    ) -> Result<B256> {
        let pool = IPrivacyPool::new(pool, self.provider.clone());
        let call = pool.withdraw(withdrawal, proof).from(self.signer);
        Ok(send_checked(call).await?.tx_hash)
    }

    /// depositor exit bypassing the association set
    pub async fn ragequit(&self, pool: Address, proof: RagequitProofCalldata) -> Result<B256> {
        let pool = IPrivacyPool::new(pool, self.provider.clone());
        let call = pool.ragequit(proof).from(self.signer);
        Ok(send_checked(call).await?.tx_hash)
    }

    // === lookups ===

    pub async fn scope_data(&self, scope: U256) -> Result<ScopeData> {
        let entry = IEntrypoint::new(self.entrypoint, self.provider.clone());
        let data = entry
            .scopeData(scope)
            .call()
            .await
            .map_err(|e| ChainError::ScopeData(e.to_string()))?;
        if data.poolAddress == Address::ZERO {
            return Err(ChainError::ScopeData(format!("unknown scope {scope}")));
        }
        Ok(ScopeData {
            pool_address: data.poolAddress,
            asset_address: data.assetAddress,
        })
    }

    /// fee parameters for an asset; `None` when the entrypoint has no
    /// config for it
    pub async fn asset_config(&self, asset: Address) -> Result<Option<AssetConfig>> {
        let entry = IEntrypoint::new(self.entrypoint, self.provider.clone());
        let config = entry.assetConfig(asset).call().await.map_err(transport)?;
        if config.pool == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(AssetConfig {
            pool_address: config.pool,
            minimum_deposit_amount: config.minimumDepositAmount,
            vetting_fee_bps: config.vettingFeeBPS,
            max_relay_fee_bps: config.maxRelayFeeBPS,
        }))
    }

    pub async fn get_scope(&self, pool: Address) -> Result<U256> {
        let pool = IPrivacyPool::new(pool, self.provider.clone());
        pool.SCOPE().call().await.map_err(transport)
    }

    pub async fn get_state_root(&self, pool: Address) -> Result<U256> {
        let pool = IPrivacyPool::new(pool, self.provider.clone());
        pool.currentRoot().call().await.map_err(transport)
    }

    pub async fn get_state_size(&self, pool: Address) -> Result<U256> {
        let pool = IPrivacyPool::new(pool, self.provider.clone());
        pool.currentTreeSize().call().await.map_err(transport)
    }

    // === transfers (extra-gas funding path) ===

    pub async fn transfer_native(&self, to: Address, amount: U256) -> Result<B256> {
        let request = TransactionRequest::default()
            .with_from(self.signer)
            .with_to(to)
            .with_value(amount);
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        Ok(receipt.transaction_hash)
    }

    pub async fn approve_erc20(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<B256> {
        let token = IERC20::new(token, self.provider.clone());
        let call = token.approve(spender, amount).from(self.signer);
        Ok(send_checked(call).await?.tx_hash)
    }

    pub async fn transfer_erc20(&self, token: Address, to: Address, amount: U256) -> Result<B256> {
        let token = IERC20::new(token, self.provider.clone());
        let call = token.transfer(to, amount).from(self.signer);
        Ok(send_checked(call).await?.tx_hash)
    }

    pub async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let token = IERC20::new(token, self.provider.clone());
        token.balanceOf(owner).call().await.map_err(transport)
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }
}

/// simulate, estimate, send, wait
async fn send_checked<P, D>(call: CallBuilder<P, D>) -> Result<TxOutcome>
where
    P: Provider,
    D: CallDecoder,
{
    call.call_raw().await.map_err(reverted)?;
    let gas = call.estimate_gas().await.map_err(reverted)?;
    let pending = call
        .gas(gas)
        .send()
        .await
        .map_err(|e| ChainError::Transport(e.to_string()))?;
    let receipt = pending
        .get_receipt()
        .await
        .map_err(|e| ChainError::Transport(e.to_string()))?;
    Ok(TxOutcome {
        tx_hash: receipt.transaction_hash,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
    })
}

fn reverted(e: alloy::contract::Error) -> ChainError {
    ChainError::Revert(e.to_string())
}

fn transport(e: alloy::contract::Error) -> ChainError {
    ChainError::Transport(e.to_string())
}

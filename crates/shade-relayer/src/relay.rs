//! relayer orchestration
//!
//! composition of validation, persistence and broadcast. a record is
//! created before any external write, and each record reaches exactly
//! one terminal state: `BROADCASTED` only after the rpc returned a
//! transaction hash, `FAILED` on any earlier error. failures of the
//! optional refund swap never demote an already-broadcast relay.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::{
    aliases::{U160, U24},
    Address, U256,
};
use alloy::sol;
use tracing::{info, warn};
use uuid::Uuid;

use shade_chain::{pack_withdrawal_proof, PoolClient, FEE_DENOMINATOR, NATIVE_ASSET};
use shade_prover::ArtifactStore;

use crate::config::{ArtifactConfig, RelayerConfig, ResolvedChain};
use crate::error::{RelayerError, Result};
use crate::fee::{finish_quote, price_asset, FeeQuote, LiveFeeSource};
use crate::oracle::{ISwapRouter, PriceOracle, PriceQuote};
use crate::payload::{
    DetailsResponse, ParsedRelayRequest, QuoteRequestBody, RelayRequestBody, RelayResponse,
};
use crate::store::RequestStore;
use crate::validate::{validate_relay_request, ValidatedRelay};

sol! {
    #[sol(rpc)]
    interface IWrappedNative {
        function withdraw(uint256 amount) external;
    }
}

/// everything wired up for one chain
pub struct ChainRuntime {
    pub chain: ResolvedChain,
    pub client: PoolClient,
    pub oracle: Option<PriceOracle>,
}

pub struct RelayerService {
    store: RequestStore,
    artifacts: ArtifactStore,
    chains: HashMap<u64, ChainRuntime>,
}

impl RelayerService {
    pub fn new(
        config: &RelayerConfig,
        store: RequestStore,
        artifacts: ArtifactStore,
    ) -> Result<Self> {
        let mut chains = HashMap::new();
        for chain_id in config.chain_ids() {
            let chain = config
                .resolve(chain_id)
                .ok_or(RelayerError::UnsupportedChain(chain_id))?;
            let signer = chain
                .signer()
                .map_err(|e| RelayerError::InvalidInput(e.to_string()))?;
            let client =
                PoolClient::connect(&chain.rpc_url, signer, chain.entrypoint_address)?;
            let oracle = chain
                .pool_factory_address
                .map(|factory| PriceOracle::new(client.provider().clone(), factory));
            info!(
                chain_id,
                chain = %chain.chain_name,
                assets = chain.supported_assets.len(),
                "chain runtime ready"
            );
            chains.insert(chain_id, ChainRuntime {
                chain,
                client,
                oracle,
            });
        }
        Ok(Self {
            store,
            artifacts,
            chains,
        })
    }

    fn runtime(&self, chain_id: u64) -> Result<&ChainRuntime> {
        self.chains
            .get(&chain_id)
            .ok_or(RelayerError::UnsupportedChain(chain_id))
    }

    /// reject at the edge when the chain's gas price is above the
    /// configured ceiling
    async fn admit_gas_price(&self, rt: &ChainRuntime) -> Result<()> {
        if let Some(max) = rt.chain.max_gas_price {
            let current = rt.client.gas_price().await?;
            if current > max {
                return Err(RelayerError::MaxGasPrice { current, max });
            }
        }
        Ok(())
    }

    // === POST /relayer/request ===

    /// the full relay path; `Err` means the request was rejected before
    /// acceptance (transport-level), `Ok` carries the policy outcome
    pub async fn handle_relay(&self, body: RelayRequestBody) -> Result<RelayResponse> {
        let rt = self.runtime(body.chain_id)?;
        self.admit_gas_price(rt).await?;
        let parsed = body.parse()?;

        let request_id = Uuid::new_v4();
        let now = now_ms();
        self.store
            .create_new_request(request_id, now, body.to_record_json()?)?;

        match self.process_relay(rt, &parsed, now).await {
            Ok((tx_hash, tx_swap)) => {
                self.store
                    .update_broadcasted_request(request_id, &tx_hash)?;
                Ok(RelayResponse {
                    success: true,
                    timestamp: now,
                    request_id,
                    tx_hash: Some(tx_hash),
                    tx_swap,
                    error: None,
                })
            }
            Err(e) => {
                let message = e.to_string();
                warn!(%request_id, error = %message, "relay rejected");
                self.store.update_failed_request(request_id, &message)?;
                Ok(RelayResponse {
                    success: false,
                    timestamp: now,
                    request_id,
                    tx_hash: None,
                    tx_swap: None,
                    error: Some(message),
                })
            }
        }
    }

    async fn process_relay(
        &self,
        rt: &ChainRuntime,
        parsed: &ParsedRelayRequest,
        now: u64,
    ) -> Result<(String, Option<String>)> {
        let fees = LiveFeeSource {
            reader: &rt.client,
            oracle: rt.oracle.as_ref(),
            chain: &rt.chain,
        };
        let validated = validate_relay_request(
            parsed,
            &rt.chain,
            &rt.client,
            &fees,
            &self.artifacts,
            now,
        )
        .await?;

        let calldata = pack_withdrawal_proof(&validated.proof);
        let outcome = rt
            .client
            .relay(validated.withdrawal.clone(), calldata, validated.scope)
            .await?;
        let tx_hash = format!("{:#x}", outcome.tx_hash);
        info!(tx = %tx_hash, "relay broadcast");

        let mut tx_swap = None;
        if validated.extra_gas && validated.asset != NATIVE_ASSET {
            // the relay already succeeded; a refund failure is logged,
            // never propagated into the record
            match self.fund_extra_gas(rt, &validated, &outcome).await {
                Ok(swap_hash) => tx_swap = Some(swap_hash),
                Err(e) => warn!(error = %e, "extra-gas refund failed"),
            }
        }

        Ok((tx_hash, tx_swap))
    }

    /// swap the fee margin to native, pay the base fee out, refund the
    /// relay gas to the signer and sweep the rest to the recipient
    async fn fund_extra_gas(
        &self,
        rt: &ChainRuntime,
        validated: &ValidatedRelay,
        relay_outcome: &shade_chain::client::TxOutcome,
    ) -> Result<String> {
        let chain = &rt.chain;
        let wrapped = chain
            .wrapped_native_address
            .ok_or(RelayerError::MissingWrappedNative)?;
        let router = chain
            .swap_router_address
            .ok_or(RelayerError::MissingWrappedNative)?;
        let signer = rt.client.signer_address();

        let denominator = U256::from(FEE_DENOMINATOR);
        let fee_gross =
            validated.withdrawn_value * validated.relay_data.relayFeeBPS / denominator;
        let fee_base =
            validated.withdrawn_value * U256::from(validated.asset_entry.fee_bps) / denominator;
        let swap_amount = fee_gross.saturating_sub(fee_base);
        if swap_amount.is_zero() {
            return Err(RelayerError::Quote("no fee margin to swap".into()));
        }

        // pick the pool the oracle would quote against
        let fee_tier = match &rt.oracle {
            Some(oracle) => {
                price_asset(oracle, chain, validated.asset)
                    .await
                    .map(|q| q.fee_tier)
                    .unwrap_or(3_000)
            }
            None => 3_000,
        };

        rt.client
            .approve_erc20(validated.asset, router, swap_amount)
            .await?;

        let router_contract = ISwapRouter::new(router, rt.client.provider().clone());
        let params = ISwapRouter::ExactInputSingleParams {
            tokenIn: validated.asset,
            tokenOut: wrapped,
            fee: U24::from(fee_tier),
            recipient: signer,
            amountIn: swap_amount,
            amountOutMinimum: U256::ZERO,
            sqrtPriceLimitX96: U160::ZERO,
        };
        let call = router_contract.exactInputSingle(params).from(signer);
        let amount_out = call
            .call()
            .await
            .map_err(|e| RelayerError::TransactionError(e.to_string()))?;
        let pending = call
            .send()
            .await
            .map_err(|e| RelayerError::TransactionError(e.to_string()))?;
        let swap_receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RelayerError::TransactionError(e.to_string()))?;
        let swap_hash = format!("{:#x}", swap_receipt.transaction_hash);

        // base margin goes to the fee receiver in the asset
        rt.client
            .transfer_erc20(
                validated.asset,
                chain.fee_receiver_address,
                fee_base,
            )
            .await?;

        // unwrap the swap output, keep the gas refund, sweep the rest
        let unwrap = IWrappedNative::new(wrapped, rt.client.provider().clone());
        let unwrap_call = unwrap.withdraw(amount_out).from(signer);
        unwrap_call
            .send()
            .await
            .map_err(|e| RelayerError::TransactionError(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| RelayerError::TransactionError(e.to_string()))?;

        let current_gas_price = rt.client.gas_price().await?;
        let gas_refund = U256::from(current_gas_price)
            * U256::from(crate::fee::EXTRA_GAS_TX_GAS)
            + U256::from(relay_outcome.effective_gas_price)
                * U256::from(relay_outcome.gas_used);
        let residue = amount_out.saturating_sub(gas_refund);
        if !residue.is_zero() {
            rt.client
                .transfer_native(validated.relay_data.recipient, residue)
                .await?;
        }

        info!(
            swap = %swap_hash,
            out = %amount_out,
            refund = %gas_refund,
            residue = %residue,
            "extra-gas refund settled"
        );
        Ok(swap_hash)
    }

    // === POST /relayer/quote ===

    pub async fn handle_quote(&self, body: QuoteRequestBody) -> Result<FeeQuote> {
        let rt = self.runtime(body.chain_id)?;
        self.admit_gas_price(rt).await?;

        let amount_in = crate::payload::parse_u256(&body.amount_in)?;
        let extra_gas = body.extra_gas.unwrap_or(false);

        let gas_price = rt.client.gas_price().await?;
        let quote = if body.asset == NATIVE_ASSET {
            PriceQuote::identity(body.asset)
        } else {
            let oracle = rt
                .oracle
                .as_ref()
                .ok_or_else(|| RelayerError::Quote("no price oracle configured".into()))?;
            price_asset(oracle, &rt.chain, body.asset).await?
        };

        finish_quote(
            &rt.chain,
            body.asset,
            amount_in,
            gas_price,
            quote,
            extra_gas,
            body.recipient,
            now_ms(),
        )
    }

    // === GET /relayer/details ===

    pub fn handle_details(&self, chain_id: u64, asset: Address) -> Result<DetailsResponse> {
        let rt = self.runtime(chain_id)?;
        let entry = rt
            .chain
            .asset(asset)
            .ok_or(RelayerError::AssetNotSupported(asset))?;
        Ok(DetailsResponse {
            chain_id,
            asset_address: asset,
            fee_bps: entry.fee_bps,
            min_withdraw_amount: entry.min_withdraw_amount.to_string(),
            fee_receiver_address: rt.chain.fee_receiver_address,
            max_gas_price: rt.chain.max_gas_price.map(|g| g.to_string()),
        })
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// resolve the artifact backend from configuration
pub fn artifact_backend(config: &ArtifactConfig) -> shade_prover::ArtifactBackend {
    match config {
        ArtifactConfig::Filesystem { base_dir } => {
            shade_prover::ArtifactBackend::Filesystem(base_dir.clone())
        }
        ArtifactConfig::Http { base_url } => {
            shade_prover::ArtifactBackend::Http(base_url.clone())
        }
    }
}

//! fee quoting
//!
//! the relayer breaks even when the fee covers the gas it fronts, so the
//! quoted `feeBPS` is the asset's base margin plus the relay gas cost
//! expressed in asset basis points at the oracle rate. with a recipient
//! present the quote is also signed into a short-lived fee commitment.

use alloy::primitives::{Address, Bytes, U256, U512};

use shade_chain::{RelayData, FEE_DENOMINATOR, NATIVE_ASSET};

use crate::commitment::{sign_commitment, FeeCommitment};
use crate::config::ResolvedChain;
use crate::error::{RelayerError, Result};
use crate::oracle::{widen, PriceOracle, PriceQuote};
use crate::reader::PoolReader;

/// gas fronted by the relay transaction itself
pub const RELAY_TX_GAS: u64 = 650_000;
/// gas fronted by the extra-gas refund transaction
pub const EXTRA_GAS_TX_GAS: u64 = 320_000;
/// native units forwarded to the recipient in extra-gas mode
pub const EXTRA_GAS_FUND_GAS: u64 = 600_000;
/// how long a signed fee commitment stays valid
pub const COMMITMENT_WINDOW_MS: u64 = 20_000;

/// a complete quote, with the optional signed commitment
#[derive(Clone, Debug)]
pub struct FeeQuote {
    pub fee_bps: U256,
    pub gas_price: u128,
    pub quote: PriceQuote,
    pub commitment: Option<FeeCommitment>,
}

/// `base + ceil(den · 10000 · gasPrice · gasUnits / (amountIn · num))`
pub fn effective_fee_bps(
    base_fee_bps: u64,
    amount_in: U256,
    gas_price: u128,
    quote: &PriceQuote,
    extra_gas: bool,
) -> Result<U256> {
    if amount_in.is_zero() {
        return Err(RelayerError::InvalidInput("amountIn must be non-zero".into()));
    }

    let total_gas_units = RELAY_TX_GAS
        + if extra_gas {
            EXTRA_GAS_TX_GAS + EXTRA_GAS_FUND_GAS
        } else {
            0
        };
    let native_cost = U512::from(gas_price) * U512::from(total_gas_units);

    let numerator = widen(quote.den) * U512::from(FEE_DENOMINATOR) * native_cost;
    let denominator = widen(amount_in) * widen(quote.num);
    let gas_bps = numerator.div_ceil(denominator);
    if gas_bps > widen(U256::MAX) {
        return Err(RelayerError::Quote("gas cost overflows fee".into()));
    }

    Ok(U256::from(base_fee_bps) + gas_bps.to::<U256>())
}

/// price an asset in native units; the native asset quotes at identity
pub async fn price_asset(
    oracle: &PriceOracle,
    chain: &ResolvedChain,
    asset: Address,
) -> Result<PriceQuote> {
    if asset == NATIVE_ASSET {
        return Ok(PriceQuote::identity(asset));
    }
    let wrapped = chain
        .wrapped_native_address
        .ok_or(RelayerError::MissingWrappedNative)?;
    oracle
        .quote(wrapped, asset, &chain.intermediary_tokens)
        .await
}

/// what the validator asks when no fee commitment accompanies a request
pub trait FeeSource {
    fn required_fee_bps(
        &self,
        asset: Address,
        amount_in: U256,
        extra_gas: bool,
    ) -> impl std::future::Future<Output = Result<U256>> + Send;
}

/// fee source backed by the live chain and dex oracle
pub struct LiveFeeSource<'a, R: PoolReader> {
    pub reader: &'a R,
    pub oracle: Option<&'a PriceOracle>,
    pub chain: &'a ResolvedChain,
}

impl<R: PoolReader + Sync> FeeSource for LiveFeeSource<'_, R> {
    async fn required_fee_bps(
        &self,
        asset: Address,
        amount_in: U256,
        extra_gas: bool,
    ) -> Result<U256> {
        let entry = self
            .chain
            .asset(asset)
            .ok_or(RelayerError::AssetNotSupported(asset))?;
        let gas_price = self.reader.gas_price().await?;
        let quote = if asset == NATIVE_ASSET {
            PriceQuote::identity(asset)
        } else {
            let oracle = self
                .oracle
                .ok_or_else(|| RelayerError::Quote("no price oracle configured".into()))?;
            price_asset(oracle, self.chain, asset).await?
        };
        effective_fee_bps(entry.fee_bps, amount_in, gas_price, &quote, extra_gas)
    }
}

/// quote a withdrawal; when a recipient is given, also bind the quote
/// into a signed commitment over the relay data it implies
#[allow(clippy::too_many_arguments)]
pub fn finish_quote(
    chain: &ResolvedChain,
    asset: Address,
    amount_in: U256,
    gas_price: u128,
    quote: PriceQuote,
    extra_gas: bool,
    recipient: Option<Address>,
    now_ms: u64,
) -> Result<FeeQuote> {
    let asset_entry = chain
        .asset(asset)
        .ok_or(RelayerError::AssetNotSupported(asset))?;
    let fee_bps = effective_fee_bps(asset_entry.fee_bps, amount_in, gas_price, &quote, extra_gas)?;

    let commitment = match recipient {
        None => None,
        Some(recipient) => {
            let relay_data = RelayData::new(recipient, chain.fee_receiver_address, fee_bps);
            let withdrawal_data: Bytes = relay_data.encode();
            let fee_amount = amount_in * fee_bps / U256::from(FEE_DENOMINATOR);
            let signer = chain
                .signer()
                .map_err(|e| RelayerError::InvalidInput(e.to_string()))?;
            Some(sign_commitment(
                &signer,
                chain.chain_id,
                withdrawal_data,
                asset,
                fee_amount,
                extra_gas,
                now_ms + COMMITMENT_WINDOW_MS,
            )?)
        }
    };

    Ok(FeeQuote {
        fee_bps,
        gas_price,
        quote,
        commitment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::verify_commitment;

    fn native_quote() -> PriceQuote {
        PriceQuote::identity(NATIVE_ASSET)
    }

    #[test]
    fn test_native_fee_known_answer() {
        // 1 eth withdrawal, 100 bps base, 10 gwei gas
        let amount = U256::from(10u64).pow(U256::from(18u64));
        let gas_price = 10_000_000_000u128;
        let fee = effective_fee_bps(100, amount, gas_price, &native_quote(), false).unwrap();

        // gas cost = 10e9 * 650_000 = 6.5e15; bps = ceil(1e4 * 6.5e15 / 1e18) = 65
        assert_eq!(fee, U256::from(165u64));
    }

    #[test]
    fn test_extra_gas_raises_fee() {
        let amount = U256::from(10u64).pow(U256::from(18u64));
        let gas_price = 10_000_000_000u128;
        let plain = effective_fee_bps(100, amount, gas_price, &native_quote(), false).unwrap();
        let extra = effective_fee_bps(100, amount, gas_price, &native_quote(), true).unwrap();
        assert!(extra > plain);

        // total gas = 650k + 320k + 600k = 1_570_000 units
        // bps = ceil(1e4 * 1.57e16 / 1e18) = 157
        assert_eq!(extra, U256::from(100u64 + 157u64));
    }

    #[test]
    fn test_asset_quote_scales_fee() {
        // 1 native buys 2000 asset units: den/num = 2000
        let quote = PriceQuote {
            num: U256::from(1u64),
            den: U256::from(2_000u64),
            path: vec![],
            fee_tier: 500,
        };
        let amount = U256::from(10u64).pow(U256::from(18u64));
        let gas_price = 10_000_000_000u128;
        let fee = effective_fee_bps(50, amount, gas_price, &quote, false).unwrap();
        // gas in asset units = 6.5e15 * 2000; bps over 1e18 = 130_000
        assert_eq!(fee, U256::from(50u64 + 130_000u64));
    }

    #[test]
    fn test_ceiling_rounds_up() {
        // tiny amount forces rounding
        let fee =
            effective_fee_bps(0, U256::from(3u64), 1, &native_quote(), false).unwrap();
        // ceil(1e4 * 650_000 / 3) = 2_166_666_667
        assert_eq!(fee, U256::from(2_166_666_667u64));
    }

    #[test]
    fn test_zero_amount_rejected() {
        assert!(effective_fee_bps(1, U256::ZERO, 1, &native_quote(), false).is_err());
    }

    #[test]
    fn test_quote_commitment_binds_relay_data() {
        let config: crate::config::RelayerConfig = serde_json::from_str(sample_config()).unwrap();
        let chain = config.resolve(1).unwrap();
        let recipient: Address = "0x5000000000000000000000000000000000000005".parse().unwrap();
        let amount = U256::from(10u64).pow(U256::from(18u64));

        let quote = finish_quote(
            &chain,
            NATIVE_ASSET,
            amount,
            10_000_000_000,
            native_quote(),
            false,
            Some(recipient),
            1_000_000,
        )
        .unwrap();

        let commitment = quote.commitment.unwrap();
        assert_eq!(commitment.expiration, 1_000_000 + COMMITMENT_WINDOW_MS);

        let signer = chain.signer().unwrap();
        verify_commitment(&commitment, 1, signer.address(), 1_000_000).unwrap();

        // the committed withdrawal data decodes back to the quoted fee
        let relay = RelayData::decode(&commitment.withdrawal_data).unwrap();
        assert_eq!(relay.relayFeeBPS, quote.fee_bps);
        assert_eq!(relay.recipient, recipient);
        assert_eq!(relay.feeRecipient, chain.fee_receiver_address);
    }

    fn sample_config() -> &'static str {
        r#"{
            "defaults": {
                "fee_receiver_address": "0x1000000000000000000000000000000000000001",
                "signer_private_key": "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                "entrypoint_address": "0x2000000000000000000000000000000000000002"
            },
            "chains": [{
                "chain_id": 1,
                "chain_name": "mainnet",
                "rpc_url": "http://localhost:8545",
                "supported_assets": [{
                    "asset_address": "0xEeEeEEEEeEeEEEEeeEeEeeEeEeEeEeeEeEEEEEEE",
                    "asset_name": "ETH",
                    "fee_bps": 100,
                    "min_withdraw_amount": "10000000000000000"
                }],
                "native_currency": { "name": "Ether", "symbol": "ETH", "decimals": 18 }
            }],
            "db_path": "/tmp/unused",
            "artifacts": { "backend": "filesystem", "base_dir": "/tmp/unused" }
        }"#
    }
}

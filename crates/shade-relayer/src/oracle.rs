//! dex price oracle
//!
//! quotes how many asset units one native unit buys, as an exact
//! `{num, den}` ratio read from uniswap-v3-style pools. the direct pair
//! is tried first across the fee tiers; when no direct pool qualifies,
//! two-hop routes through the configured intermediary tokens are tried,
//! and if everything fails the direct-pair error is the one surfaced.
//! a pool qualifies only with non-zero liquidity, a non-zero tick and an
//! unlocked slot.

use alloy::primitives::{aliases::U24, Address, U256, U512};
use alloy::providers::DynProvider;
use alloy::sol;

use crate::error::{RelayerError, Result};

/// fee tiers probed, ascending; the first qualifying pool wins
const FEE_TIERS: [u32; 3] = [500, 3_000, 10_000];

sol! {
    #[sol(rpc)]
    interface IUniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    #[sol(rpc)]
    interface IUniswapV3Pool {
        function slot0() external view returns (
            uint160 sqrtPriceX96,
            int24 tick,
            uint16 observationIndex,
            uint16 observationCardinality,
            uint16 observationCardinalityNext,
            uint8 feeProtocol,
            bool unlocked
        );
        function liquidity() external view returns (uint128);
        function token0() external view returns (address);
    }

    #[sol(rpc)]
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }
        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut);
    }
}

/// `num` units of the input token buy `den` units of the output token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceQuote {
    pub num: U256,
    pub den: U256,
    /// token route, for observability
    pub path: Vec<Address>,
    /// fee tier of the first hop, reused by the refund swap
    pub fee_tier: u32,
}

impl PriceQuote {
    /// identity quote for the native asset itself
    pub fn identity(token: Address) -> Self {
        Self {
            num: U256::from(1u64),
            den: U256::from(1u64),
            path: vec![token],
            fee_tier: 0,
        }
    }
}

pub struct PriceOracle {
    provider: DynProvider,
    factory: Address,
}

impl PriceOracle {
    pub fn new(provider: DynProvider, factory: Address) -> Self {
        Self { provider, factory }
    }

    /// quote `token_in -> token_out`, direct first, then two hops through
    /// the intermediaries
    pub async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        intermediaries: &[Address],
    ) -> Result<PriceQuote> {
        let direct_err = match self.direct(token_in, token_out).await {
            Ok(quote) => return Ok(quote),
            Err(e) => e,
        };

        for &mid in intermediaries {
            if mid == token_in || mid == token_out {
                continue;
            }
            let first = match self.direct(token_in, mid).await {
                Ok(q) => q,
                Err(_) => continue,
            };
            let second = match self.direct(mid, token_out).await {
                Ok(q) => q,
                Err(_) => continue,
            };
            let (num, den) = compose(&first, &second);
            return Ok(PriceQuote {
                num,
                den,
                path: vec![token_in, mid, token_out],
                fee_tier: first.fee_tier,
            });
        }

        Err(direct_err)
    }

    /// lowest-fee qualifying direct pool
    async fn direct(&self, token_in: Address, token_out: Address) -> Result<PriceQuote> {
        let factory = IUniswapV3Factory::new(self.factory, self.provider.clone());
        let mut last_reason = format!("no pool for {token_in}/{token_out}");

        for fee in FEE_TIERS {
            let pool_address = factory
                .getPool(token_in, token_out, U24::from(fee))
                .call()
                .await
                .map_err(|e| RelayerError::Quote(e.to_string()))?;
            if pool_address == Address::ZERO {
                continue;
            }

            let pool = IUniswapV3Pool::new(pool_address, self.provider.clone());
            let slot0 = pool
                .slot0()
                .call()
                .await
                .map_err(|e| RelayerError::Quote(e.to_string()))?;
            if !slot0.unlocked {
                last_reason = format!("pool {pool_address} locked");
                continue;
            }
            if slot0.tick.is_zero() {
                last_reason = format!("pool {pool_address} has zero tick");
                continue;
            }
            let liquidity = pool
                .liquidity()
                .call()
                .await
                .map_err(|e| RelayerError::Quote(e.to_string()))?;
            if liquidity == 0 {
                last_reason = format!("pool {pool_address} has no liquidity");
                continue;
            }

            let token0 = pool
                .token0()
                .call()
                .await
                .map_err(|e| RelayerError::Quote(e.to_string()))?;
            let sqrt_price = U256::from(slot0.sqrtPriceX96);
            let (num, den) = ratio_from_sqrt_price(sqrt_price, token0 == token_in);
            return Ok(PriceQuote {
                num,
                den,
                path: vec![token_in, token_out],
                fee_tier: fee,
            });
        }

        Err(RelayerError::Quote(last_reason))
    }
}

/// turn a pool's sqrt price into an input→output ratio
///
/// the pool price is token1-per-token0 = sqrtPriceX96² / 2¹⁹²; when the
/// input token is token0 that is already output-per-input, otherwise the
/// ratio inverts.
fn ratio_from_sqrt_price(sqrt_price_x96: U256, input_is_token0: bool) -> (U256, U256) {
    let squared = widen(sqrt_price_x96) * widen(sqrt_price_x96);
    let shift = U512::from(1u64) << 192;
    if input_is_token0 {
        // den/num = squared / 2^192
        fit(shift, squared)
    } else {
        fit(squared, shift)
    }
}

/// compose two hops: output-per-input ratios multiply
fn compose(first: &PriceQuote, second: &PriceQuote) -> (U256, U256) {
    let num = widen(first.num) * widen(second.num);
    let den = widen(first.den) * widen(second.den);
    fit(num, den)
}

pub(crate) fn widen(x: U256) -> U512 {
    U512::from_limbs_slice(x.as_limbs())
}

/// scale a u512 ratio down until both terms fit a word, preserving the
/// quotient
fn fit(mut num: U512, mut den: U512) -> (U256, U256) {
    let max = widen(U256::MAX);
    while num > max || den > max {
        num >>= 1;
        den >>= 1;
    }
    let num: U256 = num.to();
    let den: U256 = den.to();
    (num.max(U256::from(1u64)), den.max(U256::from(1u64)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_quote() {
        let quote = PriceQuote::identity(shade_chain::NATIVE_ASSET);
        assert_eq!(quote.num, quote.den);
        assert_eq!(quote.path.len(), 1);
    }

    #[test]
    fn test_ratio_orientation() {
        // price of 1:1 is sqrtPrice = 2^96
        let one_to_one = U256::from(1u64) << 96;
        let (num, den) = ratio_from_sqrt_price(one_to_one, true);
        assert_eq!(num, den);

        // token1-per-token0 of 4 means sqrtPrice = 2 * 2^96
        let four = U256::from(2u64) << 96;
        let (num, den) = ratio_from_sqrt_price(four, true);
        assert_eq!(den / num, U256::from(4u64));

        // inverted orientation
        let (num, den) = ratio_from_sqrt_price(four, false);
        assert_eq!(num / den, U256::from(4u64));
    }

    #[test]
    fn test_compose_multiplies() {
        let a = PriceQuote {
            num: U256::from(1u64),
            den: U256::from(3u64),
            path: vec![],
            fee_tier: 500,
        };
        let b = PriceQuote {
            num: U256::from(1u64),
            den: U256::from(5u64),
            path: vec![],
            fee_tier: 3_000,
        };
        assert_eq!(compose(&a, &b), (U256::from(1u64), U256::from(15u64)));
    }

    #[test]
    fn test_fit_preserves_quotient() {
        let num = widen(U256::MAX) * U512::from(8u64);
        let den = widen(U256::MAX) * U512::from(2u64);
        let (n, d) = fit(num, den);
        assert_eq!(d / n, U256::ZERO);
        assert_eq!(n / d, U256::from(4u64));
    }
}

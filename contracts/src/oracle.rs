//! Collateral price guard.
//!
//! Prices come from an external oracle contract. A price is rejected when it
//! is older than `max_price_age`, zero, too uncertain, or too far from 1.0.

use odra::prelude::*;
use odra::casper_types::{runtime_args, U256};
use odra::CallDef;

use crate::errors::{ControllerError, LedgerResult};
use crate::types::{OracleConfig, BPS_SCALE};

/// Price reported by the oracle: `price / 10^exponent` collateral units per redeemable
#[odra::odra_type]
pub struct OraclePrice {
    pub price: U256,
    pub exponent: u8,
    /// Confidence interval, same scale as `price`
    pub confidence: U256,
    /// Block time of the last update
    pub timestamp: u64,
}

/// Fetch the collateral price: `get_price(asset) -> OraclePrice` on the oracle contract
pub fn fetch_price(env: &odra::ContractEnv, oracle: Address, asset: Address) -> OraclePrice {
    let args = runtime_args! {
        "asset" => asset
    };
    let call_def = CallDef::new("get_price", false, args);
    env.call_contract(oracle, call_def)
}

/// Validate a price against the guard configuration
pub fn check_price(price: &OraclePrice, config: &OracleConfig, now: u64) -> LedgerResult<()> {
    if now.saturating_sub(price.timestamp) > config.max_price_age {
        return Err(ControllerError::OraclePriceStale);
    }
    if price.price.is_zero() {
        return Err(ControllerError::OraclePriceInvalid);
    }

    let bps = U256::from(BPS_SCALE);

    // confidence / price <= max_confidence_bps / 10000
    let confidence_scaled = price
        .confidence
        .checked_mul(bps)
        .ok_or(ControllerError::OraclePriceInvalid)?;
    let confidence_bound = price
        .price
        .checked_mul(U256::from(config.max_confidence_bps))
        .ok_or(ControllerError::OraclePriceInvalid)?;
    if confidence_scaled > confidence_bound {
        return Err(ControllerError::OraclePriceInvalid);
    }

    // |price - 1.0| / 1.0 <= max_depeg_bps / 10000
    let one = U256::from(10u64)
        .checked_pow(U256::from(price.exponent))
        .ok_or(ControllerError::OraclePriceInvalid)?;
    let deviation = if price.price > one {
        price.price - one
    } else {
        one - price.price
    };
    let deviation_scaled = deviation
        .checked_mul(bps)
        .ok_or(ControllerError::OraclePriceInvalid)?;
    let depeg_bound = one
        .checked_mul(U256::from(config.max_depeg_bps))
        .ok_or(ControllerError::OraclePriceInvalid)?;
    if deviation_scaled > depeg_bound {
        return Err(ControllerError::OraclePriceInvalid);
    }

    Ok(())
}

//! Fixed-point ledger arithmetic.
//!
//! Token amounts are `u64`, cumulative supply and value counters are `U128`.
//! Every operation is checked: overflow and division by zero fail with
//! `MathOverflow` instead of saturating. Amounts derived from shares are
//! always rounded down; share counts burned for a payout are rounded up.

use odra::casper_types::{U128, U256};

use crate::errors::{ControllerError, LedgerResult};
use crate::types::BPS_SCALE;

/// Collateral value of `shares_amount` shares:
/// `floor(shares_amount * total_shares_value / total_shares_supply)`
pub fn share_value(
    shares_amount: u64,
    total_shares_supply: u64,
    total_shares_value: u64,
) -> LedgerResult<u64> {
    if total_shares_supply == 0 {
        return Err(ControllerError::MathOverflow);
    }
    let value = (shares_amount as u128)
        .checked_mul(total_shares_value as u128)
        .and_then(|v| v.checked_div(total_shares_supply as u128))
        .ok_or(ControllerError::MathOverflow)?;
    narrow_u128(value)
}

/// Shares issued for a deposit of `collateral_amount`, rounded down.
///
/// An empty pool issues shares 1:1. A pool holding value with no shares
/// outstanding cannot be priced and fails.
pub fn shares_for_deposit(
    collateral_amount: u64,
    total_shares_supply: u64,
    total_shares_value: u64,
) -> LedgerResult<u64> {
    if total_shares_supply == 0 {
        if total_shares_value > 0 {
            return Err(ControllerError::MathOverflow);
        }
        return Ok(collateral_amount);
    }
    if total_shares_value == 0 {
        return Err(ControllerError::MathOverflow);
    }
    let shares = (collateral_amount as u128)
        .checked_mul(total_shares_supply as u128)
        .ok_or(ControllerError::MathOverflow)?
        / total_shares_value as u128;
    narrow_u128(shares)
}

/// Shares that must be burned to withdraw `collateral_amount`, rounded up
pub fn shares_for_withdrawal(
    collateral_amount: u64,
    total_shares_supply: u64,
    total_shares_value: u64,
) -> LedgerResult<u64> {
    if total_shares_value == 0 {
        return Err(ControllerError::MathOverflow);
    }
    let numerator = (collateral_amount as u128)
        .checked_mul(total_shares_supply as u128)
        .ok_or(ControllerError::MathOverflow)?;
    let divisor = total_shares_value as u128;
    let shares = numerator / divisor + u128::from(numerator % divisor != 0);
    narrow_u128(shares)
}

/// Split `amount` into `(amount - fee, fee)` with `fee = floor(amount * bps / 10000)`
pub fn compute_amount_less_fraction(amount: u64, fraction_bps: u32) -> LedgerResult<(u64, u64)> {
    if fraction_bps > BPS_SCALE {
        return Err(ControllerError::InvalidFeeBps);
    }
    let fee = (amount as u128)
        .checked_mul(fraction_bps as u128)
        .ok_or(ControllerError::MathOverflow)?
        / BPS_SCALE as u128;
    let fee = narrow_u128(fee)?;
    let net = amount.checked_sub(fee).ok_or(ControllerError::MathOverflow)?;
    Ok((net, fee))
}

/// `floor(amount * bps / 10000)`
pub fn bps_of(amount: U128, bps: u32) -> LedgerResult<U128> {
    let scaled = U256::from(amount.as_u128())
        .checked_mul(U256::from(bps))
        .and_then(|v| v.checked_div(U256::from(BPS_SCALE)))
        .ok_or(ControllerError::MathOverflow)?;
    narrow_u256_to_u128(scaled)
}

pub fn add(a: U128, b: U128) -> LedgerResult<U128> {
    a.checked_add(b).ok_or(ControllerError::MathOverflow)
}

pub fn sub(a: U128, b: U128) -> LedgerResult<U128> {
    a.checked_sub(b).ok_or(ControllerError::MathOverflow)
}

pub fn add_u64(a: U128, b: u64) -> LedgerResult<U128> {
    add(a, U128::from(b))
}

pub fn sub_u64(a: U128, b: u64) -> LedgerResult<U128> {
    sub(a, U128::from(b))
}

/// `max(0, a - b)`
pub fn positive_difference(a: U128, b: U128) -> U128 {
    a.checked_sub(b).unwrap_or_default()
}

pub fn to_u64(value: U128) -> LedgerResult<u64> {
    if value > U128::from(u64::MAX) {
        return Err(ControllerError::MathOverflow);
    }
    Ok(value.low_u64())
}

pub fn u256_to_u64(value: U256) -> LedgerResult<u64> {
    if value > U256::from(u64::MAX) {
        return Err(ControllerError::MathOverflow);
    }
    Ok(value.low_u64())
}

/// Token balances above `u64::MAX` are clamped
pub fn u256_to_u64_saturating(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}

fn narrow_u128(value: u128) -> LedgerResult<u64> {
    u64::try_from(value).map_err(|_| ControllerError::MathOverflow)
}

fn narrow_u256_to_u128(value: U256) -> LedgerResult<U128> {
    if value > U256::from(u128::MAX) {
        return Err(ControllerError::MathOverflow);
    }
    Ok(U128::from(value.as_u128()))
}

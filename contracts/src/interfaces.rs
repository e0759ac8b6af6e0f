//! Entry point parameters and cross-contract call helpers.
//!
//! Venues and tokens are reached through `CallDef`s; each helper struct maps
//! one external contract's entry points.

use odra::prelude::*;
use odra::casper_types::{runtime_args, U128, U256};
use odra::{CallDef, ContractEnv};

use crate::types::{
    OracleConfig, PooledCreditPoolState, VenueKind, VenueWeights, WithdrawEpoch, YieldVaultState,
};

/// Parameters for registering a venue depository
#[odra::odra_type]
pub struct RegisterVenueParams {
    pub kind: VenueKind,
    /// CEP-18 collateral token
    pub collateral_token: Address,
    /// Must equal the redeemable token decimals
    pub collateral_decimals: u8,
    /// External venue contract, required for share venues
    pub venue: Option<Address>,
    pub redeemable_amount_under_management_cap: U128,
    pub minting_fee_bps: u8,
    pub redeeming_fee_bps: u8,
    pub profits_beneficiary: Address,
}

/// Controller fields to edit; `None` keeps the current value
#[odra::odra_type]
#[derive(Default)]
pub struct EditControllerFields {
    pub authority: Option<Address>,
    pub redeemable_global_supply_cap: Option<U128>,
    pub venue_weights: Option<VenueWeights>,
    pub outflow_limit_per_epoch_amount: Option<u64>,
    pub outflow_limit_per_epoch_bps: Option<u32>,
    pub slots_per_epoch: Option<u64>,
    pub oracle: Option<OracleConfig>,
}

/// Depository fields to edit; `None` keeps the current value
#[odra::odra_type]
#[derive(Default)]
pub struct EditVenueFields {
    pub redeemable_amount_under_management_cap: Option<U128>,
    pub minting_fee_bps: Option<u8>,
    pub redeeming_fee_bps: Option<u8>,
    pub minting_disabled: Option<bool>,
    pub profits_beneficiary: Option<Address>,
}

/// CEP-18 collateral token
pub struct Cep18Calls;

impl Cep18Calls {
    pub fn transfer_from(env: &ContractEnv, token: Address, owner: Address, recipient: Address, amount: u64) {
        let args = runtime_args! {
            "owner" => owner,
            "recipient" => recipient,
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("transfer_from", true, args);
        env.call_contract::<()>(token, call_def);
    }

    pub fn transfer(env: &ContractEnv, token: Address, recipient: Address, amount: u64) {
        let args = runtime_args! {
            "recipient" => recipient,
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("transfer", true, args);
        env.call_contract::<()>(token, call_def);
    }

    pub fn approve(env: &ContractEnv, token: Address, spender: Address, amount: u64) {
        let args = runtime_args! {
            "spender" => spender,
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("approve", true, args);
        env.call_contract::<()>(token, call_def);
    }
}

/// Controller-restricted entry points of the redeemable token
pub struct RedeemableCalls;

impl RedeemableCalls {
    pub fn mint(env: &ContractEnv, token: Address, to: Address, amount: u64) {
        let args = runtime_args! {
            "to" => to,
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("mint", true, args);
        env.call_contract::<()>(token, call_def);
    }

    pub fn burn_from(env: &ContractEnv, token: Address, from: Address, amount: u64) {
        let args = runtime_args! {
            "from" => from,
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("burn_from", true, args);
        env.call_contract::<()>(token, call_def);
    }

    pub fn balance_of(env: &ContractEnv, token: Address, account: Address) -> U256 {
        let args = runtime_args! {
            "account" => account
        };
        let call_def = CallDef::new("balance_of", false, args);
        env.call_contract(token, call_def)
    }
}

/// Yield vault: deposits collateral for LP tokens held by the caller
pub struct YieldVaultCalls;

impl YieldVaultCalls {
    pub fn vault_state(env: &ContractEnv, vault: Address) -> YieldVaultState {
        let call_def = CallDef::new("vault_state", false, runtime_args! {});
        env.call_contract(vault, call_def)
    }

    /// Returns LP tokens issued
    pub fn deposit(env: &ContractEnv, vault: Address, amount: u64) -> U256 {
        let args = runtime_args! {
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("deposit", true, args);
        env.call_contract(vault, call_def)
    }

    /// Burns LP tokens, returns collateral paid to the caller
    pub fn withdraw(env: &ContractEnv, vault: Address, shares: u64) -> U256 {
        let args = runtime_args! {
            "shares" => U256::from(shares)
        };
        let call_def = CallDef::new("withdraw", true, args);
        env.call_contract(vault, call_def)
    }
}

/// Pooled-credit pool: share deposits plus epoch-gated withdraw requests
pub struct PooledCreditCalls;

impl PooledCreditCalls {
    pub fn pool_state(env: &ContractEnv, pool: Address) -> PooledCreditPoolState {
        let call_def = CallDef::new("pool_state", false, runtime_args! {});
        env.call_contract(pool, call_def)
    }

    pub fn withdraw_epoch(env: &ContractEnv, pool: Address) -> WithdrawEpoch {
        let call_def = CallDef::new("withdraw_epoch", false, runtime_args! {});
        env.call_contract(pool, call_def)
    }

    pub fn balance_of(env: &ContractEnv, pool: Address, account: Address) -> U256 {
        let args = runtime_args! {
            "account" => account
        };
        let call_def = CallDef::new("balance_of", false, args);
        env.call_contract(pool, call_def)
    }

    /// Returns shares issued
    pub fn deposit(env: &ContractEnv, pool: Address, amount: u64) -> U256 {
        let args = runtime_args! {
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("deposit", true, args);
        env.call_contract(pool, call_def)
    }

    /// Burns shares, returns collateral paid to the caller
    pub fn withdraw(env: &ContractEnv, pool: Address, shares: u64) -> U256 {
        let args = runtime_args! {
            "shares" => U256::from(shares)
        };
        let call_def = CallDef::new("withdraw", true, args);
        env.call_contract(pool, call_def)
    }

    pub fn create_withdraw_request(env: &ContractEnv, pool: Address, amount: u64) {
        let args = runtime_args! {
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("create_withdraw_request", true, args);
        env.call_contract::<()>(pool, call_def);
    }

    /// Returns collateral paid to the caller
    pub fn redeem_withdraw_request(env: &ContractEnv, pool: Address, amount: u64) -> U256 {
        let args = runtime_args! {
            "amount" => U256::from(amount)
        };
        let call_def = CallDef::new("redeem_withdraw_request", true, args);
        env.call_contract(pool, call_def)
    }
}

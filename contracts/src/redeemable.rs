//! Redeemable Token Contract
//!
//! CEP-18 compatible stablecoin whose supply is driven by the controller.
//! Only the controller can mint and burn; everything else is plain CEP-18,
//! with unit-returning transfer entry points as in the reference token.

use odra::prelude::*;
use odra::casper_types::{U256, Key};
use odra::casper_types::bytesrepr::ToBytes;
use crate::errors::ControllerError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

const CEP18_NAME_KEY: &str = "name";
const CEP18_SYMBOL_KEY: &str = "symbol";
const CEP18_DECIMALS_KEY: &str = "decimals";
const CEP18_TOTAL_SUPPLY_KEY: &str = "total_supply";
const CEP18_BALANCES_DICT: &str = "balances";
const CEP18_ALLOWANCES_DICT: &str = "allowances";

#[odra::module]
pub struct RedeemableToken {
    name: Var<String>,
    symbol: Var<String>,
    decimals: Var<u8>,
    total_supply: Var<U256>,
    balances: Mapping<Address, U256>,
    /// owner -> spender -> amount
    allowances: Mapping<(Address, Address), U256>,
    /// Can assign the controller
    admin: Var<Address>,
    /// The only minter and burner
    controller: Var<Address>,
}

#[odra::module]
impl RedeemableToken {
    pub fn init(&mut self, name: String, symbol: String, decimals: u8) {
        self.name.set(name.clone());
        self.symbol.set(symbol.clone());
        self.decimals.set(decimals);
        self.total_supply.set(U256::zero());
        self.admin.set(self.env().caller());
        self.env().init_dictionary(CEP18_BALANCES_DICT);
        self.env().init_dictionary(CEP18_ALLOWANCES_DICT);
        self.env().set_named_value(CEP18_NAME_KEY, name);
        self.env().set_named_value(CEP18_SYMBOL_KEY, symbol);
        self.env().set_named_value(CEP18_DECIMALS_KEY, decimals);
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, U256::zero());
    }

    // ========== CEP-18 Standard Functions ==========

    pub fn name(&self) -> String {
        self.name.get().unwrap_or_default()
    }

    pub fn symbol(&self) -> String {
        self.symbol.get().unwrap_or_default()
    }

    pub fn decimals(&self) -> u8 {
        self.decimals.get().unwrap_or(0)
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply.get().unwrap_or(U256::zero())
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).unwrap_or(U256::zero())
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances.get(&(owner, spender)).unwrap_or(U256::zero())
    }

    pub fn transfer(&mut self, recipient: Address, amount: U256) {
        let sender = self.env().caller();
        self.transfer_internal(sender, recipient, amount);
    }

    pub fn approve(&mut self, spender: Address, amount: U256) {
        let owner = self.env().caller();
        self.approve_internal(owner, spender, amount);
    }

    /// Transfer tokens from owner to recipient (requires allowance)
    pub fn transfer_from(&mut self, owner: Address, recipient: Address, amount: U256) {
        let spender = self.env().caller();

        let current_allowance = self.allowance(owner, spender);
        if current_allowance < amount {
            self.env().revert(ControllerError::InsufficientAllowance);
        }

        self.transfer_internal(owner, recipient, amount);
        self.approve_internal(owner, spender, current_allowance - amount);
    }

    // ========== Controller Functions (Restricted) ==========

    /// Mint redeemable units against deposited collateral
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.require_controller();

        let new_supply = self.checked_add(self.total_supply(), amount);
        let new_balance = self.checked_add(self.balance_of(to), amount);
        self.balances.set(&to, new_balance);
        self.set_balance_cep18(to, new_balance);

        self.total_supply.set(new_supply);
        self.set_total_supply_cep18(new_supply);
    }

    /// Burn redeemable units of a redeeming account
    pub fn burn_from(&mut self, from: Address, amount: U256) {
        self.require_controller();

        let current_balance = self.balance_of(from);
        if current_balance < amount {
            self.env().revert(ControllerError::InsufficientRedeemableAmount);
        }

        let new_balance = current_balance - amount;
        self.balances.set(&from, new_balance);
        self.set_balance_cep18(from, new_balance);

        let new_supply = self.total_supply() - amount;
        self.total_supply.set(new_supply);
        self.set_total_supply_cep18(new_supply);
    }

    // ========== Admin Functions ==========

    /// Hand minting rights to the controller (admin only)
    pub fn set_controller(&mut self, controller: Address) {
        if Some(self.env().caller()) != self.admin.get() {
            self.env().revert(ControllerError::Unauthorized);
        }
        self.controller.set(controller);
    }

    pub fn get_controller(&self) -> Option<Address> {
        self.controller.get()
    }

    // ========== Internal Functions ==========

    fn transfer_internal(&mut self, from: Address, to: Address, amount: U256) {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            self.env().revert(ControllerError::InsufficientRedeemableAmount);
        }

        let new_from_balance = from_balance - amount;
        self.balances.set(&from, new_from_balance);
        self.set_balance_cep18(from, new_from_balance);

        let new_to_balance = self.checked_add(self.balance_of(to), amount);
        self.balances.set(&to, new_to_balance);
        self.set_balance_cep18(to, new_to_balance);
    }

    fn approve_internal(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.set(&(owner, spender), amount);
        self.set_allowance_cep18(owner, spender, amount);
    }

    fn set_balance_cep18(&self, owner: Address, amount: U256) {
        let key = cep18_balance_key(owner);
        self.env().set_dictionary_value(CEP18_BALANCES_DICT, key.as_bytes(), amount);
    }

    fn set_allowance_cep18(&self, owner: Address, spender: Address, amount: U256) {
        let key = cep18_allowance_key(owner, spender);
        self.env().set_dictionary_value(CEP18_ALLOWANCES_DICT, key.as_bytes(), amount);
    }

    fn set_total_supply_cep18(&self, amount: U256) {
        self.env().set_named_value(CEP18_TOTAL_SUPPLY_KEY, amount);
    }

    fn checked_add(&self, a: U256, b: U256) -> U256 {
        match a.checked_add(b) {
            Some(sum) => sum,
            None => self.env().revert(ControllerError::MathOverflow),
        }
    }

    fn require_controller(&self) {
        if Some(self.env().caller()) != self.controller.get() {
            self.env().revert(ControllerError::Unauthorized);
        }
    }
}

/// CEP-18 balance dictionary key: base64 of the serialized account key
pub fn cep18_balance_key(owner: Address) -> String {
    let bytes = Key::from(owner).to_bytes().unwrap_or_default();
    BASE64_STANDARD.encode(bytes)
}

/// CEP-18 allowance dictionary key: base64 of owner key bytes followed by spender key bytes
pub fn cep18_allowance_key(owner: Address, spender: Address) -> String {
    let mut bytes = Key::from(owner).to_bytes().unwrap_or_default();
    bytes.extend_from_slice(&Key::from(spender).to_bytes().unwrap_or_default());
    BASE64_STANDARD.encode(bytes)
}

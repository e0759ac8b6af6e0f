//! Events emitted by the controller.

use odra::prelude::*;
use odra::casper_types::U128;

use crate::types::{VenueKind, VenueWeights};

#[odra::event]
pub struct Minted {
    pub user: Address,
    pub venue: VenueKind,
    pub collateral_amount: u64,
    pub redeemable_amount: u64,
    pub minting_fee: u64,
}

#[odra::event]
pub struct Redeemed {
    pub user: Address,
    pub venue: VenueKind,
    pub redeemable_amount: u64,
    pub collateral_amount: u64,
    pub redeeming_fee: u64,
    pub epoch_outflow_amount: u64,
}

#[odra::event]
pub struct ProfitsCollected {
    pub venue: VenueKind,
    pub beneficiary: Address,
    pub profits_collateral_amount: u64,
}

#[odra::event]
pub struct WithdrawRequestCreated {
    pub go_live: u64,
    pub overflow_value: u64,
    pub profits_collateral_amount: u64,
    pub amount: u64,
}

#[odra::event]
pub struct WithdrawRequestRedeemed {
    pub go_live: u64,
    pub collateral_received: u64,
    pub overflow_collateral_amount: u64,
    pub profits_collateral_amount: u64,
}

#[odra::event]
pub struct FreezeToggled {
    pub is_frozen: bool,
}

#[odra::event]
pub struct ControllerEdited {
    pub authority: Address,
    pub redeemable_global_supply_cap: U128,
    pub venue_weights: VenueWeights,
}

#[odra::event]
pub struct VenueRegistered {
    pub venue: VenueKind,
    pub collateral_token: Address,
    pub venue_address: Option<Address>,
}

#[odra::event]
pub struct VenueEdited {
    pub venue: VenueKind,
    pub redeemable_amount_under_management_cap: U128,
    pub minting_fee_bps: u8,
    pub redeeming_fee_bps: u8,
    pub minting_disabled: bool,
}

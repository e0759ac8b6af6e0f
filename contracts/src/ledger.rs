//! Controller ledger core.
//!
//! Every state-changing operation is split in three steps:
//!
//! 1. a pure planner validates the request against copies of the stored
//!    records and returns a plan (quotes plus the expected version)
//! 2. the contract performs the external calls the plan requires
//! 3. the plan is settled with what the venue actually returned, producing
//!    a [`LedgerCommit`] that is applied to copies in one step
//!
//! Nothing is written unless the whole commit applies.

use odra::prelude::*;
use odra::casper_types::U128;

use crate::errors::{ControllerError, LedgerResult};
use crate::interfaces::{EditControllerFields, EditVenueFields, RegisterVenueParams};
use crate::math;
use crate::outflow::OutflowLimiter;
use crate::types::{
    reserved_space, ControllerState, DepositoryState, OracleConfig, OutflowLimit, VenueKind,
    VenueWeights, BPS_SCALE,
};
use crate::venue::{MintQuote, ProfitsQuote, RedeemQuote, Venue, VenueAdapter};

/// Changes to the controller singleton
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerDelta {
    pub supply_increase: u64,
    pub supply_decrease: u64,
    pub profits_collected: u64,
    pub rounding_surplus: u64,
    /// Replacement outflow window state
    pub outflow: Option<OutflowLimit>,
}

/// Withdraw request recorded on the pooled-credit depository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawRequestUpdate {
    pub go_live: u64,
    pub amount: u64,
}

/// Changes to one depository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositoryDelta {
    pub kind: VenueKind,
    pub collateral_increase: u64,
    pub collateral_decrease: u64,
    pub managed_increase: u64,
    pub managed_decrease: u64,
    pub minting_fee_accrued: u64,
    pub redeeming_fee_accrued: u64,
    pub profits_collected: u64,
    pub shares_increase: u64,
    pub shares_decrease: u64,
    pub withdraw_request: Option<WithdrawRequestUpdate>,
}

impl DepositoryDelta {
    pub fn new(kind: VenueKind) -> Self {
        Self {
            kind,
            collateral_increase: 0,
            collateral_decrease: 0,
            managed_increase: 0,
            managed_decrease: 0,
            minting_fee_accrued: 0,
            redeeming_fee_accrued: 0,
            profits_collected: 0,
            shares_increase: 0,
            shares_decrease: 0,
            withdraw_request: None,
        }
    }

    fn apply_to(&self, depository: &DepositoryState) -> LedgerResult<DepositoryState> {
        let mut next = depository.clone();
        next.collateral_amount_deposited =
            math::add_u64(next.collateral_amount_deposited, self.collateral_increase)?;
        next.collateral_amount_deposited = next
            .collateral_amount_deposited
            .checked_sub(U128::from(self.collateral_decrease))
            .ok_or(ControllerError::InsufficientCollateralDeposited)?;
        next.redeemable_amount_under_management =
            math::add_u64(next.redeemable_amount_under_management, self.managed_increase)?;
        next.redeemable_amount_under_management = next
            .redeemable_amount_under_management
            .checked_sub(U128::from(self.managed_decrease))
            .ok_or(ControllerError::InsufficientRedeemableAmount)?;
        next.minting_fee_total_accrued =
            math::add_u64(next.minting_fee_total_accrued, self.minting_fee_accrued)?;
        next.redeeming_fee_total_accrued =
            math::add_u64(next.redeeming_fee_total_accrued, self.redeeming_fee_accrued)?;
        next.profits_total_collected =
            math::add_u64(next.profits_total_collected, self.profits_collected)?;
        next.shares_held = next
            .shares_held
            .checked_add(self.shares_increase)
            .ok_or(ControllerError::MathOverflow)?
            .checked_sub(self.shares_decrease)
            .ok_or(ControllerError::InsufficientVenueShares)?;
        if let Some(request) = self.withdraw_request {
            next.withdraw_request_go_live = request.go_live;
            next.withdraw_request_amount = request.amount;
        }
        Ok(next)
    }
}

/// All deltas of one operation, applied atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCommit {
    pub expected_version: u64,
    pub controller: ControllerDelta,
    pub depositories: Vec<DepositoryDelta>,
}

impl LedgerCommit {
    pub fn new(expected_version: u64) -> Self {
        Self {
            expected_version,
            controller: ControllerDelta::default(),
            depositories: Vec::new(),
        }
    }

    /// Apply onto copies of the current records.
    ///
    /// Returns the new controller record and the touched depositories, in
    /// delta order. The inputs are left untouched, so a failure leaves
    /// nothing to roll back.
    pub fn apply(
        &self,
        controller: &ControllerState,
        depositories: &[DepositoryState],
    ) -> LedgerResult<(ControllerState, Vec<DepositoryState>)> {
        if controller.version != self.expected_version {
            return Err(ControllerError::StaleStateVersion);
        }

        let mut next = controller.clone();
        let delta = &self.controller;
        next.redeemable_circulating_supply =
            math::add_u64(next.redeemable_circulating_supply, delta.supply_increase)?;
        next.redeemable_circulating_supply =
            math::sub_u64(next.redeemable_circulating_supply, delta.supply_decrease)?;
        if next.redeemable_circulating_supply > next.redeemable_global_supply_cap {
            return Err(ControllerError::RedeemableGlobalSupplyCapReached);
        }
        next.profits_total_collected =
            math::add_u64(next.profits_total_collected, delta.profits_collected)?;
        next.rounding_surplus_total =
            math::add_u64(next.rounding_surplus_total, delta.rounding_surplus)?;
        if let Some(outflow) = delta.outflow {
            next.outflow = outflow;
        }
        next.version = next
            .version
            .checked_add(1)
            .ok_or(ControllerError::MathOverflow)?;

        let mut touched = Vec::with_capacity(self.depositories.len());
        for delta in &self.depositories {
            let current = depositories
                .iter()
                .find(|d| d.kind == delta.kind)
                .ok_or(ControllerError::VenueNotRegistered)?;
            touched.push(delta.apply_to(current)?);
        }
        Ok((next, touched))
    }
}

fn require_not_frozen(controller: &ControllerState) -> LedgerResult<()> {
    if controller.is_frozen {
        return Err(ControllerError::ProgramFrozen);
    }
    Ok(())
}

/// Validated mint awaiting the venue deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintPlan {
    pub kind: VenueKind,
    pub expected_version: u64,
    pub collateral_amount: u64,
    pub quote: MintQuote,
}

impl MintPlan {
    /// Settle with the shares the venue issued (always 0 for direct custody)
    pub fn settle(&self, shares_received: u64) -> LedgerResult<LedgerCommit> {
        if shares_received < self.quote.shares_expected {
            return Err(ControllerError::VenueSharesMismatch);
        }
        let mut commit = LedgerCommit::new(self.expected_version);
        commit.controller.supply_increase = self.quote.redeemable_amount;

        let mut delta = DepositoryDelta::new(self.kind);
        delta.collateral_increase = self.collateral_amount;
        delta.managed_increase = self.quote.redeemable_amount;
        delta.minting_fee_accrued = self.quote.minting_fee;
        delta.shares_increase = shares_received;
        commit.depositories.push(delta);
        Ok(commit)
    }
}

pub fn plan_mint(
    controller: &ControllerState,
    depository: &DepositoryState,
    venue: &Venue,
    collateral_amount: u64,
) -> LedgerResult<MintPlan> {
    require_not_frozen(controller)?;
    let quote = venue.quote_mint(controller, depository, collateral_amount)?;
    Ok(MintPlan {
        kind: depository.kind,
        expected_version: controller.version,
        collateral_amount,
        quote,
    })
}

/// Validated redemption awaiting the venue withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemPlan {
    pub kind: VenueKind,
    pub expected_version: u64,
    pub redeemable_amount: u64,
    pub quote: RedeemQuote,
    pub outflow: OutflowLimit,
}

impl RedeemPlan {
    /// Settle with the collateral the venue released.
    ///
    /// The user is paid the quoted amount; anything above it stays with the
    /// controller as rounding surplus.
    pub fn settle(&self, collateral_received: u64) -> LedgerResult<LedgerCommit> {
        let surplus = collateral_received
            .checked_sub(self.quote.collateral_amount)
            .ok_or(ControllerError::VenueCollateralMismatch)?;

        let mut commit = LedgerCommit::new(self.expected_version);
        commit.controller.supply_decrease = self.redeemable_amount;
        commit.controller.rounding_surplus = surplus;
        commit.controller.outflow = Some(self.outflow);

        let mut delta = DepositoryDelta::new(self.kind);
        delta.collateral_decrease = self.quote.collateral_amount;
        delta.managed_decrease = self.redeemable_amount;
        delta.redeeming_fee_accrued = self.quote.redeeming_fee;
        delta.shares_decrease = self.quote.shares_to_burn;
        commit.depositories.push(delta);
        Ok(commit)
    }
}

/// Plan a redemption.
///
/// `caller_balance` is the caller's redeemable token balance and
/// `current_slot` the block time used by the outflow window.
pub fn plan_redeem(
    controller: &ControllerState,
    depository: &DepositoryState,
    venue: &Venue,
    redeemable_amount: u64,
    caller_balance: u64,
    current_slot: u64,
) -> LedgerResult<RedeemPlan> {
    require_not_frozen(controller)?;
    if caller_balance < redeemable_amount {
        return Err(ControllerError::InsufficientRedeemableAmount);
    }
    let quote = venue.quote_redeem(depository, redeemable_amount)?;
    let outflow = OutflowLimiter::new(controller.outflow).check_and_record(
        controller.redeemable_circulating_supply,
        quote.collateral_amount,
        current_slot,
    )?;
    Ok(RedeemPlan {
        kind: depository.kind,
        expected_version: controller.version,
        redeemable_amount,
        quote,
        outflow,
    })
}

/// Validated profit collection awaiting the venue withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitsPlan {
    pub kind: VenueKind,
    pub expected_version: u64,
    pub beneficiary: Address,
    pub quote: ProfitsQuote,
}

impl ProfitsPlan {
    /// Settle with the collateral released for the burned shares.
    ///
    /// Exactly the quoted profit goes to the beneficiary; the liability
    /// (`redeemable_amount_under_management`) does not move.
    pub fn settle(&self, collateral_received: u64) -> LedgerResult<LedgerCommit> {
        let profits = self.quote.profits_collateral_amount;
        let surplus = collateral_received
            .checked_sub(profits)
            .ok_or(ControllerError::VenueCollateralMismatch)?;

        let mut commit = LedgerCommit::new(self.expected_version);
        commit.controller.profits_collected = profits;
        commit.controller.rounding_surplus = surplus;

        let mut delta = DepositoryDelta::new(self.kind);
        delta.profits_collected = profits;
        delta.shares_decrease = self.quote.shares_to_burn;
        commit.depositories.push(delta);
        Ok(commit)
    }
}

/// `None` when there is nothing to collect
pub fn plan_collect_profits(
    controller: &ControllerState,
    depository: &DepositoryState,
    venue: &Venue,
) -> LedgerResult<Option<ProfitsPlan>> {
    require_not_frozen(controller)?;
    let quote = venue.collect_profits(depository)?;
    if quote.is_empty() {
        return Ok(None);
    }
    Ok(Some(ProfitsPlan {
        kind: depository.kind,
        expected_version: controller.version,
        beneficiary: depository.profits_beneficiary,
        quote,
    }))
}

fn bump_version(controller: &mut ControllerState) -> LedgerResult<()> {
    controller.version = controller
        .version
        .checked_add(1)
        .ok_or(ControllerError::MathOverflow)?;
    Ok(())
}

fn validate_weights(weights: &VenueWeights) -> LedgerResult<()> {
    let each_in_range = VenueKind::ALL.iter().all(|kind| weights.get(*kind) <= BPS_SCALE);
    if !each_in_range || !weights.is_valid() {
        return Err(ControllerError::InvalidDepositoriesWeightBps);
    }
    Ok(())
}

/// Initial controller record
pub fn initialize_controller(
    authority: Address,
    redeemable_token: Address,
    redeemable_decimals: u8,
    redeemable_global_supply_cap: U128,
    venue_weights: VenueWeights,
    outflow: OutflowLimit,
) -> LedgerResult<ControllerState> {
    validate_weights(&venue_weights)?;
    OutflowLimiter::validate(&outflow)?;
    Ok(ControllerState {
        version: 0,
        authority,
        redeemable_token,
        redeemable_decimals,
        redeemable_global_supply_cap,
        redeemable_circulating_supply: U128::zero(),
        venue_weights,
        outflow: OutflowLimit {
            epoch_outflow_amount: 0,
            ..outflow
        },
        oracle: OracleConfig::default(),
        is_frozen: false,
        profits_total_collected: U128::zero(),
        rounding_surplus_total: U128::zero(),
        reserved: reserved_space(),
    })
}

/// Replace the weights; rejected weights leave the record unchanged
pub fn set_venue_weights(
    controller: &ControllerState,
    weights: VenueWeights,
) -> LedgerResult<ControllerState> {
    require_not_frozen(controller)?;
    validate_weights(&weights)?;
    let mut next = controller.clone();
    next.venue_weights = weights;
    bump_version(&mut next)?;
    Ok(next)
}

pub fn set_frozen(controller: &ControllerState, frozen: bool) -> LedgerResult<ControllerState> {
    if controller.is_frozen == frozen {
        return Err(ControllerError::ProgramAlreadyFrozenOrResumed);
    }
    let mut next = controller.clone();
    next.is_frozen = frozen;
    bump_version(&mut next)?;
    Ok(next)
}

/// Apply the supplied controller fields; omitted fields keep their value
pub fn edit_controller(
    controller: &ControllerState,
    fields: &EditControllerFields,
) -> LedgerResult<ControllerState> {
    require_not_frozen(controller)?;
    let mut next = controller.clone();

    if let Some(cap) = fields.redeemable_global_supply_cap {
        if cap < next.redeemable_circulating_supply {
            return Err(ControllerError::InvalidRedeemableGlobalSupplyCap);
        }
        next.redeemable_global_supply_cap = cap;
    }
    if let Some(weights) = fields.venue_weights {
        validate_weights(&weights)?;
        next.venue_weights = weights;
    }
    if let Some(amount) = fields.outflow_limit_per_epoch_amount {
        next.outflow.outflow_limit_per_epoch_amount = amount;
    }
    if let Some(bps) = fields.outflow_limit_per_epoch_bps {
        next.outflow.outflow_limit_per_epoch_bps = bps;
    }
    if let Some(slots) = fields.slots_per_epoch {
        next.outflow.slots_per_epoch = slots;
    }
    OutflowLimiter::validate(&next.outflow)?;

    if let Some(oracle) = &fields.oracle {
        if oracle.max_confidence_bps > BPS_SCALE || oracle.max_depeg_bps > BPS_SCALE {
            return Err(ControllerError::InvalidOracleParams);
        }
        next.oracle = oracle.clone();
    }
    if let Some(authority) = fields.authority {
        next.authority = authority;
    }

    bump_version(&mut next)?;
    Ok(next)
}

/// Create the depository record for a new venue
pub fn register_venue(
    controller: &ControllerState,
    existing: Option<&DepositoryState>,
    params: &RegisterVenueParams,
) -> LedgerResult<DepositoryState> {
    require_not_frozen(controller)?;
    if existing.is_some() {
        return Err(ControllerError::VenueAlreadyRegistered);
    }
    if params.collateral_decimals != controller.redeemable_decimals {
        return Err(ControllerError::InvalidCollateralDecimals);
    }
    if params.kind.uses_shares() != params.venue.is_some() {
        return Err(ControllerError::InvalidVenueParams);
    }
    Ok(DepositoryState {
        kind: params.kind,
        collateral_token: params.collateral_token,
        collateral_decimals: params.collateral_decimals,
        venue: params.venue,
        collateral_amount_deposited: U128::zero(),
        redeemable_amount_under_management: U128::zero(),
        redeemable_amount_under_management_cap: params.redeemable_amount_under_management_cap,
        minting_fee_bps: params.minting_fee_bps,
        redeeming_fee_bps: params.redeeming_fee_bps,
        minting_disabled: false,
        minting_fee_total_accrued: U128::zero(),
        redeeming_fee_total_accrued: U128::zero(),
        profits_total_collected: U128::zero(),
        profits_beneficiary: params.profits_beneficiary,
        shares_held: 0,
        withdraw_request_go_live: 0,
        withdraw_request_amount: 0,
        reserved: reserved_space(),
    })
}

/// Apply the supplied depository fields; omitted fields keep their value.
///
/// A cap below the current amount under management is accepted; it only
/// blocks further mints into the venue.
pub fn edit_venue(
    controller: &ControllerState,
    depository: &DepositoryState,
    fields: &EditVenueFields,
) -> LedgerResult<DepositoryState> {
    require_not_frozen(controller)?;
    let mut next = depository.clone();
    if let Some(cap) = fields.redeemable_amount_under_management_cap {
        next.redeemable_amount_under_management_cap = cap;
    }
    if let Some(bps) = fields.minting_fee_bps {
        next.minting_fee_bps = bps;
    }
    if let Some(bps) = fields.redeeming_fee_bps {
        next.redeeming_fee_bps = bps;
    }
    if let Some(disabled) = fields.minting_disabled {
        next.minting_disabled = disabled;
    }
    if let Some(beneficiary) = fields.profits_beneficiary {
        next.profits_beneficiary = beneficiary;
    }
    Ok(next)
}

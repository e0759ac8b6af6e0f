//! Withdraw epoch coordination for the pooled-credit venue.
//!
//! The pool publishes a [`WithdrawEpoch`]; its phase is always derived from
//! the current block time and never stored. Moving value out of the pool
//! takes two permissionless calls in two different phases:
//!
//! - `create_withdraw_request` (request phase) asks the pool to set aside
//!   the overflow above target plus the unrealized profit
//! - `redeem_withdraw_request` (redeem phase) pulls that collateral back,
//!   books the overflow into direct custody and pays profits out
//!
//! Either call is a no-op when there is nothing to do, and skipping a phase
//! only delays rebalancing to the next epoch.

use odra::prelude::*;
use odra::casper_types::U128;

use crate::errors::{ControllerError, LedgerResult};
use crate::ledger::{DepositoryDelta, LedgerCommit, WithdrawRequestUpdate};
use crate::math;
use crate::rebalance;
use crate::types::{ControllerState, DepositoryState, VenueKind, WithdrawEpoch};
use crate::venue::{PooledCredit, VenueAdapter};

#[odra::odra_type]
#[derive(Copy)]
pub enum Phase {
    Inactive,
    Request,
    Redeem,
    LiquidityAvailable,
}

/// Phase of `epoch` at block time `now`
pub fn phase(now: u64, epoch: &WithdrawEpoch) -> LedgerResult<Phase> {
    if now < epoch.go_live {
        return Ok(Phase::Inactive);
    }
    let request_end = epoch
        .go_live
        .checked_add(epoch.request_seconds)
        .ok_or(ControllerError::MathOverflow)?;
    let redeem_end = request_end
        .checked_add(epoch.redeem_seconds)
        .ok_or(ControllerError::MathOverflow)?;
    let liquidity_end = redeem_end
        .checked_add(epoch.available_liquidity_seconds)
        .ok_or(ControllerError::MathOverflow)?;

    Ok(if now < request_end {
        Phase::Request
    } else if now < redeem_end {
        Phase::Redeem
    } else if now < liquidity_end {
        Phase::LiquidityAvailable
    } else {
        Phase::Inactive
    })
}

/// Collateral the pooled-credit depository should hand back this epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawableValue {
    /// Liability held above the venue's weight target
    pub overflow_value: u64,
    /// Owned share value above the liability, floored at zero
    pub profits_collateral_amount: u64,
}

impl WithdrawableValue {
    pub fn total(&self) -> LedgerResult<u64> {
        self.overflow_value
            .checked_add(self.profits_collateral_amount)
            .ok_or(ControllerError::MathOverflow)
    }
}

pub fn withdrawable_value(
    controller: &ControllerState,
    depository: &DepositoryState,
    venue: &PooledCredit,
) -> LedgerResult<WithdrawableValue> {
    let managed = depository.redeemable_amount_under_management;
    let target = rebalance::target_amount(
        controller.redeemable_circulating_supply,
        controller.venue_weights.get(VenueKind::PooledCredit),
    )?;
    let overflow_value = math::to_u64(math::positive_difference(managed, target))?;
    let owned = U128::from(venue.owned_value(depository)?);
    let profits_collateral_amount = math::to_u64(math::positive_difference(owned, managed))?;
    Ok(WithdrawableValue {
        overflow_value,
        profits_collateral_amount,
    })
}

/// Request to submit to the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawRequestPlan {
    pub expected_version: u64,
    pub go_live: u64,
    pub value: WithdrawableValue,
    pub amount: u64,
}

impl WithdrawRequestPlan {
    /// Record the submitted request on the depository
    pub fn commit(&self) -> LedgerCommit {
        let mut commit = LedgerCommit::new(self.expected_version);
        let mut delta = DepositoryDelta::new(VenueKind::PooledCredit);
        delta.withdraw_request = Some(WithdrawRequestUpdate {
            go_live: self.go_live,
            amount: self.amount,
        });
        commit.depositories.push(delta);
        commit
    }
}

/// `None` when nothing needs withdrawing or the epoch already has a request
pub fn plan_create_withdraw_request(
    controller: &ControllerState,
    depository: &DepositoryState,
    venue: &PooledCredit,
    now: u64,
) -> LedgerResult<Option<WithdrawRequestPlan>> {
    if controller.is_frozen {
        return Err(ControllerError::ProgramFrozen);
    }
    if phase(now, &venue.epoch)? != Phase::Request {
        return Err(ControllerError::InvalidWithdrawEpochRequestPhase);
    }
    if depository.withdraw_request_go_live == venue.epoch.go_live
        && depository.withdraw_request_amount > 0
    {
        return Ok(None);
    }

    let value = withdrawable_value(controller, depository, venue)?;
    let amount = value.total()?;
    if amount == 0 {
        return Ok(None);
    }
    Ok(Some(WithdrawRequestPlan {
        expected_version: controller.version,
        go_live: venue.epoch.go_live,
        value,
        amount,
    }))
}

/// Redemption to pull from the pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemWithdrawPlan {
    pub expected_version: u64,
    pub go_live: u64,
    pub value: WithdrawableValue,
    /// Collateral to redeem from the pool
    pub amount: u64,
    /// Request left on the depository before this redemption
    pub requested: u64,
    pub shares_held: u64,
    pub beneficiary: Address,
}

/// Split of the collateral actually received from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedeemedSplit {
    pub overflow_collateral_amount: u64,
    pub profits_collateral_amount: u64,
    pub surplus: u64,
}

impl RedeemWithdrawPlan {
    /// Profits are paid first; the rest, up to the overflow, moves to direct
    /// custody; anything beyond is rounding surplus.
    pub fn split(&self, received: u64) -> RedeemedSplit {
        let profits_collateral_amount = received.min(self.value.profits_collateral_amount);
        let remaining = received - profits_collateral_amount;
        let overflow_collateral_amount = remaining.min(self.value.overflow_value);
        RedeemedSplit {
            overflow_collateral_amount,
            profits_collateral_amount,
            surplus: remaining - overflow_collateral_amount,
        }
    }

    /// Build the commit from what the pool paid and the shares it burned.
    ///
    /// `shares_burned` is the drop in the controller's pool balance across
    /// the redeem call; shares sent to the controller by others do not count.
    pub fn settle(&self, received: u64, shares_burned: u64) -> LedgerResult<LedgerCommit> {
        if shares_burned > self.shares_held {
            return Err(ControllerError::VenueSharesMismatch);
        }
        let split = self.split(received);

        let mut commit = LedgerCommit::new(self.expected_version);
        commit.controller.profits_collected = split.profits_collateral_amount;
        commit.controller.rounding_surplus = split.surplus;

        let mut pooled = DepositoryDelta::new(VenueKind::PooledCredit);
        pooled.collateral_decrease = split.overflow_collateral_amount;
        pooled.managed_decrease = split.overflow_collateral_amount;
        pooled.profits_collected = split.profits_collateral_amount;
        pooled.shares_decrease = shares_burned;
        pooled.withdraw_request = Some(WithdrawRequestUpdate {
            go_live: self.go_live,
            amount: self.requested.saturating_sub(received),
        });
        commit.depositories.push(pooled);

        if split.overflow_collateral_amount > 0 {
            let mut direct = DepositoryDelta::new(VenueKind::DirectCustody);
            direct.collateral_increase = split.overflow_collateral_amount;
            direct.managed_increase = split.overflow_collateral_amount;
            commit.depositories.push(direct);
        }
        Ok(commit)
    }
}

/// `None` when the live epoch has no outstanding request or nothing is left
/// to withdraw.
///
/// Without a direct-custody depository only profits are redeemed.
pub fn plan_redeem_withdraw_request(
    controller: &ControllerState,
    depository: &DepositoryState,
    direct_custody: Option<&DepositoryState>,
    venue: &PooledCredit,
    now: u64,
) -> LedgerResult<Option<RedeemWithdrawPlan>> {
    if controller.is_frozen {
        return Err(ControllerError::ProgramFrozen);
    }
    if phase(now, &venue.epoch)? != Phase::Redeem {
        return Err(ControllerError::InvalidWithdrawEpochRedeemPhase);
    }
    if depository.withdraw_request_go_live != venue.epoch.go_live
        || depository.withdraw_request_amount == 0
    {
        return Ok(None);
    }

    let mut value = withdrawable_value(controller, depository, venue)?;
    if direct_custody.is_none() {
        value.overflow_value = 0;
    }
    let amount = value.total()?.min(depository.withdraw_request_amount);
    if amount == 0 {
        return Ok(None);
    }
    Ok(Some(RedeemWithdrawPlan {
        expected_version: controller.version,
        go_live: venue.epoch.go_live,
        value,
        amount,
        requested: depository.withdraw_request_amount,
        shares_held: depository.shares_held,
        beneficiary: depository.profits_beneficiary,
    }))
}

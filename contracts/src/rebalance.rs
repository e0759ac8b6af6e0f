//! Allocation targets and venue selection.

use odra::prelude::*;
use odra::casper_types::U128;

use crate::errors::{ControllerError, LedgerResult};
use crate::math;
use crate::types::{ControllerState, DepositoryState, VenueKind};

/// Actual versus target allocation of one venue
#[odra::odra_type]
pub struct VenueAllocation {
    pub kind: VenueKind,
    pub target: U128,
    /// Redeemable amount under management
    pub current: U128,
    pub overflow: U128,
    pub underflow: U128,
}

/// `supply * weight_bps / 10000`
pub fn target_amount(redeemable_circulating_supply: U128, weight_bps: u32) -> LedgerResult<U128> {
    math::bps_of(redeemable_circulating_supply, weight_bps)
}

/// Allocation of every registered venue, in venue-kind order
pub fn allocations(
    controller: &ControllerState,
    depositories: &[DepositoryState],
) -> LedgerResult<Vec<VenueAllocation>> {
    let mut registered: Vec<&DepositoryState> = depositories.iter().collect();
    registered.sort_by_key(|d| d.kind);

    registered
        .into_iter()
        .map(|depository| {
            let target = target_amount(
                controller.redeemable_circulating_supply,
                controller.venue_weights.get(depository.kind),
            )?;
            let current = depository.redeemable_amount_under_management;
            Ok(VenueAllocation {
                kind: depository.kind,
                target,
                current,
                overflow: math::positive_difference(current, target),
                underflow: math::positive_difference(target, current),
            })
        })
        .collect()
}

fn pick<F>(allocations: &[VenueAllocation], key: F) -> Option<VenueKind>
where
    F: Fn(&VenueAllocation) -> U128,
{
    // first venue wins ties
    allocations
        .iter()
        .fold(None::<&VenueAllocation>, |best, candidate| match best {
            Some(b) if key(b) >= key(candidate) => Some(b),
            _ => Some(candidate),
        })
        .map(|a| a.kind)
}

/// Venue for a mint when the caller does not choose one: the mint-enabled
/// venue furthest below target that still has cap room for the amount.
pub fn select_mint_venue(
    controller: &ControllerState,
    depositories: &[DepositoryState],
    collateral_amount: u64,
) -> LedgerResult<VenueKind> {
    let eligible = depositories
        .iter()
        .filter(|d| !d.minting_disabled)
        .filter(|d| {
            math::add_u64(d.redeemable_amount_under_management, collateral_amount)
                .map(|managed| managed <= d.redeemable_amount_under_management_cap)
                .unwrap_or(false)
        })
        .cloned()
        .collect::<Vec<_>>();
    let allocations = allocations(controller, &eligible)?;
    pick(&allocations, |a| a.underflow).ok_or(ControllerError::NoEligibleVenue)
}

/// Venue for a redemption when the caller does not choose one: the venue
/// furthest above target that can cover the amount.
pub fn select_redeem_venue(
    controller: &ControllerState,
    depositories: &[DepositoryState],
    redeemable_amount: u64,
) -> LedgerResult<VenueKind> {
    let eligible = depositories
        .iter()
        .filter(|d| d.redeemable_amount_under_management >= U128::from(redeemable_amount))
        .cloned()
        .collect::<Vec<_>>();
    let allocations = allocations(controller, &eligible)?;
    pick(&allocations, |a| a.overflow).ok_or(ControllerError::NoEligibleVenue)
}

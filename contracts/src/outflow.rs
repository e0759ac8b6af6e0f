//! Per-epoch redemption outflow limiter.
//!
//! The window is quantized to `slots_per_epoch` block-time units and resets
//! fully once elapsed; it never decays.

use odra::casper_types::U128;

use crate::errors::{ControllerError, LedgerResult};
use crate::math;
use crate::types::{OutflowLimit, BPS_SCALE};

/// Pure limiter over a copy of the stored outflow state
pub struct OutflowLimiter {
    state: OutflowLimit,
}

impl OutflowLimiter {
    pub fn new(state: OutflowLimit) -> Self {
        Self { state }
    }

    pub fn validate(limit: &OutflowLimit) -> LedgerResult<()> {
        if limit.slots_per_epoch == 0 || limit.outflow_limit_per_epoch_bps > BPS_SCALE {
            return Err(ControllerError::InvalidOutflowLimit);
        }
        Ok(())
    }

    /// Effective cap for the current window:
    /// `min(outflow_limit_per_epoch_amount, supply * outflow_limit_per_epoch_bps / 10000)`
    pub fn epoch_limit(&self, redeemable_circulating_supply: U128) -> LedgerResult<u64> {
        let relative = math::bps_of(
            redeemable_circulating_supply,
            self.state.outflow_limit_per_epoch_bps,
        )?;
        let relative = if relative > U128::from(u64::MAX) {
            u64::MAX
        } else {
            relative.low_u64()
        };
        Ok(self.state.outflow_limit_per_epoch_amount.min(relative))
    }

    /// Outflow already consumed in the window that contains `current_slot`
    pub fn current_outflow(&self, current_slot: u64) -> u64 {
        if self.window_elapsed(current_slot) {
            0
        } else {
            self.state.epoch_outflow_amount
        }
    }

    /// Account `collateral_amount` against the window and return the updated state.
    ///
    /// `redeemable_circulating_supply` is the supply before the redemption.
    pub fn check_and_record(
        self,
        redeemable_circulating_supply: U128,
        collateral_amount: u64,
        current_slot: u64,
    ) -> LedgerResult<OutflowLimit> {
        let limit = self.epoch_limit(redeemable_circulating_supply)?;
        let mut next = self.state;
        if self.window_elapsed(current_slot) {
            next.epoch_outflow_amount = 0;
            next.last_outflow_slot = current_slot;
        }

        let outflow = next
            .epoch_outflow_amount
            .checked_add(collateral_amount)
            .ok_or(ControllerError::MathOverflow)?;
        if outflow > limit {
            return Err(ControllerError::MaximumOutflowAmountError);
        }
        next.epoch_outflow_amount = outflow;
        Ok(next)
    }

    fn window_elapsed(&self, current_slot: u64) -> bool {
        current_slot.saturating_sub(self.state.last_outflow_slot) >= self.state.slots_per_epoch
    }
}

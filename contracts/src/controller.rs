//! Controller contract: the protocol entry point.
//!
//! Each entry point loads the records it needs, plans through the pure
//! ledger core, performs the venue and token calls, then commits all record
//! changes at once. Records are re-read right before the commit so a venue
//! that re-enters the controller is caught by the version check.

use odra::prelude::*;
use odra::casper_types::{U128, U256};

use crate::errors::{ControllerError, LedgerResult};
use crate::events::{
    ControllerEdited, FreezeToggled, Minted, ProfitsCollected, Redeemed, VenueEdited,
    VenueRegistered, WithdrawRequestCreated, WithdrawRequestRedeemed,
};
use crate::interfaces::{
    Cep18Calls, EditControllerFields, EditVenueFields, PooledCreditCalls, RedeemableCalls,
    RegisterVenueParams, YieldVaultCalls,
};
use crate::ledger::{self, LedgerCommit};
use crate::math;
use crate::oracle;
use crate::outflow::OutflowLimiter;
use crate::rebalance::{self, VenueAllocation};
use crate::types::{ControllerState, DepositoryState, OutflowLimit, VenueKind, VenueWeights};
use crate::venue::{Venue, VenueSnapshot};
use crate::withdraw_epoch::{self, Phase};

#[odra::module(events = [
    Minted,
    Redeemed,
    ProfitsCollected,
    WithdrawRequestCreated,
    WithdrawRequestRedeemed,
    FreezeToggled,
    ControllerEdited,
    VenueRegistered,
    VenueEdited
])]
pub struct Controller {
    state: Var<ControllerState>,
    depositories: Mapping<VenueKind, DepositoryState>,
}

#[odra::module]
impl Controller {
    /// Initialize the controller; the caller becomes the authority
    pub fn init(
        &mut self,
        redeemable_token: Address,
        redeemable_decimals: u8,
        redeemable_global_supply_cap: U128,
        venue_weights: VenueWeights,
        outflow_limit_per_epoch_amount: u64,
        outflow_limit_per_epoch_bps: u32,
        slots_per_epoch: u64,
    ) {
        let outflow = OutflowLimit {
            outflow_limit_per_epoch_amount,
            outflow_limit_per_epoch_bps,
            slots_per_epoch,
            epoch_outflow_amount: 0,
            last_outflow_slot: self.env().get_block_time(),
        };
        let state = self.ok(ledger::initialize_controller(
            self.env().caller(),
            redeemable_token,
            redeemable_decimals,
            redeemable_global_supply_cap,
            venue_weights,
            outflow,
        ));
        self.state.set(state);
    }

    // ========== Authority ==========

    pub fn edit_controller(&mut self, fields: EditControllerFields) {
        let state = self.load_state();
        self.require_authority(&state);
        let next = self.ok(ledger::edit_controller(&state, &fields));
        self.env().emit_event(ControllerEdited {
            authority: next.authority,
            redeemable_global_supply_cap: next.redeemable_global_supply_cap,
            venue_weights: next.venue_weights,
        });
        self.state.set(next);
    }

    pub fn set_venue_weights(&mut self, weights: VenueWeights) {
        let state = self.load_state();
        self.require_authority(&state);
        let next = self.ok(ledger::set_venue_weights(&state, weights));
        self.env().emit_event(ControllerEdited {
            authority: next.authority,
            redeemable_global_supply_cap: next.redeemable_global_supply_cap,
            venue_weights: next.venue_weights,
        });
        self.state.set(next);
    }

    pub fn register_venue(&mut self, params: RegisterVenueParams) {
        let state = self.load_state();
        self.require_authority(&state);
        let existing = self.depositories.get(&params.kind);
        let depository = self.ok(ledger::register_venue(&state, existing.as_ref(), &params));
        self.env().emit_event(VenueRegistered {
            venue: depository.kind,
            collateral_token: depository.collateral_token,
            venue_address: depository.venue,
        });
        let kind = depository.kind;
        self.depositories.set(&kind, depository);
    }

    pub fn edit_venue(&mut self, kind: VenueKind, fields: EditVenueFields) {
        let state = self.load_state();
        self.require_authority(&state);
        let depository = self.load_depository(kind);
        let next = self.ok(ledger::edit_venue(&state, &depository, &fields));
        self.env().emit_event(VenueEdited {
            venue: kind,
            redeemable_amount_under_management_cap: next.redeemable_amount_under_management_cap,
            minting_fee_bps: next.minting_fee_bps,
            redeeming_fee_bps: next.redeeming_fee_bps,
            minting_disabled: next.minting_disabled,
        });
        self.depositories.set(&kind, next);
    }

    /// Freeze or resume every mutating entry point
    pub fn freeze(&mut self, frozen: bool) {
        let state = self.load_state();
        self.require_authority(&state);
        let next = self.ok(ledger::set_frozen(&state, frozen));
        self.state.set(next);
        self.env().emit_event(FreezeToggled { is_frozen: frozen });
    }

    // ========== User ==========

    /// Deposit collateral into a venue and receive redeemable units.
    ///
    /// With no venue given, the venue furthest below its weight target is used.
    /// Returns the redeemable amount minted.
    pub fn mint(&mut self, venue: Option<VenueKind>, collateral_amount: U256) -> U256 {
        let state = self.load_state();
        self.require_not_frozen(&state);
        let amount = self.ok(math::u256_to_u64(collateral_amount));
        let kind = match venue {
            Some(kind) => kind,
            None => self.ok(rebalance::select_mint_venue(
                &state,
                &self.registered_depositories(),
                amount,
            )),
        };
        let depository = self.load_depository(kind);
        self.guard_price(&state, &depository);
        let resolved = self.resolve_venue(&depository);
        let plan = self.ok(ledger::plan_mint(&state, &depository, &resolved, amount));

        let env = self.env();
        let user = env.caller();
        Cep18Calls::transfer_from(&env, depository.collateral_token, user, env.self_address(), amount);
        let shares_received = self.venue_deposit(&depository, amount);

        let commit = self.ok(plan.settle(shares_received));
        self.apply_commit(&commit);

        let redeemable_amount = plan.quote.redeemable_amount;
        RedeemableCalls::mint(&env, state.redeemable_token, user, redeemable_amount);
        env.emit_event(Minted {
            user,
            venue: kind,
            collateral_amount: amount,
            redeemable_amount,
            minting_fee: plan.quote.minting_fee,
        });
        U256::from(redeemable_amount)
    }

    /// Burn redeemable units and receive collateral from a venue.
    ///
    /// With no venue given, the venue furthest above its weight target is used.
    /// Returns the collateral amount paid out.
    pub fn redeem(&mut self, venue: Option<VenueKind>, redeemable_amount: U256) -> U256 {
        let state = self.load_state();
        self.require_not_frozen(&state);
        let amount = self.ok(math::u256_to_u64(redeemable_amount));
        let kind = match venue {
            Some(kind) => kind,
            None => self.ok(rebalance::select_redeem_venue(
                &state,
                &self.registered_depositories(),
                amount,
            )),
        };
        let depository = self.load_depository(kind);
        self.guard_price(&state, &depository);
        let resolved = self.resolve_venue(&depository);

        let env = self.env();
        let user = env.caller();
        let balance = RedeemableCalls::balance_of(&env, state.redeemable_token, user);
        let plan = self.ok(ledger::plan_redeem(
            &state,
            &depository,
            &resolved,
            amount,
            math::u256_to_u64_saturating(balance),
            env.get_block_time(),
        ));

        RedeemableCalls::burn_from(&env, state.redeemable_token, user, amount);
        let received = self.venue_withdraw(
            &depository,
            plan.quote.shares_to_burn,
            plan.quote.collateral_amount,
        );
        let commit = self.ok(plan.settle(received));
        self.apply_commit(&commit);

        let collateral_amount = plan.quote.collateral_amount;
        Cep18Calls::transfer(&env, depository.collateral_token, user, collateral_amount);
        env.emit_event(Redeemed {
            user,
            venue: kind,
            redeemable_amount: amount,
            collateral_amount,
            redeeming_fee: plan.quote.redeeming_fee,
            epoch_outflow_amount: plan.outflow.epoch_outflow_amount,
        });
        U256::from(collateral_amount)
    }

    // ========== Permissionless ==========

    /// Realize a venue's value above its liability to the profits beneficiary.
    ///
    /// Returns the collateral paid out, zero when there is nothing to collect.
    pub fn collect_profits(&mut self, kind: VenueKind) -> U256 {
        let state = self.load_state();
        let depository = self.load_depository(kind);
        let resolved = self.resolve_venue(&depository);
        let plan = match self.ok(ledger::plan_collect_profits(&state, &depository, &resolved)) {
            Some(plan) => plan,
            None => return U256::zero(),
        };

        let profits = plan.quote.profits_collateral_amount;
        let received = self.venue_withdraw(&depository, plan.quote.shares_to_burn, profits);
        let commit = self.ok(plan.settle(received));
        self.apply_commit(&commit);

        let env = self.env();
        Cep18Calls::transfer(&env, depository.collateral_token, plan.beneficiary, profits);
        env.emit_event(ProfitsCollected {
            venue: kind,
            beneficiary: plan.beneficiary,
            profits_collateral_amount: profits,
        });
        U256::from(profits)
    }

    /// Ask the pooled-credit venue to set aside overflow and profits.
    ///
    /// Only valid in the request phase; a no-op when nothing is due.
    pub fn create_withdraw_request(&mut self) {
        let state = self.load_state();
        let depository = self.load_depository(VenueKind::PooledCredit);
        let resolved = self.resolve_venue(&depository);
        let pooled = self.ok(resolved.as_pooled_credit());
        let env = self.env();
        let plan = match self.ok(withdraw_epoch::plan_create_withdraw_request(
            &state,
            &depository,
            pooled,
            env.get_block_time(),
        )) {
            Some(plan) => plan,
            None => return,
        };

        PooledCreditCalls::create_withdraw_request(&env, pooled.venue, plan.amount);
        self.apply_commit(&plan.commit());
        env.emit_event(WithdrawRequestCreated {
            go_live: plan.go_live,
            overflow_value: plan.value.overflow_value,
            profits_collateral_amount: plan.value.profits_collateral_amount,
            amount: plan.amount,
        });
    }

    /// Pull the requested collateral back from the pooled-credit venue.
    ///
    /// Only valid in the redeem phase; a no-op without a request for the
    /// live epoch.
    pub fn redeem_withdraw_request(&mut self) {
        let state = self.load_state();
        let depository = self.load_depository(VenueKind::PooledCredit);
        let direct_custody = self.depositories.get(&VenueKind::DirectCustody);
        let resolved = self.resolve_venue(&depository);
        let pooled = self.ok(resolved.as_pooled_credit());
        let env = self.env();
        let plan = match self.ok(withdraw_epoch::plan_redeem_withdraw_request(
            &state,
            &depository,
            direct_custody.as_ref(),
            pooled,
            env.get_block_time(),
        )) {
            Some(plan) => plan,
            None => return,
        };

        let shares_before = PooledCreditCalls::balance_of(&env, pooled.venue, env.self_address());
        let received = self.ok(math::u256_to_u64(PooledCreditCalls::redeem_withdraw_request(
            &env,
            pooled.venue,
            plan.amount,
        )));
        let shares_after = PooledCreditCalls::balance_of(&env, pooled.venue, env.self_address());
        let shares_burned = match shares_before.checked_sub(shares_after) {
            Some(burned) => self.ok(math::u256_to_u64(burned)),
            None => env.revert(ControllerError::VenueSharesMismatch),
        };
        let commit = self.ok(plan.settle(received, shares_burned));
        self.apply_commit(&commit);

        let split = plan.split(received);
        if split.profits_collateral_amount > 0 {
            Cep18Calls::transfer(
                &env,
                depository.collateral_token,
                plan.beneficiary,
                split.profits_collateral_amount,
            );
        }
        env.emit_event(WithdrawRequestRedeemed {
            go_live: plan.go_live,
            collateral_received: received,
            overflow_collateral_amount: split.overflow_collateral_amount,
            profits_collateral_amount: split.profits_collateral_amount,
        });
    }

    // ========== Views ==========

    pub fn get_state(&self) -> ControllerState {
        self.load_state()
    }

    pub fn get_depository(&self, kind: VenueKind) -> Option<DepositoryState> {
        self.depositories.get(&kind)
    }

    /// Current phase of the pooled-credit withdraw epoch
    pub fn get_withdraw_phase(&self) -> Phase {
        let depository = self.load_depository(VenueKind::PooledCredit);
        let resolved = self.resolve_venue(&depository);
        let pooled = self.ok(resolved.as_pooled_credit());
        self.ok(withdraw_epoch::phase(self.env().get_block_time(), &pooled.epoch))
    }

    pub fn get_allocations(&self) -> Vec<VenueAllocation> {
        let state = self.load_state();
        self.ok(rebalance::allocations(&state, &self.registered_depositories()))
    }

    /// Collateral redeemed in the current outflow window
    pub fn get_epoch_outflow_amount(&self) -> u64 {
        let state = self.load_state();
        OutflowLimiter::new(state.outflow).current_outflow(self.env().get_block_time())
    }
}

impl Controller {
    fn ok<T>(&self, result: LedgerResult<T>) -> T {
        match result {
            Ok(value) => value,
            Err(error) => self.env().revert(error),
        }
    }

    fn load_state(&self) -> ControllerState {
        match self.state.get() {
            Some(state) => state,
            None => self.env().revert(ControllerError::NotInitialized),
        }
    }

    fn load_depository(&self, kind: VenueKind) -> DepositoryState {
        match self.depositories.get(&kind) {
            Some(depository) => depository,
            None => self.env().revert(ControllerError::VenueNotRegistered),
        }
    }

    fn registered_depositories(&self) -> Vec<DepositoryState> {
        VenueKind::ALL
            .iter()
            .filter_map(|kind| self.depositories.get(kind))
            .collect()
    }

    fn require_authority(&self, state: &ControllerState) {
        if self.env().caller() != state.authority {
            self.env().revert(ControllerError::Unauthorized);
        }
    }

    fn require_not_frozen(&self, state: &ControllerState) {
        if state.is_frozen {
            self.env().revert(ControllerError::ProgramFrozen);
        }
    }

    fn guard_price(&self, state: &ControllerState, depository: &DepositoryState) {
        if let Some(oracle_address) = state.oracle.oracle {
            let env = self.env();
            let price = oracle::fetch_price(&env, oracle_address, depository.collateral_token);
            self.ok(oracle::check_price(&price, &state.oracle, env.get_block_time()));
        }
    }

    /// Read the external venue state recorded for `depository`
    fn resolve_venue(&self, depository: &DepositoryState) -> Venue {
        let env = self.env();
        let snapshot = match (depository.kind, depository.venue) {
            (VenueKind::DirectCustody, _) => VenueSnapshot::DirectCustody,
            (VenueKind::YieldVault, Some(venue)) => VenueSnapshot::YieldVault {
                venue,
                state: YieldVaultCalls::vault_state(&env, venue),
            },
            (VenueKind::PooledCredit, Some(venue)) => VenueSnapshot::PooledCredit {
                venue,
                pool: PooledCreditCalls::pool_state(&env, venue),
                epoch: PooledCreditCalls::withdraw_epoch(&env, venue),
            },
            (_, None) => env.revert(ControllerError::InvalidVenueAccount),
        };
        self.ok(Venue::resolve(depository, snapshot))
    }

    /// Move collateral held by the controller into the venue; returns shares issued
    fn venue_deposit(&self, depository: &DepositoryState, amount: u64) -> u64 {
        let env = self.env();
        let shares = match (depository.kind, depository.venue) {
            (VenueKind::YieldVault, Some(venue)) => {
                Cep18Calls::approve(&env, depository.collateral_token, venue, amount);
                YieldVaultCalls::deposit(&env, venue, amount)
            }
            (VenueKind::PooledCredit, Some(venue)) => {
                Cep18Calls::approve(&env, depository.collateral_token, venue, amount);
                PooledCreditCalls::deposit(&env, venue, amount)
            }
            _ => U256::zero(),
        };
        self.ok(math::u256_to_u64(shares))
    }

    /// Burn venue shares for collateral; returns collateral received.
    ///
    /// Direct custody already holds the collateral and returns `amount`.
    fn venue_withdraw(&self, depository: &DepositoryState, shares: u64, amount: u64) -> u64 {
        let env = self.env();
        let received = match (depository.kind, depository.venue) {
            (VenueKind::YieldVault, Some(venue)) => YieldVaultCalls::withdraw(&env, venue, shares),
            (VenueKind::PooledCredit, Some(venue)) => PooledCreditCalls::withdraw(&env, venue, shares),
            _ => U256::from(amount),
        };
        self.ok(math::u256_to_u64(received))
    }

    fn apply_commit(&mut self, commit: &LedgerCommit) {
        let state = self.load_state();
        let current: Vec<DepositoryState> = commit
            .depositories
            .iter()
            .filter_map(|delta| self.depositories.get(&delta.kind))
            .collect();
        let (next, touched) = self.ok(commit.apply(&state, &current));
        self.state.set(next);
        for depository in touched {
            let kind = depository.kind;
            self.depositories.set(&kind, depository);
        }
    }
}

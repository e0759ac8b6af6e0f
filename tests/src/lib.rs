//! Stable Router Integration Tests
//!
//! Scenario tests over the ledger core plus end-to-end runs on the Odra VM.


#[cfg(test)]
mod fixtures {
    use odra::casper_types::account::AccountHash;
    use odra::casper_types::U128;
    use odra::prelude::*;
    use stable_router_contracts::errors::LedgerResult;
    use stable_router_contracts::interfaces::RegisterVenueParams;
    use stable_router_contracts::ledger::{self, LedgerCommit};
    use stable_router_contracts::types::*;

    pub const DECIMALS: u8 = 6;
    pub const ONE: u64 = 1_000_000;

    pub fn address(byte: u8) -> Address {
        Address::Account(AccountHash::new([byte; 32]))
    }

    pub fn weights() -> VenueWeights {
        VenueWeights {
            direct_custody_bps: 5_000,
            yield_vault_bps: 2_500,
            pooled_credit_bps: 2_500,
        }
    }

    pub fn outflow(amount: u64, slots_per_epoch: u64) -> OutflowLimit {
        OutflowLimit {
            outflow_limit_per_epoch_amount: amount,
            outflow_limit_per_epoch_bps: 10_000,
            slots_per_epoch,
            epoch_outflow_amount: 0,
            last_outflow_slot: 0,
        }
    }

    pub fn controller() -> ControllerState {
        ledger::initialize_controller(
            address(1),
            address(2),
            DECIMALS,
            U128::from(1_000 * ONE),
            weights(),
            outflow(1_000 * ONE, 100),
        )
        .unwrap()
    }

    pub fn register_params(kind: VenueKind) -> RegisterVenueParams {
        RegisterVenueParams {
            kind,
            collateral_token: address(3),
            collateral_decimals: DECIMALS,
            venue: match kind {
                VenueKind::DirectCustody => None,
                VenueKind::YieldVault => Some(address(4)),
                VenueKind::PooledCredit => Some(address(5)),
            },
            redeemable_amount_under_management_cap: U128::from(500 * ONE),
            minting_fee_bps: 0,
            redeeming_fee_bps: 0,
            profits_beneficiary: address(9),
        }
    }

    pub fn register(controller: &ControllerState, kind: VenueKind) -> DepositoryState {
        ledger::register_venue(controller, None, &register_params(kind)).unwrap()
    }

    /// In-memory stand-in for the controller's stored records
    pub struct Book {
        pub controller: ControllerState,
        pub depositories: Vec<DepositoryState>,
    }

    impl Book {
        pub fn new(kinds: &[VenueKind]) -> Self {
            let controller = controller();
            let depositories = kinds.iter().map(|kind| register(&controller, *kind)).collect();
            Self {
                controller,
                depositories,
            }
        }

        pub fn depository(&self, kind: VenueKind) -> DepositoryState {
            self.depositories
                .iter()
                .find(|d| d.kind == kind)
                .cloned()
                .unwrap()
        }

        pub fn apply(&mut self, commit: LedgerResult<LedgerCommit>) {
            let (next, touched) = commit
                .unwrap()
                .apply(&self.controller, &self.depositories)
                .unwrap();
            self.controller = next;
            for depository in touched {
                let slot = self
                    .depositories
                    .iter_mut()
                    .find(|d| d.kind == depository.kind)
                    .unwrap();
                *slot = depository;
            }
        }

        pub fn total_under_management(&self) -> U128 {
            self.depositories
                .iter()
                .fold(U128::zero(), |acc, d| acc + d.redeemable_amount_under_management)
        }
    }
}

#[cfg(test)]
mod tests {
    use stable_router_contracts::types::*;

    #[test]
    fn test_venue_kind_ordering() {
        assert!(VenueKind::DirectCustody < VenueKind::YieldVault);
        assert!(VenueKind::YieldVault < VenueKind::PooledCredit);
    }

    #[test]
    fn test_only_external_venues_use_shares() {
        assert!(!VenueKind::DirectCustody.uses_shares());
        assert!(VenueKind::YieldVault.uses_shares());
        assert!(VenueKind::PooledCredit.uses_shares());
    }

    #[test]
    fn test_weights_must_sum_to_full_scale() {
        let mut weights = super::fixtures::weights();
        assert!(weights.is_valid());
        weights.pooled_credit_bps = 2_499;
        assert!(!weights.is_valid());
        weights.pooled_credit_bps = 2_501;
        assert!(!weights.is_valid());
    }
}

#[cfg(test)]
mod ledger_scenario_tests {
    use super::fixtures::*;
    use odra::casper_types::U128;
    use pretty_assertions::assert_eq;
    use stable_router_contracts::errors::ControllerError;
    use stable_router_contracts::interfaces::EditControllerFields;
    use stable_router_contracts::ledger;
    use stable_router_contracts::types::*;
    use stable_router_contracts::venue::{Venue, VenueSnapshot};

    fn direct(book: &Book) -> Venue {
        Venue::resolve(&book.depository(VenueKind::DirectCustody), VenueSnapshot::DirectCustody).unwrap()
    }

    fn vault(book: &Book, state: YieldVaultState) -> Venue {
        Venue::resolve(
            &book.depository(VenueKind::YieldVault),
            VenueSnapshot::YieldVault {
                venue: address(4),
                state,
            },
        )
        .unwrap()
    }

    fn mint(book: &mut Book, kind: VenueKind, venue: &Venue, amount: u64, shares: u64) -> u64 {
        let plan = ledger::plan_mint(&book.controller, &book.depository(kind), venue, amount).unwrap();
        book.apply(plan.settle(shares));
        plan.quote.redeemable_amount
    }

    fn redeem(book: &mut Book, kind: VenueKind, venue: &Venue, amount: u64, slot: u64) -> u64 {
        let plan = ledger::plan_redeem(
            &book.controller,
            &book.depository(kind),
            venue,
            amount,
            amount,
            slot,
        )
        .unwrap();
        let paid = plan.quote.collateral_amount;
        book.apply(plan.settle(paid));
        paid
    }

    #[test]
    fn test_round_trip_of_one_unit_without_fees() {
        let mut book = Book::new(&[VenueKind::DirectCustody]);
        let venue = direct(&book);

        let minted = mint(&mut book, VenueKind::DirectCustody, &venue, ONE, 0);
        assert_eq!(minted, ONE);
        assert_eq!(book.controller.redeemable_circulating_supply, U128::from(ONE));

        let paid = redeem(&mut book, VenueKind::DirectCustody, &venue, ONE, 1);
        assert_eq!(paid, ONE);
        assert_eq!(book.controller.redeemable_circulating_supply, U128::zero());

        let depository = book.depository(VenueKind::DirectCustody);
        assert_eq!(depository.collateral_amount_deposited, U128::zero());
        assert_eq!(depository.redeemable_amount_under_management, U128::zero());
        assert_eq!(book.controller.version, 2);
    }

    #[test]
    fn test_supply_matches_sum_under_management_across_venues() {
        let mut book = Book::new(&[VenueKind::DirectCustody, VenueKind::YieldVault]);
        let mut vault_state = YieldVaultState::default();

        let steps: [(VenueKind, bool, u64); 6] = [
            (VenueKind::DirectCustody, true, 3 * ONE),
            (VenueKind::YieldVault, true, 2 * ONE),
            (VenueKind::DirectCustody, false, ONE),
            (VenueKind::YieldVault, true, 500_000),
            (VenueKind::YieldVault, false, 1_200_000),
            (VenueKind::DirectCustody, true, 250_000),
        ];

        for (slot, (kind, is_mint, amount)) in steps.iter().enumerate() {
            let venue = match kind {
                VenueKind::YieldVault => vault(&book, vault_state),
                _ => direct(&book),
            };
            if *is_mint {
                let shares = if *kind == VenueKind::YieldVault { *amount } else { 0 };
                mint(&mut book, *kind, &venue, *amount, shares);
                if *kind == VenueKind::YieldVault {
                    vault_state.total_shares += shares;
                    vault_state.total_assets += amount;
                }
            } else {
                let paid = redeem(&mut book, *kind, &venue, *amount, slot as u64);
                if *kind == VenueKind::YieldVault {
                    vault_state.total_shares -= paid;
                    vault_state.total_assets -= paid;
                }
            }
            assert_eq!(
                book.controller.redeemable_circulating_supply,
                book.total_under_management()
            );
            for depository in &book.depositories {
                assert!(
                    depository.redeemable_amount_under_management
                        <= depository.redeemable_amount_under_management_cap
                );
            }
        }

        assert_eq!(book.controller.redeemable_circulating_supply, U128::from(3_550_000u64));
        assert_eq!(book.depository(VenueKind::YieldVault).shares_held, 1_300_000);
    }

    #[test]
    fn test_fees_accrue_and_leave_collateral_above_liability() {
        let mut book = Book::new(&[VenueKind::DirectCustody]);
        book.depositories[0].minting_fee_bps = 10;
        book.depositories[0].redeeming_fee_bps = 20;
        let venue = direct(&book);

        let minted = mint(&mut book, VenueKind::DirectCustody, &venue, ONE, 0);
        assert_eq!(minted, 999_000);

        let paid = redeem(&mut book, VenueKind::DirectCustody, &venue, minted, 1);
        // 999_000 * 20 / 10000 = 1_998
        assert_eq!(paid, 997_002);

        let depository = book.depository(VenueKind::DirectCustody);
        assert_eq!(depository.minting_fee_total_accrued, U128::from(1_000u64));
        assert_eq!(depository.redeeming_fee_total_accrued, U128::from(1_998u64));
        assert_eq!(depository.collateral_amount_deposited, U128::from(2_998u64));
        assert_eq!(depository.redeemable_amount_under_management, U128::zero());
    }

    #[test]
    fn test_yield_vault_profits_collected_without_touching_liability() {
        let mut book = Book::new(&[VenueKind::YieldVault]);
        let empty = vault(&book, YieldVaultState::default());
        mint(&mut book, VenueKind::YieldVault, &empty, 1_000, 1_000);

        // vault gained 5%
        let grown = vault(
            &book,
            YieldVaultState {
                total_shares: 1_000,
                total_assets: 1_050,
            },
        );
        let plan = ledger::plan_collect_profits(
            &book.controller,
            &book.depository(VenueKind::YieldVault),
            &grown,
        )
        .unwrap()
        .unwrap();
        assert_eq!(plan.quote.profits_collateral_amount, 50);
        assert_eq!(plan.quote.shares_to_burn, 48);
        assert_eq!(plan.beneficiary, address(9));

        book.apply(plan.settle(50));
        let depository = book.depository(VenueKind::YieldVault);
        assert_eq!(depository.redeemable_amount_under_management, U128::from(1_000u64));
        assert_eq!(depository.profits_total_collected, U128::from(50u64));
        assert_eq!(depository.shares_held, 952);
        assert_eq!(book.controller.profits_total_collected, U128::from(50u64));
    }

    #[test]
    fn test_vault_loss_yields_no_profits() {
        let mut book = Book::new(&[VenueKind::YieldVault]);
        let empty = vault(&book, YieldVaultState::default());
        mint(&mut book, VenueKind::YieldVault, &empty, 1_000, 1_000);

        let shrunk = vault(
            &book,
            YieldVaultState {
                total_shares: 1_000,
                total_assets: 900,
            },
        );
        let plan = ledger::plan_collect_profits(
            &book.controller,
            &book.depository(VenueKind::YieldVault),
            &shrunk,
        )
        .unwrap();
        assert_eq!(plan, None);
    }

    #[test]
    fn test_vault_short_payout_is_rejected() {
        let mut book = Book::new(&[VenueKind::YieldVault]);
        let empty = vault(&book, YieldVaultState::default());
        mint(&mut book, VenueKind::YieldVault, &empty, 1_000, 1_000);

        let venue = vault(
            &book,
            YieldVaultState {
                total_shares: 1_000,
                total_assets: 1_000,
            },
        );
        let plan = ledger::plan_redeem(
            &book.controller,
            &book.depository(VenueKind::YieldVault),
            &venue,
            500,
            500,
            1,
        )
        .unwrap();
        assert_eq!(plan.settle(499), Err(ControllerError::VenueCollateralMismatch));
    }

    #[test]
    fn test_stale_plan_cannot_commit() {
        let mut book = Book::new(&[VenueKind::DirectCustody]);
        let venue = direct(&book);
        let first = ledger::plan_mint(
            &book.controller,
            &book.depository(VenueKind::DirectCustody),
            &venue,
            ONE,
        )
        .unwrap();
        let second = first.clone();

        book.apply(first.settle(0));
        let result = second
            .settle(0)
            .unwrap()
            .apply(&book.controller, &book.depositories);
        assert_eq!(result, Err(ControllerError::StaleStateVersion));
    }

    #[test]
    fn test_frozen_controller_blocks_mint_and_redeem() {
        let mut book = Book::new(&[VenueKind::DirectCustody]);
        let venue = direct(&book);
        mint(&mut book, VenueKind::DirectCustody, &venue, ONE, 0);
        book.controller = ledger::set_frozen(&book.controller, true).unwrap();

        let depository = book.depository(VenueKind::DirectCustody);
        assert_eq!(
            ledger::plan_mint(&book.controller, &depository, &venue, ONE),
            Err(ControllerError::ProgramFrozen)
        );
        assert_eq!(
            ledger::plan_redeem(&book.controller, &depository, &venue, ONE, ONE, 1).map(|_| ()),
            Err(ControllerError::ProgramFrozen)
        );
        assert_eq!(
            ledger::set_frozen(&book.controller, true),
            Err(ControllerError::ProgramAlreadyFrozenOrResumed)
        );
    }

    #[test]
    fn test_global_cap_cannot_drop_below_supply() {
        let mut book = Book::new(&[VenueKind::DirectCustody]);
        let venue = direct(&book);
        mint(&mut book, VenueKind::DirectCustody, &venue, 10 * ONE, 0);

        let fields = EditControllerFields {
            redeemable_global_supply_cap: Some(U128::from(9 * ONE)),
            ..Default::default()
        };
        assert_eq!(
            ledger::edit_controller(&book.controller, &fields),
            Err(ControllerError::InvalidRedeemableGlobalSupplyCap)
        );

        let fields = EditControllerFields {
            redeemable_global_supply_cap: Some(U128::from(10 * ONE)),
            ..Default::default()
        };
        let next = ledger::edit_controller(&book.controller, &fields).unwrap();
        assert_eq!(next.redeemable_global_supply_cap, U128::from(10 * ONE));
    }

    #[test]
    fn test_rejected_weights_leave_state_unchanged() {
        let book = Book::new(&[VenueKind::DirectCustody]);
        let bad = VenueWeights {
            direct_custody_bps: 6_000,
            yield_vault_bps: 2_500,
            pooled_credit_bps: 2_500,
        };
        assert_eq!(
            ledger::set_venue_weights(&book.controller, bad),
            Err(ControllerError::InvalidDepositoriesWeightBps)
        );
        assert_eq!(book.controller.venue_weights, weights());
    }
}

#[cfg(test)]
mod outflow_tests {
    use super::fixtures::*;
    use odra::casper_types::U128;
    use stable_router_contracts::errors::ControllerError;
    use stable_router_contracts::outflow::OutflowLimiter;

    #[test]
    fn test_outflow_boundary_and_reset() {
        let supply = U128::from(1_000_000u64);
        let limit = outflow(1_000, 100);

        let state = OutflowLimiter::new(limit)
            .check_and_record(supply, 1_000, 10)
            .unwrap();
        assert_eq!(state.epoch_outflow_amount, 1_000);

        assert_eq!(
            OutflowLimiter::new(state).check_and_record(supply, 1, 99),
            Err(ControllerError::MaximumOutflowAmountError)
        );

        let reset = OutflowLimiter::new(state)
            .check_and_record(supply, 1_000, 110)
            .unwrap();
        assert_eq!(reset.epoch_outflow_amount, 1_000);
        assert_eq!(reset.last_outflow_slot, 110);
    }

    #[test]
    fn test_single_redemption_above_limit_fails() {
        assert_eq!(
            OutflowLimiter::new(outflow(1_000, 100)).check_and_record(U128::from(1_000_000u64), 1_001, 1),
            Err(ControllerError::MaximumOutflowAmountError)
        );
    }

    #[test]
    fn test_relative_limit_tracks_supply() {
        let mut limit = outflow(1_000_000, 100);
        limit.outflow_limit_per_epoch_bps = 1_000;
        let limiter = OutflowLimiter::new(limit);
        // 10% of 50_000
        assert_eq!(limiter.epoch_limit(U128::from(50_000u64)), Ok(5_000));
    }
}

#[cfg(test)]
mod withdraw_epoch_tests {
    use super::fixtures::*;
    use odra::casper_types::U128;
    use pretty_assertions::assert_eq;
    use stable_router_contracts::errors::ControllerError;
    use stable_router_contracts::types::*;
    use stable_router_contracts::venue::PooledCredit;
    use stable_router_contracts::withdraw_epoch::*;

    fn epoch() -> WithdrawEpoch {
        WithdrawEpoch {
            go_live: 1_000,
            request_seconds: 100,
            redeem_seconds: 100,
            available_liquidity_seconds: 100,
        }
    }

    /// Pool of 1_100 value for 1_000 shares, all held by the depository
    fn pool() -> PooledCredit {
        PooledCredit::new(
            address(5),
            PooledCreditPoolState {
                liquidity: 600,
                outstanding_credit: 500,
                locked_liquidity: 0,
                total_shares: 1_000,
                total_redeemed: 0,
            },
            epoch(),
        )
        .unwrap()
    }

    fn records() -> (ControllerState, DepositoryState, DepositoryState) {
        let mut controller = controller();
        controller.redeemable_circulating_supply = U128::from(2_000u64);
        let direct = register(&controller, VenueKind::DirectCustody);
        let mut pooled = register(&controller, VenueKind::PooledCredit);
        // target is 25% of 2_000 = 500, so 500 overflow
        pooled.redeemable_amount_under_management = U128::from(1_000u64);
        pooled.collateral_amount_deposited = U128::from(1_000u64);
        pooled.shares_held = 1_000;
        (controller, direct, pooled)
    }

    #[test]
    fn test_phase_boundaries() {
        let epoch = epoch();
        assert_eq!(phase(999, &epoch), Ok(Phase::Inactive));
        assert_eq!(phase(1_000, &epoch), Ok(Phase::Request));
        assert_eq!(phase(1_099, &epoch), Ok(Phase::Request));
        assert_eq!(phase(1_100, &epoch), Ok(Phase::Redeem));
        assert_eq!(phase(1_200, &epoch), Ok(Phase::LiquidityAvailable));
        assert_eq!(phase(1_300, &epoch), Ok(Phase::Inactive));
    }

    #[test]
    fn test_request_only_in_request_phase() {
        let (controller, _, pooled) = records();
        assert_eq!(
            plan_create_withdraw_request(&controller, &pooled, &pool(), 999),
            Err(ControllerError::InvalidWithdrawEpochRequestPhase)
        );
        let plan = plan_create_withdraw_request(&controller, &pooled, &pool(), 1_000)
            .unwrap()
            .unwrap();
        assert_eq!(plan.value.overflow_value, 500);
        assert_eq!(plan.value.profits_collateral_amount, 100);
        assert_eq!(plan.amount, 600);
        assert_eq!(plan.go_live, 1_000);
    }

    #[test]
    fn test_redeem_during_request_window_fails() {
        let (controller, direct, mut pooled) = records();
        pooled.withdraw_request_go_live = 1_000;
        pooled.withdraw_request_amount = 600;
        assert_eq!(
            plan_redeem_withdraw_request(&controller, &pooled, Some(&direct), &pool(), 1_050),
            Err(ControllerError::InvalidWithdrawEpochRedeemPhase)
        );
    }

    #[test]
    fn test_second_request_in_same_epoch_is_noop() {
        let (controller, _, mut pooled) = records();
        pooled.withdraw_request_go_live = 1_000;
        pooled.withdraw_request_amount = 600;
        assert_eq!(
            plan_create_withdraw_request(&controller, &pooled, &pool(), 1_010),
            Ok(None)
        );
    }

    #[test]
    fn test_redeem_moves_overflow_to_direct_custody_and_pays_profits() {
        let (controller, direct, mut pooled) = records();
        pooled.withdraw_request_go_live = 1_000;
        pooled.withdraw_request_amount = 600;

        let plan = plan_redeem_withdraw_request(&controller, &pooled, Some(&direct), &pool(), 1_150)
            .unwrap()
            .unwrap();
        assert_eq!(plan.amount, 600);

        let split = plan.split(600);
        assert_eq!(split.profits_collateral_amount, 100);
        assert_eq!(split.overflow_collateral_amount, 500);
        assert_eq!(split.surplus, 0);

        // 600 of 1_100 value burns 545.45.. shares
        let commit = plan.settle(600, 545).unwrap();
        let (next, touched) = commit.apply(&controller, &[direct, pooled]).unwrap();
        assert_eq!(next.redeemable_circulating_supply, U128::from(2_000u64));
        assert_eq!(next.profits_total_collected, U128::from(100u64));

        let pooled = &touched[0];
        assert_eq!(pooled.redeemable_amount_under_management, U128::from(500u64));
        assert_eq!(pooled.shares_held, 455);
        assert_eq!(pooled.withdraw_request_amount, 0);
        let direct = &touched[1];
        assert_eq!(direct.kind, VenueKind::DirectCustody);
        assert_eq!(direct.redeemable_amount_under_management, U128::from(500u64));
        assert_eq!(direct.collateral_amount_deposited, U128::from(500u64));
    }

    #[test]
    fn test_redeem_without_direct_custody_only_takes_profits() {
        let (controller, _, mut pooled) = records();
        pooled.withdraw_request_go_live = 1_000;
        pooled.withdraw_request_amount = 600;
        let plan = plan_redeem_withdraw_request(&controller, &pooled, None, &pool(), 1_150)
            .unwrap()
            .unwrap();
        assert_eq!(plan.amount, 100);
        assert_eq!(plan.value.overflow_value, 0);
    }
}

#[cfg(test)]
mod rebalance_tests {
    use super::fixtures::*;
    use odra::casper_types::U128;
    use stable_router_contracts::errors::ControllerError;
    use stable_router_contracts::rebalance::*;
    use stable_router_contracts::types::*;

    #[test]
    fn test_mint_goes_to_most_underweight_venue() {
        let mut controller = controller();
        controller.redeemable_circulating_supply = U128::from(1_000u64);
        let mut direct = register(&controller, VenueKind::DirectCustody);
        direct.redeemable_amount_under_management = U128::from(900u64);
        let mut vault = register(&controller, VenueKind::YieldVault);
        vault.redeemable_amount_under_management = U128::from(100u64);
        let pooled = register(&controller, VenueKind::PooledCredit);

        let depositories = [direct, vault, pooled];
        assert_eq!(
            select_mint_venue(&controller, &depositories, 100),
            Ok(VenueKind::PooledCredit)
        );
        assert_eq!(
            select_redeem_venue(&controller, &depositories, 100),
            Ok(VenueKind::DirectCustody)
        );

        let total_target = allocations(&controller, &depositories)
            .unwrap()
            .iter()
            .fold(U128::zero(), |acc, a| acc + a.target);
        assert_eq!(total_target, U128::from(1_000u64));
    }

    #[test]
    fn test_no_eligible_venue() {
        let controller = controller();
        let mut direct = register(&controller, VenueKind::DirectCustody);
        direct.minting_disabled = true;
        assert_eq!(
            select_mint_venue(&controller, &[direct], 1),
            Err(ControllerError::NoEligibleVenue)
        );
    }
}

#[cfg(test)]
mod call_def_tests {
    use odra::casper_types::{runtime_args, RuntimeArgs, U256};
    use odra::CallDef;

    // The venue and token helpers build these exact call definitions; the
    // entry point names are the external contract surface.

    #[test]
    fn test_venue_state_reads_are_immutable() {
        for entry_point in ["vault_state", "pool_state", "withdraw_epoch", "balance_of"] {
            let call_def = CallDef::new(entry_point, false, RuntimeArgs::new());
            assert_eq!(call_def.entry_point(), entry_point);
            assert!(!call_def.is_mut());
        }
    }

    #[test]
    fn test_token_calls_are_mutable() {
        let account = super::fixtures::address(7);
        let args = runtime_args! {
            "owner" => account,
            "recipient" => account,
            "amount" => U256::from(1_000u64)
        };
        let call_def = CallDef::new("transfer_from", true, args);
        assert_eq!(call_def.entry_point(), "transfer_from");
        assert!(call_def.is_mut());

        let args = runtime_args! {
            "from" => account,
            "amount" => U256::from(500u64)
        };
        let call_def = CallDef::new("burn_from", true, args);
        assert_eq!(call_def.entry_point(), "burn_from");
        assert!(call_def.is_mut());
    }
}

#[cfg(test)]
mod vm_tests {
    use odra::casper_types::{U128, U256};
    use odra::host::{Deployer, HostEnv, HostRef};
    use odra::prelude::*;
    use pretty_assertions::assert_eq;
    use stable_router_contracts::controller::{Controller, ControllerHostRef, ControllerInitArgs};
    use stable_router_contracts::errors::ControllerError;
    use stable_router_contracts::interfaces::{EditVenueFields, RegisterVenueParams};
    use stable_router_contracts::redeemable::{
        RedeemableToken, RedeemableTokenHostRef, RedeemableTokenInitArgs,
    };
    use stable_router_contracts::types::*;
    use stable_router_contracts::withdraw_epoch::Phase;

    use crate::mock_venues::{
        MockCreditPool, MockCreditPoolHostRef, MockCreditPoolInitArgs, MockYieldVault,
        MockYieldVaultHostRef, MockYieldVaultInitArgs,
    };

    const ONE: u64 = 1_000_000;

    struct Deployment {
        env: HostEnv,
        collateral: RedeemableTokenHostRef,
        redeemable: RedeemableTokenHostRef,
        controller: ControllerHostRef,
        user: Address,
    }

    fn token(env: &HostEnv, name: &str, symbol: &str) -> RedeemableTokenHostRef {
        RedeemableToken::deploy(
            env,
            RedeemableTokenInitArgs {
                name: name.to_string(),
                symbol: symbol.to_string(),
                decimals: 6,
            },
        )
    }

    /// Admin is account 0, the user is account 1 holding 100 collateral units
    fn setup() -> Deployment {
        let env = odra_test::env();
        let admin = env.get_account(0);
        let user = env.get_account(1);

        let mut collateral = token(&env, "Test Dollar", "TUSD");
        collateral.set_controller(admin);
        collateral.mint(user, U256::from(100 * ONE));

        let mut redeemable = token(&env, "Router Dollar", "RUSD");
        let mut controller = Controller::deploy(
            &env,
            ControllerInitArgs {
                redeemable_token: redeemable.address().clone(),
                redeemable_decimals: 6,
                redeemable_global_supply_cap: U128::from(1_000 * ONE),
                venue_weights: VenueWeights {
                    direct_custody_bps: 10_000,
                    yield_vault_bps: 0,
                    pooled_credit_bps: 0,
                },
                outflow_limit_per_epoch_amount: 50 * ONE,
                outflow_limit_per_epoch_bps: 10_000,
                slots_per_epoch: 3_600_000,
            },
        );
        redeemable.set_controller(controller.address().clone());

        controller.register_venue(RegisterVenueParams {
            kind: VenueKind::DirectCustody,
            collateral_token: collateral.address().clone(),
            collateral_decimals: 6,
            venue: None,
            redeemable_amount_under_management_cap: U128::from(500 * ONE),
            minting_fee_bps: 0,
            redeeming_fee_bps: 0,
            profits_beneficiary: admin,
        });

        env.set_caller(user);
        collateral.approve(controller.address().clone(), U256::from(100 * ONE));
        env.set_caller(admin);

        Deployment {
            env,
            collateral,
            redeemable,
            controller,
            user,
        }
    }

    #[test]
    fn test_mint_and_redeem_through_direct_custody() {
        let mut d = setup();
        d.env.set_caller(d.user);

        let minted = d.controller.mint(Some(VenueKind::DirectCustody), U256::from(10 * ONE));
        assert_eq!(minted, U256::from(10 * ONE));
        assert_eq!(d.redeemable.balance_of(d.user), U256::from(10 * ONE));
        assert_eq!(d.collateral.balance_of(d.user), U256::from(90 * ONE));
        assert_eq!(
            d.collateral.balance_of(d.controller.address().clone()),
            U256::from(10 * ONE)
        );
        assert!(d.env.emitted(&d.controller, "Minted"));

        let paid = d.controller.redeem(None, U256::from(4 * ONE));
        assert_eq!(paid, U256::from(4 * ONE));
        assert_eq!(d.redeemable.balance_of(d.user), U256::from(6 * ONE));
        assert_eq!(d.redeemable.total_supply(), U256::from(6 * ONE));
        assert_eq!(d.collateral.balance_of(d.user), U256::from(94 * ONE));
        assert!(d.env.emitted(&d.controller, "Redeemed"));

        let state = d.controller.get_state();
        assert_eq!(state.redeemable_circulating_supply, U128::from(6 * ONE));
        assert_eq!(state.version, 2);
        assert_eq!(d.controller.get_epoch_outflow_amount(), 4 * ONE);

        let depository = d.controller.get_depository(VenueKind::DirectCustody).unwrap();
        assert_eq!(depository.redeemable_amount_under_management, U128::from(6 * ONE));
        assert_eq!(depository.collateral_amount_deposited, U128::from(6 * ONE));
    }

    #[test]
    fn test_redeem_above_outflow_limit_reverts() {
        let mut d = setup();
        d.env.set_caller(d.user);
        d.controller.mint(Some(VenueKind::DirectCustody), U256::from(60 * ONE));

        let result = d.controller.try_redeem(None, U256::from(51 * ONE));
        assert_eq!(result, Err(ControllerError::MaximumOutflowAmountError.into()));
        assert_eq!(d.redeemable.balance_of(d.user), U256::from(60 * ONE));
    }

    #[test]
    fn test_freeze_blocks_mint_and_cannot_repeat() {
        let mut d = setup();
        d.controller.freeze(true);
        assert_eq!(
            d.controller.try_freeze(true),
            Err(ControllerError::ProgramAlreadyFrozenOrResumed.into())
        );

        d.env.set_caller(d.user);
        assert_eq!(
            d.controller.try_mint(Some(VenueKind::DirectCustody), U256::from(ONE)),
            Err(ControllerError::ProgramFrozen.into())
        );
        assert_eq!(d.collateral.balance_of(d.user), U256::from(100 * ONE));

        d.env.set_caller(d.env.get_account(0));
        d.controller.freeze(false);
        d.env.set_caller(d.user);
        assert!(d
            .controller
            .try_mint(Some(VenueKind::DirectCustody), U256::from(ONE))
            .is_ok());
    }

    #[test]
    fn test_authority_only_entry_points() {
        let mut d = setup();
        d.env.set_caller(d.user);
        assert_eq!(
            d.controller.try_freeze(true),
            Err(ControllerError::Unauthorized.into())
        );
        assert_eq!(
            d.controller
                .try_edit_venue(VenueKind::DirectCustody, EditVenueFields::default()),
            Err(ControllerError::Unauthorized.into())
        );
        assert!(d
            .redeemable
            .try_mint(d.user, U256::from(ONE))
            .is_err());
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let mut d = setup();
        let result = d.controller.try_set_venue_weights(VenueWeights {
            direct_custody_bps: 5_000,
            yield_vault_bps: 2_500,
            pooled_credit_bps: 2_000,
        });
        assert_eq!(result, Err(ControllerError::InvalidDepositoriesWeightBps.into()));
        assert_eq!(d.controller.get_state().venue_weights.direct_custody_bps, 10_000);
    }

    #[test]
    fn test_minting_disabled_venue() {
        let mut d = setup();
        d.controller.edit_venue(
            VenueKind::DirectCustody,
            EditVenueFields {
                minting_disabled: Some(true),
                ..Default::default()
            },
        );
        d.env.set_caller(d.user);
        assert_eq!(
            d.controller.try_mint(Some(VenueKind::DirectCustody), U256::from(ONE)),
            Err(ControllerError::MintingDisabled.into())
        );
        assert_eq!(
            d.controller.try_mint(None, U256::from(ONE)),
            Err(ControllerError::NoEligibleVenue.into())
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut d = setup();
        let result = d.controller.try_register_venue(RegisterVenueParams {
            kind: VenueKind::DirectCustody,
            collateral_token: d.collateral.address().clone(),
            collateral_decimals: 6,
            venue: None,
            redeemable_amount_under_management_cap: U128::from(ONE),
            minting_fee_bps: 0,
            redeeming_fee_bps: 0,
            profits_beneficiary: d.user,
        });
        assert_eq!(result, Err(ControllerError::VenueAlreadyRegistered.into()));
    }

    #[test]
    fn test_outflow_limit_resets_after_window() {
        let mut d = setup();
        d.env.set_caller(d.user);
        d.controller.mint(Some(VenueKind::DirectCustody), U256::from(100 * ONE));

        d.controller.redeem(None, U256::from(50 * ONE));
        assert_eq!(d.controller.get_epoch_outflow_amount(), 50 * ONE);
        assert_eq!(
            d.controller.try_redeem(None, U256::from(1)),
            Err(ControllerError::MaximumOutflowAmountError.into())
        );

        d.env.advance_block_time(3_600_000);
        assert_eq!(d.controller.get_epoch_outflow_amount(), 0);
        let paid = d.controller.redeem(None, U256::from(50 * ONE));
        assert_eq!(paid, U256::from(50 * ONE));
        assert_eq!(d.controller.get_epoch_outflow_amount(), 50 * ONE);
        assert_eq!(d.redeemable.total_supply(), U256::zero());
        assert_eq!(d.collateral.balance_of(d.user), U256::from(100 * ONE));
    }

    #[test]
    fn test_token_mint_past_u256_max_reverts() {
        let d = setup();
        let mut edge = token(&d.env, "Edge Dollar", "EUSD");
        edge.set_controller(d.env.get_account(0));
        edge.mint(d.user, U256::MAX);

        assert_eq!(
            edge.try_mint(d.env.get_account(2), U256::one()),
            Err(ControllerError::MathOverflow.into())
        );
        assert_eq!(edge.total_supply(), U256::MAX);
        assert_eq!(edge.balance_of(d.env.get_account(2)), U256::zero());
    }

    struct Venues {
        vault: MockYieldVaultHostRef,
        pool: MockCreditPoolHostRef,
        go_live: u64,
    }

    /// `setup` plus a yield vault and a credit pool, weighted 50/25/25.
    /// Account 2 collects profits; the pool's request window opens 10s out.
    fn setup_with_venues() -> (Deployment, Venues) {
        let mut d = setup();
        let collateral = d.collateral.address().clone();
        let go_live = d.env.block_time() + 10_000;

        let vault = MockYieldVault::deploy(&d.env, MockYieldVaultInitArgs { collateral });
        let pool = MockCreditPool::deploy(
            &d.env,
            MockCreditPoolInitArgs {
                collateral,
                epoch: WithdrawEpoch {
                    go_live,
                    request_seconds: 1_000,
                    redeem_seconds: 1_000,
                    available_liquidity_seconds: 1_000,
                },
            },
        );

        d.controller.set_venue_weights(VenueWeights {
            direct_custody_bps: 5_000,
            yield_vault_bps: 2_500,
            pooled_credit_bps: 2_500,
        });
        for (kind, venue) in [
            (VenueKind::YieldVault, vault.address().clone()),
            (VenueKind::PooledCredit, pool.address().clone()),
        ] {
            d.controller.register_venue(RegisterVenueParams {
                kind,
                collateral_token: collateral,
                collateral_decimals: 6,
                venue: Some(venue),
                redeemable_amount_under_management_cap: U128::from(500 * ONE),
                minting_fee_bps: 0,
                redeeming_fee_bps: 0,
                profits_beneficiary: d.env.get_account(2),
            });
        }
        (d, Venues { vault, pool, go_live })
    }

    #[test]
    fn test_mint_and_redeem_through_yield_vault() {
        let (mut d, v) = setup_with_venues();
        let controller = d.controller.address().clone();
        d.env.set_caller(d.user);

        let minted = d.controller.mint(Some(VenueKind::YieldVault), U256::from(10 * ONE));
        assert_eq!(minted, U256::from(10 * ONE));
        assert_eq!(v.vault.balance_of(controller), U256::from(10 * ONE));
        assert_eq!(d.collateral.balance_of(v.vault.address().clone()), U256::from(10 * ONE));
        assert_eq!(d.collateral.balance_of(controller), U256::zero());

        let paid = d.controller.redeem(Some(VenueKind::YieldVault), U256::from(4 * ONE));
        assert_eq!(paid, U256::from(4 * ONE));
        assert_eq!(d.collateral.balance_of(d.user), U256::from(94 * ONE));
        assert_eq!(v.vault.vault_state().total_assets, 6 * ONE);

        let depository = d.controller.get_depository(VenueKind::YieldVault).unwrap();
        assert_eq!(depository.shares_held, 6 * ONE);
        assert_eq!(depository.redeemable_amount_under_management, U128::from(6 * ONE));
        assert_eq!(depository.collateral_amount_deposited, U128::from(6 * ONE));
    }

    #[test]
    fn test_collect_profits_pays_pool_gain_to_beneficiary() {
        let (mut d, mut v) = setup_with_venues();
        let beneficiary = d.env.get_account(2);
        d.env.set_caller(d.user);
        d.controller.mint(Some(VenueKind::PooledCredit), U256::from(1_000));

        // Pool earns 50 on 1000
        d.env.set_caller(d.env.get_account(0));
        d.collateral.mint(v.pool.address().clone(), U256::from(50));
        v.pool.accrue(50);

        d.env.set_caller(d.env.get_account(3));
        let collected = d.controller.collect_profits(VenueKind::PooledCredit);
        assert_eq!(collected, U256::from(50));
        assert_eq!(d.collateral.balance_of(beneficiary), U256::from(50));
        assert!(d.env.emitted(&d.controller, "ProfitsCollected"));

        let depository = d.controller.get_depository(VenueKind::PooledCredit).unwrap();
        assert_eq!(depository.redeemable_amount_under_management, U128::from(1_000));
        assert_eq!(depository.profits_total_collected, U128::from(50));
        assert_eq!(depository.shares_held, 952);
        assert_eq!(d.controller.get_state().profits_total_collected, U128::from(50));

        assert_eq!(d.controller.collect_profits(VenueKind::PooledCredit), U256::zero());
    }

    #[test]
    fn test_withdraw_request_follows_pool_phases() {
        let (mut d, v) = setup_with_venues();
        let controller = d.controller.address().clone();
        d.env.set_caller(d.user);
        d.controller.mint(Some(VenueKind::PooledCredit), U256::from(1_000));

        d.env.advance_block_time(v.go_live - 1 - d.env.block_time());
        assert_eq!(d.controller.get_withdraw_phase(), Phase::Inactive);
        assert_eq!(
            d.controller.try_create_withdraw_request(),
            Err(ControllerError::InvalidWithdrawEpochRequestPhase.into())
        );

        d.env.advance_block_time(1);
        d.controller.create_withdraw_request();
        assert!(d.env.emitted(&d.controller, "WithdrawRequestCreated"));
        let pooled = d.controller.get_depository(VenueKind::PooledCredit).unwrap();
        assert_eq!(pooled.withdraw_request_go_live, v.go_live);
        assert_eq!(pooled.withdraw_request_amount, 750);
        assert_eq!(
            d.controller.try_redeem_withdraw_request(),
            Err(ControllerError::InvalidWithdrawEpochRedeemPhase.into())
        );

        d.env.advance_block_time(1_000);
        d.controller.redeem_withdraw_request();
        assert!(d.env.emitted(&d.controller, "WithdrawRequestRedeemed"));

        let pooled = d.controller.get_depository(VenueKind::PooledCredit).unwrap();
        assert_eq!(pooled.redeemable_amount_under_management, U128::from(250));
        assert_eq!(pooled.shares_held, 250);
        assert_eq!(pooled.withdraw_request_amount, 0);
        let direct = d.controller.get_depository(VenueKind::DirectCustody).unwrap();
        assert_eq!(direct.redeemable_amount_under_management, U128::from(750));
        assert_eq!(d.collateral.balance_of(controller), U256::from(750));
        assert_eq!(v.pool.balance_of(controller), U256::from(250));
    }

    #[test]
    fn test_shares_sent_to_controller_do_not_block_withdraw_redeem() {
        let (mut d, mut v) = setup_with_venues();
        let controller = d.controller.address().clone();
        let donor = d.env.get_account(3);
        d.env.set_caller(d.user);
        d.controller.mint(Some(VenueKind::PooledCredit), U256::from(1_000));

        d.env.set_caller(d.env.get_account(0));
        d.collateral.mint(donor, U256::from(1_000));
        d.env.set_caller(donor);
        d.collateral.approve(v.pool.address().clone(), U256::from(1_000));
        v.pool.deposit(U256::from(1_000));
        v.pool.transfer_shares(controller, 1_000);
        assert_eq!(v.pool.balance_of(controller), U256::from(2_000));

        d.env.advance_block_time(v.go_live - d.env.block_time());
        d.controller.create_withdraw_request();
        d.env.advance_block_time(1_000);
        d.controller.redeem_withdraw_request();

        let pooled = d.controller.get_depository(VenueKind::PooledCredit).unwrap();
        assert_eq!(pooled.shares_held, 250);
        assert_eq!(pooled.redeemable_amount_under_management, U128::from(250));
        assert_eq!(v.pool.balance_of(controller), U256::from(1_250));
        let direct = d.controller.get_depository(VenueKind::DirectCustody).unwrap();
        assert_eq!(direct.redeemable_amount_under_management, U128::from(750));
    }
}

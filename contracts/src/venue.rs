//! Venue adapters.
//!
//! Each depository is backed by one of three venue kinds. The adapter turns
//! collateral into redeemable value (and back) using the venue's own price:
//!
//! - DirectCustody: 1:1, collateral stays with the controller
//! - YieldVault: LP redemption rate `total_assets / total_shares`
//! - PooledCredit: share value over `liquidity + outstanding_credit - locked_liquidity`
//!
//! Adapters are pure. The controller reads the external venue state into a
//! [`VenueSnapshot`], resolves it against the stored depository with
//! [`Venue::resolve`] and only then quotes.

use odra::prelude::*;
use odra::casper_types::U128;

use crate::errors::{ControllerError, LedgerResult};
use crate::math;
use crate::types::{
    ControllerState, DepositoryState, PooledCreditPoolState, VenueKind, WithdrawEpoch,
    YieldVaultState,
};

/// External venue state read right before quoting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueSnapshot {
    DirectCustody,
    YieldVault {
        venue: Address,
        state: YieldVaultState,
    },
    PooledCredit {
        venue: Address,
        pool: PooledCreditPoolState,
        epoch: WithdrawEpoch,
    },
}

impl VenueSnapshot {
    pub fn kind(&self) -> VenueKind {
        match self {
            VenueSnapshot::DirectCustody => VenueKind::DirectCustody,
            VenueSnapshot::YieldVault { .. } => VenueKind::YieldVault,
            VenueSnapshot::PooledCredit { .. } => VenueKind::PooledCredit,
        }
    }

    fn venue(&self) -> Option<Address> {
        match self {
            VenueSnapshot::DirectCustody => None,
            VenueSnapshot::YieldVault { venue, .. } => Some(*venue),
            VenueSnapshot::PooledCredit { venue, .. } => Some(*venue),
        }
    }
}

impl PooledCreditPoolState {
    /// Value backing the pool's shares
    pub fn total_value(&self) -> LedgerResult<u64> {
        self.liquidity
            .checked_add(self.outstanding_credit)
            .and_then(|v| v.checked_sub(self.locked_liquidity))
            .ok_or(ControllerError::MathOverflow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MintQuote {
    /// Redeemable minted to the user, net of fee
    pub redeemable_amount: u64,
    pub minting_fee: u64,
    /// Redeemable value of the deposit before fee
    pub collateral_value: u64,
    /// Minimum shares the venue must issue for the deposit
    pub shares_expected: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedeemQuote {
    /// Collateral paid out to the user
    pub collateral_amount: u64,
    pub redeeming_fee: u64,
    pub shares_to_burn: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfitsQuote {
    pub profits_collateral_amount: u64,
    pub shares_to_burn: u64,
}

impl ProfitsQuote {
    pub fn is_empty(&self) -> bool {
        self.profits_collateral_amount == 0
    }
}

/// Operation contract shared by every venue kind.
///
/// Implementors provide the venue price; quoting is shared.
pub trait VenueAdapter {
    fn kind(&self) -> VenueKind;

    /// Current collateral value of the depository's position
    fn owned_value(&self, depository: &DepositoryState) -> LedgerResult<u64>;

    /// Redeemable value of a deposit and the shares the venue issues for it
    fn deposit_value(&self, collateral_amount: u64) -> LedgerResult<(u64, u64)>;

    /// Shares to burn for a collateral withdrawal
    fn withdrawal_shares(&self, collateral_amount: u64) -> LedgerResult<u64>;

    fn quote_mint(
        &self,
        controller: &ControllerState,
        depository: &DepositoryState,
        collateral_amount: u64,
    ) -> LedgerResult<MintQuote> {
        if collateral_amount == 0 {
            return Err(ControllerError::InvalidCollateralAmount);
        }
        if depository.minting_disabled {
            return Err(ControllerError::MintingDisabled);
        }

        let (collateral_value, shares_expected) = self.deposit_value(collateral_amount)?;
        let (redeemable_amount, minting_fee) =
            math::compute_amount_less_fraction(collateral_value, depository.minting_fee_bps as u32)?;
        if redeemable_amount == 0 {
            return Err(ControllerError::InvalidCollateralAmount);
        }

        let managed = math::add_u64(depository.redeemable_amount_under_management, redeemable_amount)?;
        if managed > depository.redeemable_amount_under_management_cap {
            return Err(ControllerError::RedeemableAmountUnderManagementCapReached);
        }
        let supply = math::add_u64(controller.redeemable_circulating_supply, redeemable_amount)?;
        if supply > controller.redeemable_global_supply_cap {
            return Err(ControllerError::RedeemableGlobalSupplyCapReached);
        }

        Ok(MintQuote {
            redeemable_amount,
            minting_fee,
            collateral_value,
            shares_expected,
        })
    }

    fn quote_redeem(
        &self,
        depository: &DepositoryState,
        redeemable_amount: u64,
    ) -> LedgerResult<RedeemQuote> {
        if redeemable_amount == 0 {
            return Err(ControllerError::InvalidRedeemableAmount);
        }
        if depository.redeemable_amount_under_management < U128::from(redeemable_amount) {
            return Err(ControllerError::InsufficientRedeemableAmount);
        }

        let (collateral_amount, redeeming_fee) =
            math::compute_amount_less_fraction(redeemable_amount, depository.redeeming_fee_bps as u32)?;
        if depository.collateral_amount_deposited < U128::from(collateral_amount) {
            return Err(ControllerError::InsufficientCollateralDeposited);
        }

        let shares_to_burn = self.withdrawal_shares(collateral_amount)?;
        if shares_to_burn > depository.shares_held {
            return Err(ControllerError::InsufficientVenueShares);
        }

        Ok(RedeemQuote {
            collateral_amount,
            redeeming_fee,
            shares_to_burn,
        })
    }

    /// Realized value above the redeemable under management, floored at zero
    fn collect_profits(&self, depository: &DepositoryState) -> LedgerResult<ProfitsQuote> {
        let owned = U128::from(self.owned_value(depository)?);
        let profits = math::positive_difference(owned, depository.redeemable_amount_under_management);
        if profits.is_zero() {
            return Ok(ProfitsQuote::default());
        }
        let profits_collateral_amount = math::to_u64(profits)?;
        let shares_to_burn = self
            .withdrawal_shares(profits_collateral_amount)?
            .min(depository.shares_held);
        Ok(ProfitsQuote {
            profits_collateral_amount,
            shares_to_burn,
        })
    }
}

/// Collateral held directly by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectCustody;

impl VenueAdapter for DirectCustody {
    fn kind(&self) -> VenueKind {
        VenueKind::DirectCustody
    }

    fn owned_value(&self, depository: &DepositoryState) -> LedgerResult<u64> {
        math::to_u64(depository.collateral_amount_deposited)
    }

    fn deposit_value(&self, collateral_amount: u64) -> LedgerResult<(u64, u64)> {
        Ok((collateral_amount, 0))
    }

    fn withdrawal_shares(&self, _collateral_amount: u64) -> LedgerResult<u64> {
        Ok(0)
    }

    fn collect_profits(&self, _depository: &DepositoryState) -> LedgerResult<ProfitsQuote> {
        Ok(ProfitsQuote::default())
    }
}

/// Share accounting common to the vault and the credit pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharePool {
    pub total_shares: u64,
    pub total_value: u64,
}

impl SharePool {
    fn owned_value(&self, shares_held: u64) -> LedgerResult<u64> {
        if shares_held == 0 {
            return Ok(0);
        }
        math::share_value(shares_held, self.total_shares, self.total_value)
    }

    /// Value is measured on the post-deposit pool so the depositor cannot
    /// capture value that belongs to existing holders.
    fn deposit_value(&self, collateral_amount: u64) -> LedgerResult<(u64, u64)> {
        let shares = math::shares_for_deposit(collateral_amount, self.total_shares, self.total_value)?;
        if shares == 0 {
            return Ok((0, 0));
        }
        let supply_after = self
            .total_shares
            .checked_add(shares)
            .ok_or(ControllerError::MathOverflow)?;
        let value_after = self
            .total_value
            .checked_add(collateral_amount)
            .ok_or(ControllerError::MathOverflow)?;
        let value = math::share_value(shares, supply_after, value_after)?;
        Ok((value, shares))
    }

    fn withdrawal_shares(&self, collateral_amount: u64) -> LedgerResult<u64> {
        math::shares_for_withdrawal(collateral_amount, self.total_shares, self.total_value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldVault {
    pub venue: Address,
    pub pool: SharePool,
}

impl YieldVault {
    pub fn new(venue: Address, state: YieldVaultState) -> Self {
        Self {
            venue,
            pool: SharePool {
                total_shares: state.total_shares,
                total_value: state.total_assets,
            },
        }
    }
}

impl VenueAdapter for YieldVault {
    fn kind(&self) -> VenueKind {
        VenueKind::YieldVault
    }

    fn owned_value(&self, depository: &DepositoryState) -> LedgerResult<u64> {
        self.pool.owned_value(depository.shares_held)
    }

    fn deposit_value(&self, collateral_amount: u64) -> LedgerResult<(u64, u64)> {
        self.pool.deposit_value(collateral_amount)
    }

    fn withdrawal_shares(&self, collateral_amount: u64) -> LedgerResult<u64> {
        self.pool.withdrawal_shares(collateral_amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PooledCredit {
    pub venue: Address,
    pub pool: SharePool,
    pub state: PooledCreditPoolState,
    pub epoch: WithdrawEpoch,
}

impl PooledCredit {
    pub fn new(
        venue: Address,
        state: PooledCreditPoolState,
        epoch: WithdrawEpoch,
    ) -> LedgerResult<Self> {
        Ok(Self {
            venue,
            pool: SharePool {
                total_shares: state.total_shares,
                total_value: state.total_value()?,
            },
            state,
            epoch,
        })
    }
}

impl VenueAdapter for PooledCredit {
    fn kind(&self) -> VenueKind {
        VenueKind::PooledCredit
    }

    fn owned_value(&self, depository: &DepositoryState) -> LedgerResult<u64> {
        self.pool.owned_value(depository.shares_held)
    }

    fn deposit_value(&self, collateral_amount: u64) -> LedgerResult<(u64, u64)> {
        self.pool.deposit_value(collateral_amount)
    }

    fn withdrawal_shares(&self, collateral_amount: u64) -> LedgerResult<u64> {
        self.pool.withdrawal_shares(collateral_amount)
    }
}

/// Venue resolved from a depository's stored kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    DirectCustody(DirectCustody),
    YieldVault(YieldVault),
    PooledCredit(PooledCredit),
}

impl Venue {
    /// Bind a snapshot to the depository it is meant for.
    ///
    /// The snapshot kind must match the stored discriminant and its venue
    /// address must be the one recorded at registration.
    pub fn resolve(depository: &DepositoryState, snapshot: VenueSnapshot) -> LedgerResult<Self> {
        if snapshot.kind() != depository.kind || snapshot.venue() != depository.venue {
            return Err(ControllerError::InvalidVenueAccount);
        }
        match snapshot {
            VenueSnapshot::DirectCustody => Ok(Venue::DirectCustody(DirectCustody)),
            VenueSnapshot::YieldVault { venue, state } => {
                Ok(Venue::YieldVault(YieldVault::new(venue, state)))
            }
            VenueSnapshot::PooledCredit { venue, pool, epoch } => {
                Ok(Venue::PooledCredit(PooledCredit::new(venue, pool, epoch)?))
            }
        }
    }

    fn adapter(&self) -> &dyn VenueAdapter {
        match self {
            Venue::DirectCustody(venue) => venue,
            Venue::YieldVault(venue) => venue,
            Venue::PooledCredit(venue) => venue,
        }
    }

    pub fn as_pooled_credit(&self) -> LedgerResult<&PooledCredit> {
        match self {
            Venue::PooledCredit(venue) => Ok(venue),
            _ => Err(ControllerError::InvalidVenueAccount),
        }
    }
}

impl VenueAdapter for Venue {
    fn kind(&self) -> VenueKind {
        self.adapter().kind()
    }

    fn owned_value(&self, depository: &DepositoryState) -> LedgerResult<u64> {
        self.adapter().owned_value(depository)
    }

    fn deposit_value(&self, collateral_amount: u64) -> LedgerResult<(u64, u64)> {
        self.adapter().deposit_value(collateral_amount)
    }

    fn withdrawal_shares(&self, collateral_amount: u64) -> LedgerResult<u64> {
        self.adapter().withdrawal_shares(collateral_amount)
    }

    fn collect_profits(&self, depository: &DepositoryState) -> LedgerResult<ProfitsQuote> {
        self.adapter().collect_profits(depository)
    }
}

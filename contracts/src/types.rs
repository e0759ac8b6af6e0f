//! Common types used across the controller and its venues.

use odra::prelude::*;
use odra::casper_types::U128;

/// Basis points scale (100% = 10000 bps)
pub const BPS_SCALE: u32 = 10_000;

/// Zeroed bytes appended to every persisted record so fields can be added
/// without relocating existing records.
pub const RESERVED_BYTES: usize = 64;

pub(crate) fn reserved_space() -> Vec<u8> {
    vec![0u8; RESERVED_BYTES]
}

/// Venue kind discriminant, stored on each depository record
#[odra::odra_type]
#[derive(Copy, PartialOrd, Ord)]
pub enum VenueKind {
    /// Collateral held directly by the controller, 1:1 with redeemable
    DirectCustody,
    /// External vault issuing LP tokens with a redemption rate
    YieldVault,
    /// External credit pool issuing shares, withdrawn through epochs
    PooledCredit,
}

impl VenueKind {
    pub const ALL: [VenueKind; 3] = [
        VenueKind::DirectCustody,
        VenueKind::YieldVault,
        VenueKind::PooledCredit,
    ];

    /// Whether the venue accounts for its collateral in external shares
    pub fn uses_shares(&self) -> bool {
        !matches!(self, VenueKind::DirectCustody)
    }
}

/// Target allocation of the circulating supply across venues
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct VenueWeights {
    pub direct_custody_bps: u32,
    pub yield_vault_bps: u32,
    pub pooled_credit_bps: u32,
}

impl VenueWeights {
    pub fn get(&self, kind: VenueKind) -> u32 {
        match kind {
            VenueKind::DirectCustody => self.direct_custody_bps,
            VenueKind::YieldVault => self.yield_vault_bps,
            VenueKind::PooledCredit => self.pooled_credit_bps,
        }
    }

    pub fn total_bps(&self) -> u64 {
        self.direct_custody_bps as u64 + self.yield_vault_bps as u64 + self.pooled_credit_bps as u64
    }

    /// Weights are valid only when they sum to exactly 100%
    pub fn is_valid(&self) -> bool {
        self.total_bps() == BPS_SCALE as u64
    }
}

/// Per-epoch outflow limiter state
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct OutflowLimit {
    /// Hard cap on collateral redeemed per epoch
    pub outflow_limit_per_epoch_amount: u64,
    /// Cap on collateral redeemed per epoch, relative to circulating supply
    pub outflow_limit_per_epoch_bps: u32,
    /// Epoch length in block-time units
    pub slots_per_epoch: u64,
    /// Collateral redeemed in the current epoch
    pub epoch_outflow_amount: u64,
    /// Start of the current epoch window
    pub last_outflow_slot: u64,
}

/// Collateral price guard configuration
#[odra::odra_type]
#[derive(Default)]
pub struct OracleConfig {
    /// Price oracle contract, guard disabled when unset
    pub oracle: Option<Address>,
    /// Maximum age of a price in block-time units
    pub max_price_age: u64,
    /// Maximum confidence interval relative to price
    pub max_confidence_bps: u32,
    /// Maximum distance of the collateral price from 1.0
    pub max_depeg_bps: u32,
}

/// Controller singleton record
#[odra::odra_type]
pub struct ControllerState {
    /// Optimistic version, bumped by every committed mutation
    pub version: u64,
    /// Single key allowed to edit and freeze
    pub authority: Address,
    /// Redeemable token contract
    pub redeemable_token: Address,
    pub redeemable_decimals: u8,
    pub redeemable_global_supply_cap: U128,
    pub redeemable_circulating_supply: U128,
    pub venue_weights: VenueWeights,
    pub outflow: OutflowLimit,
    pub oracle: OracleConfig,
    /// When set, every mutation except unfreezing is rejected
    pub is_frozen: bool,
    pub profits_total_collected: U128,
    /// Collateral returned by venues above quoted amounts
    pub rounding_surplus_total: U128,
    pub reserved: Vec<u8>,
}

/// Per-venue depository record
#[odra::odra_type]
pub struct DepositoryState {
    pub kind: VenueKind,
    /// CEP-18 collateral token
    pub collateral_token: Address,
    pub collateral_decimals: u8,
    /// External venue contract, also the issuer of its LP/shares token
    pub venue: Option<Address>,
    pub collateral_amount_deposited: U128,
    pub redeemable_amount_under_management: U128,
    pub redeemable_amount_under_management_cap: U128,
    pub minting_fee_bps: u8,
    pub redeeming_fee_bps: u8,
    pub minting_disabled: bool,
    pub minting_fee_total_accrued: U128,
    pub redeeming_fee_total_accrued: U128,
    pub profits_total_collected: U128,
    pub profits_beneficiary: Address,
    /// This depository's claim on the external venue
    pub shares_held: u64,
    /// Epoch (by go-live time) of the outstanding withdraw request, 0 if none
    pub withdraw_request_go_live: u64,
    /// Collateral still requested from the venue for that epoch
    pub withdraw_request_amount: u64,
    pub reserved: Vec<u8>,
}

/// Withdraw epoch bounds published by the pooled-credit venue.
///
/// All values share the block-time unit used by `go_live`.
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct WithdrawEpoch {
    pub go_live: u64,
    pub request_seconds: u64,
    pub redeem_seconds: u64,
    pub available_liquidity_seconds: u64,
}

/// Yield vault state as exposed by the vault contract
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct YieldVaultState {
    /// LP token supply
    pub total_shares: u64,
    /// Collateral backing the LP supply
    pub total_assets: u64,
}

/// Pooled-credit pool global state as exposed by the pool contract
#[odra::odra_type]
#[derive(Copy, Default)]
pub struct PooledCreditPoolState {
    /// Idle collateral held by the pool
    pub liquidity: u64,
    /// Collateral lent out to borrowers
    pub outstanding_credit: u64,
    /// Liquidity reserved for pending withdraw requests
    pub locked_liquidity: u64,
    /// Total share supply
    pub total_shares: u64,
    /// Collateral paid out to withdrawers since inception
    pub total_redeemed: u64,
}

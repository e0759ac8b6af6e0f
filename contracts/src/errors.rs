//! Protocol error definitions.

use odra::prelude::*;

/// Result type for the pure ledger core
pub type LedgerResult<T> = Result<T, ControllerError>;

/// Controller and depository errors
#[repr(u16)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ControllerError {
    // Input validation errors (1xx)
    InvalidCollateralAmount = 100,
    InvalidRedeemableAmount = 101,
    InvalidDepositoriesWeightBps = 102,
    InvalidRedeemableGlobalSupplyCap = 103,
    InvalidOutflowLimit = 104,
    InvalidCollateralDecimals = 105,
    InvalidVenueParams = 106,
    InvalidFeeBps = 107,
    InvalidOracleParams = 108,

    // Capacity errors (2xx)
    RedeemableGlobalSupplyCapReached = 200,
    RedeemableAmountUnderManagementCapReached = 201,
    MaximumOutflowAmountError = 202,
    InsufficientRedeemableAmount = 203,
    MintingDisabled = 204,
    InsufficientVenueShares = 205,
    InsufficientCollateralDeposited = 206,
    NoEligibleVenue = 207,
    InsufficientAllowance = 208,

    // Phase / state errors (3xx)
    ProgramFrozen = 300,
    ProgramAlreadyFrozenOrResumed = 301,
    InvalidWithdrawEpochRequestPhase = 302,
    InvalidWithdrawEpochRedeemPhase = 303,
    VenueNotRegistered = 304,
    VenueAlreadyRegistered = 305,
    StaleStateVersion = 306,
    NotInitialized = 307,

    // Access control errors (4xx)
    Unauthorized = 400,

    // Arithmetic errors (5xx)
    MathOverflow = 500,

    // External venue mismatch errors (6xx)
    InvalidVenueAccount = 600,
    VenueSharesMismatch = 601,
    VenueCollateralMismatch = 602,

    // Oracle errors (7xx)
    OraclePriceStale = 700,
    OraclePriceInvalid = 701,
}

impl ControllerError {
    pub const fn message(&self) -> &'static str {
        match self {
            // Input
            ControllerError::InvalidCollateralAmount => "Collateral amount must be positive",
            ControllerError::InvalidRedeemableAmount => "Redeemable amount must be positive",
            ControllerError::InvalidDepositoriesWeightBps => "Venue weights must sum to 10000 bps",
            ControllerError::InvalidRedeemableGlobalSupplyCap => "Global supply cap below circulating supply",
            ControllerError::InvalidOutflowLimit => "Invalid outflow limit configuration",
            ControllerError::InvalidCollateralDecimals => "Collateral decimals differ from redeemable decimals",
            ControllerError::InvalidVenueParams => "Invalid venue registration parameters",
            ControllerError::InvalidFeeBps => "Fee above 100%",
            ControllerError::InvalidOracleParams => "Oracle bounds above 100%",

            // Capacity
            ControllerError::RedeemableGlobalSupplyCapReached => "Redeemable global supply cap reached",
            ControllerError::RedeemableAmountUnderManagementCapReached => {
                "Venue redeemable amount under management cap reached"
            }
            ControllerError::MaximumOutflowAmountError => "Epoch outflow limit reached",
            ControllerError::InsufficientRedeemableAmount => "Insufficient redeemable amount",
            ControllerError::MintingDisabled => "Minting disabled on this venue",
            ControllerError::InsufficientVenueShares => "Venue shares held do not cover the withdrawal",
            ControllerError::InsufficientCollateralDeposited => "Venue collateral does not cover the withdrawal",
            ControllerError::NoEligibleVenue => "No venue can serve this amount",
            ControllerError::InsufficientAllowance => "Allowance below transfer amount",

            // Phase / state
            ControllerError::ProgramFrozen => "Operation blocked: controller frozen",
            ControllerError::ProgramAlreadyFrozenOrResumed => "Controller already in requested freeze state",
            ControllerError::InvalidWithdrawEpochRequestPhase => "Withdraw epoch is not in its request phase",
            ControllerError::InvalidWithdrawEpochRedeemPhase => "Withdraw epoch is not in its redeem phase",
            ControllerError::VenueNotRegistered => "Venue not registered",
            ControllerError::VenueAlreadyRegistered => "Venue already registered",
            ControllerError::StaleStateVersion => "Controller state changed since it was read",
            ControllerError::NotInitialized => "Controller not initialized",

            // Access control
            ControllerError::Unauthorized => "Unauthorized: caller is not the controller authority",

            // Arithmetic
            ControllerError::MathOverflow => "Math overflow or division by zero",

            // External venue
            ControllerError::InvalidVenueAccount => "Venue account does not match the depository record",
            ControllerError::VenueSharesMismatch => "Venue returned fewer shares than quoted",
            ControllerError::VenueCollateralMismatch => "Venue returned less collateral than quoted",

            // Oracle
            ControllerError::OraclePriceStale => "Oracle price stale",
            ControllerError::OraclePriceInvalid => "Oracle price invalid",
        }
    }
}

impl core::fmt::Display for ControllerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.message())
    }
}

impl From<ControllerError> for OdraError {
    fn from(error: ControllerError) -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            OdraError::user(error as u16)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            OdraError::user(error as u16, error.message())
        }
    }
}

//! Stable Router Contracts
//!
//! Accounting and routing core of a multi-venue collateralized stablecoin.
//!
//! ## Architecture
//!
//! - **Controller**: Entry point; global supply, caps, weights, outflow limiter, freeze switch
//! - **Venues**: DirectCustody (1:1), YieldVault (LP shares), PooledCredit (shares + withdraw epochs)
//! - **Ledger**: Pure planners producing atomic, versioned commits
//! - **Withdraw epochs**: Request/redeem protocol against the pooled-credit venue
//! - **Rebalance**: Weight targets, overflow/underflow, automatic venue selection
//! - **RedeemableToken**: CEP-18 stablecoin minted and burned only by the controller
//!
//! ## Execution Model
//!
//! Each entry point plans against copies of the stored records, performs the
//! external venue and token calls, then commits every record change at once.
//! A failure anywhere reverts the whole call.

#![cfg_attr(target_arch = "wasm32", no_std)]

#[cfg(target_arch = "wasm32")]
extern crate alloc;

// Re-export odra for downstream usage
pub use odra;

// Pure core
pub mod types;
pub mod errors;
pub mod math;
pub mod outflow;
pub mod venue;
pub mod ledger;
pub mod withdraw_epoch;
pub mod rebalance;
pub mod oracle;

// Contract surface
pub mod interfaces;
pub mod events;
pub mod controller;
pub mod redeemable;

//! Deploy the stable router to Casper livenet/testnet using Odra livenet environment.
//!
//! Usage:
//!   cargo run --bin deploy_livenet --release
//!
//! Requires .env file with:
//!   ODRA_CASPER_LIVENET_SECRET_KEY_PATH=/path/to/secret_key.pem
//!   ODRA_CASPER_LIVENET_NODE_ADDRESS=https://node.testnet.casper.network
//!   ODRA_CASPER_LIVENET_CHAIN_NAME=casper-test
//!   ODRA_CASPER_LIVENET_PAYMENT_AMOUNT=200000000000
//!
//! Optional:
//!   ROUTER_COLLATERAL_TOKEN=hash-...   (a test collateral token is deployed when unset)
//!   ROUTER_DECIMALS=6
//!   ROUTER_GLOBAL_SUPPLY_CAP=1000000000000
//!   ROUTER_DIRECT_CUSTODY_CAP=1000000000000

use std::str::FromStr;

use odra::casper_types::{U128, U256};
use odra::host::{Deployer, HostRef};
use odra::prelude::*;

use stable_router_contracts::controller::{Controller, ControllerInitArgs};
use stable_router_contracts::interfaces::RegisterVenueParams;
use stable_router_contracts::redeemable::{RedeemableToken, RedeemableTokenInitArgs};
use stable_router_contracts::types::{VenueKind, VenueWeights};

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() {
    // Load environment from .env file
    dotenv::dotenv().ok();

    println!("=== Stable Router Livenet Deployment ===");
    println!();

    let env = odra_casper_livenet_env::env();

    // Casper 2.0 transactions need an explicit payment amount
    let payment_amount: u64 = env_or("ODRA_CASPER_LIVENET_PAYMENT_AMOUNT", 200_000_000_000);
    env.set_gas(payment_amount);

    let deployer = env.caller();
    println!("Deployer: {:?}", deployer);
    println!();

    // Protocol parameters
    let decimals: u8 = env_or("ROUTER_DECIMALS", 6);
    let unit = 10u64.pow(decimals as u32);
    let global_supply_cap: u64 = env_or("ROUTER_GLOBAL_SUPPLY_CAP", 1_000_000 * unit);
    let direct_custody_cap: u64 = env_or("ROUTER_DIRECT_CUSTODY_CAP", 1_000_000 * unit);
    let outflow_limit_per_epoch_amount: u64 = 100_000 * unit;
    let outflow_limit_per_epoch_bps: u32 = 1_000; // 10% of supply
    let slots_per_epoch: u64 = 86_400_000; // one day of block time in ms

    // ==================== Phase 1: Tokens ====================
    println!("=== Phase 1: Deploying Tokens ===");
    println!();

    let collateral_token = match std::env::var("ROUTER_COLLATERAL_TOKEN")
        .ok()
        .and_then(|v| Address::from_str(&v).ok())
    {
        Some(address) => {
            println!("Using collateral token at: {:?}", address);
            address
        }
        None => {
            println!("Deploying test collateral token...");
            let mut collateral = RedeemableToken::deploy(
                &env,
                RedeemableTokenInitArgs {
                    name: "Test Dollar".to_string(),
                    symbol: "TUSD".to_string(),
                    decimals,
                },
            );
            collateral.set_controller(deployer);
            collateral.mint(deployer, U256::from(1_000_000 * unit));
            let address = collateral.address().clone();
            println!("Test collateral deployed at: {:?}", address);
            address
        }
    };

    println!("Deploying RedeemableToken...");
    let mut redeemable = RedeemableToken::deploy(
        &env,
        RedeemableTokenInitArgs {
            name: "Router Dollar".to_string(),
            symbol: "RUSD".to_string(),
            decimals,
        },
    );
    let redeemable_addr = redeemable.address().clone();
    println!("RedeemableToken deployed at: {:?}", redeemable_addr);
    println!();

    // ==================== Phase 2: Controller ====================
    println!("=== Phase 2: Deploying Controller ===");
    println!();

    let mut controller = Controller::deploy(
        &env,
        ControllerInitArgs {
            redeemable_token: redeemable_addr,
            redeemable_decimals: decimals,
            redeemable_global_supply_cap: U128::from(global_supply_cap),
            venue_weights: VenueWeights {
                direct_custody_bps: 10_000,
                yield_vault_bps: 0,
                pooled_credit_bps: 0,
            },
            outflow_limit_per_epoch_amount,
            outflow_limit_per_epoch_bps,
            slots_per_epoch,
        },
    );
    let controller_addr = controller.address().clone();
    println!("Controller deployed at: {:?}", controller_addr);
    println!();

    // ==================== Phase 3: Wiring ====================
    println!("=== Phase 3: Wiring ===");
    println!();

    println!("Granting mint rights to Controller...");
    redeemable.set_controller(controller_addr);
    println!("Done.");

    println!("Registering DirectCustody venue...");
    controller.register_venue(RegisterVenueParams {
        kind: VenueKind::DirectCustody,
        collateral_token,
        collateral_decimals: decimals,
        venue: None,
        redeemable_amount_under_management_cap: U128::from(direct_custody_cap),
        minting_fee_bps: 0,
        redeeming_fee_bps: 0,
        profits_beneficiary: deployer,
    });
    println!("Done.");

    println!();
    println!("=== Deployment Complete ===");
    println!();
    println!("Contract Addresses:");
    println!("  CollateralToken:    {:?}", collateral_token);
    println!("  RedeemableToken:    {:?}", redeemable_addr);
    println!("  Controller:         {:?}", controller_addr);
}

//! Shared fixtures for the integration tests

#![allow(dead_code)]

use tracing_subscriber::EnvFilter;
use zeratul_distribution::mock::SimApp;
use zeratul_distribution::{AccAddress, Coins, ConsAddress, Dec, Result, ValAddress};

pub const DENOM: &str = "stake";

/// Install a test subscriber once; `RUST_LOG` picks the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn val(n: u8) -> ValAddress {
    ValAddress([n; 20])
}

pub fn cons(n: u8) -> ConsAddress {
    ConsAddress([n; 20])
}

/// Delegator accounts start at 100 so they never collide with an operator
pub fn acc(n: u8) -> AccAddress {
    AccAddress([100 + n; 20])
}

pub fn operator(n: u8) -> AccAddress {
    AccAddress::from(val(n))
}

pub fn stake(amount: u128) -> Coins {
    Coins::single(DENOM, amount)
}

pub fn pct(p: i64) -> Dec {
    Dec::with_prec(p, 2)
}

/// Fresh app with one validator `val(1)` self-bonding `self_bond`
pub fn app_with_validator(commission: Dec, self_bond: u128) -> Result<SimApp> {
    init_tracing();
    let mut app = SimApp::new();
    app.create_validator(val(1), cons(1), commission, self_bond)?;
    Ok(app)
}

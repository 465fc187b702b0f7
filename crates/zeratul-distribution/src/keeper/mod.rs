//! The distribution keeper
//!
//! `Keeper` holds no state of its own: everything lives in the
//! [`Context`](crate::Context) stores, so a keeper can be shared freely and a
//! branched context is a complete fork of the engine.

mod abci;
mod allocation;
mod delegation;
mod fee_pool;
mod genesis;
mod hooks;
pub mod invariants;
mod msg_server;
pub mod query;
mod store;
mod validator;

use crate::address::{module_address, AccAddress};
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::{DEFAULT_BOND_DENOM, FEE_COLLECTOR_NAME, MODULE_NAME};

/// Wiring that is fixed when the keeper is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperConfig {
    /// Module account holding the reward escrow
    pub module_name: String,

    /// Module account fees are collected into
    pub fee_collector_name: String,

    /// The only sender allowed to spend the community pool or update params
    pub authority: AccAddress,

    /// Denom reported when a withdrawal pays nothing
    pub bond_denom: String,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            module_name: MODULE_NAME.to_string(),
            fee_collector_name: FEE_COLLECTOR_NAME.to_string(),
            authority: module_address("gov"),
            bond_denom: DEFAULT_BOND_DENOM.to_string(),
        }
    }
}

pub struct Keeper<A, B, S> {
    account: A,
    bank: B,
    staking: S,
    config: KeeperConfig,
}

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    pub fn new(account: A, bank: B, staking: S, config: KeeperConfig) -> Self {
        Self { account, bank, staking, config }
    }

    pub fn config(&self) -> &KeeperConfig {
        &self.config
    }

    pub fn authority(&self) -> &AccAddress {
        &self.config.authority
    }

    pub fn account_keeper(&self) -> &A {
        &self.account
    }

    pub fn bank_keeper(&self) -> &B {
        &self.bank
    }

    pub fn staking_keeper(&self) -> &S {
        &self.staking
    }

    /// Address of the distribution escrow account
    pub fn module_address(&self) -> AccAddress {
        self.account.module_address(&self.config.module_name)
    }
}

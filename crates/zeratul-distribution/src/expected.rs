//! Interfaces the engine needs from the staking, bank and account modules
//!
//! The engine never stores validators, delegations or balances itself; it
//! reads them through these traits, and staking drives it back through
//! [`StakingHooks`].

use crate::address::{AccAddress, ConsAddress, ValAddress};
use crate::coins::Coins;
use crate::context::Context;
use crate::decimal::Dec;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Validator as seen by the distribution engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    pub operator: ValAddress,
    pub cons_address: ConsAddress,

    /// Bonded tokens, after slashes
    pub tokens: u128,

    /// Total shares issued to delegators
    pub delegator_shares: Dec,

    pub commission_rate: Dec,
}

impl Validator {
    pub fn tokens_dec(&self) -> Dec {
        Dec::from_u128(self.tokens)
    }

    /// `shares · tokens / delegator_shares`, rounded
    pub fn tokens_from_shares(&self, shares: &Dec) -> Dec {
        shares.mul_int(self.tokens).quo(&self.delegator_shares)
    }

    /// Same as [`Validator::tokens_from_shares`] but never rounds up
    pub fn tokens_from_shares_truncated(&self, shares: &Dec) -> Dec {
        shares.mul_int(self.tokens).quo_truncate(&self.delegator_shares)
    }

    /// Shares issued for bonding `amount` tokens, truncated so existing
    /// holders never lose value to rounding. `None` if the validator has
    /// shares outstanding but no tokens left to back them.
    pub fn shares_from_tokens(&self, amount: u128) -> Option<Dec> {
        if self.delegator_shares.is_zero() {
            return Some(Dec::from_u128(amount));
        }
        if self.tokens == 0 {
            return None;
        }
        Some(self.delegator_shares.mul_int(amount).quo_int_truncate(self.tokens))
    }

    /// Shares that back exactly `amount` tokens, rounded up so holders left
    /// behind never lose value. Requires `tokens > 0`.
    pub fn shares_for_tokens_round_up(&self, amount: u128) -> Dec {
        self.delegator_shares.mul_int(amount).quo_int_round_up(self.tokens)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: AccAddress,
    pub validator: ValAddress,
    pub shares: Dec,
}

/// Read access to validators and delegations
pub trait StakingKeeper {
    fn validator(&self, ctx: &Context, val: &ValAddress) -> Option<Validator>;

    fn validator_by_cons_addr(&self, ctx: &Context, cons: &ConsAddress) -> Option<Validator>;

    fn delegation(&self, ctx: &Context, del: &AccAddress, val: &ValAddress) -> Option<Delegation>;

    /// All validators, ordered by operator address
    fn validators(&self, ctx: &Context) -> Vec<Validator>;

    /// Every delegation of `del`, ordered by validator
    fn delegator_delegations(&self, ctx: &Context, del: &AccAddress) -> Vec<Delegation>;

    /// Every delegation in the store
    fn all_delegations(&self, ctx: &Context) -> Vec<Delegation>;

    fn parse_val_address(&self, s: &str) -> Result<ValAddress> {
        s.parse()
    }

    fn val_address_to_string(&self, val: &ValAddress) -> String {
        val.to_string()
    }
}

/// Coin movement between accounts and module accounts
pub trait BankKeeper {
    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: &AccAddress,
        module: &str,
        amount: &Coins,
    ) -> Result<()>;

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<()>;

    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut Context,
        from_module: &str,
        to_module: &str,
        amount: &Coins,
    ) -> Result<()>;

    fn get_all_balances(&self, ctx: &Context, addr: &AccAddress) -> Coins;

    /// Addresses that may not receive funds from outside
    fn blocked_addr(&self, addr: &AccAddress) -> bool;
}

/// Module accounts and the account address codec
pub trait AccountKeeper {
    fn module_address(&self, name: &str) -> AccAddress;

    fn parse_acc_address(&self, s: &str) -> Result<AccAddress> {
        s.parse()
    }

    fn acc_address_to_string(&self, addr: &AccAddress) -> String {
        addr.to_string()
    }
}

/// Lifecycle callbacks staking must invoke, in the documented order
/// relative to its own writes
pub trait StakingHooks {
    /// After the validator record is written
    fn after_validator_created(&self, ctx: &mut Context, val: &ValAddress) -> Result<()>;

    /// Before a new delegation is written
    fn before_delegation_created(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()>;

    /// Before an existing delegation's shares change
    fn before_delegation_shares_modified(
        &self,
        ctx: &mut Context,
        del: &AccAddress,
        val: &ValAddress,
    ) -> Result<()>;

    /// Before a delegation is deleted
    fn before_delegation_removed(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()>;

    /// After a delegation is created or changed
    fn after_delegation_modified(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()>;

    /// Before the validator's tokens are reduced by `fraction`
    fn before_validator_slashed(&self, ctx: &mut Context, val: &ValAddress, fraction: &Dec) -> Result<()>;

    /// After the validator record is deleted
    fn after_validator_removed(&self, ctx: &mut Context, cons: &ConsAddress, val: &ValAddress) -> Result<()>;
}

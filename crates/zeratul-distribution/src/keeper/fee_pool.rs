//! Community pool ledger
//!
//! The pool is decimal bookkeeping only. The integer coins backing it sit in
//! the distribution module account together with everything owed to
//! validators.

use super::Keeper;
use crate::address::AccAddress;
use crate::coins::{Coins, DecCoins};
use crate::context::Context;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use tracing::info;

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    /// Credit decimal coins already held by the module account
    pub(crate) fn add_to_community_pool(&self, ctx: &mut Context, amount: &DecCoins) -> Result<()> {
        if amount.is_zero() {
            return Ok(());
        }
        let mut pool = self.get_fee_pool(ctx)?;
        pool.community_pool = pool.community_pool.add(amount);
        self.set_fee_pool(ctx, &pool)
    }

    /// Move `amount` from `depositor` into the module account and credit it
    /// to the community pool
    pub fn fund_community_pool(&self, ctx: &mut Context, amount: &Coins, depositor: &AccAddress) -> Result<()> {
        self.bank
            .send_coins_from_account_to_module(ctx, depositor, &self.config.module_name, amount)?;
        self.add_to_community_pool(ctx, &DecCoins::from_coins(amount))
    }

    /// Pay `amount` out of the community pool to `recipient`
    pub fn distribute_from_fee_pool(&self, ctx: &mut Context, amount: &Coins, recipient: &AccAddress) -> Result<()> {
        let mut pool = self.get_fee_pool(ctx)?;

        let (remaining, negative) = pool.community_pool.safe_sub(&DecCoins::from_coins(amount));
        if negative {
            return Err(DistributionError::BadDistribution);
        }
        pool.community_pool = remaining;

        self.bank
            .send_coins_from_module_to_account(ctx, &self.config.module_name, recipient, amount)?;
        self.set_fee_pool(ctx, &pool)?;

        info!(%recipient, %amount, "community pool spend");
        Ok(())
    }
}

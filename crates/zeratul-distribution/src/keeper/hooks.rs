//! Staking lifecycle hooks
//!
//! Withdrawal runs before a delegation changes so it sees the old stake;
//! the claim restarts after the change so it records the new one.

use super::Keeper;
use crate::address::{AccAddress, ConsAddress, ValAddress};
use crate::context::Context;
use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, StakingHooks, StakingKeeper};

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    fn withdraw_for_hook(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()> {
        let validator = self.staking.validator(ctx, val).ok_or(DistributionError::NoValidatorExists)?;
        let delegation = self
            .staking
            .delegation(ctx, del, val)
            .ok_or(DistributionError::NoDelegationExists)?;
        self.withdraw_delegation_rewards_inner(ctx, &validator, &delegation)?;
        Ok(())
    }
}

impl<A, B, S> StakingHooks for Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    fn after_validator_created(&self, ctx: &mut Context, val: &ValAddress) -> Result<()> {
        self.initialize_validator(ctx, val)
    }

    fn before_delegation_created(&self, ctx: &mut Context, _del: &AccAddress, val: &ValAddress) -> Result<()> {
        let validator = self.staking.validator(ctx, val).ok_or(DistributionError::NoValidatorExists)?;
        self.increment_validator_period(ctx, &validator)?;
        Ok(())
    }

    fn before_delegation_shares_modified(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()> {
        self.withdraw_for_hook(ctx, del, val)
    }

    fn before_delegation_removed(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()> {
        // an unbond already withdrew in before_delegation_shares_modified
        if !self.has_delegator_starting_info(ctx, val, del) {
            return Ok(());
        }
        self.withdraw_for_hook(ctx, del, val)
    }

    fn after_delegation_modified(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<()> {
        self.initialize_delegation(ctx, val, del)
    }

    fn before_validator_slashed(&self, ctx: &mut Context, val: &ValAddress, fraction: &Dec) -> Result<()> {
        self.update_validator_slash_fraction(ctx, val, fraction)
    }

    fn after_validator_removed(&self, ctx: &mut Context, _cons: &ConsAddress, val: &ValAddress) -> Result<()> {
        self.remove_validator_records(ctx, val)
    }
}

//! Delegator reward calculation and withdrawal
//!
//! What a delegation is owed between two periods at constant stake is
//! `stake · (ratio[end] - ratio[start])`. Slashes change the stake, so the
//! walk splits the interval at every slash event closing a period after the
//! start and shrinks the stake by `1 - fraction` at each one.

use super::Keeper;
use crate::address::{AccAddress, ValAddress};
use crate::coins::{Coins, DecCoins};
use crate::context::{Context, Event};
use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, Delegation, StakingKeeper, Validator};
use crate::types::DelegatorStartingInfo;
use tracing::{info, warn};

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    /// Start a reward claim for `del` at the validator's last closed period
    pub fn initialize_delegation(&self, ctx: &mut Context, val: &ValAddress, del: &AccAddress) -> Result<()> {
        let current = match self.get_validator_current_rewards(ctx, val)? {
            Some(c) => c,
            None => panic!("no current rewards for validator {}", val),
        };
        let previous_period = current.period - 1;
        self.increment_reference_count(ctx, val, previous_period)?;

        let validator = self.staking.validator(ctx, val).ok_or(DistributionError::NoValidatorExists)?;
        let delegation = self
            .staking
            .delegation(ctx, del, val)
            .ok_or(DistributionError::NoDelegationExists)?;

        let stake = validator.tokens_from_shares_truncated(&delegation.shares);
        let info = DelegatorStartingInfo {
            previous_period,
            stake,
            height: ctx.block_height(),
        };
        self.set_delegator_starting_info(ctx, val, del, &info)
    }

    /// Rewards for `stake` held from `starting_period` through `ending_period`
    pub fn calculate_delegation_rewards_between(
        &self,
        ctx: &Context,
        val: &ValAddress,
        starting_period: u64,
        ending_period: u64,
        stake: &Dec,
    ) -> Result<DecCoins> {
        if starting_period > ending_period {
            panic!("starting period {} after ending period {}", starting_period, ending_period);
        }
        if stake.is_negative() {
            panic!("negative stake {} for validator {}", stake, val);
        }

        let ratio_at = |period: u64| -> Result<DecCoins> {
            match self.get_validator_historical_rewards(ctx, val, period)? {
                Some(h) => Ok(h.cumulative_reward_ratio),
                None => panic!("missing historical rewards for {} period {}", val, period),
            }
        };
        let starting = ratio_at(starting_period)?;
        let ending = ratio_at(ending_period)?;

        let (difference, negative) = ending.safe_sub(&starting);
        if negative {
            panic!("negative rewards between periods {} and {} of {}", starting_period, ending_period, val);
        }
        Ok(difference.mul_dec_truncate(stake))
    }

    /// Everything `delegation` is owed up to the already closed
    /// `ending_period`, walking slash events in between
    pub fn calculate_delegation_rewards(
        &self,
        ctx: &Context,
        validator: &Validator,
        delegation: &Delegation,
        ending_period: u64,
    ) -> Result<DecCoins> {
        let val = &validator.operator;
        let info = self
            .get_delegator_starting_info(ctx, val, &delegation.delegator)?
            .ok_or(DistributionError::NoDelegationExists)?;

        let mut rewards = DecCoins::empty();
        let mut starting_period = info.previous_period;
        let mut stake = info.stake;

        // events at the starting height may predate the delegation; the
        // period filter skips those
        let ending_height = ctx.block_height();
        for (_, event) in self.validator_slash_events_between(ctx, val, info.height, ending_height)? {
            let ending = event.validator_period;
            if ending > starting_period {
                let segment = self.calculate_delegation_rewards_between(ctx, val, starting_period, ending, &stake)?;
                rewards = rewards.add(&segment);

                stake = stake.mul_truncate(&(Dec::one() - event.fraction));
                starting_period = ending;
            }
        }

        // the walked stake may only drift above the live stake by rounding
        let current_stake = validator.tokens_from_shares(&delegation.shares);
        if stake > current_stake {
            let margin = Dec::smallest().mul_int(3);
            if stake <= &current_stake + &margin {
                stake = current_stake;
            } else {
                panic!(
                    "calculated final stake for delegator {} greater than current stake\n\
                     \tfinal stake:\t{}\n\tcurrent stake:\t{}",
                    delegation.delegator, stake, current_stake
                );
            }
        }

        let last = self.calculate_delegation_rewards_between(ctx, val, starting_period, ending_period, &stake)?;
        Ok(rewards.add(&last))
    }

    /// Pay out a delegation's rewards and drop its starting info. The claim
    /// is not restarted here.
    pub(crate) fn withdraw_delegation_rewards_inner(
        &self,
        ctx: &mut Context,
        validator: &Validator,
        delegation: &Delegation,
    ) -> Result<Coins> {
        let val = &validator.operator;
        let del = &delegation.delegator;

        let info = self
            .get_delegator_starting_info(ctx, val, del)?
            .ok_or(DistributionError::NoDelegationExists)?;

        let ending_period = self.increment_validator_period(ctx, validator)?;
        let raw = self.calculate_delegation_rewards(ctx, validator, delegation, ending_period)?;

        let mut outstanding = self.get_validator_outstanding_rewards(ctx, val)?;
        let rewards = raw.intersect(&outstanding.rewards);
        if rewards != raw {
            warn!(
                delegator = %del,
                validator = %val,
                calculated = %raw,
                outstanding = %outstanding.rewards,
                "rounding error withdrawing rewards from validator"
            );
        }

        let (payout, remainder) = rewards.truncate_decimal();
        if !payout.is_empty() {
            let withdraw = self.get_delegator_withdraw_addr(ctx, del)?;
            self.bank
                .send_coins_from_module_to_account(ctx, &self.config.module_name, &withdraw, &payout)?;
        }

        outstanding.rewards = outstanding.rewards.sub(&rewards);
        self.set_validator_outstanding_rewards(ctx, val, &outstanding)?;
        self.add_to_community_pool(ctx, &remainder)?;

        self.decrement_reference_count(ctx, val, info.previous_period)?;
        self.delete_delegator_starting_info(ctx, val, del);

        let amount = if payout.is_empty() {
            format!("0{}", self.config.bond_denom)
        } else {
            payout.to_string()
        };
        ctx.emit(
            Event::new("withdraw_rewards")
                .attr("amount", amount)
                .attr("validator", self.staking.val_address_to_string(val))
                .attr("delegator", self.account.acc_address_to_string(del)),
        );

        info!(delegator = %del, validator = %val, amount = %payout, "withdrew delegation rewards");
        Ok(payout)
    }

    /// Withdraw and restart the claim at the newly closed period
    pub fn withdraw_delegation_rewards(&self, ctx: &mut Context, del: &AccAddress, val: &ValAddress) -> Result<Coins> {
        let validator = self.staking.validator(ctx, val).ok_or(DistributionError::NoValidatorExists)?;
        let delegation = self
            .staking
            .delegation(ctx, del, val)
            .ok_or(DistributionError::NoDelegationExists)?;

        let paid = self.withdraw_delegation_rewards_inner(ctx, &validator, &delegation)?;
        self.initialize_delegation(ctx, val, del)?;
        Ok(paid)
    }

    /// Pay out the validator's whole accumulated commission. The decimal
    /// change goes to the community pool.
    pub fn withdraw_validator_commission(&self, ctx: &mut Context, val: &ValAddress) -> Result<Coins> {
        let commission = self.get_validator_accumulated_commission(ctx, val)?.commission;
        if commission.is_zero() {
            return Err(DistributionError::NoValidatorCommission);
        }

        let (payout, remainder) = commission.truncate_decimal();

        let mut outstanding = self.get_validator_outstanding_rewards(ctx, val)?;
        outstanding.rewards = outstanding.rewards.sub(&commission);
        self.set_validator_outstanding_rewards(ctx, val, &outstanding)?;
        self.set_validator_accumulated_commission(ctx, val, &Default::default())?;
        self.add_to_community_pool(ctx, &remainder)?;

        if !payout.is_empty() {
            let operator = AccAddress::from(*val);
            let withdraw = self.get_delegator_withdraw_addr(ctx, &operator)?;
            self.bank
                .send_coins_from_module_to_account(ctx, &self.config.module_name, &withdraw, &payout)?;
        }

        ctx.emit(
            Event::new("withdraw_commission")
                .attr("amount", payout.to_string())
                .attr("validator", self.staking.val_address_to_string(val)),
        );

        info!(validator = %val, amount = %payout, "withdrew validator commission");
        Ok(payout)
    }

    /// Redirect where `del`'s rewards are paid
    pub fn set_withdraw_addr(&self, ctx: &mut Context, del: &AccAddress, withdraw: &AccAddress) -> Result<()> {
        if !self.get_params(ctx)?.withdraw_addr_enabled {
            return Err(DistributionError::SetWithdrawAddrDisabled);
        }
        if self.bank.blocked_addr(withdraw) {
            return Err(DistributionError::Unauthorized(self.account.acc_address_to_string(withdraw)));
        }

        ctx.emit(
            Event::new("set_withdraw_address")
                .attr("withdraw_address", self.account.acc_address_to_string(withdraw)),
        );
        self.set_delegator_withdraw_addr(ctx, del, withdraw)
    }
}

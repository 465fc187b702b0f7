//! Per-validator period accumulator and slash log
//!
//! A validator's open period collects `shared` rewards in its current-rewards
//! record. Closing the period folds `rewards / tokens` into the cumulative
//! ratio and stores it as historical[period]:
//!
//! ```text
//! historical[p] = historical[p-1] + current.rewards / tokens   (truncated)
//! ```
//!
//! Each historical record counts the anchors pointing at it: the successor
//! period, delegations starting there and slash events closing it. At zero
//! it is deleted.

use super::Keeper;
use crate::address::{AccAddress, ValAddress};
use crate::coins::DecCoins;
use crate::context::Context;
use crate::decimal::Dec;
use crate::error::Result;
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper, Validator};
use crate::types::{
    ValidatorAccumulatedCommission, ValidatorCurrentRewards, ValidatorHistoricalRewards,
    ValidatorOutstandingRewards, ValidatorSlashEvent,
};
use tracing::{debug, info};

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    /// Fresh records for a new validator: historical[0] anchored by period 1
    pub fn initialize_validator(&self, ctx: &mut Context, val: &ValAddress) -> Result<()> {
        self.set_validator_historical_rewards(
            ctx,
            val,
            0,
            &ValidatorHistoricalRewards {
                cumulative_reward_ratio: DecCoins::empty(),
                reference_count: 1,
            },
        )?;
        self.set_validator_current_rewards(
            ctx,
            val,
            &ValidatorCurrentRewards { rewards: DecCoins::empty(), period: 1 },
        )?;
        self.set_validator_accumulated_commission(ctx, val, &ValidatorAccumulatedCommission::default())?;
        self.set_validator_outstanding_rewards(ctx, val, &ValidatorOutstandingRewards::default())
    }

    fn current_rewards(&self, ctx: &Context, val: &ValAddress) -> Result<ValidatorCurrentRewards> {
        match self.get_validator_current_rewards(ctx, val)? {
            Some(current) => Ok(current),
            None => panic!("no current rewards for validator {}", val),
        }
    }

    /// Close the validator's open period and return its number
    pub fn increment_validator_period(&self, ctx: &mut Context, validator: &Validator) -> Result<u64> {
        let val = &validator.operator;
        let current = self.current_rewards(ctx, val)?;

        let ratio = if validator.tokens == 0 {
            // nobody can claim this, hand it to the community pool
            if !current.rewards.is_zero() {
                self.add_to_community_pool(ctx, &current.rewards)?;
                let mut outstanding = self.get_validator_outstanding_rewards(ctx, val)?;
                outstanding.rewards = outstanding.rewards.sub(&current.rewards);
                self.set_validator_outstanding_rewards(ctx, val, &outstanding)?;
            }
            DecCoins::empty()
        } else {
            current.rewards.quo_dec_truncate(&validator.tokens_dec())
        };

        let previous = match self.get_validator_historical_rewards(ctx, val, current.period - 1)? {
            Some(h) => h.cumulative_reward_ratio,
            None => panic!("missing historical rewards for {} period {}", val, current.period - 1),
        };
        self.decrement_reference_count(ctx, val, current.period - 1)?;

        self.set_validator_historical_rewards(
            ctx,
            val,
            current.period,
            &ValidatorHistoricalRewards {
                cumulative_reward_ratio: previous.add(&ratio),
                reference_count: 1,
            },
        )?;
        self.set_validator_current_rewards(
            ctx,
            val,
            &ValidatorCurrentRewards { rewards: DecCoins::empty(), period: current.period + 1 },
        )?;

        debug!(validator = %val, period = current.period, "closed validator period");
        Ok(current.period)
    }

    pub(crate) fn increment_reference_count(&self, ctx: &mut Context, val: &ValAddress, period: u64) -> Result<()> {
        let mut historical = match self.get_validator_historical_rewards(ctx, val, period)? {
            Some(h) => h,
            None => panic!("cannot reference missing historical rewards {} period {}", val, period),
        };
        historical.reference_count += 1;
        self.set_validator_historical_rewards(ctx, val, period, &historical)
    }

    pub(crate) fn decrement_reference_count(&self, ctx: &mut Context, val: &ValAddress, period: u64) -> Result<()> {
        let mut historical = match self.get_validator_historical_rewards(ctx, val, period)? {
            Some(h) => h,
            None => panic!("cannot release missing historical rewards {} period {}", val, period),
        };
        if historical.reference_count == 0 {
            panic!("negative reference count for {} period {}", val, period);
        }
        historical.reference_count -= 1;
        if historical.reference_count == 0 {
            self.delete_validator_historical_reward(ctx, val, period);
            Ok(())
        } else {
            self.set_validator_historical_rewards(ctx, val, period, &historical)
        }
    }

    /// Record a slash of `fraction` at the current height.
    ///
    /// A second slash in the same block that finds the previous one still
    /// closing the latest period is folded into it as
    /// `1 - (1 - f1)(1 - f2)` instead of opening a new event.
    pub fn update_validator_slash_fraction(&self, ctx: &mut Context, val: &ValAddress, fraction: &Dec) -> Result<()> {
        if fraction.is_negative() || *fraction > Dec::one() {
            panic!("slash fraction must be within [0, 1], got {}", fraction);
        }

        let height = ctx.block_height();
        let current = self.current_rewards(ctx, val)?;
        let last_closed = current.period - 1;

        if let Some(mut event) = self.get_validator_slash_event(ctx, val, height, last_closed)? {
            // truncating the retained part keeps the walked stake at or below what is left
            let retained = (Dec::one() - event.fraction.clone()).mul_truncate(&(Dec::one() - fraction.clone()));
            event.fraction = Dec::one() - retained;
            debug!(validator = %val, height, fraction = %event.fraction, "composed slash");
            return self.set_validator_slash_event(ctx, val, height, last_closed, &event);
        }

        let validator = match self.staking.validator(ctx, val) {
            Some(v) => v,
            None => panic!("slashing unknown validator {}", val),
        };
        let period = self.increment_validator_period(ctx, &validator)?;
        self.increment_reference_count(ctx, val, period)?;
        self.set_validator_slash_event(
            ctx,
            val,
            height,
            period,
            &ValidatorSlashEvent { validator_period: period, fraction: fraction.clone() },
        )?;

        debug!(validator = %val, height, period, %fraction, "recorded slash");
        Ok(())
    }

    /// Drop every record of a removed validator. Integer commission goes to
    /// the operator, all dust and residual outstanding to the community pool.
    pub fn remove_validator_records(&self, ctx: &mut Context, val: &ValAddress) -> Result<()> {
        let mut outstanding = self.get_validator_outstanding_rewards(ctx, val)?.rewards;
        let commission = self.get_validator_accumulated_commission(ctx, val)?.commission;

        if !commission.is_zero() {
            outstanding = outstanding.sub(&commission);
            let (coins, remainder) = commission.truncate_decimal();
            self.add_to_community_pool(ctx, &remainder)?;

            if !coins.is_empty() {
                let operator = AccAddress::from(*val);
                let withdraw = self.get_delegator_withdraw_addr(ctx, &operator)?;
                self.bank
                    .send_coins_from_module_to_account(ctx, &self.config.module_name, &withdraw, &coins)?;
            }
        }

        self.add_to_community_pool(ctx, &outstanding)?;

        self.delete_validator_outstanding_rewards(ctx, val);
        self.delete_validator_accumulated_commission(ctx, val);
        self.delete_validator_slash_events(ctx, val);
        self.delete_validator_historical_rewards(ctx, val);
        self.delete_validator_current_rewards(ctx, val);

        info!(validator = %val, residual = %outstanding, "removed validator distribution records");
        Ok(())
    }
}

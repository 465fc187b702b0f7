//! Read-only queries
//!
//! Queries take string addresses like messages do. Reward queries close the
//! validator's period to see up-to-date numbers, so they run on a throwaway
//! branch of the context.

use super::Keeper;
use crate::address::{AccAddress, ValAddress};
use crate::coins::DecCoins;
use crate::context::Context;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::types::{Params, ValidatorSlashEvent};
use serde::{Deserialize, Serialize};

/// Offset pagination
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u64,
    /// 0 means no limit
    pub limit: u64,
    pub count_total: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Whether more results follow this page
    pub has_more: bool,
    /// Total result count, only filled when requested
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorDistributionInfo {
    pub operator_address: String,
    pub self_bond_rewards: DecCoins,
    pub commission: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationDelegatorReward {
    pub validator_address: String,
    pub reward: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationTotalRewards {
    pub rewards: Vec<DelegationDelegatorReward>,
    pub total: DecCoins,
}

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    fn query_val_address(&self, s: &str) -> Result<ValAddress> {
        if s.is_empty() {
            return Err(DistributionError::EmptyValidatorAddr);
        }
        self.staking.parse_val_address(s)
    }

    fn query_acc_address(&self, s: &str) -> Result<AccAddress> {
        if s.is_empty() {
            return Err(DistributionError::EmptyDelegatorAddr);
        }
        self.account.parse_acc_address(s)
    }

    pub fn query_params(&self, ctx: &Context) -> Result<Params> {
        self.get_params(ctx)
    }

    /// Operator self-bond rewards and commission
    pub fn query_validator_distribution_info(&self, ctx: &Context, validator: &str) -> Result<ValidatorDistributionInfo> {
        let val = self.query_val_address(validator)?;
        let validator = self.staking.validator(ctx, &val).ok_or(DistributionError::NoValidatorExists)?;
        let operator = AccAddress::from(val);
        let delegation = self
            .staking
            .delegation(ctx, &operator, &val)
            .ok_or(DistributionError::NoDelegationExists)?;

        let mut branch = ctx.branch();
        let ending_period = self.increment_validator_period(&mut branch, &validator)?;
        let self_bond_rewards = self.calculate_delegation_rewards(&branch, &validator, &delegation, ending_period)?;
        let commission = self.get_validator_accumulated_commission(ctx, &val)?.commission;

        Ok(ValidatorDistributionInfo {
            operator_address: self.account.acc_address_to_string(&operator),
            self_bond_rewards,
            commission,
        })
    }

    pub fn query_validator_outstanding_rewards(&self, ctx: &Context, validator: &str) -> Result<DecCoins> {
        let val = self.query_val_address(validator)?;
        if self.staking.validator(ctx, &val).is_none() {
            return Err(DistributionError::NoValidatorExists);
        }
        Ok(self.get_validator_outstanding_rewards(ctx, &val)?.rewards)
    }

    pub fn query_validator_commission(&self, ctx: &Context, validator: &str) -> Result<DecCoins> {
        let val = self.query_val_address(validator)?;
        if self.staking.validator(ctx, &val).is_none() {
            return Err(DistributionError::NoValidatorExists);
        }
        Ok(self.get_validator_accumulated_commission(ctx, &val)?.commission)
    }

    /// Slash events with `starting_height <= height <= ending_height`
    pub fn query_validator_slashes(
        &self,
        ctx: &Context,
        validator: &str,
        starting_height: u64,
        ending_height: u64,
        page: &PageRequest,
    ) -> Result<(Vec<ValidatorSlashEvent>, PageResponse)> {
        let val = self.query_val_address(validator)?;
        if starting_height > ending_height {
            return Err(DistributionError::InvalidSlashRange { start: starting_height, end: ending_height });
        }

        let all = self.validator_slash_events_between(ctx, &val, starting_height, ending_height)?;
        let total = all.len() as u64;
        let limit = if page.limit == 0 { u64::MAX } else { page.limit };

        let events: Vec<ValidatorSlashEvent> = all
            .into_iter()
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .map(|(_, event)| event)
            .collect();

        let shown = page.offset.saturating_add(events.len() as u64);
        let response = PageResponse {
            has_more: shown < total,
            total: page.count_total.then_some(total),
        };
        Ok((events, response))
    }

    pub fn query_delegation_rewards(&self, ctx: &Context, delegator: &str, validator: &str) -> Result<DecCoins> {
        let del = self.query_acc_address(delegator)?;
        let val = self.query_val_address(validator)?;

        let validator = self.staking.validator(ctx, &val).ok_or(DistributionError::NoValidatorExists)?;
        let delegation = self
            .staking
            .delegation(ctx, &del, &val)
            .ok_or(DistributionError::NoDelegationExists)?;

        let mut branch = ctx.branch();
        let ending_period = self.increment_validator_period(&mut branch, &validator)?;
        self.calculate_delegation_rewards(&branch, &validator, &delegation, ending_period)
    }

    /// Rewards across every delegation of `delegator`
    pub fn query_delegation_total_rewards(&self, ctx: &Context, delegator: &str) -> Result<DelegationTotalRewards> {
        let del = self.query_acc_address(delegator)?;

        let mut branch = ctx.branch();
        let mut rewards = Vec::new();
        let mut total = DecCoins::empty();

        for delegation in self.staking.delegator_delegations(ctx, &del) {
            let validator = self
                .staking
                .validator(ctx, &delegation.validator)
                .ok_or(DistributionError::NoValidatorExists)?;
            let ending_period = self.increment_validator_period(&mut branch, &validator)?;
            let reward = self.calculate_delegation_rewards(&branch, &validator, &delegation, ending_period)?;

            total = total.add(&reward);
            rewards.push(DelegationDelegatorReward {
                validator_address: self.staking.val_address_to_string(&delegation.validator),
                reward,
            });
        }

        Ok(DelegationTotalRewards { rewards, total })
    }

    /// Validators `delegator` is bonded to
    pub fn query_delegator_validators(&self, ctx: &Context, delegator: &str) -> Result<Vec<String>> {
        let del = self.query_acc_address(delegator)?;
        Ok(self
            .staking
            .delegator_delegations(ctx, &del)
            .iter()
            .map(|d| self.staking.val_address_to_string(&d.validator))
            .collect())
    }

    pub fn query_delegator_withdraw_address(&self, ctx: &Context, delegator: &str) -> Result<String> {
        let del = self.query_acc_address(delegator)?;
        let withdraw = self.get_delegator_withdraw_addr(ctx, &del)?;
        Ok(self.account.acc_address_to_string(&withdraw))
    }

    pub fn query_community_pool(&self, ctx: &Context) -> Result<DecCoins> {
        Ok(self.get_fee_pool(ctx)?.community_pool)
    }
}

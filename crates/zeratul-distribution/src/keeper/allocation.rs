//! Per-block fee allocation

use super::Keeper;
use crate::coins::DecCoins;
use crate::context::{Context, Event};
use crate::error::Result;
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper, Validator};
use crate::types::{BlockIdFlag, VoteInfo};
use tracing::{debug, warn};

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    /// Sweep the fee collector and split it over the previous block's voters
    /// by power. Tax and every truncation remainder go to the community pool.
    pub fn allocate_tokens(&self, ctx: &mut Context, total_power: u128, votes: &[VoteInfo]) -> Result<()> {
        let fee_collector = self.account.module_address(&self.config.fee_collector_name);
        let collected = self.bank.get_all_balances(ctx, &fee_collector);
        self.bank.send_coins_from_module_to_module(
            ctx,
            &self.config.fee_collector_name,
            &self.config.module_name,
            &collected,
        )?;
        let fees = DecCoins::from_coins(&collected);

        if total_power == 0 {
            return self.add_to_community_pool(ctx, &fees);
        }

        let community_tax = self.get_params(ctx)?.community_tax;
        let funding = fees.mul_dec_truncate(&community_tax);
        let remaining = fees.sub(&funding);

        let mut distributed = DecCoins::empty();
        for vote in votes {
            if vote.block_id_flag != BlockIdFlag::Commit || vote.power == 0 {
                continue;
            }
            let validator = match self.staking.validator_by_cons_addr(ctx, &vote.validator) {
                Some(v) => v,
                None => {
                    warn!(cons = %vote.validator, "vote from unknown validator, share goes to community pool");
                    continue;
                }
            };

            let reward = remaining.mul_int_quo_truncate(vote.power as u128, total_power);
            self.allocate_tokens_to_validator(ctx, &validator, &reward)?;
            distributed = distributed.add(&reward);
        }

        // tax plus everything the truncating splits left behind
        let to_pool = fees.sub(&distributed);
        self.add_to_community_pool(ctx, &to_pool)
    }

    /// Credit `tokens` to one validator: commission off the top, the rest to
    /// its delegators' open period
    pub fn allocate_tokens_to_validator(&self, ctx: &mut Context, validator: &Validator, tokens: &DecCoins) -> Result<()> {
        let val = &validator.operator;
        let commission = tokens.mul_dec(&validator.commission_rate);
        let shared = tokens.sub(&commission);
        let val_str = self.staking.val_address_to_string(val);

        ctx.emit(
            Event::new("commission")
                .attr("amount", commission.to_string())
                .attr("validator", &val_str),
        );
        let mut accumulated = self.get_validator_accumulated_commission(ctx, val)?;
        accumulated.commission = accumulated.commission.add(&commission);
        self.set_validator_accumulated_commission(ctx, val, &accumulated)?;

        let mut current = match self.get_validator_current_rewards(ctx, val)? {
            Some(c) => c,
            None => panic!("allocating to validator {} without current rewards", val),
        };
        current.rewards = current.rewards.add(&shared);
        self.set_validator_current_rewards(ctx, val, &current)?;

        ctx.emit(
            Event::new("rewards")
                .attr("amount", tokens.to_string())
                .attr("validator", &val_str),
        );
        let mut outstanding = self.get_validator_outstanding_rewards(ctx, val)?;
        outstanding.rewards = outstanding.rewards.add(tokens);
        self.set_validator_outstanding_rewards(ctx, val, &outstanding)?;

        debug!(validator = %val, %tokens, %commission, "allocated tokens to validator");
        Ok(())
    }
}

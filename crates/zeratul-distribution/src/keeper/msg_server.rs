//! Message handlers
//!
//! [`Keeper::handle`] runs one message on a branch of the context; a failing
//! message leaves no writes and no events behind.

use super::Keeper;
use crate::coins::DecCoins;
use crate::context::Context;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::msgs::{
    Msg, MsgCommunityPoolSpend, MsgDepositValidatorRewardsPool, MsgFundCommunityPool, MsgResponse,
    MsgSetWithdrawAddress, MsgUpdateParams, MsgWithdrawDelegatorReward, MsgWithdrawValidatorCommission,
};
use tracing::info;

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    pub fn handle(&self, ctx: &mut Context, msg: &Msg) -> Result<MsgResponse> {
        msg.validate_basic()?;
        ctx.run_atomic(|ctx| match msg {
            Msg::SetWithdrawAddress(m) => self.handle_set_withdraw_address(ctx, m),
            Msg::WithdrawDelegatorReward(m) => self.handle_withdraw_delegator_reward(ctx, m),
            Msg::WithdrawValidatorCommission(m) => self.handle_withdraw_validator_commission(ctx, m),
            Msg::FundCommunityPool(m) => self.handle_fund_community_pool(ctx, m),
            Msg::CommunityPoolSpend(m) => self.handle_community_pool_spend(ctx, m),
            Msg::DepositValidatorRewardsPool(m) => self.handle_deposit_validator_rewards_pool(ctx, m),
            Msg::UpdateParams(m) => self.handle_update_params(ctx, m),
        })
    }

    fn check_authority(&self, authority: &str) -> Result<()> {
        let expected = self.account.acc_address_to_string(&self.config.authority);
        if authority != expected {
            return Err(DistributionError::InvalidAuthority { expected, got: authority.to_string() });
        }
        Ok(())
    }

    fn handle_set_withdraw_address(&self, ctx: &mut Context, m: &MsgSetWithdrawAddress) -> Result<MsgResponse> {
        let del = self.account.parse_acc_address(&m.delegator_address)?;
        let withdraw = self.account.parse_acc_address(&m.withdraw_address)?;
        self.set_withdraw_addr(ctx, &del, &withdraw)?;
        Ok(MsgResponse::Empty)
    }

    fn handle_withdraw_delegator_reward(&self, ctx: &mut Context, m: &MsgWithdrawDelegatorReward) -> Result<MsgResponse> {
        let del = self.account.parse_acc_address(&m.delegator_address)?;
        let val = self.staking.parse_val_address(&m.validator_address)?;
        let paid = self.withdraw_delegation_rewards(ctx, &del, &val)?;
        Ok(MsgResponse::Withdrawn(paid))
    }

    fn handle_withdraw_validator_commission(
        &self,
        ctx: &mut Context,
        m: &MsgWithdrawValidatorCommission,
    ) -> Result<MsgResponse> {
        let val = self.staking.parse_val_address(&m.validator_address)?;
        let paid = self.withdraw_validator_commission(ctx, &val)?;
        Ok(MsgResponse::Withdrawn(paid))
    }

    fn handle_fund_community_pool(&self, ctx: &mut Context, m: &MsgFundCommunityPool) -> Result<MsgResponse> {
        let depositor = self.account.parse_acc_address(&m.depositor)?;
        self.fund_community_pool(ctx, &m.amount, &depositor)?;
        Ok(MsgResponse::Empty)
    }

    fn handle_community_pool_spend(&self, ctx: &mut Context, m: &MsgCommunityPoolSpend) -> Result<MsgResponse> {
        self.check_authority(&m.authority)?;
        let recipient = self.account.parse_acc_address(&m.recipient)?;
        if self.bank.blocked_addr(&recipient) {
            return Err(DistributionError::Unauthorized(m.recipient.clone()));
        }
        self.distribute_from_fee_pool(ctx, &m.amount, &recipient)?;
        Ok(MsgResponse::Empty)
    }

    fn handle_deposit_validator_rewards_pool(
        &self,
        ctx: &mut Context,
        m: &MsgDepositValidatorRewardsPool,
    ) -> Result<MsgResponse> {
        let depositor = self.account.parse_acc_address(&m.depositor)?;
        let val = self.staking.parse_val_address(&m.validator_address)?;
        let validator = self.staking.validator(ctx, &val).ok_or(DistributionError::NoValidatorExists)?;

        self.bank
            .send_coins_from_account_to_module(ctx, &depositor, &self.config.module_name, &m.amount)?;
        self.allocate_tokens_to_validator(ctx, &validator, &DecCoins::from_coins(&m.amount))?;

        info!(%depositor, validator = %val, amount = %m.amount, "deposited validator rewards pool");
        Ok(MsgResponse::Empty)
    }

    fn handle_update_params(&self, ctx: &mut Context, m: &MsgUpdateParams) -> Result<MsgResponse> {
        self.check_authority(&m.authority)?;
        m.params.validate()?;
        if m.params.has_deprecated_rewards() {
            return Err(DistributionError::InvalidParams(
                "cannot update base or bonus proposer reward because these are deprecated fields".into(),
            ));
        }
        self.set_params(ctx, &m.params)?;

        info!(community_tax = %m.params.community_tax, "updated distribution params");
        Ok(MsgResponse::Empty)
    }
}

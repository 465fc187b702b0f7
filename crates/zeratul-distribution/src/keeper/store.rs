//! Typed accessors over the distribution store

use super::Keeper;
use crate::address::{AccAddress, ConsAddress, ValAddress};
use crate::context::Context;
use crate::error::Result;
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::keys::{self, STORE_KEY};
use crate::store::prefix_end;
use crate::types::{
    DelegatorStartingInfo, FeePool, Params, ValidatorAccumulatedCommission, ValidatorCurrentRewards,
    ValidatorHistoricalRewards, ValidatorOutstandingRewards, ValidatorSlashEvent,
};
use serde::de::DeserializeOwned;

/// Decode every value under `prefix` together with its key
fn collect_prefix<T: DeserializeOwned>(ctx: &Context, prefix: &[u8]) -> Result<Vec<(Vec<u8>, T)>> {
    ctx.kv(STORE_KEY)
        .prefix_iter(prefix)
        .map(|(k, v)| -> Result<(Vec<u8>, T)> { Ok((k.to_vec(), bincode::deserialize(v)?)) })
        .collect()
}

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    // params

    pub fn get_params(&self, ctx: &Context) -> Result<Params> {
        Ok(ctx.kv(STORE_KEY).get_value(keys::PARAMS_KEY)?.unwrap_or_default())
    }

    pub fn set_params(&self, ctx: &mut Context, params: &Params) -> Result<()> {
        ctx.kv_mut(STORE_KEY).set_value(keys::PARAMS_KEY.to_vec(), params)
    }

    // fee pool

    pub fn get_fee_pool(&self, ctx: &Context) -> Result<FeePool> {
        Ok(ctx.kv(STORE_KEY).get_value(keys::FEE_POOL_KEY)?.unwrap_or_default())
    }

    pub fn set_fee_pool(&self, ctx: &mut Context, pool: &FeePool) -> Result<()> {
        ctx.kv_mut(STORE_KEY).set_value(keys::FEE_POOL_KEY.to_vec(), pool)
    }

    // previous proposer

    pub fn get_previous_proposer(&self, ctx: &Context) -> Result<Option<ConsAddress>> {
        ctx.kv(STORE_KEY).get_value(keys::PROPOSER_KEY)
    }

    pub fn set_previous_proposer(&self, ctx: &mut Context, cons: &ConsAddress) -> Result<()> {
        ctx.kv_mut(STORE_KEY).set_value(keys::PROPOSER_KEY.to_vec(), cons)
    }

    // withdraw addresses

    /// Where `del`'s rewards go; the delegator itself unless redirected
    pub fn get_delegator_withdraw_addr(&self, ctx: &Context, del: &AccAddress) -> Result<AccAddress> {
        let stored = ctx.kv(STORE_KEY).get_value(&keys::delegator_withdraw_addr_key(del))?;
        Ok(stored.unwrap_or(*del))
    }

    pub fn set_delegator_withdraw_addr(
        &self,
        ctx: &mut Context,
        del: &AccAddress,
        withdraw: &AccAddress,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::delegator_withdraw_addr_key(del), withdraw)
    }

    pub fn all_delegator_withdraw_addrs(&self, ctx: &Context) -> Result<Vec<(AccAddress, AccAddress)>> {
        collect_prefix::<AccAddress>(ctx, &[keys::DELEGATOR_WITHDRAW_ADDR_PREFIX])?
            .into_iter()
            .map(|(k, withdraw)| -> Result<_> { Ok((keys::parse_withdraw_addr_key(&k)?, withdraw)) })
            .collect()
    }

    // delegator starting info

    pub fn get_delegator_starting_info(
        &self,
        ctx: &Context,
        val: &ValAddress,
        del: &AccAddress,
    ) -> Result<Option<DelegatorStartingInfo>> {
        ctx.kv(STORE_KEY)
            .get_value(&keys::delegator_starting_info_key(val, del))
    }

    pub fn has_delegator_starting_info(&self, ctx: &Context, val: &ValAddress, del: &AccAddress) -> bool {
        ctx.kv(STORE_KEY).has(&keys::delegator_starting_info_key(val, del))
    }

    pub fn set_delegator_starting_info(
        &self,
        ctx: &mut Context,
        val: &ValAddress,
        del: &AccAddress,
        info: &DelegatorStartingInfo,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::delegator_starting_info_key(val, del), info)
    }

    pub fn delete_delegator_starting_info(&self, ctx: &mut Context, val: &ValAddress, del: &AccAddress) {
        ctx.kv_mut(STORE_KEY)
            .delete(&keys::delegator_starting_info_key(val, del));
    }

    pub fn all_delegator_starting_infos(
        &self,
        ctx: &Context,
    ) -> Result<Vec<(ValAddress, AccAddress, DelegatorStartingInfo)>> {
        collect_prefix::<DelegatorStartingInfo>(ctx, &[keys::DELEGATOR_STARTING_INFO_PREFIX])?
            .into_iter()
            .map(|(k, info)| -> Result<_> {
                let (val, del) = keys::parse_starting_info_key(&k)?;
                Ok((val, del, info))
            })
            .collect()
    }

    // historical rewards

    pub fn get_validator_historical_rewards(
        &self,
        ctx: &Context,
        val: &ValAddress,
        period: u64,
    ) -> Result<Option<ValidatorHistoricalRewards>> {
        ctx.kv(STORE_KEY)
            .get_value(&keys::historical_rewards_key(val, period))
    }

    pub fn set_validator_historical_rewards(
        &self,
        ctx: &mut Context,
        val: &ValAddress,
        period: u64,
        rewards: &ValidatorHistoricalRewards,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::historical_rewards_key(val, period), rewards)
    }

    pub fn delete_validator_historical_reward(&self, ctx: &mut Context, val: &ValAddress, period: u64) {
        ctx.kv_mut(STORE_KEY)
            .delete(&keys::historical_rewards_key(val, period));
    }

    pub fn delete_validator_historical_rewards(&self, ctx: &mut Context, val: &ValAddress) {
        ctx.kv_mut(STORE_KEY)
            .delete_prefix(&keys::historical_rewards_prefix(val));
    }

    pub fn all_validator_historical_rewards(
        &self,
        ctx: &Context,
    ) -> Result<Vec<(ValAddress, u64, ValidatorHistoricalRewards)>> {
        collect_prefix::<ValidatorHistoricalRewards>(ctx, &[keys::HISTORICAL_REWARDS_PREFIX])?
            .into_iter()
            .map(|(k, rewards)| -> Result<_> {
                let (val, period) = keys::parse_historical_rewards_key(&k)?;
                Ok((val, period, rewards))
            })
            .collect()
    }

    // current rewards

    pub fn get_validator_current_rewards(
        &self,
        ctx: &Context,
        val: &ValAddress,
    ) -> Result<Option<ValidatorCurrentRewards>> {
        ctx.kv(STORE_KEY).get_value(&keys::current_rewards_key(val))
    }

    pub fn set_validator_current_rewards(
        &self,
        ctx: &mut Context,
        val: &ValAddress,
        rewards: &ValidatorCurrentRewards,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::current_rewards_key(val), rewards)
    }

    pub fn delete_validator_current_rewards(&self, ctx: &mut Context, val: &ValAddress) {
        ctx.kv_mut(STORE_KEY).delete(&keys::current_rewards_key(val));
    }

    pub fn all_validator_current_rewards(&self, ctx: &Context) -> Result<Vec<(ValAddress, ValidatorCurrentRewards)>> {
        collect_prefix::<ValidatorCurrentRewards>(ctx, &[keys::CURRENT_REWARDS_PREFIX])?
            .into_iter()
            .map(|(k, rewards)| -> Result<_> { Ok((keys::parse_validator(&k)?, rewards)) })
            .collect()
    }

    // accumulated commission

    pub fn get_validator_accumulated_commission(
        &self,
        ctx: &Context,
        val: &ValAddress,
    ) -> Result<ValidatorAccumulatedCommission> {
        Ok(ctx
            .kv(STORE_KEY)
            .get_value(&keys::accumulated_commission_key(val))?
            .unwrap_or_default())
    }

    pub fn set_validator_accumulated_commission(
        &self,
        ctx: &mut Context,
        val: &ValAddress,
        commission: &ValidatorAccumulatedCommission,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::accumulated_commission_key(val), commission)
    }

    pub fn delete_validator_accumulated_commission(&self, ctx: &mut Context, val: &ValAddress) {
        ctx.kv_mut(STORE_KEY)
            .delete(&keys::accumulated_commission_key(val));
    }

    pub fn all_validator_accumulated_commissions(
        &self,
        ctx: &Context,
    ) -> Result<Vec<(ValAddress, ValidatorAccumulatedCommission)>> {
        collect_prefix::<ValidatorAccumulatedCommission>(ctx, &[keys::ACCUMULATED_COMMISSION_PREFIX])?
            .into_iter()
            .map(|(k, commission)| -> Result<_> { Ok((keys::parse_validator(&k)?, commission)) })
            .collect()
    }

    // outstanding rewards

    pub fn get_validator_outstanding_rewards(
        &self,
        ctx: &Context,
        val: &ValAddress,
    ) -> Result<ValidatorOutstandingRewards> {
        Ok(ctx
            .kv(STORE_KEY)
            .get_value(&keys::outstanding_rewards_key(val))?
            .unwrap_or_default())
    }

    pub fn set_validator_outstanding_rewards(
        &self,
        ctx: &mut Context,
        val: &ValAddress,
        rewards: &ValidatorOutstandingRewards,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::outstanding_rewards_key(val), rewards)
    }

    pub fn delete_validator_outstanding_rewards(&self, ctx: &mut Context, val: &ValAddress) {
        ctx.kv_mut(STORE_KEY)
            .delete(&keys::outstanding_rewards_key(val));
    }

    pub fn all_validator_outstanding_rewards(
        &self,
        ctx: &Context,
    ) -> Result<Vec<(ValAddress, ValidatorOutstandingRewards)>> {
        collect_prefix::<ValidatorOutstandingRewards>(ctx, &[keys::OUTSTANDING_REWARDS_PREFIX])?
            .into_iter()
            .map(|(k, rewards)| -> Result<_> { Ok((keys::parse_validator(&k)?, rewards)) })
            .collect()
    }

    // slash events

    pub fn get_validator_slash_event(
        &self,
        ctx: &Context,
        val: &ValAddress,
        height: u64,
        period: u64,
    ) -> Result<Option<ValidatorSlashEvent>> {
        ctx.kv(STORE_KEY)
            .get_value(&keys::slash_event_key(val, height, period))
    }

    pub fn set_validator_slash_event(
        &self,
        ctx: &mut Context,
        val: &ValAddress,
        height: u64,
        period: u64,
        event: &ValidatorSlashEvent,
    ) -> Result<()> {
        ctx.kv_mut(STORE_KEY)
            .set_value(keys::slash_event_key(val, height, period), event)
    }

    /// Slash events of `val` with `start <= height <= end`, ordered by
    /// height then period
    pub fn validator_slash_events_between(
        &self,
        ctx: &Context,
        val: &ValAddress,
        start: u64,
        end: u64,
    ) -> Result<Vec<(u64, ValidatorSlashEvent)>> {
        let from = keys::slash_event_key_prefix(val, start);
        let to = end
            .checked_add(1)
            .map(|next| keys::slash_event_key_prefix(val, next))
            .or_else(|| prefix_end(&keys::slash_event_prefix(val)));

        ctx.kv(STORE_KEY)
            .range_iter(from, to)
            .map(|(k, v)| -> Result<_> {
                let (_, height, _) = keys::parse_slash_event_key(k)?;
                Ok((height, bincode::deserialize(v)?))
            })
            .collect()
    }

    pub fn delete_validator_slash_events(&self, ctx: &mut Context, val: &ValAddress) {
        ctx.kv_mut(STORE_KEY)
            .delete_prefix(&keys::slash_event_prefix(val));
    }

    /// Every slash event as (validator, height, event)
    pub fn all_validator_slash_events(&self, ctx: &Context) -> Result<Vec<(ValAddress, u64, ValidatorSlashEvent)>> {
        collect_prefix::<ValidatorSlashEvent>(ctx, &[keys::SLASH_EVENT_PREFIX])?
            .into_iter()
            .map(|(k, event)| -> Result<_> {
                let (val, height, _) = keys::parse_slash_event_key(&k)?;
                Ok((val, height, event))
            })
            .collect()
    }
}

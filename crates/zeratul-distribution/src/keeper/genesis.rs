use super::Keeper;
use crate::coins::DecCoins;
use crate::context::Context;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use crate::genesis::{
    DelegatorStartingInfoRecord, DelegatorWithdrawInfo, GenesisState, ValidatorAccumulatedCommissionRecord,
    ValidatorCurrentRewardsRecord, ValidatorHistoricalRewardsRecord, ValidatorOutstandingRewardsRecord,
    ValidatorSlashEventRecord,
};
use crate::types::{ValidatorAccumulatedCommission, ValidatorOutstandingRewards};
use tracing::info;

impl<A, B, S> Keeper<A, B, S>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    /// Load `genesis` into the store. The module account must already hold
    /// exactly the whole coins the imported ledger owes.
    pub fn init_genesis(&self, ctx: &mut Context, genesis: &GenesisState) -> Result<()> {
        genesis.validate()?;

        self.set_fee_pool(ctx, &genesis.fee_pool)?;
        self.set_params(ctx, &genesis.params)?;

        for info in &genesis.delegator_withdraw_infos {
            self.set_delegator_withdraw_addr(ctx, &info.delegator_address, &info.withdraw_address)?;
        }
        if let Some(proposer) = &genesis.previous_proposer {
            self.set_previous_proposer(ctx, proposer)?;
        }

        let mut holdings = DecCoins::empty();
        for record in &genesis.outstanding_rewards {
            self.set_validator_outstanding_rewards(
                ctx,
                &record.validator_address,
                &ValidatorOutstandingRewards { rewards: record.outstanding_rewards.clone() },
            )?;
            holdings = holdings.add(&record.outstanding_rewards);
        }
        for record in &genesis.validator_accumulated_commissions {
            self.set_validator_accumulated_commission(
                ctx,
                &record.validator_address,
                &ValidatorAccumulatedCommission { commission: record.accumulated.clone() },
            )?;
        }
        for record in &genesis.validator_historical_rewards {
            self.set_validator_historical_rewards(ctx, &record.validator_address, record.period, &record.rewards)?;
        }
        for record in &genesis.validator_current_rewards {
            self.set_validator_current_rewards(ctx, &record.validator_address, &record.rewards)?;
        }
        for record in &genesis.delegator_starting_infos {
            self.set_delegator_starting_info(
                ctx,
                &record.validator_address,
                &record.delegator_address,
                &record.starting_info,
            )?;
        }
        for record in &genesis.validator_slash_events {
            self.set_validator_slash_event(
                ctx,
                &record.validator_address,
                record.height,
                record.period,
                &record.validator_slash_event,
            )?;
        }

        let (expected, _) = holdings.add(&genesis.fee_pool.community_pool).truncate_decimal();
        let balance = self.bank.get_all_balances(ctx, &self.module_address());
        if balance != expected {
            return Err(DistributionError::InvalidGenesis(format!(
                "distribution module balance does not match the module holdings: {} <-> {}",
                balance, expected
            )));
        }

        info!(
            validators = genesis.validator_current_rewards.len(),
            delegations = genesis.delegator_starting_infos.len(),
            "initialized distribution genesis"
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: &Context) -> Result<GenesisState> {
        let delegator_withdraw_infos = self
            .all_delegator_withdraw_addrs(ctx)?
            .into_iter()
            .map(|(delegator_address, withdraw_address)| DelegatorWithdrawInfo {
                delegator_address,
                withdraw_address,
            })
            .collect();

        let outstanding_rewards = self
            .all_validator_outstanding_rewards(ctx)?
            .into_iter()
            .map(|(validator_address, o)| ValidatorOutstandingRewardsRecord {
                validator_address,
                outstanding_rewards: o.rewards,
            })
            .collect();

        let validator_accumulated_commissions = self
            .all_validator_accumulated_commissions(ctx)?
            .into_iter()
            .map(|(validator_address, c)| ValidatorAccumulatedCommissionRecord {
                validator_address,
                accumulated: c.commission,
            })
            .collect();

        let validator_historical_rewards = self
            .all_validator_historical_rewards(ctx)?
            .into_iter()
            .map(|(validator_address, period, rewards)| ValidatorHistoricalRewardsRecord {
                validator_address,
                period,
                rewards,
            })
            .collect();

        let validator_current_rewards = self
            .all_validator_current_rewards(ctx)?
            .into_iter()
            .map(|(validator_address, rewards)| ValidatorCurrentRewardsRecord { validator_address, rewards })
            .collect();

        let delegator_starting_infos = self
            .all_delegator_starting_infos(ctx)?
            .into_iter()
            .map(|(validator_address, delegator_address, starting_info)| DelegatorStartingInfoRecord {
                delegator_address,
                validator_address,
                starting_info,
            })
            .collect();

        let validator_slash_events = self
            .all_validator_slash_events(ctx)?
            .into_iter()
            .map(|(validator_address, height, event)| ValidatorSlashEventRecord {
                validator_address,
                height,
                period: event.validator_period,
                validator_slash_event: event,
            })
            .collect();

        Ok(GenesisState {
            params: self.get_params(ctx)?,
            fee_pool: self.get_fee_pool(ctx)?,
            delegator_withdraw_infos,
            previous_proposer: self.get_previous_proposer(ctx)?,
            outstanding_rewards,
            validator_accumulated_commissions,
            validator_historical_rewards,
            validator_current_rewards,
            delegator_starting_infos,
            validator_slash_events,
        })
    }
}

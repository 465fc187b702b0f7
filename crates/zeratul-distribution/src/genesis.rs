//! Genesis state
//!
//! A full dump of the distribution store. Exporting and importing it again
//! must reproduce the same store.

use crate::address::{AccAddress, ConsAddress, ValAddress};
use crate::coins::DecCoins;
use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use crate::types::{
    DelegatorStartingInfo, FeePool, Params, ValidatorCurrentRewards, ValidatorHistoricalRewards,
    ValidatorSlashEvent,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorWithdrawInfo {
    pub delegator_address: AccAddress,
    pub withdraw_address: AccAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutstandingRewardsRecord {
    pub validator_address: ValAddress,
    pub outstanding_rewards: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAccumulatedCommissionRecord {
    pub validator_address: ValAddress,
    pub accumulated: DecCoins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistoricalRewardsRecord {
    pub validator_address: ValAddress,
    pub period: u64,
    pub rewards: ValidatorHistoricalRewards,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCurrentRewardsRecord {
    pub validator_address: ValAddress,
    pub rewards: ValidatorCurrentRewards,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStartingInfoRecord {
    pub delegator_address: AccAddress,
    pub validator_address: ValAddress,
    pub starting_info: DelegatorStartingInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSlashEventRecord {
    pub validator_address: ValAddress,
    pub height: u64,
    pub period: u64,
    pub validator_slash_event: ValidatorSlashEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub fee_pool: FeePool,
    #[serde(default)]
    pub delegator_withdraw_infos: Vec<DelegatorWithdrawInfo>,
    #[serde(default)]
    pub previous_proposer: Option<ConsAddress>,
    #[serde(default)]
    pub outstanding_rewards: Vec<ValidatorOutstandingRewardsRecord>,
    #[serde(default)]
    pub validator_accumulated_commissions: Vec<ValidatorAccumulatedCommissionRecord>,
    #[serde(default)]
    pub validator_historical_rewards: Vec<ValidatorHistoricalRewardsRecord>,
    #[serde(default)]
    pub validator_current_rewards: Vec<ValidatorCurrentRewardsRecord>,
    #[serde(default)]
    pub delegator_starting_infos: Vec<DelegatorStartingInfoRecord>,
    #[serde(default)]
    pub validator_slash_events: Vec<ValidatorSlashEventRecord>,
}

impl GenesisState {
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        if self.fee_pool.community_pool.is_any_negative() {
            return Err(DistributionError::InvalidGenesis(format!(
                "negative community pool: {}",
                self.fee_pool.community_pool
            )));
        }
        for record in &self.outstanding_rewards {
            if record.outstanding_rewards.is_any_negative() {
                return Err(DistributionError::InvalidGenesis(format!(
                    "negative outstanding rewards for {}",
                    record.validator_address
                )));
            }
        }
        for record in &self.validator_historical_rewards {
            let count = record.rewards.reference_count;
            if count == 0 || count > 2 {
                return Err(DistributionError::InvalidGenesis(format!(
                    "historical rewards of {} period {} have reference count {}",
                    record.validator_address, record.period, count
                )));
            }
        }
        for record in &self.validator_current_rewards {
            if record.rewards.period == 0 {
                return Err(DistributionError::InvalidGenesis(format!(
                    "current rewards of {} at period 0",
                    record.validator_address
                )));
            }
        }
        for record in &self.validator_slash_events {
            let fraction = &record.validator_slash_event.fraction;
            if fraction.is_negative() || *fraction > Dec::one() {
                return Err(DistributionError::InvalidGenesis(format!(
                    "slash fraction {} of {} out of range",
                    fraction, record.validator_address
                )));
            }
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

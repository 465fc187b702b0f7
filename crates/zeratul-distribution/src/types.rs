//! Persisted entities and block inputs

use crate::address::ConsAddress;
use crate::coins::DecCoins;
use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use serde::{Deserialize, Serialize};

/// Module parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Fraction of every block's fees diverted to the community pool
    pub community_tax: Dec,

    /// Deprecated, must be zero on update
    pub base_proposer_reward: Dec,

    /// Deprecated, must be zero on update
    pub bonus_proposer_reward: Dec,

    /// Whether delegators may redirect their rewards
    pub withdraw_addr_enabled: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            community_tax: Dec::with_prec(2, 2),
            base_proposer_reward: Dec::zero(),
            bonus_proposer_reward: Dec::zero(),
            withdraw_addr_enabled: true,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<()> {
        validate_community_tax(&self.community_tax)?;
        for (name, value) in [
            ("base proposer reward", &self.base_proposer_reward),
            ("bonus proposer reward", &self.bonus_proposer_reward),
        ] {
            if value.is_negative() {
                return Err(DistributionError::InvalidParams(format!(
                    "{} must be positive: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn has_deprecated_rewards(&self) -> bool {
        !self.base_proposer_reward.is_zero() || !self.bonus_proposer_reward.is_zero()
    }
}

pub fn validate_community_tax(tax: &Dec) -> Result<()> {
    if tax.is_negative() {
        return Err(DistributionError::InvalidParams(format!(
            "community tax must be positive: {}",
            tax
        )));
    }
    if *tax > Dec::one() {
        return Err(DistributionError::InvalidParams(format!(
            "community tax too large: {}",
            tax
        )));
    }
    Ok(())
}

/// Community pool ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePool {
    pub community_pool: DecCoins,
}

/// Everything still owed out of a validator's allocations: unwithdrawn
/// commission plus unwithdrawn delegator rewards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorOutstandingRewards {
    pub rewards: DecCoins,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorAccumulatedCommission {
    pub commission: DecCoins,
}

/// Rewards credited during the open period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorCurrentRewards {
    pub rewards: DecCoins,
    pub period: u64,
}

/// Snapshot taken when a period closes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorHistoricalRewards {
    /// Rewards per unit of stake from validator creation through this period
    pub cumulative_reward_ratio: DecCoins,

    /// Anchors still pointing at this snapshot, at most 2
    pub reference_count: u32,
}

/// Where a delegation's reward claim starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStartingInfo {
    /// Period closed by the bond, the start of the claim
    pub previous_period: u64,

    /// Tokens backing the delegation at that point, truncated
    pub stake: Dec,

    /// Block height the claim started at
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSlashEvent {
    /// Period closed by the slash
    pub validator_period: u64,
    pub fraction: Dec,
}

/// How a validator took part in the last commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockIdFlag {
    Commit,
    Absent,
    Nil,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInfo {
    pub validator: ConsAddress,
    pub power: u64,
    pub block_id_flag: BlockIdFlag,
}

impl VoteInfo {
    pub fn commit(validator: ConsAddress, power: u64) -> Self {
        Self { validator, power, block_id_flag: BlockIdFlag::Commit }
    }
}

/// Votes of the previous block as reported by consensus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub votes: Vec<VoteInfo>,
}

impl CommitInfo {
    pub fn total_power(&self) -> u128 {
        self.votes.iter().map(|v| v.power as u128).sum()
    }
}

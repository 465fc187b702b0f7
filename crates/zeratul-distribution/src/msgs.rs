//! Transaction messages
//!
//! Addresses travel as strings and are decoded with the account and staking
//! address codecs when handled.

use crate::coins::Coins;
use crate::error::{DistributionError, Result};
use crate::types::Params;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetWithdrawAddress {
    pub delegator_address: String,
    pub withdraw_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdrawDelegatorReward {
    pub delegator_address: String,
    pub validator_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgWithdrawValidatorCommission {
    pub validator_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgFundCommunityPool {
    pub depositor: String,
    pub amount: Coins,
}

/// Authority-gated payout from the community pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCommunityPoolSpend {
    pub authority: String,
    pub recipient: String,
    pub amount: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgDepositValidatorRewardsPool {
    pub depositor: String,
    pub validator_address: String,
    pub amount: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: String,
    pub params: Params,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    SetWithdrawAddress(MsgSetWithdrawAddress),
    WithdrawDelegatorReward(MsgWithdrawDelegatorReward),
    WithdrawValidatorCommission(MsgWithdrawValidatorCommission),
    FundCommunityPool(MsgFundCommunityPool),
    CommunityPoolSpend(MsgCommunityPoolSpend),
    DepositValidatorRewardsPool(MsgDepositValidatorRewardsPool),
    UpdateParams(MsgUpdateParams),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MsgResponse {
    Empty,
    /// Coins actually paid out by a withdrawal
    Withdrawn(Coins),
}

impl Msg {
    /// Stateless checks, run before the message touches any store
    pub fn validate_basic(&self) -> Result<()> {
        match self {
            Msg::SetWithdrawAddress(m) => {
                require(&m.delegator_address, DistributionError::EmptyDelegatorAddr)?;
                require(&m.withdraw_address, DistributionError::EmptyWithdrawAddr)
            }
            Msg::WithdrawDelegatorReward(m) => {
                require(&m.delegator_address, DistributionError::EmptyDelegatorAddr)?;
                require(&m.validator_address, DistributionError::EmptyValidatorAddr)
            }
            Msg::WithdrawValidatorCommission(m) => {
                require(&m.validator_address, DistributionError::EmptyValidatorAddr)
            }
            Msg::FundCommunityPool(m) => {
                if m.depositor.is_empty() {
                    return Err(DistributionError::InvalidAddress("invalid depositor address: empty".into()));
                }
                non_empty_amount(&m.amount, DistributionError::InvalidCoins(m.amount.to_string()))
            }
            Msg::CommunityPoolSpend(m) => {
                require(&m.recipient, DistributionError::EmptyProposalRecipient)?;
                non_empty_amount(&m.amount, DistributionError::InvalidProposalAmount)
            }
            Msg::DepositValidatorRewardsPool(m) => {
                if m.depositor.is_empty() {
                    return Err(DistributionError::InvalidAddress("invalid depositor address: empty".into()));
                }
                require(&m.validator_address, DistributionError::EmptyValidatorAddr)?;
                non_empty_amount(&m.amount, DistributionError::InvalidCoins(m.amount.to_string()))
            }
            // params are checked by the handler once the authority is known good
            Msg::UpdateParams(_) => Ok(()),
        }
    }
}

fn require(field: &str, err: DistributionError) -> Result<()> {
    if field.is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

fn non_empty_amount(amount: &Coins, err: DistributionError) -> Result<()> {
    if amount.is_empty() {
        Err(err)
    } else {
        Ok(())
    }
}

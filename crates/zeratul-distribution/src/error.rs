//! error types for the distribution engine

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributionError {
    #[error("empty delegator address")]
    EmptyDelegatorAddr,

    #[error("empty validator address")]
    EmptyValidatorAddr,

    #[error("empty withdraw address")]
    EmptyWithdrawAddr,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("validator does not exist")]
    NoValidatorExists,

    #[error("delegation does not exist")]
    NoDelegationExists,

    #[error("no validator commission to withdraw")]
    NoValidatorCommission,

    #[error("set withdraw address disabled")]
    SetWithdrawAddrDisabled,

    #[error("community pool does not have sufficient coins to distribute")]
    BadDistribution,

    #[error("invalid community pool spend proposal amount")]
    InvalidProposalAmount,

    #[error("invalid community pool spend proposal recipient")]
    EmptyProposalRecipient,

    #[error("invalid authority; expected {expected}, got {got}")]
    InvalidAuthority { expected: String, got: String },

    #[error("{0} is not allowed to receive funds")]
    Unauthorized(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("insufficient funds: {0}")]
    InsufficientFunds(String),

    #[error("starting height greater than ending height ({start} > {end})")]
    InvalidSlashRange { start: u64, end: u64 },

    #[error("invalid genesis: {0}")]
    InvalidGenesis(String),

    #[error("codec error: {0}")]
    Codec(String),
}

impl From<bincode::Error> for DistributionError {
    fn from(e: bincode::Error) -> Self {
        DistributionError::Codec(e.to_string())
    }
}

impl From<serde_json::Error> for DistributionError {
    fn from(e: serde_json::Error) -> Self {
        DistributionError::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DistributionError>;

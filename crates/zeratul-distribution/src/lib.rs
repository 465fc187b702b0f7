//! F1 fee distribution for proof-of-stake validators
//!
//! Every block a stream of fees flows into the fee collector. This crate splits
//! it among the bonded validators by voting power, takes each validator's
//! commission off the top and lets delegators withdraw their pro-rata share at
//! any time, across any number of intervening slashes, bonds and unbonds.
//!
//! ## How it works
//!
//! Each validator keeps a monotonically increasing **period**. When a period
//! closes we snapshot the cumulative reward ratio (rewards per unit of stake
//! since validator creation). A delegation only stores the period it started
//! in and its stake, so what it is owed is
//!
//! ```text
//! stake · (ratio[end] − ratio[start])
//! ```
//!
//! independent of how many periods elapsed. Slashes break the constant-stake
//! assumption, so they are logged and walked at withdrawal time.
//!
//! ```text
//!   fee collector ──sweep──► distribution escrow
//!                                  │
//!            community tax ◄───────┤
//!                                  ▼
//!                      per-validator reward (by power)
//!                        │                    │
//!                   commission          current rewards ──close──► historical[p]
//!                        │                                             │
//!              withdraw commission                      withdraw delegator reward
//! ```
//!
//! Historical snapshots are reference counted; a snapshot is deleted as soon
//! as nothing anchors to it, which keeps storage bounded.
//!
//! The engine never owns validators, delegations or balances. It talks to the
//! staking, bank and account collaborators through the traits in [`expected`],
//! and staking drives it through [`StakingHooks`].

pub mod address;
pub mod coins;
pub mod context;
pub mod decimal;
pub mod error;
pub mod expected;
pub mod genesis;
pub mod keeper;
pub mod keys;
pub mod mock;
pub mod msgs;
pub mod store;
pub mod types;

pub use address::{AccAddress, ConsAddress, ValAddress, ADDRESS_LEN};
pub use coins::{Coin, Coins, DecCoin, DecCoins};
pub use context::{Context, Event};
pub use decimal::Dec;
pub use error::{DistributionError, Result};
pub use expected::{AccountKeeper, BankKeeper, Delegation, StakingHooks, StakingKeeper, Validator};
pub use genesis::GenesisState;
pub use keeper::{invariants, Keeper, KeeperConfig};
pub use msgs::{Msg, MsgResponse};
pub use types::{
    BlockIdFlag, CommitInfo, DelegatorStartingInfo, FeePool, Params, ValidatorAccumulatedCommission,
    ValidatorCurrentRewards, ValidatorHistoricalRewards, ValidatorOutstandingRewards,
    ValidatorSlashEvent, VoteInfo,
};

/// Name of the distribution module account holding the reward escrow
pub const MODULE_NAME: &str = "distribution";

/// Name of the module account that collects block fees
pub const FEE_COLLECTOR_NAME: &str = "fee_collector";

/// Denom used when an event needs to report a zero payout
pub const DEFAULT_BOND_DENOM: &str = "stake";

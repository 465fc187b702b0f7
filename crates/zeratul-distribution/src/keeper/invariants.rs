//! Cross-entity consistency checks
//!
//! Each check returns a report instead of panicking, so a caller can decide
//! whether a broken invariant halts the chain or only gets logged.

use super::Keeper;
use crate::coins::DecCoins;
use crate::context::Context;
use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, StakingKeeper};
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantReport {
    pub name: &'static str,
    pub broken: bool,
    pub message: String,
}

impl InvariantReport {
    fn new(name: &'static str, broken: bool, message: String) -> Self {
        Self { name, broken, message }
    }
}

/// No validator owes a negative amount of anything
pub fn nonnegative_outstanding<A, B, S>(keeper: &Keeper<A, B, S>, ctx: &Context) -> Result<InvariantReport>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    let mut msg = String::new();
    let mut count = 0;
    for (val, outstanding) in keeper.all_validator_outstanding_rewards(ctx)? {
        if outstanding.rewards.is_any_negative() {
            count += 1;
            let _ = writeln!(msg, "\t{} has negative outstanding coins: {}", val, outstanding.rewards);
        }
    }
    Ok(InvariantReport::new(
        "nonnegative outstanding",
        count != 0,
        format!("found {} validators with negative outstanding rewards\n{}", count, msg),
    ))
}

/// Withdrawing every commission and every delegation on a fork succeeds and
/// leaves at most one unit of dust per denom
pub fn can_withdraw<A, B, S>(keeper: &Keeper<A, B, S>, ctx: &Context) -> Result<InvariantReport>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    let mut fork = ctx.branch();
    let staking = keeper.staking_keeper();
    let one = Dec::one();

    for validator in staking.validators(&fork) {
        let val = validator.operator;
        match keeper.withdraw_validator_commission(&mut fork, &val) {
            Ok(_) | Err(DistributionError::NoValidatorCommission) => {}
            Err(e) => {
                return Ok(InvariantReport::new(
                    "can withdraw",
                    true,
                    format!("commission withdrawal of {} failed: {}", val, e),
                ));
            }
        }

        let delegations: Vec<_> = staking
            .all_delegations(&fork)
            .into_iter()
            .filter(|d| d.validator == val)
            .collect();
        for delegation in delegations {
            let current = staking.validator(&fork, &val).unwrap_or_else(|| validator.clone());
            if let Err(e) = keeper.withdraw_delegation_rewards_inner(&mut fork, &current, &delegation) {
                return Ok(InvariantReport::new(
                    "can withdraw",
                    true,
                    format!("withdrawal of {} from {} failed: {}", delegation.delegator, val, e),
                ));
            }
        }

        let remaining = keeper.get_validator_outstanding_rewards(&fork, &val)?.rewards;
        let bad = remaining
            .iter()
            .find(|c| c.amount.is_negative() || c.amount > one);
        if let Some(coin) = bad {
            return Ok(InvariantReport::new(
                "can withdraw",
                true,
                format!("validator {} left with {} after withdrawing everything", val, coin),
            ));
        }
    }

    Ok(InvariantReport::new("can withdraw", false, String::new()))
}

/// Historical reference counts add up to one anchor per validator, per
/// delegation and per slash event
pub fn reference_count<A, B, S>(keeper: &Keeper<A, B, S>, ctx: &Context) -> Result<InvariantReport>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    let staking = keeper.staking_keeper();
    let validators = staking.validators(ctx).len();
    let delegations = staking.all_delegations(ctx).len();
    let slashes = keeper.all_validator_slash_events(ctx)?.len();
    let expected = validators + delegations + slashes;

    let historical = keeper.all_validator_historical_rewards(ctx)?;
    let count: usize = historical.iter().map(|(_, _, h)| h.reference_count as usize).sum();
    let mut msg = format!(
        "expected historical reference count: {} = {} validators + {} delegations + {} slashes\n\
         total validator historical reference count: {}\n",
        expected, validators, delegations, slashes, count
    );

    let mut broken = count != expected;
    for (val, period, record) in &historical {
        if record.reference_count == 0 || record.reference_count > 2 {
            broken = true;
            let _ = writeln!(msg, "\t{} period {} has reference count {}", val, period, record.reference_count);
        }
    }

    Ok(InvariantReport::new("reference count", broken, msg))
}

/// The module account holds exactly the whole-coin part of everything the
/// ledger says it owes
pub fn module_account<A, B, S>(keeper: &Keeper<A, B, S>, ctx: &Context) -> Result<InvariantReport>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    let mut expected = DecCoins::empty();
    for (_, outstanding) in keeper.all_validator_outstanding_rewards(ctx)? {
        expected = expected.add(&outstanding.rewards);
    }
    let community_pool = keeper.get_fee_pool(ctx)?.community_pool;
    let (expected_coins, _) = expected.add(&community_pool).truncate_decimal();

    let balance = keeper.bank_keeper().get_all_balances(ctx, &keeper.module_address());
    let broken = balance != expected_coins;

    Ok(InvariantReport::new(
        "module account coins",
        broken,
        format!(
            "\texpected module account coins: {}\n\tdistribution module account coins: {}\n",
            expected_coins, balance
        ),
    ))
}

/// Run every check in a fixed order
pub fn all_invariants<A, B, S>(keeper: &Keeper<A, B, S>, ctx: &Context) -> Result<Vec<InvariantReport>>
where
    A: AccountKeeper,
    B: BankKeeper,
    S: StakingKeeper,
{
    Ok(vec![
        nonnegative_outstanding(keeper, ctx)?,
        can_withdraw(keeper, ctx)?,
        reference_count(keeper, ctx)?,
        module_account(keeper, ctx)?,
    ])
}

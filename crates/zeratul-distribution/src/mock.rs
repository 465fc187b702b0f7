//! In-memory staking, bank and account modules
//!
//! Small but faithful stand-ins for the collaborators in [`crate::expected`].
//! They keep their state in the same [`Context`] as the distribution store,
//! so branching a context forks the whole chain. [`SimApp`] wires them to a
//! keeper and drives blocks for tests and simulations.

use crate::address::{module_address, AccAddress, ConsAddress, ValAddress};
use crate::coins::{Coins, DecCoins};
use crate::context::Context;
use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use crate::expected::{AccountKeeper, BankKeeper, Delegation, StakingHooks, StakingKeeper, Validator};
use crate::genesis::GenesisState;
use crate::keeper::invariants::{self, InvariantReport};
use crate::keeper::{Keeper, KeeperConfig};
use crate::msgs::{Msg, MsgResponse};
use crate::types::{CommitInfo, Params, VoteInfo};
use crate::{FEE_COLLECTOR_NAME, MODULE_NAME};
use std::collections::BTreeSet;
use tracing::debug;

pub const BANK_STORE: &str = "bank";
pub const STAKING_STORE: &str = "staking";

const VALIDATOR_PREFIX: u8 = 0x21;
const CONS_INDEX_PREFIX: u8 = 0x22;
const DELEGATION_PREFIX: u8 = 0x23;

/// Seconds between simulated blocks
const BLOCK_TIME: u64 = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockAccountKeeper;

impl AccountKeeper for MockAccountKeeper {
    fn module_address(&self, name: &str) -> AccAddress {
        module_address(name)
    }
}

/// Balances live in the `bank` store keyed by raw address
#[derive(Debug, Clone)]
pub struct MockBankKeeper {
    blocked: BTreeSet<AccAddress>,
}

impl Default for MockBankKeeper {
    /// Module accounts may not receive external funds
    fn default() -> Self {
        Self::with_blocked([module_address(MODULE_NAME), module_address(FEE_COLLECTOR_NAME)])
    }
}

impl MockBankKeeper {
    pub fn with_blocked(blocked: impl IntoIterator<Item = AccAddress>) -> Self {
        Self { blocked: blocked.into_iter().collect() }
    }

    fn balance(&self, ctx: &Context, addr: &AccAddress) -> Result<Coins> {
        Ok(ctx.kv(BANK_STORE).get_value(addr.as_bytes())?.unwrap_or_default())
    }

    fn set_balance(&self, ctx: &mut Context, addr: &AccAddress, coins: &Coins) -> Result<()> {
        let store = ctx.kv_mut(BANK_STORE);
        if coins.is_empty() {
            store.delete(addr.as_bytes());
            return Ok(());
        }
        store.set_value(addr.as_bytes().to_vec(), coins)
    }

    /// Create coins out of thin air
    pub fn mint(&self, ctx: &mut Context, addr: &AccAddress, amount: &Coins) -> Result<()> {
        let balance = self.balance(ctx, addr)?.add(amount);
        self.set_balance(ctx, addr, &balance)
    }

    fn send(&self, ctx: &mut Context, from: &AccAddress, to: &AccAddress, amount: &Coins) -> Result<()> {
        if amount.is_empty() {
            return Ok(());
        }
        let from_balance = self.balance(ctx, from)?;
        let remaining = from_balance.checked_sub(amount).ok_or_else(|| {
            DistributionError::InsufficientFunds(format!("{} is smaller than {}", from_balance, amount))
        })?;
        self.set_balance(ctx, from, &remaining)?;

        let to_balance = self.balance(ctx, to)?.add(amount);
        self.set_balance(ctx, to, &to_balance)
    }
}

impl BankKeeper for MockBankKeeper {
    fn send_coins_from_account_to_module(
        &self,
        ctx: &mut Context,
        from: &AccAddress,
        module: &str,
        amount: &Coins,
    ) -> Result<()> {
        self.send(ctx, from, &module_address(module), amount)
    }

    fn send_coins_from_module_to_account(
        &self,
        ctx: &mut Context,
        module: &str,
        to: &AccAddress,
        amount: &Coins,
    ) -> Result<()> {
        self.send(ctx, &module_address(module), to, amount)
    }

    fn send_coins_from_module_to_module(
        &self,
        ctx: &mut Context,
        from_module: &str,
        to_module: &str,
        amount: &Coins,
    ) -> Result<()> {
        self.send(ctx, &module_address(from_module), &module_address(to_module), amount)
    }

    fn get_all_balances(&self, ctx: &Context, addr: &AccAddress) -> Coins {
        // a balance that fails to decode is treated as empty
        self.balance(ctx, addr).unwrap_or_default()
    }

    fn blocked_addr(&self, addr: &AccAddress) -> bool {
        self.blocked.contains(addr)
    }
}

fn validator_key(val: &ValAddress) -> Vec<u8> {
    let mut key = vec![VALIDATOR_PREFIX];
    key.extend_from_slice(val.as_bytes());
    key
}

fn cons_index_key(cons: &ConsAddress) -> Vec<u8> {
    let mut key = vec![CONS_INDEX_PREFIX];
    key.extend_from_slice(cons.as_bytes());
    key
}

fn delegator_prefix(del: &AccAddress) -> Vec<u8> {
    let mut key = vec![DELEGATION_PREFIX];
    key.extend_from_slice(del.as_bytes());
    key
}

fn delegation_key(del: &AccAddress, val: &ValAddress) -> Vec<u8> {
    let mut key = delegator_prefix(del);
    key.extend_from_slice(val.as_bytes());
    key
}

/// Validators and delegations live in the `staking` store. Bonded tokens are
/// only counted here, they never move through the bank.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockStakingKeeper;

impl MockStakingKeeper {
    fn decode_all<T: serde::de::DeserializeOwned>(ctx: &Context, prefix: u8) -> Vec<T> {
        ctx.kv(STAKING_STORE)
            .prefix_iter(&[prefix])
            .filter_map(|(_, v)| bincode::deserialize(v).ok())
            .collect()
    }

    fn set_validator(&self, ctx: &mut Context, validator: &Validator) -> Result<()> {
        ctx.kv_mut(STAKING_STORE)
            .set_value(validator_key(&validator.operator), validator)
    }

    fn set_delegation(&self, ctx: &mut Context, delegation: &Delegation) -> Result<()> {
        ctx.kv_mut(STAKING_STORE)
            .set_value(delegation_key(&delegation.delegator, &delegation.validator), delegation)
    }

    fn must_validator(&self, ctx: &Context, val: &ValAddress) -> Result<Validator> {
        self.validator(ctx, val).ok_or(DistributionError::NoValidatorExists)
    }

    pub fn create_validator<H: StakingHooks>(
        &self,
        ctx: &mut Context,
        hooks: &H,
        operator: ValAddress,
        cons_address: ConsAddress,
        commission_rate: Dec,
        self_bond: u128,
    ) -> Result<()> {
        if self.validator(ctx, &operator).is_some() {
            return Err(DistributionError::InvalidAddress(format!("validator {} already exists", operator)));
        }
        let validator = Validator {
            operator,
            cons_address,
            tokens: 0,
            delegator_shares: Dec::zero(),
            commission_rate,
        };
        self.set_validator(ctx, &validator)?;
        ctx.kv_mut(STAKING_STORE)
            .set_value(cons_index_key(&cons_address), &operator)?;
        hooks.after_validator_created(ctx, &operator)?;

        self.delegate(ctx, hooks, AccAddress::from(operator), operator, self_bond)?;
        Ok(())
    }

    /// Bond `amount` tokens and return the shares issued
    pub fn delegate<H: StakingHooks>(
        &self,
        ctx: &mut Context,
        hooks: &H,
        del: AccAddress,
        val: ValAddress,
        amount: u128,
    ) -> Result<Dec> {
        if amount == 0 {
            return Err(DistributionError::InvalidCoins("delegation amount must be positive".into()));
        }
        let existing = self.delegation(ctx, &del, &val);
        match existing {
            Some(_) => hooks.before_delegation_shares_modified(ctx, &del, &val)?,
            None => hooks.before_delegation_created(ctx, &del, &val)?,
        }

        let mut validator = self.must_validator(ctx, &val)?;
        let shares = validator
            .shares_from_tokens(amount)
            .ok_or_else(|| DistributionError::InsufficientFunds(format!("validator {} has no tokens", val)))?;
        validator.tokens += amount;
        validator.delegator_shares += &shares;
        self.set_validator(ctx, &validator)?;

        let mut delegation = existing.unwrap_or(Delegation {
            delegator: del,
            validator: val,
            shares: Dec::zero(),
        });
        delegation.shares += &shares;
        self.set_delegation(ctx, &delegation)?;

        hooks.after_delegation_modified(ctx, &del, &val)?;
        debug!(delegator = %del, validator = %val, amount, "delegated");
        Ok(shares)
    }

    /// Unbond up to `shares` and return the tokens released.
    ///
    /// Only whole tokens leave, and only the shares that back them exactly are
    /// burned, so the exchange rate seen by the remaining holders never moves.
    /// Shares worth less than one token stay bonded until the validator is
    /// removed; the last holder of a validator takes every token left.
    pub fn undelegate<H: StakingHooks>(
        &self,
        ctx: &mut Context,
        hooks: &H,
        del: AccAddress,
        val: ValAddress,
        shares: &Dec,
    ) -> Result<u128> {
        let mut delegation = self
            .delegation(ctx, &del, &val)
            .ok_or(DistributionError::NoDelegationExists)?;
        if !shares.is_positive() || *shares > delegation.shares {
            return Err(DistributionError::InsufficientFunds(format!(
                "cannot unbond {} shares out of {}",
                shares, delegation.shares
            )));
        }

        let mut validator = self.must_validator(ctx, &val)?;
        let (released, burned_shares) = if *shares == validator.delegator_shares {
            (validator.tokens, shares.clone())
        } else {
            let released = validator
                .tokens_from_shares_truncated(shares)
                .truncate_u128()
                .unwrap_or(0)
                .min(validator.tokens);
            if released == 0 {
                debug!(delegator = %del, validator = %val, %shares, "unbond worth less than a token");
                return Ok(0);
            }
            let burned = validator.shares_for_tokens_round_up(released);
            (released, std::cmp::min(burned, shares.clone()))
        };

        hooks.before_delegation_shares_modified(ctx, &del, &val)?;

        validator.delegator_shares -= &burned_shares;
        validator.tokens -= released;
        self.set_validator(ctx, &validator)?;

        delegation.shares -= &burned_shares;
        if delegation.shares.is_zero() {
            hooks.before_delegation_removed(ctx, &del, &val)?;
            ctx.kv_mut(STAKING_STORE).delete(&delegation_key(&del, &val));
        } else {
            self.set_delegation(ctx, &delegation)?;
            hooks.after_delegation_modified(ctx, &del, &val)?;
        }

        debug!(delegator = %del, validator = %val, released, shares = %burned_shares, "undelegated");
        Ok(released)
    }

    /// Burn `fraction` of the validator's tokens and return the amount burned.
    ///
    /// Only whole tokens burn. Hooks see the fraction actually burned, rounded
    /// up, so no delegation is ever credited stake that was not burned.
    pub fn slash<H: StakingHooks>(&self, ctx: &mut Context, hooks: &H, val: ValAddress, fraction: &Dec) -> Result<u128> {
        let mut validator = self.must_validator(ctx, &val)?;
        let burned = validator
            .tokens_dec()
            .mul_truncate(fraction)
            .truncate_u128()
            .unwrap_or(0)
            .min(validator.tokens);
        if burned == 0 {
            debug!(validator = %val, %fraction, "slash burns nothing");
            return Ok(0);
        }

        let effective = Dec::from_u128(burned).quo_int_round_up(validator.tokens);
        hooks.before_validator_slashed(ctx, &val, &effective)?;

        validator.tokens -= burned;
        self.set_validator(ctx, &validator)?;

        debug!(validator = %val, %fraction, %effective, burned, "slashed");
        Ok(burned)
    }

    /// Delete a validator. Delegations still bonded must each be worth less
    /// than one token; they are unbonded for nothing first.
    pub fn remove_validator<H: StakingHooks>(&self, ctx: &mut Context, hooks: &H, val: ValAddress) -> Result<()> {
        let validator = self.must_validator(ctx, &val)?;
        let remaining: Vec<Delegation> = self
            .all_delegations(ctx)
            .into_iter()
            .filter(|d| d.validator == val)
            .collect();
        if remaining
            .iter()
            .any(|d| validator.tokens_from_shares(&d.shares) >= Dec::one())
        {
            return Err(DistributionError::InvalidAddress(format!(
                "validator {} still has delegations",
                val
            )));
        }

        for delegation in &remaining {
            hooks.before_delegation_removed(ctx, &delegation.delegator, &val)?;
            ctx.kv_mut(STAKING_STORE)
                .delete(&delegation_key(&delegation.delegator, &val));
        }

        let store = ctx.kv_mut(STAKING_STORE);
        store.delete(&validator_key(&val));
        store.delete(&cons_index_key(&validator.cons_address));

        debug!(validator = %val, dust = remaining.len(), "removed validator");
        hooks.after_validator_removed(ctx, &validator.cons_address, &val)
    }
}

impl StakingKeeper for MockStakingKeeper {
    fn validator(&self, ctx: &Context, val: &ValAddress) -> Option<Validator> {
        ctx.kv(STAKING_STORE).get_value(&validator_key(val)).ok().flatten()
    }

    fn validator_by_cons_addr(&self, ctx: &Context, cons: &ConsAddress) -> Option<Validator> {
        let val: ValAddress = ctx.kv(STAKING_STORE).get_value(&cons_index_key(cons)).ok().flatten()?;
        self.validator(ctx, &val)
    }

    fn delegation(&self, ctx: &Context, del: &AccAddress, val: &ValAddress) -> Option<Delegation> {
        ctx.kv(STAKING_STORE)
            .get_value(&delegation_key(del, val))
            .ok()
            .flatten()
    }

    fn validators(&self, ctx: &Context) -> Vec<Validator> {
        Self::decode_all(ctx, VALIDATOR_PREFIX)
    }

    fn delegator_delegations(&self, ctx: &Context, del: &AccAddress) -> Vec<Delegation> {
        ctx.kv(STAKING_STORE)
            .prefix_iter(&delegator_prefix(del))
            .filter_map(|(_, v)| bincode::deserialize(v).ok())
            .collect()
    }

    fn all_delegations(&self, ctx: &Context) -> Vec<Delegation> {
        Self::decode_all(ctx, DELEGATION_PREFIX)
    }
}

pub type SimKeeper = Keeper<MockAccountKeeper, MockBankKeeper, MockStakingKeeper>;

/// A chain with only staking, bank and distribution, driven block by block
pub struct SimApp {
    pub keeper: SimKeeper,
    pub staking: MockStakingKeeper,
    pub bank: MockBankKeeper,
    pub ctx: Context,
}

impl Default for SimApp {
    fn default() -> Self {
        Self::with_config(MockBankKeeper::default(), KeeperConfig::default())
    }
}

impl SimApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(bank: MockBankKeeper, config: KeeperConfig) -> Self {
        let keeper = Keeper::new(MockAccountKeeper, bank.clone(), MockStakingKeeper, config);
        Self {
            keeper,
            staking: MockStakingKeeper,
            bank,
            ctx: Context::new(1, 0),
        }
    }

    /// Fresh app whose distribution store is loaded from `genesis`
    pub fn with_genesis(genesis: &GenesisState, module_balance: &Coins) -> Result<Self> {
        let mut app = Self::new();
        let module = app.keeper.module_address();
        app.bank.mint(&mut app.ctx, &module, module_balance)?;
        app.keeper.init_genesis(&mut app.ctx, genesis)?;
        Ok(app)
    }

    pub fn height(&self) -> u64 {
        self.ctx.block_height()
    }

    pub fn params(&self) -> Result<Params> {
        self.keeper.get_params(&self.ctx)
    }

    pub fn set_params(&mut self, params: &Params) -> Result<()> {
        self.keeper.set_params(&mut self.ctx, params)
    }

    pub fn balance(&self, addr: &AccAddress) -> Coins {
        self.bank.get_all_balances(&self.ctx, addr)
    }

    pub fn module_balance(&self) -> Coins {
        self.balance(&self.keeper.module_address())
    }

    pub fn fund_account(&mut self, addr: &AccAddress, amount: &Coins) -> Result<()> {
        self.bank.mint(&mut self.ctx, addr, amount)
    }

    pub fn fund_fee_collector(&mut self, amount: &Coins) -> Result<()> {
        let collector = module_address(&self.keeper.config().fee_collector_name);
        self.bank.mint(&mut self.ctx, &collector, amount)
    }

    /// Mint `amount` into the distribution account and credit it straight to
    /// one validator, bypassing the fee collector
    pub fn allocate_to_validator(&mut self, val: &ValAddress, amount: &Coins) -> Result<()> {
        let keeper = &self.keeper;
        let bank = &self.bank;
        self.ctx.run_atomic(|ctx| {
            let validator = keeper
                .staking_keeper()
                .validator(ctx, val)
                .ok_or(DistributionError::NoValidatorExists)?;
            bank.mint(ctx, &keeper.module_address(), amount)?;
            keeper.allocate_tokens_to_validator(ctx, &validator, &DecCoins::from_coins(amount))
        })
    }

    pub fn create_validator(
        &mut self,
        operator: ValAddress,
        cons: ConsAddress,
        commission_rate: Dec,
        self_bond: u128,
    ) -> Result<()> {
        let (staking, keeper) = (&self.staking, &self.keeper);
        self.ctx
            .run_atomic(|ctx| staking.create_validator(ctx, keeper, operator, cons, commission_rate, self_bond))
    }

    pub fn delegate(&mut self, del: AccAddress, val: ValAddress, amount: u128) -> Result<Dec> {
        let (staking, keeper) = (&self.staking, &self.keeper);
        self.ctx.run_atomic(|ctx| staking.delegate(ctx, keeper, del, val, amount))
    }

    pub fn undelegate(&mut self, del: AccAddress, val: ValAddress, shares: &Dec) -> Result<u128> {
        let (staking, keeper) = (&self.staking, &self.keeper);
        self.ctx.run_atomic(|ctx| staking.undelegate(ctx, keeper, del, val, shares))
    }

    pub fn slash(&mut self, val: ValAddress, fraction: &Dec) -> Result<u128> {
        let (staking, keeper) = (&self.staking, &self.keeper);
        self.ctx.run_atomic(|ctx| staking.slash(ctx, keeper, val, fraction))
    }

    pub fn remove_validator(&mut self, val: ValAddress) -> Result<()> {
        let (staking, keeper) = (&self.staking, &self.keeper);
        self.ctx.run_atomic(|ctx| staking.remove_validator(ctx, keeper, val))
    }

    pub fn deliver(&mut self, msg: Msg) -> Result<MsgResponse> {
        self.keeper.handle(&mut self.ctx, &msg)
    }

    /// Advance one block and run begin-block with the given commit
    pub fn begin_block(&mut self, proposer: ConsAddress, last_commit: &CommitInfo) -> Result<()> {
        let height = self.ctx.block_height() + 1;
        let time = self.ctx.block_time() + BLOCK_TIME;
        self.ctx.set_block(height, time);

        let keeper = &self.keeper;
        self.ctx
            .run_atomic(|ctx| keeper.begin_block(ctx, &proposer, last_commit))
    }

    /// Commit votes from every validator with tokens, power = tokens
    pub fn current_commit(&self) -> CommitInfo {
        let votes = self
            .staking
            .validators(&self.ctx)
            .into_iter()
            .filter(|v| v.tokens > 0)
            .map(|v| VoteInfo::commit(v.cons_address, u64::try_from(v.tokens).unwrap_or(u64::MAX)))
            .collect();
        CommitInfo { votes }
    }

    /// Advance one block where every bonded validator signed
    pub fn next_block(&mut self) -> Result<()> {
        let commit = self.current_commit();
        let proposer = commit.votes.first().map(|v| v.validator).unwrap_or_default();
        self.begin_block(proposer, &commit)
    }

    pub fn invariants(&self) -> Result<Vec<InvariantReport>> {
        invariants::all_invariants(&self.keeper, &self.ctx)
    }

    /// Only the invariants that are broken
    pub fn broken_invariants(&self) -> Result<Vec<InvariantReport>> {
        Ok(self.invariants()?.into_iter().filter(|r| r.broken).collect())
    }
}

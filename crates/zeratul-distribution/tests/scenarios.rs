//! End-to-end reward flows on the in-memory chain
//!
//! Each test drives staking, allocation and withdrawal through [`SimApp`]
//! and checks balances, ledger records and the invariants afterwards.

mod common;

use common::*;
use zeratul_distribution::keeper::query::PageRequest;
use zeratul_distribution::msgs::{
    MsgCommunityPoolSpend, MsgDepositValidatorRewardsPool, MsgFundCommunityPool, MsgSetWithdrawAddress,
    MsgUpdateParams, MsgWithdrawDelegatorReward, MsgWithdrawValidatorCommission,
};
use zeratul_distribution::mock::SimApp;
use zeratul_distribution::{
    address::module_address, CommitInfo, Dec, DecCoins, DistributionError, Msg, MsgResponse, Params, Result,
    StakingKeeper, VoteInfo, MODULE_NAME,
};

fn withdraw_reward(app: &mut SimApp, del: &str, v: u8) -> Result<MsgResponse> {
    app.deliver(Msg::WithdrawDelegatorReward(MsgWithdrawDelegatorReward {
        delegator_address: del.to_string(),
        validator_address: val(v).to_string(),
    }))
}

fn withdraw_commission(app: &mut SimApp, v: u8) -> Result<MsgResponse> {
    app.deliver(Msg::WithdrawValidatorCommission(MsgWithdrawValidatorCommission {
        validator_address: val(v).to_string(),
    }))
}

fn dec_stake(d: Dec) -> DecCoins {
    DecCoins::single(DENOM, d)
}

fn validator_tokens(app: &SimApp, v: u8) -> u128 {
    app.staking.validator(&app.ctx, &val(v)).map(|v| v.tokens).unwrap_or(0)
}

fn assert_invariants(app: &SimApp) -> Result<()> {
    let broken = app.broken_invariants()?;
    assert!(broken.is_empty(), "broken invariants: {:#?}", broken);
    Ok(())
}

#[test]
fn test_single_validator_self_delegation() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.allocate_to_validator(&val(1), &stake(10))?;

    let outstanding = app.keeper.query_validator_outstanding_rewards(&app.ctx, &val(1).to_string())?;
    assert_eq!(outstanding, dec_stake(Dec::new(10)));

    let paid = withdraw_reward(&mut app, &operator(1).to_string(), 1)?;
    assert_eq!(paid, MsgResponse::Withdrawn(stake(5)));
    assert_eq!(app.balance(&operator(1)), stake(5));

    let paid = withdraw_commission(&mut app, 1)?;
    assert_eq!(paid, MsgResponse::Withdrawn(stake(5)));
    assert_eq!(app.balance(&operator(1)), stake(10));

    let outstanding = app.keeper.query_validator_outstanding_rewards(&app.ctx, &val(1).to_string())?;
    assert!(outstanding.is_zero());
    assert!(app.module_balance().is_empty());
    assert_invariants(&app)
}

#[test]
fn test_allocation_by_power_with_tax() -> Result<()> {
    init_tracing();
    let mut app = SimApp::new();
    app.set_params(&Params { community_tax: pct(1), ..Params::default() })?;
    app.create_validator(val(1), cons(1), pct(50), 100)?;
    app.create_validator(val(2), cons(2), Dec::zero(), 100)?;
    app.fund_fee_collector(&stake(100))?;

    let commit = CommitInfo {
        votes: vec![VoteInfo::commit(cons(1), 100), VoteInfo::commit(cons(2), 100)],
    };
    app.begin_block(cons(2), &commit)?;

    let half = dec_stake(Dec::with_prec(495, 1));
    assert_eq!(app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(1))?.rewards, half);
    assert_eq!(app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(2))?.rewards, half);

    let commission = app.keeper.query_validator_commission(&app.ctx, &val(1).to_string())?;
    assert_eq!(commission, dec_stake(Dec::with_prec(2475, 2)));
    assert!(app.keeper.query_validator_commission(&app.ctx, &val(2).to_string())?.is_zero());

    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, dec_stake(Dec::one()));
    assert_eq!(app.keeper.get_previous_proposer(&app.ctx)?, Some(cons(2)));

    let collector = module_address(zeratul_distribution::FEE_COLLECTOR_NAME);
    assert!(app.balance(&collector).is_empty());
    assert_eq!(app.module_balance(), stake(100));
    assert_invariants(&app)
}

#[test]
fn test_two_delegators_split_evenly() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.delegate(acc(1), val(1), 100)?;

    app.allocate_to_validator(&val(1), &stake(20))?;

    assert_eq!(withdraw_reward(&mut app, &acc(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(5)));
    assert_eq!(withdraw_reward(&mut app, &operator(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(5)));
    assert_eq!(withdraw_commission(&mut app, 1)?, MsgResponse::Withdrawn(stake(10)));

    assert_eq!(app.balance(&acc(1)), stake(5));
    assert_eq!(app.balance(&operator(1)), stake(15));
    assert_invariants(&app)
}

#[test]
fn test_two_delegators_two_allocations() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.delegate(acc(1), val(1), 100)?;

    app.allocate_to_validator(&val(1), &stake(20))?;
    app.next_block()?;
    app.allocate_to_validator(&val(1), &stake(20))?;

    assert_eq!(withdraw_reward(&mut app, &acc(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(10)));
    assert_eq!(withdraw_reward(&mut app, &operator(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(10)));
    assert_eq!(withdraw_commission(&mut app, 1)?, MsgResponse::Withdrawn(stake(20)));
    assert_invariants(&app)
}

#[test]
fn test_rewards_across_slash() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.delegate(acc(1), val(1), 100)?;
    app.next_block()?;

    app.allocate_to_validator(&val(1), &stake(10))?;
    let burned = app.slash(val(1), &pct(50))?;
    assert_eq!(burned, 100);
    app.allocate_to_validator(&val(1), &stake(10))?;

    // 2.5 before the slash on 200 tokens, 2.5 after it on 100
    let pending = app
        .keeper
        .query_delegation_rewards(&app.ctx, &acc(1).to_string(), &val(1).to_string())?;
    assert_eq!(pending, dec_stake(Dec::new(5)));

    assert_eq!(withdraw_reward(&mut app, &acc(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(5)));
    assert_eq!(withdraw_reward(&mut app, &operator(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(5)));
    assert_eq!(withdraw_commission(&mut app, 1)?, MsgResponse::Withdrawn(stake(10)));
    assert!(app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(1))?.rewards.is_zero());
    assert_invariants(&app)
}

#[test]
fn test_full_commission_pays_delegator_nothing() -> Result<()> {
    let mut app = app_with_validator(Dec::one(), 100)?;
    app.delegate(acc(1), val(1), 100)?;

    for _ in 0..3 {
        app.allocate_to_validator(&val(1), &stake(20))?;
        app.next_block()?;
    }

    app.ctx.take_events();
    let paid = withdraw_reward(&mut app, &acc(1).to_string(), 1)?;
    assert_eq!(paid, MsgResponse::Withdrawn(Default::default()));
    assert!(app.balance(&acc(1)).is_empty());

    let event = app
        .ctx
        .events()
        .iter()
        .find(|e| e.kind == "withdraw_rewards")
        .expect("withdraw_rewards event");
    assert_eq!(event.attribute("amount"), Some("0stake"));
    assert_eq!(event.attribute("delegator"), Some(acc(1).to_string().as_str()));

    assert_eq!(withdraw_commission(&mut app, 1)?, MsgResponse::Withdrawn(stake(60)));
    assert_invariants(&app)
}

#[test]
fn test_pool_spend_to_blocked_recipient() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.fund_account(&acc(1), &stake(50))?;
    app.deliver(Msg::FundCommunityPool(MsgFundCommunityPool {
        depositor: acc(1).to_string(),
        amount: stake(50),
    }))?;

    let recipient = module_address(MODULE_NAME).to_string();
    let err = app
        .deliver(Msg::CommunityPoolSpend(MsgCommunityPoolSpend {
            authority: app.keeper.authority().to_string(),
            recipient: recipient.clone(),
            amount: stake(10),
        }))
        .unwrap_err();
    assert_eq!(err, DistributionError::Unauthorized(recipient));
    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, dec_stake(Dec::new(50)));
    Ok(())
}

#[test]
fn test_many_slashes_in_same_block_compose() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.allocate_to_validator(&val(1), &stake(10))?;
    app.next_block()?;

    app.slash(val(1), &pct(50))?;
    app.slash(val(1), &pct(50))?;
    assert_eq!(validator_tokens(&app, 1), 25);

    let (events, _) = app.keeper.query_validator_slashes(
        &app.ctx,
        &val(1).to_string(),
        0,
        app.height(),
        &PageRequest::default(),
    )?;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].fraction, pct(75));

    app.allocate_to_validator(&val(1), &stake(10))?;

    // 10 on full stake, then 10 on the quarter left
    assert_eq!(withdraw_reward(&mut app, &operator(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(20)));
    assert_invariants(&app)
}

#[test]
fn test_slashes_in_separate_blocks() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.delegate(acc(1), val(1), 100)?;
    app.next_block()?;

    app.allocate_to_validator(&val(1), &stake(20))?;
    app.slash(val(1), &pct(50))?;
    app.next_block()?;
    app.allocate_to_validator(&val(1), &stake(20))?;
    app.slash(val(1), &pct(50))?;
    app.next_block()?;
    app.allocate_to_validator(&val(1), &stake(20))?;

    let (events, _) = app.keeper.query_validator_slashes(
        &app.ctx,
        &val(1).to_string(),
        0,
        app.height(),
        &PageRequest::default(),
    )?;
    assert_eq!(events.len(), 2);

    // each delegator holds half the validator at every step
    assert_eq!(withdraw_reward(&mut app, &acc(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(30)));
    assert_eq!(withdraw_reward(&mut app, &operator(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(30)));
    assert_invariants(&app)
}

#[test]
fn test_withdraw_address_redirects_rewards() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.delegate(acc(1), val(1), 100)?;

    app.ctx.take_events();
    app.deliver(Msg::SetWithdrawAddress(MsgSetWithdrawAddress {
        delegator_address: acc(1).to_string(),
        withdraw_address: acc(2).to_string(),
    }))?;
    let event = &app.ctx.events()[0];
    assert_eq!(event.kind, "set_withdraw_address");
    assert_eq!(event.attribute("withdraw_address"), Some(acc(2).to_string().as_str()));

    let shown = app
        .keeper
        .query_delegator_withdraw_address(&app.ctx, &acc(1).to_string())?;
    assert_eq!(shown, acc(2).to_string());

    app.allocate_to_validator(&val(1), &stake(20))?;
    withdraw_reward(&mut app, &acc(1).to_string(), 1)?;
    assert!(app.balance(&acc(1)).is_empty());
    assert_eq!(app.balance(&acc(2)), stake(10));
    Ok(())
}

#[test]
fn test_withdraw_address_rejections() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;

    let blocked = Msg::SetWithdrawAddress(MsgSetWithdrawAddress {
        delegator_address: acc(1).to_string(),
        withdraw_address: module_address(MODULE_NAME).to_string(),
    });
    assert!(matches!(app.deliver(blocked), Err(DistributionError::Unauthorized(_))));

    app.set_params(&Params { withdraw_addr_enabled: false, ..Params::default() })?;
    let err = app
        .deliver(Msg::SetWithdrawAddress(MsgSetWithdrawAddress {
            delegator_address: acc(1).to_string(),
            withdraw_address: acc(2).to_string(),
        }))
        .unwrap_err();
    assert_eq!(err.to_string(), "set withdraw address disabled");
    assert_eq!(app.keeper.get_delegator_withdraw_addr(&app.ctx, &acc(1))?, acc(1));
    Ok(())
}

#[test]
fn test_fund_and_spend_community_pool() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.fund_account(&acc(1), &stake(50))?;

    let err = app
        .deliver(Msg::FundCommunityPool(MsgFundCommunityPool {
            depositor: acc(1).to_string(),
            amount: stake(60),
        }))
        .unwrap_err();
    assert!(err.to_string().contains("insufficient funds"));
    assert!(app.keeper.query_community_pool(&app.ctx)?.is_zero());

    app.deliver(Msg::FundCommunityPool(MsgFundCommunityPool {
        depositor: acc(1).to_string(),
        amount: stake(50),
    }))?;
    assert!(app.balance(&acc(1)).is_empty());
    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, dec_stake(Dec::new(50)));

    let spend = |authority: String, amount| {
        Msg::CommunityPoolSpend(MsgCommunityPoolSpend {
            authority,
            recipient: acc(2).to_string(),
            amount,
        })
    };

    let err = app.deliver(spend(acc(1).to_string(), stake(20))).unwrap_err();
    assert!(matches!(err, DistributionError::InvalidAuthority { .. }));
    assert!(err.to_string().starts_with("invalid authority"));

    let authority = app.keeper.authority().to_string();
    app.deliver(spend(authority.clone(), stake(20)))?;
    assert_eq!(app.balance(&acc(2)), stake(20));
    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, dec_stake(Dec::new(30)));

    let err = app.deliver(spend(authority, stake(31))).unwrap_err();
    assert_eq!(err, DistributionError::BadDistribution);
    assert_invariants(&app)
}

#[test]
fn test_deposit_validator_rewards_pool() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.fund_account(&acc(1), &stake(10))?;

    app.deliver(Msg::DepositValidatorRewardsPool(MsgDepositValidatorRewardsPool {
        depositor: acc(1).to_string(),
        validator_address: val(1).to_string(),
        amount: stake(10),
    }))?;
    assert!(app.balance(&acc(1)).is_empty());
    assert_eq!(
        app.keeper.query_validator_outstanding_rewards(&app.ctx, &val(1).to_string())?,
        dec_stake(Dec::new(10))
    );
    assert_eq!(
        app.keeper.query_validator_commission(&app.ctx, &val(1).to_string())?,
        dec_stake(Dec::new(5))
    );

    let err = app
        .deliver(Msg::DepositValidatorRewardsPool(MsgDepositValidatorRewardsPool {
            depositor: acc(1).to_string(),
            validator_address: val(9).to_string(),
            amount: stake(1),
        }))
        .unwrap_err();
    assert_eq!(err.to_string(), "validator does not exist");
    assert_invariants(&app)
}

#[test]
fn test_update_params() -> Result<()> {
    let mut app = SimApp::new();
    let authority = app.keeper.authority().to_string();
    let update = |authority: &str, params: Params| {
        Msg::UpdateParams(MsgUpdateParams { authority: authority.to_string(), params })
    };

    let err = app
        .deliver(update(&authority, Params { community_tax: Dec::new(2), ..Params::default() }))
        .unwrap_err();
    assert!(err.to_string().contains("community tax too large: 2.000000000000000000"));

    let err = app
        .deliver(update(&authority, Params { community_tax: Dec::with_prec(-2, 1), ..Params::default() }))
        .unwrap_err();
    assert!(err.to_string().contains("community tax must be positive: -0.200000000000000000"));

    let err = app
        .deliver(update(&authority, Params { base_proposer_reward: pct(1), ..Params::default() }))
        .unwrap_err();
    assert!(err
        .to_string()
        .contains("cannot update base or bonus proposer reward because these are deprecated fields"));

    let err = app.deliver(update(&acc(1).to_string(), Params::default())).unwrap_err();
    assert!(matches!(err, DistributionError::InvalidAuthority { .. }));

    // a stranger learns nothing about the params they sent
    let bad_tax = Params { community_tax: Dec::new(2), ..Params::default() };
    let err = app.deliver(update(&acc(1).to_string(), bad_tax)).unwrap_err();
    assert!(matches!(err, DistributionError::InvalidAuthority { .. }));

    let params = Params { community_tax: pct(10), withdraw_addr_enabled: false, ..Params::default() };
    app.deliver(update(&authority, params.clone()))?;
    assert_eq!(app.keeper.query_params(&app.ctx)?, params);
    Ok(())
}

#[test]
fn test_withdraw_errors() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;

    let err = withdraw_commission(&mut app, 1).unwrap_err();
    assert_eq!(err.to_string(), "no validator commission to withdraw");

    let err = withdraw_reward(&mut app, &acc(1).to_string(), 1).unwrap_err();
    assert_eq!(err, DistributionError::NoDelegationExists);

    let err = withdraw_reward(&mut app, &acc(1).to_string(), 9).unwrap_err();
    assert_eq!(err, DistributionError::NoValidatorExists);

    let err = withdraw_reward(&mut app, "", 1).unwrap_err();
    assert_eq!(err, DistributionError::EmptyDelegatorAddr);
    Ok(())
}

#[test]
fn test_remove_validator_settles_everything() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.allocate_to_validator(&val(1), &stake(11))?;

    // unbonding pays 5 of the 5.5 delegator share, dust goes to the pool
    let released = app.undelegate(operator(1), val(1), &Dec::new(100))?;
    assert_eq!(released, 100);
    assert_eq!(app.balance(&operator(1)), stake(5));

    app.remove_validator(val(1))?;
    assert_eq!(app.balance(&operator(1)), stake(10));
    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, dec_stake(Dec::one()));
    assert_eq!(app.module_balance(), stake(1));

    assert!(app.keeper.get_validator_current_rewards(&app.ctx, &val(1))?.is_none());
    assert!(app.keeper.all_validator_historical_rewards(&app.ctx)?.is_empty());
    assert!(app.keeper.all_validator_outstanding_rewards(&app.ctx)?.is_empty());
    assert!(app.keeper.all_delegator_starting_infos(&app.ctx)?.is_empty());
    assert_invariants(&app)
}

#[test]
fn test_rewards_without_stake_go_to_pool() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.undelegate(operator(1), val(1), &Dec::new(100))?;

    app.allocate_to_validator(&val(1), &stake(10))?;
    app.delegate(acc(1), val(1), 50)?;

    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, dec_stake(Dec::new(10)));
    assert!(app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(1))?.rewards.is_zero());

    app.allocate_to_validator(&val(1), &stake(10))?;
    assert_eq!(withdraw_reward(&mut app, &acc(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(10)));
    assert_invariants(&app)
}

#[test]
fn test_partial_unbond_withdraws_first() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.delegate(acc(1), val(1), 100)?;
    app.allocate_to_validator(&val(1), &stake(20))?;

    app.undelegate(acc(1), val(1), &Dec::new(50))?;
    assert_eq!(app.balance(&acc(1)), stake(10));

    // 50 of 150 tokens now
    app.allocate_to_validator(&val(1), &stake(30))?;
    assert_eq!(withdraw_reward(&mut app, &acc(1).to_string(), 1)?, MsgResponse::Withdrawn(stake(10)));
    assert_eq!(app.balance(&acc(1)), stake(20));
    assert_invariants(&app)
}

#[test]
fn test_failed_message_leaves_no_trace() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.ctx.take_events();
    let before = app.keeper.export_genesis(&app.ctx)?;

    assert!(withdraw_commission(&mut app, 1).is_err());
    assert!(app.ctx.events().is_empty());
    assert_eq!(app.keeper.export_genesis(&app.ctx)?, before);
    Ok(())
}

#[test]
fn test_uneven_slash_and_partial_unbond_strand_nothing() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 111)?;
    app.delegate(acc(1), val(1), 111)?;
    app.delegate(acc(2), val(1), 111)?;
    app.next_block()?;

    // 10% of 333 burns 33 whole tokens
    assert_eq!(app.slash(val(1), &pct(10))?, 33);
    let (events, _) = app.keeper.query_validator_slashes(
        &app.ctx,
        &val(1).to_string(),
        0,
        app.height(),
        &PageRequest::default(),
    )?;
    assert_eq!(events[0].fraction, Dec::new(33).quo_int_round_up(333));

    // 50 shares are worth 45.045 tokens; 45 leave and 49.95 shares burn
    assert_eq!(app.undelegate(acc(1), val(1), &Dec::new(50))?, 45);
    let left = app.staking.delegation(&app.ctx, &acc(1), &val(1)).map(|d| d.shares);
    assert_eq!(left, Some("61.05".parse::<Dec>()?));
    assert_eq!(validator_tokens(&app, 1), 255);

    app.next_block()?;
    app.allocate_to_validator(&val(1), &stake(1_000_000))?;
    for del in [operator(1), acc(1), acc(2)] {
        withdraw_reward(&mut app, &del.to_string(), 1)?;
    }

    let residual = app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(1))?.rewards;
    assert!(residual.amount_of(DENOM) < Dec::one(), "unclaimable residual {}", residual);
    assert_invariants(&app)
}

#[test]
fn test_remove_validator_unbonds_dust() -> Result<()> {
    let mut app = app_with_validator(pct(10), 100)?;
    app.delegate(acc(1), val(1), 101)?;
    app.next_block()?;
    app.slash(val(1), &pct(10))?;
    app.allocate_to_validator(&val(1), &stake(50))?;

    // 181 tokens over 201 shares: neither holder is worth a whole number
    assert_eq!(app.undelegate(acc(1), val(1), &Dec::new(101))?, 90);
    assert_eq!(app.undelegate(operator(1), val(1), &Dec::new(100))?, 90);
    assert!(app.staking.delegation(&app.ctx, &acc(1), &val(1)).is_some());
    assert_eq!(validator_tokens(&app, 1), 1);

    app.remove_validator(val(1))?;
    assert!(app.staking.delegation(&app.ctx, &acc(1), &val(1)).is_none());
    assert!(app.staking.delegation(&app.ctx, &operator(1), &val(1)).is_none());
    assert!(app.keeper.all_delegator_starting_infos(&app.ctx)?.is_empty());
    assert!(app.keeper.all_validator_historical_rewards(&app.ctx)?.is_empty());
    assert_invariants(&app)
}

#[test]
fn test_remove_validator_with_live_delegation_fails() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.delegate(acc(1), val(1), 10)?;
    app.undelegate(operator(1), val(1), &Dec::new(100))?;

    let err = app.remove_validator(val(1)).unwrap_err();
    assert!(err.to_string().contains("still has delegations"));
    assert!(app.staking.validator(&app.ctx, &val(1)).is_some());
    Ok(())
}

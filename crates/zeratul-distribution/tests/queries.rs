//! Queries, block allocation edge cases and genesis import/export

mod common;

use common::*;
use zeratul_distribution::keeper::query::PageRequest;
use zeratul_distribution::mock::SimApp;
use zeratul_distribution::types::BlockIdFlag;
use zeratul_distribution::{
    address::module_address, CommitInfo, Dec, DecCoins, DistributionError, GenesisState, Result, VoteInfo,
    FEE_COLLECTOR_NAME,
};

fn slashed_app(slashes: u64) -> Result<SimApp> {
    let mut app = app_with_validator(Dec::zero(), 1000)?;
    for _ in 0..slashes {
        app.next_block()?;
        app.slash(val(1), &pct(10))?;
    }
    Ok(app)
}

#[test]
fn test_validator_slashes_paginated() -> Result<()> {
    let app = slashed_app(5)?;
    let v = val(1).to_string();

    let page = PageRequest { offset: 0, limit: 2, count_total: true };
    let (events, resp) = app.keeper.query_validator_slashes(&app.ctx, &v, 1, app.height(), &page)?;
    assert_eq!(events.len(), 2);
    assert!(resp.has_more);
    assert_eq!(resp.total, Some(5));

    let page = PageRequest { offset: 4, limit: 2, count_total: false };
    let (events, resp) = app.keeper.query_validator_slashes(&app.ctx, &v, 1, app.height(), &page)?;
    assert_eq!(events.len(), 1);
    assert!(!resp.has_more);
    assert_eq!(resp.total, None);

    // heights 2..=6 carry one slash each
    let (events, _) = app.keeper.query_validator_slashes(&app.ctx, &v, 3, 4, &PageRequest::default())?;
    assert_eq!(events.len(), 2);
    assert!(events[0].validator_period < events[1].validator_period);
    Ok(())
}

#[test]
fn test_validator_slashes_bad_input() -> Result<()> {
    let app = slashed_app(1)?;

    let err = app
        .keeper
        .query_validator_slashes(&app.ctx, &val(1).to_string(), 5, 2, &PageRequest::default())
        .unwrap_err();
    assert_eq!(err, DistributionError::InvalidSlashRange { start: 5, end: 2 });

    let err = app
        .keeper
        .query_validator_slashes(&app.ctx, "", 0, 2, &PageRequest::default())
        .unwrap_err();
    assert_eq!(err, DistributionError::EmptyValidatorAddr);
    Ok(())
}

#[test]
fn test_reward_queries_leave_state_untouched() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.create_validator(val(2), cons(2), Dec::zero(), 100)?;
    app.delegate(acc(1), val(1), 100)?;
    app.delegate(acc(1), val(2), 100)?;

    app.allocate_to_validator(&val(1), &stake(20))?;
    app.allocate_to_validator(&val(2), &stake(20))?;
    let before = app.keeper.export_genesis(&app.ctx)?;

    let total = app.keeper.query_delegation_total_rewards(&app.ctx, &acc(1).to_string())?;
    assert_eq!(total.rewards.len(), 2);
    assert_eq!(total.total, DecCoins::single(DENOM, Dec::new(15)));

    let validators = app.keeper.query_delegator_validators(&app.ctx, &acc(1).to_string())?;
    assert_eq!(validators, vec![val(1).to_string(), val(2).to_string()]);

    let info = app
        .keeper
        .query_validator_distribution_info(&app.ctx, &val(1).to_string())?;
    assert_eq!(info.operator_address, operator(1).to_string());
    assert_eq!(info.self_bond_rewards, DecCoins::single(DENOM, Dec::new(5)));
    assert_eq!(info.commission, DecCoins::single(DENOM, Dec::new(10)));

    assert_eq!(app.keeper.export_genesis(&app.ctx)?, before);
    Ok(())
}

#[test]
fn test_query_address_errors() -> Result<()> {
    let app = app_with_validator(Dec::zero(), 100)?;
    let v = val(1).to_string();

    assert_eq!(
        app.keeper.query_delegation_rewards(&app.ctx, "", &v).unwrap_err(),
        DistributionError::EmptyDelegatorAddr
    );
    assert_eq!(
        app.keeper.query_delegation_rewards(&app.ctx, &acc(1).to_string(), "").unwrap_err(),
        DistributionError::EmptyValidatorAddr
    );
    assert_eq!(
        app.keeper
            .query_delegation_rewards(&app.ctx, &acc(1).to_string(), &v)
            .unwrap_err(),
        DistributionError::NoDelegationExists
    );
    assert_eq!(
        app.keeper
            .query_validator_outstanding_rewards(&app.ctx, &val(7).to_string())
            .unwrap_err(),
        DistributionError::NoValidatorExists
    );
    assert!(matches!(
        app.keeper.query_delegator_withdraw_address(&app.ctx, "not-hex"),
        Err(DistributionError::InvalidAddress(_))
    ));
    Ok(())
}

#[test]
fn test_no_allocation_at_first_height() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.fund_fee_collector(&stake(100))?;
    assert_eq!(app.height(), 1);

    let commit = app.current_commit();
    app.keeper.begin_block(&mut app.ctx, &cons(1), &commit)?;

    assert_eq!(app.balance(&module_address(FEE_COLLECTOR_NAME)), stake(100));
    assert!(app.module_balance().is_empty());
    assert_eq!(app.keeper.get_previous_proposer(&app.ctx)?, Some(cons(1)));
    Ok(())
}

#[test]
fn test_zero_power_sends_fees_to_pool() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.fund_fee_collector(&stake(100))?;

    app.begin_block(cons(1), &CommitInfo::default())?;
    assert_eq!(app.keeper.query_community_pool(&app.ctx)?, DecCoins::single(DENOM, Dec::new(100)));
    assert!(app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(1))?.rewards.is_zero());
    Ok(())
}

#[test]
fn test_unknown_and_absent_votes_fund_pool() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.create_validator(val(2), cons(2), Dec::zero(), 100)?;
    app.fund_fee_collector(&stake(100))?;

    let absent = VoteInfo { block_id_flag: BlockIdFlag::Absent, ..VoteInfo::commit(cons(2), 100) };
    let commit = CommitInfo {
        votes: vec![VoteInfo::commit(cons(1), 100), VoteInfo::commit(cons(9), 100), absent],
    };
    app.begin_block(cons(1), &commit)?;

    // 2% tax off 100, then a third of 98 per vote
    let share = Dec::new(98).quo_int_truncate(3);
    let outstanding = app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(1))?.rewards;
    assert_eq!(outstanding, DecCoins::single(DENOM, share.clone()));
    assert!(app.keeper.get_validator_outstanding_rewards(&app.ctx, &val(2))?.rewards.is_zero());

    let pool = app.keeper.query_community_pool(&app.ctx)?;
    assert_eq!(pool, DecCoins::single(DENOM, Dec::new(100) - share));

    let broken = app.broken_invariants()?;
    assert!(broken.is_empty(), "{:#?}", broken);
    Ok(())
}

#[test]
fn test_allocation_events() -> Result<()> {
    let mut app = app_with_validator(pct(10), 100)?;
    app.ctx.take_events();
    app.allocate_to_validator(&val(1), &stake(10))?;

    let events = app.ctx.take_events();
    let commission = events.iter().find(|e| e.kind == "commission").expect("commission event");
    assert_eq!(commission.attribute("amount"), Some("1.000000000000000000stake"));
    assert_eq!(commission.attribute("validator"), Some(val(1).to_string().as_str()));

    let rewards = events.iter().find(|e| e.kind == "rewards").expect("rewards event");
    assert_eq!(rewards.attribute("amount"), Some("10.000000000000000000stake"));
    Ok(())
}

#[test]
fn test_genesis_roundtrip() -> Result<()> {
    let mut app = app_with_validator(pct(50), 100)?;
    app.delegate(acc(1), val(1), 100)?;
    app.fund_fee_collector(&stake(77))?;
    app.next_block()?;
    app.slash(val(1), &pct(5))?;
    app.allocate_to_validator(&val(1), &stake(13))?;

    let exported = app.keeper.export_genesis(&app.ctx)?;
    assert!(!exported.validator_slash_events.is_empty());
    assert!(exported.previous_proposer.is_some());

    let json = exported.to_json()?;
    let parsed = GenesisState::from_json(&json)?;
    assert_eq!(parsed, exported);

    let imported = SimApp::with_genesis(&parsed, &app.module_balance())?;
    assert_eq!(imported.keeper.export_genesis(&imported.ctx)?, exported);
    Ok(())
}

#[test]
fn test_genesis_rejects_balance_mismatch() -> Result<()> {
    let mut app = app_with_validator(Dec::zero(), 100)?;
    app.allocate_to_validator(&val(1), &stake(10))?;
    let exported = app.keeper.export_genesis(&app.ctx)?;

    let err = SimApp::with_genesis(&exported, &stake(9)).err().expect("mismatch rejected");
    assert!(matches!(err, DistributionError::InvalidGenesis(_)));
    assert!(err.to_string().contains("does not match"));
    Ok(())
}

//! Store key layout
//!
//! ```text
//! 0x00                                   fee pool
//! 0x01                                   previous proposer
//! 0x02 | len | val                       outstanding rewards
//! 0x03 | len | del                       withdraw address
//! 0x04 | len | val | len | del           delegator starting info
//! 0x05 | len | val | period(8, BE)       historical rewards
//! 0x06 | len | val                       current rewards
//! 0x07 | len | val                       accumulated commission
//! 0x08 | len | val | height(8, BE) | period(8, BE)  slash event
//! 0x09                                   params
//! ```
//!
//! Integers are big-endian so that byte order equals numeric order and
//! height ranges can be range-scanned.

use crate::address::{AccAddress, ValAddress};
use crate::error::{DistributionError, Result};

/// Name of the distribution store inside a [`crate::Context`]
pub const STORE_KEY: &str = "distribution";

pub const FEE_POOL_KEY: &[u8] = &[0x00];
pub const PROPOSER_KEY: &[u8] = &[0x01];
pub const OUTSTANDING_REWARDS_PREFIX: u8 = 0x02;
pub const DELEGATOR_WITHDRAW_ADDR_PREFIX: u8 = 0x03;
pub const DELEGATOR_STARTING_INFO_PREFIX: u8 = 0x04;
pub const HISTORICAL_REWARDS_PREFIX: u8 = 0x05;
pub const CURRENT_REWARDS_PREFIX: u8 = 0x06;
pub const ACCUMULATED_COMMISSION_PREFIX: u8 = 0x07;
pub const SLASH_EVENT_PREFIX: u8 = 0x08;
pub const PARAMS_KEY: &[u8] = &[0x09];

fn length_prefixed(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 1);
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
    out
}

fn prefixed(prefix: u8, addr: &[u8]) -> Vec<u8> {
    let mut key = vec![prefix];
    key.extend(length_prefixed(addr));
    key
}

/// Reads one length-prefixed address starting at `offset`; returns it and the
/// offset just past it
fn read_address(key: &[u8], offset: usize) -> Result<(&[u8], usize)> {
    let len = *key
        .get(offset)
        .ok_or_else(|| DistributionError::Codec("truncated store key".into()))? as usize;
    let end = offset + 1 + len;
    let addr = key
        .get(offset + 1..end)
        .ok_or_else(|| DistributionError::Codec("truncated store key".into()))?;
    Ok((addr, end))
}

fn read_u64(key: &[u8], offset: usize) -> Result<u64> {
    let bytes: [u8; 8] = key
        .get(offset..offset + 8)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| DistributionError::Codec("truncated store key".into()))?;
    Ok(u64::from_be_bytes(bytes))
}

pub fn outstanding_rewards_key(val: &ValAddress) -> Vec<u8> {
    prefixed(OUTSTANDING_REWARDS_PREFIX, val.as_bytes())
}

pub fn delegator_withdraw_addr_key(del: &AccAddress) -> Vec<u8> {
    prefixed(DELEGATOR_WITHDRAW_ADDR_PREFIX, del.as_bytes())
}

pub fn delegator_starting_info_key(val: &ValAddress, del: &AccAddress) -> Vec<u8> {
    let mut key = prefixed(DELEGATOR_STARTING_INFO_PREFIX, val.as_bytes());
    key.extend(length_prefixed(del.as_bytes()));
    key
}

pub fn historical_rewards_prefix(val: &ValAddress) -> Vec<u8> {
    prefixed(HISTORICAL_REWARDS_PREFIX, val.as_bytes())
}

pub fn historical_rewards_key(val: &ValAddress, period: u64) -> Vec<u8> {
    let mut key = historical_rewards_prefix(val);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

pub fn current_rewards_key(val: &ValAddress) -> Vec<u8> {
    prefixed(CURRENT_REWARDS_PREFIX, val.as_bytes())
}

pub fn accumulated_commission_key(val: &ValAddress) -> Vec<u8> {
    prefixed(ACCUMULATED_COMMISSION_PREFIX, val.as_bytes())
}

pub fn slash_event_prefix(val: &ValAddress) -> Vec<u8> {
    prefixed(SLASH_EVENT_PREFIX, val.as_bytes())
}

/// Prefix of every slash event of `val` at `height`
pub fn slash_event_key_prefix(val: &ValAddress, height: u64) -> Vec<u8> {
    let mut key = slash_event_prefix(val);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

pub fn slash_event_key(val: &ValAddress, height: u64, period: u64) -> Vec<u8> {
    let mut key = slash_event_key_prefix(val, height);
    key.extend_from_slice(&period.to_be_bytes());
    key
}

/// Validator out of a key of the form `prefix | len | val | ...`
pub fn parse_validator(key: &[u8]) -> Result<ValAddress> {
    let (addr, _) = read_address(key, 1)?;
    ValAddress::from_slice(addr)
}

pub fn parse_withdraw_addr_key(key: &[u8]) -> Result<AccAddress> {
    let (addr, _) = read_address(key, 1)?;
    AccAddress::from_slice(addr)
}

pub fn parse_starting_info_key(key: &[u8]) -> Result<(ValAddress, AccAddress)> {
    let (val, next) = read_address(key, 1)?;
    let (del, _) = read_address(key, next)?;
    Ok((ValAddress::from_slice(val)?, AccAddress::from_slice(del)?))
}

pub fn parse_historical_rewards_key(key: &[u8]) -> Result<(ValAddress, u64)> {
    let (val, next) = read_address(key, 1)?;
    Ok((ValAddress::from_slice(val)?, read_u64(key, next)?))
}

pub fn parse_slash_event_key(key: &[u8]) -> Result<(ValAddress, u64, u64)> {
    let (val, next) = read_address(key, 1)?;
    let height = read_u64(key, next)?;
    let period = read_u64(key, next + 8)?;
    Ok((ValAddress::from_slice(val)?, height, period))
}

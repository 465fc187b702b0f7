//! Integer and decimal coin sets
//!
//! Both set types stay sorted by denom and sparse: a denom with a zero amount
//! is never stored. Integer coins are what the bank moves; decimal coins are
//! what the reward accounting works in.

use crate::decimal::Dec;
use crate::error::{DistributionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Checks a denom against `[a-zA-Z][a-zA-Z0-9/:._-]{2,127}`
pub fn validate_denom(denom: &str) -> Result<()> {
    let mut chars = denom.chars();
    let first_ok = chars.next().map_or(false, |c| c.is_ascii_alphabetic());
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));

    if !first_ok || !rest_ok || denom.len() < 3 || denom.len() > 128 {
        return Err(DistributionError::InvalidCoins(format!("invalid denom: {}", denom)));
    }
    Ok(())
}

/// Integer coin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self { denom: denom.into(), amount }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sorted, sparse set of integer coins
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coin>", into = "Vec<Coin>")]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Build a coin set, rejecting duplicate or malformed denoms.
    /// Zero amounts are dropped.
    pub fn new(coins: Vec<Coin>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for coin in coins {
            validate_denom(&coin.denom)?;
            if map.insert(coin.denom.clone(), coin.amount).is_some() {
                return Err(DistributionError::InvalidCoins(format!("duplicate denom {}", coin.denom)));
            }
        }
        Ok(Self::from_map(map))
    }

    pub fn single(denom: impl Into<String>, amount: u128) -> Self {
        let denom = denom.into();
        if amount == 0 {
            return Self::empty();
        }
        Self(vec![Coin::new(denom, amount)])
    }

    fn from_map(map: BTreeMap<String, u128>) -> Self {
        Self(
            map.into_iter()
                .filter(|(_, amount)| *amount != 0)
                .map(|(denom, amount)| Coin { denom, amount })
                .collect(),
        )
    }

    fn to_map(&self) -> BTreeMap<String, u128> {
        self.0.iter().map(|c| (c.denom.clone(), c.amount)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.iter().find(|c| c.denom == denom).map_or(0, |c| c.amount)
    }

    pub fn add(&self, other: &Coins) -> Coins {
        let mut map = self.to_map();
        for coin in &other.0 {
            *map.entry(coin.denom.clone()).or_insert(0) += coin.amount;
        }
        Self::from_map(map)
    }

    /// `None` if any denom would go negative
    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        let mut map = self.to_map();
        for coin in &other.0 {
            let entry = map.entry(coin.denom.clone()).or_insert(0);
            *entry = entry.checked_sub(coin.amount)?;
        }
        Some(Self::from_map(map))
    }

    pub fn is_all_gte(&self, other: &Coins) -> bool {
        self.checked_sub(other).is_some()
    }
}

impl TryFrom<Vec<Coin>> for Coins {
    type Error = DistributionError;

    fn try_from(coins: Vec<Coin>) -> Result<Self> {
        Coins::new(coins)
    }
}

impl From<Coins> for Vec<Coin> {
    fn from(coins: Coins) -> Self {
        coins.0
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Decimal coin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecCoin {
    pub denom: String,
    pub amount: Dec,
}

impl DecCoin {
    pub fn new(denom: impl Into<String>, amount: Dec) -> Self {
        Self { denom: denom.into(), amount }
    }
}

impl fmt::Display for DecCoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

/// Sorted, sparse set of decimal coins.
///
/// Amounts are non-negative everywhere in persisted state; a negative entry
/// only ever shows up in the result of [`DecCoins::safe_sub`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<DecCoin>", into = "Vec<DecCoin>")]
pub struct DecCoins(Vec<DecCoin>);

impl DecCoins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Sorts, merges duplicate denoms and drops zero amounts
    pub fn new(coins: Vec<DecCoin>) -> Self {
        let mut map: BTreeMap<String, Dec> = BTreeMap::new();
        for coin in coins {
            *map.entry(coin.denom).or_default() += &coin.amount;
        }
        Self::from_map(map)
    }

    pub fn single(denom: impl Into<String>, amount: Dec) -> Self {
        Self::new(vec![DecCoin::new(denom, amount)])
    }

    pub fn from_coins(coins: &Coins) -> Self {
        Self(
            coins
                .iter()
                .map(|c| DecCoin::new(c.denom.clone(), Dec::from_u128(c.amount)))
                .collect(),
        )
    }

    fn from_map(map: BTreeMap<String, Dec>) -> Self {
        Self(
            map.into_iter()
                .filter(|(_, amount)| !amount.is_zero())
                .map(|(denom, amount)| DecCoin { denom, amount })
                .collect(),
        )
    }

    fn to_map(&self) -> BTreeMap<String, Dec> {
        self.0.iter().map(|c| (c.denom.clone(), c.amount.clone())).collect()
    }

    fn map_amounts(&self, f: impl Fn(&Dec) -> Dec) -> DecCoins {
        Self::from_map(self.0.iter().map(|c| (c.denom.clone(), f(&c.amount))).collect())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DecCoin> {
        self.0.iter()
    }

    pub fn amount_of(&self, denom: &str) -> Dec {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount.clone())
            .unwrap_or_default()
    }

    pub fn is_any_negative(&self) -> bool {
        self.0.iter().any(|c| c.amount.is_negative())
    }

    pub fn add(&self, other: &DecCoins) -> DecCoins {
        let mut map = self.to_map();
        for coin in &other.0 {
            *map.entry(coin.denom.clone()).or_default() += &coin.amount;
        }
        Self::from_map(map)
    }

    /// Per-denom difference and whether any denom went negative
    pub fn safe_sub(&self, other: &DecCoins) -> (DecCoins, bool) {
        let mut map = self.to_map();
        for coin in &other.0 {
            *map.entry(coin.denom.clone()).or_default() -= &coin.amount;
        }
        let result = Self::from_map(map);
        let negative = result.is_any_negative();
        (result, negative)
    }

    /// Difference that must stay non-negative. Going negative means the
    /// reward accounting is corrupted, so it panics.
    pub fn sub(&self, other: &DecCoins) -> DecCoins {
        let (result, negative) = self.safe_sub(other);
        if negative {
            panic!("negative decimal coin amount: {} - {} = {}", self, other, result);
        }
        result
    }

    /// Multiply every amount, rounding half-to-even
    pub fn mul_dec(&self, d: &Dec) -> DecCoins {
        self.map_amounts(|a| a.mul(d))
    }

    /// Multiply every amount, truncating
    pub fn mul_dec_truncate(&self, d: &Dec) -> DecCoins {
        self.map_amounts(|a| a.mul_truncate(d))
    }

    /// Divide every amount, truncating
    pub fn quo_dec_truncate(&self, d: &Dec) -> DecCoins {
        self.map_amounts(|a| a.quo_truncate(d))
    }

    /// `amount · numerator / denominator` per denom, truncating only once at
    /// the end
    pub fn mul_int_quo_truncate(&self, numerator: u128, denominator: u128) -> DecCoins {
        self.map_amounts(|a| a.mul_int(numerator).quo_int_truncate(denominator))
    }

    /// Split into whole coins and the decimal change left over
    pub fn truncate_decimal(&self) -> (Coins, DecCoins) {
        let mut whole = BTreeMap::new();
        let mut change = BTreeMap::new();
        for coin in &self.0 {
            let truncated = coin.amount.truncate_dec();
            let amount = truncated.truncate_u128().unwrap_or_else(|| {
                panic!("cannot truncate decimal coin {} to a coin amount", coin)
            });
            whole.insert(coin.denom.clone(), amount);
            change.insert(coin.denom.clone(), &coin.amount - &truncated);
        }
        (Coins::from_map(whole), Self::from_map(change))
    }

    /// Per-denom minimum over denoms present in both sets
    pub fn intersect(&self, other: &DecCoins) -> DecCoins {
        Self::from_map(
            self.0
                .iter()
                .map(|c| {
                    let min = std::cmp::min(c.amount.clone(), other.amount_of(&c.denom));
                    (c.denom.clone(), min)
                })
                .collect(),
        )
    }
}

impl From<Vec<DecCoin>> for DecCoins {
    fn from(coins: Vec<DecCoin>) -> Self {
        DecCoins::new(coins)
    }
}

impl From<DecCoins> for Vec<DecCoin> {
    fn from(coins: DecCoins) -> Self {
        coins.0
    }
}

impl fmt::Display for DecCoins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(","))
    }
}

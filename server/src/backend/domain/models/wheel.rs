//! Prize wheel configuration and weighted draws.
use anyhow::{anyhow, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrizeKind {
    /// Credits `value` points to the balance
    Points,
    /// Physical or shop item, fulfilled outside the ledger
    Item,
    Voucher,
    Nothing,
}

impl PrizeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrizeKind::Points => "points",
            PrizeKind::Item => "item",
            PrizeKind::Voucher => "voucher",
            PrizeKind::Nothing => "nothing",
        }
    }
}

impl FromStr for PrizeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "points" => Ok(PrizeKind::Points),
            "item" => Ok(PrizeKind::Item),
            "voucher" => Ok(PrizeKind::Voucher),
            "nothing" => Ok(PrizeKind::Nothing),
            other => Err(anyhow!("Unknown prize kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelPrize {
    pub id: String,
    pub label: String,
    pub kind: PrizeKind,
    #[serde(default)]
    pub value: i64,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrizeTable {
    prizes: Vec<WheelPrize>,
    total_weight: u32,
}

impl PrizeTable {
    pub fn new(prizes: Vec<WheelPrize>) -> Result<Self> {
        if prizes.is_empty() {
            return Err(anyhow!("Prize table cannot be empty"));
        }
        for prize in &prizes {
            if prize.kind == PrizeKind::Points && prize.value <= 0 {
                return Err(anyhow!("Points prize {} must have a positive value", prize.id));
            }
        }
        let total_weight = prizes
            .iter()
            .try_fold(0u32, |acc, p| acc.checked_add(p.weight))
            .ok_or_else(|| anyhow!("Prize weights overflow"))?;
        if total_weight == 0 {
            return Err(anyhow!("Prize table needs at least one positive weight"));
        }
        Ok(Self {
            prizes,
            total_weight,
        })
    }

    pub fn default_prizes() -> Vec<WheelPrize> {
        let prize = |id: &str, label: &str, kind, value, weight| WheelPrize {
            id: id.to_string(),
            label: label.to_string(),
            kind,
            value,
            weight,
        };
        vec![
            prize("points-10", "10 points", PrizeKind::Points, 10, 35),
            prize("points-25", "25 points", PrizeKind::Points, 25, 25),
            prize("points-50", "50 points", PrizeKind::Points, 50, 12),
            prize("points-100", "100 points", PrizeKind::Points, 100, 5),
            prize("sticker-pack", "Sticker pack", PrizeKind::Item, 0, 8),
            prize("try-again", "Better luck next time", PrizeKind::Nothing, 0, 15),
        ]
    }

    pub fn prizes(&self) -> &[WheelPrize] {
        &self.prizes
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &WheelPrize {
        let roll = rng.gen_range(0..self.total_weight);
        self.select_by_roll(roll)
    }

    fn select_by_roll(&self, roll: u32) -> &WheelPrize {
        let mut cumulative = 0u32;
        for prize in &self.prizes {
            cumulative += prize.weight;
            if roll < cumulative {
                return prize;
            }
        }
        // roll < total_weight, so the loop always returns
        &self.prizes[self.prizes.len() - 1]
    }
}

/// Persisted outcome of one spin
#[derive(Debug, Clone, PartialEq)]
pub struct WheelSpin {
    pub id: String,
    pub uid: String,
    pub prize_id: String,
    pub prize_kind: PrizeKind,
    pub prize_value: i64,
    pub was_free: bool,
    pub points_charged: i64,
    pub spun_at: String,
}

impl WheelSpin {
    pub fn generate_id() -> String {
        format!("spin::{}", uuid::Uuid::new_v4().simple())
    }
}

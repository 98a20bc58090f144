//! Experience tiers and their currency multipliers.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub name: String,
    pub min_xp: i64,
    pub multiplier: f64,
}

impl Tier {
    pub fn new(name: &str, min_xp: i64, multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            min_xp,
            multiplier,
        }
    }

    /// Used when no configured tier covers the user's XP
    pub fn base() -> Self {
        Self::new("Member", 0, 1.0)
    }
}

/// Tiers ordered by ascending `min_xp`
#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(mut tiers: Vec<Tier>) -> Self {
        tiers.sort_by_key(|tier| tier.min_xp);
        Self { tiers }
    }

    pub fn default_tiers() -> Vec<Tier> {
        vec![
            Tier::new("Bronze", 0, 1.0),
            Tier::new("Silver", 500, 1.1),
            Tier::new("Gold", 2000, 1.25),
            Tier::new("Platinum", 5000, 1.5),
        ]
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    /// Highest tier whose `min_xp` does not exceed `xp`
    pub fn resolve(&self, xp: i64) -> Tier {
        self.tiers
            .iter()
            .rev()
            .find(|tier| tier.min_xp <= xp)
            .cloned()
            .unwrap_or_else(Tier::base)
    }

    /// First tier strictly above the one `xp` currently resolves to
    pub fn next_tier(&self, xp: i64) -> Option<Tier> {
        self.tiers.iter().find(|tier| tier.min_xp > xp).cloned()
    }

    pub fn validate(tiers: &[Tier]) -> Result<()> {
        for tier in tiers {
            if tier.name.trim().is_empty() {
                return Err(anyhow!("Tier names cannot be empty"));
            }
            if !(tier.multiplier.is_finite() && tier.multiplier > 0.0) {
                return Err(anyhow!("Tier {} has a non-positive multiplier", tier.name));
            }
            if tier.min_xp < 0 {
                return Err(anyhow!("Tier {} has a negative XP threshold", tier.name));
            }
        }
        let mut thresholds: Vec<i64> = tiers.iter().map(|t| t.min_xp).collect();
        thresholds.sort_unstable();
        thresholds.dedup();
        if thresholds.len() != tiers.len() {
            return Err(anyhow!("Tier XP thresholds must be unique"));
        }
        Ok(())
    }
}

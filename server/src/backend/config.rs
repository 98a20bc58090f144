//! # Service Configuration
//!
//! Loaded once at startup from a YAML file. Every section has defaults, so a
//! missing file or a partial file yields a runnable configuration.
//!
//! ## YAML Format
//!
//! ```yaml
//! version: "1.0"
//! server:
//!   bind: "127.0.0.1:3000"
//! auth:
//!   token_secret: "change-me"
//!   admin_uids: ["ops-1"]
//! reward:
//!   games:
//!     catan: { base_points: 20 }
//!     carcassonne: {}
//! wheel:
//!   spin_cost: 50
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::backend::domain::models::rotation::{RotationPolicy, FALLBACK_GAMES};
use crate::backend::domain::models::tier::{Tier, TierTable};
use crate::backend::domain::models::voucher::{DiscountType, Voucher};
use crate::backend::domain::models::wheel::{PrizeTable, WheelPrize};
use crate::backend::storage::connection::DATABASE_URL;

pub const CONFIG_VERSION: &str = "1.0";

/// Environment variable that overrides `auth.token_secret`
pub const TOKEN_SECRET_ENV: &str = "POINTS_TOKEN_SECRET";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub calendar: CalendarConfig,
    pub reward: RewardConfig,
    pub rotation: RotationConfig,
    pub tiers: Vec<Tier>,
    pub wheel: WheelConfig,
    pub vouchers: Vec<Voucher>,
    pub backfill: BackfillConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            calendar: CalendarConfig::default(),
            reward: RewardConfig::default(),
            rotation: RotationConfig::default(),
            tiers: TierTable::default_tiers(),
            wheel: WheelConfig::default(),
            vouchers: default_vouchers(),
            backfill: BackfillConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Origin allowed by CORS; any origin when unset
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            allowed_origin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Key material for bearer token signatures. Empty rejects every token.
    pub token_secret: String,
    pub admin_uids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Award requests allowed per identity in one window
    pub requests: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 10,
            window_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Offset of the canonical "today" from UTC
    pub utc_offset_hours: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub base_points: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub default_base_points: i64,
    /// Safety cap applied after the level multiplier
    pub max_points: i64,
    pub retry_penalty: i64,
    /// Known games and their optional base points
    pub games: BTreeMap<String, GameConfig>,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            default_base_points: 10,
            max_points: 100,
            retry_penalty: 5,
            games: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Size of the rotation before an admin sets a policy
    pub games_per_day: u32,
    pub fallback_games: Vec<String>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            games_per_day: 3,
            fallback_games: FALLBACK_GAMES.iter().map(|g| g.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    pub spin_cost: i64,
    pub prizes: Vec<WheelPrize>,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            spin_cost: 50,
            prizes: PrizeTable::default_prizes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    /// Transactions written per storage transaction
    pub batch_size: usize,
    /// Points an order earns per currency unit when the order did not record them
    pub order_points_per_currency: f64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: 400,
            order_points_per_currency: 1.0,
        }
    }
}

fn default_vouchers() -> Vec<Voucher> {
    vec![
        Voucher {
            id: "free-shipping".to_string(),
            name: "Free shipping".to_string(),
            points_cost: 300,
            discount_type: DiscountType::FreeShipping,
            discount_value: 0.0,
            validity_days: 30,
            active: true,
            per_user_limit: None,
            min_order_value: Some(20.0),
        },
        Voucher {
            id: "five-off".to_string(),
            name: "5 off your next order".to_string(),
            points_cost: 500,
            discount_type: DiscountType::FixedAmount,
            discount_value: 5.0,
            validity_days: 30,
            active: true,
            per_user_limit: None,
            min_order_value: Some(25.0),
        },
        Voucher {
            id: "ten-percent".to_string(),
            name: "10% off one order".to_string(),
            points_cost: 800,
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            validity_days: 14,
            active: true,
            per_user_limit: Some(1),
            min_order_value: None,
        },
    ]
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when no file is given or
    /// the file does not exist. Environment overrides apply afterwards.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let yaml_content = fs::read_to_string(path)?;
                let config = Self::from_yaml_str(&yaml_content)?;
                info!("Loaded configuration from {:?}", path);
                config
            }
            Some(path) => {
                warn!("Configuration file {:?} not found, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(TOKEN_SECRET_ENV) {
            if !secret.is_empty() {
                self.auth.token_secret = secret;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(anyhow!(
                "Unsupported configuration version {} (expected {})",
                self.version,
                CONFIG_VERSION
            ));
        }
        if self.rate_limit.requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(anyhow!("rate_limit.requests and rate_limit.window_secs must be positive"));
        }
        if !(-23..=23).contains(&self.calendar.utc_offset_hours) {
            return Err(anyhow!("calendar.utc_offset_hours must be within -23..=23"));
        }
        if self.reward.default_base_points < 1 || self.reward.max_points < 1 {
            return Err(anyhow!("reward.default_base_points and reward.max_points must be at least 1"));
        }
        if self.reward.retry_penalty < 0 {
            return Err(anyhow!("reward.retry_penalty cannot be negative"));
        }
        for (game_id, game) in &self.reward.games {
            if matches!(game.base_points, Some(points) if points < 1) {
                return Err(anyhow!("Game {} must award at least 1 base point", game_id));
            }
        }
        if !RotationPolicy::is_valid_games_per_day(self.rotation.games_per_day) {
            return Err(anyhow!("rotation.games_per_day must be within 1..=20"));
        }
        TierTable::validate(&self.tiers)?;
        if self.wheel.spin_cost < 0 {
            return Err(anyhow!("wheel.spin_cost cannot be negative"));
        }
        PrizeTable::new(self.wheel.prizes.clone())?;
        for voucher in &self.vouchers {
            voucher.validate()?;
        }
        if self.backfill.batch_size == 0 {
            return Err(anyhow!("backfill.batch_size must be positive"));
        }
        if !(self.backfill.order_points_per_currency.is_finite() && self.backfill.order_points_per_currency >= 0.0) {
            return Err(anyhow!("backfill.order_points_per_currency cannot be negative"));
        }
        Ok(())
    }

    /// Games named in the reward section, in id order
    pub fn known_games(&self) -> Vec<String> {
        self.reward.games.keys().cloned().collect()
    }

    pub fn base_points_for(&self, game_id: &str) -> Option<i64> {
        self.reward.games.get(game_id).and_then(|g| g.base_points)
    }

    pub fn is_admin(&self, uid: &str) -> bool {
        self.auth.admin_uids.iter().any(|admin| admin == uid)
    }
}

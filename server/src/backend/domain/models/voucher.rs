//! Voucher catalog entries and issued redemption codes.
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
    FreeShipping,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::FixedAmount => "fixed_amount",
            DiscountType::FreeShipping => "free_shipping",
        }
    }
}

impl FromStr for DiscountType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed_amount" => Ok(DiscountType::FixedAmount),
            "free_shipping" => Ok(DiscountType::FreeShipping),
            other => Err(anyhow!("Unknown discount type: {}", other)),
        }
    }
}

fn default_validity_days() -> u32 {
    30
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: String,
    pub name: String,
    pub points_cost: i64,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Maximum redemptions of this voucher per user
    #[serde(default)]
    pub per_user_limit: Option<u32>,
    /// Informational constraint enforced at checkout
    #[serde(default)]
    pub min_order_value: Option<f64>,
}

impl Voucher {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(anyhow!("Voucher id cannot be empty"));
        }
        if self.points_cost <= 0 {
            return Err(anyhow!("Voucher {} must cost a positive number of points", self.id));
        }
        if self.validity_days == 0 {
            return Err(anyhow!("Voucher {} must be valid for at least one day", self.id));
        }
        if self.discount_type == DiscountType::Percentage
            && !(self.discount_value > 0.0 && self.discount_value <= 100.0)
        {
            return Err(anyhow!("Voucher {} percentage must be within (0, 100]", self.id));
        }
        Ok(())
    }
}

/// An issued code, bound to one user and consumable once
#[derive(Debug, Clone, PartialEq)]
pub struct VoucherRedemption {
    pub id: String,
    pub code: String,
    pub uid: String,
    pub voucher_id: String,
    pub points_spent: i64,
    pub issued_at: String,
    pub expires_at: String,
    pub used_at: Option<String>,
}

impl VoucherRedemption {
    pub fn generate_id() -> String {
        format!("redemption::{}", uuid::Uuid::new_v4().simple())
    }

    /// Human-typeable code, e.g. "JP-4F9A1C2E7B30"
    pub fn generate_code() -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        format!("JP-{}", &raw[..12])
    }
}

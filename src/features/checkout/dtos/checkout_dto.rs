use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::features::checkout::models::{Payment, PaymentStatus};

/// Credit packs on sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CreditPack {
    /// 10 credits for $4.99
    Starter,
    /// 30 credits for $9.99
    Standard,
    /// 100 credits for $24.99
    Pro,
}

impl CreditPack {
    pub const ALL: [CreditPack; 3] = [Self::Starter, Self::Standard, Self::Pro];

    pub fn credits(self) -> i32 {
        match self {
            CreditPack::Starter => 10,
            CreditPack::Standard => 30,
            CreditPack::Pro => 100,
        }
    }

    pub fn amount_cents(self) -> i64 {
        match self {
            CreditPack::Starter => 499,
            CreditPack::Standard => 999,
            CreditPack::Pro => 2499,
        }
    }

    pub fn product_name(self) -> String {
        let name = match self {
            CreditPack::Starter => "Starter",
            CreditPack::Standard => "Standard",
            CreditPack::Pro => "Pro",
        };
        format!("Brainwave {} ({} credits)", name, self.credits())
    }
}

impl fmt::Display for CreditPack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreditPack::Starter => write!(f, "starter"),
            CreditPack::Standard => write!(f, "standard"),
            CreditPack::Pro => write!(f, "pro"),
        }
    }
}

impl FromStr for CreditPack {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CreditPack::ALL
            .into_iter()
            .find(|pack| pack.to_string() == s)
            .ok_or_else(|| format!("Unknown credit pack '{}'", s))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCheckoutDto {
    pub pack: CreditPack,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionDto {
    /// Hosted Stripe Checkout page to redirect the browser to
    pub url: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentDto {
    pub id: Uuid,
    pub credit_pack: String,
    pub credits: i32,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            credit_pack: p.credit_pack,
            credits: p.credits,
            amount_cents: p.amount_cents,
            status: p.status,
            created_at: p.created_at,
            completed_at: p.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAckDto {
    pub received: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_prices() {
        assert_eq!(CreditPack::Starter.credits(), 10);
        assert_eq!(CreditPack::Starter.amount_cents(), 499);
        assert_eq!(CreditPack::Standard.credits(), 30);
        assert_eq!(CreditPack::Standard.amount_cents(), 999);
        assert_eq!(CreditPack::Pro.credits(), 100);
        assert_eq!(CreditPack::Pro.amount_cents(), 2499);
        assert_eq!(CreditPack::Pro.product_name(), "Brainwave Pro (100 credits)");
    }

    #[test]
    fn test_pack_string_round_trip() {
        for pack in CreditPack::ALL {
            assert_eq!(pack.to_string().parse::<CreditPack>().unwrap(), pack);
        }
        assert!("platinum".parse::<CreditPack>().is_err());

        let dto: CreateCheckoutDto = serde_json::from_str(r#"{"pack": "standard"}"#).unwrap();
        assert_eq!(dto.pack, CreditPack::Standard);
    }
}

use uuid::Uuid;

use chrono::{DateTime, Utc};

use serde::Serialize;

use crate::domain::{DurationMonths, Price, ServiceName};

/// New Offer request
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub name: ServiceName,
    pub price: Price,
    pub duration_months: DurationMonths,
}

/// Stored Offer record
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Offer {
    pub id: Uuid,
    /// Service name, unique together with the price
    pub name: String,
    pub price: i32,
    pub duration_months: i32,
    /// Creation and update timestamps
    /// NOTE: Auto-set and updated by database triggers
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

use uuid::Uuid;

use chrono::{DateTime, Months, NaiveDate, Utc};

use serde::Serialize;

use crate::domain::{Period, Price, ServiceName};

/// New Subscription request, resolving the offer by service name and price
#[derive(Debug, Clone)]
pub struct NewSubscriptionByName {
    pub user_id: Uuid,
    pub service_name: ServiceName,
    pub price: Price,
    pub start_date: NaiveDate,
    /// Only used to size a newly created offer
    pub end_date: Option<NaiveDate>,
}

/// New Subscription record, with the interval already derived from its offer
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub offer_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Stored Subscription record
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub offer_id: Uuid,
    /// Active on `start_date <= d < end_date`
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date < self.end_date
    }
}

/// Subscription joined with the current name and price of its offer
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SubscriptionFullInfo {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub subscription: Subscription,
    pub offer_name: String,
    pub price: i32,
}

/// Row filter shared by every subscription listing
#[derive(Debug, Clone, Default)]
pub struct SubscriptionFilter {
    pub user_id: Option<Uuid>,
    pub service_name: Option<ServiceName>,
    pub period: Period,
}

impl SubscriptionFilter {
    pub fn matches(&self, info: &SubscriptionFullInfo) -> bool {
        self.user_id
            .map_or(true, |user_id| info.subscription.user_id == user_id)
            && self
                .service_name
                .as_ref()
                .map_or(true, |name| info.offer_name == name.as_ref())
            && self.period.contains(info.subscription.start_date)
    }
}

/// One slice of a listing as returned by a store
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total_count: i64,
}

/// One slice of a subscription listing, plus the price summed over the whole filtered set
#[derive(Debug, Clone)]
pub struct PricedListing {
    pub items: Vec<SubscriptionFullInfo>,
    pub total_count: i64,
    pub total_price: i64,
}

/// End of a subscription starting on `start` for an offer lasting `months`
///
/// Month arithmetic clamps to the last day of shorter months (Jan 31 + 1 month = Feb 28/29).
/// `None` if the result falls outside the supported calendar.
pub fn end_date_for(start: NaiveDate, months: i32) -> Option<NaiveDate> {
    let months = u32::try_from(months).ok()?;
    start.checked_add_months(Months::new(months))
}

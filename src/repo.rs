use chrono::NaiveDate;

use uuid::Uuid;

use crate::domain::{DurationMonths, Period, Price, ServiceName};
use crate::model::{
    Listing, NewSubscription, Offer, PricedListing, Subscription, SubscriptionFullInfo,
};

pub mod memory;
mod offers;
pub mod postgres;
mod subscriptions;

pub use memory::InMemoryTransactor;
pub use offers::OffersRepo;
pub use postgres::{PgTransactor, PgUnitOfWork};
pub use subscriptions::SubscriptionsRepo;

/// SQLSTATE raised by the subscription overlap trigger (`exclusion_violation`)
const OVERLAP_VIOLATION_CODE: &str = "23P01";

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by the stores.
/// Only the sentinel kinds are meant to be matched on; everything else is opaque.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Record conflicts with an existing unique record")]
    Conflict,

    #[error("Subscription starts inside an active subscription of the same service")]
    Overlap,

    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

/// Classify storage driver errors into store sentinels, recording the failing operation otherwise
pub(crate) trait SqlxResultExt<T> {
    fn or_store_error(self, operation: &'static str) -> StoreResult<T>;
}

impl<T> SqlxResultExt<T> for sqlx::Result<T> {
    fn or_store_error(self, operation: &'static str) -> StoreResult<T> {
        self.map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict,
            sqlx::Error::Database(db) if db.code().as_deref() == Some(OVERLAP_VIOLATION_CODE) => {
                StoreError::Overlap
            }
            e => StoreError::Unavailable(anyhow::Error::new(e).context(operation)),
        })
    }
}

/// Offer persistence, scoped to one unit of work
#[async_trait::async_trait]
pub trait OfferStore {
    /// Insert a new offer, failing with `Conflict` if the name and price are taken
    async fn insert_offer(
        &mut self,
        name: &ServiceName,
        price: Price,
        duration_months: DurationMonths,
    ) -> StoreResult<Offer>;

    async fn fetch_offer_by_id(&mut self, id: Uuid) -> StoreResult<Offer>;

    /// Fetch an offer and hold it exclusively until the unit of work ends
    async fn fetch_offer_for_update(&mut self, id: Uuid) -> StoreResult<Offer>;

    async fn fetch_offer_by_name_and_price(
        &mut self,
        name: &ServiceName,
        price: Price,
    ) -> StoreResult<Offer>;

    async fn fetch_offers_page(&mut self, limit: i64, offset: i64) -> StoreResult<Listing<Offer>>;

    /// Delete an offer, failing with `NotFound` if no row matched
    async fn delete_offer(&mut self, id: Uuid) -> StoreResult<()>;
}

/// Subscription persistence, scoped to one unit of work
#[async_trait::async_trait]
pub trait SubscriptionStore {
    async fn insert_subscription(
        &mut self,
        new_subscription: &NewSubscription,
    ) -> StoreResult<Subscription>;

    /// Delete a subscription, failing with `NotFound` if no row matched
    async fn delete_subscription(&mut self, id: Uuid) -> StoreResult<()>;

    async fn fetch_subscriptions_page(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Listing<SubscriptionFullInfo>>;

    async fn fetch_subscriptions_page_by_user(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Listing<SubscriptionFullInfo>>;

    /// Page of a user's subscriptions to one service, starting within the given period.
    /// The price is summed over every matching row, not only the returned slice.
    async fn fetch_subscriptions_page_by_user_and_service(
        &mut self,
        user_id: Uuid,
        service_name: &ServiceName,
        period: Period,
        limit: i64,
        offset: i64,
    ) -> StoreResult<PricedListing>;

    /// Whether the user has a subscription to the service with `start_date <= date < end_date`
    async fn has_active_on_date(
        &mut self,
        user_id: Uuid,
        service_name: &str,
        date: NaiveDate,
    ) -> StoreResult<bool>;

    async fn fetch_subscriptions_by_offer(
        &mut self,
        offer_id: Uuid,
    ) -> StoreResult<Vec<Subscription>>;
}

/// One atomic unit of work over both stores.
/// Dropping a unit without committing it rolls every change back.
#[async_trait::async_trait]
pub trait UnitOfWork: OfferStore + SubscriptionStore + Send {
    async fn commit(self) -> StoreResult<()>;
}

/// Transaction boundary: hands out units of work against durable storage
#[async_trait::async_trait]
pub trait Transactor: Send + Sync + 'static {
    type Unit: UnitOfWork;

    async fn begin(&self) -> StoreResult<Self::Unit>;
}

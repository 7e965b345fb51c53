use std::time::Duration;

use anyhow::Context;

use chrono::NaiveDate;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};

use uuid::Uuid;

use crate::domain::{DurationMonths, Period, Price, ServiceName};
use crate::model::{
    Listing, NewSubscription, Offer, PricedListing, Subscription, SubscriptionFilter,
    SubscriptionFullInfo,
};
use crate::settings::DatabaseSettings;

use super::{
    OfferStore, OffersRepo, StoreResult, SubscriptionStore, SubscriptionsRepo, Transactor,
    UnitOfWork,
};

/// Open a connection pool, retrying the first connection a fixed number of times
#[tracing::instrument(name = "Connect to database", skip(settings))]
pub async fn connect_with_retry(settings: &DatabaseSettings) -> anyhow::Result<PgPool> {
    connect_options_with_retry(
        settings.pool_options(),
        settings.with_db(),
        settings.connect_attempts(),
        settings.connect_retry_delay(),
    )
    .await
}

async fn connect_options_with_retry(
    pool_options: PgPoolOptions,
    options: PgConnectOptions,
    attempts: u32,
    delay: Duration,
) -> anyhow::Result<PgPool> {
    let mut attempt = 1;
    loop {
        match pool_options.clone().connect_with(options.clone()).await {
            Ok(pool) => return Ok(pool),
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    "Failed to connect to database (attempt {} of {}): {}",
                    attempt,
                    attempts,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to connect to database after {} attempts", attempts)
                })
            }
        }
    }
}

/// Apply any pending schema migrations
#[tracing::instrument(name = "Run database migrations", skip(pool))]
pub async fn migrate(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")
}

/// Transaction boundary backed by a Postgres connection pool
#[derive(Debug, Clone)]
pub struct PgTransactor {
    pool: PgPool,
}

impl PgTransactor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Transactor for PgTransactor {
    type Unit = PgUnitOfWork;

    async fn begin(&self) -> StoreResult<PgUnitOfWork> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(PgUnitOfWork { tx })
    }
}

/// A single database transaction.
/// NOTE: sqlx rolls the transaction back when it is dropped uncommitted.
#[derive(Debug)]
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl OfferStore for PgUnitOfWork {
    async fn insert_offer(
        &mut self,
        name: &ServiceName,
        price: Price,
        duration_months: DurationMonths,
    ) -> StoreResult<Offer> {
        OffersRepo::insert(&mut *self.tx, name, price, duration_months).await
    }

    async fn fetch_offer_by_id(&mut self, id: Uuid) -> StoreResult<Offer> {
        OffersRepo::fetch_by_id(&mut *self.tx, id).await
    }

    async fn fetch_offer_for_update(&mut self, id: Uuid) -> StoreResult<Offer> {
        OffersRepo::fetch_for_update(&mut *self.tx, id).await
    }

    async fn fetch_offer_by_name_and_price(
        &mut self,
        name: &ServiceName,
        price: Price,
    ) -> StoreResult<Offer> {
        OffersRepo::fetch_by_name_and_price(&mut *self.tx, name, price).await
    }

    async fn fetch_offers_page(&mut self, limit: i64, offset: i64) -> StoreResult<Listing<Offer>> {
        OffersRepo::fetch_page(&mut *self.tx, limit, offset).await
    }

    async fn delete_offer(&mut self, id: Uuid) -> StoreResult<()> {
        OffersRepo::delete(&mut *self.tx, id).await
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for PgUnitOfWork {
    async fn insert_subscription(
        &mut self,
        new_subscription: &NewSubscription,
    ) -> StoreResult<Subscription> {
        SubscriptionsRepo::insert(&mut *self.tx, new_subscription).await
    }

    async fn delete_subscription(&mut self, id: Uuid) -> StoreResult<()> {
        SubscriptionsRepo::delete(&mut *self.tx, id).await
    }

    async fn fetch_subscriptions_page(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Listing<SubscriptionFullInfo>> {
        let filter = SubscriptionFilter::default();
        let listing = SubscriptionsRepo::fetch_page(&mut *self.tx, &filter, limit, offset).await?;
        Ok(Listing {
            items: listing.items,
            total_count: listing.total_count,
        })
    }

    async fn fetch_subscriptions_page_by_user(
        &mut self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Listing<SubscriptionFullInfo>> {
        let filter = SubscriptionFilter {
            user_id: Some(user_id),
            ..Default::default()
        };
        let listing = SubscriptionsRepo::fetch_page(&mut *self.tx, &filter, limit, offset).await?;
        Ok(Listing {
            items: listing.items,
            total_count: listing.total_count,
        })
    }

    async fn fetch_subscriptions_page_by_user_and_service(
        &mut self,
        user_id: Uuid,
        service_name: &ServiceName,
        period: Period,
        limit: i64,
        offset: i64,
    ) -> StoreResult<PricedListing> {
        let filter = SubscriptionFilter {
            user_id: Some(user_id),
            service_name: Some(service_name.clone()),
            period,
        };
        SubscriptionsRepo::fetch_page(&mut *self.tx, &filter, limit, offset).await
    }

    async fn has_active_on_date(
        &mut self,
        user_id: Uuid,
        service_name: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        SubscriptionsRepo::has_active_on_date(&mut *self.tx, user_id, service_name, date).await
    }

    async fn fetch_subscriptions_by_offer(
        &mut self,
        offer_id: Uuid,
    ) -> StoreResult<Vec<Subscription>> {
        SubscriptionsRepo::fetch_by_offer(&mut *self.tx, offer_id).await
    }
}

#[async_trait::async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit transaction")?;
        Ok(())
    }
}

use chrono::{DateTime, NaiveDate, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::model::{NewSubscription, PricedListing, Subscription, SubscriptionFilter, SubscriptionFullInfo};

use super::{SqlxResultExt, StoreError, StoreResult};

/// Repository for interfacing with the subscription table
#[derive(Debug)]
pub struct SubscriptionsRepo;

impl SubscriptionsRepo {
    #[tracing::instrument(name = "Insert subscription", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        new_subscription: &NewSubscription,
    ) -> StoreResult<Subscription> {
        sqlx::query_as::<_, Subscription>(
            "insert into subscription(user_id, offer_id, start_date, end_date) values ($1, $2, $3, $4)
             returning id, user_id, offer_id, start_date, end_date, created_at, updated_at",
        )
        .bind(new_subscription.user_id)
        .bind(new_subscription.offer_id)
        .bind(new_subscription.start_date)
        .bind(new_subscription.end_date)
        .fetch_one(executor)
        .await
        .or_store_error("Failed to insert subscription")
    }

    #[tracing::instrument(name = "Delete subscription", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("delete from subscription where id=$1")
            .bind(id)
            .execute(executor)
            .await
            .or_store_error("Failed to delete subscription")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Fetch one slice of the filtered subscriptions.
    /// The count and the price sum cover the whole filtered set and come from the same
    /// statement (and so the same snapshot) as the slice.
    #[tracing::instrument(name = "Fetch page of subscriptions", skip(executor))]
    pub async fn fetch_page<'con>(
        executor: impl PgExecutor<'con>,
        filter: &SubscriptionFilter,
        limit: i64,
        offset: i64,
    ) -> StoreResult<PricedListing> {
        let rows = sqlx::query_as::<_, SubscriptionPageRow>(
            "with filtered as (
                 select s.id, s.user_id, s.offer_id, s.start_date, s.end_date, s.created_at, s.updated_at,
                        o.name as offer_name, o.price
                 from subscription s
                 join offer o on o.id = s.offer_id
                 where ($1::uuid is null or s.user_id = $1)
                   and ($2::text is null or o.name = $2)
                   and ($3::date is null or s.start_date >= $3)
                   and ($4::date is null or s.start_date <= $4)
             ), totals as (
                 select count(*) as total_count, coalesce(sum(price), 0)::bigint as total_price
                 from filtered
             )
             select t.total_count, t.total_price,
                    p.id, p.user_id, p.offer_id, p.start_date, p.end_date, p.created_at, p.updated_at,
                    p.offer_name, p.price
             from totals t
             left join lateral (
                 select * from filtered order by start_date, id limit $5 offset $6
             ) p on true",
        )
        .bind(filter.user_id)
        .bind(filter.service_name.as_ref().map(|name| name.as_ref()))
        .bind(filter.period.start())
        .bind(filter.period.end())
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .or_store_error("Failed to fetch page of subscriptions")?;

        let (total_count, total_price) = rows
            .first()
            .map_or((0, 0), |row| (row.total_count, row.total_price));
        let items = rows
            .into_iter()
            .filter_map(SubscriptionPageRow::into_full_info)
            .collect();

        Ok(PricedListing {
            items,
            total_count,
            total_price,
        })
    }

    #[tracing::instrument(name = "Check for an active subscription on a date", skip(executor))]
    pub async fn has_active_on_date<'con>(
        executor: impl PgExecutor<'con>,
        user_id: Uuid,
        service_name: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "select exists (
                 select 1 from subscription s
                 join offer o on o.id = s.offer_id
                 where s.user_id = $1 and o.name = $2 and s.start_date <= $3 and s.end_date > $3
             )",
        )
        .bind(user_id)
        .bind(service_name)
        .bind(date)
        .fetch_one(executor)
        .await
        .or_store_error("Failed to check for an active subscription")
    }

    #[tracing::instrument(name = "Fetch subscriptions by offer", skip(executor))]
    pub async fn fetch_by_offer<'con>(
        executor: impl PgExecutor<'con>,
        offer_id: Uuid,
    ) -> StoreResult<Vec<Subscription>> {
        sqlx::query_as::<_, Subscription>(
            "select id, user_id, offer_id, start_date, end_date, created_at, updated_at
             from subscription where offer_id=$1",
        )
        .bind(offer_id)
        .fetch_all(executor)
        .await
        .or_store_error("Failed to fetch subscriptions by offer")
    }
}

/// Page row, the subscription columns are null when the page is past the end of the data
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionPageRow {
    total_count: i64,
    total_price: i64,
    id: Option<Uuid>,
    user_id: Option<Uuid>,
    offer_id: Option<Uuid>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    offer_name: Option<String>,
    price: Option<i32>,
}

impl SubscriptionPageRow {
    fn into_full_info(self) -> Option<SubscriptionFullInfo> {
        Some(SubscriptionFullInfo {
            subscription: Subscription {
                id: self.id?,
                user_id: self.user_id?,
                offer_id: self.offer_id?,
                start_date: self.start_date?,
                end_date: self.end_date?,
                created_at: self.created_at?,
                updated_at: self.updated_at?,
            },
            offer_name: self.offer_name?,
            price: self.price?,
        })
    }
}

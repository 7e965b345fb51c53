use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{DurationMonths, Price, ServiceName};
use crate::model::{Listing, Offer};

use super::{SqlxResultExt, StoreError, StoreResult};

/// Repository for interfacing with the offer table
#[derive(Debug)]
pub struct OffersRepo;

impl OffersRepo {
    #[tracing::instrument(name = "Insert offer", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        name: &ServiceName,
        price: Price,
        duration_months: DurationMonths,
    ) -> StoreResult<Offer> {
        sqlx::query_as::<_, Offer>(
            "insert into offer(name, price, duration_months) values ($1, $2, $3)
             returning id, name, price, duration_months, created_at, updated_at",
        )
        .bind(name.as_ref())
        .bind(price.value())
        .bind(i32::from(duration_months))
        .fetch_one(executor)
        .await
        .or_store_error("Failed to insert offer")
    }

    /// Fetch an offer by id, share-locking the row so it cannot be deleted underneath the caller
    #[tracing::instrument(name = "Fetch offer by id", skip(executor))]
    pub async fn fetch_by_id<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> StoreResult<Offer> {
        sqlx::query_as::<_, Offer>(
            "select id, name, price, duration_months, created_at, updated_at
             from offer where id=$1 for share",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .or_store_error("Failed to fetch offer by id")?
        .ok_or(StoreError::NotFound)
    }

    /// Fetch an offer by id, locking the row exclusively so concurrent subscribers wait for the caller
    #[tracing::instrument(name = "Fetch offer by id for update", skip(executor))]
    pub async fn fetch_for_update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> StoreResult<Offer> {
        sqlx::query_as::<_, Offer>(
            "select id, name, price, duration_months, created_at, updated_at
             from offer where id=$1 for update",
        )
        .bind(id)
        .fetch_optional(executor)
        .await
        .or_store_error("Failed to fetch offer by id for update")?
        .ok_or(StoreError::NotFound)
    }

    #[tracing::instrument(name = "Fetch offer by name and price", skip(executor))]
    pub async fn fetch_by_name_and_price<'con>(
        executor: impl PgExecutor<'con>,
        name: &ServiceName,
        price: Price,
    ) -> StoreResult<Offer> {
        sqlx::query_as::<_, Offer>(
            "select id, name, price, duration_months, created_at, updated_at
             from offer where name=$1 and price=$2 for share",
        )
        .bind(name.as_ref())
        .bind(price.value())
        .fetch_optional(executor)
        .await
        .or_store_error("Failed to fetch offer by name and price")?
        .ok_or(StoreError::NotFound)
    }

    /// Fetch one slice of all offers along with the total offer count, in a single statement
    #[tracing::instrument(name = "Fetch page of offers", skip(executor))]
    pub async fn fetch_page<'con>(
        executor: impl PgExecutor<'con>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Listing<Offer>> {
        let rows = sqlx::query_as::<_, OfferPageRow>(
            "with totals as (select count(*) as total_count from offer)
             select t.total_count, p.id, p.name, p.price, p.duration_months, p.created_at, p.updated_at
             from totals t
             left join lateral (
                 select * from offer order by name, price, id limit $1 offset $2
             ) p on true",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await
        .or_store_error("Failed to fetch page of offers")?;

        let total_count = rows.first().map_or(0, |row| row.total_count);
        let items = rows.into_iter().filter_map(OfferPageRow::into_offer).collect();

        Ok(Listing { items, total_count })
    }

    #[tracing::instrument(name = "Delete offer", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("delete from offer where id=$1")
            .bind(id)
            .execute(executor)
            .await
            .or_store_error("Failed to delete offer")?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

/// Page row, the offer columns are null when the page is past the end of the data
#[derive(Debug, sqlx::FromRow)]
struct OfferPageRow {
    total_count: i64,
    id: Option<Uuid>,
    name: Option<String>,
    price: Option<i32>,
    duration_months: Option<i32>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl OfferPageRow {
    fn into_offer(self) -> Option<Offer> {
        Some(Offer {
            id: self.id?,
            name: self.name?,
            price: self.price?,
            duration_months: self.duration_months?,
            created_at: self.created_at?,
            updated_at: self.updated_at?,
        })
    }
}

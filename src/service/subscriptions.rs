use chrono::NaiveDate;

use uuid::Uuid;

use crate::domain::{DurationMonths, Page, Period, PricedPage, ServiceName};
use crate::model::{
    end_date_for, NewSubscription, NewSubscriptionByName, Offer, SubscriptionFullInfo,
};
use crate::repo::{OfferStore, StoreError, SubscriptionStore, Transactor, UnitOfWork};

use super::error::StoreResultExt;
use super::{page_request, Engine, Error, ServiceResult};

impl<T: Transactor> Engine<T> {
    /// Subscribe a user to the offer with the given service name and price,
    /// creating the offer first if nobody has subscribed to it yet
    #[tracing::instrument(name = "Create a subscription by service name", skip(self))]
    pub async fn create_subscription_by_name(
        &self,
        request: NewSubscriptionByName,
    ) -> ServiceResult<SubscriptionFullInfo> {
        if let Some(end_date) = request.end_date {
            if end_date <= request.start_date {
                return Err(Error::InvalidPeriod(format!(
                    "End date {} must be after start date {}",
                    end_date, request.start_date
                )));
            }
        }

        let mut unit = self.begin().await?;

        let offer = match unit
            .fetch_offer_by_name_and_price(&request.service_name, request.price)
            .await
        {
            Ok(offer) => offer,
            Err(StoreError::NotFound) => {
                let duration_months = request.end_date.map_or(DurationMonths::ONE, |end_date| {
                    DurationMonths::between(request.start_date, end_date)
                });
                create_offer_for(&mut unit, &request, duration_months).await?
            }
            Err(e) => return Err(Error::unavailable("resolve offer by name and price", e)),
        };

        let info = subscribe(&mut unit, request.user_id, offer, request.start_date).await?;
        unit.commit().await.or_unavailable("commit new subscription")?;

        tracing::info!(subscription_id = %info.subscription.id, "Created subscription");
        Ok(info)
    }

    /// Subscribe a user to an existing offer
    #[tracing::instrument(name = "Create a subscription by offer id", skip(self))]
    pub async fn create_subscription_by_offer_id(
        &self,
        user_id: Uuid,
        offer_id: Uuid,
        start_date: NaiveDate,
    ) -> ServiceResult<SubscriptionFullInfo> {
        let mut unit = self.begin().await?;

        let offer = match unit.fetch_offer_by_id(offer_id).await {
            Ok(offer) => offer,
            Err(StoreError::NotFound) => return Err(Error::OfferNotFound(offer_id)),
            Err(e) => return Err(Error::unavailable("resolve offer by id", e)),
        };

        let info = subscribe(&mut unit, user_id, offer, start_date).await?;
        unit.commit().await.or_unavailable("commit new subscription")?;

        tracing::info!(subscription_id = %info.subscription.id, "Created subscription");
        Ok(info)
    }

    #[tracing::instrument(name = "Delete a subscription", skip(self))]
    pub async fn delete_subscription(&self, subscription_id: Uuid) -> ServiceResult<()> {
        let mut unit = self.begin().await?;

        match unit.delete_subscription(subscription_id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(Error::SubscriptionNotFound(subscription_id)),
            Err(e) => return Err(Error::unavailable("delete subscription", e)),
        }

        unit.commit()
            .await
            .or_unavailable("commit subscription deletion")
    }

    #[tracing::instrument(name = "List subscriptions", skip(self))]
    pub async fn list_subscriptions(
        &self,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<Page<SubscriptionFullInfo>> {
        let request = page_request(page, page_size)?;
        let mut unit = self.begin().await?;

        let listing = unit
            .fetch_subscriptions_page(request.limit(), request.offset())
            .await
            .or_unavailable("list subscriptions")?;
        unit.commit()
            .await
            .or_unavailable("finish listing subscriptions")?;

        Ok(Page::new(request, listing.items, listing.total_count))
    }

    #[tracing::instrument(name = "List subscriptions of a user", skip(self))]
    pub async fn list_subscriptions_by_user(
        &self,
        user_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<Page<SubscriptionFullInfo>> {
        let request = page_request(page, page_size)?;
        let mut unit = self.begin().await?;

        let listing = unit
            .fetch_subscriptions_page_by_user(user_id, request.limit(), request.offset())
            .await
            .or_unavailable("list subscriptions of user")?;
        unit.commit()
            .await
            .or_unavailable("finish listing subscriptions of user")?;

        Ok(Page::new(request, listing.items, listing.total_count))
    }

    /// A user's subscriptions to one service starting within the period, both ends inclusive,
    /// along with the summed price of every matching subscription
    #[tracing::instrument(name = "List subscriptions of a user by service name", skip(self))]
    pub async fn list_subscriptions_by_user_and_service_name(
        &self,
        user_id: Uuid,
        service_name: ServiceName,
        start_period: Option<NaiveDate>,
        end_period: Option<NaiveDate>,
        page: i64,
        page_size: i64,
    ) -> ServiceResult<PricedPage<SubscriptionFullInfo>> {
        let request = page_request(page, page_size)?;
        let period = Period::new(start_period, end_period).map_err(Error::InvalidPeriod)?;
        let mut unit = self.begin().await?;

        let listing = unit
            .fetch_subscriptions_page_by_user_and_service(
                user_id,
                &service_name,
                period,
                request.limit(),
                request.offset(),
            )
            .await
            .or_unavailable("list subscriptions of user by service name")?;
        unit.commit()
            .await
            .or_unavailable("finish listing subscriptions of user by service name")?;

        Ok(PricedPage {
            page: Page::new(request, listing.items, listing.total_count),
            total_price: listing.total_price,
        })
    }
}

async fn create_offer_for<U: UnitOfWork>(
    unit: &mut U,
    request: &NewSubscriptionByName,
    duration_months: DurationMonths,
) -> ServiceResult<Offer> {
    match unit
        .insert_offer(&request.service_name, request.price, duration_months)
        .await
    {
        Ok(offer) => {
            tracing::info!(offer_id = %offer.id, "Created offer for new subscription");
            Ok(offer)
        }
        // Another unit created the same offer after our lookup
        Err(StoreError::Conflict) => {
            tracing::warn!(
                "Offer {} with price {} was created concurrently",
                request.service_name,
                request.price
            );
            Err(Error::CannotCreateOffer {
                name: request.service_name.to_string(),
                price: request.price.value(),
            })
        }
        Err(e) => Err(Error::unavailable("create offer", e)),
    }
}

/// Check the user has no subscription to the same service active on the start date,
/// then insert one lasting the offer's duration
async fn subscribe<U: UnitOfWork>(
    unit: &mut U,
    user_id: Uuid,
    offer: Offer,
    start_date: NaiveDate,
) -> ServiceResult<SubscriptionFullInfo> {
    let already_active = || {
        tracing::warn!(
            "User {} already has an active {} subscription on {}",
            user_id,
            offer.name,
            start_date
        );
        Error::UserAlreadyHasActiveSubscription {
            user_id,
            service_name: offer.name.clone(),
            date: start_date,
        }
    };

    let active = unit
        .has_active_on_date(user_id, &offer.name, start_date)
        .await
        .or_unavailable("check for an active subscription")?;
    if active {
        return Err(already_active());
    }

    let end_date = end_date_for(start_date, offer.duration_months).ok_or_else(|| {
        Error::InvalidPeriod(format!(
            "Subscription starting on {} for {} months ends outside the supported calendar",
            start_date, offer.duration_months
        ))
    })?;

    let new_subscription = NewSubscription {
        user_id,
        offer_id: offer.id,
        start_date,
        end_date,
    };
    let subscription = match unit.insert_subscription(&new_subscription).await {
        Ok(subscription) => subscription,
        Err(StoreError::Overlap) => return Err(already_active()),
        Err(e) => return Err(Error::unavailable("insert subscription", e)),
    };

    Ok(SubscriptionFullInfo {
        subscription,
        offer_name: offer.name,
        price: offer.price,
    })
}

use uuid::Uuid;

use crate::domain::Page;
use crate::model::{NewOffer, Offer};
use crate::repo::{OfferStore, StoreError, SubscriptionStore, Transactor, UnitOfWork};

use super::error::StoreResultExt;
use super::{page_request, Engine, Error, ServiceResult};

impl<T: Transactor> Engine<T> {
    #[tracing::instrument(name = "Create an offer", skip(self))]
    pub async fn create_offer(&self, new_offer: NewOffer) -> ServiceResult<Offer> {
        let mut unit = self.begin().await?;

        let offer = match unit
            .insert_offer(&new_offer.name, new_offer.price, new_offer.duration_months)
            .await
        {
            Ok(offer) => offer,
            Err(StoreError::Conflict) => {
                return Err(Error::OfferAlreadyExists {
                    name: new_offer.name.to_string(),
                    price: new_offer.price.value(),
                })
            }
            Err(e) => return Err(Error::unavailable("create offer", e)),
        };

        unit.commit().await.or_unavailable("commit new offer")?;

        tracing::info!(offer_id = %offer.id, "Created offer");
        Ok(offer)
    }

    #[tracing::instrument(name = "List offers", skip(self))]
    pub async fn list_offers(&self, page: i64, page_size: i64) -> ServiceResult<Page<Offer>> {
        let request = page_request(page, page_size)?;
        let mut unit = self.begin().await?;

        let listing = unit
            .fetch_offers_page(request.limit(), request.offset())
            .await
            .or_unavailable("list offers")?;
        unit.commit().await.or_unavailable("finish listing offers")?;

        Ok(Page::new(request, listing.items, listing.total_count))
    }

    /// Delete an offer that no subscription refers to, active or not
    #[tracing::instrument(name = "Delete an offer", skip(self))]
    pub async fn delete_offer(&self, offer_id: Uuid) -> ServiceResult<()> {
        let mut unit = self.begin().await?;

        // Lock the offer first so no subscription can be attached to it in the meantime
        match unit.fetch_offer_for_update(offer_id).await {
            Ok(_) => {}
            Err(StoreError::NotFound) => return Err(Error::OfferNotFound(offer_id)),
            Err(e) => return Err(Error::unavailable("lock offer", e)),
        }

        let referencing = unit
            .fetch_subscriptions_by_offer(offer_id)
            .await
            .or_unavailable("list subscriptions of offer")?;
        if !referencing.is_empty() {
            tracing::warn!(
                "Refusing to delete offer {} referenced by {} subscriptions",
                offer_id,
                referencing.len()
            );
            return Err(Error::ActiveSubscriptionsExist(offer_id));
        }

        match unit.delete_offer(offer_id).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => return Err(Error::OfferNotFound(offer_id)),
            Err(e) => return Err(Error::unavailable("delete offer", e)),
        }

        unit.commit().await.or_unavailable("commit offer deletion")
    }
}

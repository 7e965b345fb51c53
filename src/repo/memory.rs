//! In-memory implementation of the store contracts.
//!
//! Units of work are serialised: [`InMemoryTransactor::begin`] holds the state lock for the
//! lifetime of the unit, works on a private copy, and swaps that copy in on commit. Dropping
//! an uncommitted unit discards the copy, so it behaves like a rolled back transaction.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use uuid::Uuid;

use crate::domain::{DurationMonths, Period, Price, ServiceName};
use crate::model::{
    Listing, NewSubscription, Offer, PricedListing, Subscription, SubscriptionFilter,
    SubscriptionFullInfo,
};

use super::{OfferStore, StoreError, StoreResult, SubscriptionStore, Transactor, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct State {
    offers: Vec<Offer>,
    subscriptions: Vec<Subscription>,
}

/// Injected store failures, for exercising the engine's error paths
#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    fail_subscription_inserts: bool,
    conflicting_offer_inserts: bool,
}

/// Transaction boundary over process-local state
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransactor {
    state: Arc<Mutex<State>>,
    faults: Faults,
}

impl InMemoryTransactor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subscription insert fail as if the storage connection was lost
    #[must_use]
    pub fn failing_subscription_inserts(mut self) -> Self {
        self.faults.fail_subscription_inserts = true;
        self
    }

    /// Make every offer insert report a uniqueness conflict, as if a concurrent unit won the race
    #[must_use]
    pub fn conflicting_offer_inserts(mut self) -> Self {
        self.faults.conflicting_offer_inserts = true;
        self
    }

    /// Committed offers
    pub async fn offers(&self) -> Vec<Offer> {
        self.state.lock().await.offers.clone()
    }

    /// Committed subscriptions
    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().await.subscriptions.clone()
    }
}

#[async_trait::async_trait]
impl Transactor for InMemoryTransactor {
    type Unit = InMemoryUnit;

    async fn begin(&self) -> StoreResult<InMemoryUnit> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(InMemoryUnit {
            guard,
            working,
            faults: self.faults,
        })
    }
}

/// Exclusive unit of work over the in-memory state
#[derive(Debug)]
pub struct InMemoryUnit {
    guard: OwnedMutexGuard<State>,
    working: State,
    faults: Faults,
}

impl InMemoryUnit {
    fn offer(&self, id: Uuid) -> Option<&Offer> {
        self.working.offers.iter().find(|offer| offer.id == id)
    }

    fn full_info(&self, subscription: &Subscription) -> Option<SubscriptionFullInfo> {
        self.offer(subscription.offer_id)
            .map(|offer| SubscriptionFullInfo {
                subscription: subscription.clone(),
                offer_name: offer.name.clone(),
                price: offer.price,
            })
    }

    fn fetch_page(&self, filter: &SubscriptionFilter, limit: i64, offset: i64) -> PricedListing {
        let mut matching: Vec<SubscriptionFullInfo> = self
            .working
            .subscriptions
            .iter()
            .filter_map(|subscription| self.full_info(subscription))
            .filter(|info| filter.matches(info))
            .collect();
        matching.sort_by(|a, b| by_start_date(&a.subscription, &b.subscription));

        let total_count = count(&matching);
        let total_price = matching.iter().map(|info| i64::from(info.price)).sum();
        let items = slice(matching, limit, offset);

        PricedListing {
            items,
            total_count,
            total_price,
        }
    }
}

fn by_start_date(a: &Subscription, b: &Subscription) -> Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.id.cmp(&b.id))
}

fn count<T>(items: &[T]) -> i64 {
    i64::try_from(items.len()).unwrap_or(i64::MAX)
}

fn slice<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let limit = usize::try_from(limit).unwrap_or(0);
    let offset = usize::try_from(offset).unwrap_or(usize::MAX);
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait::async_trait]
impl OfferStore for InMemoryUnit {
    async fn insert_offer(
        &mut self,
        name: &ServiceName,
        price: Price,
        duration_months: DurationMonths,
    ) -> StoreResult<Offer> {
        let taken = self
            .working
            .offers
            .iter()
            .any(|offer| offer.name == name.as_ref() && offer.price == price.value());
        if taken || self.faults.conflicting_offer_inserts {
            return Err(StoreError::Conflict);
        }

        let now = Utc::now();
        let offer = Offer {
            id: Uuid::new_v4(),
            name: name.as_ref().to_string(),
            price: price.value(),
            duration_months: duration_months.into(),
            created_at: now,
            updated_at: now,
        };
        self.working.offers.push(offer.clone());
        Ok(offer)
    }

    async fn fetch_offer_by_id(&mut self, id: Uuid) -> StoreResult<Offer> {
        self.offer(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn fetch_offer_for_update(&mut self, id: Uuid) -> StoreResult<Offer> {
        self.offer(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn fetch_offer_by_name_and_price(
        &mut self,
        name: &ServiceName,
        price: Price,
    ) -> StoreResult<Offer> {
        self.working
            .offers
            .iter()
            .find(|offer| offer.name == name.as_ref() && offer.price == price.value())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn fetch_offers_page(&mut self, limit: i64, offset: i64) -> StoreResult<Listing<Offer>> {
        let mut offers = self.working.offers.clone();
        offers.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.price.cmp(&b.price))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total_count = count(&offers);
        Ok(Listing {
            items: slice(offers, limit, offset),
            total_count,
        })
    }

    async fn delete_offer(&mut self, id: Uuid) -> StoreResult<()> {
        let before = self.working.offers.len();
        self.working.offers.retain(|offer| offer.id != id);
        if self.working.offers.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SubscriptionStore for InMemoryUnit {
    async fn insert_subscription(
        &mut self,
        new_subscription: &NewSubscription,
    ) -> StoreResult<Subscription> {
        if self.faults.fail_subscription_inserts {
            return Err(anyhow::anyhow!("Injected subscription insert failure")
                .context("Failed to insert subscription")
                .into());
        }
        if new_subscription.end_date <= new_subscription.start_date {
            return Err(anyhow::anyhow!(
                "Subscription ends on {} before it starts on {}",
                new_subscription.end_date,
                new_subscription.start_date
            )
            .context("Failed to insert subscription")
            .into());
        }

        // Same rule as the database overlap trigger
        if let Some(offer) = self.offer(new_subscription.offer_id) {
            let overlaps = self.working.subscriptions.iter().any(|existing| {
                existing.user_id == new_subscription.user_id
                    && existing.is_active_on(new_subscription.start_date)
                    && self
                        .offer(existing.offer_id)
                        .map_or(false, |other| other.name == offer.name)
            });
            if overlaps {
                return Err(StoreError::Overlap);
            }
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: new_subscription.user_id,
            offer_id: new_subscription.offer_id,
            start_date: new_subscription.start_date,
            end_date: new_subscription.end_date,
            created_at: now,
            updated_at: now,
        };
        self.working.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn delete_subscription(&mut self, id: Uuid) -> StoreResult<()> {
        let before = self.working.subscriptions.len();
        self.working
            .subscriptions
            .retain(|subscription| subscription.id != id);
        if self.working.subscriptions.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn fetch_subscriptions_page(
        &mut self,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Listing<SubscriptionFullInfo>> {
        let listing = self.fetch_page(&SubscriptionFilter::default(), limit, offset);
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
        let listing = self.fetch_page(&filter, limit, offset);
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
        Ok(self.fetch_page(&filter, limit, offset))
    }

    async fn has_active_on_date(
        &mut self,
        user_id: Uuid,
        service_name: &str,
        date: NaiveDate,
    ) -> StoreResult<bool> {
        Ok(self.working.subscriptions.iter().any(|subscription| {
            subscription.user_id == user_id
                && subscription.is_active_on(date)
                && self
                    .offer(subscription.offer_id)
                    .map_or(false, |offer| offer.name == service_name)
        }))
    }

    async fn fetch_subscriptions_by_offer(
        &mut self,
        offer_id: Uuid,
    ) -> StoreResult<Vec<Subscription>> {
        Ok(self
            .working
            .subscriptions
            .iter()
            .filter(|subscription| subscription.offer_id == offer_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl UnitOfWork for InMemoryUnit {
    async fn commit(mut self) -> StoreResult<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

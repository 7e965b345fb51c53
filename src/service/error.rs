use chrono::NaiveDate;

use uuid::Uuid;

use crate::repo::{StoreError, StoreResult};

pub type ServiceResult<T> = Result<T, Error>;

/// Coarse classification of engine failures, for callers that only care about the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvariantViolation,
    Invalid,
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Offer {0} not found")]
    OfferNotFound(Uuid),

    #[error("Subscription {0} not found")]
    SubscriptionNotFound(Uuid),

    #[error("An offer named {name} with price {price} already exists")]
    OfferAlreadyExists { name: String, price: i32 },

    #[error("Offer named {name} with price {price} was created concurrently, try again")]
    CannotCreateOffer { name: String, price: i32 },

    #[error("User {user_id} already has an active {service_name} subscription on {date}")]
    UserAlreadyHasActiveSubscription {
        user_id: Uuid,
        service_name: String,
        date: NaiveDate,
    },

    #[error("Offer {0} is still referenced by subscriptions")]
    ActiveSubscriptionsExist(Uuid),

    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Storage unavailable while trying to {operation}")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::OfferNotFound(_) | Self::SubscriptionNotFound(_) => ErrorKind::NotFound,
            Self::OfferAlreadyExists { .. } | Self::CannotCreateOffer { .. } => ErrorKind::Conflict,
            Self::UserAlreadyHasActiveSubscription { .. } | Self::ActiveSubscriptionsExist(_) => {
                ErrorKind::InvariantViolation
            }
            Self::InvalidPagination(_) | Self::InvalidPeriod(_) => ErrorKind::Invalid,
            Self::Unavailable { .. } => ErrorKind::Unavailable,
        }
    }

    pub(crate) fn unavailable(operation: &'static str, source: StoreError) -> Self {
        tracing::error!("Failed to {}: {:?}", operation, source);
        Self::Unavailable { operation, source }
    }
}

/// Treat every store failure that reaches this point as a storage outage
pub(crate) trait StoreResultExt<T> {
    fn or_unavailable(self, operation: &'static str) -> ServiceResult<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn or_unavailable(self, operation: &'static str) -> ServiceResult<T> {
        self.map_err(|source| Error::unavailable(operation, source))
    }
}

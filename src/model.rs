mod offers;
mod subscriptions;

pub use offers::{NewOffer, Offer};
pub use subscriptions::{
    end_date_for, Listing, NewSubscription, NewSubscriptionByName, PricedListing, Subscription,
    SubscriptionFilter, SubscriptionFullInfo,
};

mod health_check;
mod helpers;
mod offers;
mod subscriptions;

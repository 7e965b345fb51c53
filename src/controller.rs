mod error;
pub mod offers;
mod paging;
pub mod subscriptions;

pub use error::{RestError, RestResult};

mod page;
mod period;
mod price;
mod service_name;

pub use page::{total_pages, Page, PageRequest, PricedPage, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use period::Period;
pub use price::{DurationMonths, Price};
pub use service_name::ServiceName;

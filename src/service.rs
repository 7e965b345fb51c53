use crate::domain::PageRequest;
use crate::repo::Transactor;

mod error;
mod offers;
mod subscriptions;

pub use error::{Error, ErrorKind, ServiceResult};

use error::StoreResultExt;

/// Consistency engine, running every operation as one unit of work against the stores
#[derive(Debug, Clone)]
pub struct Engine<T> {
    transactor: T,
}

impl<T: Transactor> Engine<T> {
    pub fn new(transactor: T) -> Self {
        Self { transactor }
    }

    async fn begin(&self) -> ServiceResult<T::Unit> {
        self.transactor
            .begin()
            .await
            .or_unavailable("begin a unit of work")
    }
}

fn page_request(page: i64, page_size: i64) -> ServiceResult<PageRequest> {
    PageRequest::new(page, page_size).map_err(Error::InvalidPagination)
}

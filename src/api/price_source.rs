use async_trait::async_trait;
use chrono::NaiveDate;

use crate::core::{error::PriceFetchError, ranking::PricePoint};

/// Day-ahead hourly prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the hourly prices of the local calendar date.
    ///
    /// Prices must already be rounded consistently. An empty day is an error rather than
    /// an empty result, so that it is never cached.
    async fn fetch(&self, on: NaiveDate) -> Result<Vec<PricePoint>, PriceFetchError>;
}

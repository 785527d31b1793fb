pub mod client;
pub mod scrape;

use crate::domain::comic::FetchedImage;
use chrono::NaiveDate;

pub use client::{ArchiveClient, ArchiveStrategy};

#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Archive URL first requested for `date`.
    fn archive_url(&self, date: NaiveDate) -> String;

    async fn fetch_image(&self, date: NaiveDate) -> anyhow::Result<FetchedImage>;
}

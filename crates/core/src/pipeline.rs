use crate::archive::{ArchiveClient, ImageFetcher};
use crate::config::Settings;
use crate::domain::comic::{comic_title, ScheduledTick, UploadResult};
use crate::notify::{Notifier, WebhookNotifier};
use crate::time::random_date::RandomDateGenerator;
use crate::upload::{ImageUploader, ImgurUploader};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

/// How one tick ended. Failures have already been logged when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Posted { date: NaiveDate, upload: UploadResult },
    /// Dry run: the image was fetched and nothing else happened.
    Fetched { date: NaiveDate, bytes: usize },
    FetchFailed { date: NaiveDate },
    UploadFailed { date: NaiveDate },
    NotifyFailed { date: NaiveDate },
}

impl TickOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Posted { date, .. }
            | Self::Fetched { date, .. }
            | Self::FetchFailed { date }
            | Self::UploadFailed { date }
            | Self::NotifyFailed { date } => *date,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Posted { .. } | Self::Fetched { .. })
    }
}

/// Fetch, upload, notify. Cheap to clone; each tick task holds its own copy.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn ImageFetcher>,
    uploader: Arc<dyn ImageUploader>,
    notifier: Arc<dyn Notifier>,
    dates: RandomDateGenerator,
    title_prefix: Option<String>,
    dry_run: bool,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        uploader: Arc<dyn ImageUploader>,
        notifier: Arc<dyn Notifier>,
        min_date: NaiveDate,
    ) -> Self {
        Self {
            fetcher,
            uploader,
            notifier,
            dates: RandomDateGenerator::new(min_date),
            title_prefix: None,
            dry_run: false,
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let fetcher = ArchiveClient::from_settings(settings)?;
        let uploader = ImgurUploader::from_settings(settings)?;
        let notifier = WebhookNotifier::from_settings(settings)?;

        tracing::info!(
            source = fetcher.source_name(),
            uploader = uploader.provider_name(),
            min_date = %settings.min_date,
            "pipeline configured"
        );

        Ok(Self::new(
            Arc::new(fetcher),
            Arc::new(uploader),
            Arc::new(notifier),
            settings.min_date,
        )
        .with_title_prefix(settings.title_prefix.clone()))
    }

    pub fn with_title_prefix(mut self, prefix: Option<String>) -> Self {
        self.title_prefix = prefix;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn dates(&self) -> &RandomDateGenerator {
        &self.dates
    }

    /// Draws a random date in `[min_date, today]` and runs the chain for it.
    pub async fn run_tick(&self, tick: ScheduledTick, today: NaiveDate) -> TickOutcome {
        let date = self.dates.generate(today);
        tracing::info!(%date, fired_at = %tick.fired_at, "tick started");
        self.run_for_date(date).await
    }

    pub async fn run_for_date(&self, date: NaiveDate) -> TickOutcome {
        let image = match self.fetcher.fetch_image(date).await {
            Ok(image) => image,
            Err(err) => {
                tracing::error!(
                    %date,
                    url = %self.fetcher.archive_url(date),
                    error = %format!("{err:#}"),
                    "comic fetch failed; skipping tick"
                );
                return TickOutcome::FetchFailed { date };
            }
        };

        if self.dry_run {
            tracing::info!(%date, bytes = image.bytes.len(), dry_run = true, "fetched comic");
            return TickOutcome::Fetched {
                date,
                bytes: image.bytes.len(),
            };
        }

        let title = comic_title(date, self.title_prefix.as_deref());
        let upload = match self.uploader.upload(&image, &title).await {
            Ok(upload) => upload,
            Err(err) => {
                tracing::error!(%date, %title, error = %format!("{err:#}"), "comic upload failed; skipping tick");
                return TickOutcome::UploadFailed { date };
            }
        };

        match self.notifier.notify_posted(&upload).await {
            Ok(()) => {
                let now = Utc::now();
                tracing::info!(
                    %date,
                    link = %upload.link,
                    "comic for {date} posted at {} ({})",
                    now.format("%Y-%-m-%-d"),
                    now.timestamp_millis()
                );
                TickOutcome::Posted { date, upload }
            }
            Err(err) => {
                tracing::error!(%date, link = %upload.link, error = %format!("{err:#}"), "post webhook failed");
                self.notifier.report_failure().await;
                TickOutcome::NotifyFailed { date }
            }
        }
    }
}

pub mod webhook;

use crate::domain::comic::UploadResult;

pub use webhook::WebhookNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Hands a finished upload to the downstream poster.
    async fn notify_posted(&self, upload: &UploadResult) -> anyhow::Result<()>;

    /// Best-effort operator alert. Never fails; its own errors are only logged.
    async fn report_failure(&self);
}

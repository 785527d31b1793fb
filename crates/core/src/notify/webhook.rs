use crate::config::Settings;
use crate::domain::comic::UploadResult;
use crate::error::{Stage, StageError};
use crate::notify::Notifier;
use anyhow::{Context, Result};
use serde::Serialize;

const DEFAULT_BASE_URL: &str = "https://maker.ifttt.com/trigger";
const DEFAULT_SUCCESS_EVENT: &str = "new_garf";
const DEFAULT_ERROR_EVENT: &str = "garf_error";
const DEFAULT_ALERT_MESSAGE: &str = "@kbn_au LASAGNA TIME";

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    value1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value2: Option<&'a str>,
}

/// Keyed event relay: `POST {base}/{event}/with/key/{key}`.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    http: reqwest::Client,
    base_url: String,
    key: String,
    success_event: String,
    error_event: String,
    alert_message: String,
}

impl WebhookNotifier {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key: key.into(),
            success_event: DEFAULT_SUCCESS_EVENT.to_string(),
            error_event: DEFAULT_ERROR_EVENT.to_string(),
            alert_message: DEFAULT_ALERT_MESSAGE.to_string(),
        }
    }

    pub fn with_events(mut self, success_event: impl Into<String>, error_event: impl Into<String>) -> Self {
        self.success_event = success_event.into();
        self.error_event = error_event.into();
        self
    }

    pub fn with_alert_message(mut self, alert_message: impl Into<String>) -> Self {
        self.alert_message = alert_message.into();
        self
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let key = settings.require_webhook_key()?.to_string();
        let base_url = settings
            .webhook_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = settings.http_client("webhook")?;

        let mut notifier = Self::new(http, base_url, key);
        if let Some(ev) = settings.webhook_success_event.as_deref() {
            notifier.success_event = ev.to_string();
        }
        if let Some(ev) = settings.webhook_error_event.as_deref() {
            notifier.error_event = ev.to_string();
        }
        if let Some(msg) = settings.webhook_alert_message.as_deref() {
            notifier.alert_message = msg.to_string();
        }
        Ok(notifier)
    }

    pub fn event_url(&self, event: &str) -> String {
        format!("{}/{event}/with/key/{}", self.base_url, self.key)
    }

    // Logged URLs must not carry the key.
    fn redacted_url(&self, event: &str) -> String {
        format!("{}/{event}/with/key/***", self.base_url)
    }

    async fn trigger(&self, event: &str, body: &WebhookBody<'_>) -> Result<()> {
        let res = self
            .http
            .post(self.event_url(event))
            .json(body)
            .send()
            .await
            .map_err(|e| StageError::other(Stage::Notify, self.redacted_url(event), e.without_url().to_string()))
            .with_context(|| format!("webhook `{event}` request failed"))?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(StageError::http_status(Stage::Notify, self.redacted_url(event), status, &text).into());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_posted(&self, upload: &UploadResult) -> Result<()> {
        let body = WebhookBody {
            value1: &upload.title,
            value2: Some(&upload.link),
        };
        self.trigger(&self.success_event, &body).await
    }

    async fn report_failure(&self) {
        let body = WebhookBody {
            value1: &self.alert_message,
            value2: None,
        };
        if let Err(err) = self.trigger(&self.error_event, &body).await {
            tracing::warn!(error = %format!("{err:#}"), "error webhook failed; giving up");
        }
    }
}

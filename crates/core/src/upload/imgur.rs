use crate::config::Settings;
use crate::domain::comic::{FetchedImage, UploadResult};
use crate::error::{Stage, StageError};
use crate::upload::ImageUploader;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.imgur.com";

#[derive(Debug, Clone)]
pub struct ImgurUploader {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
}

#[derive(Debug, Deserialize)]
struct ImgurEnvelope {
    data: ImgurImage,
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    status: Option<u16>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct ImgurImage {
    id: String,
    link: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    datetime: Option<i64>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

impl ImgurImage {
    fn into_result(self, requested_title: &str, fallback_kind: Option<&str>) -> UploadResult {
        UploadResult {
            id: self.id,
            link: self.link,
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| requested_title.to_string()),
            date: self
                .datetime
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .unwrap_or_else(Utc::now),
            kind: self
                .kind
                .or_else(|| fallback_kind.map(str::to_string))
                .unwrap_or_default(),
        }
    }
}

impl ImgurUploader {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client_id = settings.require_imgur_client_id()?.to_string();
        let base_url = settings
            .imgur_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = settings.http_client("imgur")?;
        Ok(Self::new(http, base_url, client_id))
    }

    fn url(&self) -> String {
        format!("{}/3/image", self.base_url)
    }

    fn form(image: &FetchedImage, title: &str) -> Result<Form> {
        let mut part = Part::bytes(image.bytes.clone()).file_name(format!("{}.img", image.date));
        if let Some(ct) = image.content_type.as_deref() {
            part = part
                .mime_str(ct)
                .with_context(|| format!("invalid image content type: {ct}"))?;
        }
        Ok(Form::new()
            .part("image", part)
            .text("type", "file")
            .text("title", title.to_string()))
    }
}

#[async_trait::async_trait]
impl ImageUploader for ImgurUploader {
    fn provider_name(&self) -> &'static str {
        "imgur"
    }

    async fn upload(&self, image: &FetchedImage, title: &str) -> Result<UploadResult> {
        let url = self.url();
        let auth = HeaderValue::from_str(&format!("Client-ID {}", self.client_id))
            .context("IMGUR_CLIENT_ID is not a valid header value")?;

        let res = self
            .http
            .post(&url)
            .header(AUTHORIZATION, auth)
            .multipart(Self::form(image, title)?)
            .send()
            .await
            .context("imgur upload request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read imgur response body")?;
        if !status.is_success() {
            return Err(StageError::http_status(Stage::Upload, url, status, &text).into());
        }

        let envelope = serde_json::from_str::<ImgurEnvelope>(&text)
            .with_context(|| format!("failed to parse imgur response: {text}"))?;
        if !envelope.success {
            return Err(StageError {
                stage: Stage::Upload,
                url,
                status: envelope.status,
                detail: "imgur reported success=false".to_string(),
            }
            .into());
        }

        Ok(envelope
            .data
            .into_result(title, image.content_type.as_deref()))
    }
}

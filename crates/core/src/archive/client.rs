use crate::archive::scrape::extract_image_url;
use crate::archive::ImageFetcher;
use crate::config::Settings;
use crate::domain::comic::FetchedImage;
use crate::error::{Stage, StageError};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::header::CONTENT_TYPE;

const DEFAULT_SCRAPE_BASE_URL: &str = "https://www.gocomics.com/garfield";
const DEFAULT_DIRECT_BASE_URL: &str = "https://d1ejxu6vysztl5.cloudfront.net/comics/garfield";
const DEFAULT_IMAGE_EXT: &str = "gif";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveStrategy {
    /// `{base}/{year}/{year}-{MM}-{DD}.{ext}` served as the image itself.
    Direct { ext: String },
    /// `{base}/{year}/{MM}/{DD}` HTML page whose metadata names the image.
    Scrape,
}

impl ArchiveStrategy {
    pub fn parse(name: Option<&str>, ext: Option<&str>) -> Result<Self> {
        match name.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("scrape") => Ok(Self::Scrape),
            Some("direct") => Ok(Self::Direct {
                ext: ext
                    .map(|e| e.trim().trim_start_matches('.').to_string())
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| DEFAULT_IMAGE_EXT.to_string()),
            }),
            Some(other) => anyhow::bail!("ARCHIVE_STRATEGY must be `scrape` or `direct` (got {other})"),
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Direct { .. } => DEFAULT_DIRECT_BASE_URL,
            Self::Scrape => DEFAULT_SCRAPE_BASE_URL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveClient {
    http: reqwest::Client,
    base_url: String,
    strategy: ArchiveStrategy,
}

impl ArchiveClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, strategy: ArchiveStrategy) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            strategy,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let strategy = ArchiveStrategy::parse(
            settings.archive_strategy.as_deref(),
            settings.archive_image_ext.as_deref(),
        )?;
        let base_url = settings
            .archive_base_url
            .clone()
            .unwrap_or_else(|| strategy.default_base_url().to_string());
        let http = settings.http_client("archive")?;
        Ok(Self::new(http, base_url, strategy))
    }

    pub fn strategy(&self) -> &ArchiveStrategy {
        &self.strategy
    }

    pub fn page_url(&self, date: NaiveDate) -> String {
        format!("{}/{}", self.base_url, date.format("%Y/%m/%d"))
    }

    pub fn image_url(&self, date: NaiveDate, ext: &str) -> String {
        format!("{}/{}.{ext}", self.base_url, date.format("%Y/%Y-%m-%d"))
    }

    async fn get_page(&self, url: &str) -> Result<String> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("archive page request failed: {url}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read archive page body: {url}"))?;
        if !status.is_success() {
            return Err(StageError::http_status(Stage::Fetch, url, status, &text).into());
        }
        Ok(text)
    }

    async fn get_image(&self, url: &str, date: NaiveDate) -> Result<FetchedImage> {
        let res = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("archive image request failed: {url}"))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(StageError::http_status(Stage::Fetch, url, status, &body).into());
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read archive image body: {url}"))?;
        if bytes.is_empty() {
            return Err(StageError::other(Stage::Fetch, url, "empty image body").into());
        }

        Ok(FetchedImage {
            date,
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait::async_trait]
impl ImageFetcher for ArchiveClient {
    fn source_name(&self) -> &'static str {
        match self.strategy {
            ArchiveStrategy::Direct { .. } => "archive_direct",
            ArchiveStrategy::Scrape => "archive_scrape",
        }
    }

    fn archive_url(&self, date: NaiveDate) -> String {
        match &self.strategy {
            ArchiveStrategy::Direct { ext } => self.image_url(date, ext),
            ArchiveStrategy::Scrape => self.page_url(date),
        }
    }

    async fn fetch_image(&self, date: NaiveDate) -> Result<FetchedImage> {
        let url = self.archive_url(date);
        match &self.strategy {
            ArchiveStrategy::Direct { .. } => self.get_image(&url, date).await,
            ArchiveStrategy::Scrape => {
                let html = self.get_page(&url).await?;
                let found = extract_image_url(&html).ok_or_else(|| {
                    StageError::other(Stage::Fetch, url.as_str(), "no image metadata tag on page")
                })?;
                // Relative content URLs resolve against the page.
                let image_url = reqwest::Url::parse(&url)
                    .and_then(|page| page.join(&found))
                    .with_context(|| format!("invalid image url on archive page: {found}"))?;
                tracing::debug!(%date, page = %url, image = %image_url, "resolved strip image");
                self.get_image(image_url.as_str(), date).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn client(base: &str, strategy: ArchiveStrategy) -> ArchiveClient {
        ArchiveClient::new(reqwest::Client::new(), base, strategy)
    }

    #[test]
    fn page_url_zero_pads_month_and_day() {
        let c = client("https://www.gocomics.com/garfield/", ArchiveStrategy::Scrape);
        assert_eq!(
            c.page_url(ymd(2021, 3, 5)),
            "https://www.gocomics.com/garfield/2021/03/05"
        );
        assert_eq!(c.archive_url(ymd(2021, 3, 5)), c.archive_url(ymd(2021, 3, 5)));
    }

    #[test]
    fn direct_url_follows_template() {
        let c = client(
            "https://cdn.example.test/comics/garfield",
            ArchiveStrategy::Direct { ext: "gif".to_string() },
        );
        assert_eq!(
            c.archive_url(ymd(1978, 6, 19)),
            "https://cdn.example.test/comics/garfield/1978/1978-06-19.gif"
        );
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(ArchiveStrategy::parse(None, None).unwrap(), ArchiveStrategy::Scrape);
        assert_eq!(
            ArchiveStrategy::parse(Some("Direct"), Some(".png")).unwrap(),
            ArchiveStrategy::Direct { ext: "png".to_string() }
        );
        assert_eq!(
            ArchiveStrategy::parse(Some("direct"), None).unwrap(),
            ArchiveStrategy::Direct { ext: "gif".to_string() }
        );
        assert!(ArchiveStrategy::parse(Some("ftp"), None).is_err());
    }

    #[test]
    fn default_base_url_depends_on_strategy() {
        let settings = Settings::from_lookup(|k| match k {
            "ARCHIVE_STRATEGY" => Some("direct".to_string()),
            _ => None,
        })
        .unwrap();
        let c = ArchiveClient::from_settings(&settings).unwrap();
        assert!(c.archive_url(ymd(2000, 1, 2)).starts_with(DEFAULT_DIRECT_BASE_URL));
    }

    #[tokio::test]
    async fn scrape_follows_og_image() {
        let server = MockServer::start().await;
        let page = format!(
            r#"<html><head><meta property="og:image" content="{}/assets/strip.gif"></head></html>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/garfield/2021/03/05"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/assets/strip.gif"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/gif")
                    .set_body_bytes(b"GIF89a".to_vec()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&format!("{}/garfield", server.uri()), ArchiveStrategy::Scrape);
        let img = c.fetch_image(ymd(2021, 3, 5)).await.unwrap();
        assert_eq!(img.bytes, b"GIF89a");
        assert_eq!(img.date, ymd(2021, 3, 5));
        assert_eq!(img.content_type.as_deref(), Some("image/gif"));
    }

    #[tokio::test]
    async fn scrape_resolves_relative_image_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garfield/1999/12/31"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<meta property="og:image" content="/img/1999.gif">"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/1999.gif"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&format!("{}/garfield", server.uri()), ArchiveStrategy::Scrape);
        let img = c.fetch_image(ymd(1999, 12, 31)).await.unwrap();
        assert_eq!(img.bytes, vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn scrape_without_metadata_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/garfield/2010/01/01"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let c = client(&format!("{}/garfield", server.uri()), ArchiveStrategy::Scrape);
        let err = c.fetch_image(ymd(2010, 1, 1)).await.unwrap_err();
        let stage = err.downcast_ref::<StageError>().unwrap();
        assert_eq!(stage.stage, Stage::Fetch);
        assert!(stage.status.is_none());
    }

    #[tokio::test]
    async fn direct_not_found_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/1978/1978-06-19.gif"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let c = client(&server.uri(), ArchiveStrategy::Direct { ext: "gif".to_string() });
        let err = c.fetch_image(ymd(1978, 6, 19)).await.unwrap_err();
        assert_eq!(err.downcast_ref::<StageError>().unwrap().status, Some(404));
    }

    #[tokio::test]
    async fn direct_empty_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2001/2001-01-01.gif"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let c = client(&server.uri(), ArchiveStrategy::Direct { ext: "gif".to_string() });
        assert!(c.fetch_image(ymd(2001, 1, 1)).await.is_err());
    }
}

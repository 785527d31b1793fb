pub mod archive;
pub mod domain;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod time;
pub mod upload;

pub mod config {
    use anyhow::Context;
    use chrono::NaiveDate;

    pub const DEFAULT_MIN_DATE: &str = "1978-06-19";
    pub const DEFAULT_TICK_PERIOD_SECS: u64 = 2 * 60 * 60;
    pub const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub webhook_key: Option<String>,
        pub webhook_base_url: Option<String>,
        pub webhook_success_event: Option<String>,
        pub webhook_error_event: Option<String>,
        pub webhook_alert_message: Option<String>,
        pub imgur_client_id: Option<String>,
        pub imgur_base_url: Option<String>,
        pub archive_strategy: Option<String>,
        pub archive_base_url: Option<String>,
        pub archive_image_ext: Option<String>,
        pub min_date: NaiveDate,
        pub title_prefix: Option<String>,
        pub tick_period_secs: u64,
        pub align_ticks: bool,
        pub http_timeout_secs: Option<u64>,
        pub port: u16,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        /// Builds settings from an arbitrary key lookup. Blank values count as unset.
        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

            let min_date = match get("MIN_DATE") {
                Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .with_context(|| format!("MIN_DATE must be YYYY-MM-DD (got {s})"))?,
                None => NaiveDate::parse_from_str(DEFAULT_MIN_DATE, "%Y-%m-%d")?,
            };

            let tick_period_secs = get("TICK_PERIOD_SECS")
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_TICK_PERIOD_SECS);

            let align_ticks = get("ALIGN_TICKS")
                .map(|s| !matches!(s.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true);

            Ok(Self {
                webhook_key: get("WEBHOOK_KEY").or_else(|| get("IFTTT_KEY")),
                webhook_base_url: get("WEBHOOK_BASE_URL"),
                webhook_success_event: get("WEBHOOK_SUCCESS_EVENT"),
                webhook_error_event: get("WEBHOOK_ERROR_EVENT"),
                webhook_alert_message: get("WEBHOOK_ALERT_MESSAGE"),
                imgur_client_id: get("IMGUR_CLIENT_ID"),
                imgur_base_url: get("IMGUR_BASE_URL"),
                archive_strategy: get("ARCHIVE_STRATEGY"),
                archive_base_url: get("ARCHIVE_BASE_URL"),
                archive_image_ext: get("ARCHIVE_IMAGE_EXT"),
                min_date,
                title_prefix: get("TITLE_PREFIX"),
                tick_period_secs,
                align_ticks,
                http_timeout_secs: get("HTTP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()),
                port: get("PORT")
                    .and_then(|s| s.parse::<u16>().ok())
                    .unwrap_or(DEFAULT_PORT),
                sentry_dsn: get("SENTRY_DSN"),
            })
        }

        pub fn require_webhook_key(&self) -> anyhow::Result<&str> {
            self.webhook_key
                .as_deref()
                .context("WEBHOOK_KEY (or IFTTT_KEY) is required")
        }

        pub fn require_imgur_client_id(&self) -> anyhow::Result<&str> {
            self.imgur_client_id
                .as_deref()
                .context("IMGUR_CLIENT_ID is required")
        }

        pub fn tick_period(&self) -> std::time::Duration {
            std::time::Duration::from_secs(self.tick_period_secs)
        }

        /// Shared reqwest client builder honoring `HTTP_TIMEOUT_SECS` when set.
        pub fn http_client(&self, purpose: &str) -> anyhow::Result<reqwest::Client> {
            let mut builder = reqwest::Client::builder();
            if let Some(secs) = self.http_timeout_secs {
                builder = builder.timeout(std::time::Duration::from_secs(secs));
            }
            builder
                .build()
                .with_context(|| format!("failed to build {purpose} http client"))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn settings(pairs: &[(&str, &str)]) -> anyhow::Result<Settings> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            Settings::from_lookup(|k| map.get(k).cloned())
        }

        #[test]
        fn defaults_when_unset() {
            let s = settings(&[]).unwrap();
            assert_eq!(s.min_date, NaiveDate::from_ymd_opt(1978, 6, 19).unwrap());
            assert_eq!(s.tick_period_secs, 7200);
            assert!(s.align_ticks);
            assert_eq!(s.port, 3000);
            assert!(s.http_timeout_secs.is_none());
            assert!(s.require_webhook_key().is_err());
            assert!(s.require_imgur_client_id().is_err());
        }

        #[test]
        fn falls_back_to_ifttt_key_alias() {
            let s = settings(&[("IFTTT_KEY", "abc")]).unwrap();
            assert_eq!(s.require_webhook_key().unwrap(), "abc");

            let s = settings(&[("IFTTT_KEY", "abc"), ("WEBHOOK_KEY", "xyz")]).unwrap();
            assert_eq!(s.require_webhook_key().unwrap(), "xyz");
        }

        #[test]
        fn parses_overrides() {
            let s = settings(&[
                ("MIN_DATE", "2000-01-31"),
                ("TICK_PERIOD_SECS", "60"),
                ("ALIGN_TICKS", "off"),
                ("PORT", "8080"),
                ("HTTP_TIMEOUT_SECS", "15"),
            ])
            .unwrap();
            assert_eq!(s.min_date, NaiveDate::from_ymd_opt(2000, 1, 31).unwrap());
            assert_eq!(s.tick_period_secs, 60);
            assert!(!s.align_ticks);
            assert_eq!(s.port, 8080);
            assert_eq!(s.http_timeout_secs, Some(15));
        }

        #[test]
        fn rejects_malformed_min_date() {
            let err = settings(&[("MIN_DATE", "19/06/1978")]).unwrap_err();
            assert!(format!("{err:#}").contains("MIN_DATE"));
        }

        #[test]
        fn ignores_zero_period_and_blank_values() {
            let s = settings(&[("TICK_PERIOD_SECS", "0"), ("WEBHOOK_KEY", "  ")]).unwrap();
            assert_eq!(s.tick_period_secs, DEFAULT_TICK_PERIOD_SECS);
            assert!(s.webhook_key.is_none());
        }
    }
}

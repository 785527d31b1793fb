use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One firing of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTick {
    pub fired_at: DateTime<Utc>,
}

impl ScheduledTick {
    pub fn now() -> Self {
        Self {
            fired_at: Utc::now(),
        }
    }
}

/// Raw strip bytes for one archive date.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub date: NaiveDate,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// What the hosting provider hands back after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub id: String,
    pub link: String,
    pub title: String,
    pub date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Upload title for a strip: `YYYY-M-D`, optionally prefixed (`Garfield 1978-6-19`).
pub fn comic_title(date: NaiveDate, prefix: Option<&str>) -> String {
    let base = format!("{}-{}-{}", date.year(), date.month(), date.day());
    match prefix.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => format!("{p} {base}"),
        None => base,
    }
}

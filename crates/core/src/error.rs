use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Upload,
    Notify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Upload => "upload",
            Stage::Notify => "notify",
        };
        f.write_str(name)
    }
}

/// HTTP-level failure of a pipeline stage. Recover it with `anyhow::Error::downcast_ref`.
#[derive(Debug, Clone)]
pub struct StageError {
    pub stage: Stage,
    pub url: String,
    pub status: Option<u16>,
    pub detail: String,
}

impl StageError {
    pub fn http_status(stage: Stage, url: impl Into<String>, status: reqwest::StatusCode, body: &str) -> Self {
        Self {
            stage,
            url: url.into(),
            status: Some(status.as_u16()),
            detail: truncate(body, 200),
        }
    }

    pub fn other(stage: Stage, url: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            stage,
            url: url.into(),
            status: None,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(
                f,
                "{} failed (url={}, status={}): {}",
                self.stage, self.url, status, self.detail
            ),
            None => write!(f, "{} failed (url={}): {}", self.stage, self.url, self.detail),
        }
    }
}

impl std::error::Error for StageError {}

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.trim();
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

//! In-memory fetcher for crawler tests / 测试用抓取器

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use url::Url;

use super::fetch::{FetchError, FetchedPage, PageFetcher};

#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, FetchedPage>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, status: u16, content_type: &str, body: &str) -> Self {
        self.pages.insert(
            url.to_string(),
            FetchedPage {
                status,
                content_type: content_type.to_string(),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.page(url, 200, "text/html; charset=utf-8", body)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl PageFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        *self.calls.lock().entry(url.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.pages
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| FetchError::Transport(format!("connection refused: {}", url)))
    }
}

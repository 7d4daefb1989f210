//! Page fetching / 页面抓取

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::redirect::Policy;
use reqwest::Client;
use thiserror::Error;
use url::Url;

use crate::config::CrawlerConfig;

/// Raw GET response / 原始响应
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Per-page fetch failure, dropped by the crawler / 单页抓取失败
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("not an HTML document: {0}")]
    NotHtml(String),

    #[error("unexpected status {0}")]
    Status(u16),
}

impl FetchedPage {
    /// Only 2xx `text/html` responses are indexed / 仅索引 2xx 的 HTML 响应
    pub fn into_indexable(self) -> Result<Self, FetchError> {
        if !self
            .content_type
            .trim_start()
            .to_ascii_lowercase()
            .starts_with("text/html")
        {
            return Err(FetchError::NotHtml(self.content_type));
        }
        if !(200..300).contains(&self.status) {
            return Err(FetchError::Status(self.status));
        }
        Ok(self)
    }
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// reqwest-backed fetcher / 基于 reqwest 的抓取器
pub struct HttpFetcher {
    client: Client,
    referrer: String,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(if config.follow_redirects {
                Policy::limited(10)
            } else {
                Policy::none()
            });
        if let Some(timeout) = config.fetch_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            referrer: config.referrer.clone(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let mut request = self.client.get(url.as_str());
        if !self.referrer.is_empty() {
            request = request.header(REFERER, self.referrer.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        // 非 HTML 不读取正文
        if !content_type.to_ascii_lowercase().contains("text/html") {
            return Err(FetchError::NotHtml(content_type));
        }
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(FetchedPage {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(status: u16, content_type: &str) -> FetchedPage {
        FetchedPage {
            status,
            content_type: content_type.to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn test_indexable_filters() {
        assert!(page(200, "text/html; charset=utf-8").into_indexable().is_ok());
        assert!(page(204, "TEXT/HTML").into_indexable().is_ok());
        assert!(matches!(
            page(200, "application/pdf").into_indexable(),
            Err(FetchError::NotHtml(_))
        ));
        assert!(matches!(page(404, "text/html").into_indexable(), Err(FetchError::Status(404))));
        assert!(matches!(page(301, "text/html").into_indexable(), Err(FetchError::Status(301))));
    }

    #[test]
    fn test_http_fetcher_builds_from_defaults() {
        assert!(HttpFetcher::new(&CrawlerConfig::default()).is_ok());
    }
}

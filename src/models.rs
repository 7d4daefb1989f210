use serde::{Deserialize, Serialize};
use std::fmt;

/// Website indexing status / 站点索引状态
///
/// Only transitions absent -> INDEXING -> {INDEXED, FAILED}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Indexing => "INDEXING",
            SiteStatus::Indexed => "INDEXED",
            SiteStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SiteStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "INDEXING" => Ok(SiteStatus::Indexing),
            "INDEXED" => Ok(SiteStatus::Indexed),
            "FAILED" => Ok(SiteStatus::Failed),
            other => Err(format!("unknown site status: {}", other)),
        }
    }
}

/// Crawled website / 站点记录
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Website {
    pub id: i64,
    pub url: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Fetched page, immutable once stored / 已抓取页面
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: i64,
    pub content: String,
}

/// Lemma row: frequency = number of distinct pages of the site containing it / 词元
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lemma {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: i64,
}

/// Lemma-page rank entry / 倒排索引条目
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IndexEntry {
    pub id: i64,
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f64,
}

/// Configured site definition / 配置文件中的站点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDefinition {
    pub url: String,
    pub name: String,
}

impl SiteDefinition {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
        }
    }

    /// URL without trailing slash, used as the site key / 去掉末尾斜杠的站点地址
    pub fn normalized_url(&self) -> String {
        self.url.trim().trim_end_matches('/').to_string()
    }
}

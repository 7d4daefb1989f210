//! Index statistics / 索引统计

use serde::Serialize;

use crate::models::{SiteDefinition, SiteStatus};
use crate::store::IndexStore;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: i64,
    pub lemmas: i64,
    pub indexing: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub error: Option<String>,
    pub pages: i64,
    pub lemmas: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Statistics {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Totals and per-site details for the stored configured sites, ordered by URL
/// 已入库的配置站点的汇总与明细（按 URL 排序）
///
/// A configured site that was never indexed has no status yet and is left out.
pub async fn collect(store: &IndexStore, sites: &[SiteDefinition]) -> Result<Statistics, sqlx::Error> {
    let mut urls: Vec<String> = sites.iter().map(SiteDefinition::normalized_url).collect();
    urls.sort();
    urls.dedup();

    let mut stats = Statistics::default();
    for url in urls {
        let Some(website) = store.find_site_by_url(&url).await? else {
            continue;
        };
        let detail = SiteStatistics {
            pages: store.count_pages(website.id).await?,
            lemmas: store.count_lemmas(website.id).await?,
            url: website.url,
            name: website.name,
            status: website.status,
            status_time: website.status_time,
            error: website.last_error,
        };

        stats.total.sites += 1;
        stats.total.pages += detail.pages;
        stats.total.lemmas += detail.lemmas;
        stats.total.indexing |= detail.status == SiteStatus::Indexing;
        stats.detailed.push(detail);
    }

    Ok(stats)
}

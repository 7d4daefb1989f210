//! Index store - persistence of sites, pages, lemmas and index entries / 索引存储
//!
//! All lookups required by the crawler and the ranking engine live here.
//! Writers from concurrent crawl branches only use single-statement upserts,
//! so a (site, path) / (site, lemma) / (page, lemma) conflict never surfaces
//! as an error.

mod lemmas;
mod pages;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{SiteDefinition, SiteStatus, Website};

/// Max bound parameters per IN (...) list / IN 列表的最大参数数
pub(crate) const IN_CHUNK: usize = 500;

pub(crate) fn now() -> String {
    Utc::now().to_rfc3339()
}

/// SQLite-backed index store / 基于 SQLite 的索引存储
#[derive(Clone)]
pub struct IndexStore {
    pool: SqlitePool,
}

impl IndexStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All site rows ordered by URL / 按 URL 排序的全部站点
    pub async fn list_sites(&self) -> Result<Vec<Website>, sqlx::Error> {
        sqlx::query_as::<_, Website>("SELECT * FROM sites ORDER BY url")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_site_by_url(&self, url: &str) -> Result<Option<Website>, sqlx::Error> {
        sqlx::query_as::<_, Website>("SELECT * FROM sites WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
    }

    /// Delete the site with every page, lemma and index entry, then recreate it as INDEXING
    /// 删除站点及其全部数据后重新创建（状态为 INDEXING）
    pub async fn recreate_site(&self, site: &SiteDefinition) -> Result<Website, sqlx::Error> {
        let url = site.normalized_url();
        let mut tx = self.pool.begin().await?;

        if let Some((site_id,)) = sqlx::query_as::<_, (i64,)>("SELECT id FROM sites WHERE url = ?")
            .bind(&url)
            .fetch_optional(&mut *tx)
            .await?
        {
            sqlx::query(
                "DELETE FROM index_entries WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?)",
            )
            .bind(site_id)
            .execute(&mut *tx)
            .await?;
            sqlx::query("DELETE FROM lemmas WHERE site_id = ?")
                .bind(site_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM pages WHERE site_id = ?")
                .bind(site_id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM sites WHERE id = ?")
                .bind(site_id)
                .execute(&mut *tx)
                .await?;
        }

        let website = sqlx::query_as::<_, Website>(
            "INSERT INTO sites (url, name, status, status_time, last_error) VALUES (?, ?, ?, ?, NULL) RETURNING *",
        )
        .bind(&url)
        .bind(&site.name)
        .bind(SiteStatus::Indexing.as_str())
        .bind(now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(website)
    }

    /// Create the site if absent and switch it to INDEXING, keeping its pages
    /// 站点不存在则创建，并切换为 INDEXING（保留已有页面）
    pub async fn mark_indexing(&self, site: &SiteDefinition) -> Result<Website, sqlx::Error> {
        sqlx::query_as::<_, Website>(
            r#"
            INSERT INTO sites (url, name, status, status_time, last_error) VALUES (?, ?, ?, ?, NULL)
            ON CONFLICT(url) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                status_time = excluded.status_time,
                last_error = NULL
            RETURNING *
            "#,
        )
        .bind(site.normalized_url())
        .bind(&site.name)
        .bind(SiteStatus::Indexing.as_str())
        .bind(now())
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_site_status(
        &self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sites SET status = ?, status_time = ?, last_error = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now())
            .bind(last_error)
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Refresh status timestamp / 刷新状态时间
    pub async fn touch_site(&self, site_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE sites SET status_time = ? WHERE id = ?")
            .bind(now())
            .bind(site_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Whether any of the given sites is INDEXING / 给定站点中是否有正在索引的
    pub async fn any_indexing(&self, urls: &[String]) -> Result<bool, sqlx::Error> {
        for chunk in urls.chunks(IN_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT COUNT(*) FROM sites WHERE status = ");
            qb.push_bind(SiteStatus::Indexing.as_str());
            qb.push(" AND url IN (");
            let mut sep = qb.separated(", ");
            for url in chunk {
                sep.push_bind(url.as_str());
            }
            sep.push_unseparated(")");
            let (count,) = qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
            if count > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Switch every INDEXING site among `urls` to FAILED / 将仍在索引的站点置为 FAILED
    pub async fn fail_indexing_sites(&self, urls: &[String], message: &str) -> Result<u64, sqlx::Error> {
        let mut affected = 0;
        let status_time = now();
        for chunk in urls.chunks(IN_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE sites SET status = ");
            qb.push_bind(SiteStatus::Failed.as_str());
            qb.push(", status_time = ");
            qb.push_bind(status_time.as_str());
            qb.push(", last_error = ");
            qb.push_bind(message);
            qb.push(" WHERE status = ");
            qb.push_bind(SiteStatus::Indexing.as_str());
            qb.push(" AND url IN (");
            let mut sep = qb.separated(", ");
            for url in chunk {
                sep.push_bind(url.as_str());
            }
            sep.push_unseparated(")");
            affected += qb.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(affected)
    }
}

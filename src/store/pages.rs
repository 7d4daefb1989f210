use std::collections::HashSet;

use sqlx::{QueryBuilder, Sqlite};

use super::{IndexStore, IN_CHUNK};
use crate::models::Page;

impl IndexStore {
    pub async fn page_exists(&self, site_id: i64, path: &str) -> Result<bool, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM pages WHERE site_id = ? AND path = ? LIMIT 1")
            .bind(site_id)
            .bind(path)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    /// Insert a page; `None` if another branch already stored the same (site, path)
    /// 插入页面；若其他分支已写入相同路径则返回 None
    pub async fn insert_page(
        &self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            INSERT INTO pages (site_id, path, code, content) VALUES (?, ?, ?, ?)
            ON CONFLICT(site_id, path) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(site_id)
        .bind(path)
        .bind(code as i64)
        .bind(content)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Subset of `paths` already stored for the site / 已存在的路径
    pub async fn existing_paths(&self, site_id: i64, paths: &[String]) -> Result<HashSet<String>, sqlx::Error> {
        let mut existing = HashSet::new();
        for chunk in paths.chunks(IN_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT path FROM pages WHERE site_id = ");
            qb.push_bind(site_id);
            qb.push(" AND path IN (");
            let mut sep = qb.separated(", ");
            for path in chunk {
                sep.push_bind(path.as_str());
            }
            sep.push_unseparated(")");
            let rows = qb.build_query_as::<(String,)>().fetch_all(self.pool()).await?;
            existing.extend(rows.into_iter().map(|(path,)| path));
        }
        Ok(existing)
    }

    pub async fn pages_by_ids(&self, ids: &[i64]) -> Result<Vec<Page>, sqlx::Error> {
        let mut pages = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IN_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM pages WHERE id IN (");
            let mut sep = qb.separated(", ");
            for id in chunk {
                sep.push_bind(*id);
            }
            sep.push_unseparated(")");
            pages.extend(qb.build_query_as::<Page>().fetch_all(self.pool()).await?);
        }
        Ok(pages)
    }

    pub async fn count_pages(&self, site_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pages WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

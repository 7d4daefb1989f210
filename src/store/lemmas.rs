use std::collections::HashMap;

use sqlx::{QueryBuilder, Sqlite};

use super::{IndexStore, IN_CHUNK};
use crate::models::{IndexEntry, Lemma};

impl IndexStore {
    /// Lemma rows matching `forms`, optionally scoped to one site / 按词形查询词元
    pub async fn lemmas_by_forms(&self, forms: &[String], site_id: Option<i64>) -> Result<Vec<Lemma>, sqlx::Error> {
        let mut lemmas = Vec::new();
        for chunk in forms.chunks(IN_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM lemmas WHERE ");
            if let Some(site_id) = site_id {
                qb.push("site_id = ");
                qb.push_bind(site_id);
                qb.push(" AND ");
            }
            qb.push("lemma IN (");
            let mut sep = qb.separated(", ");
            for form in chunk {
                sep.push_bind(form.as_str());
            }
            sep.push_unseparated(")");
            lemmas.extend(qb.build_query_as::<Lemma>().fetch_all(self.pool()).await?);
        }
        Ok(lemmas)
    }

    /// Merge one page's lemma counts into the index / 合并单个页面的词元统计
    ///
    /// Called exactly once per stored page: every lemma's frequency grows by one,
    /// and the (page, lemma) rank grows by the in-page occurrence count.
    pub async fn merge_lemmas(
        &self,
        site_id: i64,
        page_id: i64,
        lemma_counts: &HashMap<String, u32>,
    ) -> Result<(), sqlx::Error> {
        let mut forms: Vec<String> = lemma_counts
            .keys()
            .filter(|form| !form.is_empty())
            .cloned()
            .collect();
        if forms.is_empty() {
            return Ok(());
        }
        forms.sort();

        let existing: HashMap<String, i64> = self
            .lemmas_by_forms(&forms, Some(site_id))
            .await?
            .into_iter()
            .map(|lemma| (lemma.lemma, lemma.id))
            .collect();

        for form in &forms {
            let count = lemma_counts[form];

            let lemma_id = match existing.get(form) {
                Some(&id) => {
                    sqlx::query("UPDATE lemmas SET frequency = frequency + 1 WHERE id = ?")
                        .bind(id)
                        .execute(self.pool())
                        .await?;
                    id
                }
                // 另一分支可能刚刚创建了同一词元
                None => {
                    let (id,): (i64,) = sqlx::query_as(
                        r#"
                        INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?, ?, 1)
                        ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1
                        RETURNING id
                        "#,
                    )
                    .bind(site_id)
                    .bind(form)
                    .fetch_one(self.pool())
                    .await?;
                    id
                }
            };

            sqlx::query(
                r#"
                INSERT INTO index_entries (page_id, lemma_id, rank) VALUES (?, ?, ?)
                ON CONFLICT(page_id, lemma_id) DO UPDATE SET rank = rank + excluded.rank
                "#,
            )
            .bind(page_id)
            .bind(lemma_id)
            .bind(count as f64)
            .execute(self.pool())
            .await?;
        }

        Ok(())
    }

    pub async fn find_entry(&self, lemma_id: i64, page_id: i64) -> Result<Option<IndexEntry>, sqlx::Error> {
        sqlx::query_as::<_, IndexEntry>("SELECT * FROM index_entries WHERE lemma_id = ? AND page_id = ? LIMIT 1")
            .bind(lemma_id)
            .bind(page_id)
            .fetch_optional(self.pool())
            .await
    }

    pub async fn entries_by_lemma(&self, lemma_id: i64) -> Result<Vec<IndexEntry>, sqlx::Error> {
        sqlx::query_as::<_, IndexEntry>("SELECT * FROM index_entries WHERE lemma_id = ?")
            .bind(lemma_id)
            .fetch_all(self.pool())
            .await
    }

    pub async fn count_lemmas(&self, site_id: i64) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM lemmas WHERE site_id = ?")
            .bind(site_id)
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

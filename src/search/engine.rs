//! Search engine - lemma-based ranking over the index store / 搜索引擎
//!
//! Ranking pipeline / 排序流程:
//! 1. query -> lemma set (analyzer)
//! 2. load lemma rows, drop those above the frequency limit, rarest first
//! 3. collect index entries per page, keep pages holding every surviving lemma
//! 4. absolute relevance = sum of ranks, relative = absolute / max
//! 5. sort, paginate, attach title and highlighted snippet

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::analyzer::TextAnalyzer;
use super::schema::{Pagination, SearchItem, SearchOutcome};
use crate::error::{ServiceError, ServiceResult};
use crate::models::{IndexEntry, Lemma, Website};
use crate::store::IndexStore;

/// Page score before pagination / 分页前的页面得分
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPage {
    pub page_id: i64,
    pub absolute: f64,
    pub relevance: f64,
}

/// Drop lemmas above `frequency_limit` and order the rest rarest first
/// 过滤高频词元并按频率升序排列
pub fn select_lemmas(mut lemmas: Vec<Lemma>, frequency_limit: i64) -> Vec<Lemma> {
    lemmas.retain(|lemma| lemma.frequency <= frequency_limit);
    lemmas.sort_by(|a, b| a.frequency.cmp(&b.frequency).then_with(|| a.id.cmp(&b.id)));
    lemmas
}

/// Rank pages from (lemma form, entries) postings / 根据倒排记录计算页面相关度
///
/// A page survives only if it has an entry for every distinct form present
/// in `postings`. Ties keep page-id order.
pub fn rank_pages(postings: &[(String, Vec<IndexEntry>)]) -> Vec<RankedPage> {
    let required: HashSet<&str> = postings.iter().map(|(form, _)| form.as_str()).collect();
    if required.is_empty() {
        return Vec::new();
    }

    let mut per_page: HashMap<i64, HashMap<&str, f64>> = HashMap::new();
    for (form, entries) in postings {
        for entry in entries {
            *per_page
                .entry(entry.page_id)
                .or_default()
                .entry(form.as_str())
                .or_insert(0.0) += entry.rank;
        }
    }

    let mut ranked: Vec<RankedPage> = per_page
        .into_iter()
        .filter(|(_, ranks)| ranks.len() == required.len())
        .map(|(page_id, ranks)| RankedPage {
            page_id,
            absolute: ranks.values().sum(),
            relevance: 0.0,
        })
        .collect();

    let max = ranked.iter().map(|p| p.absolute).fold(0.0_f64, f64::max);
    for page in &mut ranked {
        page.relevance = if max > 0.0 { page.absolute / max } else { 0.0 };
    }

    ranked.sort_by(|a, b| {
        b.relevance
            .partial_cmp(&a.relevance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.page_id.cmp(&b.page_id))
    });
    ranked
}

/// Query-time view over the index / 查询引擎
#[derive(Clone)]
pub struct SearchEngine {
    store: IndexStore,
    analyzer: TextAnalyzer,
    frequency_limit: i64,
}

impl SearchEngine {
    pub fn new(store: IndexStore, analyzer: TextAnalyzer, frequency_limit: i64) -> Self {
        Self {
            store,
            analyzer,
            frequency_limit,
        }
    }

    /// Run a ranked search, optionally restricted to one site URL / 执行搜索
    pub async fn search(
        &self,
        query: &str,
        site: Option<&str>,
        pagination: Pagination,
    ) -> ServiceResult<SearchOutcome> {
        let query_lemmas: HashSet<String> = self.analyzer.extract_lemmas(query).into_keys().collect();
        if query_lemmas.is_empty() {
            return Err(ServiceError::EmptyQuery);
        }

        let site_filter = match site.map(|s| s.trim().trim_end_matches('/')).filter(|s| !s.is_empty()) {
            Some(url) => match self.store.find_site_by_url(url).await? {
                Some(website) => Some(website.id),
                None => {
                    tracing::debug!("search: unknown site filter {}", url);
                    return Err(ServiceError::NoResults);
                }
            },
            None => None,
        };

        let mut forms: Vec<String> = query_lemmas.iter().cloned().collect();
        forms.sort();
        let lemmas = select_lemmas(
            self.store.lemmas_by_forms(&forms, site_filter).await?,
            self.frequency_limit,
        );

        let mut postings = Vec::with_capacity(lemmas.len());
        for lemma in lemmas {
            let entries = self.store.entries_by_lemma(lemma.id).await?;
            postings.push((lemma.lemma, entries));
        }

        let ranked = rank_pages(&postings);
        let total = ranked.len();
        let window: Vec<RankedPage> = ranked
            .into_iter()
            .skip(pagination.offset)
            .take(pagination.limit)
            .collect();
        if window.is_empty() {
            return Err(ServiceError::NoResults);
        }

        let ids: Vec<i64> = window.iter().map(|p| p.page_id).collect();
        let pages: HashMap<i64, _> = self
            .store
            .pages_by_ids(&ids)
            .await?
            .into_iter()
            .map(|page| (page.id, page))
            .collect();
        let sites: HashMap<i64, Website> = self
            .store
            .list_sites()
            .await?
            .into_iter()
            .map(|site| (site.id, site))
            .collect();

        let items: Vec<SearchItem> = window
            .iter()
            .filter_map(|ranked| {
                let page = pages.get(&ranked.page_id)?;
                let site = sites.get(&page.site_id)?;
                Some(SearchItem {
                    site: site.url.clone(),
                    site_name: site.name.clone(),
                    uri: page.path.clone(),
                    title: self.analyzer.extract_title(&page.content),
                    snippet: self.analyzer.build_snippet(&page.content, &query_lemmas),
                    relevance: ranked.relevance,
                })
            })
            .collect();
        if items.is_empty() {
            return Err(ServiceError::NoResults);
        }

        tracing::debug!("search '{}': {} pages, returning {}", query, total, items.len());
        Ok(SearchOutcome { total, items })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::SiteDefinition;
    use crate::search::morphology::Language;

    fn lemma(id: i64, form: &str, frequency: i64) -> Lemma {
        Lemma {
            id,
            site_id: 1,
            lemma: form.to_string(),
            frequency,
        }
    }

    fn entry(page_id: i64, rank: f64) -> IndexEntry {
        IndexEntry {
            id: 0,
            page_id,
            lemma_id: 0,
            rank,
        }
    }

    #[test]
    fn test_select_lemmas_filters_and_sorts() {
        let selected = select_lemmas(
            vec![lemma(1, "a", 7), lemma(2, "b", 25), lemma(3, "c", 2), lemma(4, "d", 20)],
            20,
        );
        let forms: Vec<&str> = selected.iter().map(|l| l.lemma.as_str()).collect();
        assert_eq!(forms, vec!["c", "a", "d"]);
    }

    #[test]
    fn test_rank_requires_every_lemma() {
        let postings = vec![
            ("cat".to_string(), vec![entry(1, 3.0), entry(2, 1.0)]),
            ("dog".to_string(), vec![entry(1, 1.0), entry(3, 5.0)]),
        ];
        let ranked = rank_pages(&postings);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].page_id, 1);
        assert_eq!(ranked[0].absolute, 4.0);
        assert_eq!(ranked[0].relevance, 1.0);
    }

    #[test]
    fn test_rank_relative_relevance() {
        let postings = vec![
            ("cat".to_string(), vec![entry(1, 2.0), entry(2, 8.0), entry(3, 4.0)]),
            ("dog".to_string(), vec![entry(1, 2.0), entry(2, 2.0), entry(3, 1.0)]),
        ];
        let ranked = rank_pages(&postings);
        let ids: Vec<i64> = ranked.iter().map(|p| p.page_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(ranked[0].relevance, 1.0);
        assert!((ranked[1].relevance - 0.5).abs() < 1e-9);
        assert!((ranked[2].relevance - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_rank_same_form_across_sites_counts_once() {
        // 同一词形在两个站点各有一行
        let postings = vec![
            ("cat".to_string(), vec![entry(1, 1.0)]),
            ("cat".to_string(), vec![entry(2, 3.0)]),
        ];
        let ranked = rank_pages(&postings);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].page_id, 2);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank_pages(&[]).is_empty());
    }

    async fn index(store: &IndexStore, analyzer: &TextAnalyzer, site_id: i64, path: &str, html: &str) {
        let page = store.insert_page(site_id, path, 200, html).await.unwrap().unwrap();
        let lemmas = analyzer.extract_lemmas(&analyzer.strip_markup(html));
        store.merge_lemmas(site_id, page, &lemmas).await.unwrap();
    }

    async fn setup() -> (IndexStore, TextAnalyzer, Website) {
        let store = IndexStore::new(connect_in_memory().await);
        let analyzer = TextAnalyzer::for_language(Language::English);
        let site = store.recreate_site(&SiteDefinition::new("https://pets.test", "Pets")).await.unwrap();
        (store, analyzer, site)
    }

    #[tokio::test]
    async fn test_single_page_cat_scenario() {
        let (store, analyzer, site) = setup().await;
        index(&store, &analyzer, site.id, "/", "<html><head><title>Pets</title></head><body>cat cat cat</body></html>").await;

        let engine = SearchEngine::new(store, analyzer, 20);
        let outcome = engine.search("cat", None, Pagination::default()).await.unwrap();
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.items.len(), 1);
        let item = &outcome.items[0];
        assert_eq!(item.relevance, 1.0);
        assert_eq!(item.site, "https://pets.test");
        assert_eq!(item.site_name, "Pets");
        assert_eq!(item.uri, "/");
        assert_eq!(item.title, "Pets");
        assert!(item.snippet.contains("<b>cat</b>"));
    }

    #[tokio::test]
    async fn test_search_errors() {
        let (store, analyzer, site) = setup().await;
        index(&store, &analyzer, site.id, "/", "<body>cat</body>").await;
        let engine = SearchEngine::new(store, analyzer, 20);

        let err = engine.search("and with", None, Pagination::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::EmptyQuery));

        let err = engine.search("dog", None, Pagination::default()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoResults));

        let err = engine
            .search("cat", Some("https://unknown.test"), Pagination::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoResults));
    }

    #[tokio::test]
    async fn test_search_paginates_and_reports_total() {
        let (store, analyzer, site) = setup().await;
        index(&store, &analyzer, site.id, "/a", "<body>cat</body>").await;
        index(&store, &analyzer, site.id, "/b", "<body>cat cat cat cat</body>").await;
        index(&store, &analyzer, site.id, "/c", "<body>cat cat</body>").await;
        let engine = SearchEngine::new(store, analyzer, 20);

        let outcome = engine
            .search("cats", Some("https://pets.test/"), Pagination { offset: 1, limit: 1 })
            .await
            .unwrap();
        assert_eq!(outcome.total, 3);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].uri, "/c");
        assert!((outcome.items[0].relevance - 0.5).abs() < 1e-9);

        let err = engine
            .search("cat", None, Pagination { offset: 3, limit: 20 })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NoResults));
    }

    #[tokio::test]
    async fn test_frequency_limit_drops_common_lemma() {
        let (store, analyzer, site) = setup().await;
        index(&store, &analyzer, site.id, "/a", "<body>cat dog</body>").await;
        index(&store, &analyzer, site.id, "/b", "<body>cat</body>").await;

        // cat 出现在 2 个页面，超过阈值 1
        let engine = SearchEngine::new(store, analyzer, 1);
        let outcome = engine.search("cat dog", None, Pagination::default()).await.unwrap();
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.items[0].uri, "/a");
        assert!(outcome.items[0].snippet.contains("<b>cat</b>"));
    }
}

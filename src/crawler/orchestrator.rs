//! Crawl orchestrator - start / stop / single-page indexing / 抓取调度
//!
//! Every root task joins the current crawl session; the session is created
//! by the first launch and dropped once its last task has finished.

use std::sync::Arc;

use parking_lot::Mutex;

use super::fetch::PageFetcher;
use super::links;
use super::session::{CrawlSession, TaskGuard};
use super::task::{self, CrawlContext};
use crate::config::CrawlerConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::models::{SiteDefinition, SiteStatus, Website};
use crate::search::TextAnalyzer;
use crate::store::IndexStore;

pub const STOPPED_BY_USER: &str = "stopped by user";
pub const INTERRUPTED_BY_RESTART: &str = "interrupted by restart";

pub struct CrawlOrchestrator {
    store: IndexStore,
    analyzer: TextAnalyzer,
    fetcher: Arc<dyn PageFetcher>,
    sites: Vec<SiteDefinition>,
    config: CrawlerConfig,
    session: Mutex<Option<Arc<CrawlSession>>>,
    /// Serializes start / stop / indexPage / 串行化控制操作
    control: tokio::sync::Mutex<()>,
}

impl CrawlOrchestrator {
    pub fn new(
        store: IndexStore,
        analyzer: TextAnalyzer,
        fetcher: Arc<dyn PageFetcher>,
        sites: Vec<SiteDefinition>,
        config: CrawlerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            analyzer,
            fetcher,
            sites,
            config,
            session: Mutex::new(None),
            control: tokio::sync::Mutex::new(()),
        })
    }

    fn site_urls(&self) -> Vec<String> {
        self.sites.iter().map(SiteDefinition::normalized_url).collect()
    }

    /// Whether a crawl session is alive / 是否有抓取会话
    pub fn is_active(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Reset and recrawl every configured site / 重新索引全部配置站点
    pub async fn start_indexing(self: &Arc<Self>) -> ServiceResult<()> {
        let _control = self.control.lock().await;

        for site in &self.sites {
            if let Some(existing) = self.store.find_site_by_url(&site.normalized_url()).await? {
                if existing.status == SiteStatus::Indexing {
                    tracing::info!("start indexing refused: {} is already indexing", existing.url);
                    return Err(ServiceError::AlreadyRunning);
                }
            }

            let website = self.store.recreate_site(site).await?;
            let root = format!("{}/", website.url);
            tracing::info!("indexing started: {} ({})", website.name, website.url);
            self.launch(website, root, true);
        }

        Ok(())
    }

    /// Index exactly one page of a configured site / 索引单个页面
    pub async fn index_page(self: &Arc<Self>, address: &str) -> ServiceResult<()> {
        let address = address.trim();
        if address.is_empty() {
            return Err(ServiceError::NoAddress);
        }
        let target = links::parse_address(address).ok_or(ServiceError::MalformedAddress)?;
        let origin = links::origin(&target);
        let site = self
            .sites
            .iter()
            .find(|site| links::site_origin(&site.normalized_url()).as_deref() == Some(origin.as_str()))
            .ok_or(ServiceError::OutsideConfiguredSites)?;

        let _control = self.control.lock().await;
        if let Some(existing) = self.store.find_site_by_url(&site.normalized_url()).await? {
            if existing.status == SiteStatus::Indexing {
                return Err(ServiceError::AlreadyIndexing);
            }
        }

        let website = self.store.mark_indexing(site).await?;
        tracing::info!("page indexing started: {}", target);
        self.launch(website, target.to_string(), false);
        Ok(())
    }

    /// Cancel the crawl, wait for every task, fail the unfinished sites / 停止索引
    pub async fn stop_indexing(&self) -> ServiceResult<()> {
        let _control = self.control.lock().await;

        let urls = self.site_urls();
        if !self.store.any_indexing(&urls).await? {
            return Err(ServiceError::NotRunning);
        }

        let session = self.session.lock().clone();
        if let Some(session) = session {
            session.cancel();
            tracing::info!("stopping crawl, {} tasks outstanding", session.outstanding());
            while session.outstanding() > 0 {
                tokio::time::sleep(self.config.stop_poll_interval()).await;
            }
            self.release_session(&session);
        }

        let failed = self.store.fail_indexing_sites(&urls, STOPPED_BY_USER).await?;
        tracing::info!("indexing stopped, {} sites marked failed", failed);
        Ok(())
    }

    /// Fail sites left INDEXING by a previous process / 启动时将上次遗留的 INDEXING 站点置为 FAILED
    pub async fn fail_interrupted(&self) -> ServiceResult<u64> {
        if self.is_active() {
            return Ok(0);
        }
        let failed = self
            .store
            .fail_indexing_sites(&self.site_urls(), INTERRUPTED_BY_RESTART)
            .await?;
        if failed > 0 {
            tracing::warn!("{} sites were left indexing by a previous run", failed);
        }
        Ok(failed)
    }

    /// Join the live session (or open a new one) and register a root task
    fn enter_session(&self) -> (Arc<CrawlSession>, TaskGuard) {
        let mut current = self.session.lock();
        let live = current.as_ref().filter(|session| !session.is_cancelled()).cloned();
        let session = match live {
            Some(session) => session,
            None => {
                let session = CrawlSession::new(self.config.effective_concurrency());
                *current = Some(Arc::clone(&session));
                tracing::debug!("crawl session opened");
                session
            }
        };
        let guard = session.track();
        (session, guard)
    }

    fn release_session(&self, session: &Arc<CrawlSession>) {
        let mut current = self.session.lock();
        let drained = session.outstanding() == 0;
        if drained && current.as_ref().map_or(false, |live| Arc::ptr_eq(live, session)) {
            *current = None;
            tracing::debug!("crawl session closed");
        }
    }

    fn launch(self: &Arc<Self>, site: Website, address: String, recurse: bool) {
        let (session, guard) = self.enter_session();
        let ctx = Arc::new(CrawlContext {
            store: self.store.clone(),
            analyzer: self.analyzer.clone(),
            fetcher: Arc::clone(&self.fetcher),
            session: Arc::clone(&session),
            site: site.clone(),
            request_delay: self.config.request_delay(),
        });
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let result = task::run(ctx, address, recurse).await;
            this.finish(&session, &site, result).await;
            drop(guard);
            this.release_session(&session);
        });
    }

    async fn finish(&self, session: &CrawlSession, site: &Website, result: Result<(), sqlx::Error>) {
        let update = match result {
            Err(e) => {
                tracing::warn!("indexing failed: {}: {}", site.url, e);
                self.store
                    .set_site_status(site.id, SiteStatus::Failed, Some(&e.to_string()))
                    .await
            }
            // 已取消：由 stop_indexing 置为 FAILED
            Ok(()) if session.is_cancelled() => Ok(()),
            Ok(()) => {
                tracing::info!("indexing finished: {}", site.url);
                self.store.set_site_status(site.id, SiteStatus::Indexed, None).await
            }
        };
        if let Err(e) = update {
            tracing::warn!("failed to update status of {}: {}", site.url, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::crawler::testing::StubFetcher;
    use crate::db::connect_in_memory;
    use crate::search::schema::Pagination;
    use crate::search::{Language, SearchEngine};

    const SITE: &str = "https://pets.test";

    async fn orchestrator(fetcher: Arc<StubFetcher>) -> Arc<CrawlOrchestrator> {
        let store = IndexStore::new(connect_in_memory().await);
        let config = CrawlerConfig {
            request_delay_ms: 1,
            stop_poll_interval_ms: 10,
            ..CrawlerConfig::default()
        };
        CrawlOrchestrator::new(
            store,
            TextAnalyzer::for_language(Language::English),
            fetcher,
            vec![SiteDefinition::new(format!("{}/", SITE), "Pets")],
            config,
        )
    }

    async fn wait_idle(orchestrator: &CrawlOrchestrator) {
        for _ in 0..500 {
            if !orchestrator.is_active() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("crawl did not finish");
    }

    async fn site(orchestrator: &CrawlOrchestrator) -> Website {
        orchestrator.store.find_site_by_url(SITE).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_crawl_then_search_cat() {
        let fetcher = Arc::new(
            StubFetcher::new()
                .html("https://pets.test/", r#"<html><head><title>Pets</title></head><body><a href="/cat">cat</a> cat cat</body></html>"#)
                .html("https://pets.test/cat", "<html><body>dog</body></html>"),
        );
        let orchestrator = orchestrator(fetcher).await;

        orchestrator.start_indexing().await.unwrap();
        wait_idle(&orchestrator).await;

        let website = site(&orchestrator).await;
        assert_eq!(website.status, SiteStatus::Indexed);
        assert_eq!(orchestrator.store.count_pages(website.id).await.unwrap(), 2);

        let engine = SearchEngine::new(orchestrator.store.clone(), orchestrator.analyzer.clone(), 20);
        let outcome = engine.search("cat", None, Pagination::default()).await.unwrap();
        assert_eq!(outcome.total, 1);
        assert_eq!(outcome.items[0].uri, "/");
        assert_eq!(outcome.items[0].relevance, 1.0);
        assert!(outcome.items[0].snippet.contains("<b>cat</b>"));
    }

    #[tokio::test]
    async fn test_start_while_indexing_touches_nothing() {
        let fetcher = Arc::new(StubFetcher::new().html("https://pets.test/", "cat"));
        let orchestrator = orchestrator(fetcher.clone()).await;
        let website = orchestrator
            .store
            .mark_indexing(&SiteDefinition::new(SITE, "Pets"))
            .await
            .unwrap();
        orchestrator.store.insert_page(website.id, "/old", 200, "old").await.unwrap();

        let err = orchestrator.start_indexing().await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRunning));

        let after = site(&orchestrator).await;
        assert_eq!(after.id, website.id);
        assert_eq!(after.status_time, website.status_time);
        assert_eq!(orchestrator.store.count_pages(website.id).await.unwrap(), 1);
        assert_eq!(fetcher.total_calls(), 0);
        assert!(!orchestrator.is_active());
    }

    #[tokio::test]
    async fn test_index_page_validation() {
        let fetcher = Arc::new(StubFetcher::new());
        let orchestrator = orchestrator(fetcher.clone()).await;

        let cases = [
            ("", "no_address"),
            ("   ", "no_address"),
            ("pets.test/page", "malformed_address"),
            ("ftp://pets.test/page", "malformed_address"),
            ("http://unlisted.example/x", "outside_configured_sites"),
            ("http://pets.test/x", "outside_configured_sites"),
        ];
        for (address, code) in cases {
            let err = orchestrator.index_page(address).await.unwrap_err();
            assert_eq!(err.code(), code, "address {:?}", address);
        }
        assert_eq!(fetcher.total_calls(), 0);
        assert!(orchestrator.store.list_sites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_page_rejects_indexing_site() {
        let orchestrator = orchestrator(Arc::new(StubFetcher::new())).await;
        orchestrator
            .store
            .mark_indexing(&SiteDefinition::new(SITE, "Pets"))
            .await
            .unwrap();

        let err = orchestrator.index_page("https://pets.test/a").await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyIndexing));
    }

    #[tokio::test]
    async fn test_index_page_is_not_recursive() {
        let fetcher = Arc::new(
            StubFetcher::new()
                .html("https://pets.test/a", r#"<a href="/b">b</a> kitten"#)
                .html("https://pets.test/b", "puppy"),
        );
        let orchestrator = orchestrator(fetcher.clone()).await;

        orchestrator.index_page("https://pets.test/a").await.unwrap();
        wait_idle(&orchestrator).await;

        let website = site(&orchestrator).await;
        assert_eq!(website.status, SiteStatus::Indexed);
        assert_eq!(orchestrator.store.count_pages(website.id).await.unwrap(), 1);
        assert_eq!(fetcher.calls("https://pets.test/b"), 0);

        // 已存在的页面不会重复索引
        orchestrator.index_page("https://pets.test/a").await.unwrap();
        wait_idle(&orchestrator).await;
        assert_eq!(fetcher.calls("https://pets.test/a"), 1);
        let lemma = &orchestrator
            .store
            .lemmas_by_forms(&["kitten".to_string()], Some(website.id))
            .await
            .unwrap()[0];
        assert_eq!(lemma.frequency, 1);
    }

    #[tokio::test]
    async fn test_stop_without_crawl() {
        let orchestrator = orchestrator(Arc::new(StubFetcher::new())).await;
        let err = orchestrator.stop_indexing().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotRunning));

        let website = orchestrator
            .store
            .recreate_site(&SiteDefinition::new(SITE, "Pets"))
            .await
            .unwrap();
        orchestrator.store.set_site_status(website.id, SiteStatus::Indexed, None).await.unwrap();
        let before = site(&orchestrator).await;

        let err = orchestrator.stop_indexing().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotRunning));
        let after = site(&orchestrator).await;
        assert_eq!(after.status, SiteStatus::Indexed);
        assert_eq!(after.status_time, before.status_time);
    }

    #[tokio::test]
    async fn test_fail_interrupted_on_startup() {
        let orchestrator = orchestrator(Arc::new(StubFetcher::new())).await;
        orchestrator
            .store
            .mark_indexing(&SiteDefinition::new(SITE, "Pets"))
            .await
            .unwrap();

        assert_eq!(orchestrator.fail_interrupted().await.unwrap(), 1);
        let website = site(&orchestrator).await;
        assert_eq!(website.status, SiteStatus::Failed);
        assert_eq!(website.last_error.as_deref(), Some(INTERRUPTED_BY_RESTART));
        assert_eq!(orchestrator.fail_interrupted().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stop_during_crawl_fails_site() {
        let fetcher = Arc::new(
            StubFetcher::new()
                .html("https://pets.test/", r#"<a href="/a">a</a> cat"#)
                .html("https://pets.test/a", "dog")
                .with_delay(Duration::from_millis(200)),
        );
        let orchestrator = orchestrator(fetcher.clone()).await;

        orchestrator.start_indexing().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        orchestrator.stop_indexing().await.unwrap();

        assert!(!orchestrator.is_active());
        let website = site(&orchestrator).await;
        assert_eq!(website.status, SiteStatus::Failed);
        assert_eq!(website.last_error.as_deref(), Some(STOPPED_BY_USER));
        // 取消后抓到的页面不落库
        assert_eq!(orchestrator.store.count_pages(website.id).await.unwrap(), 0);
        assert_eq!(fetcher.calls("https://pets.test/a"), 0);

        // 停止后可以重新开始
        orchestrator.start_indexing().await.unwrap();
        wait_idle(&orchestrator).await;
        assert_eq!(site(&orchestrator).await.status, SiteStatus::Indexed);
    }
}

//! Recursive crawl task - one unit per visited URL / 递归抓取任务
//!
//! A task fetches and indexes its page, then (when recursing) discovers
//! same-site links and runs one child task per unseen path, one after
//! another with a courtesy delay in between. Per-page failures end only the
//! current branch. Only storage errors are returned to the caller.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use super::fetch::PageFetcher;
use super::links;
use super::session::CrawlSession;
use crate::models::Website;
use crate::search::TextAnalyzer;
use crate::store::IndexStore;

/// Everything a task of one site needs / 单站点任务的共享上下文
pub struct CrawlContext {
    pub store: IndexStore,
    pub analyzer: TextAnalyzer,
    pub fetcher: Arc<dyn PageFetcher>,
    pub session: Arc<CrawlSession>,
    pub site: Website,
    pub request_delay: Duration,
}

impl CrawlContext {
    fn cancelled(&self) -> bool {
        self.session.is_cancelled()
    }
}

/// Crawl `address`; with `recurse` also crawl every newly discovered link
/// 抓取地址，recurse 为 true 时继续抓取新发现的链接
///
/// The caller keeps the task registered with the session for as long as
/// the returned future runs.
pub fn run(ctx: Arc<CrawlContext>, address: String, recurse: bool) -> BoxFuture<'static, Result<(), sqlx::Error>> {
    Box::pin(async move {
        if ctx.cancelled() {
            return Ok(());
        }

        let Some(target) = links::parse_address(&address) else {
            tracing::debug!("crawl: skipping invalid address {}", address);
            return Ok(());
        };
        if links::site_origin(&ctx.site.url).as_deref() != Some(links::origin(&target).as_str()) {
            tracing::debug!("crawl: {} does not belong to {}", address, ctx.site.url);
            return Ok(());
        }

        let path = links::page_path(&target);
        if ctx.store.page_exists(ctx.site.id, &path).await? {
            tracing::debug!("crawl: {} already indexed", address);
            return Ok(());
        }

        let fetched = {
            let _permit = ctx.session.acquire_fetch().await;
            ctx.fetcher.fetch(&target).await
        };
        let page = match fetched.and_then(|page| page.into_indexable()) {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!("crawl: {} dropped: {}", address, e);
                return Ok(());
            }
        };
        if ctx.cancelled() {
            return Ok(());
        }

        let Some(page_id) = ctx
            .store
            .insert_page(ctx.site.id, &path, page.status, &page.body)
            .await?
        else {
            tracing::debug!("crawl: {} stored by another branch", address);
            return Ok(());
        };
        ctx.store.touch_site(ctx.site.id).await?;

        let lemmas = ctx.analyzer.extract_lemmas(&ctx.analyzer.strip_markup(&page.body));
        ctx.store.merge_lemmas(ctx.site.id, page_id, &lemmas).await?;
        tracing::debug!("crawl: indexed {} ({} lemmas)", address, lemmas.len());

        if !recurse || ctx.cancelled() {
            return Ok(());
        }

        let candidates = links::discover_links(&page.body, &target);
        let paths: Vec<String> = candidates.keys().cloned().collect();
        let existing = ctx.store.existing_paths(ctx.site.id, &paths).await?;

        for (child_path, child_url) in candidates {
            if existing.contains(&child_path) {
                continue;
            }
            if ctx.cancelled() {
                return Ok(());
            }
            tokio::time::sleep(ctx.request_delay).await;
            if ctx.cancelled() {
                return Ok(());
            }

            let guard = ctx.session.track();
            let child_ctx = Arc::clone(&ctx);
            let child_address = child_url.to_string();
            let child = tokio::spawn(async move {
                let _guard = guard;
                run(child_ctx, child_address, true).await
            });

            match child.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!("crawl: branch {} failed: {}", child_url, e),
                Err(e) => tracing::warn!("crawl: branch {} aborted: {}", child_url, e),
            }
        }

        Ok(())
    })
}

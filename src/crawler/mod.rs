//! Crawler - recursive, cooperatively cancellable site crawling / 站点抓取
//!
//! - session: cancellation flag, outstanding-task counter, fetch permits
//! - task: one recursive unit per visited URL
//! - orchestrator: start / stop / single-page operations

pub mod fetch;
pub mod links;
pub mod orchestrator;
pub mod session;
pub mod task;

#[cfg(test)]
pub(crate) mod testing;

pub use fetch::{FetchError, FetchedPage, HttpFetcher, PageFetcher};
pub use orchestrator::CrawlOrchestrator;
pub use session::CrawlSession;

//! Crawl session - shared cancellation flag, outstanding-task counter and fetch permits
//! 抓取会话：取消标志、未完成任务计数与并发许可

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
pub struct CrawlSession {
    cancelled: AtomicBool,
    outstanding: AtomicUsize,
    permits: Arc<Semaphore>,
}

impl CrawlSession {
    pub fn new(max_concurrency: usize) -> Arc<Self> {
        Arc::new(Self {
            cancelled: AtomicBool::new(false),
            outstanding: AtomicUsize::new(0),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Tasks registered and not yet finished / 未完成任务数
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Register one task; it counts as outstanding until the guard drops
    /// 注册任务，guard 释放前计为未完成
    pub fn track(self: &Arc<Self>) -> TaskGuard {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        TaskGuard {
            session: Arc::clone(self),
        }
    }

    /// Wait for a fetch slot; `None` once the session is closed / 获取抓取许可
    pub async fn acquire_fetch(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).acquire_owned().await.ok()
    }
}

/// Outstanding-task registration, released on drop / 任务登记（drop 时释放）
#[derive(Debug)]
pub struct TaskGuard {
    session: Arc<CrawlSession>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.session.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_tracks_outstanding() {
        let session = CrawlSession::new(2);
        let g1 = session.track();
        let g2 = session.track();
        assert_eq!(session.outstanding(), 2);

        drop(g1);
        assert_eq!(session.outstanding(), 1);
        drop(g2);
        assert_eq!(session.outstanding(), 0);
    }

    #[test]
    fn test_cancel_flag() {
        let session = CrawlSession::new(1);
        assert!(!session.is_cancelled());
        session.cancel();
        assert!(session.is_cancelled());
    }

    #[tokio::test]
    async fn test_fetch_permits_bound_concurrency() {
        let session = CrawlSession::new(1);
        let permit = session.acquire_fetch().await.unwrap();
        assert_eq!(session.permits.available_permits(), 0);
        drop(permit);
        assert_eq!(session.permits.available_permits(), 1);
    }
}

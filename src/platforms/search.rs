//! 职位搜索流
//!
//! 标题 × 地点 的每个组合是一次独立查询，按发现顺序惰性产出职位，
//! 跨组合按 url 去重。单个组合失败只记日志，不影响其他组合。

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SearchQueryError;
use crate::models::{JobPosting, Platform};

/// 每个查询最多翻几页
pub const MAX_RESULT_PAGES: usize = 3;

/// 单页搜索能力
#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn platform(&self) -> Platform;

    /// 取第 `page`（从0开始）页结果，空列表表示没有更多
    async fn fetch_page(&self, title: &str, location: &str, page: usize) -> anyhow::Result<Vec<JobPosting>>;
}

/// 标题在外、地点在内的组合顺序
pub fn cross_product(titles: &[String], locations: &[String]) -> Vec<(String, String)> {
    titles
        .iter()
        .flat_map(|t| locations.iter().map(move |l| (t.clone(), l.clone())))
        .collect()
}

/// 构造惰性搜索流
///
/// 流不借用驱动，调用方可以一边消费一边投递；提前丢弃流即停止后续查询
pub fn search_stream<B>(
    backend: Arc<B>,
    titles: &[String],
    locations: &[String],
    max_pages: usize,
) -> BoxStream<'static, JobPosting>
where
    B: SearchBackend + ?Sized + 'static,
{
    let mut seen: HashSet<String> = HashSet::new();

    stream::iter(cross_product(titles, locations))
        .then(move |(title, location)| {
            let backend = backend.clone();
            async move { run_query(backend.as_ref(), &title, &location, max_pages).await }
        })
        .flat_map(stream::iter)
        .filter(move |posting| futures::future::ready(seen.insert(posting.url.clone())))
        .boxed()
}

/// 执行一个组合的全部分页
async fn run_query<B>(backend: &B, title: &str, location: &str, max_pages: usize) -> Vec<JobPosting>
where
    B: SearchBackend + ?Sized,
{
    info!("[{}] 🔍 搜索 '{}' @ '{}'", backend.platform(), title, location);
    let mut found = Vec::new();

    for page in 0..max_pages {
        match backend.fetch_page(title, location, page).await {
            Ok(postings) if postings.is_empty() => break,
            Ok(postings) => {
                debug!("[{}] 第 {} 页: {} 个职位", backend.platform(), page + 1, postings.len());
                found.extend(postings);
            }
            Err(source) => {
                let err = SearchQueryError {
                    title: title.to_string(),
                    location: location.to_string(),
                    source,
                };
                // 已取到的页保留
                warn!("[{}] ⚠️ {}", backend.platform(), err);
                break;
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplyMode;
    use std::sync::Mutex;

    /// 以 (title, location, page) 为键返回预设结果
    struct FakeBackend {
        calls: Mutex<Vec<(String, String, usize)>>,
        fail_on: Option<(String, usize)>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on: None,
            }
        }

        fn calls(&self) -> Vec<(String, String, usize)> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn posting(id: &str) -> JobPosting {
        JobPosting::new(
            Platform::Indeed,
            "Analyst",
            "Acme",
            "Toronto",
            format!("https://ca.indeed.com/viewjob?jk={}", id),
            ApplyMode::QuickApply,
        )
    }

    #[async_trait]
    impl SearchBackend for FakeBackend {
        fn platform(&self) -> Platform {
            Platform::Indeed
        }

        async fn fetch_page(&self, title: &str, location: &str, page: usize) -> anyhow::Result<Vec<JobPosting>> {
            self.calls
                .lock()
                .unwrap()
                .push((title.to_string(), location.to_string(), page));

            if let Some((bad_location, bad_page)) = &self.fail_on {
                if location == bad_location && page == *bad_page {
                    anyhow::bail!("search page timed out");
                }
            }

            Ok(match (title, location, page) {
                ("analyst", "Toronto", 0) => vec![posting("a"), posting("b")],
                ("analyst", "Toronto", 1) => vec![posting("c")],
                ("analyst", "Remote", 0) => vec![posting("b"), posting("d")],
                ("scientist", "Toronto", 0) => vec![posting("e")],
                _ => vec![],
            })
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn urls(postings: &[JobPosting]) -> Vec<String> {
        postings
            .iter()
            .map(|p| p.url.rsplit('=').next().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_cross_product_order() {
        let combos = cross_product(&strings(&["a", "b"]), &strings(&["x", "y"]));
        assert_eq!(
            combos,
            vec![
                ("a".to_string(), "x".to_string()),
                ("a".to_string(), "y".to_string()),
                ("b".to_string(), "x".to_string()),
                ("b".to_string(), "y".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_dedups_by_url_in_discovery_order() {
        let backend = Arc::new(FakeBackend::new());
        let postings: Vec<JobPosting> = search_stream(
            backend.clone(),
            &strings(&["analyst", "scientist"]),
            &strings(&["Toronto", "Remote"]),
            MAX_RESULT_PAGES,
        )
        .collect()
        .await;

        assert_eq!(urls(&postings), vec!["a", "b", "c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_failed_combination_is_skipped() {
        let backend = Arc::new(FakeBackend {
            fail_on: Some(("Toronto".to_string(), 0)),
            ..FakeBackend::new()
        });
        let postings: Vec<JobPosting> = search_stream(
            backend.clone(),
            &strings(&["analyst"]),
            &strings(&["Toronto", "Remote"]),
            MAX_RESULT_PAGES,
        )
        .collect()
        .await;

        assert_eq!(urls(&postings), vec!["b", "d"]);
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_earlier_results() {
        let backend = Arc::new(FakeBackend {
            fail_on: Some(("Toronto".to_string(), 1)),
            ..FakeBackend::new()
        });
        let postings: Vec<JobPosting> =
            search_stream(backend.clone(), &strings(&["analyst"]), &strings(&["Toronto"]), MAX_RESULT_PAGES)
                .collect()
                .await;

        assert_eq!(urls(&postings), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let backend = Arc::new(FakeBackend::new());
        let mut stream = search_stream(
            backend.clone(),
            &strings(&["analyst", "scientist"]),
            &strings(&["Toronto", "Remote"]),
            MAX_RESULT_PAGES,
        );

        let first = stream.next().await;
        assert!(first.is_some());
        drop(stream);

        // 只执行了第一个组合
        assert!(backend.calls().iter().all(|(t, l, _)| t == "analyst" && l == "Toronto"));
    }
}

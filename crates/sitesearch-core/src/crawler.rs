//! Recursive same-origin crawler.
//!
//! Starting from one URL, the crawler fetches every reachable page of the
//! site that some content rule covers, extracts its records, and follows its
//! links. URLs are deduplicated after stripping the query string and fragment,
//! so self-links and cycles are fetched once.
//!
//! Discovery fans out without bound, but fetching and extraction run as jobs
//! on a [`TaskQueue`], so at most `concurrency` pages are in flight. A page
//! that fails to fetch is logged and skipped; the rest of the crawl carries
//! on.

use crate::dom::Page;
use crate::extract::extract;
use crate::fetcher::Fetcher;
use crate::queue::TaskQueue;
use crate::rules::{CompiledRule, select_rule_index};
use crate::types::{Corpus, IndexedDocument};
use crate::Result;
use futures::future::{BoxFuture, FutureExt, join_all};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use url::Url;

/// Strip the query string and fragment from `url`.
///
/// ```rust
/// use sitesearch_core::crawler::normalize_url;
/// use url::Url;
///
/// let url = Url::parse("http://localhost:3000/foo.html?param=foo#hash").unwrap();
/// assert_eq!(normalize_url(url).as_str(), "http://localhost:3000/foo.html");
/// ```
pub fn normalize_url(mut url: Url) -> Url {
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Page counters for one crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// Pages fetched and extracted.
    pub pages_fetched: usize,
    /// Pages whose fetch or extraction failed.
    pub pages_failed: usize,
    /// URLs not fetched because no rule covers their path.
    pub pages_skipped: usize,
}

/// Result of a crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Extracted documents, in the order pages finished.
    pub corpus: Corpus,
    /// Page counters.
    pub report: CrawlReport,
}

/// Crawls one site with a fixed rule set.
pub struct Crawler {
    state: Arc<CrawlState>,
}

struct CrawlState {
    origin: Url,
    rules: Vec<CompiledRule>,
    fetcher: Fetcher,
    queue: TaskQueue,
    seen: Mutex<HashSet<String>>,
    corpus: Mutex<Corpus>,
    fetched: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Crawler {
    /// Create a crawler confined to `origin`.
    pub fn new(origin: Url, rules: Vec<CompiledRule>, fetcher: Fetcher, queue: TaskQueue) -> Self {
        Self {
            state: Arc::new(CrawlState {
                origin,
                rules,
                fetcher,
                queue,
                seen: Mutex::new(HashSet::new()),
                corpus: Mutex::new(Vec::new()),
                fetched: AtomicUsize::new(0),
                failed: AtomicUsize::new(0),
                skipped: AtomicUsize::new(0),
            }),
        }
    }

    /// Crawl everything reachable from `start`.
    ///
    /// Resolves once every discovered page has been processed. Page failures
    /// are counted in the report, never returned.
    pub async fn crawl(self, start: Url) -> CrawlOutcome {
        info!(concurrency = self.state.queue.concurrency(), "Crawling from {start}");
        visit(Arc::clone(&self.state), start).await;

        let state = &self.state;
        let outcome = CrawlOutcome {
            corpus: std::mem::take(&mut *lock(&state.corpus)),
            report: CrawlReport {
                pages_fetched: state.fetched.load(Ordering::Relaxed),
                pages_failed: state.failed.load(Ordering::Relaxed),
                pages_skipped: state.skipped.load(Ordering::Relaxed),
            },
        };
        info!(
            documents = outcome.corpus.len(),
            fetched = outcome.report.pages_fetched,
            failed = outcome.report.pages_failed,
            skipped = outcome.report.pages_skipped,
            "Crawl finished"
        );
        outcome
    }
}

fn visit(state: Arc<CrawlState>, url: Url) -> BoxFuture<'static, ()> {
    async move {
        let url = normalize_url(url);
        if !lock(&state.seen).insert(url.to_string()) {
            return;
        }

        let Some(rule) = select_rule_index(&state.rules, url.path()) else {
            debug!("No rule for {}, skipping", url.path());
            state.skipped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let job_state = Arc::clone(&state);
        let job_url = url.clone();
        let handle = state
            .queue
            .add(move || async move { job_state.process(job_url, rule).await });

        let links = match handle.await {
            Ok(Ok(links)) => links,
            Ok(Err(err)) | Err(err) => {
                warn!(category = err.category(), "Failed to crawl {url}: {err}");
                state.failed.fetch_add(1, Ordering::Relaxed);
                return;
            },
        };

        join_all(links.into_iter().map(|link| visit(Arc::clone(&state), link))).await;
    }
    .boxed()
}

impl CrawlState {
    async fn process(&self, url: Url, rule: usize) -> Result<Vec<Url>> {
        let source = self.fetcher.fetch_page(&url).await?;
        let (documents, links) = self.extract_page(&url, &source, &self.rules[rule]);
        debug!(
            records = documents.len(),
            links = links.len(),
            "Extracted {}",
            url.path()
        );

        lock(&self.corpus).extend(documents);
        self.fetched.fetch_add(1, Ordering::Relaxed);
        Ok(links)
    }

    /// Parse, extract and collect links without holding the DOM across an await.
    fn extract_page(
        &self,
        url: &Url,
        source: &str,
        rule: &CompiledRule,
    ) -> (Vec<IndexedDocument>, Vec<Url>) {
        let page = Page::parse(url.clone(), source);
        let path = url.path();

        let documents = extract(page.body(), rule)
            .into_iter()
            .map(|record| IndexedDocument::from_record(path, record))
            .collect();

        let links = page
            .links()
            .into_iter()
            .map(normalize_url)
            .filter(|link| self.should_follow(link))
            .collect();

        (documents, links)
    }

    fn should_follow(&self, link: &Url) -> bool {
        link.origin() == self.origin.origin()
            && select_rule_index(&self.rules, link.path()).is_some()
    }
}

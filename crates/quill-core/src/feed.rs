//! Incremental feed synchronizer.
//!
//! [`FeedSynchronizer`] is a pure reducer over the feed state: events go in,
//! fetch requests come out, and fetch results are fed back with
//! [`FeedSynchronizer::complete`]. It never performs I/O. [`Feed`] is the async
//! driver that runs the requested fetches against a [`FeedSource`].
//!
//! Invariants:
//! - at most one fetch is in flight per filter epoch;
//! - a filter change starts a new epoch: posts are discarded, the page index
//!   resets, and page 0 is requested immediately;
//! - results are tagged with the epoch they were requested in, and results
//!   from an older epoch are discarded without touching the list;
//! - within an epoch the list is append-only and unique by post id.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::api::{ApiError, ApiResult, BlogClient, FeedPage, PostId, PostSummary, parse_tags};

/// Posts requested per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Selected tags. Order-preserving, no repeats; empty means no tag constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter(Vec<String>);

impl TagFilter {
    pub fn new<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut filter = Self::default();
        for tag in tags {
            let tag = tag.into();
            let tag = tag.trim();
            if !tag.is_empty() && !filter.contains(tag) {
                filter.0.push(tag.to_string());
            }
        }
        filter
    }

    /// Parses a comma-separated tag list.
    pub fn parse(raw: &str) -> Self {
        Self(parse_tags(raw))
    }

    pub fn tags(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    /// Returns a copy with `tag` added, or removed if already selected.
    #[must_use]
    pub fn toggled(&self, tag: &str) -> Self {
        if self.contains(tag) {
            Self(self.0.iter().filter(|t| *t != tag).cloned().collect())
        } else {
            Self::new(self.0.iter().map(String::as_str).chain([tag]))
        }
    }
}

/// Identifies one fetch: the filter epoch it belongs to plus a sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub epoch: u64,
    pub seq: u64,
}

/// A fetch the runtime must perform and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub page: u32,
    pub size: u32,
    pub tags: Vec<String>,
}

/// Inputs to the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    /// The selected tags changed (also used for the initial load).
    FilterChanged(TagFilter),
    /// The last rendered post became visible; load the next page if possible.
    SentinelVisible,
}

/// What applying a fetch result did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Page 0 replaced the list.
    Replaced { count: usize },
    /// A later page was appended; `duplicates` posts were already listed.
    Appended { added: usize, duplicates: usize },
    /// The fetch failed; the error is kept as the last error.
    Failed(ApiError),
    /// The result belonged to an abandoned fetch and was discarded.
    Stale,
}

/// Feed state machine.
#[derive(Debug)]
pub struct FeedSynchronizer {
    posts: Vec<PostSummary>,
    ids: HashSet<PostId>,
    /// Last page successfully loaded in this epoch
    loaded_page: Option<u32>,
    has_more: bool,
    in_flight: Option<FetchTicket>,
    filter: TagFilter,
    epoch: u64,
    seq: u64,
    page_size: u32,
    last_error: Option<ApiError>,
}

impl Default for FeedSynchronizer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FeedSynchronizer {
    pub fn new(page_size: u32) -> Self {
        Self {
            posts: Vec::new(),
            ids: HashSet::new(),
            loaded_page: None,
            has_more: true,
            in_flight: None,
            filter: TagFilter::default(),
            epoch: 0,
            seq: 0,
            page_size: page_size.max(1),
            last_error: None,
        }
    }

    /// Applies an event. Returns the fetch to perform, if any.
    pub fn handle(&mut self, event: FeedEvent) -> Option<FetchRequest> {
        match event {
            FeedEvent::FilterChanged(filter) => Some(self.filter_changed(filter)),
            FeedEvent::SentinelVisible => self.sentinel_visible(),
        }
    }

    fn filter_changed(&mut self, filter: TagFilter) -> FetchRequest {
        if let Some(abandoned) = self.in_flight.take() {
            debug!(seq = abandoned.seq, "abandoning in-flight fetch from previous filter");
        }
        self.epoch += 1;
        self.posts.clear();
        self.ids.clear();
        self.loaded_page = None;
        self.has_more = true;
        self.last_error = None;
        info!(epoch = self.epoch, tags = ?filter.tags(), "feed filter changed");
        self.filter = filter;
        self.begin_fetch(0)
    }

    fn sentinel_visible(&mut self) -> Option<FetchRequest> {
        if !self.has_more {
            debug!("sentinel visible but feed is exhausted");
            return None;
        }
        if self.in_flight.is_some() {
            debug!("sentinel visible while a fetch is in flight");
            return None;
        }
        Some(self.begin_fetch(self.next_page()))
    }

    fn begin_fetch(&mut self, page: u32) -> FetchRequest {
        self.seq += 1;
        let ticket = FetchTicket {
            epoch: self.epoch,
            seq: self.seq,
        };
        self.in_flight = Some(ticket);
        debug!(page, epoch = ticket.epoch, seq = ticket.seq, "fetching feed page");
        FetchRequest {
            ticket,
            page,
            size: self.page_size,
            tags: self.filter.tags().to_vec(),
        }
    }

    /// Applies the result of `request`.
    pub fn complete(
        &mut self,
        request: &FetchRequest,
        result: ApiResult<FeedPage>,
    ) -> FetchOutcome {
        if self.in_flight != Some(request.ticket) {
            warn!(
                page = request.page,
                epoch = request.ticket.epoch,
                current_epoch = self.epoch,
                "discarding stale feed page"
            );
            return FetchOutcome::Stale;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                self.has_more = !page.last;
                self.loaded_page = Some(request.page);
                self.last_error = None;
                if request.page == 0 {
                    self.posts.clear();
                    self.ids.clear();
                    let (count, _) = self.append(page.content);
                    FetchOutcome::Replaced { count }
                } else {
                    let (added, duplicates) = self.append(page.content);
                    FetchOutcome::Appended { added, duplicates }
                }
            }
            Err(err) => {
                warn!(page = request.page, "feed fetch failed: {err}");
                self.last_error = Some(err.clone());
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Appends posts not already listed. Returns (added, duplicates).
    fn append(&mut self, posts: Vec<PostSummary>) -> (usize, usize) {
        let mut added = 0;
        let mut duplicates = 0;
        for post in posts {
            if self.ids.insert(post.id) {
                self.posts.push(post);
                added += 1;
            } else {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            debug!(duplicates, "dropped posts already in the feed");
        }
        (added, duplicates)
    }

    fn next_page(&self) -> u32 {
        self.loaded_page.map_or(0, |page| page + 1)
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Index of the last page loaded in this epoch (0 before any page loads).
    pub fn current_page(&self) -> u32 {
        self.loaded_page.unwrap_or(0)
    }

    pub fn filter(&self) -> &TagFilter {
        &self.filter
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn last_error(&self) -> Option<&ApiError> {
        self.last_error.as_ref()
    }

    /// True when the current filter has no posts at all (as opposed to a failed load).
    pub fn is_empty_feed(&self) -> bool {
        self.posts.is_empty() && !self.has_more && self.last_error.is_none()
    }
}

/// Source of feed pages.
pub trait FeedSource {
    fn fetch_page(
        &self,
        page: u32,
        size: u32,
        tags: &[String],
    ) -> impl Future<Output = ApiResult<FeedPage>> + Send;
}

impl FeedSource for BlogClient {
    async fn fetch_page(&self, page: u32, size: u32, tags: &[String]) -> ApiResult<FeedPage> {
        self.list_posts(page, size, tags).await
    }
}

/// Async driver: runs the reducer's fetch requests against a source.
///
/// The state lock is held only while the reducer runs, never across a fetch,
/// so triggers arriving mid-fetch see the in-flight flag and are dropped.
#[derive(Debug)]
pub struct Feed<S> {
    source: S,
    state: Mutex<FeedSynchronizer>,
}

impl<S: FeedSource> Feed<S> {
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            state: Mutex::new(FeedSynchronizer::new(page_size)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedSynchronizer> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies an event and runs the fetch it triggers, if any.
    ///
    /// Returns None when the event triggered no fetch.
    pub async fn dispatch(&self, event: FeedEvent) -> Option<FetchOutcome> {
        let request = self.lock().handle(event)?;
        let result = self
            .source
            .fetch_page(request.page, request.size, &request.tags)
            .await;
        Some(self.lock().complete(&request, result))
    }

    /// Switches to `filter` and loads its first page.
    pub async fn change_filter(&self, filter: TagFilter) -> FetchOutcome {
        self.dispatch(FeedEvent::FilterChanged(filter))
            .await
            .unwrap_or(FetchOutcome::Stale)
    }

    /// Signals that the sentinel is visible.
    pub async fn load_more(&self) -> Option<FetchOutcome> {
        self.dispatch(FeedEvent::SentinelVisible).await
    }

    /// Reads the current state.
    pub fn with_state<R>(&self, read: impl FnOnce(&FeedSynchronizer) -> R) -> R {
        read(&self.lock())
    }

    pub fn posts(&self) -> Vec<PostSummary> {
        self.with_state(|s| s.posts().to_vec())
    }

    pub fn has_more(&self) -> bool {
        self.with_state(FeedSynchronizer::has_more)
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::NaiveDate;
    use tokio::sync::Notify;

    use super::*;
    use crate::api::ApiErrorKind;

    fn post(id: PostId) -> PostSummary {
        PostSummary {
            id,
            title: format!("post {id}"),
            content: String::new(),
            author_name: "kim".to_string(),
            created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            like_count: 0,
            tags: Vec::new(),
        }
    }

    fn page(ids: std::ops::Range<PostId>, last: bool) -> FeedPage {
        FeedPage {
            content: ids.map(post).collect(),
            last,
        }
    }

    fn open(feed: &mut FeedSynchronizer) -> FetchRequest {
        feed.handle(FeedEvent::FilterChanged(TagFilter::default()))
            .unwrap()
    }

    #[test]
    fn test_filter_change_requests_page_zero() {
        let mut feed = FeedSynchronizer::default();
        let request = feed
            .handle(FeedEvent::FilterChanged(TagFilter::parse("go")))
            .unwrap();

        assert_eq!(request.page, 0);
        assert_eq!(request.size, 10);
        assert_eq!(request.tags, vec!["go"]);
        assert!(feed.is_loading());
        assert!(feed.has_more());
    }

    #[test]
    fn test_sentinel_ignored_while_in_flight() {
        let mut feed = FeedSynchronizer::default();
        let _first = open(&mut feed);

        for _ in 0..5 {
            assert_eq!(feed.handle(FeedEvent::SentinelVisible), None);
        }
    }

    #[test]
    fn test_pages_append_in_order() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        assert_eq!(
            feed.complete(&first, Ok(page(0..10, false))),
            FetchOutcome::Replaced { count: 10 }
        );

        let second = feed.handle(FeedEvent::SentinelVisible).unwrap();
        assert_eq!(second.page, 1);
        assert_eq!(
            feed.complete(&second, Ok(page(10..20, false))),
            FetchOutcome::Appended {
                added: 10,
                duplicates: 0
            }
        );

        assert_eq!(feed.posts().len(), 20);
        assert_eq!(feed.current_page(), 1);
        assert!(feed.has_more());
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_last_page_stops_sentinel() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..3, true)));

        assert!(!feed.has_more());
        assert_eq!(feed.handle(FeedEvent::SentinelVisible), None);
    }

    #[test]
    fn test_empty_first_page_is_terminal_not_error() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..0, true)));

        assert!(feed.posts().is_empty());
        assert!(!feed.has_more());
        assert!(feed.last_error().is_none());
        assert!(feed.is_empty_feed());
    }

    #[test]
    fn test_failure_keeps_has_more_and_retries_same_page() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..10, false)));

        let second = feed.handle(FeedEvent::SentinelVisible).unwrap();
        let err = ApiError::new(ApiErrorKind::Network, "refused");
        assert_eq!(
            feed.complete(&second, Err(err.clone())),
            FetchOutcome::Failed(err)
        );

        assert!(feed.has_more());
        assert_eq!(feed.current_page(), 0);
        assert!(!feed.is_loading());
        assert!(!feed.is_empty_feed());
        assert_eq!(
            feed.last_error().map(|e| e.kind),
            Some(ApiErrorKind::Network)
        );

        let retry = feed.handle(FeedEvent::SentinelVisible).unwrap();
        assert_eq!(retry.page, 1);
        feed.complete(&retry, Ok(page(10..15, true)));
        assert!(feed.last_error().is_none());
        assert_eq!(feed.posts().len(), 15);
    }

    #[test]
    fn test_failed_first_page_retries_page_zero() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Err(ApiError::http_status(500, "")));

        let retry = feed.handle(FeedEvent::SentinelVisible).unwrap();
        assert_eq!(retry.page, 0);
    }

    #[test]
    fn test_filter_change_discards_posts_and_errors() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..10, false)));
        let second = feed.handle(FeedEvent::SentinelVisible).unwrap();
        feed.complete(&second, Err(ApiError::http_status(500, "")));

        let request = feed
            .handle(FeedEvent::FilterChanged(TagFilter::parse("go")))
            .unwrap();

        assert_eq!(request.page, 0);
        assert!(feed.posts().is_empty());
        assert!(feed.last_error().is_none());
        assert!(feed.has_more());
        assert_eq!(feed.current_page(), 0);
    }

    #[test]
    fn test_stale_page_from_previous_epoch_is_discarded() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..10, false)));

        // Page 1 of the unfiltered feed is in flight when the filter changes.
        let stale = feed.handle(FeedEvent::SentinelVisible).unwrap();
        let fresh = feed
            .handle(FeedEvent::FilterChanged(TagFilter::parse("go")))
            .unwrap();
        assert!(fresh.ticket.epoch > stale.ticket.epoch);

        assert_eq!(
            feed.complete(&stale, Ok(page(100..110, false))),
            FetchOutcome::Stale
        );
        assert!(feed.posts().is_empty());
        assert!(feed.is_loading());

        feed.complete(&fresh, Ok(page(200..203, true)));
        let ids: Vec<PostId> = feed.posts().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![200, 201, 202]);
    }

    #[test]
    fn test_stale_page_zero_after_fresh_result_is_discarded() {
        let mut feed = FeedSynchronizer::default();
        let stale = open(&mut feed);
        let fresh = feed
            .handle(FeedEvent::FilterChanged(TagFilter::parse("go")))
            .unwrap();

        feed.complete(&fresh, Ok(page(200..205, false)));
        assert_eq!(
            feed.complete(&stale, Ok(page(0..10, false))),
            FetchOutcome::Stale
        );
        assert_eq!(feed.posts().len(), 5);
        assert_eq!(feed.posts()[0].id, 200);
    }

    #[test]
    fn test_duplicate_ids_are_dropped_on_append() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..10, false)));

        // A new post shifted the window by one: post 9 shows up again.
        let second = feed.handle(FeedEvent::SentinelVisible).unwrap();
        assert_eq!(
            feed.complete(&second, Ok(page(9..19, false))),
            FetchOutcome::Appended {
                added: 9,
                duplicates: 1
            }
        );
        assert_eq!(feed.posts().len(), 19);
    }

    #[test]
    fn test_completing_twice_is_stale() {
        let mut feed = FeedSynchronizer::default();
        let first = open(&mut feed);
        feed.complete(&first, Ok(page(0..10, false)));
        assert_eq!(
            feed.complete(&first, Ok(page(0..10, false))),
            FetchOutcome::Stale
        );
    }

    #[test]
    fn test_tag_filter_toggle_and_dedupe() {
        let filter = TagFilter::new(["go", " rust ", "go", ""]);
        assert_eq!(filter.tags(), ["go", "rust"]);

        let toggled = filter.toggled("go");
        assert_eq!(toggled.tags(), ["rust"]);
        let toggled = toggled.toggled("java");
        assert_eq!(toggled.tags(), ["rust", "java"]);
        assert!(TagFilter::parse(" , ").is_empty());
    }

    #[derive(Default)]
    struct GatedSource {
        calls: AtomicUsize,
        gate: Notify,
    }

    impl FeedSource for GatedSource {
        async fn fetch_page(&self, page_no: u32, size: u32, _tags: &[String]) -> ApiResult<FeedPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            let start = PostId::from(page_no * size);
            Ok(page(start..start + PostId::from(size), false))
        }
    }

    #[tokio::test]
    async fn test_driver_drops_triggers_during_fetch() {
        let feed = Feed::new(GatedSource::default(), 10);

        let (outcome, ()) = tokio::join!(feed.change_filter(TagFilter::default()), async {
            for _ in 0..5 {
                assert_eq!(feed.load_more().await, None);
            }
            feed.source().gate.notify_one();
        });

        assert_eq!(outcome, FetchOutcome::Replaced { count: 10 });
        assert_eq!(feed.source().calls.load(Ordering::SeqCst), 1);
        assert!(!feed.with_state(FeedSynchronizer::is_loading));

        let (outcome, ()) = tokio::join!(feed.load_more(), async {
            feed.source().gate.notify_one();
        });
        assert!(matches!(outcome, Some(FetchOutcome::Appended { added: 10, .. })));
        assert_eq!(feed.posts().len(), 20);
        assert_eq!(feed.source().calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_page_size_never_zero() {
        let feed = FeedSynchronizer::new(0);
        assert_eq!(feed.page_size(), 1);
    }
}

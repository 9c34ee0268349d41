//! Pagination state and page loading with query-fingerprint caching.
//!
//! One manager instance owns the pagination cursor, the in-flight
//! exclusivity flag and the page cache. Pages are cached under the
//! canonical fingerprint of `(page, query)`, so toggling back to a
//! previously seen search/filter/page combination is served without a
//! fetch; any membership-changing mutation clears the cache wholesale
//! via [`PaginationManager::reset`] or
//! [`PaginationManager::invalidate_cache`].

use crate::config::ListSettings;
use crate::error::{ListError, ListResult};
use crate::query::{cache_key, QueryDescriptor};
use crate::record::Record;
use crate::source::{DataSource, PageInfo, PageRequest};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Options for a single page load.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub query: QueryDescriptor,

    /// Extend the aggregate buffer instead of replacing it. Forced on by
    /// [`PaginationManager::load_next_page`].
    pub append: bool,

    /// Bypass the cache even when the page is present.
    pub force_refresh: bool,
}

impl LoadOptions {
    pub fn for_query(query: QueryDescriptor) -> Self {
        Self {
            query,
            ..Default::default()
        }
    }

    pub fn appending(mut self) -> Self {
        self.append = true;
        self
    }

    pub fn refreshing(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// Result of a page-load operation.
///
/// A cache hit, a dropped concurrent request and an exhausted cursor are
/// distinct variants rather than an empty record list with a flag, so
/// callers cannot mistake one for "zero records matched".
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// A fresh page came back from the data source.
    Fetched {
        records: Vec<Record>,
        pagination: PageInfo,
    },

    /// The page was served from the cache; no fetch happened.
    Hit { records: Vec<Record> },

    /// Dropped because another fetch is in flight.
    Suppressed,

    /// There are no further pages to load.
    Exhausted,
}

impl LoadOutcome {
    /// Records carried by this outcome; empty for the two suppressed
    /// variants.
    pub fn records(&self) -> &[Record] {
        match self {
            LoadOutcome::Fetched { records, .. } | LoadOutcome::Hit { records } => records,
            LoadOutcome::Suppressed | LoadOutcome::Exhausted => &[],
        }
    }

    /// Whether the outcome was produced without invoking the source.
    pub fn from_cache(&self) -> bool {
        !matches!(self, LoadOutcome::Fetched { .. })
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, LoadOutcome::Fetched { .. })
    }
}

/// Keyed storage of previously fetched pages.
///
/// Invalidation is all-or-nothing: entries are never dropped by key
/// pattern, only cleared wholesale when query membership changes.
#[derive(Debug, Default)]
pub struct PageCache {
    entries: HashMap<String, Vec<Record>>,
}

impl PageCache {
    pub fn get(&self, key: &str) -> Option<&Vec<Record>> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: String, records: Vec<Record>) {
        self.entries.insert(key, records);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only view of the pagination state, for hosts and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationSnapshot {
    pub current_page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub has_more: bool,
    pub loading: bool,
    pub cached_pages: usize,
    pub loaded_items: usize,
}

#[derive(Debug)]
struct PaginationState {
    current_page: usize,
    page_size: usize,
    total_count: usize,
    has_more: bool,
    loading: bool,
    cache: PageCache,
    all_loaded: Vec<Record>,
}

impl PaginationState {
    fn fresh(page_size: usize) -> Self {
        Self {
            current_page: 0,
            page_size,
            total_count: 0,
            has_more: true,
            loading: false,
            cache: PageCache::default(),
            all_loaded: Vec::new(),
        }
    }
}

/// Owns the pagination cursor, the mutual-exclusion flag and the page
/// cache for one list instance.
///
/// `loading` is a flag, not a queue: a load requested while a fetch is
/// in flight is dropped with [`LoadOutcome::Suppressed`]. State lives
/// behind a mutex so the manager can be driven through `&self` while a
/// fetch is outstanding; the lock is never held across an await point.
pub struct PaginationManager {
    source: Arc<dyn DataSource>,
    state: Mutex<PaginationState>,
    default_page_size: usize,
}

impl PaginationManager {
    pub fn new(source: Arc<dyn DataSource>, settings: &ListSettings) -> Self {
        let page_size = settings.page_size.max(1);
        Self {
            source,
            state: Mutex::new(PaginationState::fresh(page_size)),
            default_page_size: page_size,
        }
    }

    /// Reinitialize the cursor and drop every cached page. Called
    /// whenever query membership changes.
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = PaginationState::fresh(self.default_page_size);
        debug!("pagination reset, page size {}", state.page_size);
    }

    /// Load a specific page, cache first.
    pub async fn load_page(&self, page: usize, options: LoadOptions) -> ListResult<LoadOutcome> {
        let (request, key) = {
            let mut state = self.lock();

            if state.loading {
                debug!("load of page {page} dropped, another fetch is in flight");
                return Ok(LoadOutcome::Suppressed);
            }

            let key = cache_key(page, &options.query);
            if !options.force_refresh {
                if let Some(records) = state.cache.get(&key) {
                    debug!("serving page {page} from cache");
                    return Ok(LoadOutcome::Hit {
                        records: records.clone(),
                    });
                }
            }

            state.loading = true;
            let request = PageRequest {
                page,
                page_size: state.page_size,
                query: options.query.clone(),
            };
            (request, key)
        };

        debug!("loading page {page} (size {})", request.page_size);
        match self.source.load_data_paginated(request).await {
            Ok(response) => {
                let mut state = self.lock();
                state.loading = false;
                state.total_count = response.pagination.total;
                state.has_more = response.pagination.has_more;
                state.cache.insert(key, response.records.clone());

                if options.append && page > 0 {
                    state.all_loaded.extend(response.records.iter().cloned());
                } else {
                    state.all_loaded = response.records.clone();
                    state.current_page = page;
                }

                debug!(
                    "page {page} loaded, {} records, has_more {}",
                    response.records.len(),
                    state.has_more
                );
                Ok(LoadOutcome::Fetched {
                    records: response.records,
                    pagination: response.pagination,
                })
            }
            Err(source) => {
                self.lock().loading = false;
                error!("page {page} failed to load: {source:#}");
                Err(ListError::Fetch { page, source })
            }
        }
    }

    /// Load the page after the last committed one.
    ///
    /// The cursor only advances on a genuine fetch: cache hits and
    /// failures leave it where it was.
    pub async fn load_next_page(&self, options: LoadOptions) -> ListResult<LoadOutcome> {
        let next = {
            let state = self.lock();
            if !state.has_more {
                debug!("no more pages to load");
                return Ok(LoadOutcome::Exhausted);
            }
            state.current_page + 1
        };

        let outcome = self.load_page(next, options.appending()).await?;
        if outcome.is_fetched() {
            self.lock().current_page = next;
        }
        Ok(outcome)
    }

    /// Drop every cached page and the aggregate buffer without touching
    /// the cursor.
    pub fn invalidate_cache(&self) {
        let mut state = self.lock();
        state.cache.clear();
        state.all_loaded.clear();
        debug!("page cache invalidated");
    }

    /// Allow another load-more attempt after a failed fetch.
    pub fn rearm(&self) {
        self.lock().has_more = true;
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn current_page(&self) -> usize {
        self.lock().current_page
    }

    pub fn total_count(&self) -> usize {
        self.lock().total_count
    }

    pub fn page_size(&self) -> usize {
        self.lock().page_size
    }

    /// All records accumulated by replace/append loads, in arrival order.
    pub fn all_loaded_items(&self) -> Vec<Record> {
        self.lock().all_loaded.clone()
    }

    pub fn snapshot(&self) -> PaginationSnapshot {
        let state = self.lock();
        PaginationSnapshot {
            current_page: state.current_page,
            page_size: state.page_size,
            total_count: state.total_count,
            has_more: state.has_more,
            loading: state.loading,
            cached_pages: state.cache.len(),
            loaded_items: state.all_loaded.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PaginationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//! Data source collaborators: the paginated fetch, the legacy full
//! fetch, and an in-memory reference implementation.

use crate::query::{apply_query, QueryDescriptor};
use crate::record::Record;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters for one page fetch.
#[derive(Debug, Clone)]
pub struct PageRequest {
    /// 0-based page number.
    pub page: usize,
    pub page_size: usize,
    pub query: QueryDescriptor,
}

/// Position metadata returned with every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Count of all records matching the query, across every page.
    pub total: usize,
    pub has_more: bool,
}

/// The records of one page plus its pagination metadata.
#[derive(Debug, Clone)]
pub struct PageResponse {
    pub records: Vec<Record>,
    pub pagination: PageInfo,
}

/// Backing store for list records.
///
/// Implementations must reject with an error on transport or storage
/// failure rather than panicking; the engine never retries on its own.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch a single page under the given query.
    async fn load_data_paginated(&self, request: PageRequest) -> Result<PageResponse>;

    /// Fetch every matching record at once. Only used outside lazy mode.
    async fn load_data(&self, query: &QueryDescriptor) -> Result<Vec<Record>>;

    /// Whether this source talks to a remote store. Local sources keep
    /// the list in legacy mode.
    fn is_remote(&self) -> bool {
        true
    }
}

/// In-memory data source.
///
/// Backs the test suite and doubles as the adapter for hosts that
/// already hold their records locally. Reuses the same query evaluation
/// as legacy mode, so paging against it behaves like a real store.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
    remote: bool,
}

impl MemorySource {
    /// A local source; lists backed by it select legacy mode.
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            remote: false,
        }
    }

    /// A source that reports itself remote, so lists backed by it may
    /// select lazy mode.
    pub fn remote(records: Vec<Record>) -> Self {
        Self {
            records,
            remote: true,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn load_data_paginated(&self, request: PageRequest) -> Result<PageResponse> {
        let matching = apply_query(&self.records, &request.query);
        let total = matching.len();
        let start = request.page * request.page_size;
        let records: Vec<Record> = matching
            .into_iter()
            .skip(start)
            .take(request.page_size)
            .collect();
        let has_more = start + records.len() < total;

        Ok(PageResponse {
            records,
            pagination: PageInfo { total, has_more },
        })
    }

    async fn load_data(&self, query: &QueryDescriptor) -> Result<Vec<Record>> {
        Ok(apply_query(&self.records, query))
    }

    fn is_remote(&self) -> bool {
        self.remote
    }
}

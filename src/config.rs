//! Configuration for list loading, rendering and trigger behavior.

use serde::{Deserialize, Serialize};

/// Settings for a list instance.
///
/// Defaults match the behavior of the hosted list widget these settings
/// were modeled on: 50 records per page, render batches of 100, and a
/// trigger element placed 90% of the way through each rendered batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSettings {
    /// Records fetched per page in lazy mode.
    pub page_size: usize,

    /// Records painted per display-frame batch.
    pub render_batch_size: usize,

    /// Fields searched by free-text queries. Search is disabled when empty.
    pub search_fields: Vec<String>,

    /// Fields offered as filter controls.
    pub filter_fields: Vec<String>,

    /// Fields offered as sortable headers.
    pub sort_fields: Vec<String>,

    /// Whether server-side pagination may be used at all.
    pub server_pagination: bool,

    /// Force the fully client-side mode even when lazy loading is possible.
    pub force_legacy: bool,

    /// The host supplies its own data-loading hook. Requires the full
    /// dataset in memory, so lazy mode is unavailable.
    pub custom_loader: bool,

    /// The host supplies its own search hook. Same constraint as
    /// `custom_loader`.
    pub custom_search: bool,

    /// Fields computed client-side from the full dataset.
    pub computed_fields: Vec<String>,

    /// Fraction through a rendered batch where the trigger element sits.
    pub trigger_fraction: f64,

    /// Pre-trigger margin in pixels for intersection observation.
    pub trigger_margin: f64,

    /// Distance threshold in pixels for the scroll-position fallback.
    pub scroll_threshold: f64,

    /// Throttle window in milliseconds for the scroll-position fallback.
    pub scroll_throttle_ms: u64,
}

impl Default for ListSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            render_batch_size: 100,
            search_fields: Vec::new(),
            filter_fields: Vec::new(),
            sort_fields: Vec::new(),
            server_pagination: true,
            force_legacy: false,
            custom_loader: false,
            custom_search: false,
            computed_fields: Vec::new(),
            trigger_fraction: 0.9,
            trigger_margin: 100.0,
            scroll_threshold: 200.0,
            scroll_throttle_ms: 100,
        }
    }
}

impl ListSettings {
    /// Create settings with the defaults above.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lazy-mode page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Set the render batch size.
    pub fn with_render_batch_size(mut self, size: usize) -> Self {
        self.render_batch_size = size.max(1);
        self
    }

    /// Set the fields searched by free-text queries.
    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fields offered as filter controls.
    pub fn with_filter_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Set the fields offered as sortable headers.
    pub fn with_sort_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Force the fully client-side mode.
    pub fn legacy_only(mut self) -> Self {
        self.force_legacy = true;
        self
    }

    /// Whether any configured feature needs the full dataset in memory.
    pub fn requires_full_dataset(&self) -> bool {
        self.custom_loader || self.custom_search || !self.computed_fields.is_empty()
    }

    /// Preset for infinite-feed style lists backed by a remote store.
    pub fn feed_preset() -> Self {
        Self {
            page_size: 25,
            render_batch_size: 50,
            ..Default::default()
        }
    }

    /// Preset for small, fully client-side directories.
    pub fn directory_preset() -> Self {
        Self {
            force_legacy: true,
            render_batch_size: 100,
            ..Default::default()
        }
    }
}

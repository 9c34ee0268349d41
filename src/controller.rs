//! List controller: wires query state, pagination, rendering and the
//! viewport trigger together, and decides between lazy and legacy mode.
//!
//! The controller exposes pure state-transition entry points; event
//! binding (search submits, filter toggles, sort header clicks, scroll
//! updates) stays with the host. One rule unifies every mutating
//! action: anything that changes result membership resets pagination
//! and drops the cache before the next load, so records fetched under
//! different query fingerprints are never mixed into one rendered page.

use crate::config::ListSettings;
use crate::error::{ListError, ListResult};
use crate::pagination::{LoadOptions, LoadOutcome, PaginationManager};
use crate::query::{apply_query, build_query, SortOrder, ViewState};
use crate::record::{Record, RecordDecorator};
use crate::render::{IncrementalRenderer, RenderMode, RenderSurface, Template};
use crate::source::DataSource;
use crate::viewport::{ElementBox, ObservationCapability, Viewport, ViewportTrigger};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info};

/// User-facing load notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    /// Whether the host should offer a retry affordance for it.
    pub retryable: bool,
}

/// Collaborator that surfaces load failures to the user. The controller
/// decides *that* something is user-visible; presentation is external.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// How the list sources and manipulates its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Server-paginated: one page live at a time, fetched on demand.
    Lazy,
    /// Fully client-side: the whole dataset held in memory.
    Legacy,
}

/// The orchestrating unit for one list instance.
pub struct ListController<S: RenderSurface> {
    settings: ListSettings,
    source: Arc<dyn DataSource>,
    decorators: Vec<Arc<dyn RecordDecorator>>,
    template: Template,
    notifier: Option<Arc<dyn Notifier>>,
    renderer: IncrementalRenderer,
    pagination: PaginationManager,
    trigger: ViewportTrigger,
    surface: S,
    mode: ListMode,
    view: ViewState,

    /// Records the list currently owns: every loaded page in lazy mode,
    /// the full dataset in legacy mode.
    list_items: Vec<Record>,

    /// Legacy mode: the current client-side query result set.
    legacy_results: Vec<Record>,

    /// Legacy mode: how many of the results are painted so far.
    legacy_rendered: usize,
}

impl<S: RenderSurface> ListController<S> {
    pub fn new(
        settings: ListSettings,
        source: Arc<dyn DataSource>,
        template: Template,
        surface: S,
    ) -> Self {
        let mode = Self::select_mode(&settings, source.as_ref());
        let renderer = IncrementalRenderer::new().with_batch_size(settings.render_batch_size);
        let pagination = PaginationManager::new(Arc::clone(&source), &settings);
        let trigger = ViewportTrigger::new(ObservationCapability::default(), settings.clone());

        Self {
            settings,
            source,
            decorators: Vec::new(),
            template,
            notifier: None,
            renderer,
            pagination,
            trigger,
            surface,
            mode,
            view: ViewState::default(),
            list_items: Vec::new(),
            legacy_results: Vec::new(),
            legacy_rendered: 0,
        }
    }

    /// Attach a notification collaborator.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Add a record decorator; decorators run in registration order on
    /// every fetched page before it renders.
    pub fn with_decorator(mut self, decorator: Arc<dyn RecordDecorator>) -> Self {
        self.decorators.push(decorator);
        self
    }

    /// Override the host's observation capability.
    pub fn with_capability(mut self, capability: ObservationCapability) -> Self {
        self.trigger = ViewportTrigger::new(capability, self.settings.clone());
        self
    }

    /// Seed the view before the first load, e.g. from a parsed
    /// deep-link navigation query.
    pub fn with_view(mut self, view: ViewState) -> Self {
        self.view = view;
        self
    }

    fn select_mode(settings: &ListSettings, source: &dyn DataSource) -> ListMode {
        if settings.server_pagination
            && source.is_remote()
            && !settings.force_legacy
            && !settings.requires_full_dataset()
        {
            ListMode::Lazy
        } else {
            ListMode::Legacy
        }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn pagination(&self) -> &PaginationManager {
        &self.pagination
    }

    pub fn trigger(&self) -> &ViewportTrigger {
        &self.trigger
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Records the list currently owns, in rendered order.
    pub fn items(&self) -> &[Record] {
        &self.list_items
    }

    /// First load for the selected mode.
    pub async fn initialize(&mut self) -> ListResult<()> {
        info!("initializing list in {:?} mode", self.mode);
        let result = match self.mode {
            ListMode::Lazy => {
                self.pagination.reset();
                self.load_first_page().await
            }
            ListMode::Legacy => self.load_full_dataset().await,
        };

        if let Err(err) = &result {
            error!("initial load failed: {err}");
            self.notify(Notice {
                message: "Could not load the list. Please try again later.".to_string(),
                retryable: false,
            });
        }
        result
    }

    /// Submit a new search term.
    pub async fn search_data(&mut self, text: impl Into<String>) -> ListResult<()> {
        self.view.search_text = text.into();
        debug!("search submitted: {:?}", self.view.search_text);
        self.reload().await
    }

    /// Toggle a single filter control.
    pub async fn handle_filter_change(
        &mut self,
        field: &str,
        value: &str,
        active: bool,
    ) -> ListResult<()> {
        if active {
            self.view.insert_filter(field, value);
        } else {
            self.view.remove_filter(field, value);
        }
        debug!("filter {field}={value} now {}", if active { "on" } else { "off" });
        self.reload().await
    }

    /// Replace the whole filter selection at once (the explicit apply
    /// affordance).
    pub async fn apply_filters(
        &mut self,
        selections: BTreeMap<String, BTreeSet<String>>,
    ) -> ListResult<()> {
        self.view.active_filters = selections;
        self.reload().await
    }

    /// Sort-header click: cycles asc, desc, none on the clicked field;
    /// a different field starts over at asc.
    pub async fn toggle_sort(&mut self, field: &str) -> ListResult<()> {
        if self.view.sort_field.as_deref() == Some(field) {
            self.view.sort_order = self.view.sort_order.cycled();
        } else {
            self.view.sort_field = Some(field.to_string());
            self.view.sort_order = SortOrder::Asc;
        }
        debug!("sort on {field}: {:?}", self.view.sort_order);
        self.reload().await
    }

    /// Show only bookmarked records, or everything again.
    pub async fn toggle_bookmarks(&mut self) -> ListResult<()> {
        self.view.show_bookmarks = !self.view.show_bookmarks;
        self.reload().await
    }

    /// Clear search, filters, sort and the bookmark narrowing.
    pub async fn reset(&mut self) -> ListResult<()> {
        self.view = ViewState::default();
        self.reload().await
    }

    /// Fetch and append the next page (lazy), or paint the next batch of
    /// the current result set (legacy).
    pub async fn load_next_page(&mut self) -> ListResult<LoadOutcome> {
        match self.mode {
            ListMode::Lazy => self.load_next_page_lazy().await,
            ListMode::Legacy => self.render_next_legacy_chunk().await,
        }
    }

    /// Retry affordance after a failed load-more: re-arm the cursor and
    /// try again.
    pub async fn retry_load_more(&mut self) -> ListResult<LoadOutcome> {
        self.pagination.rearm();
        self.load_next_page().await
    }

    /// Host callback after it lays out a rendered batch: arm the
    /// trigger over the batch's element geometry. Legacy mode uses the
    /// manual affordance instead and never arms.
    pub fn arm_trigger(&mut self, batch: &[ElementBox]) {
        if self.mode == ListMode::Legacy {
            return;
        }
        self.trigger.arm(batch);
    }

    /// Host callback for scroll/visibility updates. Fires the trigger
    /// at most once per armed batch and loads the next page when it
    /// does.
    pub async fn observe_viewport(
        &mut self,
        viewport: Viewport,
        elements: &[ElementBox],
    ) -> ListResult<Option<LoadOutcome>> {
        let fired = self.trigger.observe(
            viewport,
            elements,
            self.pagination.is_loading(),
            self.pagination.has_more(),
        );
        if !fired {
            return Ok(None);
        }
        self.load_next_page().await.map(Some)
    }

    /// Whether the legacy manual affordance still has content to paint.
    pub fn has_more_to_render(&self) -> bool {
        self.mode == ListMode::Legacy && self.legacy_rendered < self.legacy_results.len()
    }

    /// Membership changed: reset pagination (which drops the cache) and
    /// reload from the first page, or re-run the client-side query.
    async fn reload(&mut self) -> ListResult<()> {
        match self.mode {
            ListMode::Lazy => {
                self.pagination.reset();
                self.load_first_page().await
            }
            ListMode::Legacy => self.run_client_query().await,
        }
    }

    async fn load_first_page(&mut self) -> ListResult<()> {
        let query = build_query(&self.view, &self.settings);
        let outcome = self
            .pagination
            .load_page(0, LoadOptions::for_query(query))
            .await?;
        self.render_outcome(outcome, RenderMode::Replace).await?;
        Ok(())
    }

    async fn load_next_page_lazy(&mut self) -> ListResult<LoadOutcome> {
        let query = build_query(&self.view, &self.settings);
        match self
            .pagination
            .load_next_page(LoadOptions::for_query(query))
            .await
        {
            Ok(outcome) => self.render_outcome(outcome, RenderMode::Append).await,
            Err(err) => {
                error!("load more failed: {err}");
                self.notify(Notice {
                    message: "Could not load more items.".to_string(),
                    retryable: true,
                });
                Err(err)
            }
        }
    }

    /// Decorate and paint the records an outcome carries; pass the
    /// suppressed variants through untouched.
    async fn render_outcome(
        &mut self,
        outcome: LoadOutcome,
        mode: RenderMode,
    ) -> ListResult<LoadOutcome> {
        match outcome {
            LoadOutcome::Fetched { records, pagination } => {
                let rendered = self.decorate_and_render(records, mode).await?;
                Ok(LoadOutcome::Fetched {
                    records: rendered,
                    pagination,
                })
            }
            LoadOutcome::Hit { records } => {
                let rendered = self.decorate_and_render(records, mode).await?;
                Ok(LoadOutcome::Hit { records: rendered })
            }
            other => Ok(other),
        }
    }

    async fn decorate_and_render(
        &mut self,
        records: Vec<Record>,
        mode: RenderMode,
    ) -> ListResult<Vec<Record>> {
        let records = self.decorate(records).await?;
        let rendered = self
            .renderer
            .render(records, &self.template, &mut self.surface, mode)
            .await;

        match mode {
            RenderMode::Replace => {
                self.list_items = rendered.clone();
                // Stale element geometry must never fire; the host
                // re-arms after the new layout.
                self.trigger.disarm();
            }
            RenderMode::Append => {
                self.list_items.extend(rendered.iter().cloned());
            }
        }
        Ok(rendered)
    }

    async fn decorate(&self, records: Vec<Record>) -> ListResult<Vec<Record>> {
        let mut records = records;
        for decorator in &self.decorators {
            records = decorator
                .decorate(records)
                .await
                .map_err(ListError::Decorate)?;
        }
        Ok(records)
    }

    async fn load_full_dataset(&mut self) -> ListResult<()> {
        let records = self
            .source
            .load_data(&Default::default())
            .await
            .map_err(ListError::LegacyFetch)?;
        let records = self.decorate(records).await?;
        debug!("legacy dataset loaded: {} records", records.len());
        self.list_items = records;
        self.run_client_query().await
    }

    /// Apply the current view client-side and repaint from scratch.
    async fn run_client_query(&mut self) -> ListResult<()> {
        let query = build_query(&self.view, &self.settings);
        self.legacy_results = apply_query(&self.list_items, &query);
        self.legacy_rendered = 0;
        debug!(
            "client query matched {} of {} records",
            self.legacy_results.len(),
            self.list_items.len()
        );

        let first: Vec<Record> = self
            .legacy_results
            .iter()
            .take(self.settings.render_batch_size)
            .cloned()
            .collect();
        let rendered = self
            .renderer
            .render(first, &self.template, &mut self.surface, RenderMode::Replace)
            .await;
        self.legacy_rendered = rendered.len();
        Ok(())
    }

    /// Manual load-more affordance for legacy mode: paint the next batch
    /// of the current result set.
    async fn render_next_legacy_chunk(&mut self) -> ListResult<LoadOutcome> {
        let next: Vec<Record> = self
            .legacy_results
            .iter()
            .skip(self.legacy_rendered)
            .take(self.settings.render_batch_size)
            .cloned()
            .collect();
        if next.is_empty() {
            return Ok(LoadOutcome::Exhausted);
        }

        let rendered = self
            .renderer
            .render(next, &self.template, &mut self.surface, RenderMode::Append)
            .await;
        self.legacy_rendered += rendered.len();

        let total = self.legacy_results.len();
        Ok(LoadOutcome::Fetched {
            records: rendered,
            pagination: crate::source::PageInfo {
                total,
                has_more: self.legacy_rendered < total,
            },
        })
    }

    fn notify(&self, notice: Notice) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(notice);
        }
    }
}

//! dynalist: a query-aware lazy-loading list engine.
//!
//! The engine renders a paginated, filterable, searchable list of
//! records sourced from a remote store, inside a host that supplies
//! storage, templating and event plumbing. Its core decides which page
//! of data is live, reconciles that page against concurrent
//! search/filter/sort mutations, caches previously fetched pages under
//! a canonical query fingerprint, paints records incrementally in
//! bounded batches, and watches the viewport to request the next page
//! at the right moment.
//!
//! Data flows in one direction: a user action produces a new
//! [`query::ViewState`], [`query::build_query`] turns it into a
//! [`query::QueryDescriptor`], the [`pagination::PaginationManager`]
//! loads the page (cache first, fetch on miss), the
//! [`render::IncrementalRenderer`] paints it, and the
//! [`viewport::ViewportTrigger`] re-arms for the next boundary.
//!
//! Everything host-specific is a trait: [`source::DataSource`] for the
//! store, [`render::RenderSurface`] and [`render::Template`] for
//! output, [`record::RecordDecorator`] for per-page enrichment, and
//! [`controller::Notifier`] for user-visible failures. The
//! [`controller::ListController`] wires them together and picks lazy
//! (server-paginated) or legacy (fully client-side) mode at
//! initialization.

pub mod config;
pub mod controller;
pub mod error;
pub mod navigation;
pub mod pagination;
pub mod query;
pub mod record;
pub mod render;
pub mod source;
pub mod viewport;

pub use config::ListSettings;
pub use controller::{ListController, ListMode, Notice, Notifier};
pub use error::{ListError, ListResult};
pub use navigation::{parse_navigation_query, split_by_commas};
pub use pagination::{
    LoadOptions, LoadOutcome, PageCache, PaginationManager, PaginationSnapshot,
};
pub use query::{
    build_query, cache_key, FilterQuery, QueryDescriptor, SearchQuery, SortOrder, SortQuery,
    ViewState,
};
pub use record::{FieldMap, Record, RecordDecorator};
pub use render::{
    FrameScheduler, ImmediateFrames, IncrementalRenderer, RenderMode, RenderSurface, Template,
    DEFAULT_RENDER_BATCH_SIZE,
};
pub use source::{DataSource, MemorySource, PageInfo, PageRequest, PageResponse};
pub use viewport::{
    signal_for_batch, ElementBox, IntersectionSignal, ObservationCapability, ScrollSignal,
    SignalState, Viewport, ViewportSignal, ViewportTrigger,
};

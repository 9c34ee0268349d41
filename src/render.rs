//! Incremental batched rendering.
//!
//! Large pages are painted in fixed-size batches with a frame yield
//! between batches, so a big result set never blocks interaction for
//! its full length. A batch is the only suspension point; within a
//! batch, templating and the surface push happen synchronously.

use crate::record::Record;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Default number of records painted per display-frame batch.
pub const DEFAULT_RENDER_BATCH_SIZE: usize = 100;

/// Whether a render pass replaces existing content or extends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Clear the surface before the first batch.
    Replace,
    /// Add after existing content, never clearing.
    Append,
}

/// Markup producer for a batch of records. Opaque to the engine; the
/// output is handed to the surface untouched.
pub type Template = Arc<dyn Fn(&[Record]) -> String + Send + Sync>;

/// Target that receives rendered markup.
pub trait RenderSurface: Send {
    /// Drop all previously pushed content.
    fn clear(&mut self);

    /// Add one batch worth of markup after existing content.
    fn push(&mut self, markup: String);
}

/// Yield point between render batches.
#[async_trait]
pub trait FrameScheduler: Send + Sync {
    async fn next_frame(&self);
}

/// Scheduler that yields to the runtime between batches.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateFrames;

#[async_trait]
impl FrameScheduler for ImmediateFrames {
    async fn next_frame(&self) {
        tokio::task::yield_now().await;
    }
}

/// Renders record sequences through a template in bounded batches.
pub struct IncrementalRenderer {
    batch_size: usize,
    scheduler: Arc<dyn FrameScheduler>,
}

impl IncrementalRenderer {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_RENDER_BATCH_SIZE,
            scheduler: Arc::new(ImmediateFrames),
        }
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn FrameScheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Render records in order, one batch per frame.
    ///
    /// Returns the full ordered list of rendered records so downstream
    /// components can compute trigger points and per-record state.
    pub async fn render(
        &self,
        records: Vec<Record>,
        template: &Template,
        surface: &mut dyn RenderSurface,
        mode: RenderMode,
    ) -> Vec<Record> {
        if mode == RenderMode::Replace {
            surface.clear();
        }

        let mut passes = 0usize;
        for chunk in records.chunks(self.batch_size) {
            if passes > 0 {
                self.scheduler.next_frame().await;
            }
            surface.push(template(chunk));
            passes += 1;
        }

        debug!(
            "rendered {} records in {} passes ({:?})",
            records.len(),
            passes,
            mode
        );
        records
    }
}

impl Default for IncrementalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

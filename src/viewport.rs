//! Viewport trigger: detects when the user nears the end of rendered
//! content and requests the next page, exactly once per armed batch.
//!
//! Two observation strategies live behind one capability trait. The
//! preferred strategy watches a single trigger element of the most
//! recently rendered batch against a margin-expanded viewport; the
//! fallback is a throttled scroll-distance heuristic for hosts (or
//! content) where element observation is unusable. Geometry flows in
//! from the host as plain values; the engine never touches a real
//! display tree.

use crate::config::ListSettings;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fractions probed through a batch when the primary trigger element
/// has no rendered size.
const FALLBACK_FRACTIONS: [f64; 4] = [0.8, 0.7, 0.6, 0.5];

/// Rendered geometry of one list element, in content coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ElementBox {
    /// Offset of the element's top edge from the top of the content.
    pub top: f64,
    pub height: f64,
    pub width: f64,
}

impl ElementBox {
    pub fn new(top: f64, height: f64, width: f64) -> Self {
        Self { top, height, width }
    }

    /// Hidden elements (collapsed panels and the like) report no
    /// rendered size at all.
    pub fn is_zero_sized(&self) -> bool {
        self.height == 0.0 && self.width == 0.0
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

/// Scroll state of the host viewport over the list content.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
    pub content_height: f64,
}

impl Viewport {
    pub fn new(scroll_top: f64, height: f64, content_height: f64) -> Self {
        Self {
            scroll_top,
            height,
            content_height,
        }
    }

    /// Distance between the content's bottom edge and the viewport's
    /// bottom edge.
    pub fn distance_to_end(&self) -> f64 {
        self.content_height - (self.scroll_top + self.height)
    }
}

/// Lifecycle of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Armed,
    Fired,
    Disarmed,
}

/// Near-end signal over rendered content.
///
/// Implementations fire at most once; after firing they report
/// [`SignalState::Fired`] until a fresh signal is constructed.
pub trait ViewportSignal: Debug + Send {
    /// Feed one geometry update. Returns true exactly once, when the
    /// boundary condition is first met.
    fn observe(&mut self, viewport: Viewport, elements: &[ElementBox]) -> bool;

    fn state(&self) -> SignalState;

    fn disarm(&mut self);

    /// Element index this signal watches, for element-based signals.
    fn target(&self) -> Option<usize> {
        None
    }
}

/// Fires when the chosen trigger element intersects the margin-expanded
/// viewport.
#[derive(Debug)]
pub struct IntersectionSignal {
    target: usize,
    margin: f64,
    state: SignalState,
}

impl IntersectionSignal {
    pub fn new(target: usize, margin: f64) -> Self {
        Self {
            target,
            margin,
            state: SignalState::Armed,
        }
    }
}

impl ViewportSignal for IntersectionSignal {
    fn observe(&mut self, viewport: Viewport, elements: &[ElementBox]) -> bool {
        if self.state != SignalState::Armed {
            return false;
        }
        let Some(element) = elements.get(self.target) else {
            return false;
        };

        let view_top = viewport.scroll_top - self.margin;
        let view_bottom = viewport.scroll_top + viewport.height + self.margin;
        let intersects = element.bottom() > view_top && element.top < view_bottom;
        if intersects {
            self.state = SignalState::Fired;
        }
        intersects
    }

    fn state(&self) -> SignalState {
        self.state
    }

    fn disarm(&mut self) {
        self.state = SignalState::Disarmed;
    }

    fn target(&self) -> Option<usize> {
        Some(self.target)
    }
}

/// Scroll-distance fallback: fires when the content's bottom edge comes
/// within a fixed threshold of the viewport's bottom edge.
#[derive(Debug)]
pub struct ScrollSignal {
    threshold: f64,
    throttle: Duration,
    last_observed: Option<Instant>,
    state: SignalState,
}

impl ScrollSignal {
    pub fn new(threshold: f64, throttle: Duration) -> Self {
        Self {
            threshold,
            throttle,
            last_observed: None,
            state: SignalState::Armed,
        }
    }
}

impl ViewportSignal for ScrollSignal {
    fn observe(&mut self, viewport: Viewport, _elements: &[ElementBox]) -> bool {
        if self.state != SignalState::Armed {
            return false;
        }
        if let Some(last) = self.last_observed {
            if last.elapsed() < self.throttle {
                return false;
            }
        }
        self.last_observed = Some(Instant::now());

        let near_end = viewport.distance_to_end() < self.threshold;
        if near_end {
            self.state = SignalState::Fired;
        }
        near_end
    }

    fn state(&self) -> SignalState {
        self.state
    }

    fn disarm(&mut self) {
        self.state = SignalState::Disarmed;
    }
}

/// Observation mechanisms available on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObservationCapability {
    /// Element visibility callbacks are available.
    #[default]
    Intersection,
    /// Only scroll position updates are available.
    ScrollOnly,
}

/// Pick the trigger element for a batch: the element at the configured
/// fraction through it, stepping down through the fallback fractions
/// when the candidate has no rendered size, then the last element with
/// any rendered size.
fn pick_trigger_index(elements: &[ElementBox], primary_fraction: f64) -> Option<usize> {
    if elements.is_empty() {
        return None;
    }

    let candidate = |fraction: f64| -> usize {
        let index = (elements.len() as f64 * fraction).ceil() as usize;
        index.saturating_sub(1).min(elements.len() - 1)
    };

    let primary = candidate(primary_fraction);
    if !elements[primary].is_zero_sized() {
        return Some(primary);
    }

    warn!("primary trigger element has no rendered size, probing fallbacks");
    for fraction in FALLBACK_FRACTIONS {
        let index = candidate(fraction);
        if !elements[index].is_zero_sized() {
            return Some(index);
        }
    }

    elements.iter().rposition(|element| !element.is_zero_sized())
}

/// Build the signal for a freshly rendered batch.
///
/// Element observation is preferred; the scroll heuristic takes over
/// when the host lacks it or no element in the batch has a rendered
/// size.
pub fn signal_for_batch(
    capability: ObservationCapability,
    elements: &[ElementBox],
    settings: &ListSettings,
) -> Box<dyn ViewportSignal> {
    if capability == ObservationCapability::Intersection {
        if let Some(target) = pick_trigger_index(elements, settings.trigger_fraction) {
            debug!("arming intersection signal on element {target} of {}", elements.len());
            return Box::new(IntersectionSignal::new(target, settings.trigger_margin));
        }
        warn!("no usable trigger element, falling back to scroll heuristic");
    }

    Box::new(ScrollSignal::new(
        settings.scroll_threshold,
        Duration::from_millis(settings.scroll_throttle_ms),
    ))
}

/// Owns the single active signal and its gating rules.
///
/// Arming always tears down the previous signal first, so a stale
/// element set can never fire. Firing disconnects the signal
/// immediately; it is re-armed only after the next successful render.
pub struct ViewportTrigger {
    capability: ObservationCapability,
    settings: ListSettings,
    signal: Option<Box<dyn ViewportSignal>>,
}

impl ViewportTrigger {
    pub fn new(capability: ObservationCapability, settings: ListSettings) -> Self {
        Self {
            capability,
            settings,
            signal: None,
        }
    }

    /// Arm over the element geometry of the most recently rendered
    /// batch.
    pub fn arm(&mut self, batch: &[ElementBox]) {
        self.disarm();
        self.signal = Some(signal_for_batch(self.capability, batch, &self.settings));
    }

    pub fn disarm(&mut self) {
        if let Some(mut signal) = self.signal.take() {
            signal.disarm();
        }
    }

    pub fn is_armed(&self) -> bool {
        self.signal
            .as_ref()
            .is_some_and(|signal| signal.state() == SignalState::Armed)
    }

    /// Index of the armed element target, when the active signal has
    /// one.
    pub fn target_index(&self) -> Option<usize> {
        self.signal.as_ref().and_then(|signal| signal.target())
    }

    /// Feed a geometry update. Fires at most once per arm; suppressed
    /// (but kept armed) while a fetch is in flight or when there is
    /// nothing left to load.
    pub fn observe(
        &mut self,
        viewport: Viewport,
        elements: &[ElementBox],
        loading: bool,
        has_more: bool,
    ) -> bool {
        if loading || !has_more {
            return false;
        }
        let Some(signal) = self.signal.as_mut() else {
            return false;
        };

        if signal.observe(viewport, elements) {
            debug!("viewport trigger fired");
            self.signal = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A batch of evenly stacked 50px-tall elements.
    fn batch(count: usize) -> Vec<ElementBox> {
        (0..count)
            .map(|index| ElementBox::new(index as f64 * 50.0, 50.0, 300.0))
            .collect()
    }

    fn settings() -> ListSettings {
        let mut settings = ListSettings::default();
        settings.scroll_throttle_ms = 0;
        settings
    }

    fn trigger() -> ViewportTrigger {
        ViewportTrigger::new(ObservationCapability::Intersection, settings())
    }

    #[test]
    fn primary_trigger_sits_ninety_percent_through_the_batch() {
        let mut trigger = trigger();
        trigger.arm(&batch(100));
        assert_eq!(trigger.target_index(), Some(89));
        assert!(trigger.is_armed());
    }

    #[test]
    fn zero_size_primary_falls_back_to_a_sized_element() {
        let mut elements = batch(10);
        // 90% through 10 elements is index 8; hide it.
        elements[8] = ElementBox::new(elements[8].top, 0.0, 0.0);

        let mut trigger = trigger();
        trigger.arm(&elements);

        let target = trigger.target_index().expect("an element target");
        assert_ne!(target, 8);
        assert!(!elements[target].is_zero_sized());
        // 80% through 10 elements.
        assert_eq!(target, 7);
    }

    #[test]
    fn last_sized_element_is_the_final_element_fallback() {
        let mut elements: Vec<ElementBox> =
            (0..10).map(|_| ElementBox::new(0.0, 0.0, 0.0)).collect();
        elements[2] = ElementBox::new(100.0, 50.0, 300.0);

        let mut trigger = trigger();
        trigger.arm(&elements);
        assert_eq!(trigger.target_index(), Some(2));
    }

    #[test]
    fn all_hidden_elements_select_the_scroll_heuristic() {
        let elements: Vec<ElementBox> =
            (0..10).map(|_| ElementBox::new(0.0, 0.0, 0.0)).collect();

        let mut trigger = trigger();
        trigger.arm(&elements);
        assert!(trigger.is_armed());
        assert_eq!(trigger.target_index(), None);

        // 150px from the end, inside the 200px threshold.
        let fired = trigger.observe(Viewport::new(250.0, 100.0, 500.0), &elements, false, true);
        assert!(fired);
    }

    #[test]
    fn scroll_only_capability_never_arms_an_element_signal() {
        let mut trigger = ViewportTrigger::new(ObservationCapability::ScrollOnly, settings());
        trigger.arm(&batch(10));
        assert_eq!(trigger.target_index(), None);
        assert!(trigger.is_armed());
    }

    #[test]
    fn intersection_fires_when_the_target_nears_the_viewport() {
        let elements = batch(10);
        let mut trigger = trigger();
        trigger.arm(&elements);
        let target = trigger.target_index().expect("target");
        let target_top = elements[target].top;

        // Far above the target, even with the margin.
        let far = Viewport::new(0.0, 100.0, 500.0);
        assert!(!trigger.observe(far, &elements, false, true));
        assert!(trigger.is_armed());

        // Scrolled so the margin-expanded viewport reaches the target.
        let near = Viewport::new(target_top - 150.0, 100.0, 500.0);
        assert!(trigger.observe(near, &elements, false, true));
        assert!(!trigger.is_armed());
    }

    #[test]
    fn fires_exactly_once_per_arm() {
        let elements = batch(10);
        let mut trigger = trigger();
        trigger.arm(&elements);

        let near = Viewport::new(400.0, 200.0, 500.0);
        assert!(trigger.observe(near, &elements, false, true));
        assert!(!trigger.observe(near, &elements, false, true));

        // Re-arming restores the signal.
        trigger.arm(&elements);
        assert!(trigger.observe(near, &elements, false, true));
    }

    #[test]
    fn suppressed_while_loading_or_exhausted() {
        let elements = batch(10);
        let near = Viewport::new(400.0, 200.0, 500.0);

        let mut trigger = trigger();
        trigger.arm(&elements);
        assert!(!trigger.observe(near, &elements, true, true));
        assert!(trigger.is_armed());

        assert!(!trigger.observe(near, &elements, false, false));
        assert!(trigger.is_armed());

        assert!(trigger.observe(near, &elements, false, true));
    }

    #[test]
    fn arming_replaces_the_previous_signal() {
        let first = batch(10);
        let second = batch(100);

        let mut trigger = trigger();
        trigger.arm(&first);
        assert_eq!(trigger.target_index(), Some(8));

        trigger.arm(&second);
        assert_eq!(trigger.target_index(), Some(89));
    }

    #[test]
    fn scroll_signal_respects_the_threshold() {
        let mut signal = ScrollSignal::new(200.0, Duration::ZERO);

        // 250px from the end: outside the threshold.
        assert!(!signal.observe(Viewport::new(150.0, 100.0, 500.0), &[]));
        assert_eq!(signal.state(), SignalState::Armed);

        // 150px from the end.
        assert!(signal.observe(Viewport::new(250.0, 100.0, 500.0), &[]));
        assert_eq!(signal.state(), SignalState::Fired);
    }

    #[test]
    fn scroll_signal_throttles_bursts() {
        let mut signal = ScrollSignal::new(200.0, Duration::from_secs(60));

        // First observation is far from the end and starts the window.
        assert!(!signal.observe(Viewport::new(0.0, 100.0, 500.0), &[]));
        // Within the window nothing is evaluated, even near the end.
        assert!(!signal.observe(Viewport::new(250.0, 100.0, 500.0), &[]));
        assert_eq!(signal.state(), SignalState::Armed);
    }
}

//! Per-layer toggle state, render coordination and overlay caching.
//!
//! The manager owns one slot per [`LayerKind`]. A slot holds the layer's
//! active flag, its cached overlay once rendered, the attached
//! [`GeoOverlay`] while visible, and the last error.
//!
//! Renders run as spawned tasks and report back through a channel owned by
//! the manager. Whether a finished render is shown is decided when its
//! completion is processed, not when it was started: a layer switched off
//! in the meantime drops the result.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use projection::Projector;
use renderer::{RasterRenderer, RenderedOverlay};
use solar_common::{DataLayers, GeoBoundingBox, LayerError, LayerKind, RasterLayer, StyleConfig, StyleError};

use crate::compositor::GeoOverlay;
use crate::surface::MapSurface;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("data layers have no bounding box")]
    MissingBounds,

    #[error("no layer definition for {0}")]
    MissingLayer(LayerKind),

    #[error(transparent)]
    Style(#[from] StyleError),
}

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Turned on and attached immediately.
    Attached { from_cache: bool },
    /// Turned on; a render was started.
    RenderStarted,
    /// Turned on while an earlier render is still running; that render's
    /// result will be attached.
    AwaitingRender,
    /// Turned off.
    Deactivated,
}

/// What processing a render completion did.
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionOutcome {
    /// Cached and attached.
    Attached,
    /// The layer was inactive at completion; nothing was kept.
    Discarded,
    /// The render failed; the layer was deactivated.
    Failed(LayerError),
    /// No render was pending for this kind.
    Ignored,
}

/// A finished render, successful or not.
#[derive(Debug)]
pub struct RenderCompletion {
    pub kind: LayerKind,
    pub result: Result<RenderedOverlay, LayerError>,
}

/// Snapshot of one layer for the layer menu.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerView {
    pub kind: LayerKind,
    pub label: &'static str,
    pub active: bool,
    /// No source for this location; the control is greyed out.
    pub disabled: bool,
    pub loading: bool,
    pub cached: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
struct LayerSlot {
    layer: RasterLayer,
    active: bool,
    pending: bool,
    cached: Option<Arc<RenderedOverlay>>,
    attached: Option<GeoOverlay>,
    error: Option<LayerError>,
}

impl LayerSlot {
    fn new(layer: RasterLayer) -> Self {
        Self {
            layer,
            active: false,
            pending: false,
            cached: None,
            attached: None,
            error: None,
        }
    }

    fn attach_cached<S: MapSurface>(&mut self, surface: &mut S, projector: &dyn Projector) {
        let Some(cached) = &self.cached else {
            return;
        };
        if self.attached.is_some() {
            return;
        }

        let mut overlay = GeoOverlay::new(Arc::clone(cached));
        match overlay.attach(surface, projector) {
            Ok(()) => self.attached = Some(overlay),
            Err(e) => warn!(kind = %self.layer.kind, error = %e, "Overlay attach failed"),
        }
    }

    fn detach<S: MapSurface>(&mut self, surface: &mut S) {
        if let Some(mut overlay) = self.attached.take() {
            overlay.remove(surface);
        }
    }
}

/// Coordinates toggling, rendering and caching of the four solar layers
/// for one location.
///
/// Must be used from within a Tokio runtime; renders are spawned tasks.
pub struct LayerStateManager<S: MapSurface> {
    slots: [LayerSlot; LayerKind::COUNT],
    bounds: GeoBoundingBox,
    renderer: RasterRenderer,
    surface: S,
    projector: Box<dyn Projector + Send>,
    completions_tx: mpsc::UnboundedSender<RenderCompletion>,
    completions_rx: mpsc::UnboundedReceiver<RenderCompletion>,
    last_error: Option<String>,
}

impl<S: MapSurface> LayerStateManager<S> {
    /// Create a manager from one resolved layer per kind.
    pub fn new(
        layers: Vec<RasterLayer>,
        bounds: GeoBoundingBox,
        renderer: RasterRenderer,
        surface: S,
        projector: Box<dyn Projector + Send>,
    ) -> Result<Self, SetupError> {
        let mut by_kind: [Option<RasterLayer>; LayerKind::COUNT] = Default::default();
        for layer in layers {
            let index = layer.kind.index();
            by_kind[index] = Some(layer);
        }

        let slots = match by_kind {
            [Some(annual), Some(monthly), Some(hourly), Some(mask)] => {
                [annual, monthly, hourly, mask].map(LayerSlot::new)
            }
            partial => {
                let missing = LayerKind::ALL
                    .into_iter()
                    .find(|kind| partial[kind.index()].is_none())
                    .unwrap_or(LayerKind::AnnualFlux);
                return Err(SetupError::MissingLayer(missing));
            }
        };

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        Ok(Self {
            slots,
            bounds,
            renderer,
            surface,
            projector,
            completions_tx,
            completions_rx,
            last_error: None,
        })
    }

    /// Create a manager for a location's data-layers bundle.
    pub fn from_bundle(
        bundle: &DataLayers,
        styles: &StyleConfig,
        renderer: RasterRenderer,
        surface: S,
        projector: Box<dyn Projector + Send>,
    ) -> Result<Self, SetupError> {
        let bounds = bundle.bounding_box.ok_or(SetupError::MissingBounds)?;
        let layers = RasterLayer::resolve_all(bundle, styles)?;
        Self::new(layers, bounds, renderer, surface, projector)
    }

    /// Turn on the layers shown when a report first opens.
    pub fn activate_defaults(&mut self) -> Vec<(LayerKind, Result<ToggleOutcome, LayerError>)> {
        let kind = LayerKind::AnnualFlux;
        if self.is_disabled(kind) || self.is_active(kind) {
            return Vec::new();
        }
        vec![(kind, self.toggle(kind))]
    }

    /// Flip a layer on or off.
    ///
    /// Turning on attaches the cached overlay if there is one, and otherwise
    /// starts a render unless one is already running. Turning off detaches
    /// but keeps the cache. Returns `Unavailable` for layers without a
    /// source at this location.
    #[instrument(skip(self))]
    pub fn toggle(&mut self, kind: LayerKind) -> Result<ToggleOutcome, LayerError> {
        let slot = &mut self.slots[kind.index()];

        if slot.active {
            slot.active = false;
            slot.detach(&mut self.surface);
            info!(pending = slot.pending, "Layer deactivated");
            return Ok(ToggleOutcome::Deactivated);
        }

        if slot.cached.is_some() {
            slot.active = true;
            slot.error = None;
            slot.attach_cached(&mut self.surface, &*self.projector);
            counter!("overlay_cache_hits_total", "kind" => kind.as_str()).increment(1);
            info!("Layer activated from cache");
            return Ok(ToggleOutcome::Attached { from_cache: true });
        }

        if !slot.layer.is_available() {
            let err = LayerError::Unavailable(kind);
            debug!("Layer has no source for this location");
            slot.error = Some(err.clone());
            return Err(err);
        }

        slot.active = true;
        slot.error = None;

        if slot.pending {
            info!("Layer activated; render already in flight");
            return Ok(ToggleOutcome::AwaitingRender);
        }

        slot.pending = true;
        let renderer = self.renderer.clone();
        let layer = slot.layer.clone();
        let bounds = self.bounds;
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            // A panicking render must still report, or the slot stays pending.
            let render = tokio::spawn(async move { renderer.render(&layer, bounds).await });
            let result = match render.await {
                Ok(result) => result,
                Err(e) => {
                    error!(kind = %kind, error = %e, "Render task aborted");
                    Err(LayerError::parse(format!("render aborted: {}", e)))
                }
            };
            // The receiver only goes away with the manager.
            let _ = tx.send(RenderCompletion { kind, result });
        });

        info!("Layer activated; render started");
        Ok(ToggleOutcome::RenderStarted)
    }

    /// Apply a finished render to its layer.
    #[instrument(skip(self, completion), fields(kind = %completion.kind))]
    pub fn complete_render(&mut self, completion: RenderCompletion) -> CompletionOutcome {
        let kind = completion.kind;
        let slot = &mut self.slots[kind.index()];

        if !slot.pending {
            warn!("Completion without a pending render");
            return CompletionOutcome::Ignored;
        }
        slot.pending = false;

        if !slot.active {
            counter!("overlay_stale_renders_total", "kind" => kind.as_str()).increment(1);
            info!(ok = completion.result.is_ok(), "Discarding render for inactive layer");
            return CompletionOutcome::Discarded;
        }

        match completion.result {
            Ok(overlay) => {
                slot.cached = Some(Arc::new(overlay));
                slot.attach_cached(&mut self.surface, &*self.projector);
                CompletionOutcome::Attached
            }
            Err(err) => {
                slot.active = false;
                slot.error = Some(err.clone());
                self.last_error = Some(err.user_message(kind.label()));
                warn!(error = %err, code = err.code(), "Layer render failed; layer deactivated");
                CompletionOutcome::Failed(err)
            }
        }
    }

    /// Wait for the next render to finish and apply it.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn process_next(&mut self) -> Option<(LayerKind, CompletionOutcome)> {
        if !self.has_pending() {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        let kind = completion.kind;
        Some((kind, self.complete_render(completion)))
    }

    /// Apply every completion that has already arrived, without waiting.
    pub fn process_ready(&mut self) -> Vec<(LayerKind, CompletionOutcome)> {
        let mut outcomes = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            let kind = completion.kind;
            outcomes.push((kind, self.complete_render(completion)));
        }
        outcomes
    }

    /// Wait until no render is in flight.
    pub async fn settle(&mut self) -> Vec<(LayerKind, CompletionOutcome)> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.process_next().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Install the projection for a new view and reposition every attached
    /// overlay with it.
    pub fn on_view_changed(&mut self, projector: Box<dyn Projector + Send>) {
        self.projector = projector;
        self.redraw();
    }

    /// Reposition every attached overlay using the current projection.
    pub fn redraw(&mut self) {
        for slot in self.slots.iter_mut() {
            if let Some(overlay) = slot.attached.as_mut() {
                if let Err(e) = overlay.draw(&mut self.surface, &*self.projector) {
                    warn!(kind = %slot.layer.kind, error = %e, "Overlay redraw failed");
                }
            }
        }
    }

    pub fn is_active(&self, kind: LayerKind) -> bool {
        self.slots[kind.index()].active
    }

    /// True when this location has no source for `kind`.
    pub fn is_disabled(&self, kind: LayerKind) -> bool {
        !self.slots[kind.index()].layer.is_available()
    }

    pub fn is_loading(&self, kind: LayerKind) -> bool {
        let slot = &self.slots[kind.index()];
        slot.active && slot.pending
    }

    pub fn has_pending(&self) -> bool {
        self.slots.iter().any(|s| s.pending)
    }

    pub fn cached_overlay(&self, kind: LayerKind) -> Option<&Arc<RenderedOverlay>> {
        self.slots[kind.index()].cached.as_ref()
    }

    pub fn attached_overlay(&self, kind: LayerKind) -> Option<&GeoOverlay> {
        self.slots[kind.index()].attached.as_ref()
    }

    pub fn layer_error(&self, kind: LayerKind) -> Option<&LayerError> {
        self.slots[kind.index()].error.as_ref()
    }

    pub fn layer(&self, kind: LayerKind) -> &RasterLayer {
        &self.slots[kind.index()].layer
    }

    pub fn bounds(&self) -> &GeoBoundingBox {
        &self.bounds
    }

    /// Layer menu rows in display order.
    pub fn layer_states(&self) -> Vec<LayerView> {
        LayerKind::DISPLAY_ORDER
            .iter()
            .map(|&kind| {
                let slot = &self.slots[kind.index()];
                LayerView {
                    kind,
                    label: kind.label(),
                    active: slot.active,
                    disabled: !slot.layer.is_available(),
                    loading: slot.active && slot.pending,
                    cached: slot.cached.is_some(),
                    error: slot.error.as_ref().map(|e| e.user_message(kind.label())),
                }
            })
            .collect()
    }

    /// Loading banner text while an active layer is rendering.
    pub fn loading_message(&self) -> Option<String> {
        LayerKind::DISPLAY_ORDER
            .iter()
            .find(|&&kind| self.is_loading(kind))
            .map(|kind| format!("Rendering {}...", kind.label()))
    }

    /// Most recent render failure, formatted for display.
    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Remove every attached overlay and hand back the surface.
    ///
    /// Renders still in flight finish into a closed channel and are dropped.
    pub fn teardown(mut self) -> S {
        for slot in self.slots.iter_mut() {
            slot.detach(&mut self.surface);
        }
        info!("Layer state torn down");
        self.surface
    }
}

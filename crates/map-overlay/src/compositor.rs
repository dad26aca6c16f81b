//! Geographically anchored overlays.
//!
//! A [`GeoOverlay`] owns a shared reference to one rendered overlay and the
//! surface element displaying it. It never keeps a projection: every
//! [`GeoOverlay::draw`] takes the projector for the view being drawn and
//! projects both corners again.
//!
//! ```text
//!   Detached ──attach──▶ Attached ──remove──▶ Removed
//!       │                  │   ▲                 ▲
//!       │                  └───┘ draw            │
//!       └────────────────remove──────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use projection::{Projector, ScreenRect};
use renderer::RenderedOverlay;
use solar_common::{GeoBoundingBox, LayerKind};

use crate::surface::{ElementId, MapSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Detached,
    Attached,
    Removed,
}

impl fmt::Display for OverlayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayState::Detached => write!(f, "detached"),
            OverlayState::Attached => write!(f, "attached"),
            OverlayState::Removed => write!(f, "removed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompositorError {
    #[error("cannot {operation} an overlay that is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: OverlayState,
    },
}

/// One rendered overlay anchored to its bounding box.
#[derive(Debug)]
pub struct GeoOverlay {
    overlay: Arc<RenderedOverlay>,
    state: OverlayState,
    element: Option<ElementId>,
    rect: Option<ScreenRect>,
}

impl GeoOverlay {
    pub fn new(overlay: Arc<RenderedOverlay>) -> Self {
        Self {
            overlay,
            state: OverlayState::Detached,
            element: None,
            rect: None,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn kind(&self) -> LayerKind {
        self.overlay.kind()
    }

    pub fn bounds(&self) -> &GeoBoundingBox {
        self.overlay.bounds()
    }

    pub fn overlay(&self) -> &Arc<RenderedOverlay> {
        &self.overlay
    }

    pub fn element(&self) -> Option<ElementId> {
        self.element
    }

    /// Rectangle applied by the most recent successful draw.
    pub fn screen_rect(&self) -> Option<ScreenRect> {
        self.rect
    }

    /// Insert into the surface and position for the current view.
    pub fn attach<S>(&mut self, surface: &mut S, projector: &dyn Projector) -> Result<(), CompositorError>
    where
        S: MapSurface + ?Sized,
    {
        if self.state != OverlayState::Detached {
            return Err(CompositorError::InvalidTransition {
                operation: "attach",
                state: self.state,
            });
        }

        let id = surface.create_element(Arc::clone(&self.overlay));
        surface.attach(id);
        self.element = Some(id);
        self.state = OverlayState::Attached;
        info!(kind = %self.kind(), element = id.0, "Overlay attached");

        self.draw(surface, projector)?;
        Ok(())
    }

    /// Re-project the bounding box and move the element to match.
    ///
    /// Called on every view change. Returns `None` and leaves the element
    /// where it was when the view cannot project a corner.
    pub fn draw<S>(
        &mut self,
        surface: &mut S,
        projector: &dyn Projector,
    ) -> Result<Option<ScreenRect>, CompositorError>
    where
        S: MapSurface + ?Sized,
    {
        let id = match (self.state, self.element) {
            (OverlayState::Attached, Some(id)) => id,
            _ => {
                return Err(CompositorError::InvalidTransition {
                    operation: "draw",
                    state: self.state,
                })
            }
        };

        let Some(rect) = projector.project_bounds(self.overlay.bounds()) else {
            debug!(kind = %self.kind(), "Bounds not projectable in current view");
            return Ok(None);
        };

        surface.position(id, rect);
        self.rect = Some(rect);
        Ok(Some(rect))
    }

    /// Detach and discard the element. Removing twice is a no-op.
    ///
    /// Returns whether this call changed the state.
    pub fn remove<S>(&mut self, surface: &mut S) -> bool
    where
        S: MapSurface + ?Sized,
    {
        if self.state == OverlayState::Removed {
            return false;
        }

        if let Some(id) = self.element.take() {
            surface.discard(id);
        }
        self.state = OverlayState::Removed;
        self.rect = None;
        info!(kind = %self.kind(), "Overlay removed");
        true
    }
}

//! Map-side overlay elements.
//!
//! A [`MapSurface`] is whatever the map backend offers for placing an image
//! above its base layer: create an element for a pixel buffer, insert it,
//! move/resize it to a screen rectangle, and throw it away. Only the
//! compositor calls these.

use std::collections::BTreeMap;
use std::sync::Arc;

use image::{Pixel, Rgba, RgbaImage};
use tracing::debug;

use projection::ScreenRect;
use renderer::RenderedOverlay;
use solar_common::LayerKind;

/// Handle to an element created on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// The map backend's overlay layer.
pub trait MapSurface {
    /// Create a detached element displaying `overlay`.
    fn create_element(&mut self, overlay: Arc<RenderedOverlay>) -> ElementId;

    /// Insert the element into the overlay layer.
    fn attach(&mut self, id: ElementId);

    /// Move and resize the element to `rect`.
    fn position(&mut self, id: ElementId, rect: ScreenRect);

    /// Detach the element (if attached) and drop it.
    fn discard(&mut self, id: ElementId);
}

#[derive(Debug)]
struct SurfaceElement {
    overlay: Arc<RenderedOverlay>,
    attached: bool,
    rect: Option<ScreenRect>,
}

/// Software overlay layer that composes attached elements into an image.
///
/// Elements stack in creation order; later elements draw on top.
#[derive(Debug)]
pub struct RasterSurface {
    width: u32,
    height: u32,
    next_id: u64,
    elements: BTreeMap<ElementId, SurfaceElement>,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next_id: 1,
            elements: BTreeMap::new(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn is_attached(&self, id: ElementId) -> bool {
        self.elements.get(&id).map_or(false, |e| e.attached)
    }

    pub fn element_rect(&self, id: ElementId) -> Option<ScreenRect> {
        self.elements.get(&id).and_then(|e| e.rect)
    }

    /// Kinds of all attached elements, bottom to top.
    pub fn attached_kinds(&self) -> Vec<LayerKind> {
        self.elements
            .values()
            .filter(|e| e.attached)
            .map(|e| e.overlay.kind())
            .collect()
    }

    /// Compose attached elements over a transparent canvas.
    pub fn compose(&self) -> RgbaImage {
        let mut canvas = RgbaImage::new(self.width, self.height);
        self.compose_onto(&mut canvas);
        canvas
    }

    /// Alpha-blend every attached, positioned element onto `canvas`.
    ///
    /// Each element is scaled to its screen rectangle with nearest-neighbour
    /// sampling; parts outside the canvas are clipped.
    pub fn compose_onto(&self, canvas: &mut RgbaImage) {
        let (cw, ch) = canvas.dimensions();

        for element in self.elements.values().filter(|e| e.attached) {
            let Some(rect) = element.rect.filter(ScreenRect::is_visible) else {
                continue;
            };
            let overlay = &element.overlay;
            let (ow, oh) = (overlay.width() as f64, overlay.height() as f64);

            let x0 = rect.left.floor().max(0.0) as u32;
            let y0 = rect.top.floor().max(0.0) as u32;
            let x1 = rect.right().ceil().clamp(0.0, cw as f64) as u32;
            let y1 = rect.bottom().ceil().clamp(0.0, ch as f64) as u32;

            for y in y0..y1 {
                let v = (y as f64 + 0.5 - rect.top) / rect.height * oh;
                if !(0.0..oh).contains(&v) {
                    continue;
                }
                for x in x0..x1 {
                    let u = (x as f64 + 0.5 - rect.left) / rect.width * ow;
                    if !(0.0..ow).contains(&u) {
                        continue;
                    }
                    if let Some(px) = overlay.pixel(u as usize, v as usize) {
                        if px[3] > 0 {
                            canvas.get_pixel_mut(x, y).blend(&Rgba(px));
                        }
                    }
                }
            }
        }
    }
}

impl MapSurface for RasterSurface {
    fn create_element(&mut self, overlay: Arc<RenderedOverlay>) -> ElementId {
        let id = ElementId(self.next_id);
        self.next_id += 1;
        self.elements.insert(
            id,
            SurfaceElement {
                overlay,
                attached: false,
                rect: None,
            },
        );
        id
    }

    fn attach(&mut self, id: ElementId) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.attached = true;
        }
    }

    fn position(&mut self, id: ElementId, rect: ScreenRect) {
        if let Some(element) = self.elements.get_mut(&id) {
            element.rect = Some(rect);
        }
    }

    fn discard(&mut self, id: ElementId) {
        if let Some(element) = self.elements.remove(&id) {
            debug!(kind = %element.overlay.kind(), "Discarded overlay element");
        }
    }
}

//! Common test fixtures for the overlay pipeline.
//!
//! - [`MockFetcher`]: scripted raster responses, call counting, and an
//!   optional gate that holds fetches in flight until released
//! - [`LinearProjector`]: maps a bounding box linearly onto a square screen
//!   and counts how often it is asked to project

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;

use geotiff_parser::{redact_url, RasterFetcher};
use projection::{Projector, ScreenPoint};
use solar_common::{GeoBoundingBox, LayerError, Rgb};

/// Bounding box used throughout the compositor tests.
pub fn sample_bounds() -> GeoBoundingBox {
    GeoBoundingBox::from_degrees(40.0, -74.0, 40.001, -73.999).expect("valid sample bounds")
}

/// Three-stop ramp: black, yellow, white.
pub fn black_yellow_white() -> Vec<Rgb> {
    vec![Rgb::BLACK, Rgb::new(255, 255, 0), Rgb::WHITE]
}

/// A scripted response for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Raster(Bytes),
    Status { code: u16, body: String },
    Network(String),
    /// Panic inside the fetch, as a faulty decoder dependency would.
    Panic(String),
}

/// Raster fetcher with canned responses keyed by URL (token stripped).
///
/// Unknown URLs answer `404 Not Found`. When gated, every fetch waits for a
/// permit from [`MockFetcher::release`] after being counted, which keeps a
/// render in flight for as long as a test needs.
#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every fetch until [`MockFetcher::release`] is called.
    pub fn gated(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn with_raster(self, url: &str, bytes: Vec<u8>) -> Self {
        self.respond(url, MockResponse::Raster(Bytes::from(bytes)));
        self
    }

    pub fn with_status(self, url: &str, code: u16, body: &str) -> Self {
        self.respond(
            url,
            MockResponse::Status {
                code,
                body: body.to_string(),
            },
        );
        self
    }

    pub fn with_network_error(self, url: &str, message: &str) -> Self {
        self.respond(url, MockResponse::Network(message.to_string()));
        self
    }

    pub fn with_panic(self, url: &str, message: &str) -> Self {
        self.respond(url, MockResponse::Panic(message.to_string()));
        self
    }

    /// Replace the scripted response for `url`.
    pub fn respond(&self, url: &str, response: MockResponse) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(url.to_string(), response);
    }

    /// Let `n` gated fetches proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// Number of fetches started so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every URL requested, token included.
    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().expect("requested lock").clone()
    }
}

#[async_trait]
impl RasterFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, LayerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .expect("requested lock")
            .push(url.to_string());

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| LayerError::network("mock gate closed"))?
                .forget();
        }

        let response = self
            .responses
            .lock()
            .expect("responses lock")
            .get(&redact_url(url))
            .cloned();

        match response {
            Some(MockResponse::Raster(bytes)) => Ok(bytes),
            Some(MockResponse::Status { code, body }) => {
                Err(LayerError::http(code, "mock status", body))
            }
            Some(MockResponse::Network(message)) => Err(LayerError::network(message)),
            Some(MockResponse::Panic(message)) => panic!("{}", message),
            None => Err(LayerError::http(404, "Not Found", "")),
        }
    }
}

/// Projects `bounds` linearly onto a `size`×`size` screen, then shifts and
/// scales by the current view transform.
///
/// Each instance is one view; [`LinearProjector::panned`] and
/// [`LinearProjector::zoomed`] produce the next view while sharing the call
/// counter so tests can see whether a redraw re-projected.
#[derive(Debug, Clone)]
pub struct LinearProjector {
    bounds: GeoBoundingBox,
    size: f64,
    offset: (f64, f64),
    scale: f64,
    calls: Arc<AtomicUsize>,
}

impl LinearProjector {
    pub fn new(bounds: GeoBoundingBox, size: f64) -> Self {
        Self {
            bounds,
            size,
            offset: (0.0, 0.0),
            scale: 1.0,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn panned(&self, dx: f64, dy: f64) -> Self {
        let mut next = self.clone();
        next.offset = (self.offset.0 + dx, self.offset.1 + dy);
        next
    }

    pub fn zoomed(&self, factor: f64) -> Self {
        let mut next = self.clone();
        next.scale = self.scale * factor;
        next
    }

    /// Projection calls made through this view and every view derived from it.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The point this view is expected to produce, without counting a call.
    pub fn expected(&self, lat: f64, lng: f64) -> ScreenPoint {
        let sw = self.bounds.south_west();
        let ne = self.bounds.north_east();
        let x = (lng - sw.longitude) / (ne.longitude - sw.longitude) * self.size;
        let y = (ne.latitude - lat) / (ne.latitude - sw.latitude) * self.size;
        ScreenPoint::new(x * self.scale + self.offset.0, y * self.scale + self.offset.1)
    }
}

impl Projector for LinearProjector {
    fn project_geo_to_screen(&self, lat: f64, lng: f64) -> Option<ScreenPoint> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(self.expected(lat, lng))
    }
}

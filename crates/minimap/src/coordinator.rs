//! Keeps the 2D overview in step with the 3D camera.
//!
//! Marker positions track every coalesced camera update instantly; the
//! expensive viewport fit is debounced until camera input settles. Search
//! results get their own marker set, replaced wholesale on each query.

use std::cell::RefCell;
use std::rc::Rc;

use camera::state::CameraState;
use foundation::bounds::LatLngBounds;
use foundation::geo::GeoPoint;
use foundation::time::Time;
use runtime::debounce::Debouncer;
use tracing::{debug, trace};

use crate::estimate::estimate_camera_position;
use crate::search::PlaceSearch;
use crate::view2d::{ListenerId, MapEvent, MarkerId, MarkerOptions, View2d};

/// Tunables for the overview sync behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinimapConfig {
    /// Quiet period before the viewport is refit (seconds).
    pub fit_delay_s: f64,
    /// Pixel padding passed to the viewport fit.
    pub fit_padding_px: f64,
    /// Zoom applied when centering on the first search result.
    pub search_zoom: f64,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            fit_delay_s: 0.2,
            fit_padding_px: 120.0,
            search_zoom: 15.0,
        }
    }
}

/// Mapping from camera range to an overview zoom level that keeps the 2D
/// scale roughly consistent with the 3D camera. Never below 1; the range is
/// floored at 1 m so a degenerate camera cannot produce a non-finite zoom.
pub fn zoom_for_range(range_m: f64) -> f64 {
    (24.0 - range_m.max(1.0).log2()).round().max(1.0)
}

/// Latest camera snapshot awaiting the debounced fit.
#[derive(Debug, Copy, Clone, PartialEq)]
struct FitRequest {
    center: GeoPoint,
    footprint: GeoPoint,
    range_m: f64,
}

type PositionFn = Rc<dyn Fn(GeoPoint)>;

#[derive(Default)]
struct Handlers {
    marker_drag_end: Option<PositionFn>,
    map_click: Option<PositionFn>,
}

/// Wires camera updates to the 2D overview: two derived markers, a debounced
/// bounds/zoom fit, and an optional place-search capability.
pub struct MinimapCoordinator {
    view: Rc<dyn View2d>,
    search: Option<Rc<dyn PlaceSearch>>,
    config: MinimapConfig,
    center_marker: MarkerId,
    footprint_marker: MarkerId,
    search_markers: Vec<MarkerId>,
    fit: Debouncer<FitRequest>,
    handlers: Rc<RefCell<Handlers>>,
    listener: Option<ListenerId>,
    detached: bool,
}

impl MinimapCoordinator {
    pub fn new(
        view: Rc<dyn View2d>,
        search: Option<Rc<dyn PlaceSearch>>,
        config: MinimapConfig,
    ) -> Self {
        let seed = CameraState::default();
        let center_marker =
            view.add_marker(MarkerOptions::at(seed.center.at_ground()).draggable());
        let footprint_marker = view.add_marker(
            MarkerOptions::at(estimate_camera_position(&seed)).heading(seed.heading_deg),
        );

        let handlers: Rc<RefCell<Handlers>> = Rc::default();
        let listener = {
            let handlers = Rc::clone(&handlers);
            view.add_listener(Rc::new(move |event| {
                // Clone the callback out so it can re-enter the coordinator.
                let callback = {
                    let handlers = handlers.borrow();
                    match event {
                        MapEvent::Click { .. } => handlers.map_click.clone(),
                        MapEvent::MarkerDragEnd { marker, .. } if *marker == center_marker => {
                            handlers.marker_drag_end.clone()
                        }
                        MapEvent::MarkerDragEnd { .. } => None,
                    }
                };
                if let Some(callback) = callback {
                    let position = match event {
                        MapEvent::Click { position } => *position,
                        // Drags report a ground position: altitude forced to 0.
                        MapEvent::MarkerDragEnd { position, .. } => position.at_ground(),
                    };
                    callback(position);
                }
            }))
        };

        Self {
            view,
            search,
            config,
            center_marker,
            footprint_marker,
            search_markers: Vec::new(),
            fit: Debouncer::new(config.fit_delay_s),
            handlers,
            listener: Some(listener),
            detached: false,
        }
    }

    pub fn center_marker(&self) -> MarkerId {
        self.center_marker
    }

    pub fn footprint_marker(&self) -> MarkerId {
        self.footprint_marker
    }

    /// `callback` receives the new center (altitude 0) when the view-center
    /// marker finishes a drag: the only path by which the overview moves the
    /// camera.
    pub fn on_marker_drag_end(&self, callback: impl Fn(GeoPoint) + 'static) {
        self.handlers.borrow_mut().marker_drag_end = Some(Rc::new(callback));
    }

    /// Passthrough for clicks on the overview map.
    pub fn on_map_click(&self, callback: impl Fn(GeoPoint) + 'static) {
        self.handlers.borrow_mut().map_click = Some(Rc::new(callback));
    }

    /// Applies a coalesced camera update: markers move instantly, the
    /// viewport fit is deferred until input has settled.
    pub fn camera_changed(&mut self, now: Time, camera: &CameraState) {
        if self.detached {
            return;
        }

        let footprint = estimate_camera_position(camera);
        self.view
            .move_marker(self.center_marker, camera.center.at_ground());
        self.view.move_marker(self.footprint_marker, footprint);
        self.view
            .set_marker_heading(self.footprint_marker, camera.heading_deg);
        trace!(
            lat = camera.center.lat_deg,
            lng = camera.center.lng_deg,
            range_m = camera.range_m,
            "camera changed"
        );

        self.fit.schedule(
            now,
            FitRequest {
                center: camera.center,
                footprint,
                range_m: camera.range_m,
            },
        );
    }

    /// Drives the debounced fit; call from the embedder's update loop.
    pub fn tick(&mut self, now: Time) {
        if self.detached {
            return;
        }
        if let Some(request) = self.fit.poll(now) {
            self.apply_fit(&request);
        }
    }

    fn apply_fit(&self, request: &FitRequest) {
        let mut bounds = LatLngBounds::new();
        bounds.extend(request.center);
        bounds.extend(request.footprint);

        let zoom = zoom_for_range(request.range_m);
        debug!(zoom, range_m = request.range_m, "fit overview viewport");
        self.view.fit_bounds(&bounds, self.config.fit_padding_px);
        self.view.set_zoom(zoom);
    }

    /// Runs a place search and reflects the results on the overview.
    ///
    /// With results, markers from the previous search are removed before any
    /// new ones are placed and the first result recenters the view; with no
    /// results (or no search capability) existing markers are left alone.
    pub fn search(&mut self, query: &str) {
        if self.detached {
            return;
        }
        let Some(provider) = &self.search else {
            return;
        };

        let places = provider.search(query);
        debug!(query, results = places.len(), "place search");
        if places.is_empty() {
            return;
        }

        for id in self.search_markers.drain(..) {
            self.view.remove_marker(id);
        }

        for (index, place) in places.iter().enumerate() {
            let id = self.view.add_marker(
                MarkerOptions::at(place.location.at_ground()).title(place.name.clone()),
            );
            self.search_markers.push(id);

            if index == 0 {
                self.view.set_center(place.location.at_ground());
                self.view.set_zoom(self.config.search_zoom);
            }
        }
    }

    /// Tears down the listener, both derived markers, any search markers,
    /// and any pending fit (which must never fire afterwards). Idempotent.
    pub fn detach(&mut self) {
        if self.detached {
            return;
        }
        self.detached = true;

        self.fit.cancel();
        if let Some(id) = self.listener.take() {
            self.view.remove_listener(id);
        }
        for id in self.search_markers.drain(..) {
            self.view.remove_marker(id);
        }
        self.view.remove_marker(self.footprint_marker);
        self.view.remove_marker(self.center_marker);
    }
}

impl Drop for MinimapCoordinator {
    fn drop(&mut self) {
        self.detach();
    }
}

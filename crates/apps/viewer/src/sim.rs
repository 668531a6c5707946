//! In-memory stand-ins for the external view widgets.
//!
//! The 3D sim mimics the real widget's contract: it is the authority for the
//! five camera properties, every write synchronously emits the matching
//! property-change event, and center reads back as the rich serialized
//! object rather than the literal that was written.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::json;
use tracing::{debug, info};

use camera::events::PointerEvent;
use camera::state::{CameraState, geo_from_value};
use camera::view::{
    CAMERA_PROPERTIES, CameraProperty, Handled, ListenerId as ViewListenerId, PropertyValue,
    View3d, ViewEvent, ViewListener,
};
use foundation::bounds::LatLngBounds;
use foundation::geo::GeoPoint;
use minimap::search::{Place, PlaceSearch};
use minimap::view2d::{ListenerId, MapEvent, MapListener, MarkerId, MarkerOptions, View2d};

pub struct SimView3d {
    props: RefCell<CameraState>,
    listeners: RefCell<BTreeMap<u64, ViewListener>>,
    next_listener: Cell<u64>,
}

impl SimView3d {
    pub fn new() -> Self {
        Self {
            props: RefCell::new(CameraState::default()),
            listeners: RefCell::new(BTreeMap::new()),
            next_listener: Cell::new(0),
        }
    }

    pub fn camera(&self) -> CameraState {
        *self.props.borrow()
    }

    /// Feeds one pointer event through the installed listeners, as the real
    /// widget's DOM layer would.
    pub fn pointer(&self, event: PointerEvent) -> Handled {
        self.dispatch(&ViewEvent::Pointer(event))
    }

    fn dispatch(&self, event: &ViewEvent) -> Handled {
        let snapshot: Vec<ViewListener> = self.listeners.borrow().values().map(Rc::clone).collect();
        let mut verdict = Handled::Pass;
        for listener in snapshot {
            if listener(event) == Handled::Consume {
                verdict = Handled::Consume;
            }
        }
        verdict
    }
}

impl View3d for SimView3d {
    fn get(&self, prop: CameraProperty) -> Option<PropertyValue> {
        let props = self.props.borrow();
        Some(match prop {
            CameraProperty::Center => PropertyValue::Location(json!({
                "latitude": props.center.lat_deg,
                "longitude": props.center.lng_deg,
                "altitude": props.center.alt_m,
            })),
            CameraProperty::Range => PropertyValue::Number(props.range_m),
            CameraProperty::Heading => PropertyValue::Number(props.heading_deg),
            CameraProperty::Tilt => PropertyValue::Number(props.tilt_deg),
            CameraProperty::Roll => PropertyValue::Number(props.roll_deg),
        })
    }

    fn set(&self, prop: CameraProperty, value: PropertyValue) {
        {
            let mut props = self.props.borrow_mut();
            match (prop, &value) {
                (CameraProperty::Center, PropertyValue::Location(raw)) => {
                    let Some(center) = geo_from_value(raw) else {
                        return;
                    };
                    props.center = center;
                }
                (CameraProperty::Range, PropertyValue::Number(n)) => props.range_m = *n,
                (CameraProperty::Heading, PropertyValue::Number(n)) => {
                    // The widget keeps heading in [0, 360).
                    props.heading_deg = n.rem_euclid(360.0);
                }
                (CameraProperty::Tilt, PropertyValue::Number(n)) => props.tilt_deg = *n,
                (CameraProperty::Roll, PropertyValue::Number(n)) => props.roll_deg = *n,
                _ => return,
            }
        }
        self.dispatch(&ViewEvent::PropertyChanged(prop));
    }

    fn apply(&self, state: &CameraState) {
        *self.props.borrow_mut() = *state;
        for prop in CAMERA_PROPERTIES {
            self.dispatch(&ViewEvent::PropertyChanged(prop));
        }
    }

    fn add_listener(&self, listener: ViewListener) -> ViewListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().insert(id, listener);
        ViewListenerId(id)
    }

    fn remove_listener(&self, id: ViewListenerId) {
        self.listeners.borrow_mut().remove(&id.0);
    }
}

#[derive(Default)]
pub struct SimView2d {
    center: Cell<Option<GeoPoint>>,
    zoom: Cell<Option<f64>>,
    fit_count: Cell<u64>,
    next_marker: Cell<u64>,
    markers: RefCell<BTreeMap<u64, MarkerOptions>>,
    next_listener: Cell<u64>,
    listeners: RefCell<BTreeMap<u64, MapListener>>,
}

impl SimView2d {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch(&self, event: MapEvent) {
        let snapshot: Vec<MapListener> = self.listeners.borrow().values().map(Rc::clone).collect();
        for listener in snapshot {
            listener(&event);
        }
    }

    pub fn log_summary(&self) {
        info!(
            fits = self.fit_count.get(),
            markers = self.markers.borrow().len(),
            zoom = self.zoom.get().unwrap_or(0.0),
            "overview final state"
        );
    }
}

impl View2d for SimView2d {
    fn set_center(&self, center: GeoPoint) {
        debug!(lat = center.lat_deg, lng = center.lng_deg, "overview center");
        self.center.set(Some(center));
    }

    fn set_zoom(&self, zoom: f64) {
        debug!(zoom, "overview zoom");
        self.zoom.set(Some(zoom));
    }

    fn fit_bounds(&self, bounds: &LatLngBounds, padding_px: f64) {
        if let (Some(sw), Some(ne)) = (bounds.south_west(), bounds.north_east()) {
            debug!(
                south = sw.lat_deg,
                west = sw.lng_deg,
                north = ne.lat_deg,
                east = ne.lng_deg,
                padding_px,
                "overview fit"
            );
        }
        self.fit_count.set(self.fit_count.get() + 1);
    }

    fn add_marker(&self, options: MarkerOptions) -> MarkerId {
        let id = self.next_marker.get();
        self.next_marker.set(id + 1);
        self.markers.borrow_mut().insert(id, options);
        MarkerId(id)
    }

    fn move_marker(&self, id: MarkerId, position: GeoPoint) {
        if let Some(marker) = self.markers.borrow_mut().get_mut(&id.0) {
            marker.position = position;
        }
    }

    fn set_marker_heading(&self, id: MarkerId, heading_deg: f64) {
        if let Some(marker) = self.markers.borrow_mut().get_mut(&id.0) {
            marker.heading_deg = Some(heading_deg);
        }
    }

    fn remove_marker(&self, id: MarkerId) {
        self.markers.borrow_mut().remove(&id.0);
    }

    fn add_listener(&self, listener: MapListener) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().insert(id, listener);
        ListenerId(id)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().remove(&id.0);
    }
}

/// Canned gazetteer: case-insensitive substring lookup over a built-in
/// place list.
pub struct StaticGazetteer {
    places: Vec<Place>,
}

impl StaticGazetteer {
    pub fn builtin() -> Self {
        Self {
            places: vec![
                Place::new("Yosemite Valley", GeoPoint::at_surface(37.7456, -119.5936)),
                Place::new("Half Dome", GeoPoint::at_surface(37.7459, -119.5332)),
                Place::new("El Capitan", GeoPoint::at_surface(37.7340, -119.6378)),
                Place::new("Glacier Point", GeoPoint::at_surface(37.7281, -119.5735)),
                Place::new("San Francisco", GeoPoint::at_surface(37.7749, -122.4194)),
            ],
        }
    }
}

impl PlaceSearch for StaticGazetteer {
    fn search(&self, query: &str) -> Vec<Place> {
        let needle = query.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.places
            .iter()
            .filter(|p| p.name.to_ascii_lowercase().contains(&needle))
            .cloned()
            .collect()
    }
}

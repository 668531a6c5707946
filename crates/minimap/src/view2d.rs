use std::rc::Rc;

use foundation::bounds::LatLngBounds;
use foundation::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub position: GeoPoint,
    pub draggable: bool,
    /// Orientation for direction-styled markers (degrees clockwise from
    /// north).
    pub heading_deg: Option<f64>,
    pub title: Option<String>,
}

impl MarkerOptions {
    pub fn at(position: GeoPoint) -> Self {
        Self {
            position,
            draggable: false,
            heading_deg: None,
            title: None,
        }
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Events delivered by the 2D map surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    Click {
        position: GeoPoint,
    },
    /// A draggable marker finished a drag gesture.
    MarkerDragEnd {
        marker: MarkerId,
        position: GeoPoint,
    },
}

pub type MapListener = Rc<dyn Fn(&MapEvent)>;

/// Capability surface of the 2D overview map.
pub trait View2d {
    fn set_center(&self, center: GeoPoint);

    fn set_zoom(&self, zoom: f64);

    /// Fits the viewport to `bounds` with a pixel padding on every side.
    /// An empty bounds is a no-op.
    fn fit_bounds(&self, bounds: &LatLngBounds, padding_px: f64);

    fn add_marker(&self, options: MarkerOptions) -> MarkerId;

    fn move_marker(&self, id: MarkerId, position: GeoPoint);

    fn set_marker_heading(&self, id: MarkerId, heading_deg: f64);

    /// Removing an unknown or already-removed marker is a no-op.
    fn remove_marker(&self, id: MarkerId);

    fn add_listener(&self, listener: MapListener) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

use foundation::geo::GeoPoint;

/// A place-search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub location: GeoPoint,
}

impl Place {
    pub fn new(name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            name: name.into(),
            location,
        }
    }
}

/// Free-text place lookup, a synchronous query/response round trip.
/// An empty result list is a normal outcome, not an error.
pub trait PlaceSearch {
    fn search(&self, query: &str) -> Vec<Place>;
}

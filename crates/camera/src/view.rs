use std::rc::Rc;

use crate::events::PointerEvent;
use crate::state::CameraState;

/// The five camera properties tracked on the 3D view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraProperty {
    Center,
    Range,
    Heading,
    Tilt,
    Roll,
}

pub const CAMERA_PROPERTIES: [CameraProperty; 5] = [
    CameraProperty::Center,
    CameraProperty::Range,
    CameraProperty::Heading,
    CameraProperty::Tilt,
    CameraProperty::Roll,
];

/// A property value as reported by the view.
///
/// Numeric properties arrive as numbers; `center` arrives as the serialized
/// form of whatever location object the view holds, shape not trusted.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    Location(serde_json::Value),
}

impl PropertyValue {
    /// The finite numeric value, if this is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }
}

/// Event stream delivered to listeners installed on the 3D view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Pointer(PointerEvent),
    PropertyChanged(CameraProperty),
}

/// Listener verdict: `Consume` tells the embedder to suppress the platform
/// default for the event (native context menu, page scroll).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Pass,
    Consume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

pub type ViewListener = Rc<dyn Fn(&ViewEvent) -> Handled>;

/// Capability surface of the 3D globe widget.
///
/// The widget is the single writer of camera state: a `set` must make the
/// view emit [`ViewEvent::PropertyChanged`] for that property, whether the
/// write came from this crate or from the widget's own internals.
pub trait View3d {
    /// Reads one property. `None` is noise (property momentarily absent),
    /// not an error.
    fn get(&self, prop: CameraProperty) -> Option<PropertyValue>;

    fn set(&self, prop: CameraProperty, value: PropertyValue);

    /// Writes all five properties as one atomic update.
    fn apply(&self, state: &CameraState);

    fn add_listener(&self, listener: ViewListener) -> ListenerId;

    /// Removing an unknown or already-removed listener is a no-op.
    fn remove_listener(&self, id: ListenerId);
}

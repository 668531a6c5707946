//! Camera event aggregation for the 3D view.
//!
//! One aggregator owns the canonical [`CameraState`] for one view instance.
//! Pointer gestures are translated into property writes on the view; the
//! view's own property-change events are the only thing that mutates the
//! cached state, and a burst of synchronous changes collapses into a single
//! deferred change notification.

use std::cell::RefCell;
use std::rc::Rc;

use runtime::microtask::MicrotaskQueue;
use tracing::{debug, trace};

use crate::events::{PointerEvent, buttons};
use crate::state::{CameraState, INITIAL_VIEW, geo_from_value};
use crate::view::{CameraProperty, Handled, ListenerId, PropertyValue, View3d, ViewEvent};

/// Range multiplier per scroll-down step (zoom out).
const WHEEL_ZOOM_OUT: f64 = 1.1;
/// Range multiplier per scroll-up step (zoom in).
const WHEEL_ZOOM_IN: f64 = 0.9;
/// Drag sensitivity, degrees per pixel.
const DRAG_DEG_PER_PX: f64 = 0.5;
/// Tilt limits, degrees away from straight-down.
const TILT_MIN_DEG: f64 = 0.0;
const TILT_MAX_DEG: f64 = 90.0;

pub type CameraChangeFn = Rc<dyn Fn(&CameraState)>;

struct Inner {
    state: CameraState,
    dragging: bool,
    last_pos: [f64; 2],
    update_queued: bool,
    on_change: Option<CameraChangeFn>,
    /// Bumped on detach so a flush deferred under an older attachment never
    /// fires a stale callback.
    epoch: u64,
}

struct Attachment {
    view: Rc<dyn View3d>,
    listener: ListenerId,
}

/// Aggregates pointer input and property-change events from one 3D view
/// into a canonical [`CameraState`].
///
/// The state cache survives re-attachment: swapping the view handle or the
/// callback replaces the listener set but not the accumulated state.
pub struct CameraAggregator {
    queue: MicrotaskQueue,
    inner: Rc<RefCell<Inner>>,
    attached: Option<Attachment>,
}

impl CameraAggregator {
    pub fn new(queue: MicrotaskQueue) -> Self {
        Self {
            queue,
            inner: Rc::new(RefCell::new(Inner {
                state: CameraState::default(),
                dragging: false,
                last_pos: [0.0, 0.0],
                update_queued: false,
                on_change: None,
                epoch: 0,
            })),
            attached: None,
        }
    }

    /// Read-only snapshot of the canonical state.
    pub fn state(&self) -> CameraState {
        self.inner.borrow().state
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Installs the listener set on `view` and routes coalesced change
    /// notifications to `on_change`.
    ///
    /// Any previously installed listener set is fully detached first, so
    /// re-attaching with a new handle or callback never duplicates
    /// listeners or leaks the old callback. Without a view handle this is a
    /// no-op until one appears.
    pub fn attach(&mut self, view: Option<Rc<dyn View3d>>, on_change: Option<CameraChangeFn>) {
        self.detach();

        let Some(view) = view else {
            return;
        };

        self.inner.borrow_mut().on_change = on_change;

        let listener = {
            let inner = Rc::clone(&self.inner);
            let queue = self.queue.clone();
            // The view owns the listener; hold it weakly to avoid a cycle.
            let weak_view = Rc::downgrade(&view);
            view.add_listener(Rc::new(move |event| {
                let Some(view) = weak_view.upgrade() else {
                    return Handled::Pass;
                };
                match event {
                    ViewEvent::Pointer(pointer) => {
                        handle_pointer(&inner, view.as_ref(), *pointer)
                    }
                    ViewEvent::PropertyChanged(prop) => {
                        mirror_property(&inner, &queue, view.as_ref(), *prop);
                        Handled::Pass
                    }
                }
            }))
        };

        debug!("camera aggregator attached");
        self.attached = Some(Attachment { view, listener });
    }

    /// Removes all installed listeners and drops the change callback.
    /// Safe to call repeatedly, including before any event has fired.
    pub fn detach(&mut self) {
        if let Some(attachment) = self.attached.take() {
            attachment.view.remove_listener(attachment.listener);
            debug!("camera aggregator detached");
        }
        let mut inner = self.inner.borrow_mut();
        inner.on_change = None;
        inner.dragging = false;
        inner.update_queued = false;
        inner.epoch = inner.epoch.wrapping_add(1);
    }
}

impl Drop for CameraAggregator {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Gesture handling. Writes go to the view only; the resulting
/// property-change events are the sole path back into the cached state.
fn handle_pointer(inner: &Rc<RefCell<Inner>>, view: &dyn View3d, event: PointerEvent) -> Handled {
    match event {
        PointerEvent::Wheel { delta_y } => {
            let factor = if delta_y > 0.0 {
                WHEEL_ZOOM_OUT
            } else {
                WHEEL_ZOOM_IN
            };
            let new_range = inner.borrow().state.range_m * factor;
            trace!(delta_y, new_range, "wheel zoom");
            view.set(CameraProperty::Range, PropertyValue::Number(new_range));
            Handled::Consume
        }
        PointerEvent::ButtonDown { x, y, .. } => {
            let mut inner = inner.borrow_mut();
            inner.dragging = true;
            inner.last_pos = [x, y];
            Handled::Pass
        }
        PointerEvent::Move {
            x,
            y,
            buttons: held,
        } => {
            let (dx, dy, state) = {
                let mut inner = inner.borrow_mut();
                if !inner.dragging {
                    return Handled::Pass;
                }
                let dx = x - inner.last_pos[0];
                let dy = y - inner.last_pos[1];
                inner.last_pos = [x, y];
                (dx, dy, inner.state)
            };

            let tilt = (state.tilt_deg - dy * DRAG_DEG_PER_PX).clamp(TILT_MIN_DEG, TILT_MAX_DEG);
            if held == buttons::PRIMARY {
                let heading = state.heading_deg + dx * DRAG_DEG_PER_PX;
                view.set(CameraProperty::Heading, PropertyValue::Number(heading));
                view.set(CameraProperty::Tilt, PropertyValue::Number(tilt));
            } else if held == buttons::SECONDARY {
                let roll = state.roll_deg + dx * DRAG_DEG_PER_PX;
                view.set(CameraProperty::Tilt, PropertyValue::Number(tilt));
                view.set(CameraProperty::Roll, PropertyValue::Number(roll));
            }
            Handled::Pass
        }
        PointerEvent::ButtonUp { .. } => {
            // Any release disarms the gesture, whichever button started it.
            inner.borrow_mut().dragging = false;
            Handled::Pass
        }
        PointerEvent::DoubleClick => {
            debug!("double-click reset to initial view");
            view.apply(&INITIAL_VIEW);
            Handled::Pass
        }
        // Keep the secondary-button gesture from opening the native menu.
        PointerEvent::ContextMenu => Handled::Consume,
    }
}

/// Copies one changed property from the view into the cache and, for the
/// first change of a burst, defers a single coalesced notification.
fn mirror_property(
    inner: &Rc<RefCell<Inner>>,
    queue: &MicrotaskQueue,
    view: &dyn View3d,
    prop: CameraProperty,
) {
    // A change event with no readable value is noise; keep the cached field.
    let Some(value) = view.get(prop) else {
        return;
    };

    let mut guard = inner.borrow_mut();
    match (prop, &value) {
        (CameraProperty::Center, PropertyValue::Location(raw)) => {
            let Some(center) = geo_from_value(raw) else {
                return;
            };
            guard.state.center = center;
        }
        (CameraProperty::Range, value) => {
            let Some(n) = value.as_number() else { return };
            guard.state.range_m = n;
        }
        (CameraProperty::Heading, value) => {
            let Some(n) = value.as_number() else { return };
            guard.state.heading_deg = n;
        }
        (CameraProperty::Tilt, value) => {
            let Some(n) = value.as_number() else { return };
            guard.state.tilt_deg = n;
        }
        (CameraProperty::Roll, value) => {
            let Some(n) = value.as_number() else { return };
            guard.state.roll_deg = n;
        }
        // Center reported as a bare number: noise.
        (CameraProperty::Center, _) => return,
    }

    if guard.on_change.is_some() && !guard.update_queued {
        guard.update_queued = true;
        let epoch = guard.epoch;
        drop(guard);

        let inner = Rc::clone(inner);
        queue.defer(move || {
            let (callback, state) = {
                let mut guard = inner.borrow_mut();
                if guard.epoch != epoch {
                    return;
                }
                guard.update_queued = false;
                (guard.on_change.clone(), guard.state)
            };
            if let Some(callback) = callback {
                trace!("coalesced camera change");
                callback(&state);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    use crate::events::MouseButton;
    use crate::view::{CAMERA_PROPERTIES, ViewListener};
    use foundation::geo::GeoPoint;

    #[derive(Default)]
    struct FakeProps {
        center: Option<serde_json::Value>,
        range: Option<f64>,
        heading: Option<f64>,
        tilt: Option<f64>,
        roll: Option<f64>,
    }

    /// In-memory stand-in for the 3D widget: every write synchronously
    /// dispatches the matching property-change event, like the real thing.
    #[derive(Default)]
    struct FakeView3d {
        props: RefCell<FakeProps>,
        listeners: RefCell<BTreeMap<u64, ViewListener>>,
        next_listener: Cell<u64>,
        /// When set, `get` answers `None` for every property.
        report_nothing: Cell<bool>,
    }

    impl FakeView3d {
        fn dispatch(&self, event: &ViewEvent) -> Handled {
            let snapshot: Vec<ViewListener> =
                self.listeners.borrow().values().map(Rc::clone).collect();
            let mut verdict = Handled::Pass;
            for listener in snapshot {
                if listener(event) == Handled::Consume {
                    verdict = Handled::Consume;
                }
            }
            verdict
        }

        fn pointer(&self, event: PointerEvent) -> Handled {
            self.dispatch(&ViewEvent::Pointer(event))
        }

        fn listener_count(&self) -> usize {
            self.listeners.borrow().len()
        }

        /// Simulates the widget changing a numeric property on its own.
        fn internal_set(&self, prop: CameraProperty, value: f64) {
            self.set(prop, PropertyValue::Number(value));
        }
    }

    impl View3d for FakeView3d {
        fn get(&self, prop: CameraProperty) -> Option<PropertyValue> {
            if self.report_nothing.get() {
                return None;
            }
            let props = self.props.borrow();
            match prop {
                CameraProperty::Center => props.center.clone().map(PropertyValue::Location),
                CameraProperty::Range => props.range.map(PropertyValue::Number),
                CameraProperty::Heading => props.heading.map(PropertyValue::Number),
                CameraProperty::Tilt => props.tilt.map(PropertyValue::Number),
                CameraProperty::Roll => props.roll.map(PropertyValue::Number),
            }
        }

        fn set(&self, prop: CameraProperty, value: PropertyValue) {
            {
                let mut props = self.props.borrow_mut();
                match (prop, value) {
                    (CameraProperty::Center, PropertyValue::Location(v)) => {
                        props.center = Some(v);
                    }
                    (CameraProperty::Range, PropertyValue::Number(n)) => props.range = Some(n),
                    (CameraProperty::Heading, PropertyValue::Number(n)) => props.heading = Some(n),
                    (CameraProperty::Tilt, PropertyValue::Number(n)) => props.tilt = Some(n),
                    (CameraProperty::Roll, PropertyValue::Number(n)) => props.roll = Some(n),
                    _ => {}
                }
            }
            self.dispatch(&ViewEvent::PropertyChanged(prop));
        }

        fn apply(&self, state: &CameraState) {
            {
                let mut props = self.props.borrow_mut();
                // The widget reports center as the rich serialized object.
                props.center = Some(json!({
                    "latitude": state.center.lat_deg,
                    "longitude": state.center.lng_deg,
                    "altitude": state.center.alt_m,
                }));
                props.range = Some(state.range_m);
                props.heading = Some(state.heading_deg);
                props.tilt = Some(state.tilt_deg);
                props.roll = Some(state.roll_deg);
            }
            for prop in CAMERA_PROPERTIES {
                self.dispatch(&ViewEvent::PropertyChanged(prop));
            }
        }

        fn add_listener(&self, listener: ViewListener) -> ListenerId {
            let id = self.next_listener.get();
            self.next_listener.set(id + 1);
            self.listeners.borrow_mut().insert(id, listener);
            ListenerId(id)
        }

        fn remove_listener(&self, id: ListenerId) {
            self.listeners.borrow_mut().remove(&id.0);
        }
    }

    struct Fixture {
        queue: MicrotaskQueue,
        view: Rc<FakeView3d>,
        aggregator: CameraAggregator,
        changes: Rc<RefCell<Vec<CameraState>>>,
    }

    fn attached_fixture() -> Fixture {
        let queue = MicrotaskQueue::new();
        let view = Rc::new(FakeView3d::default());
        let mut aggregator = CameraAggregator::new(queue.clone());

        let changes: Rc<RefCell<Vec<CameraState>>> = Rc::default();
        let sink = Rc::clone(&changes);
        aggregator.attach(
            Some(view.clone() as Rc<dyn View3d>),
            Some(Rc::new(move |state| sink.borrow_mut().push(*state))),
        );

        Fixture {
            queue,
            view,
            aggregator,
            changes,
        }
    }

    #[test]
    fn burst_of_changes_notifies_once_with_final_state() {
        let fx = attached_fixture();

        fx.view.internal_set(CameraProperty::Range, 1000.0);
        fx.view.internal_set(CameraProperty::Heading, 10.0);
        fx.view.internal_set(CameraProperty::Heading, 20.0);
        fx.view.internal_set(CameraProperty::Tilt, 45.0);
        assert!(fx.changes.borrow().is_empty()); // nothing until the turn ends

        fx.queue.drain();
        let changes = fx.changes.borrow();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].range_m, 1000.0);
        assert_eq!(changes[0].heading_deg, 20.0);
        assert_eq!(changes[0].tilt_deg, 45.0);
    }

    #[test]
    fn bursts_notify_in_completion_order() {
        let fx = attached_fixture();

        fx.view.internal_set(CameraProperty::Heading, 1.0);
        fx.queue.drain();
        fx.view.internal_set(CameraProperty::Heading, 2.0);
        fx.queue.drain();

        let headings: Vec<f64> = fx.changes.borrow().iter().map(|s| s.heading_deg).collect();
        assert_eq!(headings, vec![1.0, 2.0]);
    }

    #[test]
    fn wheel_zoom_is_monotonic_and_stays_positive() {
        let fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Range, 1000.0);
        fx.queue.drain();

        let mut previous = fx.aggregator.state().range_m;
        for _ in 0..8 {
            fx.view.pointer(PointerEvent::Wheel { delta_y: 120.0 });
            let range = fx.aggregator.state().range_m;
            assert!(range > previous, "scroll-down must zoom out");
            previous = range;
        }
        for _ in 0..50 {
            fx.view.pointer(PointerEvent::Wheel { delta_y: -120.0 });
            let range = fx.aggregator.state().range_m;
            assert!(range < previous, "scroll-up must zoom in");
            assert!(range > 0.0);
            previous = range;
        }
    }

    #[test]
    fn wheel_writes_range_without_its_own_notification() {
        let fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Range, 1000.0);
        fx.queue.drain();
        fx.changes.borrow_mut().clear();

        fx.view.pointer(PointerEvent::Wheel { delta_y: 120.0 });
        // The mirrored property change is the only notification source.
        assert!(fx.changes.borrow().is_empty());
        fx.queue.drain();
        assert_eq!(fx.changes.borrow().len(), 1);
        assert!((fx.changes.borrow()[0].range_m - 1100.0).abs() < 1e-9);
    }

    #[test]
    fn left_drag_turns_heading_and_tilt() {
        let fx = attached_fixture();
        fx.view.pointer(PointerEvent::ButtonDown {
            button: MouseButton::Left,
            x: 0.0,
            y: 0.0,
        });
        fx.view.pointer(PointerEvent::Move {
            x: 100.0,
            y: 0.0,
            buttons: buttons::PRIMARY,
        });

        let state = fx.aggregator.state();
        assert_eq!(state.heading_deg, 50.0); // 100 px * 0.5 deg/px
        assert_eq!(state.tilt_deg, 0.0);
    }

    #[test]
    fn right_drag_adjusts_tilt_and_roll() {
        let fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Tilt, 10.0);
        fx.queue.drain();

        fx.view.pointer(PointerEvent::ButtonDown {
            button: MouseButton::Right,
            x: 50.0,
            y: 50.0,
        });
        fx.view.pointer(PointerEvent::Move {
            x: 60.0,
            y: 30.0,
            buttons: buttons::SECONDARY,
        });

        let state = fx.aggregator.state();
        assert_eq!(state.tilt_deg, 20.0); // 10 + 20 px * 0.5 deg/px
        assert_eq!(state.roll_deg, 5.0);
    }

    #[test]
    fn tilt_stays_clamped_for_extreme_deltas() {
        let fx = attached_fixture();
        fx.view.pointer(PointerEvent::ButtonDown {
            button: MouseButton::Left,
            x: 0.0,
            y: 0.0,
        });

        fx.view.pointer(PointerEvent::Move {
            x: 0.0,
            y: -1.0e7,
            buttons: buttons::PRIMARY,
        });
        assert_eq!(fx.aggregator.state().tilt_deg, 90.0);

        fx.view.pointer(PointerEvent::Move {
            x: 0.0,
            y: 1.0e7,
            buttons: buttons::PRIMARY,
        });
        assert_eq!(fx.aggregator.state().tilt_deg, 0.0);
    }

    #[test]
    fn movement_while_disarmed_is_ignored() {
        let fx = attached_fixture();
        fx.view.pointer(PointerEvent::Move {
            x: 500.0,
            y: 500.0,
            buttons: buttons::PRIMARY,
        });
        assert_eq!(fx.aggregator.state(), CameraState::default());

        // Any release disarms, regardless of which button started the drag.
        fx.view.pointer(PointerEvent::ButtonDown {
            button: MouseButton::Right,
            x: 0.0,
            y: 0.0,
        });
        fx.view.pointer(PointerEvent::ButtonUp {
            button: MouseButton::Left,
        });
        fx.view.pointer(PointerEvent::Move {
            x: 100.0,
            y: 0.0,
            buttons: buttons::SECONDARY,
        });
        assert_eq!(fx.aggregator.state().roll_deg, 0.0);
    }

    #[test]
    fn double_click_resets_to_the_initial_view() {
        let fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Range, 123456.0);
        fx.view.internal_set(CameraProperty::Heading, 270.0);
        fx.queue.drain();

        fx.view.pointer(PointerEvent::DoubleClick);
        fx.queue.drain();

        assert_eq!(fx.aggregator.state(), INITIAL_VIEW);
    }

    #[test]
    fn context_menu_is_consumed() {
        let fx = attached_fixture();
        assert_eq!(fx.view.pointer(PointerEvent::ContextMenu), Handled::Consume);
        assert_eq!(fx.aggregator.state(), CameraState::default());
    }

    #[test]
    fn absent_values_keep_the_cached_field() {
        let fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Heading, 33.0);
        fx.queue.drain();

        fx.view.report_nothing.set(true);
        fx.view.dispatch(&ViewEvent::PropertyChanged(CameraProperty::Heading));
        fx.queue.drain();

        assert_eq!(fx.aggregator.state().heading_deg, 33.0);
    }

    #[test]
    fn malformed_center_payload_is_ignored() {
        let fx = attached_fixture();
        fx.view.set(
            CameraProperty::Center,
            PropertyValue::Location(json!({"lat": 5.0, "lng": 6.0})),
        );
        fx.queue.drain();
        assert_eq!(fx.aggregator.state().center, GeoPoint::new(5.0, 6.0, 0.0));

        fx.view.set(
            CameraProperty::Center,
            PropertyValue::Location(json!({"bogus": true})),
        );
        fx.queue.drain();
        assert_eq!(fx.aggregator.state().center, GeoPoint::new(5.0, 6.0, 0.0));
    }

    #[test]
    fn center_payload_shapes_normalize_identically() {
        let fx = attached_fixture();
        fx.view.set(
            CameraProperty::Center,
            PropertyValue::Location(json!({"latitude": 1.5, "longitude": 2.5, "altitude": 3.0})),
        );
        fx.queue.drain();
        assert_eq!(fx.aggregator.state().center, GeoPoint::new(1.5, 2.5, 3.0));
    }

    #[test]
    fn reattach_replaces_the_listener_set() {
        let mut fx = attached_fixture();
        assert_eq!(fx.view.listener_count(), 1);

        let second: Rc<RefCell<Vec<CameraState>>> = Rc::default();
        let sink = Rc::clone(&second);
        fx.aggregator.attach(
            Some(fx.view.clone() as Rc<dyn View3d>),
            Some(Rc::new(move |state| sink.borrow_mut().push(*state))),
        );
        assert_eq!(fx.view.listener_count(), 1); // no duplicates

        fx.view.internal_set(CameraProperty::Heading, 7.0);
        fx.queue.drain();
        assert!(fx.changes.borrow().is_empty()); // old callback not leaked
        assert_eq!(second.borrow().len(), 1);
    }

    #[test]
    fn state_survives_reattachment() {
        let mut fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Roll, 12.0);
        fx.queue.drain();

        fx.aggregator.attach(Some(fx.view.clone() as Rc<dyn View3d>), None);
        assert_eq!(fx.aggregator.state().roll_deg, 12.0);
    }

    #[test]
    fn attach_without_a_handle_is_a_no_op_until_one_appears() {
        let queue = MicrotaskQueue::new();
        let mut aggregator = CameraAggregator::new(queue.clone());
        aggregator.attach(None, None);
        assert!(!aggregator.is_attached());

        let view = Rc::new(FakeView3d::default());
        aggregator.attach(Some(view.clone() as Rc<dyn View3d>), None);
        assert!(aggregator.is_attached());
        assert_eq!(view.listener_count(), 1);
    }

    #[test]
    fn detach_is_idempotent_and_silences_pending_flushes() {
        let mut fx = attached_fixture();
        fx.view.internal_set(CameraProperty::Heading, 99.0);
        assert!(!fx.queue.is_empty()); // flush deferred but not yet run

        fx.aggregator.detach();
        fx.aggregator.detach();
        assert_eq!(fx.view.listener_count(), 0);

        fx.queue.drain();
        assert!(fx.changes.borrow().is_empty());
    }

    #[test]
    fn dropping_the_aggregator_detaches() {
        let fx = attached_fixture();
        let view = fx.view.clone();
        drop(fx.aggregator);
        assert_eq!(view.listener_count(), 0);
    }
}

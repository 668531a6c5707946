use std::cell::{Cell, RefCell};
use std::env;
use std::fs;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use camera::aggregator::CameraAggregator;
use camera::events::{MouseButton, PointerEvent, buttons};
use camera::state::CameraState;
use camera::view::{CameraProperty, PropertyValue, View3d};
use foundation::time::Time;
use minimap::coordinator::{MinimapConfig, MinimapCoordinator};
use minimap::search::PlaceSearch;
use minimap::view2d::{MapEvent, View2d};
use runtime::microtask::MicrotaskQueue;

mod sim;
use sim::{SimView2d, SimView3d, StaticGazetteer};

/// Simulated time advanced per dispatched input event (seconds).
const EVENT_DT_S: f64 = 0.016;
/// Tick granularity while waiting for debounced work (seconds).
const WAIT_DT_S: f64 = 0.05;

const DEMO_SCRIPT: &str = r#"[
    {"op": "dbl_click"},
    {"op": "wheel", "delta_y": 120.0, "repeat": 3},
    {"op": "drag", "from": [400.0, 300.0], "to": [500.0, 260.0], "buttons": 1, "steps": 5},
    {"op": "wait", "seconds": 0.5},
    {"op": "drag", "from": [500.0, 260.0], "to": [460.0, 300.0], "buttons": 2, "steps": 4},
    {"op": "wait", "seconds": 0.5},
    {"op": "search", "query": "half dome"},
    {"op": "drag_center_marker", "lat": 37.7456, "lng": -119.5936},
    {"op": "wait", "seconds": 0.5}
]"#;

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Step {
    Wheel {
        delta_y: f64,
        #[serde(default = "default_repeat")]
        repeat: u32,
    },
    Drag {
        from: [f64; 2],
        to: [f64; 2],
        buttons: u16,
        #[serde(default = "default_drag_steps")]
        steps: u32,
    },
    DblClick,
    Search {
        query: String,
    },
    DragCenterMarker {
        lat: f64,
        lng: f64,
    },
    Wait {
        seconds: f64,
    },
}

fn default_repeat() -> u32 {
    1
}

fn default_drag_steps() -> u32 {
    4
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    let script = match args.get(1) {
        Some(path) => fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?,
        None => DEMO_SCRIPT.to_string(),
    };
    let steps: Vec<Step> =
        serde_json::from_str(&script).map_err(|e| format!("parse script: {e}"))?;

    let mut harness = Harness::new();
    for step in &steps {
        harness.run_step(step);
    }
    // Let any remaining debounced work settle.
    harness.wait(1.0);

    let camera = harness.view3d.camera();
    info!(
        lat = camera.center.lat_deg,
        lng = camera.center.lng_deg,
        range_m = camera.range_m,
        heading_deg = camera.heading_deg,
        tilt_deg = camera.tilt_deg,
        roll_deg = camera.roll_deg,
        "camera final state"
    );
    harness.view2d.log_summary();
    Ok(())
}

/// Wires the full stack together over the simulated views and replays
/// script steps against it, driving the microtask queue after every burst
/// and ticking the coordinator as simulated time advances.
struct Harness {
    queue: MicrotaskQueue,
    view3d: Rc<SimView3d>,
    view2d: Rc<SimView2d>,
    // Held for its listener set; detaches on drop.
    _aggregator: CameraAggregator,
    coordinator: Rc<RefCell<MinimapCoordinator>>,
    clock: Rc<Cell<f64>>,
}

impl Harness {
    fn new() -> Self {
        let queue = MicrotaskQueue::new();
        let view3d = Rc::new(SimView3d::new());
        let view2d = Rc::new(SimView2d::new());
        let clock = Rc::new(Cell::new(0.0f64));

        let gazetteer: Rc<dyn PlaceSearch> = Rc::new(StaticGazetteer::builtin());
        let coordinator = Rc::new(RefCell::new(MinimapCoordinator::new(
            view2d.clone() as Rc<dyn View2d>,
            Some(gazetteer),
            MinimapConfig::default(),
        )));

        let mut aggregator = CameraAggregator::new(queue.clone());
        {
            let coordinator = Rc::clone(&coordinator);
            let clock = Rc::clone(&clock);
            aggregator.attach(
                Some(view3d.clone() as Rc<dyn View3d>),
                Some(Rc::new(move |state: &CameraState| {
                    coordinator
                        .borrow_mut()
                        .camera_changed(Time(clock.get()), state);
                })),
            );
        }

        // Reverse path: dragging the view-center marker moves the camera.
        {
            let view3d = Rc::clone(&view3d);
            coordinator.borrow().on_marker_drag_end(move |position| {
                view3d.set(
                    CameraProperty::Center,
                    PropertyValue::Location(json!({
                        "lat": position.lat_deg,
                        "lng": position.lng_deg,
                        "altitude": position.alt_m,
                    })),
                );
            });
        }

        Self {
            queue,
            view3d,
            view2d,
            _aggregator: aggregator,
            coordinator,
            clock,
        }
    }

    fn run_step(&mut self, step: &Step) {
        match step {
            Step::Wheel { delta_y, repeat } => {
                for _ in 0..*repeat {
                    self.view3d.pointer(PointerEvent::Wheel { delta_y: *delta_y });
                    self.settle();
                }
            }
            Step::Drag {
                from,
                to,
                buttons: held,
                steps,
            } => {
                let button = if *held == buttons::SECONDARY {
                    MouseButton::Right
                } else {
                    MouseButton::Left
                };
                self.view3d.pointer(PointerEvent::ButtonDown {
                    button,
                    x: from[0],
                    y: from[1],
                });

                let steps = (*steps).max(1);
                for i in 1..=steps {
                    let t = f64::from(i) / f64::from(steps);
                    self.view3d.pointer(PointerEvent::Move {
                        x: from[0] + (to[0] - from[0]) * t,
                        y: from[1] + (to[1] - from[1]) * t,
                        buttons: *held,
                    });
                    self.settle();
                }

                self.view3d.pointer(PointerEvent::ButtonUp { button });
                self.settle();
            }
            Step::DblClick => {
                self.view3d.pointer(PointerEvent::DoubleClick);
                self.settle();
            }
            Step::Search { query } => {
                self.coordinator.borrow_mut().search(query);
                self.settle();
            }
            Step::DragCenterMarker { lat, lng } => {
                let marker = self.coordinator.borrow().center_marker();
                self.view2d.dispatch(MapEvent::MarkerDragEnd {
                    marker,
                    position: foundation::geo::GeoPoint::at_surface(*lat, *lng),
                });
                self.settle();
            }
            Step::Wait { seconds } => self.wait(*seconds),
        }
    }

    /// Ends the current synchronous burst: advances the clock one event
    /// interval, runs deferred notifications, then drives the debouncer.
    fn settle(&mut self) {
        self.clock.set(self.clock.get() + EVENT_DT_S);
        self.queue.drain();
        self.coordinator.borrow_mut().tick(Time(self.clock.get()));
    }

    fn wait(&mut self, seconds: f64) {
        let deadline = self.clock.get() + seconds.max(0.0);
        while self.clock.get() < deadline {
            self.clock.set((self.clock.get() + WAIT_DT_S).min(deadline));
            self.queue.drain();
            self.coordinator.borrow_mut().tick(Time(self.clock.get()));
        }
    }
}

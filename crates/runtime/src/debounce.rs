use foundation::time::Time;

#[derive(Debug, Copy, Clone, PartialEq)]
struct Pending<T> {
    deadline: Time,
    args: T,
}

/// Debounce with cancel-on-retrigger.
///
/// Driven by explicit time injection: callers [`schedule`](Debouncer::schedule)
/// on every trigger and [`poll`](Debouncer::poll) from their update loop.
/// A new trigger replaces the pending run and restarts the quiet period;
/// nothing fires until input has been quiet for the full delay, and what
/// fires always carries the latest arguments.
///
/// One instance drives exactly one logical effect.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay_s: f64,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay_s: f64) -> Self {
        Self {
            delay_s: delay_s.max(0.0),
            pending: None,
        }
    }

    pub fn delay_s(&self) -> f64 {
        self.delay_s
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Replaces any pending run with `args`, restarting the quiet period at
    /// `now`. At most one run is ever pending.
    pub fn schedule(&mut self, now: Time, args: T) {
        self.pending = Some(Pending {
            deadline: now.advanced_by(self.delay_s),
            args,
        });
    }

    /// Fires the pending run once its quiet period has elapsed.
    pub fn poll(&mut self, now: Time) -> Option<T> {
        let due = matches!(&self.pending, Some(p) if now.0 >= p.deadline.0);
        if due {
            self.pending.take().map(|p| p.args)
        } else {
            None
        }
    }

    /// Drops any pending run; it will never fire. Returns whether one was
    /// pending. Safe to call repeatedly.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }
}

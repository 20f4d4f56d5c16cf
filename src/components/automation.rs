//! Scheduled parameter automation.
//!
//! A [`ParamTimeline`] is the value of one audio parameter (a voice's gain or
//! frequency) as a function of time, built from scheduled events:
//!
//! - [`Automation::SetValue`] jumps to a value at a time,
//! - [`Automation::LinearRamp`] ramps linearly from the previous event to a
//!   value, reaching it at the event time,
//! - [`Automation::SetTarget`] starts an exponential approach toward a target
//!   at a time, with the given time constant, lasting until the next event.
//!
//! Events are kept sorted by time. Events at the same time keep their
//! scheduling order. Times are in seconds on whatever clock the caller uses.

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automation {
    SetValue {
        time: f64,
        value: f64,
    },
    LinearRamp {
        time: f64,
        value: f64,
    },
    SetTarget {
        time: f64,
        target: f64,
        time_constant: f64,
    },
}

impl Automation {
    pub fn time(&self) -> f64 {
        match *self {
            Automation::SetValue { time, .. }
            | Automation::LinearRamp { time, .. }
            | Automation::SetTarget { time, .. } => time,
        }
    }
}

fn approach(from: f64, target: f64, elapsed: f64, time_constant: f64) -> f64 {
    if time_constant <= 0.0 {
        return target;
    }
    target + (from - target) * (-elapsed / time_constant).exp()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamTimeline {
    /// Value before the first event.
    initial: f64,
    events: Vec<Automation>,
}

impl ParamTimeline {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[Automation] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn insert(&mut self, event: Automation) {
        let time = event.time();
        let at = self.events.partition_point(|e| e.time() <= time);
        self.events.insert(at, event);
    }

    pub fn set_value_at(&mut self, value: f64, time: f64) {
        self.insert(Automation::SetValue { time, value });
    }

    pub fn linear_ramp_to(&mut self, value: f64, end_time: f64) {
        self.insert(Automation::LinearRamp {
            time: end_time,
            value,
        });
    }

    pub fn set_target_at(&mut self, target: f64, start_time: f64, time_constant: f64) {
        self.insert(Automation::SetTarget {
            time: start_time,
            target,
            time_constant,
        });
    }

    /// Remove every event scheduled at or after `time`.
    pub fn cancel_from(&mut self, time: f64) {
        let at = self.events.partition_point(|e| e.time() < time);
        self.events.truncate(at);
    }

    /// Freeze the parameter at its value at `time`: later events are removed
    /// and the value is pinned there, so a ramp in progress stops where it is.
    pub fn cancel_and_hold(&mut self, time: f64) {
        let value = self.value_at(time);
        self.cancel_from(time);
        self.set_value_at(value, time);
    }

    /// Fold events that can no longer affect values at or after `time`.
    pub fn prune_before(&mut self, time: f64) {
        let passed = self.events.partition_point(|e| e.time() <= time);
        if passed < 2 {
            return;
        }
        let keep = passed - 1;
        // The last passed event stays: it anchors ramps and targets after it.
        self.initial = match self.events[keep] {
            Automation::SetTarget { time: start, .. } => self.value_at(start),
            Automation::SetValue { value, .. } | Automation::LinearRamp { value, .. } => value,
        };
        self.events.drain(..keep);
    }

    pub fn value_at(&self, t: f64) -> f64 {
        let mut value = self.initial;
        let mut anchor: Option<f64> = None;
        let mut target: Option<(f64, f64, f64)> = None;

        for event in &self.events {
            if event.time() > t {
                if let Automation::LinearRamp { time, value: end } = *event
                    && let Some(from) = anchor
                    && time > from
                {
                    return value + (end - value) * (t - from) / (time - from);
                }
                break;
            }
            if let Some((start, goal, tc)) = target.take() {
                value = approach(value, goal, event.time() - start, tc);
            }
            match *event {
                Automation::SetValue { time, value: v }
                | Automation::LinearRamp { time, value: v } => {
                    value = v;
                    anchor = Some(time);
                }
                Automation::SetTarget {
                    time,
                    target: goal,
                    time_constant,
                } => {
                    anchor = Some(time);
                    target = Some((time, goal, time_constant));
                }
            }
        }

        if let Some((start, goal, tc)) = target {
            value = approach(value, goal, t - start, tc);
        }
        value
    }
}

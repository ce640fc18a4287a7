use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::info;

use crate::pet::PetState;

/// Where formatted state lines end up (a display device, a log, a test
/// buffer). The hardware integration itself lives outside this crate.
pub trait StateSink: Send + Sync {
    fn send(&self, line: &str);
}

/// Default sink: the state line goes to the log.
pub struct LogSink;

impl StateSink for LogSink {
    fn send(&self, line: &str) {
        info!("pet state -> {}", line);
    }
}

/// Pushes `"<HP>,<mood>"` lines to a sink, at most once per interval.
///
/// The throttle state is owned here and compared against a monotonic
/// clock, so the rest of the system carries no shared timestamp.
pub struct Notifier {
    sink: Box<dyn StateSink>,
    min_interval: Duration,
    last_push: Mutex<Option<Instant>>,
}

impl Notifier {
    pub fn new(sink: Box<dyn StateSink>, min_interval: Duration) -> Self {
        Notifier {
            sink,
            min_interval,
            last_push: Mutex::new(None),
        }
    }

    /// Push the state unless a push happened inside the throttle window.
    /// Returns whether the line was sent.
    pub fn push(&self, state: &PetState) -> bool {
        let now = Instant::now();
        let mut last_push = self.last_push.lock().expect("notifier lock poisoned");

        if let Some(last) = *last_push {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }

        *last_push = Some(now);
        self.sink.send(&format!("{},{}", state.health_points, state.mood));
        true
    }
}

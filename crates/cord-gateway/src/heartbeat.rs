//! Heartbeat controller
//!
//! Runs a repeating timer task that invokes a beat closure at the interval
//! the server announced in Hello. The beat itself knows nothing about the
//! socket; the session hands in a closure that reads the live sequence and
//! queues a heartbeat frame.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

type Beat = Arc<dyn Fn() + Send + Sync>;

struct Running {
    task: JoinHandle<()>,
    beat: Beat,
    interval: Duration,
}

#[derive(Debug, Default)]
struct Timing {
    last_beat: Option<Instant>,
    latency: Option<Duration>,
}

/// Periodic heartbeat timer
#[derive(Default)]
pub struct HeartbeatController {
    running: Mutex<Option<Running>>,
    timing: Arc<Mutex<Timing>>,
}

impl std::fmt::Debug for HeartbeatController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatController")
            .field("interval", &self.interval())
            .field("latency", &self.latency())
            .finish()
    }
}

impl HeartbeatController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start beating every `interval`, first one interval from now
    ///
    /// A timer that is already running is stopped first. Must be called
    /// from within a tokio runtime.
    pub fn start<F>(&self, interval: Duration, beat: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.stop();

        let beat: Beat = Arc::new(beat);
        let task_beat = Arc::clone(&beat);
        let timing = Arc::clone(&self.timing);
        let first = Instant::now() + interval;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                timing.lock().last_beat = Some(Instant::now());
                task_beat();
            }
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "Heartbeat started");
        *self.running.lock() = Some(Running {
            task,
            beat,
            interval,
        });
    }

    /// Stop the timer; safe to call repeatedly or before `start`
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().take() {
            running.task.abort();
            tracing::debug!("Heartbeat stopped");
        }
    }

    /// Beat immediately without shifting the timer phase
    ///
    /// Returns `false` if the controller is not running.
    pub fn beat_now(&self) -> bool {
        let beat = match self.running.lock().as_ref() {
            Some(running) => Arc::clone(&running.beat),
            None => return false,
        };

        self.timing.lock().last_beat = Some(Instant::now());
        beat();
        true
    }

    /// Record an acknowledgement of the most recent beat
    ///
    /// Returns the round trip, if a beat was outstanding.
    pub fn acknowledge(&self) -> Option<Duration> {
        let mut timing = self.timing.lock();
        let latency = timing.last_beat.take().map(|sent| sent.elapsed());
        if latency.is_some() {
            timing.latency = latency;
        }
        latency
    }

    /// Round trip of the last acknowledged beat
    pub fn latency(&self) -> Option<Duration> {
        self.timing.lock().latency
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().is_some()
    }

    /// Interval of the running timer
    pub fn interval(&self) -> Option<Duration> {
        self.running.lock().as_ref().map(|running| running.interval)
    }
}

impl Drop for HeartbeatController {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.task.abort();
        }
    }
}

use std::time::{Duration, Instant};

use super::clock::Clock;
use super::telemetry_sink::{LiveData, SinkError, TelemetrySink};
use crate::shared::constants::PUBLISH_INTERVAL_SECS;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PublisherConfig {
    /// A publish is attempted only once strictly more than this has passed
    /// since the last successful one.
    pub interval: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs_f64(PUBLISH_INTERVAL_SECS),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Still inside the throttle window; the count was dropped.
    Throttled,
    /// The sink accepted this count.
    Published(u32),
}

/// Rate-limited gauge publisher.
///
/// Only the instantaneous count is ever sent; counts produced inside the
/// throttle window are dropped, never queued. The window restarts at the
/// moment a publish *succeeds*. A failed publish leaves the window where it
/// was, so the next call is immediately eligible again (no backoff).
pub struct ThrottledPublisher {
    sink: Box<dyn TelemetrySink>,
    clock: Box<dyn Clock>,
    config: PublisherConfig,
    last_publish: Option<Instant>,
}

impl ThrottledPublisher {
    pub fn new(sink: Box<dyn TelemetrySink>, clock: Box<dyn Clock>, config: PublisherConfig) -> Self {
        Self {
            sink,
            clock,
            config,
            last_publish: None,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Time of the last successful publish, `None` before the first one.
    pub fn last_publish(&self) -> Option<Instant> {
        self.last_publish
    }

    pub fn is_due(&self) -> bool {
        self.is_due_at(self.clock.now())
    }

    fn is_due_at(&self, now: Instant) -> bool {
        match self.last_publish {
            None => true,
            Some(last) => now.saturating_duration_since(last) > self.config.interval,
        }
    }

    /// Sends `person_count` if the throttle window has elapsed.
    pub fn publish(&mut self, person_count: u32) -> Result<PublishOutcome, SinkError> {
        if !self.is_due_at(self.clock.now()) {
            return Ok(PublishOutcome::Throttled);
        }

        match self.sink.update(&LiveData { person_count }) {
            Ok(()) => {
                self.last_publish = Some(self.clock.now());
                log::info!("Uploaded: {person_count}");
                Ok(PublishOutcome::Published(person_count))
            }
            Err(e) => {
                log::warn!("Upload error: {e}");
                Err(e)
            }
        }
    }
}

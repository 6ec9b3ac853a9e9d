use std::collections::HashMap;
use std::time::Instant;

/// Observer for perception-loop events.
///
/// Decouples the loop from where its diagnostics go (log crate, tests),
/// so callers can watch per-stage cost without touching the loop itself.
pub trait PipelineLogger: Send {
    /// Called once per captured frame.
    fn frame(&mut self, sequence: u64);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. person count).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Logger that discards everything.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame(&mut self, _sequence: u64) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Running aggregate of one stage timing or metric.
///
/// Only count, sum and max are kept, so memory stays constant however
/// long the loop runs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SampleStats {
    count: u64,
    total: f64,
    max: f64,
}

impl SampleStats {
    pub fn record(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.total += value;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Logger for the CLI: aggregates per-stage timings and metrics, reports a
/// heartbeat every `heartbeat_frames` frames and a summary at exit.
pub struct StdoutPipelineLogger {
    heartbeat_frames: u64,
    timings: HashMap<String, SampleStats>,
    metrics: HashMap<String, SampleStats>,
    start_time: Instant,
    frames: u64,
    last_message: Option<String>,
}

impl StdoutPipelineLogger {
    pub fn new(heartbeat_frames: u64) -> Self {
        Self {
            heartbeat_frames: heartbeat_frames.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            last_message: None,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = Vec::new();

        lines.push(format!(
            "Run summary ({frames} frames, {:.1}s total):",
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by(|a, b| a.0.cmp(b.0));
        for (stage, stats) in stages {
            let total_ms = stats.total();
            let pct = if elapsed_ms > 0.0 {
                total_ms / elapsed_ms * 100.0
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:10}: avg {:6.1}ms  max {:6.1}ms  total {total_ms:7.0}ms  ({pct:4.1}%)",
                stats.mean(),
                stats.max()
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.iter().collect();
        metric_names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, stats) in metric_names {
            lines.push(format!(
                "  {name}: avg {:.1}  max {:.0}",
                stats.mean(),
                stats.max()
            ));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&SampleStats> {
        self.timings.get(stage)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&SampleStats> {
        self.metrics.get(name)
    }

    pub fn last_message(&self) -> Option<&str> {
        self.last_message.as_deref()
    }

    /// Whether `frame(sequence)` logs a progress line (at `info`).
    pub fn heartbeat_due(&self, sequence: u64) -> bool {
        sequence > 0 && sequence % self.heartbeat_frames == 0
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(300)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame(&mut self, sequence: u64) {
        self.frames += 1;
        if self.heartbeat_due(sequence) {
            let fps = self.frames as f64 / self.start_time.elapsed().as_secs_f64().max(1e-9);
            log::info!("Processed {sequence} frames ({fps:.1} fps)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        if let Some(stats) = self.timings.get_mut(stage) {
            stats.record(duration_ms);
        } else {
            let mut stats = SampleStats::default();
            stats.record(duration_ms);
            self.timings.insert(stage.to_string(), stats);
        }
    }

    fn metric(&mut self, name: &str, value: f64) {
        if let Some(stats) = self.metrics.get_mut(name) {
            stats.record(value);
        } else {
            let mut stats = SampleStats::default();
            stats.record(value);
            self.metrics.insert(name.to_string(), stats);
        }
    }

    fn info(&mut self, message: &str) {
        self.last_message = Some(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

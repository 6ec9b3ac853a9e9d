use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::capture::domain::frame_source::FrameSource;
use crate::detection::domain::face_counter::FaceCounter;
use crate::display::domain::display_sink::{DisplayEvent, DisplaySink};
use crate::overlay::overlay_renderer::OverlayRenderer;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::telemetry::domain::throttled_publisher::{PublishOutcome, ThrottledPublisher};

/// Why the perception loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoopExit {
    /// Operator pressed the quit key or raised the stop signal.
    Quit,
    /// The frame source reported no more frames.
    EndOfStream,
    /// Capture failed (device disconnected, decode error).
    CaptureFailed(String),
    /// The display surface could not be updated.
    DisplayFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopReport {
    pub exit: LoopExit,
    pub frames: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub detection_failures: u64,
    /// Count from the most recent successfully processed frame.
    pub last_count: Option<u32>,
}

/// The perception loop: capture, count, annotate, publish, display.
///
/// Runs on the calling thread until the operator quits or the frame source
/// stops. A failed publish or detection only affects the current iteration.
/// Source and display are released on every exit path.
pub struct CountPeopleUseCase {
    source: Box<dyn FrameSource>,
    counter: FaceCounter,
    renderer: OverlayRenderer,
    publisher: ThrottledPublisher,
    display: Box<dyn DisplaySink>,
    logger: Box<dyn PipelineLogger>,
    stop: Arc<AtomicBool>,
}

impl CountPeopleUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        counter: FaceCounter,
        renderer: OverlayRenderer,
        publisher: ThrottledPublisher,
        display: Box<dyn DisplaySink>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            counter,
            renderer,
            publisher,
            display,
            logger,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares a flag that ends the loop before the next capture once set,
    /// e.g. from a Ctrl-C handler when no window is polling for keys.
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn execute(&mut self) -> LoopReport {
        let mut report = LoopReport {
            exit: LoopExit::EndOfStream,
            frames: 0,
            published: 0,
            publish_failures: 0,
            detection_failures: 0,
            last_count: None,
        };

        report.exit = loop {
            if let Some(exit) = self.iterate(&mut report) {
                break exit;
            }
        };

        self.source.release();
        self.display.close();
        self.logger.info(&exit_message(&report.exit));
        self.logger.summary();
        report
    }

    /// One pass through the loop; `Some` ends it.
    fn iterate(&mut self, report: &mut LoopReport) -> Option<LoopExit> {
        if self.stop.load(Ordering::SeqCst) {
            return Some(LoopExit::Quit);
        }

        let t0 = Instant::now();
        let mut frame = match self.source.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Some(LoopExit::EndOfStream),
            Err(e) => return Some(LoopExit::CaptureFailed(e.to_string())),
        };
        self.logger.timing("capture", elapsed_ms(t0));
        self.logger.frame(frame.sequence());
        report.frames += 1;

        let t0 = Instant::now();
        let counted = match self.counter.count(&frame) {
            Ok(count) => Some(count),
            Err(e) => {
                log::warn!("Detection failed on frame {}: {e}", frame.sequence());
                report.detection_failures += 1;
                None
            }
        };
        self.logger.timing("detect", elapsed_ms(t0));

        if let Some(count) = counted {
            let person_count = count.person_count();
            report.last_count = Some(person_count);
            self.logger.metric("person_count", person_count as f64);

            let t0 = Instant::now();
            self.renderer.render(&mut frame, &count);
            self.logger.timing("render", elapsed_ms(t0));

            let t0 = Instant::now();
            match self.publisher.publish(person_count) {
                Ok(PublishOutcome::Published(_)) => {
                    report.published += 1;
                    self.logger.timing("publish", elapsed_ms(t0));
                }
                Ok(PublishOutcome::Throttled) => {}
                Err(_) => {
                    report.publish_failures += 1;
                    self.logger.timing("publish", elapsed_ms(t0));
                }
            }
        }

        let t0 = Instant::now();
        let shown = self.display.show(&frame);
        self.logger.timing("display", elapsed_ms(t0));
        match shown {
            Ok(DisplayEvent::Continue) => None,
            Ok(DisplayEvent::Quit) => Some(LoopExit::Quit),
            Err(e) => Some(LoopExit::DisplayFailed(e.to_string())),
        }
    }
}

fn exit_message(exit: &LoopExit) -> String {
    match exit {
        LoopExit::Quit => "Quit requested, stopping".to_string(),
        LoopExit::EndOfStream => "Camera stream ended, stopping".to_string(),
        LoopExit::CaptureFailed(e) => format!("Camera read failed, stopping: {e}"),
        LoopExit::DisplayFailed(e) => format!("Display failed, stopping: {e}"),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Detection;
    use crate::detection::domain::face_counter::DetectorConfig;
    use crate::detection::domain::face_detector::FaceDetector;
    use crate::detection::domain::face_landmarks::{FaceLandmarks, NOSE};
    use crate::overlay::overlay_renderer::OverlayStyle;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::frame::Frame;
    use crate::telemetry::domain::clock::ManualClock;
    use crate::telemetry::domain::telemetry_sink::{LiveData, SinkError, TelemetrySink};
    use crate::telemetry::domain::throttled_publisher::PublisherConfig;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    const W: u32 = 320;
    const H: u32 = 240;

    // --- Stubs ---

    /// Yields `n` blank frames, advancing the clock by `step` before each.
    struct StubSource {
        remaining: u64,
        next: u64,
        clock: ManualClock,
        step: Duration,
        fail_after: Option<u64>,
        released: Arc<AtomicBool>,
    }

    impl FrameSource for StubSource {
        fn capture(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            if self.fail_after == Some(self.next) {
                return Err("device disconnected".into());
            }
            if self.remaining == 0 {
                return Ok(None);
            }
            if self.next > 0 {
                self.clock.advance(self.step);
            }
            self.remaining -= 1;
            let frame = Frame::filled(W, H, [0, 0, 0], self.next);
            self.next += 1;
            Ok(Some(frame))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    /// Returns `counts[sequence]` faces for each frame; `None` fails.
    struct ScriptedDetector {
        counts: Vec<Option<usize>>,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            let Some(n) = self.counts.get(frame.sequence() as usize).copied().flatten() else {
                return Err("model error".into());
            };
            Ok((0..n).map(face).collect())
        }
    }

    fn face(i: usize) -> Detection {
        let x = 0.1 + 0.08 * (i % 10) as f64;
        let y = 0.5 + 0.1 * (i / 10) as f64;
        let mut pts = [None; 5];
        pts[NOSE] = Some((x, y));
        Detection::new([x - 0.02, y - 0.02, x + 0.02, y + 0.02], 0.9, Some(FaceLandmarks::new(pts)))
    }

    #[derive(Clone)]
    struct RecordingSink {
        clock: ManualClock,
        accepted: Arc<Mutex<Vec<(Duration, u32)>>>,
        reject: Arc<Mutex<VecDeque<bool>>>,
    }

    impl TelemetrySink for RecordingSink {
        fn update(&mut self, data: &LiveData) -> Result<(), SinkError> {
            if self.reject.lock().unwrap().pop_front().unwrap_or(false) {
                return Err(SinkError::Rejected {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.accepted
                .lock()
                .unwrap()
                .push((self.clock.elapsed(), data.person_count));
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDisplay {
        shown: Arc<Mutex<Vec<Frame>>>,
        quit_at: Option<u64>,
        closed: Arc<AtomicBool>,
    }

    impl DisplaySink for RecordingDisplay {
        fn show(&mut self, frame: &Frame) -> Result<DisplayEvent, Box<dyn std::error::Error>> {
            self.shown.lock().unwrap().push(frame.clone());
            if self.quit_at == Some(frame.sequence()) {
                return Ok(DisplayEvent::Quit);
            }
            Ok(DisplayEvent::Continue)
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct Harness {
        use_case: CountPeopleUseCase,
        sink: RecordingSink,
        display: RecordingDisplay,
        released: Arc<AtomicBool>,
    }

    fn harness(
        counts: Vec<Option<usize>>,
        step_secs: f64,
        rejects: &[bool],
        quit_at: Option<u64>,
        fail_after: Option<u64>,
    ) -> Harness {
        let clock = ManualClock::new();
        let released = Arc::new(AtomicBool::new(false));
        let source = StubSource {
            remaining: counts.len() as u64,
            next: 0,
            clock: clock.clone(),
            step: Duration::from_secs_f64(step_secs),
            fail_after,
            released: released.clone(),
        };
        let sink = RecordingSink {
            clock: clock.clone(),
            accepted: Arc::new(Mutex::new(Vec::new())),
            reject: Arc::new(Mutex::new(rejects.iter().copied().collect())),
        };
        let display = RecordingDisplay {
            quit_at,
            ..RecordingDisplay::default()
        };
        let use_case = CountPeopleUseCase::new(
            Box::new(source),
            FaceCounter::new(Box::new(ScriptedDetector { counts }), DetectorConfig::default()),
            OverlayRenderer::default(),
            ThrottledPublisher::new(
                Box::new(sink.clone()),
                Box::new(clock),
                PublisherConfig::default(),
            ),
            Box::new(display.clone()),
            Box::new(NullPipelineLogger),
        );
        Harness {
            use_case,
            sink,
            display,
            released,
        }
    }

    fn published(sink: &RecordingSink) -> Vec<(Duration, u32)> {
        sink.accepted.lock().unwrap().clone()
    }

    /// What a frame with `n` faces should look like after annotation.
    fn expected_frame(n: usize) -> Frame {
        let mut counter = FaceCounter::new(
            Box::new(ScriptedDetector {
                counts: vec![Some(n)],
            }),
            DetectorConfig::default(),
        );
        let mut frame = Frame::filled(W, H, [0, 0, 0], 0);
        let count = counter.count(&frame).unwrap();
        OverlayRenderer::new(OverlayStyle::default()).render(&mut frame, &count);
        frame
    }

    // --- Tests ---

    #[test]
    fn test_end_of_stream_releases_resources() {
        let mut h = harness(vec![Some(1), Some(2)], 0.1, &[], None, None);
        let report = h.use_case.execute();

        assert_eq!(report.exit, LoopExit::EndOfStream);
        assert_eq!(report.frames, 2);
        assert_eq!(report.last_count, Some(2));
        assert!(h.released.load(Ordering::SeqCst));
        assert!(h.display.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_quit_key_stops_loop() {
        let mut h = harness(vec![Some(1); 10], 0.1, &[], Some(3), None);
        let report = h.use_case.execute();

        assert_eq!(report.exit, LoopExit::Quit);
        assert_eq!(report.frames, 4);
        assert!(h.released.load(Ordering::SeqCst));
    }

    /// Raises the stop flag when frame `at` is shown, as a signal handler would.
    struct SignalAtDisplay {
        inner: RecordingDisplay,
        stop: Arc<AtomicBool>,
        at: u64,
    }

    impl DisplaySink for SignalAtDisplay {
        fn show(&mut self, frame: &Frame) -> Result<DisplayEvent, Box<dyn std::error::Error>> {
            if frame.sequence() == self.at {
                self.stop.store(true, Ordering::SeqCst);
            }
            self.inner.show(frame)
        }

        fn close(&mut self) {
            self.inner.close();
        }
    }

    #[test]
    fn test_stop_signal_ends_loop_and_releases() {
        let h = harness(vec![Some(1); 10], 0.1, &[], None, None);
        let stop = Arc::new(AtomicBool::new(false));
        let display = h.display.clone();
        let mut use_case = h.use_case;
        use_case.display = Box::new(SignalAtDisplay {
            inner: display.clone(),
            stop: stop.clone(),
            at: 2,
        });
        let mut use_case = use_case.with_stop_signal(stop);

        let report = use_case.execute();

        assert_eq!(report.exit, LoopExit::Quit);
        assert_eq!(report.frames, 3);
        assert!(h.released.load(Ordering::SeqCst));
        assert!(display.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_signal_set_before_start_captures_nothing() {
        let h = harness(vec![Some(1); 3], 0.1, &[], None, None);
        let mut use_case = h.use_case.with_stop_signal(Arc::new(AtomicBool::new(true)));

        let report = use_case.execute();

        assert_eq!(report.exit, LoopExit::Quit);
        assert_eq!(report.frames, 0);
        assert!(h.released.load(Ordering::SeqCst));
        assert!(published(&h.sink).is_empty());
    }

    #[test]
    fn test_capture_failure_ends_loop_gracefully() {
        let mut h = harness(vec![Some(1); 10], 0.1, &[], None, Some(2));
        let report = h.use_case.execute();

        assert_eq!(report.exit, LoopExit::CaptureFailed("device disconnected".into()));
        assert_eq!(report.frames, 2);
        assert!(h.released.load(Ordering::SeqCst));
        assert!(h.display.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_label_always_reflects_current_frame() {
        let counts = [3, 0, 7, 7, 1, 0, 10];
        let mut h = harness(counts.iter().map(|&n| Some(n)).collect(), 0.5, &[], None, None);
        h.use_case.execute();

        let shown = h.display.shown.lock().unwrap();
        assert_eq!(shown.len(), counts.len());
        for (frame, &n) in shown.iter().zip(counts.iter()) {
            assert_eq!(frame.data(), expected_frame(n).data(), "frame {}", frame.sequence());
        }
    }

    #[test]
    fn test_zero_faces_published_as_zero() {
        let mut h = harness(vec![Some(0)], 0.1, &[], None, None);
        h.use_case.execute();
        assert_eq!(published(&h.sink), vec![(Duration::ZERO, 0)]);
    }

    #[test]
    fn test_eleven_faces_published_as_ten() {
        let mut h = harness(vec![Some(11)], 0.1, &[], None, None);
        let report = h.use_case.execute();
        assert_eq!(published(&h.sink), vec![(Duration::ZERO, 10)]);
        assert_eq!(report.last_count, Some(10));
    }

    #[test]
    fn test_frames_one_second_apart_publish_every_third() {
        // t = 0, 1, 2, 3, 4, 5, 6
        let mut h = harness(vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(6), Some(7)], 1.0, &[], None, None);
        let report = h.use_case.execute();

        let sent: Vec<(u64, u32)> = published(&h.sink).iter().map(|(t, n)| (t.as_secs(), *n)).collect();
        assert_eq!(sent, vec![(0, 1), (3, 4), (6, 7)]);
        assert_eq!(report.published, 3);
    }

    #[test]
    fn test_failed_publish_retried_next_frame() {
        let mut h = harness(vec![Some(2), Some(3), Some(4)], 0.1, &[true], None, None);
        let report = h.use_case.execute();

        assert_eq!(report.publish_failures, 1);
        assert_eq!(report.published, 1);
        let sent: Vec<u32> = published(&h.sink).iter().map(|(_, n)| *n).collect();
        assert_eq!(sent, vec![3]);
    }

    #[test]
    fn test_detection_failure_skips_publish_but_keeps_looping() {
        let mut h = harness(vec![None, Some(5)], 0.1, &[], None, None);
        let report = h.use_case.execute();

        assert_eq!(report.detection_failures, 1);
        assert_eq!(report.frames, 2);
        assert_eq!(published(&h.sink), vec![(Duration::from_millis(100), 5)]);

        let shown = h.display.shown.lock().unwrap();
        assert!(shown[0].data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_count_never_carried_over() {
        let mut h = harness(vec![Some(4), Some(0)], 3.0, &[], None, None);
        let report = h.use_case.execute();

        assert_eq!(report.last_count, Some(0));
        let sent: Vec<u32> = published(&h.sink).iter().map(|(_, n)| *n).collect();
        assert_eq!(sent, vec![4, 0]);
    }

    #[test]
    fn test_exit_messages() {
        assert!(exit_message(&LoopExit::Quit).contains("Quit"));
        assert!(exit_message(&LoopExit::CaptureFailed("eof".into())).contains("eof"));
        assert!(exit_message(&LoopExit::DisplayFailed("gone".into())).contains("gone"));
    }
}

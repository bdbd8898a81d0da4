//! The inspection loop.
//!
//! Orchestrates the acquisition-inference-decision-dispatch cycle on a
//! single thread of control:
//!
//! 1. Pull a frame from the source; end-of-stream or a capture failure is
//!    terminal.
//! 2. Classify the frame. Classification errors (including label lookup
//!    misses) are isolated to the frame: logged, no dispatch, continue.
//! 3. If any detection exists, take the primary one (first in model
//!    order), resolve its label, and dispatch a classification event.
//!    A failed dispatch is logged and discarded.
//! 4. Sleep the configured interval to bound the iteration rate.
//! 5. Check the cancellation flag; stop gracefully if set.
//!
//! The loop also emits a periodic source-health line at info level so an
//! operator tailing the log can see whether the camera is still producing.
//!
//! Only startup failures escalate out of the process; once running, the
//! loop never stops because of a single bad frame or failed send. The
//! frame source handle is released exactly once on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::classify::{primary_detection, ClassifierBackend, LabelTable};
use crate::dispatch::{ClassificationEvent, EventDispatcher};
use crate::ingest::{Capture, FrameSource};

/// When to dispatch a qualifying classification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchPolicy {
    /// Dispatch on every frame with a detection (the baseline behavior).
    #[default]
    EveryFrame,
    /// Dispatch only when the resolved label differs from the previously
    /// dispatched one. Opt-in; suppressed frames still count as classified.
    OnChange,
}

/// Why the loop stopped.
#[derive(Debug)]
pub enum StopReason {
    /// The source signalled that no further frames will be produced.
    EndOfStream,
    /// A mid-stream capture failure, treated as stream termination.
    CaptureFailed(anyhow::Error),
    /// The operator requested shutdown.
    Cancelled,
}

/// Counters accumulated across one run.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopStats {
    pub frames: u64,
    pub classified: u64,
    pub dispatched: u64,
    pub dispatch_failures: u64,
    pub classify_failures: u64,
    pub health_reports: u64,
}

/// Loop settings.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Identifier stamped on every dispatched event.
    pub device_id: String,
    /// Fixed inter-iteration delay bounding the capture/inference rate.
    pub interval: Duration,
    pub policy: DispatchPolicy,
    /// Spacing between source-health log lines.
    pub health_interval: Duration,
}

impl LoopConfig {
    pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);
}

/// The acquisition-inference-decision-dispatch loop.
///
/// All collaborators are injected at construction; the loop owns the
/// source and classifier exclusively for its lifetime.
pub struct InspectionLoop<S, C, D> {
    source: S,
    classifier: C,
    labels: LabelTable,
    dispatcher: D,
    config: LoopConfig,
    stats: LoopStats,
    last_dispatched_label: Option<String>,
}

impl<S, C, D> InspectionLoop<S, C, D>
where
    S: FrameSource,
    C: ClassifierBackend,
    D: EventDispatcher,
{
    pub fn new(source: S, classifier: C, labels: LabelTable, dispatcher: D, config: LoopConfig) -> Self {
        Self {
            source,
            classifier,
            labels,
            dispatcher,
            config,
            stats: LoopStats::default(),
            last_dispatched_label: None,
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Run until the stream ends, capture fails, or `cancel` is set.
    ///
    /// Consumes the loop: `Stopped` is terminal and the loop does not
    /// restart itself. The source is closed before returning, on every
    /// path.
    pub fn run(mut self, cancel: &AtomicBool) -> (StopReason, LoopStats) {
        let mut last_health_log = Instant::now();
        let reason = loop {
            let frame = match self.source.next_frame() {
                Ok(Capture::Frame(frame)) => frame,
                Ok(Capture::EndOfStream) => break StopReason::EndOfStream,
                Err(err) => break StopReason::CaptureFailed(err),
            };
            self.stats.frames += 1;

            self.process_frame(&frame);

            if last_health_log.elapsed() >= self.config.health_interval {
                log::info!(
                    "camera health={} frames={} dispatched={}",
                    self.source.is_healthy(),
                    self.source.frames_captured(),
                    self.stats.dispatched
                );
                self.stats.health_reports += 1;
                last_health_log = Instant::now();
            }

            // Pace the loop so inference and the network path are not
            // saturated; this is also the loop's only suspension point.
            std::thread::sleep(self.config.interval);

            if cancel.load(Ordering::SeqCst) {
                break StopReason::Cancelled;
            }
        };

        self.source.close();
        (reason, self.stats)
    }

    /// Classify one frame and dispatch its primary detection, if any.
    /// Errors here are isolated to this frame.
    fn process_frame(&mut self, frame: &crate::frame::Frame) {
        let detections =
            match self
                .classifier
                .classify(frame.pixels(), frame.width, frame.height)
            {
                Ok(detections) => detections,
                Err(err) => {
                    self.stats.classify_failures += 1;
                    log::warn!("classification failed, skipping frame: {:#}", err);
                    return;
                }
            };

        let Some(primary) = primary_detection(&detections) else {
            // Nothing to classify yet; a valid, silent outcome.
            return;
        };

        let label = match self.labels.resolve(primary.class_id) {
            Ok(label) => label.to_string(),
            Err(err) => {
                self.stats.classify_failures += 1;
                log::warn!("label lookup failed, skipping frame: {:#}", err);
                return;
            }
        };
        self.stats.classified += 1;
        log::info!(
            "classified: {} (confidence: {:.2})",
            label,
            primary.confidence
        );

        if self.config.policy == DispatchPolicy::OnChange
            && self.last_dispatched_label.as_deref() == Some(label.as_str())
        {
            log::debug!("classification unchanged, dispatch suppressed");
            return;
        }

        let event = ClassificationEvent {
            classification: label.clone(),
            confidence: primary.confidence,
            device_id: self.config.device_id.clone(),
        };
        let outcome = self.dispatcher.send(&event);
        if outcome.success {
            self.stats.dispatched += 1;
            self.last_dispatched_label = Some(label);
            log::info!("dispatched: {}", event.classification);
        } else {
            self.stats.dispatch_failures += 1;
            log::warn!(
                "dispatch failed (status: {:?}): {}",
                outcome.status,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

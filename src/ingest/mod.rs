//! Frame ingestion sources.
//!
//! This module provides the sources the inspection loop pulls frames from:
//! - Local cameras (`CameraSource`): V4L2 devices addressed by index or
//!   path, with a synthetic `stub://` backend for development machines
//! - Scripted sources (`StubSource`) for tests
//!
//! All sources implement [`FrameSource`]. A source owns its device handle
//! exclusively for the lifetime of the loop; the loop calls [`close`] on
//! every exit path and `close` must be idempotent.
//!
//! Sources perform no retry logic: a failed read is reported to the caller,
//! which treats it as stream termination.
//!
//! [`close`]: FrameSource::close

pub mod camera;
pub mod stub;

pub use camera::{CameraConfig, CameraSource};
pub use stub::{SourceStep, StubSource};

use anyhow::Result;

use crate::frame::Frame;

/// Outcome of a capture attempt that did not fail.
///
/// End-of-stream is a normal, terminal signal (device disconnected, stream
/// closed) and is kept distinct from a capture error.
#[derive(Debug)]
pub enum Capture {
    Frame(Frame),
    EndOfStream,
}

/// A camera or camera-like frame producer.
pub trait FrameSource {
    /// Acquire the capture device. Failure here is a startup-level error,
    /// distinct from a mid-stream capture failure.
    fn connect(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    ///
    /// Returns `Capture::EndOfStream` when the underlying stream ends and
    /// `Err` when a mid-stream read fails. Both are terminal for the loop.
    fn next_frame(&mut self) -> Result<Capture>;

    /// Release the device. Idempotent; called on every loop exit path.
    fn close(&mut self);

    /// Whether the source is currently producing frames at a healthy rate.
    fn is_healthy(&self) -> bool;

    /// Frames captured so far.
    fn frames_captured(&self) -> u64;
}

//! Scripted frame source for tests.
//!
//! `StubSource` replays a fixed sequence of capture outcomes (frames,
//! a mid-stream failure, end-of-stream) and counts `close()` calls so
//! tests can assert the loop releases its handle exactly once.

use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::frame::Frame;
use crate::ingest::{Capture, FrameSource};

/// One scripted capture outcome.
pub enum SourceStep {
    Frame(Frame),
    /// A mid-stream capture failure with the given message.
    Fail(String),
}

/// Frame source replaying a scripted sequence, then signalling end-of-stream.
pub struct StubSource {
    steps: VecDeque<SourceStep>,
    connected: bool,
    frame_count: u64,
    close_count: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn new(steps: Vec<SourceStep>) -> Self {
        Self {
            steps: steps.into(),
            connected: false,
            frame_count: 0,
            close_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Source yielding `count` copies of `frame`, then end-of-stream.
    pub fn repeating(frame: Frame, count: usize) -> Self {
        Self::new(
            std::iter::repeat_with(|| SourceStep::Frame(frame.clone()))
                .take(count)
                .collect(),
        )
    }

    /// Shared counter of `close()` calls, for release assertions.
    pub fn close_count(&self) -> Arc<AtomicUsize> {
        self.close_count.clone()
    }
}

impl FrameSource for StubSource {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Capture> {
        if !self.connected {
            return Err(anyhow!("stub source not connected"));
        }
        match self.steps.pop_front() {
            Some(SourceStep::Frame(frame)) => {
                self.frame_count += 1;
                Ok(Capture::Frame(frame))
            }
            Some(SourceStep::Fail(message)) => Err(anyhow!(message)),
            None => Ok(Capture::EndOfStream),
        }
    }

    fn close(&mut self) {
        self.connected = false;
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }

    fn frames_captured(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::rgb(vec![0u8; 4 * 4 * 3], 4, 4).expect("frame")
    }

    #[test]
    fn stub_source_replays_then_ends() -> Result<()> {
        let mut source = StubSource::repeating(frame(), 2);
        source.connect()?;

        assert!(matches!(source.next_frame()?, Capture::Frame(_)));
        assert!(matches!(source.next_frame()?, Capture::Frame(_)));
        assert!(matches!(source.next_frame()?, Capture::EndOfStream));
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn stub_source_counts_closes() {
        let mut source = StubSource::new(Vec::new());
        let closes = source.close_count();
        source.close();
        source.close();
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn stub_source_injects_failures() -> Result<()> {
        let mut source = StubSource::new(vec![SourceStep::Fail("io error".to_string())]);
        source.connect()?;
        assert!(source.next_frame().is_err());
        Ok(())
    }
}

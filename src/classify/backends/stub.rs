use anyhow::Result;
use std::collections::VecDeque;

use crate::classify::backend::ClassifierBackend;
use crate::classify::result::Detection;

/// Stub backend for testing. Replays scripted per-frame detection results.
///
/// Once the script is exhausted, every further frame classifies to nothing.
pub struct StubBackend {
    script: VecDeque<Vec<Detection>>,
}

impl StubBackend {
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
        }
    }

    /// Backend that never detects anything.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl ClassifierBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn classify(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}

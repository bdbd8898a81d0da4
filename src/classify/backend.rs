use anyhow::Result;

use crate::classify::result::Detection;

/// Classifier backend trait.
///
/// Implementations wrap a loaded model and turn one frame into zero or
/// more detections, preserving the model's native output order. An empty
/// result means "nothing to classify yet" and is not an error.
///
/// `classify` must be pure with respect to external state: no network or
/// disk I/O, and the pixel slice is read-only and ephemeral.
pub trait ClassifierBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run classification on a frame.
    fn classify(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl ClassifierBackend for Box<dyn ClassifierBackend> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn classify(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        (**self).classify(pixels, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}

#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::classify::backend::ClassifierBackend;
use crate::classify::result::Detection;

/// Tract-based backend for ONNX inference.
///
/// Loads a local model file once and performs inference on RGB frames.
/// Expects an end-to-end detection export (NMS baked in) whose output rows
/// are `[x, y, w, h, confidence, class_id]`; rows are reported in the
/// model's native order. No network I/O, no disk writes after load.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
    width: u32,
    height: u32,
    confidence_threshold: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            width,
            height,
            confidence_threshold: 0.25,
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        if width != self.width || height != self.height {
            return Err(anyhow!(
                "frame size {}x{} does not match model input {}x{}",
                width,
                height,
                self.width,
                self.height
            ));
        }

        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;

        if pixels.len() != expected_len {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        let width = width as usize;
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, height as usize, width),
            |(_, channel, y, x)| {
                let idx = (y * width + x) * 3 + channel;
                pixels[idx] as f32 / 255.0
            },
        );

        Ok(input.into_tensor())
    }

    fn decode_detections(&self, outputs: TVec<TValue>) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;

        let shape = view.shape();
        let cols = *shape
            .last()
            .ok_or_else(|| anyhow!("model output has no dimensions"))?;
        if cols < 6 {
            return Err(anyhow!(
                "model output rows have {} columns, expected at least 6 (x, y, w, h, conf, class)",
                cols
            ));
        }

        let data = view
            .as_slice()
            .ok_or_else(|| anyhow!("model output tensor not contiguous"))?;

        let mut detections = Vec::new();
        for row in data.chunks_exact(cols) {
            let confidence = row[4];
            if !confidence.is_finite() || confidence < self.confidence_threshold {
                continue;
            }
            let class = row[5];
            if !class.is_finite() || class < 0.0 {
                return Err(anyhow!("model emitted invalid class value {}", class));
            }
            detections.push(Detection {
                class_id: class as u32,
                confidence: confidence.clamp(0.0, 1.0),
            });
        }
        Ok(detections)
    }
}

impl ClassifierBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn classify(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_detections(outputs)
    }

    fn warm_up(&mut self) -> Result<()> {
        let pixels = vec![0u8; (self.width * self.height * 3) as usize];
        let input = self.build_input(&pixels, self.width, self.height)?;
        self.model
            .run(tvec!(input.into()))
            .context("ONNX warm-up inference failed")?;
        Ok(())
    }
}

//! Local camera frame source.
//!
//! `CameraSource` captures frames from a local V4L2 device. Devices are
//! addressed by numeric index (`"0"` becomes `/dev/video0`) or by an
//! explicit device path. `stub://` addresses select a synthetic backend
//! that generates test-pattern frames, so the daemon runs on machines
//! without a camera.
//!
//! Real capture requires the `capture-v4l2` feature.

use anyhow::{anyhow, Result};
#[cfg(feature = "capture-v4l2")]
use std::time::{Duration, Instant};

#[cfg(feature = "capture-v4l2")]
use anyhow::Context;
#[cfg(feature = "capture-v4l2")]
use ouroboros::self_referencing;

use crate::frame::Frame;
use crate::ingest::{Capture, FrameSource};

/// Configuration for a camera source.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device address: a numeric index ("0", "1"), a device path
    /// ("/dev/video0"), or "stub://<name>" for the synthetic backend.
    pub device: String,
    /// Target frame rate hint for the device. 0 leaves the device default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Resolve a device address to a V4L2 device path.
///
/// Bare integers map to `/dev/video<n>`; anything else is used verbatim.
pub fn device_path(device: &str) -> String {
    match device.trim().parse::<u32>() {
        Ok(index) => format!("/dev/video{}", index),
        Err(_) => device.to_string(),
    }
}

/// Local camera frame source.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "capture-v4l2")]
    Device(DeviceCameraSource),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(config)),
            });
        }
        #[cfg(feature = "capture-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(DeviceCameraSource::new(config)?),
            })
        }
        #[cfg(not(feature = "capture-v4l2"))]
        {
            Err(anyhow!(
                "camera device {} requires the capture-v4l2 feature (use stub:// for synthetic frames)",
                config.device
            ))
        }
    }
}

impl FrameSource for CameraSource {
    fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.connect(),
        }
    }

    fn next_frame(&mut self) -> Result<Capture> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.next_frame(),
        }
    }

    fn close(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.close(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.close(),
        }
    }

    fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.is_healthy(),
        }
    }

    fn frames_captured(&self) -> u64 {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.frame_count,
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::Device(source) => source.frame_count,
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for camera-less machines
// ----------------------------------------------------------------------------

struct SyntheticCameraSource {
    config: CameraConfig,
    connected: bool,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticCameraSource {
    fn new(config: CameraConfig) -> Self {
        Self {
            config,
            connected: false,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!(
            "CameraSource: connected to {} (synthetic)",
            self.config.device
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Capture> {
        if !self.connected {
            return Err(anyhow!("camera not connected; call connect() first"));
        }
        self.frame_count += 1;
        let pixels = self.generate_synthetic_pixels();
        let frame = Frame::rgb(pixels, self.config.width, self.config.height)?;
        Ok(Capture::Frame(frame))
    }

    /// Generate synthetic pixel data.
    ///
    /// Simulates a conveyor scene: mostly static background with the
    /// pattern shifting every 50 frames (a new item entering the belt).
    fn generate_synthetic_pixels(&mut self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }

    fn close(&mut self) {
        self.connected = false;
    }

    fn is_healthy(&self) -> bool {
        self.connected
    }
}

// ----------------------------------------------------------------------------
// Production V4L2 source using libv4l
// ----------------------------------------------------------------------------

#[cfg(feature = "capture-v4l2")]
struct DeviceCameraSource {
    config: CameraConfig,
    path: String,
    state: Option<DeviceCameraState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[cfg(feature = "capture-v4l2")]
#[self_referencing]
struct DeviceCameraState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "capture-v4l2")]
impl DeviceCameraSource {
    fn new(config: CameraConfig) -> Result<Self> {
        let path = device_path(&config.device);
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            path,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.path)
            .with_context(|| format!("open camera device {}", self.path))?;
        let mut format = device.format().context("read camera format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("CameraSource: failed to set format on {}: {}", self.path, err);
                device
                    .format()
                    .context("read camera format after set failure")?
            }
        };

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("CameraSource: failed to set fps on {}: {}", self.path, err);
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceCameraStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create camera buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "CameraSource: connected to {} ({}x{})",
            self.path,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Capture> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("camera not connected")?;
        let (buf, _meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|err| {
                self.last_error = Some(err.to_string());
                anyhow::Error::new(err).context("capture camera frame")
            })?;

        // A zero-length buffer means the device stopped producing data.
        if buf.is_empty() {
            return Ok(Capture::EndOfStream);
        }

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());

        let frame = Frame::rgb(buf.to_vec(), self.active_width, self.active_height)?;
        Ok(Capture::Frame(frame))
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::info!("CameraSource: released {}", self.path);
        }
    }

    fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://bench".to_string(),
            target_fps: 10,
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn camera_source_produces_frames() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;

        match source.next_frame()? {
            Capture::Frame(frame) => {
                assert_eq!(frame.width, 64);
                assert_eq!(frame.height, 48);
                assert_eq!(frame.channels, 3);
            }
            Capture::EndOfStream => panic!("synthetic source must not end"),
        }
        assert_eq!(source.frames_captured(), 1);
        Ok(())
    }

    #[test]
    fn camera_source_requires_connect() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        assert!(source.next_frame().is_err());
        Ok(())
    }

    #[test]
    fn camera_close_is_idempotent() -> Result<()> {
        let mut source = CameraSource::new(stub_config())?;
        source.connect()?;
        source.close();
        source.close();
        assert!(!source.is_healthy());
        Ok(())
    }

    #[test]
    fn numeric_devices_resolve_to_video_nodes() {
        assert_eq!(device_path("0"), "/dev/video0");
        assert_eq!(device_path(" 2 "), "/dev/video2");
        assert_eq!(device_path("/dev/video5"), "/dev/video5");
    }
}

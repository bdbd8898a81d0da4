use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_ENDPOINT_URL: &str = "http://127.0.0.1:8799/classify";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_DEVICE_ID: &str = "Laptop_Faja_Principal";
const DEFAULT_CAMERA_DEVICE: &str = "0";
const DEFAULT_CAMERA_FPS: u32 = 10;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_MODEL_PATH: &str = "best.onnx";
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_INTERVAL_MS: u64 = 500;

#[derive(Debug, Deserialize, Default)]
struct InspectdConfigFile {
    device_id: Option<String>,
    endpoint: Option<EndpointConfigFile>,
    camera: Option<CameraConfigFile>,
    model: Option<ModelConfigFile>,
    #[serde(rename = "loop")]
    loop_cfg: Option<LoopConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct EndpointConfigFile {
    url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<String>,
    labels: Option<Vec<String>>,
    confidence_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct LoopConfigFile {
    interval_ms: Option<u64>,
    dispatch_on_change: Option<bool>,
}

/// Daemon configuration: JSON file (named by `INSPECT_CONFIG`) plus env
/// overrides plus defaults, validated before use.
#[derive(Debug, Clone)]
pub struct InspectdConfig {
    pub device_id: String,
    pub endpoint: EndpointSettings,
    pub camera: CameraSettings,
    pub model: ModelSettings,
    pub interval: Duration,
    pub dispatch_on_change: bool,
}

#[derive(Debug, Clone)]
pub struct EndpointSettings {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub device: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub path: String,
    /// Class labels in class-id order.
    pub labels: Vec<String>,
    pub confidence_threshold: f32,
}

impl InspectdConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("INSPECT_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: InspectdConfigFile) -> Self {
        let device_id = file
            .device_id
            .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string());
        let endpoint = EndpointSettings {
            url: file
                .endpoint
                .as_ref()
                .and_then(|endpoint| endpoint.url.clone())
                .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string()),
            timeout: Duration::from_secs(
                file.endpoint
                    .as_ref()
                    .and_then(|endpoint| endpoint.timeout_secs)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };
        let camera = CameraSettings {
            device: file
                .camera
                .as_ref()
                .and_then(|camera| camera.device.clone())
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            target_fps: file
                .camera
                .as_ref()
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
        };
        let model = ModelSettings {
            path: file
                .model
                .as_ref()
                .and_then(|model| model.path.clone())
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string()),
            labels: file
                .model
                .as_ref()
                .and_then(|model| model.labels.clone())
                .unwrap_or_else(|| vec!["Mal Estado".to_string(), "Buen Estado".to_string()]),
            confidence_threshold: file
                .model
                .and_then(|model| model.confidence_threshold)
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
        };
        let interval = Duration::from_millis(
            file.loop_cfg
                .as_ref()
                .and_then(|l| l.interval_ms)
                .unwrap_or(DEFAULT_INTERVAL_MS),
        );
        let dispatch_on_change = file
            .loop_cfg
            .and_then(|l| l.dispatch_on_change)
            .unwrap_or(false);
        Self {
            device_id,
            endpoint,
            camera,
            model,
            interval,
            dispatch_on_change,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("INSPECT_ENDPOINT_URL") {
            if !url.trim().is_empty() {
                self.endpoint.url = url;
            }
        }
        if let Ok(device_id) = std::env::var("INSPECT_DEVICE_ID") {
            if !device_id.trim().is_empty() {
                self.device_id = device_id;
            }
        }
        if let Ok(device) = std::env::var("INSPECT_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(path) = std::env::var("INSPECT_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = path;
            }
        }
        if let Ok(interval) = std::env::var("INSPECT_INTERVAL_MS") {
            let millis: u64 = interval
                .parse()
                .map_err(|_| anyhow!("INSPECT_INTERVAL_MS must be an integer number of milliseconds"))?;
            self.interval = Duration::from_millis(millis);
        }
        Ok(())
    }

    /// Check the configuration for values the daemon cannot run with.
    ///
    /// Called by [`load`](Self::load) and again by the daemon after CLI
    /// overrides are applied, so an override cannot smuggle in an invalid
    /// value.
    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(anyhow!("device_id must not be empty"));
        }
        if !self.endpoint.url.starts_with("http://") && !self.endpoint.url.starts_with("https://") {
            return Err(anyhow!(
                "endpoint url must be http(s): {}",
                self.endpoint.url
            ));
        }
        if self.endpoint.timeout.as_secs() == 0 {
            return Err(anyhow!("endpoint timeout must be greater than zero"));
        }
        if self.model.labels.is_empty() {
            return Err(anyhow!("model labels must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.model.confidence_threshold) {
            return Err(anyhow!("confidence threshold must be within 0..=1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!(
                "camera resolution must be non-zero, got {}x{}",
                self.camera.width,
                self.camera.height
            ));
        }
        if self.interval.is_zero() {
            return Err(anyhow!("loop interval must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<InspectdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

//! inspectd - conveyor belt inspection daemon
//!
//! This daemon:
//! 1. Opens the configured camera device
//! 2. Loads the classification model once at startup
//! 3. Runs the inspection loop: capture -> classify -> dispatch
//! 4. Relays each classification to the ingestion endpoint over HTTP
//! 5. Stops gracefully on Ctrl-C or when the camera stream ends
//!
//! Startup failures (camera unavailable, model load failure, bad config)
//! exit non-zero after a diagnostic. Everything after startup is
//! best-effort: bad frames and failed sends are logged and skipped.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use beltsight::{
    CameraConfig, CameraSource, ClassifierBackend, DispatchPolicy, FrameSource, HttpDispatcher,
    InspectdConfig,
    InspectionLoop, LabelTable, LoopConfig, StopReason, StubBackend,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Real-time conveyor belt quality inspection")]
struct Args {
    /// Camera device: numeric index ("0"), device path, or stub:// for
    /// synthetic frames.
    #[arg(long, env = "INSPECT_CAMERA_DEVICE")]
    camera: Option<String>,

    /// Path to the pretrained ONNX model (stub:// selects the scripted
    /// no-op backend for bench runs without the backend-tract feature).
    #[arg(long, env = "INSPECT_MODEL_PATH")]
    model: Option<String>,

    /// Ingestion endpoint URL for classification events.
    #[arg(long, env = "INSPECT_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Device identifier stamped on every event.
    #[arg(long, env = "INSPECT_DEVICE_ID")]
    device_id: Option<String>,

    /// Inter-iteration delay in milliseconds.
    #[arg(long, env = "INSPECT_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Dispatch only when the classification label changes, instead of on
    /// every qualifying frame.
    #[arg(long, env = "INSPECT_ON_CHANGE")]
    on_change: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = InspectdConfig::load().context("load configuration")?;
    apply_args(&mut cfg, &args);
    // Overrides go through the same checks as file and env values.
    cfg.validate().context("validate configuration")?;

    // Model load failure is fatal: the process cannot proceed without a
    // classifier.
    let mut classifier = build_classifier(&cfg)?;
    classifier.warm_up().context("warm up classifier")?;

    let mut source = CameraSource::new(CameraConfig {
        device: cfg.camera.device.clone(),
        target_fps: cfg.camera.target_fps,
        width: cfg.camera.width,
        height: cfg.camera.height,
    })
    .context("configure camera")?;
    source
        .connect()
        .with_context(|| format!("open camera device {}", cfg.camera.device))?;

    let dispatcher = HttpDispatcher::new(&cfg.endpoint.url, cfg.endpoint.timeout)
        .context("configure dispatcher")?;

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();
    ctrlc::set_handler(move || {
        cancel_flag.store(true, Ordering::SeqCst);
    })
    .context("set Ctrl-C handler")?;

    let labels = LabelTable::from_names(cfg.model.labels.clone());
    let policy = if args.on_change || cfg.dispatch_on_change {
        DispatchPolicy::OnChange
    } else {
        DispatchPolicy::EveryFrame
    };

    log::info!(
        "inspectd running. camera={} endpoint={} device_id={} interval={}ms policy={:?}",
        cfg.camera.device,
        cfg.endpoint.url,
        cfg.device_id,
        cfg.interval.as_millis(),
        policy
    );
    log::info!("press Ctrl-C to stop");

    let inspection = InspectionLoop::new(
        source,
        classifier,
        labels,
        dispatcher,
        LoopConfig {
            device_id: cfg.device_id.clone(),
            interval: cfg.interval,
            policy,
            health_interval: LoopConfig::DEFAULT_HEALTH_INTERVAL,
        },
    );

    let (reason, stats) = inspection.run(&cancel);
    match reason {
        StopReason::Cancelled => log::info!("stopped: operator cancellation"),
        StopReason::EndOfStream => log::info!("stopped: camera stream ended"),
        StopReason::CaptureFailed(err) => {
            // Treated as stream termination; the loop already released the
            // camera, so this is a graceful stop.
            log::error!("stopped: capture failed: {:#}", err);
        }
    }
    log::info!(
        "session: {} frames, {} classified, {} dispatched, {} dispatch failures, {} skipped frames",
        stats.frames,
        stats.classified,
        stats.dispatched,
        stats.dispatch_failures,
        stats.classify_failures
    );
    Ok(())
}

fn apply_args(cfg: &mut InspectdConfig, args: &Args) {
    if let Some(camera) = &args.camera {
        cfg.camera.device = camera.clone();
    }
    if let Some(model) = &args.model {
        cfg.model.path = model.clone();
    }
    if let Some(url) = &args.endpoint_url {
        cfg.endpoint.url = url.clone();
    }
    if let Some(device_id) = &args.device_id {
        cfg.device_id = device_id.clone();
    }
    if let Some(interval_ms) = args.interval_ms {
        cfg.interval = Duration::from_millis(interval_ms);
    }
}

fn build_classifier(cfg: &InspectdConfig) -> Result<Box<dyn ClassifierBackend>> {
    if cfg.model.path.starts_with("stub://") {
        log::warn!("using stub classifier ({}); no real inference", cfg.model.path);
        return Ok(Box::new(StubBackend::empty()));
    }
    #[cfg(feature = "backend-tract")]
    {
        let backend = beltsight::TractBackend::new(&cfg.model.path, cfg.camera.width, cfg.camera.height)
            .with_context(|| format!("load model {}", cfg.model.path))?
            .with_threshold(cfg.model.confidence_threshold);
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(anyhow::anyhow!(
            "model {} requires the backend-tract feature (use stub:// for the scripted backend)",
            cfg.model.path
        ))
    }
}

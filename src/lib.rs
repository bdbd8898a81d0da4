//! beltsight
//!
//! Real-time conveyor belt quality inspection: sample frames from a
//! camera, classify each frame into a quality category with a pretrained
//! detection model, and relay every classification to a remote ingestion
//! endpoint over HTTP.
//!
//! # Architecture
//!
//! The core is the acquisition-inference-decision-dispatch loop
//! ([`inspect::InspectionLoop`]); everything around it is a replaceable
//! collaborator injected at startup:
//!
//! - `frame`: the transient image buffer type
//! - `ingest`: frame sources (V4L2 cameras, synthetic, scripted stubs)
//! - `classify`: classifier backends (ONNX via tract, scripted stubs) and
//!   class-id label resolution
//! - `dispatch`: fire-and-forget HTTP delivery of classification events
//! - `config`: daemon configuration (file + env + defaults)
//!
//! # Failure policy
//!
//! Only startup failures (model load, device open, bad config) abort the
//! process. Once running, every other failure is contained within one loop
//! iteration and surfaced via the log: a bad frame is skipped, a failed
//! send is discarded. Local availability matters more than any individual
//! event's delivery.

pub mod classify;
pub mod config;
pub mod dispatch;
pub mod frame;
pub mod ingest;
pub mod inspect;

pub use classify::{primary_detection, ClassifierBackend, Detection, LabelTable, StubBackend};
#[cfg(feature = "backend-tract")]
pub use classify::TractBackend;
pub use config::InspectdConfig;
pub use dispatch::{ClassificationEvent, DispatchOutcome, EventDispatcher, HttpDispatcher, MemoryDispatcher};
pub use frame::Frame;
pub use ingest::{CameraConfig, CameraSource, Capture, FrameSource, SourceStep, StubSource};
pub use inspect::{DispatchPolicy, InspectionLoop, LoopConfig, LoopStats, StopReason};

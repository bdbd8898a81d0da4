//! Frame classification.
//!
//! Wraps a pretrained detection/classification model behind
//! [`ClassifierBackend`]. Backends are synchronous and perform no network
//! or disk I/O during `classify`; model weights are loaded once at startup
//! and never mutated afterwards.

mod backend;
mod backends;
mod labels;
mod result;

pub use backend::ClassifierBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use labels::LabelTable;
pub use result::{primary_detection, Detection};

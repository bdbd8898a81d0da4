//! Classification event dispatch.
//!
//! Formats one classification result as a JSON message and delivers it to
//! the remote ingestion endpoint with a single bounded-timeout POST. This
//! is fire-and-forget telemetry, not a reliable-delivery channel: there is
//! no retry, no queueing, no backoff, and a lost message on network failure
//! is an accepted property. A failed send surfaces only through the
//! returned [`DispatchOutcome`], which callers consume for logging.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// The unit sent to the remote endpoint. Constructed fresh per qualifying
/// frame; no identity beyond its content; never persisted locally.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassificationEvent {
    pub classification: String,
    pub confidence: f32,
    pub device_id: String,
}

/// Result of one send attempt. Consumed only for logging; never causes
/// state mutation elsewhere.
#[derive(Clone, Debug)]
pub struct DispatchOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl DispatchOutcome {
    fn ok(status: u16) -> Self {
        Self {
            success: true,
            status: Some(status),
            error: None,
        }
    }

    fn status_failure(status: u16, body: String) -> Self {
        Self {
            success: false,
            status: Some(status),
            error: Some(body),
        }
    }

    fn transport_failure(error: String) -> Self {
        Self {
            success: false,
            status: None,
            error: Some(error),
        }
    }
}

/// Delivers classification events to a remote collector.
pub trait EventDispatcher {
    /// Attempt one delivery. Must not panic and must not block beyond the
    /// dispatcher's configured timeout.
    fn send(&self, event: &ClassificationEvent) -> DispatchOutcome;
}

impl<D: EventDispatcher + ?Sized> EventDispatcher for std::sync::Arc<D> {
    fn send(&self, event: &ClassificationEvent) -> DispatchOutcome {
        (**self).send(event)
    }
}

/// HTTP dispatcher: `POST <url>` with a JSON body.
///
/// Success is exactly HTTP 200, per the ingestion endpoint's contract. Any
/// other status or a transport-level failure yields a failed outcome and is
/// never escalated.
pub struct HttpDispatcher {
    agent: ureq::Agent,
    url: String,
}

impl HttpDispatcher {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(anyhow!("endpoint url must be http(s): {}", url));
        }
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Ok(Self {
            agent,
            url: url.to_string(),
        })
    }
}

impl EventDispatcher for HttpDispatcher {
    fn send(&self, event: &ClassificationEvent) -> DispatchOutcome {
        match self.agent.post(&self.url).send_json(event) {
            Ok(response) => {
                let status = response.status();
                if status == 200 {
                    DispatchOutcome::ok(status)
                } else {
                    DispatchOutcome::status_failure(
                        status,
                        format!("unexpected status {}", status),
                    )
                }
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response
                    .into_string()
                    .unwrap_or_else(|_| "<unreadable body>".to_string());
                DispatchOutcome::status_failure(status, body)
            }
            Err(ureq::Error::Transport(transport)) => {
                DispatchOutcome::transport_failure(transport.to_string())
            }
        }
    }
}

/// In-memory dispatcher for tests. Records every event and can be switched
/// into a forced-failure mode to exercise dispatch isolation.
#[derive(Default)]
pub struct MemoryDispatcher {
    events: Mutex<Vec<ClassificationEvent>>,
    fail: bool,
}

impl MemoryDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher whose every send fails, as if the endpoint returned 500.
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Events recorded so far (including failed attempts).
    pub fn events(&self) -> Vec<ClassificationEvent> {
        self.events.lock().expect("dispatcher lock").clone()
    }
}

impl EventDispatcher for MemoryDispatcher {
    fn send(&self, event: &ClassificationEvent) -> DispatchOutcome {
        self.events
            .lock()
            .expect("dispatcher lock")
            .push(event.clone());
        if self.fail {
            DispatchOutcome::status_failure(500, "forced failure".to_string())
        } else {
            DispatchOutcome::ok(200)
        }
    }
}

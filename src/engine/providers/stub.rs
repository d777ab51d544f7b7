// ── TabPilot Engine: Static Tier (test double) ─────────────────────────────
// Deterministic scripted model tier. Tests queue responses up front and
// every invoke pops the next one; an exhausted or unavailable tier
// reports the matching error, exactly like a real runtime would.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::atoms::error::{CoreError, CoreResult};
use crate::engine::providers::{InvokeOptions, ModelTier};

pub struct StaticTier {
    label: String,
    responses: Mutex<VecDeque<String>>,
    available: bool,
    invocations: Mutex<Vec<String>>,
}

impl StaticTier {
    /// Tier that answers with the queued responses in order.
    pub fn scripted(label: &str, responses: Vec<&str>) -> Self {
        StaticTier {
            label: label.to_string(),
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            available: true,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Tier that is never ready — models the runtime being down.
    pub fn unavailable(label: &str) -> Self {
        StaticTier {
            label: label.to_string(),
            responses: Mutex::new(VecDeque::new()),
            available: false,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Prompts this tier has been invoked with, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.invocations.lock().clone()
    }
}

#[async_trait::async_trait]
impl ModelTier for StaticTier {
    async fn invoke(&self, prompt: &str, _options: &InvokeOptions) -> CoreResult<String> {
        if !self.available {
            return Err(CoreError::Unavailable(format!("'{}' is not loaded", self.label)));
        }
        self.invocations.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| CoreError::model(self.label.clone(), "script exhausted"))
    }

    fn label(&self) -> &str {
        &self.label
    }

    async fn ready(&self) -> bool {
        self.available
    }
}

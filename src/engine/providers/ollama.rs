// ── TabPilot Engine: Ollama Tier ───────────────────────────────────────────
//
// Local inference runtime adapter over the Ollama HTTP API. Used for both
// the compact tier-2 model and the larger tier-3 reasoning model — same
// wire format, different model names.
//
// Readiness is single-flight: the first caller probes /api/tags (pulling
// the model if missing) and every concurrent caller awaits that same
// probe. An unreachable runtime makes the tier report not-ready; it never
// blocks a query beyond the router's timeout.

use log::{info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use crate::atoms::error::{CoreError, CoreResult};
use crate::engine::providers::{InvokeOptions, ModelTier};

pub struct OllamaTier {
    client: Client,
    base_url: String,
    model: String,
    /// Memoized readiness probe; resolved at most once per process.
    ready: OnceCell<bool>,
}

impl OllamaTier {
    pub fn new(base_url: &str, model: &str) -> Self {
        OllamaTier {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            ready: OnceCell::new(),
        }
    }

    /// Is the model present on the runtime? Pulls it when missing — a one
    /// time cost, after which the tier stays ready for the process life.
    async fn probe(&self) -> bool {
        match self.model_available().await {
            Ok(true) => {
                info!("[model] '{}' available at {}", self.model, self.base_url);
                true
            }
            Ok(false) => {
                info!("[model] '{}' not found, pulling...", self.model);
                match self.pull_model().await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!("[model] pull of '{}' failed: {e}", self.model);
                        false
                    }
                }
            }
            Err(e) => {
                warn!("[model] runtime not reachable at {}: {e}", self.base_url);
                false
            }
        }
    }

    /// GET /api/tags → { models: [{ name }, …] }
    async fn model_available(&self) -> CoreResult<bool> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Unavailable(format!("tags endpoint returned {}", resp.status())));
        }
        let v: Value = resp.json().await?;
        let found = v["models"]
            .as_array()
            .map(|models| {
                models.iter().any(|m| {
                    m["name"]
                        .as_str()
                        .map(|n| n == self.model || n.starts_with(&format!("{}:", self.model)))
                        .unwrap_or(false)
                })
            })
            .unwrap_or(false);
        Ok(found)
    }

    /// POST /api/pull { name, stream: false } — blocks until the pull
    /// completes.
    async fn pull_model(&self) -> CoreResult<()> {
        let url = format!("{}/api/pull", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&json!({ "name": self.model, "stream": false }))
            .timeout(std::time::Duration::from_secs(600))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(CoreError::Unavailable(format!("pull returned {}", resp.status())));
        }
        info!("[model] pulled '{}'", self.model);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ModelTier for OllamaTier {
    /// POST /api/generate with greedy decoding and a bounded token budget.
    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> CoreResult<String> {
        if !self.ready().await {
            return Err(CoreError::Unavailable(format!("model '{}' not loaded", self.model)));
        }

        let url = format!("{}/api/generate", self.base_url);
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "temperature": if options.deterministic { 0.0 } else { 0.7 },
                "num_predict": options.max_tokens,
            },
        });

        let resp = self.client.post(&url).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(CoreError::model(
                self.model.clone(),
                format!("generate returned {}", resp.status()),
            ));
        }

        let v: Value = resp.json().await?;
        match v["response"].as_str() {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(CoreError::model(self.model.clone(), "empty response field")),
        }
    }

    fn label(&self) -> &str {
        &self.model
    }

    async fn ready(&self) -> bool {
        *self.ready.get_or_init(|| self.probe()).await
    }
}

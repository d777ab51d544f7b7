// ── TabPilot Engine: Model Tier Adapters ───────────────────────────────────
// Trait seam over the opaque inference runtimes. Callers hold an
// `Arc<dyn ModelTier>` and call `.invoke()` without knowing which backend
// is in use; "model not loaded" is an explicit recoverable error, never a
// panic or a hang.
//
// Model output is free-form text. `parse_model_action` carves the JSON
// out and validates it into a typed `ModelAction`; anything malformed
// fails the tier cleanly (CoreError::Parse) so the router escalates
// instead of propagating a partial object.

pub mod ollama;
pub mod stub;

pub use ollama::OllamaTier;
pub use stub::StaticTier;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::atoms::error::{CoreError, CoreResult};

// ── Trait ──────────────────────────────────────────────────────────────────

/// Options for one model invocation. The router always requests greedy
/// decoding — routing decisions must be reproducible.
#[derive(Debug, Clone)]
pub struct InvokeOptions {
    /// Output token budget.
    pub max_tokens: u32,
    /// Greedy (temperature 0) decoding.
    pub deterministic: bool,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        InvokeOptions { max_tokens: 512, deterministic: true }
    }
}

/// One opaque model tier: prompt in, generated text out.
#[async_trait]
pub trait ModelTier: Send + Sync {
    /// Run one generation. Unavailable runtimes return
    /// `CoreError::Unavailable`; the router treats that as a signal to
    /// escalate, not a failure of the query.
    async fn invoke(&self, prompt: &str, options: &InvokeOptions) -> CoreResult<String>;

    /// Model label for metrics and `RoutingResult.model`.
    fn label(&self) -> &str;

    /// Cheap readiness probe. The first caller may pay for a real check
    /// (single-flight); concurrent callers share the in-flight result.
    async fn ready(&self) -> bool;
}

// ── Structured output ──────────────────────────────────────────────────────

/// Validated action parsed from a model's output.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelAction {
    CloseTabs { tab_ids: Vec<String> },
    PinTabs { tab_ids: Vec<String> },
    OpenUrl { url: String },
    FocusTab { tab_id: String },
    /// Group these tabs; `name` may be empty when the model omitted it —
    /// the router enriches it from the graph.
    GroupTabs { tab_ids: Vec<String>, name: String },
    /// Free-text answer with no function call.
    Answer(String),
}

/// Wire shape of a function call as the prompt asks models to emit it:
/// `{"function": "...", "args": {...}}`.
#[derive(Debug, Deserialize)]
struct RawCall {
    function: String,
    #[serde(default)]
    args: Value,
}

/// Parse-then-validate a model's raw output. A JSON object anywhere in
/// the text is treated as a function call and validated strictly; output
/// with no JSON at all is a plain answer.
pub fn parse_model_action(text: &str) -> CoreResult<ModelAction> {
    let Some(json) = extract_json(text) else {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Parse("model produced empty output".into()));
        }
        return Ok(ModelAction::Answer(trimmed.to_string()));
    };

    let call: RawCall = serde_json::from_str(json)
        .map_err(|e| CoreError::Parse(format!("malformed function call: {e}")))?;

    match call.function.as_str() {
        "close_tabs" => Ok(ModelAction::CloseTabs { tab_ids: id_list(&call.args)? }),
        "pin_tabs" => Ok(ModelAction::PinTabs { tab_ids: id_list(&call.args)? }),
        "open_url" => {
            let url = call.args["url"]
                .as_str()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| CoreError::Parse("open_url: missing url".into()))?;
            Ok(ModelAction::OpenUrl { url: url.to_string() })
        }
        "focus_tab" => {
            let tab_id = call.args["tab_id"]
                .as_str()
                .filter(|t| !t.is_empty())
                .ok_or_else(|| CoreError::Parse("focus_tab: missing tab_id".into()))?;
            Ok(ModelAction::FocusTab { tab_id: tab_id.to_string() })
        }
        "group_tabs" => {
            let tab_ids = id_list(&call.args)?;
            if tab_ids.len() < 2 {
                return Err(CoreError::Parse("group_tabs: needs at least 2 tab ids".into()));
            }
            let name = call.args["name"].as_str().unwrap_or("").to_string();
            Ok(ModelAction::GroupTabs { tab_ids, name })
        }
        other => Err(CoreError::Parse(format!("unknown function '{other}'"))),
    }
}

fn id_list(args: &Value) -> CoreResult<Vec<String>> {
    let ids = args["tab_ids"]
        .as_array()
        .ok_or_else(|| CoreError::Parse("missing tab_ids array".into()))?;
    ids.iter()
        .map(|v| {
            v.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| CoreError::Parse("tab_ids entries must be strings".into()))
        })
        .collect()
}

/// First balanced `{…}` block in the text, or None. Models often wrap the
/// call in prose or code fences; this skips both.
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_close_tabs_call() {
        let out = r#"Sure — {"function": "close_tabs", "args": {"tab_ids": ["1", "2"]}}"#;
        assert_eq!(
            parse_model_action(out).unwrap(),
            ModelAction::CloseTabs { tab_ids: vec!["1".into(), "2".into()] }
        );
    }

    #[test]
    fn test_parse_group_tabs_without_name() {
        let out = r#"{"function": "group_tabs", "args": {"tab_ids": ["a", "b", "c"]}}"#;
        assert_eq!(
            parse_model_action(out).unwrap(),
            ModelAction::GroupTabs { tab_ids: vec!["a".into(), "b".into(), "c".into()], name: String::new() }
        );
    }

    #[test]
    fn test_plain_text_is_an_answer() {
        assert_eq!(
            parse_model_action("You have 12 tabs open.").unwrap(),
            ModelAction::Answer("You have 12 tabs open.".into())
        );
    }

    #[test]
    fn test_unknown_function_is_explicit_error() {
        let out = r#"{"function": "delete_everything", "args": {}}"#;
        assert!(matches!(parse_model_action(out), Err(CoreError::Parse(_))));
    }

    #[test]
    fn test_malformed_args_fail_cleanly() {
        let missing = r#"{"function": "close_tabs", "args": {}}"#;
        assert!(matches!(parse_model_action(missing), Err(CoreError::Parse(_))));

        let wrong_type = r#"{"function": "close_tabs", "args": {"tab_ids": [1, 2]}}"#;
        assert!(matches!(parse_model_action(wrong_type), Err(CoreError::Parse(_))));

        let tiny_group = r#"{"function": "group_tabs", "args": {"tab_ids": ["a"]}}"#;
        assert!(matches!(parse_model_action(tiny_group), Err(CoreError::Parse(_))));
    }

    #[test]
    fn test_empty_output_is_an_error() {
        assert!(matches!(parse_model_action("   "), Err(CoreError::Parse(_))));
    }

    #[test]
    fn test_extract_json_skips_fences_and_braces_in_strings() {
        let out = "```json\n{\"function\": \"open_url\", \"args\": {\"url\": \"https://a.example/{x}\"}}\n```";
        assert_eq!(
            parse_model_action(out).unwrap(),
            ModelAction::OpenUrl { url: "https://a.example/{x}".into() }
        );
    }
}

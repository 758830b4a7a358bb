//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` for the Google Gemini `generateContent`
//! REST endpoint.

use std::time::Duration;

use astria_core::{
    error::{AgentError, Result},
    message::Citation,
    provider::{
        FinishReason, GenerationOptions, LlmProvider, ModelReply, ModelRequest, Part, TokenUsage,
        Turn, TurnRole,
    },
    tool::{ToolArgs, ToolDeclaration, ToolInvocation},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API key; `None` surfaces as a configuration error on first use
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GEMINI_API_BASE.into(),
            timeout_secs: 120,
        }
    }
}

impl GeminiConfig {
    /// Read `GEMINI_API_KEY` (or `API_KEY`), `GEMINI_BASE_URL` and
    /// `GEMINI_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let api_key = ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|key| !key.trim().is_empty());
        let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| GEMINI_API_BASE.into());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120);

        Self {
            api_key,
            base_url,
            timeout_secs,
        }
    }
}

/// Gemini LLM provider
pub struct GeminiProvider {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create a provider for the public endpoint with the given key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(GeminiConfig {
            api_key: Some(api_key.into()),
            ..Default::default()
        })
    }

    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env())
    }

    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn api_key(&self) -> Result<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AgentError::Config("API Key not found".into()))
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    fn check_credentials(&self) -> Result<()> {
        self.api_key().map(|_| ())
    }

    async fn health_check(&self) -> Result<bool> {
        let Ok(api_key) = self.api_key() else {
            return Ok(false);
        };

        let url = format!("{}/models", self.base_url());
        match self.client.get(&url).header("x-goog-api-key", api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelReply> {
        let api_key = self.api_key()?;
        let body = build_request(request);
        let url = format!("{}/models/{}:generateContent", self.base_url(), request.options.model);

        tracing::debug!(
            model = %request.options.model,
            turns = request.history.len(),
            "Gemini request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(%status, body = %text, "Gemini API error response");
            return Err(classify_error(status, &text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, body = %text, "Failed to parse Gemini response");
            AgentError::Transport(format!("Malformed response: {e}"))
        })?;

        convert_response(parsed)
    }
}

/// Map an unsuccessful HTTP status to the error taxonomy
fn classify_error(status: StatusCode, body: &str) -> AgentError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AgentError::Config(format!("{status}: {body}"))
        }
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => {
            AgentError::Config(format!("API key rejected: {body}"))
        }
        _ => AgentError::Transport(format!("{status}: {body}")),
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
    #[serde(default, skip_serializing)]
    thought: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought_signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: ToolArgs,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    #[serde(skip_serializing_if = "Option::is_none")]
    function_declarations: Option<Vec<GeminiFunctionDeclaration>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    google_search: Option<Value>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    grounding_metadata: Option<GeminiGroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GeminiGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct GeminiGroundingChunk {
    #[serde(default)]
    web: Option<GeminiWebSource>,
}

#[derive(Debug, Deserialize)]
struct GeminiWebSource {
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

// ============================================================================
// Conversion
// ============================================================================

fn build_request(request: ModelRequest<'_>) -> GeminiRequest {
    let system_instruction = (!request.system_instruction.is_empty()).then(|| GeminiContent {
        role: None,
        parts: vec![GeminiPart {
            text: Some(request.system_instruction.to_string()),
            ..Default::default()
        }],
    });

    GeminiRequest {
        contents: request.history.iter().map(convert_turn).collect(),
        system_instruction,
        tools: convert_tools(request.tools, request.options),
        generation_config: GeminiGenerationConfig {
            temperature: request.options.temperature,
            top_p: request.options.top_p,
            max_output_tokens: request.options.max_tokens,
        },
    }
}

fn convert_turn(turn: &Turn) -> GeminiContent {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
    };

    let parts = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text { text, signature } => GeminiPart {
                text: Some(text.clone()),
                thought_signature: signature.clone(),
                ..Default::default()
            },
            Part::FunctionCall { call, signature } => GeminiPart {
                function_call: Some(GeminiFunctionCall {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    args: call.args.clone(),
                }),
                thought_signature: signature.clone(),
                ..Default::default()
            },
            Part::FunctionResponse { id, name, response } => GeminiPart {
                function_response: Some(GeminiFunctionResponse {
                    id: id.clone(),
                    name: name.clone(),
                    // The API only accepts an object here
                    response: if response.is_object() {
                        response.clone()
                    } else {
                        json!({ "result": response })
                    },
                }),
                ..Default::default()
            },
        })
        .collect();

    GeminiContent {
        role: Some(role.into()),
        parts,
    }
}

fn convert_tools(tools: &[ToolDeclaration], options: &GenerationOptions) -> Vec<GeminiTool> {
    let mut out = Vec::new();

    if !tools.is_empty() {
        out.push(GeminiTool {
            function_declarations: Some(
                tools
                    .iter()
                    .map(|t| GeminiFunctionDeclaration {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters_json_schema(),
                    })
                    .collect(),
            ),
            google_search: None,
        });
    }

    if options.enable_search {
        out.push(GeminiTool {
            function_declarations: None,
            google_search: Some(json!({})),
        });
    }

    out
}

fn convert_response(response: GeminiResponse) -> Result<ModelReply> {
    let usage = response.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".into());
        return Err(AgentError::Transport(format!("Empty response: {reason}")));
    };

    let parts: Vec<Part> = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| {
            let signature = p.thought_signature;
            if let Some(call) = p.function_call {
                let mut invocation = ToolInvocation::new(call.name, call.args);
                invocation.id = call.id;
                Some(Part::FunctionCall {
                    call: invocation,
                    signature,
                })
            } else {
                p.text.map(|text| Part::Text { text, signature })
            }
        })
        .collect();

    let citations = candidate
        .grounding_metadata
        .map(|g| g.grounding_chunks)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|chunk| {
            let web = chunk.web?;
            Some(Citation::new(web.uri?, web.title))
        })
        .collect();

    let has_calls = parts.iter().any(|p| matches!(p, Part::FunctionCall { .. }));
    let finish_reason = if has_calls {
        Some(FinishReason::ToolUse)
    } else {
        candidate.finish_reason.as_deref().map(|reason| match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::Length,
            "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
                FinishReason::ContentFilter
            }
            _ => FinishReason::Other,
        })
    };

    Ok(ModelReply {
        content: Turn {
            role: TurnRole::Model,
            parts,
        },
        citations,
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> GenerationOptions {
        GenerationOptions::default()
    }

    fn weather_decl() -> ToolDeclaration {
        use astria_core::tool::{ParamType, ParameterSchema};
        ToolDeclaration {
            name: "get_weather".into(),
            description: "Get the current weather for a specific location.".into(),
            parameters: vec![ParameterSchema::required("location", ParamType::String, "City")],
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = GeminiConfig::default();
        assert_eq!(config.base_url, GEMINI_API_BASE);
        assert_eq!(config.timeout_secs, 120);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_request_shape() {
        let opts = options();
        let tools = [weather_decl()];
        let history = vec![
            Turn::user_text("Weather in Paris?"),
            Turn {
                role: TurnRole::Model,
                parts: vec![Part::call(ToolInvocation::new(
                    "get_weather",
                    json!({"location": "Paris"}).as_object().cloned().unwrap(),
                ))],
            },
            Turn {
                role: TurnRole::User,
                parts: vec![Part::FunctionResponse {
                    id: None,
                    name: "get_weather".into(),
                    response: json!({"location": "Paris", "condition": "Sunny"}),
                }],
            },
        ];
        let request = ModelRequest {
            system_instruction: "You are ASTRIA.",
            history: &history,
            tools: &tools,
            options: &opts,
        };

        let body = serde_json::to_value(build_request(request)).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are ASTRIA.");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Weather in Paris?");
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][1]["parts"][0]["functionCall"]["name"], "get_weather");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["condition"],
            "Sunny"
        );
        assert!(body["contents"][2]["parts"][0]["functionResponse"].get("id").is_none());
        assert_eq!(body["tools"][0]["functionDeclarations"][0]["name"], "get_weather");
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["parameters"]["required"],
            json!(["location"])
        );
        assert_eq!(body["tools"][1]["googleSearch"], json!({}));
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_search_can_be_disabled() {
        let opts = GenerationOptions {
            enable_search: false,
            ..options()
        };
        let tools = convert_tools(&[], &opts);
        assert!(tools.is_empty());
    }

    #[test]
    fn test_non_object_response_is_wrapped() {
        let turn = Turn {
            role: TurnRole::User,
            parts: vec![Part::FunctionResponse {
                id: Some("fc-1".into()),
                name: "count".into(),
                response: json!(3),
            }],
        };
        let content = serde_json::to_value(convert_turn(&turn)).unwrap();
        assert_eq!(content["parts"][0]["functionResponse"]["response"], json!({"result": 3}));
        assert_eq!(content["parts"][0]["functionResponse"]["id"], "fc-1");
    }

    #[test]
    fn test_parse_function_call_response() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "thinking...", "thought": true},
                        {"functionCall": {"name": "send_email", "args": {"recipient": "a@b.c"}}},
                        {"functionCall": {"id": "fc-2", "name": "get_weather", "args": {"location": "Paris"}}}
                    ]
                },
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        });

        let reply = convert_response(serde_json::from_value(raw).unwrap()).unwrap();

        let calls = reply.content.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "send_email");
        assert!(calls[0].id.is_none());
        assert_eq!(calls[1].id.as_deref(), Some("fc-2"));
        assert_eq!(reply.content.text(), "");
        assert_eq!(reply.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(reply.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_parse_grounded_text_response() {
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Rust 1.0 shipped "}, {"text": "in 2015."}]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://blog.rust-lang.org", "title": "Rust Blog"}},
                        {"web": {"title": "no uri"}},
                        {}
                    ]
                }
            }]
        });

        let reply = convert_response(serde_json::from_value(raw).unwrap()).unwrap();

        assert_eq!(reply.content.text(), "Rust 1.0 shipped in 2015.");
        assert_eq!(
            reply.citations,
            vec![Citation::new("https://blog.rust-lang.org", Some("Rust Blog".into()))]
        );
        assert_eq!(reply.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn test_thought_signature_replayed() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"functionCall": {"name": "get_weather", "args": {"location": "Paris"}}, "thoughtSignature": "sig_123"},
                        {"text": "Checking.", "thoughtSignature": "sig_456"},
                        {"text": " Done."}
                    ]
                },
                "finishReason": "STOP"
            }]
        });

        let reply = convert_response(serde_json::from_value(raw).unwrap()).unwrap();
        let replayed = serde_json::to_value(convert_turn(&reply.content)).unwrap();

        assert_eq!(replayed["role"], "model");
        assert_eq!(replayed["parts"][0]["functionCall"]["name"], "get_weather");
        assert_eq!(replayed["parts"][0]["thoughtSignature"], "sig_123");
        assert_eq!(replayed["parts"][1]["thoughtSignature"], "sig_456");
        assert!(replayed["parts"][2].get("thoughtSignature").is_none());
        assert!(replayed["parts"][0].get("thought").is_none());
    }

    #[test]
    fn test_blocked_prompt_is_transport_error() {
        let raw = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = convert_response(serde_json::from_value(raw).unwrap()).unwrap_err();
        assert!(matches!(err, AgentError::Transport(msg) if msg.contains("SAFETY")));
    }

    #[test]
    fn test_classify_error() {
        assert!(matches!(classify_error(StatusCode::FORBIDDEN, ""), AgentError::Config(_)));
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, r#"{"reason": "API_KEY_INVALID"}"#),
            AgentError::Config(_)
        ));
        assert!(matches!(
            classify_error(StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            AgentError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let provider = GeminiProvider::from_config(GeminiConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..Default::default()
        })
        .unwrap();
        let opts = options();
        let history = [Turn::user_text("hi")];

        assert!(matches!(provider.check_credentials(), Err(AgentError::Config(_))));
        let err = provider
            .complete(ModelRequest {
                system_instruction: "",
                history: &history,
                tools: &[],
                options: &opts,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(!provider.health_check().await.unwrap());
    }
}

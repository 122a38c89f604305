use crate::config::AiConfig;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// A function the model may call instead of answering in text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Ask the model for `application/json` output.
    pub json: bool,
    pub functions: Vec<FunctionDeclaration>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            json: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateReply {
    pub text: String,
    pub function_call: Option<FunctionCall>,
}

pub trait TextGenerator {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply, AppError>;
}

/// Blocking client for the `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AppError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                AppError::invalid_input(
                    "AI API key is not configured (set TASKFLOW_AI_API_KEY or ai.api_key)",
                )
            })?
            .to_string();
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| AppError::remote(err.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint(&config.base_url, &config.model),
            api_key,
        })
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, request: &GenerateRequest) -> Result<GenerateReply, AppError> {
        debug!(endpoint = %self.endpoint, json = request.json, "calling model");
        let response = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request_body(request))
            .send()
            .map_err(|err| AppError::remote(err.without_url().to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|err| AppError::remote(err.without_url().to_string()))?;
        if !status.is_success() {
            return Err(AppError::remote(format!(
                "model endpoint returned {status}: {}",
                error_detail(&body)
            )));
        }
        parse_reply(&body)
    }
}

pub(crate) fn endpoint(base_url: &str, model: &str) -> String {
    format!(
        "{}/models/{}:generateContent",
        base_url.trim_end_matches('/'),
        model.trim()
    )
}

pub(crate) fn request_body(request: &GenerateRequest) -> Value {
    let mut body = json!({
        "contents": [
            { "role": "user", "parts": [{ "text": request.prompt }] }
        ]
    });
    if !request.functions.is_empty() {
        body["tools"] = json!([{ "functionDeclarations": request.functions }]);
    }
    if request.json {
        body["generationConfig"] = json!({ "responseMimeType": "application/json" });
    }
    body
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

/// Joins the text parts of the first candidate and keeps its first function call.
pub(crate) fn parse_reply(body: &str) -> Result<GenerateReply, AppError> {
    let wire: WireResponse = serde_json::from_str(body)
        .map_err(|err| AppError::remote(format!("unreadable model response: {err}")))?;
    let parts = wire
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or_else(|| AppError::remote("model returned no candidates"))?;

    let mut reply = GenerateReply::default();
    for part in parts {
        if let Some(text) = part.text {
            reply.text.push_str(&text);
        }
        if reply.function_call.is_none() {
            reply.function_call = part.function_call;
        }
    }
    Ok(reply)
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::{
        FunctionDeclaration, GeminiClient, GenerateRequest, endpoint, error_detail, parse_reply,
        request_body,
    };
    use crate::config::AiConfig;
    use serde_json::json;

    #[test]
    fn endpoint_joins_base_and_model() {
        assert_eq!(
            endpoint("https://example.test/v1beta/", "gemini-1.5-flash"),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_body_adds_tools_and_json_mode_only_when_asked() {
        let plain = request_body(&GenerateRequest::text("hi"));
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");
        assert!(plain.get("tools").is_none());
        assert!(plain.get("generationConfig").is_none());

        let mut request = GenerateRequest::json("list");
        request.functions.push(FunctionDeclaration {
            name: "create_task".into(),
            description: "Create a task".into(),
            parameters: json!({"type": "object"}),
        });
        let body = request_body(&request);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["tools"][0]["functionDeclarations"][0]["name"],
            "create_task"
        );
    }

    #[test]
    fn parse_reply_reads_text_and_function_call() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Sure, "},
                        {"text": "done."},
                        {"functionCall": {"name": "assign_task", "args": {"task": "Docs"}}}
                    ]
                }
            }]
        })
        .to_string();
        let reply = parse_reply(&body).unwrap();
        assert_eq!(reply.text, "Sure, done.");
        let call = reply.function_call.unwrap();
        assert_eq!(call.name, "assign_task");
        assert_eq!(call.args["task"], "Docs");
    }

    #[test]
    fn parse_reply_without_candidates_is_remote_error() {
        let err = parse_reply(r#"{"candidates": []}"#).unwrap_err();
        assert_eq!(err.code(), "remote_error");
        assert_eq!(parse_reply("<html>").unwrap_err().code(), "remote_error");
    }

    #[test]
    fn error_detail_prefers_api_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid"}}"#;
        assert_eq!(error_detail(body), "API key not valid");
        assert_eq!(error_detail("plain failure"), "plain failure");
    }

    #[test]
    fn client_requires_api_key() {
        let err = GeminiClient::new(&AiConfig::default()).err().unwrap();
        assert_eq!(err.code(), "invalid_input");
    }
}

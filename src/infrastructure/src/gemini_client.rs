use crate::config::GeminiConfig;
use async_trait::async_trait;
use domain::models::{
    normalize_arguments, EngineMessage, EngineReply, EngineRequest, EngineRole, Part,
    ToolDefinition, ToolParameters,
};
use domain::services::ReasoningEngine;
use reqwest::{Client, ClientBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use shared::types::JsonMap;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
}

#[derive(Serialize, Deserialize, Default)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: JsonMap,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<WireContent>,
}

/// Gemini `generateContent` client with native function calling.
#[derive(Clone)]
pub struct GeminiClient {
    client: Arc<Client>,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ReasoningEngine for GeminiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: &EngineRequest) -> Result<EngineReply> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            Error::Configuration(
                "Gemini API key is not configured. Please set GEMINI_API_KEY environment variable."
                    .to_string(),
            )
        })?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = build_request(request);
        debug!(model = %self.model, turns = body.contents.len(), "calling Gemini");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            error!(status = %status, "Gemini API error");
            return Err(Error::ReasoningEngine(format!(
                "Gemini API error ({}): {}",
                status,
                api_error_message(&text)
            )));
        }

        parse_reply(&text)
    }
}

fn role_name(role: EngineRole) -> &'static str {
    match role {
        EngineRole::User => "user",
        EngineRole::Model => "model",
        EngineRole::Function => "function",
    }
}

fn to_wire(message: &EngineMessage) -> WireContent {
    let parts = message
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                ..WirePart::default()
            },
            Part::FunctionCall { name, args } => WirePart {
                function_call: Some(WireFunctionCall {
                    name: name.clone(),
                    args: Value::Object(args.clone()),
                }),
                ..WirePart::default()
            },
            Part::FunctionResponse { name, response } => WirePart {
                function_response: Some(WireFunctionResponse {
                    name: name.clone(),
                    response: response.clone(),
                }),
                ..WirePart::default()
            },
        })
        .collect();
    WireContent {
        role: Some(role_name(message.role).to_string()),
        parts,
    }
}

/// Gemini's schema dialect wants upper-case OpenAPI type names.
fn schema_for(parameters: &ToolParameters) -> Option<Value> {
    if parameters.is_empty() {
        return None;
    }
    let properties: Map<String, Value> = parameters
        .properties
        .iter()
        .map(|(name, prop)| {
            let mut schema = json!({
                "type": prop.param_type.to_uppercase(),
                "description": prop.description,
            });
            if let Some(values) = &prop.enum_values {
                schema["enum"] = json!(values);
            }
            (name.clone(), schema)
        })
        .collect();
    Some(json!({
        "type": "OBJECT",
        "properties": properties,
        "required": parameters.required,
    }))
}

fn declaration(tool: &ToolDefinition) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: schema_for(&tool.parameters),
    }
}

fn build_request(request: &EngineRequest) -> GenerateRequest {
    let system_instruction = (!request.system_prompt.trim().is_empty()).then(|| WireContent {
        role: None,
        parts: vec![WirePart {
            text: Some(request.system_prompt.clone()),
            ..WirePart::default()
        }],
    });
    let tools = if request.tools.is_empty() {
        Vec::new()
    } else {
        vec![WireTool {
            function_declarations: request.tools.iter().map(declaration).collect(),
        }]
    };
    GenerateRequest {
        system_instruction,
        contents: request.messages.iter().map(to_wire).collect(),
        tools,
    }
}

fn parse_reply(body: &str) -> Result<EngineReply> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| Error::ReasoningEngine(format!("malformed Gemini response: {}", e)))?;
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::ReasoningEngine("Gemini returned no candidates".to_string()))?;

    let parts = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| {
            if let Some(call) = part.function_call {
                Some(Part::FunctionCall {
                    name: call.name,
                    args: normalize_arguments(call.args),
                })
            } else {
                part.text.map(Part::Text)
            }
        })
        .collect();
    Ok(EngineReply { parts })
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

use crate::entities::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::types::JsonMap;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: ToolParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameters {
    #[serde(rename = "type")]
    pub param_type: String, // "object"
    pub properties: BTreeMap<String, ParameterProperty>,
    pub required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProperty {
    #[serde(rename = "type")]
    pub param_type: String, // "string", "integer", "number", "boolean"
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
}

impl ToolParameters {
    pub fn empty() -> Self {
        Self {
            param_type: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn required(mut self, name: &str, param_type: &str, description: &str) -> Self {
        self.properties
            .insert(name.to_string(), ParameterProperty::new(param_type, description));
        self.required.push(name.to_string());
        self
    }

    pub fn optional(mut self, name: &str, param_type: &str, description: &str) -> Self {
        self.properties
            .insert(name.to_string(), ParameterProperty::new(param_type, description));
        self
    }

    /// Optional string parameter limited to `values`.
    pub fn one_of(mut self, name: &str, description: &str, values: &[&str]) -> Self {
        let mut property = ParameterProperty::new("string", description);
        property.enum_values = Some(values.iter().map(|v| v.to_string()).collect());
        self.properties.insert(name.to_string(), property);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl Default for ToolParameters {
    fn default() -> Self {
        Self::empty()
    }
}

impl ParameterProperty {
    pub fn new(param_type: &str, description: &str) -> Self {
        Self {
            param_type: param_type.to_string(),
            description: description.to_string(),
            enum_values: None,
        }
    }
}

/// A call the reasoning engine proposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: JsonMap,
}

/// One executed round of the function-calling loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityInvocation {
    pub capability_name: String,
    pub arguments: JsonMap,
    pub result: JsonMap,
    pub error: Option<String>,
}

impl CapabilityInvocation {
    /// Build from a raw capability result; an `error` key is lifted out.
    pub fn from_result(call: &ToolCall, raw: Value) -> Self {
        let result = normalize_result(raw);
        let error = result
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            capability_name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
            error,
        }
    }
}

/// Give any capability result the object shape the engine requires for a
/// function response: sequences go under `items`, scalars under `value`.
pub fn normalize_result(raw: Value) -> JsonMap {
    match raw {
        Value::Object(map) => map,
        Value::Array(items) => {
            let mut map = JsonMap::new();
            map.insert("items".to_string(), Value::Array(items));
            map
        }
        other => {
            let mut map = JsonMap::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Arguments as the engine sent them; anything but an object means "none".
pub fn normalize_arguments(raw: Value) -> JsonMap {
    match raw {
        Value::Object(map) => map,
        _ => JsonMap::new(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineRole {
    User,
    Model,
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    FunctionCall { name: String, args: JsonMap },
    FunctionResponse { name: String, response: JsonMap },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineMessage {
    pub role: EngineRole,
    pub parts: Vec<Part>,
}

impl EngineMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: EngineRole::User,
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn function_call(call: &ToolCall) -> Self {
        Self {
            role: EngineRole::Model,
            parts: vec![Part::FunctionCall {
                name: call.name.clone(),
                args: call.arguments.clone(),
            }],
        }
    }

    pub fn function_response(name: &str, response: JsonMap) -> Self {
        Self {
            role: EngineRole::Function,
            parts: vec![Part::FunctionResponse {
                name: name.to_string(),
                response,
            }],
        }
    }
}

impl From<&ConversationTurn> for EngineMessage {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            Role::User => EngineRole::User,
            Role::Model => EngineRole::Model,
        };
        Self {
            role,
            parts: vec![Part::Text(turn.content.clone())],
        }
    }
}

/// Everything the reasoning engine needs for one round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRequest {
    pub system_prompt: String,
    pub messages: Vec<EngineMessage>,
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineReply {
    pub parts: Vec<Part>,
}

impl EngineReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn calling(name: &str, arguments: JsonMap) -> Self {
        Self {
            parts: vec![Part::FunctionCall {
                name: name.to_string(),
                args: arguments,
            }],
        }
    }

    /// Proposed calls, in the order the engine listed them.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall { name, args } => Some(ToolCall {
                    name: name.clone(),
                    arguments: args.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Joined text parts; `None` when the reply carries no readable text.
    pub fn terminal_text(&self) -> Option<String> {
        let text: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| match part {
                Part::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        let joined = text.concat();
        if joined.trim().is_empty() {
            None
        } else {
            Some(joined)
        }
    }
}

// Bedrock agent action-group wire types
//
// Bedrock invokes the action-group Lambda with a "function details" event and
// expects a functionResponse envelope back. Field names follow the camelCase
// JSON used on the wire.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body returned when the agent asks for a function this Lambda does not serve
pub const NO_FUNCTION_CALLED: &str = "Error, no function was called";

/// Agent metadata attached to every action-group invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub version: String,
}

/// One function parameter as sent by the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: String,
}

/// Incoming action-group event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupEvent {
    pub message_version: String,
    #[serde(default)]
    pub agent: AgentInfo,
    #[serde(default)]
    pub input_text: String,
    #[serde(default)]
    pub session_id: String,
    pub action_group: String,
    pub function: String,
    #[serde(default)]
    pub parameters: Vec<FunctionParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_session_attributes: Option<HashMap<String, String>>,
}

impl ActionGroupEvent {
    /// Value of the named parameter; the last occurrence wins
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .rev()
            .find(|param| param.name == name)
            .map(|param| param.value.as_str())
    }
}

/// Optional state hint telling the agent how to treat the response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseState {
    Failure,
    Reprompt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    #[serde(rename = "TEXT")]
    pub text: TextBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_state: Option<ResponseState>,
    pub response_body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub action_group: String,
    pub function: String,
    pub function_response: FunctionResponse,
}

/// Outgoing envelope returned to Bedrock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupResponse {
    pub message_version: String,
    pub response: ActionResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_attributes: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_session_attributes: Option<HashMap<String, String>>,
}

impl ActionGroupResponse {
    /// Build a TEXT response echoing the identifiers and session state of `event`
    pub fn text(event: &ActionGroupEvent, body: impl Into<String>) -> Self {
        Self {
            message_version: event.message_version.clone(),
            response: ActionResponse {
                action_group: event.action_group.clone(),
                function: event.function.clone(),
                function_response: FunctionResponse {
                    response_state: None,
                    response_body: ResponseBody {
                        text: TextBody { body: body.into() },
                    },
                },
            },
            session_attributes: event.session_attributes.clone(),
            prompt_session_attributes: event.prompt_session_attributes.clone(),
        }
    }

    pub fn with_state(mut self, state: ResponseState) -> Self {
        self.response.function_response.response_state = Some(state);
        self
    }

    pub fn body(&self) -> &str {
        &self.response.function_response.response_body.text.body
    }
}

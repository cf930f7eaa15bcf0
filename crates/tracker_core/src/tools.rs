//! Tools exposed to the AI assistant.
//!
//! The assistant can read and overwrite any key of the remote store. Both
//! tools go straight to [`RemoteStore`]: a write replaces the whole value
//! with a fresh timestamp and races with live clients exactly like a
//! [`SyncedState`](crate::SyncedState) write does.
//!
//! The model only ever sees payloads. A key stored in a schema envelope is
//! unwrapped on read, and a write to such a key is wrapped in the version
//! already stored there.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::entry::{SyncedEntry, validate_key};
use crate::error::{Result, TrackerError};
use crate::remote::RemoteStore;
use crate::schema;

/// Name of the read tool.
pub const GET_USER_DATA: &str = "getUserData";

/// Name of the write tool.
pub const UPDATE_USER_DATA: &str = "updateUserData";

/// Description of one tool as advertised to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name
    pub name: &'static str,
    /// What the tool does, for the model
    pub description: &'static str,
    /// JSON schema of the arguments
    pub input_schema: Value,
}

/// All tools, in a stable order.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: GET_USER_DATA,
            description: "Read data from the user_data table by key. Use this to fetch the \
                current state of the Tracker (e.g., mastery_skills, daily_routine, \
                net_worth_history).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "The key of the data to fetch." }
                },
                "required": ["key"]
            }),
        },
        ToolDefinition {
            name: UPDATE_USER_DATA,
            description: "Update data in the user_data table by key. Use this to modify the \
                state of the Tracker (e.g., checking off a routine, adding a skill).",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string", "description": "The key of the data to update." },
                    "value": {
                        "description": "The completely new value to set for this key. This \
                            will overwrite the existing payload, so make sure to fetch the \
                            current state first and merge the changes if necessary. Versioned \
                keys keep their stored version; send the payload only."
                    }
                },
                "required": ["key", "value"]
            }),
        },
    ]
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    /// Read one key
    GetUserData {
        /// Key to read
        key: String,
    },
    /// Overwrite one key
    UpdateUserData {
        /// Key to write
        key: String,
        /// New value
        value: Value,
    },
}

#[derive(Deserialize)]
struct KeyArgs {
    key: String,
}

#[derive(Deserialize)]
struct UpdateArgs {
    key: String,
    value: Value,
}

impl ToolCall {
    /// Parse a call from the tool name and its JSON arguments.
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| TrackerError::InvalidToolArguments(e.to_string());
        let call = match name {
            GET_USER_DATA => {
                let args: KeyArgs = serde_json::from_value(arguments).map_err(invalid)?;
                ToolCall::GetUserData { key: args.key }
            }
            UPDATE_USER_DATA => {
                let args: UpdateArgs = serde_json::from_value(arguments).map_err(invalid)?;
                ToolCall::UpdateUserData {
                    key: args.key,
                    value: args.value,
                }
            }
            other => return Err(TrackerError::UnknownTool(other.to_string())),
        };
        validate_key(call.key())?;
        Ok(call)
    }

    /// The key this call touches.
    pub fn key(&self) -> &str {
        match self {
            ToolCall::GetUserData { key } | ToolCall::UpdateUserData { key, .. } => key,
        }
    }
}

/// Result returned to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the call succeeded
    pub success: bool,
    /// Value read (read tool only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Confirmation text (write tool only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Failure reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutput {
    /// A failed call carrying `error` as its reason.
    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            value: None,
            message: None,
            error: Some(error.to_string()),
        }
    }
}

/// Run a tool call against `store`. Failures are reported in the output.
pub async fn execute(store: &dyn RemoteStore, call: ToolCall) -> ToolOutput {
    match call {
        ToolCall::GetUserData { key } => match store.fetch(&key).await {
            Ok(Some(entry)) => ToolOutput {
                success: true,
                value: Some(match schema::unwrap(&entry.value) {
                    Some((_, data)) => data.clone(),
                    None => entry.value,
                }),
                message: None,
                error: None,
            },
            Ok(None) => ToolOutput::failure(format!("No data stored under '{}'", key)),
            Err(e) => ToolOutput::failure(e),
        },
        ToolCall::UpdateUserData { key, value } => {
            let existing = match store.fetch(&key).await {
                Ok(existing) => existing,
                Err(e) => return ToolOutput::failure(e),
            };
            let value = match existing.as_ref().and_then(|entry| schema::unwrap(&entry.value)) {
                Some((version, _)) if schema::unwrap(&value).is_none() => {
                    log::debug!("Keeping schema version {} for '{}'", version, key);
                    schema::wrap(version, &value)
                }
                _ => value,
            };
            let entry = SyncedEntry::new(key, value);
            match store.upsert(&entry).await {
                Ok(()) => ToolOutput {
                    success: true,
                    value: None,
                    message: Some(format!("Successfully updated {}.", entry.key)),
                    error: None,
                },
                Err(e) => ToolOutput::failure(e),
            }
        }
    }
}

/// Parse and run a call in one step.
pub async fn execute_named(store: &dyn RemoteStore, name: &str, arguments: Value) -> ToolOutput {
    match ToolCall::parse(name, arguments) {
        Ok(call) => execute(store, call).await,
        Err(e) => ToolOutput::failure(e),
    }
}

// Copyright 2025 Toolwright Contributors (https://github.com/toolwright/toolwright)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The persisted tool record and its service-facing payload shapes.
//!
//! A [`Tool`] is owned by the storage layer and mutated only through the
//! tool service; the engine treats every record it receives as an immutable
//! snapshot for the duration of one compile or dispatch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::contract::ToolContract;
use crate::endpoint::ToolEndpoint;
use crate::error::ValidationError;

/// Upper bound of the protocol server's tool naming rule.
pub const TOOL_NAME_MAX_LEN: usize = 128;

/// Enforces the protocol server's naming rule: 1-128 characters from
/// `[A-Za-z0-9_.-]`.
pub fn validate_tool_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > TOOL_NAME_MAX_LEN {
        return Err(ValidationError::new(format!(
            "tool name must be 1-{TOOL_NAME_MAX_LEN} characters, got {}",
            name.len()
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '_' | '.' | '-'))
    {
        return Err(ValidationError::new(format!(
            "tool name contains invalid character '{bad}' (allowed: [A-Za-z0-9_.-])"
        )));
    }
    Ok(())
}

/// Shape of a tool's result: an output JSON schema plus a coarse format tag
/// ("text", "json", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponseSpec {
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub schema: serde_json::Map<String, Value>,
    #[serde(default = "default_response_format")]
    pub format: String,
}

impl Default for ToolResponseSpec {
    fn default() -> Self {
        Self {
            schema: serde_json::Map::new(),
            format: default_response_format(),
        }
    }
}

fn default_response_format() -> String {
    "text".to_string()
}

/// The persisted record a compiled tool is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub endpoint: ToolEndpoint,
    pub contract: ToolContract,
    #[serde(default)]
    pub response: ToolResponseSpec,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    /// Full-record validation: name rule, contract invariants, endpoint
    /// fields, and the endpoint/contract cross-checks. Normalizes tags and
    /// method casing in place. Every record must pass before it is
    /// persisted, so the compiler and sync engine never see invalid data.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_tool_name(&self.name)?;
        self.contract.validate()?;
        self.endpoint.validate()?;
        self.endpoint.validate_against(&self.contract)
    }
}

/// Creation payload accepted by the tool service.
///
/// `contract`/`response` stay unset for internal-transport tools; those
/// come from the internal registry definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub endpoint: ToolEndpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ToolContract>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ToolResponseSpec>,
}

fn default_enabled() -> bool {
    true
}

/// Partial update; unset fields leave the record unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<ToolEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ToolContract>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ToolResponseSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_rule() {
        assert!(validate_tool_name("callable_tool").is_ok());
        assert!(validate_tool_name("internal.echo").is_ok());
        assert!(validate_tool_name("a-b.c_d9").is_ok());
        assert!(validate_tool_name("").is_err());
        assert!(validate_tool_name(&"x".repeat(129)).is_err());
        assert!(validate_tool_name("has space").is_err());
        assert!(validate_tool_name("emoji🙂").is_err());
    }

    #[test]
    fn test_record_wire_shape() {
        let raw = json!({
            "id": "5f8a1418-95d2-4f06-b1d1-4e6bb7d3c6aa",
            "name": "search_web",
            "description": "Search the web",
            "enabled": true,
            "endpoint": {
                "transport": "http",
                "url": "https://api.example.com/search",
                "method": "GET"
            },
            "contract": {
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "q": {"type": "string", "minLength": 1}
                    },
                    "required": ["q"]
                },
                "http": {"query": ["q"]},
                "tags": ["web"],
                "read_only": true,
                "idempotent": true
            },
            "response": {"format": "json"},
            "created_at": "2025-06-01T12:00:00Z",
            "updated_at": "2025-06-01T12:00:00Z"
        });

        let mut tool: Tool = serde_json::from_value(raw.clone()).unwrap();
        tool.validate().unwrap();
        assert_eq!(tool.name, "search_web");
        assert_eq!(tool.response.format, "json");

        let back = serde_json::to_value(&tool).unwrap();
        assert_eq!(back["endpoint"]["transport"], "http");
        assert_eq!(back["contract"]["input_schema"]["required"], json!(["q"]));
        // Absent response schema stays off the wire.
        assert!(back["response"].get("schema").is_none());
    }

    #[test]
    fn test_validate_rejects_cross_field_violation() {
        let mut tool: Tool = serde_json::from_value(json!({
            "id": "5f8a1418-95d2-4f06-b1d1-4e6bb7d3c6ab",
            "name": "echo",
            "enabled": true,
            "endpoint": {
                "transport": "internal",
                "target": "internal.echo",
                "static_inputs": {"text": "not static"}
            },
            "contract": {
                "input_schema": {
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }
            },
            "created_at": "2025-06-01T12:00:00Z",
            "updated_at": "2025-06-01T12:00:00Z"
        }))
        .unwrap();
        let err = tool.validate().unwrap_err();
        assert!(err.message().contains("non-static keys"));
    }

    #[test]
    fn test_new_tool_defaults() {
        let payload: NewTool = serde_json::from_value(json!({
            "name": "t",
            "endpoint": {"transport": "internal", "target": "internal.echo"}
        }))
        .unwrap();
        assert!(payload.enabled);
        assert!(payload.contract.is_none());
        assert!(payload.response.is_none());
    }
}

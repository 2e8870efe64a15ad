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

//! The protocol host: the live registration surface the sync engine
//! drives.
//!
//! A registered tool is immediately listable and callable under the
//! server's naming rule. [`InProcessToolHost`] keeps everything in memory
//! and validates call arguments against each tool's compiled JSON Schema
//! before invoking it, so endpoints only ever see arguments their contract
//! admits.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonschema::JSONSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

use toolwright_core::validate_tool_name;

use crate::dispatch::DispatchError;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("a tool named '{0}' is already registered")]
    DuplicateName(String),

    #[error("no tool named '{0}' is registered")]
    UnknownTool(String),

    #[error("invalid tool name: {0}")]
    InvalidName(String),

    #[error("invalid arguments for '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("input schema for '{tool}' does not compile: {message}")]
    SchemaCompile { tool: String, message: String },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// A callable the host can expose: a name, an optional description, a JSON
/// Schema for its arguments, and the call itself.
#[async_trait]
pub trait HostedTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> Option<&str>;
    fn input_schema(&self) -> Value;
    async fn call(&self, arguments: Value) -> Result<Value, DispatchError>;
}

/// What the sync engine needs from a host. Registration and removal are
/// serialized per tool name by the sync engine; the host itself only
/// guarantees that each individual operation is atomic.
pub trait ToolHost: Send + Sync {
    fn register(&self, tool: Arc<dyn HostedTool>) -> Result<(), HostError>;
    /// Returns whether a tool by that name was present. Never fails.
    fn unregister(&self, name: &str) -> bool;
    fn list_registered(&self) -> HashSet<String>;
}

/// One tool entry as the protocol's list surface renders it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostedToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// In-memory host keyed by tool name, with a compiled argument validator
/// per tool.
#[derive(Default)]
pub struct InProcessToolHost {
    tools: DashMap<String, Arc<dyn HostedTool>>,
    validators: DashMap<String, JSONSchema>,
}

impl InProcessToolHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `arguments` against the tool's schema, then invokes it.
    /// Validation failures carry every schema violation, joined.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<Value, HostError> {
        let tool = self
            .tools
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| HostError::UnknownTool(name.to_string()))?;

        // Guard must drop before the await below.
        let violations: Vec<String> = match self.validators.get(name) {
            Some(validator) => match validator.validate(&arguments) {
                Ok(()) => Vec::new(),
                Err(errors) => errors.map(|e| e.to_string()).collect(),
            },
            None => Vec::new(),
        };
        if !violations.is_empty() {
            return Err(HostError::InvalidArguments {
                tool: name.to_string(),
                message: violations.join("; "),
            });
        }

        tracing::debug!(tool = name, "calling hosted tool");
        Ok(tool.call(arguments).await?)
    }

    /// Every registered tool, sorted by name so the list surface is
    /// deterministic.
    pub fn definitions(&self) -> Vec<HostedToolDescriptor> {
        let mut defs: Vec<HostedToolDescriptor> = self
            .tools
            .iter()
            .map(|entry| HostedToolDescriptor {
                name: entry.key().clone(),
                description: entry.value().description().map(str::to_string),
                input_schema: entry.value().input_schema(),
            })
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl ToolHost for InProcessToolHost {
    fn register(&self, tool: Arc<dyn HostedTool>) -> Result<(), HostError> {
        let name = tool.name().to_string();
        validate_tool_name(&name)
            .map_err(|e| HostError::InvalidName(e.message().to_string()))?;
        if self.tools.contains_key(&name) {
            return Err(HostError::DuplicateName(name));
        }

        let schema = tool.input_schema();
        let validator = JSONSchema::options()
            .compile(&schema)
            .map_err(|e| HostError::SchemaCompile {
                tool: name.clone(),
                message: e.to_string(),
            })?;

        self.validators.insert(name.clone(), validator);
        self.tools.insert(name.clone(), tool);
        tracing::debug!(tool = %name, "registered tool");
        Ok(())
    }

    fn unregister(&self, name: &str) -> bool {
        self.validators.remove(name);
        let removed = self.tools.remove(name).is_some();
        if removed {
            tracing::debug!(tool = name, "unregistered tool");
        }
        removed
    }

    fn list_registered(&self) -> HashSet<String> {
        self.tools.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubTool {
        name: &'static str,
    }

    #[async_trait]
    impl HostedTool for StubTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> Option<&str> {
            Some("stub")
        }

        fn input_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": ["q"],
                "additionalProperties": false
            })
        }

        async fn call(&self, arguments: Value) -> Result<Value, DispatchError> {
            Ok(json!({"echo": arguments}))
        }
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_names() {
        let host = InProcessToolHost::new();
        host.register(Arc::new(StubTool { name: "stub_tool" })).unwrap();

        let err = host
            .register(Arc::new(StubTool { name: "stub_tool" }))
            .unwrap_err();
        assert!(matches!(err, HostError::DuplicateName(ref n) if n == "stub_tool"));

        let err = host
            .register(Arc::new(StubTool { name: "bad name" }))
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidName(_)));
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let host = InProcessToolHost::new();
        host.register(Arc::new(StubTool { name: "stub_tool" })).unwrap();

        assert!(host.unregister("stub_tool"));
        assert!(!host.unregister("stub_tool"));
        assert!(host.list_registered().is_empty());
    }

    #[test]
    fn test_definitions_are_sorted_and_carry_camel_case_schema_key() {
        let host = InProcessToolHost::new();
        host.register(Arc::new(StubTool { name: "zeta" })).unwrap();
        host.register(Arc::new(StubTool { name: "alpha" })).unwrap();

        let defs = host.definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let wire = serde_json::to_value(&defs[0]).unwrap();
        assert!(wire.get("inputSchema").is_some());
        assert!(wire.get("input_schema").is_none());
    }

    #[tokio::test]
    async fn test_call_tool_validates_arguments() {
        let host = InProcessToolHost::new();
        host.register(Arc::new(StubTool { name: "stub_tool" })).unwrap();

        let result = host
            .call_tool("stub_tool", json!({"q": "hello"}))
            .await
            .unwrap();
        assert_eq!(result["echo"]["q"], "hello");

        let err = host.call_tool("stub_tool", json!({})).await.unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments { ref tool, .. } if tool == "stub_tool"));

        let err = host
            .call_tool("stub_tool", json!({"q": "x", "extra": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidArguments { .. }));

        let err = host.call_tool("ghost", json!({})).await.unwrap_err();
        assert!(matches!(err, HostError::UnknownTool(ref n) if n == "ghost"));
    }
}

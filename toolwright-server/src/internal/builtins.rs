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

//! Builtin internal tools, registered at startup.
//!
//! `internal.echo` logs a line with a statically configured prefix and
//! `internal.sleep` pauses for a bounded duration. Both double as smoke
//! tests for the compile/dispatch path: echo exercises static-input
//! injection, sleep exercises defaults and the async handler boundary.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;

use toolwright_core::{
    ConflictError, JsonSchemaProperty, JsonType, ToolContract, ToolInputSchema, ToolResponseSpec,
};

use super::{InternalToolDef, InternalToolHandler, InternalToolRegistry};
use crate::dispatch::DispatchError;

/// Upper bound on `internal.sleep`, matching its contract.
const MAX_SLEEP_MS: u64 = 60_000;
const DEFAULT_SLEEP_MS: u64 = 100;

/// Logs `"<prefix><text>"` and returns both pieces. The prefix is an
/// `x_static` property, so callers never see it in the tool signature.
pub struct EchoTool;

#[async_trait]
impl InternalToolHandler for EchoTool {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, DispatchError> {
        let text = args
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| DispatchError::InvalidArguments("'text' must be a string".into()))?;
        let prefix = args.get("prefix").and_then(Value::as_str).unwrap_or("");

        let line = format!("{prefix}{text}");
        tracing::info!(tool = "internal.echo", "{line}");

        Ok(json!({ "echoed": true, "text": line }))
    }
}

/// Sleeps for `duration_ms` (clamped to the contract's maximum) and
/// reports how long it actually slept.
pub struct SleepTool;

#[async_trait]
impl InternalToolHandler for SleepTool {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, DispatchError> {
        let requested = args
            .get("duration_ms")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_SLEEP_MS);
        let duration_ms = requested.min(MAX_SLEEP_MS);

        tokio::time::sleep(Duration::from_millis(duration_ms)).await;

        Ok(json!({ "slept": true, "duration_ms": duration_ms }))
    }
}

fn echo_def() -> InternalToolDef {
    let mut properties = IndexMap::new();
    properties.insert(
        "text".to_string(),
        JsonSchemaProperty {
            value_type: Some(JsonType::String),
            description: Some("Text to echo".to_string()),
            ..JsonSchemaProperty::default()
        },
    );
    properties.insert(
        "prefix".to_string(),
        JsonSchemaProperty {
            value_type: Some(JsonType::String),
            description: Some("Prefix configured when saving the tool".to_string()),
            default: Some(json!("[SYSTEM] ")),
            x_static: Some(json!(true)),
            ..JsonSchemaProperty::default()
        },
    );

    InternalToolDef {
        key: "internal.echo".to_string(),
        contract: ToolContract {
            input_schema: ToolInputSchema {
                properties,
                required: vec!["text".to_string()],
                ..ToolInputSchema::default()
            },
            tags: vec!["internal".to_string(), "debug".to_string()],
            read_only: true,
            idempotent: true,
            ..ToolContract::default()
        },
        response: ToolResponseSpec {
            schema: object(json!({
                "type": "object",
                "properties": {
                    "echoed": {
                        "type": "boolean",
                        "description": "Whether the text was echoed"
                    },
                    "text": {
                        "type": "string",
                        "description": "The prefixed text that was logged"
                    }
                }
            })),
            format: "json".to_string(),
        },
        handler: Arc::new(EchoTool),
    }
}

fn sleep_def() -> InternalToolDef {
    let mut properties = IndexMap::new();
    properties.insert(
        "duration_ms".to_string(),
        JsonSchemaProperty {
            value_type: Some(JsonType::Integer),
            description: Some("How long to sleep, in milliseconds".to_string()),
            default: Some(json!(DEFAULT_SLEEP_MS)),
            minimum: Some(0.0),
            maximum: Some(MAX_SLEEP_MS as f64),
            ..JsonSchemaProperty::default()
        },
    );

    InternalToolDef {
        key: "internal.sleep".to_string(),
        contract: ToolContract {
            input_schema: ToolInputSchema {
                properties,
                ..ToolInputSchema::default()
            },
            tags: vec!["internal".to_string(), "debug".to_string()],
            idempotent: true,
            ..ToolContract::default()
        },
        response: ToolResponseSpec {
            schema: object(json!({
                "type": "object",
                "properties": {
                    "slept": {
                        "type": "boolean",
                        "description": "Whether the sleep completed"
                    },
                    "duration_ms": {
                        "type": "integer",
                        "description": "How long the handler actually slept"
                    }
                }
            })),
            format: "json".to_string(),
        },
        handler: Arc::new(SleepTool),
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Registers every builtin definition. Call once at startup, before the
/// registry is handed to the dispatcher.
pub fn register_builtins(registry: &InternalToolRegistry) -> Result<(), ConflictError> {
    registry.register(echo_def())?;
    registry.register(sleep_def())?;
    tracing::info!("registered builtin internal tools");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_contracts_are_valid() {
        for mut def in [echo_def(), sleep_def()] {
            def.contract.validate().unwrap();
        }
    }

    #[test]
    fn test_register_builtins_populates_registry() {
        let registry = InternalToolRegistry::new();
        register_builtins(&registry).unwrap();

        assert!(registry.contains("internal.echo"));
        assert!(registry.contains("internal.sleep"));
        let keys: Vec<String> = registry.list().into_iter().map(|d| d.key).collect();
        assert_eq!(keys, vec!["internal.echo", "internal.sleep"]);
    }

    #[tokio::test]
    async fn test_echo_prefixes_text() {
        let args = object(json!({"text": "hi", "prefix": "[SYSTEM] "}));
        let result = EchoTool.call(args).await.unwrap();
        assert_eq!(result, json!({"echoed": true, "text": "[SYSTEM] hi"}));

        // Without a prefix the text passes through untouched.
        let args = object(json!({"text": "plain"}));
        let result = EchoTool.call(args).await.unwrap();
        assert_eq!(result["text"], "plain");
    }

    #[tokio::test]
    async fn test_echo_requires_string_text() {
        let args = object(json!({"text": 42}));
        let err = EchoTool.call(args).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidArguments(_)));
    }

    // Paused clock: the runtime advances timers instantly, so the clamped
    // 60 s sleep does not stall the suite.
    #[tokio::test(start_paused = true)]
    async fn test_sleep_clamps_and_reports() {
        let args = object(json!({"duration_ms": 1}));
        let result = SleepTool.call(args).await.unwrap();
        assert_eq!(result, json!({"slept": true, "duration_ms": 1}));

        let args = object(json!({"duration_ms": 999_999_999u64}));
        let result = SleepTool.call(args).await.unwrap();
        assert_eq!(result["duration_ms"], MAX_SLEEP_MS);
    }
}

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

//! Transport dispatch for compiled tool calls.
//!
//! The dispatcher receives the reconstructed raw-name argument map and
//! routes it to the tool's endpoint: an outbound HTTP request, a remote
//! MCP server via the proxy client, or an in-process internal handler.
//! One shared connection pool serves all HTTP traffic.

use reqwest::Method;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use toolwright_core::{Tool, ToolEndpoint};

use crate::config::EngineConfig;
use crate::internal::InternalToolRegistry;
use crate::mcp::McpProxyClient;

/// Anything that can go wrong between a bound argument map and a result
/// value.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown internal tool '{0}'")]
    UnknownInternalTool(String),

    #[error("unsupported HTTP method '{0}'")]
    UnsupportedMethod(String),

    #[error("outbound request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("endpoint returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("remote MCP error {code}: {message}")]
    McpRemote { code: i64, message: String },

    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("internal tool failed: {0}")]
    InternalTool(String),
}

/// Routes argument maps to endpoints. Cheap to share behind an [`Arc`];
/// every compiled tool holds a handle to the same dispatcher.
pub struct Dispatcher {
    http: reqwest::Client,
    internal: Arc<InternalToolRegistry>,
    proxy: McpProxyClient,
    http_timeout: Duration,
}

impl Dispatcher {
    pub fn new(internal: Arc<InternalToolRegistry>, config: &EngineConfig) -> Self {
        let mut builder = reqwest::Client::builder().user_agent(config.http.user_agent.clone());
        if let Some(connect) = config.http.connect_timeout_secs {
            if let Ok(duration) = Duration::try_from_secs_f64(connect) {
                builder = builder.connect_timeout(duration);
            }
        }
        let http = builder.build().expect("Failed to create HTTP client");
        let proxy = McpProxyClient::new(
            http.clone(),
            duration_secs(config.mcp.timeout_secs, McpProxyClient::DEFAULT_TIMEOUT),
        );
        Self {
            http,
            internal,
            proxy,
            http_timeout: duration_secs(config.http.timeout_secs, Self::DEFAULT_TIMEOUT),
        }
    }

    /// Fallback per-call timeout when the config carries a value that
    /// cannot form a [`Duration`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    pub fn internal_registry(&self) -> &Arc<InternalToolRegistry> {
        &self.internal
    }

    /// Sends `args` to the tool's endpoint and returns the decoded result.
    pub async fn dispatch(
        &self,
        tool: &Tool,
        args: Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        match &tool.endpoint {
            ToolEndpoint::Http {
                url,
                method,
                headers,
                timeout,
            } => {
                self.dispatch_http(url, method, headers, *timeout, args)
                    .await
            }
            ToolEndpoint::Mcp {
                mcp_server,
                mcp_tool,
                headers,
                timeout,
            } => {
                self.proxy
                    .call_tool(mcp_server, mcp_tool, args, headers, *timeout)
                    .await
            }
            ToolEndpoint::Internal {
                target,
                static_inputs,
            } => self.dispatch_internal(target, static_inputs, args).await,
        }
    }

    /// GET and HEAD carry arguments as query parameters; every other verb
    /// sends them as a JSON body. A 2xx response decodes as JSON when the
    /// content type says so and as a plain string otherwise.
    async fn dispatch_http(
        &self,
        url: &str,
        method: &str,
        headers: &HashMap<String, String>,
        timeout: Option<f64>,
        args: Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        let method = parse_method(method)?;
        let timeout = timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(self.http_timeout);

        let mut request = self.http.request(method.clone(), url).timeout(timeout);
        if matches!(method, Method::GET | Method::HEAD) {
            let pairs: Vec<(String, String)> = args
                .iter()
                .map(|(key, value)| (key.clone(), query_value(value)))
                .collect();
            request = request.query(&pairs);
        } else {
            request = request.json(&args);
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(%url, method = %method, "dispatching http tool call");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let json_body = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ctype| ctype.contains("application/json"));
        if json_body {
            Ok(response.json().await?)
        } else {
            Ok(Value::String(response.text().await?))
        }
    }

    /// Endpoint `static_inputs` are overlaid last, so a caller can never
    /// displace a value the tool was saved with.
    async fn dispatch_internal(
        &self,
        target: &str,
        static_inputs: &Map<String, Value>,
        args: Map<String, Value>,
    ) -> Result<Value, DispatchError> {
        let def = self
            .internal
            .get(target)
            .map_err(|_| DispatchError::UnknownInternalTool(target.to_string()))?;

        let mut merged = args;
        for (key, value) in static_inputs {
            merged.insert(key.clone(), value.clone());
        }
        tracing::debug!(target, "dispatching internal tool call");
        def.handler.call(merged).await
    }
}

/// Endpoint validation pins methods to [`toolwright_core::HTTP_METHODS`],
/// so the fallthrough only fires for records that bypassed it.
fn parse_method(method: &str) -> Result<Method, DispatchError> {
    match method {
        "GET" => Ok(Method::GET),
        "POST" => Ok(Method::POST),
        "PUT" => Ok(Method::PUT),
        "PATCH" => Ok(Method::PATCH),
        "DELETE" => Ok(Method::DELETE),
        "HEAD" => Ok(Method::HEAD),
        "OPTIONS" => Ok(Method::OPTIONS),
        other => Err(DispatchError::UnsupportedMethod(other.to_string())),
    }
}

/// Strings pass through untouched; everything else renders as its JSON
/// text, which keeps scalars natural ("3", "true") and compounds parseable.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn duration_secs(secs: f64, fallback: Duration) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::{register_builtins, InternalToolDef, InternalToolHandler};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;
    use toolwright_core::{ToolContract, ToolResponseSpec};

    fn dispatcher_with_builtins() -> Dispatcher {
        let registry = Arc::new(InternalToolRegistry::new());
        register_builtins(&registry).unwrap();
        Dispatcher::new(registry, &EngineConfig::default())
    }

    fn internal_tool(target: &str, static_inputs: Value) -> Tool {
        serde_json::from_value(json!({
            "id": "9f0bdc75-96c2-4b3e-9e0a-1f6dfd9f6c0b",
            "name": "dispatch_under_test",
            "enabled": true,
            "endpoint": {
                "transport": "internal",
                "target": target,
                "static_inputs": static_inputs
            },
            "contract": {"input_schema": {"type": "object"}},
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    struct CaptureHandler {
        seen: Mutex<Option<Map<String, Value>>>,
    }

    #[async_trait]
    impl InternalToolHandler for CaptureHandler {
        async fn call(&self, args: Map<String, Value>) -> Result<Value, DispatchError> {
            *self.seen.lock() = Some(args);
            Ok(json!({"ok": true}))
        }
    }

    #[test]
    fn test_query_value_shapes() {
        assert_eq!(query_value(&json!("plain")), "plain");
        assert_eq!(query_value(&json!(3)), "3");
        assert_eq!(query_value(&json!(2.5)), "2.5");
        assert_eq!(query_value(&json!(true)), "true");
        assert_eq!(query_value(&json!([1, "a"])), r#"[1,"a"]"#);
        assert_eq!(query_value(&json!({"k": 1})), r#"{"k":1}"#);
    }

    #[test]
    fn test_parse_method_rejects_unknown_verbs() {
        assert_eq!(parse_method("GET").unwrap(), Method::GET);
        assert_eq!(parse_method("DELETE").unwrap(), Method::DELETE);
        let err = parse_method("BREW").unwrap_err();
        assert!(matches!(err, DispatchError::UnsupportedMethod(ref m) if m == "BREW"));
    }

    #[test]
    fn test_duration_secs_falls_back_on_bad_values() {
        assert_eq!(duration_secs(2.0, Duration::from_secs(15)), Duration::from_secs(2));
        assert_eq!(duration_secs(-1.0, Duration::from_secs(15)), Duration::from_secs(15));
        assert_eq!(
            duration_secs(f64::NAN, Duration::from_secs(15)),
            Duration::from_secs(15)
        );
    }

    #[tokio::test]
    async fn test_internal_dispatch_reaches_handler() {
        let dispatcher = dispatcher_with_builtins();
        let tool = internal_tool("internal.echo", json!({}));

        let mut args = Map::new();
        args.insert("text".to_string(), json!("hello"));
        args.insert("prefix".to_string(), json!(">> "));
        let result = dispatcher.dispatch(&tool, args).await.unwrap();
        assert_eq!(result["text"], ">> hello");
    }

    #[tokio::test]
    async fn test_internal_dispatch_static_inputs_win() {
        let registry = Arc::new(InternalToolRegistry::new());
        let capture = Arc::new(CaptureHandler {
            seen: Mutex::new(None),
        });
        registry
            .register(InternalToolDef {
                key: "internal.capture".to_string(),
                contract: ToolContract::default(),
                response: ToolResponseSpec::default(),
                handler: capture.clone(),
            })
            .unwrap();
        let dispatcher = Dispatcher::new(registry, &EngineConfig::default());
        let tool = internal_tool("internal.capture", json!({"prefix": "locked "}));

        let mut args = Map::new();
        args.insert("text".to_string(), json!("hi"));
        args.insert("prefix".to_string(), json!("caller "));
        dispatcher.dispatch(&tool, args).await.unwrap();

        let seen = capture.seen.lock().clone().unwrap();
        assert_eq!(seen["prefix"], json!("locked "));
        assert_eq!(seen["text"], json!("hi"));
    }

    #[tokio::test]
    async fn test_internal_dispatch_unknown_target() {
        let dispatcher = dispatcher_with_builtins();
        let tool = internal_tool("internal.missing", json!({}));

        let err = dispatcher.dispatch(&tool, Map::new()).await.unwrap_err();
        assert!(
            matches!(err, DispatchError::UnknownInternalTool(ref key) if key == "internal.missing")
        );
    }
}

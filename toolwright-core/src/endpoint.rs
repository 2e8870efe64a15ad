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

//! Transport descriptors: how a tool is actually invoked.
//!
//! The endpoint is a tagged union keyed on `transport`, one struct variant
//! per transport, so a field that is meaningless for a given transport
//! cannot be expressed at all. Deserializing an unknown transport fails
//! outright rather than producing a half-formed descriptor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::contract::ToolContract;
use crate::error::ValidationError;

/// Methods accepted on http endpoints, post-normalization.
pub const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// How a dispatched call reaches its implementation.
///
/// Wire shape is a flat object carrying `"transport"` plus the variant's
/// fields, e.g. `{"transport": "http", "url": ..., "method": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum ToolEndpoint {
    /// A single outbound HTTP request.
    Http {
        url: String,
        method: String,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
        /// Seconds; the dispatcher's configured default applies when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<f64>,
    },
    /// A proxied `tools/call` against a remote MCP server.
    Mcp {
        mcp_server: String,
        mcp_tool: String,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timeout: Option<f64>,
    },
    /// A call into the process-local internal tool registry.
    Internal {
        /// Key of the registered internal tool.
        target: String,
        /// Values injected at dispatch time for `x_static` properties;
        /// they win over caller-supplied arguments on key collision.
        #[serde(default, skip_serializing_if = "Map::is_empty")]
        static_inputs: Map<String, Value>,
    },
}

impl ToolEndpoint {
    /// The wire tag for this variant.
    pub fn transport(&self) -> &'static str {
        match self {
            ToolEndpoint::Http { .. } => "http",
            ToolEndpoint::Mcp { .. } => "mcp",
            ToolEndpoint::Internal { .. } => "internal",
        }
    }

    /// Per-transport field validation. Normalizes `method` to upper-case in
    /// place before checking it against [`HTTP_METHODS`]; rejects empty
    /// header names, blank required fields, and timeouts no [`Duration`]
    /// could represent.
    ///
    /// [`Duration`]: std::time::Duration
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        match self {
            ToolEndpoint::Http {
                url,
                method,
                headers,
                timeout,
            } => {
                if url.trim().is_empty() || method.trim().is_empty() {
                    return Err(ValidationError::new(
                        "For transport='http', 'url' and 'method' are required.",
                    ));
                }
                *method = method.to_ascii_uppercase();
                if !HTTP_METHODS.contains(&method.as_str()) {
                    return Err(ValidationError::new(format!(
                        "Unsupported HTTP method '{method}'"
                    )));
                }
                validate_timeout(*timeout)?;
                validate_headers(headers)
            }
            ToolEndpoint::Mcp {
                mcp_server,
                mcp_tool,
                headers,
                timeout,
            } => {
                if mcp_server.trim().is_empty() || mcp_tool.trim().is_empty() {
                    return Err(ValidationError::new(
                        "For transport='mcp', 'mcp_server' and 'mcp_tool' are required.",
                    ));
                }
                validate_timeout(*timeout)?;
                validate_headers(headers)
            }
            ToolEndpoint::Internal { target, .. } => {
                if target.trim().is_empty() {
                    return Err(ValidationError::new(
                        "For transport='internal', 'target' is required.",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Endpoint/contract cross-check: internal `static_inputs` may only
    /// name properties the contract marks `x_static`.
    pub fn validate_against(&self, contract: &ToolContract) -> Result<(), ValidationError> {
        if let ToolEndpoint::Internal { static_inputs, .. } = self {
            let non_static: Vec<&str> = static_inputs
                .keys()
                .filter(|key| {
                    !contract
                        .input_schema
                        .properties
                        .get(key.as_str())
                        .is_some_and(|prop| prop.takes_static_input())
                })
                .map(String::as_str)
                .collect();
            if !non_static.is_empty() {
                return Err(ValidationError::new(format!(
                    "static_inputs contains non-static keys: {non_static:?}"
                )));
            }
        }
        Ok(())
    }
}

fn validate_headers(headers: &HashMap<String, String>) -> Result<(), ValidationError> {
    if headers.keys().any(|name| name.trim().is_empty()) {
        return Err(ValidationError::new("Header names cannot be empty."));
    }
    Ok(())
}

fn validate_timeout(timeout: Option<f64>) -> Result<(), ValidationError> {
    if let Some(secs) = timeout {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(ValidationError::new(
                "'timeout' must be a positive number of seconds.",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint(raw: Value) -> ToolEndpoint {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_transport_tag_round_trip() {
        let http = endpoint(json!({
            "transport": "http",
            "url": "https://api.example.com/search",
            "method": "get"
        }));
        assert_eq!(http.transport(), "http");
        let wire = serde_json::to_value(&http).unwrap();
        assert_eq!(wire["transport"], "http");
        assert_eq!(wire["url"], "https://api.example.com/search");
        assert!(wire.get("headers").is_none());

        let internal = endpoint(json!({
            "transport": "internal",
            "target": "internal.echo",
            "static_inputs": {"prefix": "[SYSTEM] "}
        }));
        assert_eq!(internal.transport(), "internal");
    }

    #[test]
    fn test_unknown_transport_rejected() {
        let result: Result<ToolEndpoint, _> = serde_json::from_value(json!({
            "transport": "carrier-pigeon",
            "url": "https://example.com"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_method_normalized_and_checked() {
        let mut ep = endpoint(json!({
            "transport": "http",
            "url": "https://example.com",
            "method": "post"
        }));
        ep.validate().unwrap();
        match &ep {
            ToolEndpoint::Http { method, .. } => assert_eq!(method, "POST"),
            _ => unreachable!(),
        }

        let mut bad = endpoint(json!({
            "transport": "http",
            "url": "https://example.com",
            "method": "FETCH"
        }));
        assert_eq!(
            bad.validate().unwrap_err().message(),
            "Unsupported HTTP method 'FETCH'"
        );
    }

    #[test]
    fn test_required_fields_per_transport() {
        let mut blank_url = endpoint(json!({
            "transport": "http",
            "url": "  ",
            "method": "GET"
        }));
        assert!(blank_url.validate().is_err());

        let mut blank_mcp = endpoint(json!({
            "transport": "mcp",
            "mcp_server": "https://mcp.example.com",
            "mcp_tool": ""
        }));
        assert!(blank_mcp.validate().is_err());

        let mut blank_target = endpoint(json!({
            "transport": "internal",
            "target": ""
        }));
        assert!(blank_target.validate().is_err());
    }

    #[test]
    fn test_timeout_must_be_positive_and_finite() {
        let mut ok = endpoint(json!({
            "transport": "http",
            "url": "https://example.com",
            "method": "GET",
            "timeout": 2.5
        }));
        assert!(ok.validate().is_ok());

        let mut negative = endpoint(json!({
            "transport": "mcp",
            "mcp_server": "https://mcp.example.com",
            "mcp_tool": "search",
            "timeout": -1
        }));
        assert_eq!(
            negative.validate().unwrap_err().message(),
            "'timeout' must be a positive number of seconds."
        );

        let mut zero = endpoint(json!({
            "transport": "http",
            "url": "https://example.com",
            "method": "GET",
            "timeout": 0
        }));
        assert!(zero.validate().is_err());

        let mut nan = ToolEndpoint::Http {
            url: "https://example.com".to_string(),
            method: "GET".to_string(),
            headers: HashMap::new(),
            timeout: Some(f64::NAN),
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_empty_header_names_rejected() {
        let mut ep = endpoint(json!({
            "transport": "http",
            "url": "https://example.com",
            "method": "GET",
            "headers": {" ": "v"}
        }));
        assert_eq!(
            ep.validate().unwrap_err().message(),
            "Header names cannot be empty."
        );
    }

    #[test]
    fn test_static_inputs_must_target_static_properties() {
        let contract: ToolContract = serde_json::from_value(json!({
            "input_schema": {
                "type": "object",
                "properties": {
                    "text": {"type": "string"},
                    "prefix": {"type": "string", "x_static": true, "default": "[SYSTEM] "}
                },
                "required": ["text"]
            }
        }))
        .unwrap();

        let ok = endpoint(json!({
            "transport": "internal",
            "target": "internal.echo",
            "static_inputs": {"prefix": ">> "}
        }));
        assert!(ok.validate_against(&contract).is_ok());

        let bad = endpoint(json!({
            "transport": "internal",
            "target": "internal.echo",
            "static_inputs": {"text": "nope"}
        }));
        assert_eq!(
            bad.validate_against(&contract).unwrap_err().message(),
            "static_inputs contains non-static keys: [\"text\"]"
        );
    }
}

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

//! Outbound proxy for tools bound to a remote MCP server.
//!
//! One `tools/call` request per invocation over plain HTTP POST. The proxy
//! shares the dispatcher's connection pool and hands transport, envelope,
//! and remote-error failures back as [`DispatchError`] variants.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::dispatch::DispatchError;
use crate::mcp::protocol::{JsonRpcId, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};

pub struct McpProxyClient {
    http: reqwest::Client,
    default_timeout: Duration,
    request_counter: AtomicI64,
}

impl McpProxyClient {
    /// Per-call timeout when neither the endpoint nor the config sets one.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(http: reqwest::Client, default_timeout: Duration) -> Self {
        Self {
            http,
            default_timeout,
            request_counter: AtomicI64::new(0),
        }
    }

    fn next_id(&self) -> JsonRpcId {
        JsonRpcId::Number(self.request_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// POSTs a `tools/call` request and unwraps the JSON-RPC envelope.
    ///
    /// A non-2xx response fails before the body is read; a 2xx body that
    /// is not a JSON-RPC envelope, or one that carries neither `result`
    /// nor `error`, is a protocol error.
    pub async fn call_tool(
        &self,
        server_url: &str,
        tool: &str,
        arguments: Map<String, Value>,
        headers: &HashMap<String, String>,
        timeout: Option<f64>,
    ) -> Result<Value, DispatchError> {
        let request = JsonRpcRequest::tools_call(tool, &arguments, self.next_id());
        let timeout = timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(self.default_timeout);

        let mut outbound = self
            .http
            .post(server_url)
            .timeout(timeout)
            .header("MCP-Protocol-Version", MCP_PROTOCOL_VERSION)
            .json(&request);
        for (name, value) in headers {
            outbound = outbound.header(name.as_str(), value.as_str());
        }

        tracing::debug!(server = %server_url, tool, "proxying tools/call");
        let response = outbound.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::HttpStatus {
                status: status.as_u16(),
                url: server_url.to_string(),
            });
        }

        let envelope: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| DispatchError::McpProtocol(format!("invalid JSON-RPC envelope: {e}")))?;
        if let Some(error) = envelope.error {
            return Err(DispatchError::McpRemote {
                code: error.code,
                message: error.message,
            });
        }
        envelope.result.ok_or_else(|| {
            DispatchError::McpProtocol("response carries neither result nor error".to_string())
        })
    }
}

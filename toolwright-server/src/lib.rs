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

//! The Toolwright engine: compiles data-defined tool contracts into
//! callable tools and keeps them registered on a live protocol host.
//!
//! The pieces compose in one direction:
//!
//! - [`service::ToolService`] owns the write path for tool records,
//! - [`store::ToolStore`] persists them,
//! - [`sync::ToolSyncEngine`] pushes every change to the host,
//! - [`compiler::ToolCompiler`] turns a record into a callable signature,
//! - [`dispatch::Dispatcher`] routes calls to HTTP, MCP, or internal
//!   endpoints,
//! - [`host::InProcessToolHost`] is the registration and call surface.
//!
//! Internal (in-process) tools live in [`internal`], remote MCP plumbing
//! in [`mcp`].

pub mod compiler;
pub mod config;
pub mod dispatch;
pub mod host;
pub mod internal;
pub mod mcp;
pub mod service;
pub mod store;
pub mod sync;
pub mod telemetry;

pub use compiler::{CompiledTool, ParamSpec, SemanticType, ToolCompiler};
pub use config::{EngineConfig, HttpConfig, LogConfig, McpConfig};
pub use dispatch::{DispatchError, Dispatcher};
pub use host::{HostError, HostedTool, HostedToolDescriptor, InProcessToolHost, ToolHost};
pub use internal::{
    register_builtins, InternalToolDef, InternalToolHandler, InternalToolRegistry,
};
pub use mcp::{McpProxyClient, MCP_PROTOCOL_VERSION};
pub use service::{InternalToolInfo, ServiceError, ToolService};
pub use store::{MemoryToolStore, StoreError, ToolStore};
pub use sync::ToolSyncEngine;
pub use telemetry::init_tracing;

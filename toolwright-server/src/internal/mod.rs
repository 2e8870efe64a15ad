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

//! Internal Tool Registry
//!
//! Process-wide mapping of internal tool keys to their definitions:
//! a contract, a response descriptor, and a Rust-native handler invoked
//! directly by the dispatcher without any network hop.
//!
//! The registry is built explicitly at startup ([`builtins::register_builtins`]
//! plus whatever the embedder adds) and passed to the dispatcher by `Arc`.
//! Keys are write-once: registering a duplicate is a conflict, and nothing
//! is ever removed at runtime.

pub mod builtins;

pub use builtins::register_builtins;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::sync::Arc;

use toolwright_core::{ConflictError, NotFoundError, ToolContract, ToolResponseSpec};

use crate::dispatch::DispatchError;

/// Implementation side of an internal tool.
///
/// Receives the merged argument object (caller arguments overlaid with the
/// endpoint's baked `static_inputs`, statics winning on collision) under the
/// contract's raw property names.
#[async_trait]
pub trait InternalToolHandler: Send + Sync {
    async fn call(&self, args: Map<String, Value>) -> Result<Value, DispatchError>;
}

/// A registered internal tool: key, callable surface, and implementation.
///
/// The contract and response descriptor stored here are authoritative; the
/// tool service copies them onto every persisted tool that targets this key.
#[derive(Clone)]
pub struct InternalToolDef {
    pub key: String,
    pub contract: ToolContract,
    pub response: ToolResponseSpec,
    pub handler: Arc<dyn InternalToolHandler>,
}

impl std::fmt::Debug for InternalToolDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalToolDef")
            .field("key", &self.key)
            .field("contract", &self.contract)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}

/// Write-once registry of internal tools, read-heavy after startup.
#[derive(Default)]
pub struct InternalToolRegistry {
    tools: RwLock<IndexMap<String, InternalToolDef>>,
}

impl InternalToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition under its key. Re-registering an existing key
    /// is a conflict; there is no overwrite path.
    pub fn register(&self, def: InternalToolDef) -> Result<(), ConflictError> {
        let mut tools = self.tools.write();
        if tools.contains_key(&def.key) {
            return Err(ConflictError::new("Internal tool", "key", &def.key));
        }
        tracing::debug!(key = %def.key, "registered internal tool");
        tools.insert(def.key.clone(), def);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<InternalToolDef, NotFoundError> {
        self.tools
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| NotFoundError::new("Internal tool", key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tools.read().contains_key(key)
    }

    /// All definitions, in registration order.
    pub fn list(&self) -> Vec<InternalToolDef> {
        self.tools.read().values().cloned().collect()
    }
}

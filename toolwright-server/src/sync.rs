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

//! Keeps the protocol host in step with the store.
//!
//! The rule is remove-then-register: an upsert always unregisters the
//! current compilation first, so the host never carries two generations of
//! the same tool and a disable is just an upsert that stops after the
//! removal.

use std::sync::Arc;

use toolwright_core::Tool;

use crate::compiler::ToolCompiler;
use crate::dispatch::Dispatcher;
use crate::host::{HostError, ToolHost};
use crate::store::ToolStore;

pub struct ToolSyncEngine {
    host: Arc<dyn ToolHost>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn ToolStore>,
}

impl ToolSyncEngine {
    pub fn new(
        host: Arc<dyn ToolHost>,
        dispatcher: Arc<Dispatcher>,
        store: Arc<dyn ToolStore>,
    ) -> Self {
        Self {
            host,
            dispatcher,
            store,
        }
    }

    /// Unregisters `name` if it is currently registered. Safe to call for
    /// names the host has never seen.
    pub fn remove(&self, name: &str) {
        if self.host.list_registered().contains(name) {
            self.host.unregister(name);
            tracing::debug!(tool = name, "removed tool from host");
        }
    }

    /// Removes any existing registration, then compiles and registers the
    /// record if it is enabled. The host always reflects the record's
    /// latest state after this returns.
    pub fn upsert(&self, tool: &Tool) -> Result<(), HostError> {
        self.remove(&tool.name);
        if !tool.enabled {
            tracing::debug!(tool = %tool.name, "tool disabled, not registering");
            return Ok(());
        }

        let compiled = ToolCompiler::compile(Arc::new(tool.clone()), self.dispatcher.clone());
        self.host.register(Arc::new(compiled))?;
        tracing::info!(
            tool = %tool.name,
            transport = tool.endpoint.transport(),
            "registered tool with host"
        );
        Ok(())
    }

    /// Registers every enabled record in the store, typically once at
    /// startup. Returns how many tools were registered.
    pub async fn sync_all_enabled(&self) -> Result<usize, HostError> {
        let tools = self.store.list_enabled_tools().await;
        let mut count = 0;
        for tool in &tools {
            self.upsert(tool)?;
            count += 1;
        }
        tracing::info!(count, "synced enabled tools");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::host::InProcessToolHost;
    use crate::internal::{register_builtins, InternalToolRegistry};
    use crate::store::MemoryToolStore;
    use serde_json::json;
    use uuid::Uuid;

    fn engine() -> (ToolSyncEngine, Arc<InProcessToolHost>, Arc<MemoryToolStore>) {
        let registry = Arc::new(InternalToolRegistry::new());
        register_builtins(&registry).unwrap();
        let dispatcher = Arc::new(Dispatcher::new(registry, &EngineConfig::default()));
        let host = Arc::new(InProcessToolHost::new());
        let store = Arc::new(MemoryToolStore::new());
        let sync = ToolSyncEngine::new(host.clone(), dispatcher, store.clone());
        (sync, host, store)
    }

    fn echo_record(name: &str, enabled: bool) -> Tool {
        serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "name": name,
            "enabled": enabled,
            "endpoint": {"transport": "internal", "target": "internal.echo"},
            "contract": {
                "input_schema": {
                    "type": "object",
                    "properties": {"text": {"type": "string"}},
                    "required": ["text"]
                }
            },
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_upsert_registers_enabled_tool() {
        let (sync, host, _) = engine();
        sync.upsert(&echo_record("say", true)).unwrap();
        assert!(host.list_registered().contains("say"));

        let result = host.call_tool("say", json!({"text": "hi"})).await.unwrap();
        assert_eq!(result["echoed"], true);
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_registration() {
        let (sync, host, _) = engine();
        let mut tool = echo_record("say", true);
        sync.upsert(&tool).unwrap();

        tool.description = Some("updated description".to_string());
        sync.upsert(&tool).unwrap();

        let defs = host.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].description.as_deref(), Some("updated description"));
    }

    #[tokio::test]
    async fn test_upsert_disabled_tool_unregisters() {
        let (sync, host, _) = engine();
        let mut tool = echo_record("say", true);
        sync.upsert(&tool).unwrap();
        assert!(host.list_registered().contains("say"));

        tool.enabled = false;
        sync.upsert(&tool).unwrap();
        assert!(!host.list_registered().contains("say"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (sync, host, _) = engine();
        sync.upsert(&echo_record("say", true)).unwrap();

        sync.remove("say");
        sync.remove("say");
        sync.remove("never_registered");
        assert!(host.list_registered().is_empty());
    }

    #[tokio::test]
    async fn test_sync_all_enabled_skips_disabled_records() {
        let (sync, host, store) = engine();
        store.insert_tool(echo_record("a", true)).await.unwrap();
        store.insert_tool(echo_record("b", false)).await.unwrap();
        store.insert_tool(echo_record("c", true)).await.unwrap();

        let count = sync.sync_all_enabled().await.unwrap();
        assert_eq!(count, 2);
        let registered = host.list_registered();
        assert!(registered.contains("a"));
        assert!(!registered.contains("b"));
        assert!(registered.contains("c"));
    }
}

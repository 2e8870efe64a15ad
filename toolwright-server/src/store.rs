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

//! Persistence port for tool records, plus the in-memory implementation.
//!
//! The store owns the uniqueness invariants: one record per id, one record
//! per name. Callers get snapshots, never live references.

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use toolwright_core::{ConflictError, NotFoundError, Tool};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

/// What the service and sync engine need from persistence. Reads return
/// owned snapshots; writes are atomic per call.
#[async_trait]
pub trait ToolStore: Send + Sync {
    async fn get_tool(&self, id: Uuid) -> Option<Tool>;
    async fn get_tool_by_name(&self, name: &str) -> Option<Tool>;
    /// All records, in insertion order.
    async fn list_tools(&self) -> Vec<Tool>;
    async fn list_enabled_tools(&self) -> Vec<Tool>;
    async fn insert_tool(&self, tool: Tool) -> Result<(), StoreError>;
    /// Replaces the record with the same id; renames keep the name index
    /// consistent.
    async fn update_tool(&self, tool: Tool) -> Result<(), StoreError>;
    /// Returns whether a record was removed.
    async fn delete_tool(&self, id: Uuid) -> bool;
}

#[derive(Default)]
struct StoreInner {
    by_id: IndexMap<Uuid, Tool>,
    by_name: HashMap<String, Uuid>,
}

/// Process-local store. A single lock guards both indexes, so every write
/// observes and preserves both invariants at once.
#[derive(Default)]
pub struct MemoryToolStore {
    inner: RwLock<StoreInner>,
}

impl MemoryToolStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ToolStore for MemoryToolStore {
    async fn get_tool(&self, id: Uuid) -> Option<Tool> {
        self.inner.read().by_id.get(&id).cloned()
    }

    async fn get_tool_by_name(&self, name: &str) -> Option<Tool> {
        let inner = self.inner.read();
        inner
            .by_name
            .get(name)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
    }

    async fn list_tools(&self) -> Vec<Tool> {
        self.inner.read().by_id.values().cloned().collect()
    }

    async fn list_enabled_tools(&self) -> Vec<Tool> {
        self.inner
            .read()
            .by_id
            .values()
            .filter(|tool| tool.enabled)
            .cloned()
            .collect()
    }

    async fn insert_tool(&self, tool: Tool) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(&tool.id) {
            return Err(ConflictError::new("Tool", "id", tool.id.to_string()).into());
        }
        if inner.by_name.contains_key(&tool.name) {
            return Err(ConflictError::new("Tool", "name", &tool.name).into());
        }
        inner.by_name.insert(tool.name.clone(), tool.id);
        inner.by_id.insert(tool.id, tool);
        Ok(())
    }

    async fn update_tool(&self, tool: Tool) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let previous_name = match inner.by_id.get(&tool.id) {
            Some(existing) => existing.name.clone(),
            None => return Err(NotFoundError::new("Tool", tool.id.to_string()).into()),
        };
        if let Some(other) = inner.by_name.get(&tool.name) {
            if *other != tool.id {
                return Err(ConflictError::new("Tool", "name", &tool.name).into());
            }
        }
        if previous_name != tool.name {
            inner.by_name.remove(&previous_name);
            inner.by_name.insert(tool.name.clone(), tool.id);
        }
        inner.by_id.insert(tool.id, tool);
        Ok(())
    }

    async fn delete_tool(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write();
        match inner.by_id.shift_remove(&id) {
            Some(tool) => {
                inner.by_name.remove(&tool.name);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str, enabled: bool) -> Tool {
        serde_json::from_value(json!({
            "id": Uuid::new_v4().to_string(),
            "name": name,
            "enabled": enabled,
            "endpoint": {"transport": "internal", "target": "internal.echo"},
            "contract": {"input_schema": {"type": "object"}},
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_enforces_name_uniqueness() {
        let store = MemoryToolStore::new();
        store.insert_tool(record("alpha", true)).await.unwrap();

        let err = store.insert_tool(record("alpha", true)).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(err.to_string(), "Tool with name 'alpha' already exists");
    }

    #[tokio::test]
    async fn test_update_moves_name_index_on_rename() {
        let store = MemoryToolStore::new();
        let mut tool = record("old_name", true);
        store.insert_tool(tool.clone()).await.unwrap();

        tool.name = "new_name".to_string();
        store.update_tool(tool.clone()).await.unwrap();

        assert!(store.get_tool_by_name("old_name").await.is_none());
        assert_eq!(
            store.get_tool_by_name("new_name").await.map(|t| t.id),
            Some(tool.id)
        );
    }

    #[tokio::test]
    async fn test_update_rejects_rename_onto_existing_name() {
        let store = MemoryToolStore::new();
        store.insert_tool(record("alpha", true)).await.unwrap();
        let mut beta = record("beta", true);
        store.insert_tool(beta.clone()).await.unwrap();

        beta.name = "alpha".to_string();
        let err = store.update_tool(beta).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let store = MemoryToolStore::new();
        let err = store.update_tool(record("ghost", true)).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_listing_and_delete() {
        let store = MemoryToolStore::new();
        store.insert_tool(record("a", true)).await.unwrap();
        store.insert_tool(record("b", false)).await.unwrap();
        store.insert_tool(record("c", true)).await.unwrap();

        let all: Vec<String> = store.list_tools().await.into_iter().map(|t| t.name).collect();
        assert_eq!(all, vec!["a", "b", "c"]);

        let enabled: Vec<String> = store
            .list_enabled_tools()
            .await
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(enabled, vec!["a", "c"]);

        let id = store.get_tool_by_name("b").await.unwrap().id;
        assert!(store.delete_tool(id).await);
        assert!(!store.delete_tool(id).await);
        assert!(store.get_tool_by_name("b").await.is_none());
    }
}

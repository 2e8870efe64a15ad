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

//! Write path for tool records.
//!
//! Every mutation flows through here: validate, persist, then push the
//! change to the protocol host through the sync engine. Internal-transport
//! tools are special-cased, their contract and response shape come from
//! the internal registry definition, never from the caller, and their
//! static inputs are resolved and validated once at save time ("baked")
//! so compile and dispatch never have to.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use toolwright_core::{
    validate_value, ConflictError, NewTool, NotFoundError, Tool, ToolContract, ToolEndpoint,
    ToolPatch, ToolResponseSpec, ValidationError,
};

use crate::host::HostError;
use crate::internal::InternalToolRegistry;
use crate::store::{StoreError, ToolStore};
use crate::sync::ToolSyncEngine;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Host(#[from] HostError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(e) => ServiceError::Conflict(e),
            StoreError::NotFound(e) => ServiceError::NotFound(e),
        }
    }
}

/// One internal definition as the listing surface shows it.
#[derive(Debug, Clone, Serialize)]
pub struct InternalToolInfo {
    pub key: String,
    pub contract: ToolContract,
    pub response: ToolResponseSpec,
}

pub struct ToolService {
    store: Arc<dyn ToolStore>,
    sync: Arc<ToolSyncEngine>,
    internal: Arc<InternalToolRegistry>,
}

impl ToolService {
    pub fn new(
        store: Arc<dyn ToolStore>,
        sync: Arc<ToolSyncEngine>,
        internal: Arc<InternalToolRegistry>,
    ) -> Self {
        Self {
            store,
            sync,
            internal,
        }
    }

    /// Creates a record, persists it, and registers it with the host.
    ///
    /// Internal transports take neither a contract nor a response from the
    /// caller; both come from the registry definition, and the endpoint's
    /// `static_inputs` are baked against it.
    pub async fn create_tool(&self, payload: NewTool) -> Result<Tool, ServiceError> {
        let NewTool {
            name,
            description,
            enabled,
            endpoint,
            contract,
            response,
        } = payload;

        if self.store.get_tool_by_name(&name).await.is_some() {
            return Err(ConflictError::new("Tool", "name", &name).into());
        }

        let (endpoint, contract, response) = match endpoint {
            ToolEndpoint::Internal {
                target,
                static_inputs,
            } => {
                if contract.is_some() {
                    return Err(ValidationError::new(
                        "Cannot provide contract for internal tools.",
                    )
                    .into());
                }
                if response.is_some() {
                    return Err(ValidationError::new(
                        "Cannot provide response model for internal tools.",
                    )
                    .into());
                }
                let (contract, response, baked) = self.bake_internal(&target, &static_inputs)?;
                (
                    ToolEndpoint::Internal {
                        target,
                        static_inputs: baked,
                    },
                    contract,
                    response,
                )
            }
            endpoint @ ToolEndpoint::Http { .. } => (
                endpoint,
                contract.unwrap_or_default(),
                response.unwrap_or_default(),
            ),
            ToolEndpoint::Mcp { .. } => {
                return Err(
                    ValidationError::new("MCP tool creation is not supported yet").into(),
                );
            }
        };

        let now = Utc::now();
        let mut tool = Tool {
            id: Uuid::new_v4(),
            name,
            description,
            enabled,
            endpoint,
            contract,
            response,
            created_at: now,
            updated_at: now,
        };
        tool.validate()?;

        self.store.insert_tool(tool.clone()).await?;
        self.sync.upsert(&tool)?;
        tracing::info!(
            tool = %tool.name,
            transport = tool.endpoint.transport(),
            "created tool"
        );
        Ok(tool)
    }

    /// Applies a partial update, persists it, and re-registers the tool.
    ///
    /// A rename unregisters the previous name first, so the host never
    /// keeps a stale registration around. Swapping the endpoint of an
    /// internal tool re-bakes contract, response, and static inputs from
    /// the registry definition.
    pub async fn update_tool(&self, id: Uuid, patch: ToolPatch) -> Result<Tool, ServiceError> {
        let mut tool = self
            .store
            .get_tool(id)
            .await
            .ok_or_else(|| NotFoundError::new("Tool", id.to_string()))?;
        let previous_name = tool.name.clone();

        if let Some(name) = patch.name {
            if name != tool.name && self.store.get_tool_by_name(&name).await.is_some() {
                return Err(ConflictError::new("Tool", "name", &name).into());
            }
            tool.name = name;
        }
        if let Some(description) = patch.description {
            tool.description = Some(description);
        }
        if let Some(enabled) = patch.enabled {
            tool.enabled = enabled;
        }

        let mut rebake: Option<(String, Map<String, Value>)> = None;
        if let Some(endpoint) = patch.endpoint {
            if let ToolEndpoint::Internal {
                target,
                static_inputs,
            } = &endpoint
            {
                rebake = Some((target.clone(), static_inputs.clone()));
            }
            tool.endpoint = endpoint;
        }

        if matches!(tool.endpoint, ToolEndpoint::Internal { .. }) {
            if patch.contract.is_some() {
                return Err(
                    ValidationError::new("Cannot provide contract for internal tools.").into(),
                );
            }
            if patch.response.is_some() {
                return Err(ValidationError::new(
                    "Cannot provide response model for internal tools.",
                )
                .into());
            }
            if let Some((target, provided)) = rebake {
                let (contract, response, baked) = self.bake_internal(&target, &provided)?;
                tool.endpoint = ToolEndpoint::Internal {
                    target,
                    static_inputs: baked,
                };
                tool.contract = contract;
                tool.response = response;
            }
        } else {
            if let Some(contract) = patch.contract {
                tool.contract = contract;
            }
            if let Some(response) = patch.response {
                tool.response = response;
            }
        }

        tool.updated_at = Utc::now();
        tool.validate()?;
        self.store.update_tool(tool.clone()).await?;

        if previous_name != tool.name {
            self.sync.remove(&previous_name);
        }
        self.sync.upsert(&tool)?;
        tracing::info!(tool = %tool.name, "updated tool");
        Ok(tool)
    }

    /// Deletes the record and unregisters it from the host.
    pub async fn delete_tool(&self, id: Uuid) -> Result<(), ServiceError> {
        let tool = self
            .store
            .get_tool(id)
            .await
            .ok_or_else(|| NotFoundError::new("Tool", id.to_string()))?;
        self.store.delete_tool(id).await;
        self.sync.remove(&tool.name);
        tracing::info!(tool = %tool.name, "deleted tool");
        Ok(())
    }

    pub async fn get_tool(&self, id: Uuid) -> Result<Tool, ServiceError> {
        let tool = self
            .store
            .get_tool(id)
            .await
            .ok_or_else(|| NotFoundError::new("Tool", id.to_string()))?;
        Ok(tool)
    }

    pub async fn get_tool_by_name(&self, name: &str) -> Result<Tool, ServiceError> {
        let tool = self
            .store
            .get_tool_by_name(name)
            .await
            .ok_or_else(|| NotFoundError::new("Tool", name))?;
        Ok(tool)
    }

    pub async fn list_tools(&self) -> Vec<Tool> {
        self.store.list_tools().await
    }

    /// Every internal definition the registry knows, in registration order.
    pub fn list_internal_tools(&self) -> Vec<InternalToolInfo> {
        self.internal
            .list()
            .into_iter()
            .map(|def| InternalToolInfo {
                key: def.key,
                contract: def.contract,
                response: def.response,
            })
            .collect()
    }

    /// Resolves the endpoint's static inputs against the registry
    /// definition for `target`.
    ///
    /// Every property marked as taking a static input must end up with a
    /// value: the provided one, or the property's declared default. Each
    /// resolved value is validated against its property before it is baked
    /// into the endpoint.
    fn bake_internal(
        &self,
        target: &str,
        provided: &Map<String, Value>,
    ) -> Result<(ToolContract, ToolResponseSpec, Map<String, Value>), ServiceError> {
        let def = self
            .internal
            .get(target)
            .map_err(|_| ValidationError::new(format!("Unknown internal tool: {target}")))?;

        let schema = &def.contract.input_schema;
        let unknown: Vec<&str> = provided
            .keys()
            .filter(|key| {
                schema
                    .properties
                    .get(key.as_str())
                    .map_or(true, |prop| !prop.takes_static_input())
            })
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(ValidationError::new(format!(
                "static_inputs contains non-static keys: {unknown:?}"
            ))
            .into());
        }

        let mut baked = Map::new();
        for (key, prop) in &schema.properties {
            if !prop.takes_static_input() {
                continue;
            }
            let value = match provided.get(key) {
                Some(value) => value.clone(),
                None => match &prop.default {
                    Some(default) => default.clone(),
                    None => {
                        return Err(ValidationError::new(format!(
                            "Missing static input '{key}' and no default is configured."
                        ))
                        .into());
                    }
                },
            };
            let errors = validate_value(&value, prop, &format!("static_inputs.{key}"));
            if !errors.is_empty() {
                return Err(ValidationError::from_errors(errors).into());
            }
            baked.insert(key.clone(), value);
        }

        Ok((def.contract, def.response, baked))
    }
}

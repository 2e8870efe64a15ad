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

//! Tool Compiler
//!
//! Turns a persisted tool record into a [`CompiledTool`]: a callable whose
//! parameter list mirrors the contract's *dynamic* properties, with static
//! properties (non-null `const`, or truthy `x_static`) resolved once at
//! compile time and re-injected on every call.
//!
//! There is no code generation here. The synthesized signature is plain
//! data, an ordered [`ParamSpec`] list, which the protocol host renders as
//! a JSON Schema document for registration and validates arguments against
//! at call time. Property names are sanitized into identifier-safe form for
//! the outward signature and mapped back to their raw names before
//! dispatch; the mapping is injective per tool, so nothing is lost.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use toolwright_core::{
    is_truthy, json_type_name, JsonSchemaProperty, JsonType, Tool, ToolEndpoint,
};

use crate::dispatch::{DispatchError, Dispatcher};
use crate::host::HostedTool;

/// Rust keywords a sanitized property name must not collide with.
const RESERVED_IDENTS: [&str; 38] = [
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "yield",
];

/// Coarse value shape of a synthesized parameter, for introspection.
/// Unmapped or undeclared JSON types fall back to [`SemanticType::Any`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    String,
    Int,
    Float,
    Bool,
    Object,
    Array,
    Any,
}

impl SemanticType {
    fn of(value_type: Option<JsonType>) -> Self {
        match value_type {
            Some(JsonType::String) => SemanticType::String,
            Some(JsonType::Integer) => SemanticType::Int,
            Some(JsonType::Number) => SemanticType::Float,
            Some(JsonType::Boolean) => SemanticType::Bool,
            Some(JsonType::Object) => SemanticType::Object,
            Some(JsonType::Array) => SemanticType::Array,
            None => SemanticType::Any,
        }
    }

    /// JSON Schema type name for the generated signature document; `Any`
    /// emits no type at all.
    pub fn json_schema_type(&self) -> Option<&'static str> {
        match self {
            SemanticType::String => Some("string"),
            SemanticType::Int => Some("integer"),
            SemanticType::Float => Some("number"),
            SemanticType::Bool => Some("boolean"),
            SemanticType::Object => Some("object"),
            SemanticType::Array => Some("array"),
            SemanticType::Any => None,
        }
    }
}

/// One synthesized parameter: the outward (sanitized) name, the raw
/// property name it maps back to, and what the binding layer needs to know
/// about it.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub raw_name: String,
    pub semantic: SemanticType,
    pub required: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

/// Replaces anything outside `[A-Za-z0-9_]` with `_`, then prefixes `p_`
/// when the result is empty, starts with a digit, or hits a keyword.
fn sanitize_ident(raw: &str) -> String {
    let mut safe: String = raw
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty()
        || safe.starts_with(|ch: char| ch.is_ascii_digit())
        || RESERVED_IDENTS.contains(&safe.as_str())
    {
        safe = format!("p_{safe}");
    }
    safe
}

fn short_hash_suffix(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:x}", hasher.finish()).chars().take(8).collect()
}

/// Raw property name -> unique sanitized identifier, in declared order.
/// Collisions after sanitization get a deterministic hash suffix derived
/// from the raw name, so the map stays injective.
fn build_name_map(properties: &IndexMap<String, JsonSchemaProperty>) -> IndexMap<String, String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut map = IndexMap::new();
    for raw in properties.keys() {
        let safe = sanitize_ident(raw);
        let unique = if used.insert(safe.clone()) {
            safe
        } else {
            let candidate = format!("{safe}_{}", short_hash_suffix(raw));
            if used.insert(candidate.clone()) {
                candidate
            } else {
                let fallback = format!("{safe}_{}", used.len());
                used.insert(fallback.clone());
                fallback
            }
        };
        map.insert(raw.clone(), unique);
    }
    map
}

/// The compile-time value of one static property: endpoint-level
/// `static_inputs` override first, then non-null `const`, then a concrete
/// (non-boolean-marker) `x_static` value, then the declared default.
/// `None` means nothing to inject.
fn resolve_static_value(
    raw: &str,
    prop: &JsonSchemaProperty,
    overrides: Option<&Map<String, Value>>,
) -> Option<Value> {
    if let Some(value) = overrides.and_then(|inputs| inputs.get(raw)) {
        return Some(value.clone());
    }
    if let Some(fixed) = &prop.const_value {
        return Some(fixed.clone());
    }
    if let Some(marker) = &prop.x_static {
        if !marker.is_boolean() && is_truthy(marker) {
            return Some(marker.clone());
        }
    }
    prop.default.clone()
}

/// Pure function from tool record to callable.
pub struct ToolCompiler;

impl ToolCompiler {
    /// Partitions the contract's properties into static and dynamic,
    /// resolves static values against the endpoint, and synthesizes the
    /// dynamic parameter list in declared order.
    pub fn compile(tool: Arc<Tool>, dispatcher: Arc<Dispatcher>) -> CompiledTool {
        let schema = &tool.contract.input_schema;
        let name_map = build_name_map(&schema.properties);

        let overrides = match &tool.endpoint {
            ToolEndpoint::Internal { static_inputs, .. } => Some(static_inputs),
            _ => None,
        };

        let mut params = Vec::new();
        let mut statics = Vec::new();
        for (raw, prop) in &schema.properties {
            if prop.is_static() {
                if let Some(value) = resolve_static_value(raw, prop, overrides) {
                    statics.push((raw.clone(), value));
                }
            } else {
                params.push(ParamSpec {
                    name: name_map.get(raw).cloned().unwrap_or_else(|| raw.clone()),
                    raw_name: raw.clone(),
                    semantic: SemanticType::of(prop.value_type),
                    required: schema.required.iter().any(|key| key == raw),
                    default: prop.default.clone(),
                    description: prop.description.clone(),
                });
            }
        }

        CompiledTool {
            tool,
            dispatcher,
            params,
            statics,
        }
    }
}

/// A tool record bound to a dispatcher, with its synthesized signature.
///
/// Implements [`HostedTool`], so the sync engine can hand it straight to
/// the protocol host.
pub struct CompiledTool {
    tool: Arc<Tool>,
    dispatcher: Arc<Dispatcher>,
    params: Vec<ParamSpec>,
    /// Raw property name -> value injected on every call.
    statics: Vec<(String, Value)>,
}

impl CompiledTool {
    pub fn name(&self) -> &str {
        &self.tool.name
    }

    pub fn description(&self) -> Option<&str> {
        self.tool.description.as_deref()
    }

    /// Synthesized parameters, in the contract's declared order.
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// JSON Schema document for the synthesized signature: one entry per
    /// dynamic parameter under its sanitized name, `additionalProperties`
    /// off, statics nowhere in sight.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let mut spec = Map::new();
            if let Some(type_name) = param.semantic.json_schema_type() {
                spec.insert("type".to_string(), json!(type_name));
            }
            if let Some(description) = &param.description {
                spec.insert("description".to_string(), json!(description));
            }
            if let Some(default) = &param.default {
                spec.insert("default".to_string(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(spec));
            if param.required {
                required.push(json!(param.name));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// Binds `args` against the synthesized signature, reconstructs the
    /// full raw-name argument map (statics first, then non-null dynamic
    /// values under their original keys), and dispatches.
    ///
    /// Dispatch errors propagate unchanged; this layer adds nothing.
    pub async fn invoke(&self, args: Map<String, Value>) -> Result<Value, DispatchError> {
        let packed = self.pack_arguments(args)?;
        self.dispatcher.dispatch(&self.tool, packed).await
    }

    fn pack_arguments(&self, mut args: Map<String, Value>) -> Result<Map<String, Value>, DispatchError> {
        for key in args.keys() {
            if !self.params.iter().any(|param| param.name == *key) {
                return Err(DispatchError::InvalidArguments(format!(
                    "unexpected argument '{key}'"
                )));
            }
        }

        let mut packed = Map::new();
        for (raw, value) in &self.statics {
            packed.insert(raw.clone(), value.clone());
        }

        for param in &self.params {
            let bound = match args.remove(&param.name) {
                Some(value) => Some(value),
                None if param.required => {
                    return Err(DispatchError::InvalidArguments(format!(
                        "missing required argument '{}'",
                        param.name
                    )));
                }
                None => param.default.clone(),
            };
            // Omitted and null both stay out of the dispatched map.
            if let Some(value) = bound {
                if !value.is_null() {
                    packed.insert(param.raw_name.clone(), value);
                }
            }
        }

        Ok(packed)
    }
}

#[async_trait]
impl HostedTool for CompiledTool {
    fn name(&self) -> &str {
        &self.tool.name
    }

    fn description(&self) -> Option<&str> {
        self.tool.description.as_deref()
    }

    fn input_schema(&self) -> Value {
        CompiledTool::input_schema(self)
    }

    async fn call(&self, args: Value) -> Result<Value, DispatchError> {
        let args = match args {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(DispatchError::InvalidArguments(format!(
                    "arguments must be an object, got {}",
                    json_type_name(&other)
                )))
            }
        };
        self.invoke(args).await
    }
}

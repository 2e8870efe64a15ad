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

//! JSON-Schema-subset property tree and value validators.
//!
//! Tool contracts describe their inputs with a conservative subset of JSON
//! Schema 2020-12: scalar types, enum/const, string length and numeric
//! bounds, and recursive `properties`/`items` nesting. Two extension fields
//! ride along: `x_static` marks a property whose value is fixed by
//! configuration rather than supplied by the caller, and `const` doubles as
//! a static marker when set.
//!
//! Validation here is deliberately a *subset* check: a value is tested
//! against the constraints a property declares and nothing else. Unknown or
//! extra structure is the enclosing schema's business (see
//! [`ToolInputSchema::validate_example`] and `additionalProperties`).
//!
//! Property maps are ordered ([`IndexMap`]): declared order drives the
//! synthesized parameter order downstream, so it must survive
//! deserialization.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ValidationError;

/// JSON type names accepted by the contract schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime JSON type name of a value, for validation messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Whether a value's runtime shape matches a declared type. Booleans are
/// never numeric, and `integer` rejects float representations.
fn matches_json_type(value: &Value, expected: JsonType) -> bool {
    match expected {
        JsonType::String => value.is_string(),
        JsonType::Integer => value.is_i64() || value.is_u64(),
        JsonType::Number => value.is_number(),
        JsonType::Boolean => value.is_boolean(),
        JsonType::Object => value.is_object(),
        JsonType::Array => value.is_array(),
    }
}

/// JSON truthiness: null, false, zero, and empty string/array/object are
/// falsy; everything else is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Numeric-aware equality: integer and float forms of the same number
/// compare equal, so `5` satisfies `const: 5.0`. Arrays and objects compare
/// element-wise with the same rule.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(fx), Some(fy)) => fx == fy,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// One node of the recursive property tree.
///
/// `const` and `x_static` are absent when the wire value is null, so
/// "present" always means "present and non-null" for both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaProperty {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<JsonType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Non-empty list of allowed literal values, when present.
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Fixed value; marks the property static and pins its injected value.
    #[serde(rename = "const", default, skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,
    /// Static marker outside the JSON Schema vocabulary (hence the `x_`
    /// prefix). Truthy means the caller cannot supply this property; a
    /// concrete non-boolean value doubles as the injected value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_static: Option<Value>,
    #[serde(rename = "minLength", default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Child properties; only valid when `type` is object or unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, JsonSchemaProperty>>,
    /// Element schema; only valid when `type` is array or unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<JsonSchemaProperty>>,
}

impl JsonSchemaProperty {
    /// Shorthand for a typed property with no further constraints.
    pub fn of_type(value_type: JsonType) -> Self {
        Self {
            value_type: Some(value_type),
            ..Self::default()
        }
    }

    /// Static properties are excluded from the synthesized call signature:
    /// either a non-null `const` pins the value, or a truthy `x_static`
    /// marks it as configuration-sourced.
    pub fn is_static(&self) -> bool {
        self.const_value.is_some() || self.x_static.as_ref().is_some_and(is_truthy)
    }

    /// Whether the property accepts an endpoint-level static input override
    /// (`x_static` truthy).
    pub fn takes_static_input(&self) -> bool {
        self.x_static.as_ref().is_some_and(is_truthy)
    }

    /// Structural invariants for this node and its children. Returned
    /// messages are prefixed with `path`.
    pub fn structural_errors(&self, path: &str) -> Vec<String> {
        let mut errs = Vec::new();

        if let (Some(lo), Some(hi)) = (self.min_length, self.max_length) {
            if lo > hi {
                errs.push(format!("{path}: minLength cannot be > maxLength"));
            }
        }
        if let (Some(lo), Some(hi)) = (self.minimum, self.maximum) {
            if lo > hi {
                errs.push(format!("{path}: minimum cannot be > maximum"));
            }
        }

        match self.value_type {
            Some(JsonType::Object) => {
                if self.items.is_some() {
                    errs.push(format!("{path}: object type cannot have 'items'"));
                }
            }
            Some(JsonType::Array) => {
                if self.properties.is_some() {
                    errs.push(format!("{path}: array type cannot have 'properties'"));
                }
                if self.items.is_none() {
                    errs.push(format!("{path}: array type requires 'items'"));
                }
            }
            _ => {}
        }

        if self.properties.is_some()
            && !matches!(self.value_type, None | Some(JsonType::Object))
        {
            errs.push(format!("{path}: if 'properties' is set, type must be 'object'"));
        }
        if self.items.is_some() && !matches!(self.value_type, None | Some(JsonType::Array)) {
            errs.push(format!("{path}: if 'items' is set, type must be 'array'"));
        }

        if let Some(allowed) = &self.enum_values {
            if allowed.is_empty() {
                errs.push(format!("{path}: enum cannot be an empty list"));
            }
        }

        if let (Some(fixed), Some(expected)) = (&self.const_value, self.value_type) {
            if !matches_json_type(fixed, expected) {
                errs.push(format!("{path}: const must match type '{expected}'"));
            }
        }

        if let Some(children) = &self.properties {
            for (name, child) in children {
                errs.extend(child.structural_errors(&format!("{path}.{name}")));
            }
        }
        if let Some(items) = &self.items {
            errs.extend(items.structural_errors(&format!("{path}[]")));
        }

        errs
    }
}

/// Validates a single value against one property.
///
/// A type mismatch yields a single error and stops; no further checks run
/// against a subtree whose shape is already wrong. Otherwise errors
/// accumulate: enum membership, string length bounds, numeric bounds
/// (booleans are never numeric), recursion into declared `properties` for
/// present keys and into `items` per element, and finally `const` equality.
pub fn validate_value(value: &Value, prop: &JsonSchemaProperty, path: &str) -> Vec<String> {
    let mut errs = Vec::new();

    if let Some(expected) = prop.value_type {
        if !matches_json_type(value, expected) {
            errs.push(format!(
                "{path}: expected {expected}, got {}",
                json_type_name(value)
            ));
            return errs;
        }
    }

    if let Some(allowed) = &prop.enum_values {
        if !allowed.iter().any(|candidate| values_equal(candidate, value)) {
            errs.push(format!(
                "{path}: value not in enum {}",
                Value::Array(allowed.clone())
            ));
        }
    }

    if let Value::String(s) = value {
        let len = s.chars().count() as u64;
        if let Some(min) = prop.min_length {
            if len < min {
                errs.push(format!("{path}: length < minLength ({min})"));
            }
        }
        if let Some(max) = prop.max_length {
            if len > max {
                errs.push(format!("{path}: length > maxLength ({max})"));
            }
        }
    }

    if let Value::Number(n) = value {
        if let Some(f) = n.as_f64() {
            if let Some(min) = prop.minimum {
                if f < min {
                    errs.push(format!("{path}: value < minimum ({min})"));
                }
            }
            if let Some(max) = prop.maximum {
                if f > max {
                    errs.push(format!("{path}: value > maximum ({max})"));
                }
            }
        }
    }

    if let (Value::Object(map), Some(children)) = (value, &prop.properties) {
        for (key, child) in children {
            if let Some(nested) = map.get(key) {
                errs.extend(validate_value(nested, child, &format!("{path}.{key}")));
            }
        }
    }

    if let (Value::Array(elements), Some(item_schema)) = (value, &prop.items) {
        for (idx, element) in elements.iter().enumerate() {
            errs.extend(validate_value(element, item_schema, &format!("{path}[{idx}]")));
        }
    }

    if let Some(fixed) = &prop.const_value {
        if !values_equal(value, fixed) {
            errs.push(format!("{path}: must equal const {fixed}"));
        }
    }

    errs
}

/// The object schema at the root of every tool contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInputSchema {
    /// Always "object"; carried on the wire for JSON Schema compatibility.
    #[serde(rename = "type", default = "default_schema_type")]
    pub schema_type: String,
    #[serde(default)]
    pub properties: IndexMap<String, JsonSchemaProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties", default)]
    pub additional_properties: bool,
}

impl Default for ToolInputSchema {
    fn default() -> Self {
        Self {
            schema_type: default_schema_type(),
            properties: IndexMap::new(),
            required: Vec::new(),
            additional_properties: false,
        }
    }
}

impl ToolInputSchema {
    /// Structural validation: the root is an object, every property node
    /// satisfies its own invariants, and `required` only names declared
    /// properties.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errs = Vec::new();

        if self.schema_type != "object" {
            errs.push(format!(
                "input schema type must be 'object', got '{}'",
                self.schema_type
            ));
        }

        for (name, prop) in &self.properties {
            errs.extend(prop.structural_errors(name));
        }

        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|key| !self.properties.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            errs.push(format!(
                "required contains keys not in properties: {missing:?}"
            ));
        }

        if errs.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_errors(errs))
        }
    }

    /// Object-level conformance of one example: required keys present, no
    /// unknown keys unless `additionalProperties`, and each known key's
    /// value valid per [`validate_value`]. Messages are prefixed with
    /// `path` (e.g. `examples[0]`).
    pub fn validate_example(
        &self,
        example: &serde_json::Map<String, Value>,
        path: &str,
    ) -> Vec<String> {
        let mut errs = Vec::new();

        let missing: Vec<&str> = self
            .required
            .iter()
            .filter(|key| !example.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            errs.push(format!("{path}: missing required keys: {missing:?}"));
        }

        if !self.additional_properties {
            let unknown: Vec<&str> = example
                .keys()
                .filter(|key| !self.properties.contains_key(key.as_str()))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                errs.push(format!(
                    "{path}: unknown keys (additionalProperties=false): {unknown:?}"
                ));
            }
        }

        for (key, value) in example {
            if let Some(prop) = self.properties.get(key) {
                errs.extend(validate_value(value, prop, &format!("{path}.{key}")));
            }
        }

        errs
    }
}

fn default_schema_type() -> String {
    "object".to_string()
}

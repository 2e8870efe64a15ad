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

//! Tool contracts: the declarative callable surface of a tool.
//!
//! A contract aggregates an input schema with everything a planner or
//! binding layer needs to know about the call: how properties map onto an
//! HTTP request, normalized tags, worked examples, and the
//! read-only/idempotent/cache hints. Cross-field consistency is enforced in
//! [`ToolContract::validate`]; individual property rules live in
//! [`crate::schema`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::error::{error_preview, ValidationError};
use crate::schema::ToolInputSchema;

/// Schema dialects a contract may declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    #[default]
    #[serde(rename = "jsonschema-2020-12")]
    JsonSchema2020_12,
    #[serde(rename = "jsonschema-draft-07")]
    JsonSchemaDraft07,
}

/// Maps input-schema properties onto the parts of an HTTP request they
/// populate. Purely declarative: the dispatcher itself sends `GET`/`HEAD`
/// arguments as query parameters and everything else as a JSON body, but
/// integrators templating requests need the full split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpBinding {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub json: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl HttpBinding {
    fn buckets(&self) -> [(&'static str, &[String]); 4] {
        [
            ("query", self.query.as_slice()),
            ("json", self.json.as_slice()),
            ("form", self.form.as_slice()),
            ("path", self.path.as_slice()),
        ]
    }

    /// A property name may appear in at most one bucket.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen: HashMap<&str, &'static str> = HashMap::new();
        for (bucket, keys) in self.buckets() {
            for key in keys {
                if let Some(previous) = seen.insert(key.as_str(), bucket) {
                    return Err(ValidationError::new(format!(
                        "Param '{key}' appears in both '{previous}' and '{bucket}'"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Declarative schema + metadata describing a tool's callable surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolContract {
    #[serde(default)]
    pub schema_version: SchemaVersion,
    pub input_schema: ToolInputSchema,
    /// Required by convention for http-transport tools, absent otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub idempotent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_ttl_seconds: Option<u64>,
}

impl ToolContract {
    /// Runs the contract's cross-field checks, normalizing `tags` in place.
    ///
    /// Order: input-schema structure, tag normalization, cache TTL
    /// positivity, planner-hint implications (read-only tools must be
    /// idempotent, cacheable tools must be read-only and idempotent),
    /// HTTP-binding consistency, example conformance. Must pass before a
    /// contract is persisted or compiled.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.input_schema.validate()?;

        self.tags = normalize_tags(&self.tags);

        if let Some(ttl) = self.cache_ttl_seconds {
            if ttl == 0 {
                return Err(ValidationError::new("cache_ttl_seconds must be > 0"));
            }
        }
        if self.read_only && !self.idempotent {
            return Err(ValidationError::new("read_only tools should be idempotent."));
        }
        if self.cache_ttl_seconds.is_some() && !(self.read_only && self.idempotent) {
            return Err(ValidationError::new(
                "cache_ttl_seconds requires read_only=true and idempotent=true.",
            ));
        }

        if let Some(http) = &self.http {
            http.validate()?;

            for (bucket, keys) in http.buckets() {
                let unknown: Vec<&str> = keys
                    .iter()
                    .filter(|key| !self.input_schema.properties.contains_key(key.as_str()))
                    .map(String::as_str)
                    .collect();
                if !unknown.is_empty() {
                    return Err(ValidationError::new(format!(
                        "http.{bucket} contains keys not in input_schema.properties: {unknown:?}"
                    )));
                }
            }

            let not_required: Vec<&str> = http
                .path
                .iter()
                .filter(|key| !self.input_schema.required.contains(*key))
                .map(String::as_str)
                .collect();
            if !not_required.is_empty() {
                return Err(ValidationError::new(format!(
                    "http.path params should be required: {not_required:?}"
                )));
            }
        }

        for (idx, example) in self.examples.iter().enumerate() {
            let errs = self
                .input_schema
                .validate_example(example, &format!("examples[{idx}]"));
            if !errs.is_empty() {
                return Err(ValidationError::new(format!(
                    "examples[{idx}] failed schema validation: {}",
                    error_preview(&errs)
                )));
            }
        }

        Ok(())
    }
}

/// Trims tags, drops empties, and de-duplicates case-insensitively. The
/// first-seen casing wins and insertion order is preserved.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !seen.insert(trimmed.to_lowercase()) {
            continue;
        }
        out.push(trimmed.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contract(raw: Value) -> ToolContract {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_tag_normalization() {
        let tags: Vec<String> = ["  Web ", "web", "", "  ", "API", "api", "Web"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(normalize_tags(&tags), vec!["Web", "API"]);
    }

    #[test]
    fn test_read_only_implies_idempotent() {
        let mut c = contract(json!({
            "input_schema": {"type": "object", "properties": {}},
            "read_only": true
        }));
        let err = c.validate().unwrap_err();
        assert_eq!(err.message(), "read_only tools should be idempotent.");

        let mut ok = contract(json!({
            "input_schema": {"type": "object", "properties": {}},
            "read_only": true,
            "idempotent": true
        }));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_cache_ttl_rules() {
        let mut zero = contract(json!({
            "input_schema": {"type": "object", "properties": {}},
            "read_only": true,
            "idempotent": true,
            "cache_ttl_seconds": 0
        }));
        assert_eq!(
            zero.validate().unwrap_err().message(),
            "cache_ttl_seconds must be > 0"
        );

        let mut not_cacheable = contract(json!({
            "input_schema": {"type": "object", "properties": {}},
            "cache_ttl_seconds": 300
        }));
        assert_eq!(
            not_cacheable.validate().unwrap_err().message(),
            "cache_ttl_seconds requires read_only=true and idempotent=true."
        );

        let mut ok = contract(json!({
            "input_schema": {"type": "object", "properties": {}},
            "read_only": true,
            "idempotent": true,
            "cache_ttl_seconds": 300
        }));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_binding_bucket_overlap() {
        let binding: HttpBinding = serde_json::from_value(json!({
            "query": ["q"],
            "json": ["q"]
        }))
        .unwrap();
        let err = binding.validate().unwrap_err();
        assert_eq!(err.message(), "Param 'q' appears in both 'query' and 'json'");
    }

    #[test]
    fn test_binding_keys_must_exist() {
        let mut c = contract(json!({
            "input_schema": {
                "type": "object",
                "properties": {"q": {"type": "string"}}
            },
            "http": {"query": ["q", "ghost"]}
        }));
        let err = c.validate().unwrap_err();
        assert_eq!(
            err.message(),
            "http.query contains keys not in input_schema.properties: [\"ghost\"]"
        );
    }

    #[test]
    fn test_path_keys_must_be_required() {
        let mut c = contract(json!({
            "input_schema": {
                "type": "object",
                "properties": {"id": {"type": "string"}}
            },
            "http": {"path": ["id"]}
        }));
        let err = c.validate().unwrap_err();
        assert_eq!(err.message(), "http.path params should be required: [\"id\"]");

        let mut ok = contract(json!({
            "input_schema": {
                "type": "object",
                "properties": {"id": {"type": "string"}},
                "required": ["id"]
            },
            "http": {"path": ["id"]}
        }));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_examples_validated_against_schema() {
        let mut c = contract(json!({
            "input_schema": {
                "type": "object",
                "properties": {
                    "q": {"type": "string"},
                    "limit": {"type": "integer", "minimum": 1, "maximum": 10}
                },
                "required": ["q"]
            },
            "examples": [
                {"q": "hello", "limit": 2},
                {"limit": 99}
            ]
        }));
        let err = c.validate().unwrap_err();
        assert!(err.message().starts_with("examples[1] failed schema validation:"));
        assert!(err.message().contains("missing required keys"));
        assert!(err.message().contains("value > maximum (10)"));
    }

    #[test]
    fn test_schema_version_wire_values() {
        let c = contract(json!({
            "schema_version": "jsonschema-draft-07",
            "input_schema": {"type": "object", "properties": {}}
        }));
        assert_eq!(c.schema_version, SchemaVersion::JsonSchemaDraft07);

        let default = contract(json!({
            "input_schema": {"type": "object", "properties": {}}
        }));
        assert_eq!(default.schema_version, SchemaVersion::JsonSchema2020_12);

        let unknown: Result<ToolContract, _> = serde_json::from_value(json!({
            "schema_version": "jsonschema-2019-09",
            "input_schema": {"type": "object", "properties": {}}
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn test_invalid_property_fails_contract() {
        let mut c = contract(json!({
            "input_schema": {
                "type": "object",
                "properties": {"tags": {"type": "array"}}
            }
        }));
        let err = c.validate().unwrap_err();
        assert_eq!(err.message(), "tags: array type requires 'items'");
    }
}

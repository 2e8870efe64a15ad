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

//! Shared error types for contract construction and tool lookup.
//!
//! Validation failures carry path-qualified, human-readable messages so a
//! caller can report exactly which part of a contract or endpoint was
//! rejected. All three types are construction/lookup-time errors; runtime
//! dispatch failures live with the dispatcher.

use thiserror::Error;

/// How many individual messages a joined validation error shows before
/// truncating with a `(+N more)` suffix.
const ERROR_PREVIEW_LIMIT: usize = 5;

/// A contract, endpoint, schema, or name violated one of its invariants.
///
/// Raised eagerly at construction and at create/update time, before anything
/// is persisted or compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Joins a list of path-qualified messages into a single error,
    /// truncated to the first few entries.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            message: error_preview(&errors),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Joins the first [`ERROR_PREVIEW_LIMIT`] messages with `"; "`, appending
/// a `(+N more)` marker when the list was longer.
pub fn error_preview(errors: &[String]) -> String {
    let shown = errors.len().min(ERROR_PREVIEW_LIMIT);
    let mut out = errors[..shown].join("; ");
    if errors.len() > shown {
        out.push_str(&format!(" (+{} more)", errors.len() - shown));
    }
    out
}

/// A uniqueness rule was violated: duplicate tool name on create/rename, or
/// duplicate internal-tool key on registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{resource} with {field} '{value}' already exists")]
pub struct ConflictError {
    pub resource: &'static str,
    pub field: &'static str,
    pub value: String,
}

impl ConflictError {
    pub fn new(resource: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self {
            resource,
            field,
            value: value.into(),
        }
    }
}

/// A lookup by id, name, or internal-tool key found nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{resource} '{key}' not found")]
pub struct NotFoundError {
    pub resource: &'static str,
    pub key: String,
}

impl NotFoundError {
    pub fn new(resource: &'static str, key: impl Into<String>) -> Self {
        Self {
            resource,
            key: key.into(),
        }
    }
}

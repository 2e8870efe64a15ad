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

//! Toolwright Core
//!
//! Data model for data-defined tools: the JSON-Schema-subset contract
//! format, transport endpoint descriptors, and the persisted tool record
//! that the compiler and dispatch engine operate on.

pub mod contract;
pub mod endpoint;
pub mod error;
pub mod schema;
pub mod tool;

pub use contract::{normalize_tags, HttpBinding, SchemaVersion, ToolContract};
pub use endpoint::{ToolEndpoint, HTTP_METHODS};
pub use error::{ConflictError, NotFoundError, ValidationError};
pub use schema::{
    is_truthy, json_type_name, validate_value, values_equal, JsonSchemaProperty, JsonType,
    ToolInputSchema,
};
pub use tool::{
    validate_tool_name, NewTool, Tool, ToolPatch, ToolResponseSpec, TOOL_NAME_MAX_LEN,
};

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

//! Engine configuration: outbound HTTP, MCP proxying, and logging.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Outbound HTTP defaults. Endpoints may override the per-call timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: f64,
    /// Connection-establishment timeout in seconds; unset means the
    /// client's own default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<f64>,
    /// User-Agent header sent on every outbound request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// Per-call timeout in seconds for proxied `tools/call` requests.
    #[serde(default = "default_mcp_timeout_secs")]
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Tracing filter directive, e.g. "info" or "toolwright_server=debug".
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON-formatted log lines instead of human-readable ones.
    #[serde(default)]
    pub json: bool,
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - TOOLWRIGHT_HTTP_TIMEOUT_SECS: per-call HTTP timeout in seconds (default: 15)
    /// - TOOLWRIGHT_MCP_TIMEOUT_SECS: per-call MCP timeout in seconds (default: 30)
    /// - TOOLWRIGHT_USER_AGENT: User-Agent header for outbound requests
    /// - TOOLWRIGHT_LOG_LEVEL: tracing filter directive (default: info)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration with priority: env > file > defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(raw) = std::env::var("TOOLWRIGHT_HTTP_TIMEOUT_SECS") {
            match raw.parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs > 0.0 => self.http.timeout_secs = secs,
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid TOOLWRIGHT_HTTP_TIMEOUT_SECS")
                }
            }
        }
        if let Ok(raw) = std::env::var("TOOLWRIGHT_MCP_TIMEOUT_SECS") {
            match raw.parse::<f64>() {
                Ok(secs) if secs.is_finite() && secs > 0.0 => self.mcp.timeout_secs = secs,
                _ => {
                    tracing::warn!(value = %raw, "ignoring invalid TOOLWRIGHT_MCP_TIMEOUT_SECS")
                }
            }
        }
        if let Ok(agent) = std::env::var("TOOLWRIGHT_USER_AGENT") {
            if !agent.is_empty() {
                self.http.user_agent = agent;
            }
        }
        if let Ok(level) = std::env::var("TOOLWRIGHT_LOG_LEVEL") {
            if !level.is_empty() {
                self.log.level = level;
            }
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout_secs(),
            connect_timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_mcp_timeout_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_http_timeout_secs() -> f64 {
    15.0
}

fn default_mcp_timeout_secs() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    concat!("toolwright/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

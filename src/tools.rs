//! Directory tools for programmatic and agent callers.
//!
//! Each tool is a thin pass-through to the NKO backend: it takes JSON
//! arguments, makes one [`NkoDirectory`] call, and returns text, either
//! pretty-printed JSON or a readable error string. Backend failures are
//! never raised; only malformed arguments make [`Tool::execute`] fail.
//!
//! | Tool | Backend call |
//! |------|--------------|
//! | `get_nko_list` | `GET /nko` |
//! | `get_nko_by_id` | `GET /nko/{id}` |
//! | `get_cities` | `GET /city` |
//!
//! Tools are collected in a [`ToolRegistry`] and served over MCP
//! ([`crate::mcp`]) and the REST routes of [`crate::server`].

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use nko_assistant_core::directory::{DirectoryError, NkoDirectory};
use nko_assistant_core::models::FilterSet;

// ═══════════════════════════════════════════════════════════════════════
// Tool Trait
// ═══════════════════════════════════════════════════════════════════════

/// A named, schema-described operation that agents can discover and call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name, used as the MCP tool name and the REST route
    /// (`POST /tools/{name}`).
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema (`type: "object"`) describing the arguments.
    fn parameters_schema(&self) -> Value;

    /// Runs the tool.
    ///
    /// Returns the text shown to the caller. Errors are reserved for
    /// malformed arguments.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String>;
}

/// What a tool can reach while executing.
#[derive(Clone)]
pub struct ToolContext {
    directory: Arc<dyn NkoDirectory>,
}

impl ToolContext {
    pub fn new(directory: Arc<dyn NkoDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &dyn NkoDirectory {
        self.directory.as_ref()
    }
}

/// Serializable tool info for `GET /tools/list` and `nko tools list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolInfo {
    pub fn of(tool: &dyn Tool) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters_schema(),
        }
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

// ═══════════════════════════════════════════════════════════════════════
// Built-in tools
// ═══════════════════════════════════════════════════════════════════════

/// `get_nko_list`: filtered organization listing.
pub struct GetNkoListTool;

#[async_trait]
impl Tool for GetNkoListTool {
    fn name(&self) -> &str {
        "get_nko_list"
    }

    fn description(&self) -> &str {
        "Get a list of NKO (Non-Profit Organizations) with optional filtering"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "jwt_token": {
                    "type": "string",
                    "description": "JWT token for user authentication (required only for favorite filter)"
                },
                "city": {
                    "type": "string",
                    "description": "Filter by city name (optional)"
                },
                "favorite": {
                    "type": "boolean",
                    "description": "Filter by favorite status (optional, requires jwt_token)"
                },
                "category": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Filter by categories (optional, can provide multiple)"
                },
                "regex": {
                    "type": "string",
                    "description": "Regular expression to search in name and description (optional)"
                }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let filters = list_filters(&params);
        match ctx.directory().list_nko(&filters).await {
            Ok(records) => Ok(pretty(&records)),
            Err(e) if e.is_http_status() => Ok(e.to_string()),
            Err(e) => Ok(format!("Error fetching NKO list: {}", e)),
        }
    }
}

fn string_arg(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn list_filters(params: &Value) -> FilterSet {
    let categories = match params.get("category") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) if !single.is_empty() => vec![single.clone()],
        _ => Vec::new(),
    };

    FilterSet {
        city: string_arg(params, "city"),
        categories,
        auth_token: string_arg(params, "jwt_token"),
        regex: string_arg(params, "regex"),
        favorite: params.get("favorite").and_then(Value::as_bool),
    }
}

/// `get_nko_by_id`: one organization.
pub struct GetNkoByIdTool;

#[async_trait]
impl Tool for GetNkoByIdTool {
    fn name(&self) -> &str {
        "get_nko_by_id"
    }

    fn description(&self) -> &str {
        "Get a specific NKO by its ID"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "nko_id": {
                    "type": "integer",
                    "description": "The ID of the NKO to retrieve"
                }
            },
            "required": ["nko_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let Some(nko_id) = params.get("nko_id").and_then(nko_id_arg) else {
            bail!("nko_id is required");
        };

        match ctx.directory().get_nko(nko_id).await {
            Ok(record) => Ok(pretty(&record)),
            Err(DirectoryError::NotFound { .. }) => {
                Ok(format!("NKO with ID {} not found", nko_id))
            }
            Err(e) if e.is_http_status() => Ok(e.to_string()),
            Err(e) => Ok(format!("Error fetching NKO: {}", e)),
        }
    }
}

/// Integral non-zero id from a JSON number; `7.0` counts as `7`.
fn nko_id_arg(value: &Value) -> Option<i64> {
    let id = match value.as_i64() {
        Some(id) => id,
        None => {
            let f = value.as_f64()?;
            if f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
                return None;
            }
            f as i64
        }
    };
    (id != 0).then_some(id)
}

/// `get_cities`: known cities.
pub struct GetCitiesTool;

#[async_trait]
impl Tool for GetCitiesTool {
    fn name(&self) -> &str {
        "get_cities"
    }

    fn description(&self) -> &str {
        "Get all available cities with optional regex filter"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "regex": {
                    "type": "string",
                    "description": "Regular expression to filter city names (optional)"
                }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<String> {
        let regex = string_arg(&params, "regex");
        match ctx.directory().list_cities(regex.as_deref()).await {
            Ok(cities) => Ok(pretty(&cities)),
            Err(e) if e.is_http_status() => Ok(e.to_string()),
            Err(e) => Ok(format!("Error fetching cities: {}", e)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered set of tools.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with `get_nko_list`, `get_nko_by_id` and `get_cities`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(GetNkoListTool));
        registry.register(Box::new(GetNkoByIdTool));
        registry.register(Box::new(GetCitiesTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools.iter().map(|t| ToolInfo::of(t.as_ref())).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Prints the registry as a table (`nko tools list`).
pub fn print_tools(registry: &ToolRegistry) {
    println!("{:<16} DESCRIPTION", "TOOL");
    for t in registry.tools() {
        println!("{:<16} {}", t.name(), t.description());
    }
}

/// Runs `name` with `params`, mapping argument errors to `Error: ...` text.
///
/// Returns `None` when no tool has that name. The boolean is `true` when
/// the tool rejected its arguments.
pub async fn call_tool(
    registry: &ToolRegistry,
    ctx: &ToolContext,
    name: &str,
    params: Value,
) -> Option<(String, bool)> {
    let tool = registry.find(name)?;
    Some(match tool.execute(params, ctx).await {
        Ok(text) => (text, false),
        Err(e) => {
            error!(tool = name, error = %e, "tool call rejected");
            (format!("Error: {}", e), true)
        }
    })
}

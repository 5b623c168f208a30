//! JSON Schema tool converter.
//!
//! Produces provider-neutral JSON Schema for native tool use. Provider
//! adapters reshape this into their own wire format.

use super::registry::ToolRegistry;
use kestrel_domain::ToolDefinition;

/// Converts tool definitions into JSON Schema.
///
/// Handles param_type → JSON Schema type mapping:
/// - `"string"`, `"path"` → `"string"`
/// - `"number"`, `"integer"`, `"boolean"`, `"array"`, `"object"` → same
/// - anything else → `"string"`
pub struct JsonSchemaToolConverter;

impl JsonSchemaToolConverter {
    pub fn tool_to_schema(tool: &ToolDefinition) -> serde_json::Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in tool.parameters() {
            let schema_type = match param.param_type.as_str() {
                "number" => "number",
                "integer" => "integer",
                "boolean" => "boolean",
                "array" => "array",
                "object" => "object",
                _ => "string",
            };

            let mut prop = serde_json::Map::new();
            prop.insert("type".to_string(), serde_json::json!(schema_type));
            prop.insert(
                "description".to_string(),
                serde_json::json!(param.description),
            );
            properties.insert(param.name.clone(), serde_json::Value::Object(prop));

            if param.required {
                required.push(serde_json::json!(param.name));
            }
        }

        serde_json::json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }

    /// Schemas for every tool in the registry, sorted by name.
    pub fn registry_schema(registry: &ToolRegistry) -> Vec<serde_json::Value> {
        registry
            .get_all()
            .into_iter()
            .map(|spec| Self::tool_to_schema(&spec.definition))
            .collect()
    }
}

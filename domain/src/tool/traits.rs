//! Tool domain traits
//!
//! Contains pure domain logic for validating tool calls against their
//! schema. The async execution seam (`ToolHandler`) lives in the
//! application layer.

use super::entities::{ToolCall, ToolDefinition, ToolParameter};

/// Validator for tool calls
///
/// This is a pure domain trait that validates tool calls
/// against their definitions without any I/O operations.
pub trait ToolValidator {
    /// Validate a tool call against its definition
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// Checks required parameters, rejects unknown ones, and checks the JSON
/// type of every provided argument against the declared `param_type`.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl DefaultToolValidator {
    fn type_matches(param: &ToolParameter, value: &serde_json::Value) -> bool {
        match param.param_type.as_str() {
            "integer" => value.is_i64() || value.is_u64(),
            "number" => value.is_number(),
            "boolean" => value.is_boolean(),
            "array" => value.is_array(),
            "object" => value.is_object(),
            // string, path and anything unrecognised
            _ => value.is_string(),
        }
    }
}

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String> {
        let parameters = definition.parameters();

        for param in parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, definition.name
                ));
            }
        }

        for (arg_name, value) in &call.arguments {
            let Some(param) = parameters.iter().find(|p| &p.name == arg_name) else {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, definition.name
                ));
            };
            // Optional params explicitly sent as null are treated as absent
            if value.is_null() && !param.required {
                continue;
            }
            if !Self::type_matches(param, value) {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be of type {}",
                    arg_name, definition.name, param.param_type
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::RiskLevel;

    fn task_definition() -> ToolDefinition {
        ToolDefinition::new("task", "Delegate", RiskLevel::Moderate)
            .with_parameter(ToolParameter::new("prompt", "Instruction", true))
            .with_parameter(
                ToolParameter::new("run_in_background", "Detach", false).with_type("boolean"),
            )
    }

    #[test]
    fn test_validator_missing_required() {
        let call = ToolCall::new("task");
        let result = DefaultToolValidator.validate(&call, &task_definition());
        assert!(result.unwrap_err().contains("Missing required parameter 'prompt'"));
    }

    #[test]
    fn test_validator_unknown_param() {
        let call = ToolCall::new("task")
            .with_arg("prompt", "go")
            .with_arg("priority", "high");
        let result = DefaultToolValidator.validate(&call, &task_definition());
        assert!(result.unwrap_err().contains("Unknown parameter 'priority'"));
    }

    #[test]
    fn test_validator_type_mismatch() {
        let call = ToolCall::new("task")
            .with_arg("prompt", "go")
            .with_arg("run_in_background", "yes");
        let result = DefaultToolValidator.validate(&call, &task_definition());
        assert!(result.unwrap_err().contains("must be of type boolean"));
    }

    #[test]
    fn test_validator_null_optional_is_accepted() {
        let call = ToolCall::new("task")
            .with_arg("prompt", "go")
            .with_arg("run_in_background", serde_json::Value::Null);
        assert!(DefaultToolValidator.validate(&call, &task_definition()).is_ok());
    }

    #[test]
    fn test_validator_valid_call() {
        let call = ToolCall::new("task")
            .with_arg("prompt", "go")
            .with_arg("run_in_background", true);
        assert!(DefaultToolValidator.validate(&call, &task_definition()).is_ok());
    }
}

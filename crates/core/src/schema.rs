//! Schema translator: renders tool definitions into each backend's
//! function-calling shape.
//!
//! OpenAI, Ollama and OpenAI-compatible servers take
//! `{"type":"function","function":{name, description, parameters}}`;
//! Anthropic takes `{name, description, input_schema}`. The parameter
//! schema itself is identical in both.

use serde_json::{Map, Value, json};
use crate::tool::{ParamType, ToolDefinition, ToolParam};

/// Which wire shape to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFlavor {
    /// `{"type":"function","function":{...,"parameters":{...}}}`
    Function,
    /// `{"name":...,"description":...,"input_schema":{...}}`
    InputSchema,
}

fn type_schema(kind: &ParamType) -> Value {
    match kind {
        ParamType::Array(item) => json!({ "type": "array", "items": type_schema(item) }),
        other => json!({ "type": other.json_type() }),
    }
}

fn param_schema(param: &ToolParam) -> Value {
    let mut schema = type_schema(&param.kind);
    schema["description"] = json!(param.description);
    if !param.enum_values.is_empty() {
        schema["enum"] = json!(param.enum_values);
    }
    schema
}

/// The JSON-Schema-like `{type, properties, required}` object for a tool.
pub fn parameters_schema(def: &ToolDefinition) -> Value {
    let mut properties = Map::new();
    for param in def.params {
        properties.insert(param.name.to_string(), param_schema(param));
    }
    let required: Vec<&str> = def
        .params
        .iter()
        .filter(|p| p.required)
        .map(|p| p.name)
        .collect();

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Render one tool in the given flavor.
pub fn tool_schema(def: &ToolDefinition, flavor: SchemaFlavor) -> Value {
    match flavor {
        SchemaFlavor::Function => json!({
            "type": "function",
            "function": {
                "name": def.name,
                "description": def.description,
                "parameters": parameters_schema(def),
            }
        }),
        SchemaFlavor::InputSchema => json!({
            "name": def.name,
            "description": def.description,
            "input_schema": parameters_schema(def),
        }),
    }
}

/// Render a tool list in the given flavor, preserving order.
pub fn translate(defs: &[ToolDefinition], flavor: SchemaFlavor) -> Vec<Value> {
    defs.iter().map(|d| tool_schema(d, flavor)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::ToolCategory;

    const PARAMS: &[ToolParam] = &[
        ToolParam::required("url", ParamType::String, "Target URL"),
        ToolParam::optional("method", ParamType::String, "HTTP method").one_of(&["GET", "POST"]),
        ToolParam::optional("tags", ParamType::Array(&ParamType::String), "Tags"),
    ];

    const HTTP: ToolDefinition = ToolDefinition {
        name: "http_request",
        description: "Make an HTTP request",
        category: ToolCategory::Http,
        params: PARAMS,
        dangerous: false,
        confirm: None,
    };

    #[test]
    fn parameters_schema_shape() {
        let schema = parameters_schema(&HTTP);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["url"]));
        assert_eq!(schema["properties"]["method"]["enum"], json!(["GET", "POST"]));
        assert_eq!(schema["properties"]["tags"]["type"], "array");
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
    }

    #[test]
    fn flavors_share_parameter_schema() {
        let function = tool_schema(&HTTP, SchemaFlavor::Function);
        let input = tool_schema(&HTTP, SchemaFlavor::InputSchema);
        assert_eq!(function["type"], "function");
        assert_eq!(function["function"]["name"], "http_request");
        assert_eq!(input["name"], "http_request");
        assert_eq!(function["function"]["parameters"], input["input_schema"]);
    }

    #[test]
    fn translate_preserves_order() {
        let mut second = HTTP;
        second.name = "second";
        let out = translate(&[HTTP, second], SchemaFlavor::InputSchema);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["name"], "second");
    }
}

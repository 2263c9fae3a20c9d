use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::util::extract_json_object;

/// Trait for types that can be requested as structured output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Generate a strict JSON schema for this type.
    ///
    /// Strict structured-output endpoints require:
    /// 1. `additionalProperties: false` on all object schemas
    /// 2. ALL properties listed in `required`, even nullable ones
    /// 3. Fully inlined schemas (no `$ref` references)
    fn strict_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        fix_object_schemas(&mut value);
        inline_refs(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }

    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor {
            name: Self::type_name(),
            schema: Self::strict_schema(),
        }
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Name plus JSON schema of a structured-output contract, as sent over the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDescriptor {
    pub name: String,
    pub schema: Value,
}

/// Validate a raw JSON value against the contract of `T`.
pub fn validate<T: StructuredOutput>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| AiError::Schema {
        schema: T::type_name(),
        reason: e.to_string(),
    })
}

/// Parse raw model text into `T`.
///
/// Text that is not JSON at all is a `Parse` error; JSON that does not fit
/// the contract is a `Schema` error.
pub fn parse_structured<T: StructuredOutput>(raw: &str) -> Result<T> {
    let value: Value = serde_json::from_str(extract_json_object(raw))
        .map_err(|e| AiError::Parse(format!("{e}; response text: {raw}")))?;
    validate(value)
}

fn fix_object_schemas(value: &mut Value) {
    if let Value::Object(map) = value {
        if map.get("type") == Some(&Value::String("object".to_string())) {
            map.insert("additionalProperties".to_string(), Value::Bool(false));

            if let Some(Value::Object(props)) = map.get("properties") {
                let all_keys: Vec<Value> = props.keys().map(|k| Value::String(k.clone())).collect();
                map.insert("required".to_string(), Value::Array(all_keys));
            }
        }

        for (_, v) in map.iter_mut() {
            fix_object_schemas(v);
        }
    } else if let Value::Array(arr) = value {
        for item in arr.iter_mut() {
            fix_object_schemas(item);
        }
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = if let Value::Object(map) = value {
        map.get("definitions").cloned()
    } else {
        None
    };

    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                if let Some(type_name) = ref_path.strip_prefix("#/definitions/") {
                    if let Some(def) = definitions.get(type_name) {
                        *value = def.clone();
                        inline_refs_recursive(value, definitions);
                        return;
                    }
                }
            }

            if let Some(Value::Array(all_of)) = map.get("allOf").cloned() {
                if let [only] = all_of.as_slice() {
                    *value = only.clone();
                    inline_refs_recursive(value, definitions);
                    return;
                }
            }

            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct TestPlan {
        query: String,
        goal: Option<String>,
    }

    #[derive(Debug, Deserialize, JsonSchema)]
    struct TestResponse {
        plans: Vec<TestPlan>,
    }

    #[test]
    fn test_strict_schema_generation() {
        let schema = TestResponse::strict_schema();
        assert!(schema.is_object());
    }

    #[test]
    fn test_additional_properties_false() {
        let schema = TestResponse::strict_schema();
        let schema_str = serde_json::to_string(&schema).unwrap();
        assert!(schema_str.contains("additionalProperties"));
    }

    #[test]
    fn test_all_properties_required() {
        let schema = TestPlan::strict_schema();
        let schema_obj = schema.as_object().unwrap();

        assert!(!schema_obj.contains_key("definitions"));

        let required = schema_obj
            .get("required")
            .expect("should have required array")
            .as_array()
            .unwrap();
        let required_strs: Vec<&str> = required.iter().filter_map(|v| v.as_str()).collect();

        assert!(required_strs.contains(&"query"));
        assert!(required_strs.contains(&"goal"));
    }

    #[test]
    fn test_nested_struct_inlined() {
        let schema = TestResponse::strict_schema();
        let schema_obj = schema.as_object().unwrap();

        assert!(!schema_obj.contains_key("definitions"));
        assert!(!schema_obj.contains_key("$schema"));

        let properties = schema_obj.get("properties").unwrap().as_object().unwrap();
        let items = properties["plans"]["items"].as_object().unwrap();

        assert!(!items.contains_key("$ref"));
        assert_eq!(items.get("type"), Some(&Value::String("object".to_string())));
        assert_eq!(items.get("additionalProperties"), Some(&Value::Bool(false)));
    }

    #[test]
    fn test_descriptor_carries_type_name() {
        let descriptor = TestResponse::descriptor();
        assert_eq!(descriptor.name, "TestResponse");
        assert_eq!(descriptor.schema, TestResponse::strict_schema());
    }

    #[test]
    fn test_parse_structured_success() {
        let raw = "```json\n{\"plans\": [{\"query\": \"q1\", \"goal\": null}]}\n```";
        let parsed: TestResponse = parse_structured(raw).unwrap();
        assert_eq!(parsed.plans.len(), 1);
        assert_eq!(parsed.plans[0].query, "q1");
    }

    #[test]
    fn test_parse_structured_not_json() {
        let err = parse_structured::<TestResponse>("I cannot help with that").unwrap_err();
        assert!(matches!(err, AiError::Parse(_)));
    }

    #[test]
    fn test_parse_structured_schema_mismatch() {
        let err = parse_structured::<TestResponse>("{\"plans\": \"nope\"}").unwrap_err();
        match err {
            AiError::Schema { schema, .. } => assert_eq!(schema, "TestResponse"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }
}

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types usable as OpenAI strict structured output.
///
/// Blanket-implemented for anything `JsonSchema + DeserializeOwned`.
/// OpenAI's strict mode requires `additionalProperties: false` on every
/// object schema, every property listed under `required` (nullable ones
/// included), and no `$ref` indirection.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    fn openai_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        let definitions = value.get("definitions").cloned().unwrap_or(Value::Null);

        prepare(&mut value, &definitions);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
        }

        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Single pass over the schema tree: inline `#/definitions/` refs, collapse
/// single-element `allOf` wrappers, pin every object to strict mode.
fn prepare(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            let ref_target = match map.get("$ref") {
                Some(Value::String(path)) => path
                    .strip_prefix("#/definitions/")
                    .and_then(|name| definitions.get(name))
                    .cloned(),
                _ => None,
            };
            if let Some(resolved) = ref_target {
                *value = resolved;
                prepare(value, definitions);
                return;
            }

            let lone_all_of = match map.get("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => Some(all_of[0].clone()),
                _ => None,
            };
            if let Some(inner) = lone_all_of {
                *value = inner;
                prepare(value, definitions);
                return;
            }

            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));
                if let Some(Value::Object(props)) = map.get("properties") {
                    let keys: Vec<Value> = props.keys().cloned().map(Value::String).collect();
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for (_, nested) in map.iter_mut() {
                prepare(nested, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                prepare(item, definitions);
            }
        }
        _ => {}
    }
}

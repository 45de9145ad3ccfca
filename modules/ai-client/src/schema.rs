//! Structured-output schemas.
//!
//! OpenAI's strict JSON-schema mode accepts only a narrow subset of what
//! schemars emits. Three rules have to hold everywhere in the document:
//! no `$ref` (definitions must be inlined), every object closed with
//! `additionalProperties: false`, and every property named in `required` —
//! nullable ones included, since strict mode has no notion of an optional
//! property.

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Types usable as OpenAI structured output. Blanket-implemented for
/// anything that is `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// The schemars-derived schema, reworked into the strict subset.
    fn openai_schema() -> Value {
        let root = serde_json::to_value(schema_for!(Self)).unwrap_or_default();
        conform(root)
    }

    fn type_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Apply the strict-mode rules to a schemars root schema.
fn conform(mut root: Value) -> Value {
    let defs = match &mut root {
        Value::Object(map) => {
            map.remove("$schema");
            map.remove("definitions").unwrap_or(Value::Null)
        }
        _ => Value::Null,
    };

    rewrite(&mut root, &defs);
    root
}

/// One recursive pass: resolve references against `defs`, unwrap the
/// single-element `allOf` wrappers schemars puts around refs, close objects,
/// and descend.
fn rewrite(node: &mut Value, defs: &Value) {
    match node {
        Value::Object(obj) => {
            let reference = obj
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| defs.get(name))
                .cloned();
            if let Some(definition) = reference {
                *node = definition;
                rewrite(node, defs);
                return;
            }

            if let Some(inner) = unwrap_single_all_of(obj) {
                *node = inner;
                rewrite(node, defs);
                return;
            }

            close_object(obj);
            for child in obj.values_mut() {
                rewrite(child, defs);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite(item, defs);
            }
        }
        _ => {}
    }
}

fn unwrap_single_all_of(obj: &serde_json::Map<String, Value>) -> Option<Value> {
    let wrapped = obj.get("allOf")?.as_array()?;
    if wrapped.len() == 1 {
        wrapped.first().cloned()
    } else {
        None
    }
}

/// Forbid extra keys and mark every declared property required.
fn close_object(obj: &mut serde_json::Map<String, Value>) {
    if obj.get("type").and_then(Value::as_str) != Some("object") {
        return;
    }

    obj.insert("additionalProperties".to_string(), Value::Bool(false));

    if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
        let required: Vec<Value> = properties
            .keys()
            .map(|key| Value::String(key.clone()))
            .collect();
        obj.insert("required".to_string(), Value::Array(required));
    }
}

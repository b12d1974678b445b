//! Translation of JSON Schema (as emitted by `schemars`) into the OpenAPI
//! subset accepted by Gemini's `responseSchema`.
//!
//! Gemini rejects `$ref`, `definitions`, `additionalProperties` and friends,
//! and expects upper-case type names.

use schemars::schema::RootSchema;
use serde_json::{Map, Value};

use crate::error::{AnalysisError, AnalysisResult};

/// Keywords carried over unchanged (after recursive translation of their
/// sub-schemas where applicable).
const PASSTHROUGH_KEYS: &[&str] = &[
    "description",
    "enum",
    "format",
    "minimum",
    "maximum",
    "minItems",
    "maxItems",
    "required",
    "nullable",
];

/// Nesting limit when inlining references.
const MAX_DEPTH: usize = 32;

/// Convert a root schema into a self-contained Gemini response schema.
pub fn to_gemini_schema(root: &RootSchema) -> AnalysisResult<Value> {
    let value = serde_json::to_value(root)
        .map_err(|e| AnalysisError::config_error(format!("unserializable schema: {e}")))?;

    let definitions = value
        .get("definitions")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    translate(&value, &definitions, 0)
}

fn translate(schema: &Value, definitions: &Map<String, Value>, depth: usize) -> AnalysisResult<Value> {
    if depth > MAX_DEPTH {
        return Err(AnalysisError::config_error("schema nesting too deep (recursive type?)"));
    }

    let Some(obj) = schema.as_object() else {
        // `true` schemas and the like: accept anything representable as a string.
        return Ok(serde_json::json!({ "type": "STRING" }));
    };

    if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        let target = definitions
            .get(name)
            .ok_or_else(|| AnalysisError::config_error(format!("unresolved schema reference {reference}")))?;
        let mut resolved = translate(target, definitions, depth + 1)?;
        carry_description(obj, &mut resolved);
        return Ok(resolved);
    }

    // schemars wraps documented references as `allOf: [{$ref}]`.
    if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
        if let [single] = all_of.as_slice() {
            let mut resolved = translate(single, definitions, depth + 1)?;
            carry_description(obj, &mut resolved);
            return Ok(resolved);
        }
        return Err(AnalysisError::config_error("allOf with several members is not supported"));
    }

    let mut out = Map::new();

    match obj.get("type") {
        Some(Value::String(t)) => {
            out.insert("type".into(), Value::String(t.to_uppercase()));
        }
        Some(Value::Array(types)) => {
            // ["string", "null"] becomes STRING + nullable.
            let mut non_null = types.iter().filter_map(Value::as_str).filter(|t| *t != "null");
            if let Some(t) = non_null.next() {
                out.insert("type".into(), Value::String(t.to_uppercase()));
            }
            if types.iter().any(|t| t.as_str() == Some("null")) {
                out.insert("nullable".into(), Value::Bool(true));
            }
        }
        _ => {}
    }

    for key in PASSTHROUGH_KEYS {
        if let Some(v) = obj.get(*key) {
            out.insert((*key).to_string(), v.clone());
        }
    }

    if let Some(items) = obj.get("items") {
        out.insert("items".into(), translate(items, definitions, depth + 1)?);
    }

    if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
        let mut translated = Map::new();
        for (name, prop) in properties {
            translated.insert(name.clone(), translate(prop, definitions, depth + 1)?);
        }
        out.insert("properties".into(), Value::Object(translated));
    }

    Ok(Value::Object(out))
}

fn carry_description(from: &Map<String, Value>, to: &mut Value) {
    if let (Some(description), Some(target)) = (from.get("description"), to.as_object_mut()) {
        target.insert("description".into(), description.clone());
    }
}

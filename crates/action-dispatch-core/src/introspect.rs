// crates/action-dispatch-core/src/introspect.rs
// ============================================================================
// Module: Schema Introspection
// Description: Human-readable shape descriptions for registered schemas.
// Purpose: Back the per-domain documentation action and validation replies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Converts a registered JSON Schema into a flat [`SchemaShape`] listing each
//! top-level property with its type, description, format, enum values,
//! requiredness and default. [`usage_example`] synthesizes placeholder values
//! for every required field so a caller can see a minimal valid call.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::envelope::ResponseEnvelope;
use crate::registry::SchemaRegistry;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Flattened description of one action schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaShape {
    /// Schema key rendered as `domain:name`.
    pub name: String,
    /// Root type label (always `object` for action schemas).
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Top-level properties by name.
    pub properties: BTreeMap<String, PropertyShape>,
    /// Required property names in declaration order.
    pub required: Vec<String>,
}

/// Description of one top-level property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyShape {
    /// Type label (`string`, `integer`, `array`, `string | null`, ...).
    #[serde(rename = "type")]
    pub property_type: String,
    /// Description text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// String format hint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Allowed values.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    /// Whether the property is required.
    pub required: bool,
    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

// ============================================================================
// SECTION: Description
// ============================================================================

/// Describes a raw schema document under the given display name.
#[must_use]
pub fn describe_schema(name: &str, schema: &Value) -> SchemaShape {
    let required: Vec<String> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| {
            props
                .iter()
                .map(|(field, property)| {
                    (field.clone(), describe_property(property, required.contains(field)))
                })
                .collect()
        })
        .unwrap_or_default();
    SchemaShape {
        name: name.to_string(),
        schema_type: type_label(schema).unwrap_or_else(|| "object".to_string()),
        properties,
        required,
    }
}

/// Builds a minimal example call containing every required field.
#[must_use]
pub fn usage_example(shape: &SchemaShape) -> Value {
    let mut example = Map::new();
    for field in &shape.required {
        let placeholder = shape
            .properties
            .get(field)
            .map_or_else(|| Value::String(format!("<{field}>")), |p| placeholder(field, p));
        example.insert(field.clone(), placeholder);
    }
    Value::Object(example)
}

/// Produces the documentation envelope for `(domain, action)`.
///
/// Unknown keys yield an error envelope listing the domain's registered
/// actions.
#[must_use]
pub fn schema_info(registry: &SchemaRegistry, domain: &str, action: &str) -> ResponseEnvelope {
    match registry.describe(domain, action) {
        Some(shape) => {
            let example = usage_example(&shape);
            let description = registry.get_description(domain, action);
            ResponseEnvelope::success_with_message(
                json!({
                    "schema": shape,
                    "description": description,
                    "example": {"action": action, "args": example},
                }),
                format!("Parameters for {domain}.{action}"),
            )
        }
        None => ResponseEnvelope::error_with_data(
            format!("No schema registered for {domain}:{action}"),
            json!({"available": registry.list_schemas_by_domain(domain)}),
        ),
    }
}

impl SchemaRegistry {
    /// Describes the schema registered for `(domain, name)`.
    #[must_use]
    pub fn describe(&self, domain: &str, name: &str) -> Option<SchemaShape> {
        self.get(domain, name).map(|schema| describe_schema(&format!("{domain}:{name}"), schema))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Describes one property subschema.
fn describe_property(property: &Value, required: bool) -> PropertyShape {
    let text = |key: &str| property.get(key).and_then(Value::as_str).map(str::to_string);
    PropertyShape {
        property_type: type_label(property).unwrap_or_else(|| "any".to_string()),
        description: text("description"),
        format: text("format"),
        allowed: property.get("enum").and_then(Value::as_array).cloned(),
        required,
        default: property.get("default").cloned(),
    }
}

/// Renders `type` as a label, joining union types with ` | `.
fn type_label(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(label) => Some(label.clone()),
        Value::Array(labels) => {
            Some(labels.iter().filter_map(Value::as_str).collect::<Vec<_>>().join(" | "))
        }
        _ => None,
    }
}

/// Picks a placeholder: first enum value, then default, then by type.
fn placeholder(field: &str, property: &PropertyShape) -> Value {
    if let Some(first) = property.allowed.as_ref().and_then(|values| values.first()) {
        return first.clone();
    }
    if let Some(default) = &property.default {
        return default.clone();
    }
    let primary = property.property_type.split(" | ").next().unwrap_or("any");
    match (primary, property.format.as_deref()) {
        ("string", Some("date-time")) => json!("2024-01-01T00:00:00Z"),
        ("string", Some("date")) => json!("2024-01-01"),
        ("string", Some("email")) => json!("user@example.com"),
        ("string", Some("uri" | "url")) => json!("https://example.com"),
        ("integer", _) => json!(1),
        ("number", _) => json!(1.0),
        ("boolean", _) => json!(false),
        ("array", _) => json!([]),
        ("object", _) => json!({}),
        _ => Value::String(format!("<{field}>")),
    }
}

//! Declarative payload schemas
//!
//! One JSON Schema per [`ArtifactKind`], compiled once at first use. A
//! payload that fails its schema never enters the store. Beyond the schema,
//! every payload is scanned for free-text reasoning keys: artifacts carry
//! declarative intent, never prose reasoning or executable content.

use crate::error::{GovernanceError, SchemaViolation};
use crate::types::ArtifactKind;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

/// Keys rejected in any payload object, at any depth
const REASONING_KEYS: &[&str] = &[
    "reasoning",
    "rationale",
    "thoughts",
    "analysis",
    "explanation",
    "notes_to_self",
];

fn schema_document(kind: ArtifactKind) -> Value {
    match kind {
        ArtifactKind::ProjectPlan | ArtifactKind::ScaffoldPlan => json!({
            "type": "object",
            "required": ["summary"],
            "properties": {
                "summary": { "type": "string", "minLength": 1 }
            }
        }),
        ArtifactKind::ArchitecturePlan => json!({
            "type": "object",
            "required": ["rules"],
            "properties": {
                "rules": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["forbid_prefix"],
                        "properties": {
                            "forbid_prefix": { "type": "string", "minLength": 1 },
                            "unless_under": { "type": "string" }
                        }
                    }
                }
            }
        }),
        ArtifactKind::TestPlan => json!({
            "type": "object",
            "required": ["covers"],
            "properties": {
                "covers": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                    "minItems": 1
                }
            }
        }),
        ArtifactKind::ImplementationPlan => json!({
            "type": "object",
            "required": ["unit", "files"],
            "properties": {
                "unit": { "type": "string", "minLength": 1 },
                "files": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                    "minItems": 1
                }
            }
        }),
        ArtifactKind::RefactorPlan => json!({
            "type": "object",
            "required": ["unit", "files"],
            "properties": {
                "unit": { "type": "string", "minLength": 1 },
                "files": {
                    "type": "array",
                    "items": { "type": "string", "minLength": 1 },
                    "minItems": 1
                },
                "targets": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }),
        ArtifactKind::ValidationResult => json!({
            "type": "object",
            "required": ["passed", "errors"],
            "properties": {
                "passed": { "type": "boolean" },
                "errors": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            }
        }),
        ArtifactKind::FailureReport => json!({
            "type": "object",
            "required": ["phase", "category", "summary", "details", "detected_at", "blocking"],
            "properties": {
                "phase": { "type": "string" },
                "category": { "type": "string" },
                "summary": { "type": "string", "minLength": 1 },
                "details": { "type": "array", "items": { "type": "string" } },
                "blocking": { "type": "boolean" }
            }
        }),
        ArtifactKind::ReconciliationPlan => json!({
            "type": "object",
            "required": ["signals", "total_severity", "freeze"],
            "properties": {
                "signals": { "type": "array" },
                "total_severity": { "type": "integer", "minimum": 0 },
                "freeze": { "type": "boolean" }
            }
        }),
    }
}

static COMPILED: Lazy<Vec<(ArtifactKind, JSONSchema)>> = Lazy::new(|| {
    ArtifactKind::ALL
        .iter()
        .map(|&kind| {
            let doc = schema_document(kind);
            let schema = JSONSchema::compile(&doc)
                .unwrap_or_else(|e| panic!("builtin schema for {kind} must compile: {e}"));
            (kind, schema)
        })
        .collect()
});

fn compiled_schema(kind: ArtifactKind) -> &'static JSONSchema {
    COMPILED
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, s)| s)
        .unwrap_or_else(|| unreachable!("every kind has a builtin schema"))
}

/// Scan a payload for reasoning-prose keys at any depth
fn collect_reasoning_keys(value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = format!("{path}/{key}");
                if REASONING_KEYS.contains(&key.as_str()) {
                    out.push(SchemaViolation::new(
                        child_path.clone(),
                        "free-text reasoning fields are not permitted in artifact payloads",
                    ));
                }
                collect_reasoning_keys(child, &child_path, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_reasoning_keys(child, &format!("{path}/{i}"), out);
            }
        }
        _ => {}
    }
}

/// Validate a payload against its kind's declarative schema
///
/// # Errors
/// Returns [`GovernanceError::SchemaInvalid`] carrying every violation found
/// (schema mismatches and reasoning-key hits are reported together).
pub fn validate_payload(kind: ArtifactKind, payload: &Value) -> Result<(), GovernanceError> {
    let mut violations = Vec::new();

    if let Err(errors) = compiled_schema(kind).validate(payload) {
        for error in errors {
            violations.push(SchemaViolation::new(
                error.instance_path.to_string(),
                error.to_string(),
            ));
        }
    }

    collect_reasoning_keys(payload, "", &mut violations);

    if violations.is_empty() {
        Ok(())
    } else {
        Err(GovernanceError::SchemaInvalid {
            kind: kind.as_str(),
            violations,
        })
    }
}

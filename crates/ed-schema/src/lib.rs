//! JSON Schema registry: loads a fixed directory of schema documents at
//! startup and validates envelope `message` bodies against them, the same
//! way `connector_proxy::libs::json` compiles and applies schemas with the
//! `jsonschema` crate.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SchemaLoadError {
    #[error("could not read schema directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read schema file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("schema file {path} is not valid JSON: {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("schema file {path} has no string `id` field")]
    MissingId { path: String },
    #[error("schema file {path} does not compile: {reason}")]
    DoesNotCompile { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Ok,
    Unknown,
    Invalid { path: String, reason: String },
}

struct CompiledSchema {
    validator: jsonschema::Validator,
}

/// Schemas indexed by their declared `id`, with `/test`-suffixed and
/// production IDs cross-registered to the same compiled validator.
pub struct SchemaRegistry {
    schemas: HashMap<String, CompiledSchema>,
}

impl SchemaRegistry {
    pub fn load_dir(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let entries = std::fs::read_dir(path).map_err(|source| SchemaLoadError::ReadDir {
            path: path.display().to_string(),
            source,
        })?;

        let mut schemas = HashMap::new();

        for entry in entries {
            let entry = entry.map_err(|source| SchemaLoadError::ReadDir {
                path: path.display().to_string(),
                source,
            })?;
            let file_path = entry.path();
            if file_path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let text = std::fs::read_to_string(&file_path).map_err(|source| {
                SchemaLoadError::ReadFile {
                    path: file_path.display().to_string(),
                    source,
                }
            })?;
            let value: Value =
                serde_json::from_str(&text).map_err(|source| SchemaLoadError::InvalidJson {
                    path: file_path.display().to_string(),
                    source,
                })?;

            let id = value
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaLoadError::MissingId {
                    path: file_path.display().to_string(),
                })?
                .to_owned();

            let validator = jsonschema::validator_for(&value).map_err(|e| {
                SchemaLoadError::DoesNotCompile {
                    path: file_path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;

            debug!(id = %id, path = %file_path.display(), "loaded schema");

            let compiled = CompiledSchema { validator };
            let test_id = cross_registration_id(&id);
            schemas.insert(id, compiled);
            if let Some(test_id) = test_id {
                let validator = jsonschema::validator_for(&value).map_err(|e| {
                    SchemaLoadError::DoesNotCompile {
                        path: file_path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                schemas.insert(test_id, CompiledSchema { validator });
            }
        }

        info!(count = schemas.len(), path = %path.display(), "schema registry loaded");
        Ok(SchemaRegistry { schemas })
    }

    pub fn validate(&self, schema_ref: &str, message: &Value) -> ValidationOutcome {
        let Some(compiled) = self.schemas.get(schema_ref) else {
            return ValidationOutcome::Unknown;
        };

        match compiled.validator.validate(message) {
            Ok(()) => ValidationOutcome::Ok,
            Err(e) => ValidationOutcome::Invalid {
                // `instance_location()` is rooted at `message`; the envelope
                // rooted path the Gateway reports prefixes it with `/message`.
                path: format!("/message{}", e.instance_location()),
                reason: e.error_description().to_string(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// The production<->test cross-registration ID for `id`, if one applies: a
/// production ID gains its `/test` sibling, and vice versa.
fn cross_registration_id(id: &str) -> Option<String> {
    if let Some(base) = id.strip_suffix("/test") {
        Some(base.to_owned())
    } else {
        Some(format!("{id}/test"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write_schema(dir: &Path, filename: &str, id: &str) {
        let schema = json!({
            "id": id,
            "type": "object",
            "properties": {
                "commodities": {"type": "array"}
            },
            "required": ["commodities"]
        });
        std::fs::write(dir.join(filename), serde_json::to_vec(&schema).unwrap()).unwrap();
    }

    #[test]
    fn loads_schemas_keyed_by_internal_id_not_filename() {
        let dir = tempdir().unwrap();
        write_schema(dir.path(), "anything.json", "https://eddn.edcd.io/schemas/commodity/3");
        let registry = SchemaRegistry::load_dir(dir.path()).unwrap();
        let outcome = registry.validate(
            "https://eddn.edcd.io/schemas/commodity/3",
            &json!({"commodities": []}),
        );
        assert_eq!(outcome, ValidationOutcome::Ok);
    }

    #[test]
    fn unknown_schema_ref_is_unknown() {
        let dir = tempdir().unwrap();
        write_schema(dir.path(), "commodity.json", "https://eddn.edcd.io/schemas/commodity/3");
        let registry = SchemaRegistry::load_dir(dir.path()).unwrap();
        let outcome = registry.validate("https://example.com/nope/1", &json!({}));
        assert_eq!(outcome, ValidationOutcome::Unknown);
    }

    #[test]
    fn invalid_message_reports_failing_path() {
        let dir = tempdir().unwrap();
        write_schema(dir.path(), "commodity.json", "https://eddn.edcd.io/schemas/commodity/3");
        let registry = SchemaRegistry::load_dir(dir.path()).unwrap();
        let outcome = registry.validate(
            "https://eddn.edcd.io/schemas/commodity/3",
            &json!({"commodities": "not an array"}),
        );
        match outcome {
            ValidationOutcome::Invalid { path, .. } => {
                assert_eq!(path, "/message/commodities");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_suffix_is_cross_registered_to_production_schema() {
        let dir = tempdir().unwrap();
        write_schema(dir.path(), "commodity.json", "https://eddn.edcd.io/schemas/commodity/3");
        let registry = SchemaRegistry::load_dir(dir.path()).unwrap();
        let outcome = registry.validate(
            "https://eddn.edcd.io/schemas/commodity/3/test",
            &json!({"commodities": []}),
        );
        assert_eq!(outcome, ValidationOutcome::Ok);
    }

    #[test]
    fn production_id_registered_for_schema_whose_file_declares_test_id() {
        let dir = tempdir().unwrap();
        write_schema(dir.path(), "commodity-test.json", "https://eddn.edcd.io/schemas/commodity/test");
        let registry = SchemaRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 2);
        let outcome = registry.validate(
            "https://eddn.edcd.io/schemas/commodity",
            &json!({"commodities": []}),
        );
        assert_eq!(outcome, ValidationOutcome::Ok);
    }

    #[test]
    fn missing_id_field_is_an_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{\"type\": \"object\"}").unwrap();
        assert!(matches!(
            SchemaRegistry::load_dir(dir.path()),
            Err(SchemaLoadError::MissingId { .. })
        ));
    }

    #[test]
    fn unreadable_directory_is_an_error() {
        let result = SchemaRegistry::load_dir("/nonexistent/path/for/ed-schema/tests");
        assert!(matches!(result, Err(SchemaLoadError::ReadDir { .. })));
    }
}

//! Contract registry and file loader.
//!
//! Descriptors are registered once, keyed by command name, and frozen into an
//! immutable [`ContractRegistry`]. The [`ContractLoader`] reads YAML or JSON documents
//! (one descriptor, or a list of them) and checks every document against a built-in
//! descriptor schema before it is accepted.

use super::descriptor::ContractDescriptor;
use super::error::ContractError;
use jsonschema::{Draft, JSONSchema};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Immutable command → contract map.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: HashMap<String, Arc<ContractDescriptor>>,
}

impl ContractRegistry {
    pub fn builder() -> ContractRegistryBuilder {
        ContractRegistryBuilder::default()
    }

    pub fn get(&self, command: &str) -> Option<Arc<ContractDescriptor>> {
        self.contracts.get(command).cloned()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.contracts.contains_key(command)
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contracts.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

/// Collects descriptors; duplicates are rejected.
#[derive(Debug, Default)]
pub struct ContractRegistryBuilder {
    contracts: HashMap<String, Arc<ContractDescriptor>>,
}

impl ContractRegistryBuilder {
    pub fn register(mut self, descriptor: ContractDescriptor) -> Result<Self, ContractError> {
        if descriptor.command.is_empty() {
            return Err(ContractError::InvalidDescriptor {
                command: None,
                reason: "command name is empty".to_string(),
            });
        }
        if self.contracts.contains_key(&descriptor.command) {
            return Err(ContractError::Duplicate {
                command: descriptor.command,
            });
        }
        self.contracts
            .insert(descriptor.command.clone(), Arc::new(descriptor));
        Ok(self)
    }

    pub fn register_all(
        self,
        descriptors: impl IntoIterator<Item = ContractDescriptor>,
    ) -> Result<Self, ContractError> {
        descriptors.into_iter().try_fold(self, |b, d| b.register(d))
    }

    /// Loads and registers every contract file in `dir`.
    pub fn load_dir(self, dir: impl AsRef<Path>) -> Result<Self, ContractError> {
        let descriptors = ContractLoader::new()?.load_dir(dir)?;
        self.register_all(descriptors)
    }

    pub fn build(self) -> ContractRegistry {
        ContractRegistry {
            contracts: self.contracts,
        }
    }
}

/// Reads descriptor documents and checks them against the descriptor schema.
pub struct ContractLoader {
    schema: JSONSchema,
}

impl ContractLoader {
    pub fn new() -> Result<Self, ContractError> {
        let schema_value: Value = serde_json::from_str(DESCRIPTOR_SCHEMA)
            .map_err(|e| ContractError::Internal(format!("Invalid descriptor schema: {}", e)))?;
        let schema = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| ContractError::Internal(format!("Failed to compile schema: {}", e)))?;
        Ok(Self { schema })
    }

    /// Parses one document. YAML is accepted, and JSON is valid YAML.
    pub fn load_str(&self, text: &str) -> Result<Vec<ContractDescriptor>, ContractError> {
        let doc: Value = serde_yaml::from_str(text).map_err(|e| ContractError::InvalidDescriptor {
            command: None,
            reason: format!("YAML syntax error: {}", e),
        })?;

        let docs = match doc {
            Value::Array(items) => items,
            single => vec![single],
        };

        docs.into_iter().map(|d| self.load_value(d)).collect()
    }

    /// Checks a single descriptor document and deserializes it.
    pub fn load_value(&self, doc: Value) -> Result<ContractDescriptor, ContractError> {
        let command = doc
            .get("command")
            .and_then(|c| c.as_str())
            .map(|c| c.to_string());

        if let Err(errors) = self.schema.validate(&doc) {
            let error_msgs: Vec<String> = errors.map(|e| e.to_string()).collect();
            return Err(ContractError::InvalidDescriptor {
                command,
                reason: format!(
                    "descriptor schema validation failed:\n  - {}",
                    error_msgs.join("\n  - ")
                ),
            });
        }

        check_patterns(&doc["schema"], "schema").map_err(|reason| {
            ContractError::InvalidDescriptor {
                command: command.clone(),
                reason,
            }
        })?;

        serde_json::from_value(doc).map_err(|e| ContractError::InvalidDescriptor {
            command,
            reason: e.to_string(),
        })
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Vec<ContractDescriptor>, ContractError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ContractError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
            hint: None,
        })?;
        let descriptors = self.load_str(&text).map_err(|e| ContractError::LoadError {
            path: path.display().to_string(),
            reason: e.to_string(),
            hint: None,
        })?;
        debug!(
            path = %path.display(),
            count = descriptors.len(),
            "loaded contract file"
        );
        Ok(descriptors)
    }

    /// Loads every `.yaml`, `.yml` and `.json` file in `dir`, in file-name order.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<ContractDescriptor>, ContractError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| {
            ContractError::LoadError {
                path: dir.display().to_string(),
                reason: e.to_string(),
                hint: None,
            }
            .with_hint("Point CALLGATE_CONTRACT_DIR at a directory of contract files.")
        })?;

        let mut files: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| is_contract_file(p))
            .collect();
        files.sort();

        let mut out = Vec::new();
        for file in files {
            out.extend(self.load_file(&file)?);
        }
        Ok(out)
    }
}

/// Whether `path` has a contract file extension (`yaml`, `yml` or `json`).
pub fn is_contract_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext, "yaml" | "yml" | "json"))
        .unwrap_or(false)
}

// Rejects `pattern` keywords that do not compile, anywhere in the schema tree.
fn check_patterns(schema: &Value, path: &str) -> Result<(), String> {
    match schema {
        Value::Object(map) => {
            if let Some(Value::String(pattern)) = map.get("pattern") {
                Regex::new(pattern)
                    .map_err(|e| format!("{}.pattern is not a valid regex: {}", path, e))?;
            }
            for (key, child) in map {
                check_patterns(child, &format!("{}.{}", path, key))?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                check_patterns(child, &format!("{}[{}]", path, i))?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

const DESCRIPTOR_SCHEMA: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["command", "schema"],
  "properties": {
    "command": { "type": "string", "minLength": 1 },
    "version": { "type": "integer", "minimum": 1 },
    "idempotent": { "type": "boolean" },
    "schema": {
      "type": "object",
      "properties": {
        "type": {
          "oneOf": [
            { "$ref": "#/definitions/type_name" },
            { "type": "array", "items": { "$ref": "#/definitions/type_name" }, "minItems": 1 }
          ]
        },
        "required": { "type": "array", "items": { "type": "string" } },
        "properties": { "type": "object" }
      }
    }
  },
  "definitions": {
    "type_name": {
      "enum": ["string", "integer", "number", "boolean", "array", "object", "null"]
    }
  },
  "additionalProperties": true
}"##;

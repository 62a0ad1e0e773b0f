//! Identity document validation.
//!
//! The identity mapping names, for each logical attribute (`name`, `dob`, ...), the
//! field that carries it inside the submitted `identity` object and whether it is
//! mandatory. The schema constrains the shape of those fields.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const BUNDLED_MAPPING: &str = include_str!("../../resources/identity-mapping.json");
const BUNDLED_SCHEMA: &str = include_str!("../../resources/identity-schema.json");

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("identity configuration is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("identity schema rejected: {0}")]
    Schema(String),
}

/// Checks a submitted identity document against the configured schema.
pub trait IdentityValidator: Send + Sync {
    /// `extra_fields` are required in addition to `mandatory_fields`.
    fn validate(
        &self,
        mandatory_fields: &[String],
        payload: &Value,
        extra_fields: &[String],
    ) -> Result<bool, IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedField {
    pub value: String,
    #[serde(default)]
    pub is_mandatory: bool,
}

#[derive(Debug, Deserialize)]
struct MappingDocument {
    identity: BTreeMap<String, MappedField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityMapping {
    fields: BTreeMap<String, MappedField>,
}

impl IdentityMapping {
    pub fn bundled() -> Result<Self, IdentityError> {
        Self::from_json(BUNDLED_MAPPING)
    }

    pub fn from_json(raw: &str) -> Result<Self, IdentityError> {
        let document: MappingDocument = serde_json::from_str(raw)?;
        Ok(Self {
            fields: document.identity,
        })
    }

    /// Reads the mapping from `path`, or falls back to the bundled copy.
    pub fn load(path: Option<&Path>) -> Result<Self, IdentityError> {
        match path {
            Some(path) => Self::from_json(&read_file(path)?),
            None => Self::bundled(),
        }
    }

    pub fn mandatory_fields(&self) -> Vec<String> {
        self.fields
            .values()
            .filter(|field| field.is_mandatory)
            .map(|field| field.value.clone())
            .collect()
    }

    /// Picks the mapped attributes out of `details`, keyed by their logical name.
    pub fn extract_display(&self, details: &Value) -> BTreeMap<String, Value> {
        let Some(identity) = details.get("identity") else {
            return BTreeMap::new();
        };
        self.fields
            .iter()
            .filter_map(|(key, field)| {
                identity
                    .get(&field.value)
                    .filter(|value| !value.is_null())
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect()
    }
}

pub fn load_identity_schema(path: Option<&Path>) -> Result<Value, IdentityError> {
    let raw = match path {
        Some(path) => read_file(path)?,
        None => BUNDLED_SCHEMA.to_string(),
    };
    Ok(serde_json::from_str(&raw)?)
}

fn read_file(path: &Path) -> Result<String, IdentityError> {
    fs::read_to_string(path).map_err(|source| IdentityError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// JSON-schema backed validator with a presence check for required fields.
pub struct SchemaIdentityValidator {
    schema: jsonschema::Validator,
}

impl SchemaIdentityValidator {
    pub fn new(schema: &Value) -> Result<Self, IdentityError> {
        let schema =
            jsonschema::validator_for(schema).map_err(|err| IdentityError::Schema(err.to_string()))?;
        Ok(Self { schema })
    }

    pub fn bundled() -> Result<Self, IdentityError> {
        Self::new(&load_identity_schema(None)?)
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(_) => true,
    }
}

impl IdentityValidator for SchemaIdentityValidator {
    fn validate(
        &self,
        mandatory_fields: &[String],
        payload: &Value,
        extra_fields: &[String],
    ) -> Result<bool, IdentityError> {
        if let Err(err) = self.schema.validate(payload) {
            debug!(error = %err, "identity document failed schema validation");
            return Ok(false);
        }

        let identity = payload.get("identity");
        let missing: Vec<&str> = mandatory_fields
            .iter()
            .chain(extra_fields)
            .filter(|field| !is_present(identity.and_then(|identity| identity.get(field.as_str()))))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            debug!(?missing, "identity document is missing mandatory fields");
            return Ok(false);
        }
        Ok(true)
    }
}

//! Static field schemas for models.
//!
//! A [`ModelSchema`] lists the declared fields of a model, their primitive kinds and the
//! validators attached to them. It is the single source of truth for coercing request
//! values, validating documents before they are persisted and rendering stored documents
//! back to JSON.

use std::{collections::HashMap, fmt};

use bson::{Bson, Document as BsonDocument, ser::serialize_to_bson};
use chrono::Utc;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::value::{bson_to_json, format_datetime, from_bson_datetime, parse_datetime, to_bson_datetime};

/// Name of the identifier key in stored documents and on the wire.
pub const ID_FIELD: &str = "id";
/// Name of the discriminator key added to serialized records.
pub const TYPE_FIELD: &str = "type";

/// Primitive type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Boolean,
    DateTime,
    Integer,
    StringList,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Boolean => "boolean",
            FieldKind::DateTime => "datetime",
            FieldKind::Integer => "integer",
            FieldKind::StringList => "list of strings",
        };

        f.write_str(name)
    }
}

/// Errors raised when a document does not satisfy its model schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field '{0}'")]
    MissingField(String),
    #[error("Field '{0}' must not be empty")]
    EmptyField(String),
    #[error("Field '{field}' must be a {expected}")]
    InvalidType { field: String, expected: FieldKind },
    #[error("Field '{field}' does not match pattern '{pattern}'")]
    PatternMismatch { field: String, pattern: String },
    #[error("Field '{field}' has an unusable pattern '{pattern}': {reason}")]
    InvalidPattern { field: String, pattern: String, reason: String },
    #[error("Field '{0}' must be in the past")]
    NotInPast(String),
    #[error("Request body must be a JSON object")]
    NotAnObject,
    #[error("Field '{field}' cannot be stored: {reason}")]
    Unstorable { field: String, reason: String },
}

/// A compiled regular expression, keeping the compile error for reporting at validation time.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    source: String,
    compiled: Result<Regex, String>,
}

impl PatternValidator {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let compiled = Regex::new(&source).map_err(|e| e.to_string());

        Self { source, compiled }
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A constraint attached to a declared field.
#[derive(Debug, Clone)]
pub enum Validator {
    /// Value must be present and must not be an empty string or empty list.
    NotEmpty,
    /// String value must match the regular expression.
    Pattern(PatternValidator),
    /// Datetime value must lie strictly before the current time.
    Past,
}

impl Validator {
    fn check(&self, field: &str, value: &Bson) -> Result<(), ValidationError> {
        match self {
            Validator::NotEmpty => {
                let empty = match value {
                    Bson::String(s) => s.is_empty(),
                    Bson::Array(items) => items.is_empty(),
                    Bson::Null => true,
                    _ => false,
                };

                if empty {
                    return Err(ValidationError::EmptyField(field.to_string()));
                }
            }
            Validator::Pattern(pattern) => {
                let regex = pattern.compiled.as_ref().map_err(|reason| {
                    ValidationError::InvalidPattern {
                        field: field.to_string(),
                        pattern: pattern.source.clone(),
                        reason: reason.clone(),
                    }
                })?;

                if let Bson::String(s) = value {
                    if !regex.is_match(s) {
                        return Err(ValidationError::PatternMismatch {
                            field: field.to_string(),
                            pattern: pattern.source.clone(),
                        });
                    }
                }
            }
            Validator::Past => {
                if let Bson::DateTime(stored) = value {
                    let in_past = from_bson_datetime(stored)
                        .map(|datetime| datetime < Utc::now())
                        .unwrap_or(false);

                    if !in_past {
                        return Err(ValidationError::NotInPast(field.to_string()));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Declaration of one field of a model.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub validators: Vec<Validator>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            validators: Vec::new(),
        }
    }

    /// Marks the field as required without constraining its content.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as required and non-empty.
    pub fn not_empty(mut self) -> Self {
        self.required = true;
        self.validators.push(Validator::NotEmpty);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validators.push(Validator::Pattern(PatternValidator::new(pattern)));
        self
    }

    pub fn past(mut self) -> Self {
        self.validators.push(Validator::Past);
        self
    }

    /// Coerces a JSON request value into the stored representation for this field.
    ///
    /// `null` is always accepted and means "no value".
    pub fn coerce_json(&self, value: &Value) -> Result<Bson, ValidationError> {
        let invalid = || ValidationError::InvalidType {
            field: self.name.clone(),
            expected: self.kind,
        };

        match (self.kind, value) {
            (_, Value::Null) => Ok(Bson::Null),
            (FieldKind::String, Value::String(s)) => Ok(Bson::String(s.clone())),
            (FieldKind::Boolean, Value::Bool(b)) => Ok(Bson::Boolean(*b)),
            (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(Bson::Int64).ok_or_else(invalid),
            (FieldKind::DateTime, Value::String(s)) => parse_datetime(s)
                .map(|datetime| to_bson_datetime(&datetime))
                .ok_or_else(invalid),
            (FieldKind::StringList, Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(Bson::String(s.clone())),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array),
            _ => Err(invalid()),
        }
    }

    /// Coerces a raw query-string value into a comparable value for this field.
    ///
    /// Returns `None` when the text cannot be read as this field's kind.
    pub fn coerce_query(&self, raw: &str) -> Option<Bson> {
        match self.kind {
            FieldKind::String | FieldKind::StringList => Some(Bson::String(raw.to_string())),
            FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" => Some(Bson::Boolean(true)),
                "false" => Some(Bson::Boolean(false)),
                _ => None,
            },
            FieldKind::Integer => raw.trim().parse::<i64>().ok().map(Bson::Int64),
            FieldKind::DateTime => parse_datetime(raw).map(|datetime| to_bson_datetime(&datetime)),
        }
    }

    /// Checks a stored value (or its absence) against this field's constraints.
    pub fn validate(&self, value: Option<&Bson>) -> Result<(), ValidationError> {
        let value = match value {
            None | Some(Bson::Null) if self.required => {
                return Err(ValidationError::MissingField(self.name.clone()));
            }
            None | Some(Bson::Null) => return Ok(()),
            Some(value) => value,
        };

        self.validators
            .iter()
            .try_for_each(|validator| validator.check(&self.name, value))
    }

    /// Value stored when a full replacement omits this field.
    fn empty_value(&self) -> Option<Bson> {
        match self.kind {
            FieldKind::StringList => Some(Bson::Array(Vec::new())),
            _ => None,
        }
    }

    /// Renders a stored value for responses.
    fn render(&self, value: &Bson) -> Value {
        match (self.kind, value) {
            (FieldKind::DateTime, Bson::DateTime(stored)) => from_bson_datetime(stored)
                .map(|datetime| Value::String(format_datetime(&datetime)))
                .unwrap_or(Value::Null),
            _ => bson_to_json(value),
        }
    }
}

/// The complete field declaration of a model type.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    type_name: String,
    resource: String,
    fields: Vec<FieldDescriptor>,
    lookup: HashMap<String, usize>,
}

impl ModelSchema {
    pub fn builder(type_name: impl Into<String>, resource: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            type_name: type_name.into(),
            resource: resource.into(),
            fields: Vec::new(),
        }
    }

    /// Discriminator written to the `type` key of serialized records.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Resource noun used in URLs and as the collection name.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.lookup.get(name).map(|&index| &self.fields[index])
    }

    /// Builds the stored document for a full write (create or replace).
    ///
    /// Declared fields are coerced and validated, omitted list fields become empty lists,
    /// `null` values are dropped and undeclared keys are kept as-is. The `id` and `type`
    /// keys of the body are ignored; the caller owns the identifier.
    pub fn document_from_json(&self, body: &Map<String, Value>) -> Result<BsonDocument, ValidationError> {
        let mut doc = BsonDocument::new();

        for field in &self.fields {
            let value = match body.get(&field.name) {
                Some(raw) => Some(field.coerce_json(raw)?).filter(|v| !matches!(v, Bson::Null)),
                None => None,
            };
            let value = value.or_else(|| field.empty_value());

            field.validate(value.as_ref())?;

            if let Some(value) = value {
                doc.insert(field.name.clone(), value);
            }
        }

        for (key, raw) in body {
            if is_reserved(key) || self.lookup.contains_key(key) || raw.is_null() {
                continue;
            }

            if let Some(value) = undeclared_value(key, raw)? {
                doc.insert(key.clone(), value);
            }
        }

        Ok(doc)
    }

    /// Merges a partial update onto a stored document.
    ///
    /// Only the keys present in `patch` change. A `null` value removes the key.
    pub fn merge_patch(&self, doc: &mut BsonDocument, patch: &Map<String, Value>) -> Result<(), ValidationError> {
        for (key, raw) in patch {
            if is_reserved(key) {
                continue;
            }

            let value = match self.field(key) {
                Some(field) => {
                    let value = field.coerce_json(raw)?;
                    let value = Some(value).filter(|v| !matches!(v, Bson::Null));
                    field.validate(value.as_ref())?;
                    value
                }
                None => undeclared_value(key, raw)?,
            };

            match value {
                Some(value) => {
                    doc.insert(key.clone(), value);
                }
                None => {
                    doc.remove(key);
                }
            }
        }

        Ok(())
    }

    /// Validates every declared field of a stored document.
    pub fn validate(&self, doc: &BsonDocument) -> Result<(), ValidationError> {
        self.fields
            .iter()
            .try_for_each(|field| field.validate(doc.get(&field.name)))
    }

    /// Renders a stored document as a response record, including `id` and `type`.
    pub fn to_json(&self, doc: &BsonDocument) -> Value {
        let mut record = Map::new();

        for (key, value) in doc {
            if key == TYPE_FIELD || matches!(value, Bson::Null) {
                continue;
            }

            let rendered = match self.field(key) {
                Some(field) => field.render(value),
                None => bson_to_json(value),
            };

            record.insert(key.clone(), rendered);
        }

        record.insert(TYPE_FIELD.to_string(), Value::String(self.type_name.clone()));

        Value::Object(record)
    }
}

fn is_reserved(key: &str) -> bool {
    key == ID_FIELD || key == TYPE_FIELD
}

/// Converts the value of an undeclared key as-is. `null` yields nothing.
fn undeclared_value(key: &str, raw: &Value) -> Result<Option<Bson>, ValidationError> {
    match serialize_to_bson(raw) {
        Ok(Bson::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(ValidationError::Unstorable {
            field: key.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Collects field descriptors into a [`ModelSchema`].
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    type_name: String,
    resource: String,
    fields: Vec<FieldDescriptor>,
}

impl ModelSchemaBuilder {
    /// Adds a field declaration. A later declaration with the same name replaces the earlier one.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        match self.fields.iter_mut().find(|existing| existing.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }

        self
    }

    pub fn build(self) -> ModelSchema {
        let lookup = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.name.clone(), index))
            .collect();

        ModelSchema {
            type_name: self.type_name,
            resource: self.resource,
            fields: self.fields,
            lookup,
        }
    }
}

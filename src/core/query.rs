//! Query translation: raw query strings into validated query plans
//!
//! Supported parameters:
//!
//! ```text
//! GET /api/v1/books?filter=author=5f1c...          equality on one field
//! GET /api/v1/books?filter=year=2001,genre=poetry  several predicates, AND-ed
//! GET /api/v1/books?filter={"year":2001}            JSON object form
//! GET /api/v1/books?sort=-createdAt                 `-` prefix sorts descending
//! GET /api/v1/books?limit=10&offset=20              pagination
//! GET /api/v1/books?populate=author                 embed referenced entities
//! ```
//!
//! Translation is pure: it validates field names against the model descriptor
//! and coerces filter values to the declared field types, but never touches
//! storage.

use crate::core::error::ValidationError;
use crate::core::field::ScalarType;
use crate::core::schema::{CREATED_AT_KEY, FieldKind, ID_KEY, ModelDescriptor, UPDATED_AT_KEY};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;

/// Validated filter, sort and pagination intent for one list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    /// Field → value equality predicates, all of which must hold
    pub filter: IndexMap<String, Value>,
    pub sort_field: Option<String>,
    pub sort_descending: bool,
    /// `None` means every matching document
    pub limit: Option<usize>,
    pub offset: usize,
    /// Reference fields to embed as full entities
    pub populate: Vec<String>,
}

impl QueryPlan {
    /// Derive a plan whose filter additionally pins `field` to `value`
    ///
    /// An existing predicate on the same field is overridden, so callers cannot
    /// widen a scoped listing through the query string.
    pub fn scoped_to(mut self, field: &str, value: Value) -> Self {
        self.filter.insert(field.to_string(), value);
        self
    }

    /// Apply offset and limit to an already filtered and sorted sequence
    pub fn window<T>(&self, items: Vec<T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

/// Parses raw query parameters into a [`QueryPlan`]
pub struct QueryTranslator<'a> {
    model: &'a ModelDescriptor,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(model: &'a ModelDescriptor) -> Self {
        Self { model }
    }

    /// Translate the request's query map; unrecognised keys are ignored
    pub fn translate(&self, params: &HashMap<String, String>) -> Result<QueryPlan, ValidationError> {
        let mut plan = QueryPlan::default();

        if let Some(raw) = params.get("filter").filter(|s| !s.is_empty()) {
            plan.filter = self.parse_filter(raw)?;
        }

        if let Some(raw) = params.get("sort").filter(|s| !s.is_empty()) {
            let (field, descending) = match raw.strip_prefix('-') {
                Some(field) => (field, true),
                None => (raw.as_str(), false),
            };
            self.field_type(field, "sort")?;
            plan.sort_field = Some(field.to_string());
            plan.sort_descending = descending;
        }

        if let Some(raw) = params.get("limit") {
            plan.limit = Some(parse_count("limit", raw)?);
        }

        if let Some(raw) = params.get("offset") {
            plan.offset = parse_count("offset", raw)?;
        }

        if let Some(raw) = params.get("populate") {
            plan.populate = self.parse_populate(raw)?;
        }

        Ok(plan)
    }

    fn parse_filter(&self, raw: &str) -> Result<IndexMap<String, Value>, ValidationError> {
        let invalid = |message: &str| ValidationError::InvalidFilter {
            expression: raw.to_string(),
            message: message.to_string(),
        };

        let mut filter = IndexMap::new();

        if raw.trim_start().starts_with('{') {
            let object: serde_json::Map<String, Value> =
                serde_json::from_str(raw).map_err(|e| invalid(&e.to_string()))?;
            for (field, value) in object {
                let scalar = self.field_type(&field, "filter")?;
                let value = match value {
                    Value::String(s) if scalar != ScalarType::Any => {
                        self.coerce(&field, scalar, &s)?
                    }
                    other => scalar.check(other).ok_or_else(|| ValidationError::InvalidValue {
                        field: field.clone(),
                        expected: scalar.name().to_string(),
                    })?,
                };
                filter.insert(field, value);
            }
            return Ok(filter);
        }

        // A comma only separates predicates when a known `field=` follows it
        let mut predicates: Vec<String> = Vec::new();
        for segment in raw.split(',') {
            match predicates.last_mut() {
                Some(current) if !self.starts_predicate(segment) => {
                    current.push(',');
                    current.push_str(segment);
                }
                _ => predicates.push(segment.to_string()),
            }
        }

        for predicate in &predicates {
            let (field, value) = predicate
                .split_once('=')
                .ok_or_else(|| invalid("expected field=value"))?;
            let field = field.trim();
            if field.is_empty() {
                return Err(invalid("empty field name"));
            }
            let scalar = self.field_type(field, "filter")?;
            filter.insert(field.to_string(), self.coerce(field, scalar, value)?);
        }

        Ok(filter)
    }

    fn starts_predicate(&self, segment: &str) -> bool {
        segment
            .split_once('=')
            .is_some_and(|(field, _)| self.field_type(field.trim(), "filter").is_ok())
    }

    fn parse_populate(&self, raw: &str) -> Result<Vec<String>, ValidationError> {
        let mut fields = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let field = self
                .model
                .field(name)
                .ok_or_else(|| self.unknown(name, "populate"))?;
            if !field.is_reference() {
                return Err(ValidationError::NotAReference {
                    field: name.to_string(),
                });
            }
            if !fields.iter().any(|f| f == name) {
                fields.push(name.to_string());
            }
        }
        Ok(fields)
    }

    /// Type used to interpret values of a queryable field
    ///
    /// References compare by identifier string; system keys are queryable too.
    fn field_type(&self, name: &str, context: &'static str) -> Result<ScalarType, ValidationError> {
        match name {
            ID_KEY => return Ok(ScalarType::String),
            CREATED_AT_KEY | UPDATED_AT_KEY => return Ok(ScalarType::Date),
            _ => {}
        }
        match self.model.field(name).map(|f| &f.kind) {
            Some(FieldKind::Scalar(scalar)) => Ok(*scalar),
            Some(FieldKind::Reference { .. }) => Ok(ScalarType::String),
            None => Err(self.unknown(name, context)),
        }
    }

    fn coerce(&self, field: &str, scalar: ScalarType, raw: &str) -> Result<Value, ValidationError> {
        scalar
            .coerce(raw)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: field.to_string(),
                expected: scalar.name().to_string(),
            })
    }

    fn unknown(&self, field: &str, context: &'static str) -> ValidationError {
        ValidationError::UnknownField {
            model: self.model.name.clone(),
            field: field.to_string(),
            context,
        }
    }
}

fn parse_count(param: &'static str, raw: &str) -> Result<usize, ValidationError> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ValidationError::InvalidPagination {
            param,
            value: raw.to_string(),
        })
}

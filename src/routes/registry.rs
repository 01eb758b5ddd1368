//! Route table derived from the schema
//!
//! Every registered model gets a collection route and an item route, and every
//! reference field adds one forward route on the declaring model and one
//! inverse route on the referenced model:
//!
//! ```text
//! GET     /api/v1/books                 List
//! POST    /api/v1/books                 Create
//! GET     /api/v1/books/:id             Get
//! PUT     /api/v1/books/:id             Replace
//! PATCH   /api/v1/books/:id             Patch
//! DELETE  /api/v1/books/:id             Delete
//! OPTIONS /api/v1/books[/:id]           Options
//! GET     /api/v1/books/:id/author      GetRef   (Book.author -> Author)
//! GET     /api/v1/authors/:id/books     ListRef  (every Book whose author is :id)
//! ```

use crate::config::{ApiConfig, HttpMethod};
use crate::core::error::ConfigError;
use crate::core::schema::{ModelDescriptor, Schema};
use std::collections::HashSet;

/// Placeholder used for the entity id in route paths
pub const ID_PARAM: &str = ":id";

/// What a route does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    List,
    Get,
    Create,
    Replace,
    Patch,
    Delete,
    Options,
    /// The entity a reference field points at
    GetRef,
    /// Every entity whose reference field points at `:id`
    ListRef,
}

impl RouteKind {
    pub fn http_method(&self) -> HttpMethod {
        match self {
            RouteKind::List | RouteKind::Get | RouteKind::GetRef | RouteKind::ListRef => {
                HttpMethod::Get
            }
            RouteKind::Create => HttpMethod::Post,
            RouteKind::Replace => HttpMethod::Put,
            RouteKind::Patch => HttpMethod::Patch,
            RouteKind::Delete => HttpMethod::Delete,
            RouteKind::Options => HttpMethod::Options,
        }
    }
}

/// One bindable route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub kind: RouteKind,
    pub method: HttpMethod,
    /// Path with `:id` as the entity placeholder
    pub path: String,
    /// Model whose collection the path starts with
    pub model: String,
    /// Reference field for `GetRef` and `ListRef`
    pub ref_field: Option<String>,
    /// Model returned by `GetRef` (the target) or listed by `ListRef` (the source)
    pub related_model: Option<String>,
}

impl RouteEntry {
    fn new(kind: RouteKind, path: String, model: &ModelDescriptor) -> Self {
        Self {
            kind,
            method: kind.http_method(),
            path,
            model: model.name.clone(),
            ref_field: None,
            related_model: None,
        }
    }

    fn through(mut self, field: &str, related: &str) -> Self {
        self.ref_field = Some(field.to_string());
        self.related_model = Some(related.to_string());
        self
    }

    /// Path in axum's capture syntax (`{id}`)
    pub fn axum_path(&self) -> String {
        self.path.replace(ID_PARAM, "{id}")
    }
}

/// The complete, immutable route table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    prefix: String,
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Derive every route for the schema
    ///
    /// Models are visited in declaration order, then their fields in
    /// declaration order, so the table is identical across runs. Routes whose
    /// method is missing from the allow-list are skipped. Two entries with the
    /// same method and path are a configuration error.
    pub fn build(schema: &Schema, config: &ApiConfig) -> Result<Self, ConfigError> {
        let prefix = normalize_prefix(&config.prefix)?;
        let mut entries = Vec::new();

        for model in schema.models() {
            let collection = format!("{}{}", prefix, model.collection_name);
            let item = format!("{}/{}", collection, ID_PARAM);

            entries.push(RouteEntry::new(RouteKind::List, collection.clone(), model));
            entries.push(RouteEntry::new(RouteKind::Get, item.clone(), model));
            entries.push(RouteEntry::new(RouteKind::Create, collection.clone(), model));
            entries.push(RouteEntry::new(RouteKind::Replace, item.clone(), model));
            entries.push(RouteEntry::new(RouteKind::Patch, item.clone(), model));
            entries.push(RouteEntry::new(RouteKind::Delete, item.clone(), model));
            entries.push(RouteEntry::new(RouteKind::Options, collection, model));
            entries.push(RouteEntry::new(RouteKind::Options, item.clone(), model));

            for field in model.reference_fields() {
                let Some(target) = field.target_model().and_then(|t| schema.model(t)) else {
                    continue;
                };

                entries.push(
                    RouteEntry::new(RouteKind::GetRef, format!("{}/{}", item, field.name), model)
                        .through(&field.name, &target.name),
                );

                let inverse = field
                    .inverse
                    .clone()
                    .unwrap_or_else(|| model.collection_name.clone());
                let path = format!(
                    "{}{}/{}/{}",
                    prefix, target.collection_name, ID_PARAM, inverse
                );
                entries.push(
                    RouteEntry::new(RouteKind::ListRef, path, target)
                        .through(&field.name, &model.name),
                );
            }
        }

        let mut seen: HashSet<(HttpMethod, &str)> = HashSet::new();
        for entry in &entries {
            if !seen.insert((entry.method, entry.path.as_str())) {
                return Err(ConfigError::RouteCollision {
                    method: entry.method.to_string(),
                    path: entry.path.clone(),
                });
            }
        }

        entries.retain(|entry| config.allows(entry.method));

        Ok(Self { prefix, entries })
    }

    /// Normalized prefix every model route starts with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry bound to a method and path
    pub fn find(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        self.entries
            .iter()
            .find(|e| e.method == method && e.path == path)
    }

    /// Methods registered for a path, in canonical order
    pub fn methods_for_path(&self, path: &str) -> Vec<HttpMethod> {
        HttpMethod::ALL
            .into_iter()
            .filter(|method| self.entries.iter().any(|e| e.method == *method && e.path == path))
            .collect()
    }

    /// Distinct paths, in order of first appearance
    pub fn paths(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|e| e.path.as_str())
            .filter(|p| seen.insert(*p))
            .collect()
    }
}

fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();
    if trimmed
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | ':' | '?' | '#' | '*'))
    {
        return Err(ConfigError::InvalidPrefix {
            prefix: raw.to_string(),
        });
    }

    let inner = trimmed.trim_matches('/');
    if inner.is_empty() {
        return Ok("/".to_string());
    }
    Ok(format!("/{}/", inner))
}

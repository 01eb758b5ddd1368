//! HTTP handlers for model routes
//!
//! One generic handler set serves every model. Each bound route carries its
//! own context as a request extension (the model descriptor, and for
//! reference routes the field and related model), so the handlers themselves
//! never look anything up by name.

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::{Method, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{ApiConfig, HttpMethod};
use crate::core::error::{ApiError, ApiResult, NotFoundError, PersistenceError};
use crate::core::query::{QueryPlan, QueryTranslator};
use crate::core::schema::{ModelDescriptor, Schema};
use crate::core::store::{Document, ModelStore};
use crate::routes::payload::{Payload, PayloadValidator, WriteMode};
use crate::routes::response::{DeleteResponse, ListResponse, OptionsResponse, serialize_document};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ModelStore>,
    pub schema: Arc<Schema>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    fn validator<'a>(&'a self, model: &'a ModelDescriptor) -> PayloadValidator<'a> {
        PayloadValidator::new(
            model,
            &self.schema,
            self.store.as_ref(),
            self.config.apply_defaults,
        )
    }
}

/// Context of a collection or item route
#[derive(Debug, Clone)]
pub struct ModelContext {
    pub model: Arc<ModelDescriptor>,
}

/// Context of a `GetRef` or `ListRef` route
#[derive(Debug, Clone)]
pub struct ReferenceContext {
    /// Model owning the `:id` in the path
    pub model: Arc<ModelDescriptor>,
    /// Reference field connecting the two models
    pub field: String,
    /// Referenced model (`GetRef`) or referencing model (`ListRef`)
    pub related: Arc<ModelDescriptor>,
}

/// Context of an `OPTIONS` route
#[derive(Debug, Clone)]
pub struct OptionsContext {
    pub methods: Vec<HttpMethod>,
}

fn storage_error(operation: &'static str, model: &ModelDescriptor) -> impl FnOnce(anyhow::Error) -> ApiError {
    let collection = model.collection_name.clone();
    move |e| PersistenceError::from_adapter(operation, &collection, e).into()
}

fn entity_not_found(model: &ModelDescriptor, id: &str) -> ApiError {
    NotFoundError::Entity {
        model: model.name.clone(),
        id: id.to_string(),
    }
    .into()
}

/// Serialize a document, embedding the requested references
async fn render(
    state: &AppState,
    model: &ModelDescriptor,
    document: &Document,
    populate: &[String],
) -> ApiResult<Value> {
    let mut populated = HashMap::new();

    for name in populate {
        let Some(target) = model
            .field(name)
            .and_then(|f| f.target_model())
            .and_then(|t| state.schema.model(t))
        else {
            continue;
        };

        let nested = state
            .store
            .populate(target, document, name)
            .await
            .map_err(storage_error("populate", target))?;

        // A dangling reference keeps its bare id
        if let Some(nested) = nested {
            populated.insert(name.clone(), serialize_document(target, &nested, &HashMap::new()));
        }
    }

    Ok(serialize_document(model, document, &populated))
}

async fn list_page(
    state: &AppState,
    model: &ModelDescriptor,
    plan: &QueryPlan,
) -> ApiResult<ListResponse> {
    let page = state
        .store
        .find_many(model, plan)
        .await
        .map_err(storage_error("find_many", model))?;

    let mut items = Vec::with_capacity(page.items.len());
    for document in &page.items {
        items.push(render(state, model, document, &plan.populate).await?);
    }

    Ok(ListResponse {
        total: page.total,
        items,
    })
}

/// Only the `populate` parameter matters on single-entity routes
fn populate_param(params: &HashMap<String, String>) -> HashMap<String, String> {
    params
        .get("populate")
        .map(|p| HashMap::from([("populate".to_string(), p.clone())]))
        .unwrap_or_default()
}

/// List a collection
///
/// GET /{prefix}/{collection}?filter=..&sort=..&limit=..&offset=..&populate=..
pub async fn list(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ModelContext>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListResponse>> {
    let plan = QueryTranslator::new(&ctx.model).translate(&params)?;
    tracing::debug!(model = %ctx.model.name, ?plan, "list");

    Ok(Json(list_page(&state, &ctx.model, &plan).await?))
}

/// Get one entity
///
/// GET /{prefix}/{collection}/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ModelContext>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let plan = QueryTranslator::new(&ctx.model).translate(&populate_param(&params))?;
    tracing::debug!(model = %ctx.model.name, id = %id, "get");

    let document = state
        .store
        .find_by_id(&ctx.model, &id)
        .await
        .map_err(storage_error("find_by_id", &ctx.model))?
        .ok_or_else(|| entity_not_found(&ctx.model, &id))?;

    Ok(Json(render(&state, &ctx.model, &document, &plan.populate).await?))
}

/// Create an entity
///
/// POST /{prefix}/{collection}
pub async fn create(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ModelContext>>,
    Payload(payload): Payload,
) -> ApiResult<Json<Value>> {
    tracing::debug!(model = %ctx.model.name, "create");
    let fields = state
        .validator(&ctx.model)
        .prepare(WriteMode::Create, payload)
        .await?;

    let document = state
        .store
        .create(&ctx.model, fields)
        .await
        .map_err(storage_error("create", &ctx.model))?;

    Ok(Json(serialize_document(&ctx.model, &document, &HashMap::new())))
}

/// Replace every field of an entity
///
/// PUT /{prefix}/{collection}/{id}
pub async fn replace(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ModelContext>>,
    Path(id): Path<String>,
    Payload(payload): Payload,
) -> ApiResult<Json<Value>> {
    tracing::debug!(model = %ctx.model.name, id = %id, "replace");
    let fields = state
        .validator(&ctx.model)
        .prepare(WriteMode::Replace, payload)
        .await?;

    let document = state
        .store
        .replace(&ctx.model, &id, fields)
        .await
        .map_err(storage_error("replace", &ctx.model))?
        .ok_or_else(|| entity_not_found(&ctx.model, &id))?;

    Ok(Json(serialize_document(&ctx.model, &document, &HashMap::new())))
}

/// Update the given fields of an entity
///
/// PATCH /{prefix}/{collection}/{id}
pub async fn patch(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ModelContext>>,
    Path(id): Path<String>,
    Payload(payload): Payload,
) -> ApiResult<Json<Value>> {
    tracing::debug!(model = %ctx.model.name, id = %id, "patch");
    let changes = state
        .validator(&ctx.model)
        .prepare(WriteMode::Patch, payload)
        .await?;

    let document = state
        .store
        .update(&ctx.model, &id, changes)
        .await
        .map_err(storage_error("update", &ctx.model))?
        .ok_or_else(|| entity_not_found(&ctx.model, &id))?;

    Ok(Json(serialize_document(&ctx.model, &document, &HashMap::new())))
}

/// Delete an entity; referencing entities are left untouched
///
/// DELETE /{prefix}/{collection}/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ModelContext>>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    tracing::debug!(model = %ctx.model.name, id = %id, "delete");
    let existed = state
        .store
        .delete(&ctx.model, &id)
        .await
        .map_err(storage_error("delete", &ctx.model))?;

    if !existed {
        return Err(entity_not_found(&ctx.model, &id));
    }
    Ok(Json(DeleteResponse { success: true }))
}

/// Get the entity a reference field points at
///
/// GET /{prefix}/{collection}/{id}/{field}
pub async fn get_ref(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ReferenceContext>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let plan = QueryTranslator::new(&ctx.related).translate(&populate_param(&params))?;
    tracing::debug!(model = %ctx.model.name, id = %id, field = %ctx.field, "get reference");

    let parent = state
        .store
        .find_by_id(&ctx.model, &id)
        .await
        .map_err(storage_error("find_by_id", &ctx.model))?
        .ok_or_else(|| entity_not_found(&ctx.model, &id))?;

    let target = state
        .store
        .populate(&ctx.related, &parent, &ctx.field)
        .await
        .map_err(storage_error("populate", &ctx.related))?
        .ok_or_else(|| -> ApiError {
            NotFoundError::Reference {
                model: ctx.model.name.clone(),
                id: id.clone(),
                field: ctx.field.clone(),
            }
            .into()
        })?;

    Ok(Json(render(&state, &ctx.related, &target, &plan.populate).await?))
}

/// List the entities whose reference field points at `{id}`
///
/// GET /{prefix}/{target_collection}/{id}/{inverse}
pub async fn list_ref(
    State(state): State<AppState>,
    Extension(ctx): Extension<Arc<ReferenceContext>>,
    Path(id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<ListResponse>> {
    let plan = QueryTranslator::new(&ctx.related)
        .translate(&params)?
        .scoped_to(&ctx.field, Value::String(id.clone()));
    tracing::debug!(model = %ctx.related.name, field = %ctx.field, id = %id, "list reference");

    Ok(Json(list_page(&state, &ctx.related, &plan).await?))
}

/// Describe the methods registered on a path
///
/// OPTIONS /{prefix}/{collection}[/{id}]
pub async fn options(Extension(ctx): Extension<Arc<OptionsContext>>) -> Response {
    let methods: Vec<String> = ctx.methods.iter().map(|m| m.to_string()).collect();
    let allow = methods.join(", ");

    ([(header::ALLOW, allow)], Json(OptionsResponse { methods })).into_response()
}

/// Fallback for unknown paths and unregistered methods
pub async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    NotFoundError::Route {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
    .into()
}

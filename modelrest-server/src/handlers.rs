//! HTTP handlers for the resource endpoints.
//!
//! Every handler resolves the resource name against the registry first, so an unknown
//! resource is a 404 whatever the method.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::{Method, StatusCode, Uri},
};
use modelrest::{
    bson::{Bson, Document as BsonDocument},
    model::generate_id,
    pipeline::ResultPipeline,
    schema::{ID_FIELD, ValidationError},
    translate::QueryTranslator,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    error::{ApiError, ResultMessage},
    state::AppState,
};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, ApiError>;

/// GET /{resource}/
///
/// Lists records matching the query string, sorted and paginated.
pub async fn list_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> HandlerResult<Vec<Value>> {
    let schema = state.schema(&resource)?;
    let Query(params) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let request = QueryTranslator::new(schema)
        .with_default_page_size(state.default_page_size)
        .translate(params)?;

    let collection = state.store.collection(schema.resource());
    let records = ResultPipeline::new(schema).run(&collection, &request).await?;

    Ok(Json(records))
}

/// GET /{resource}/{id}
pub async fn get_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> HandlerResult<Value> {
    let schema = state.schema(&resource)?;

    let doc = state
        .store
        .collection(schema.resource())
        .find_one(&id)
        .await?
        .ok_or_else(|| record_not_found(&resource, &id))?;

    Ok(Json(schema.to_json(&doc)))
}

/// POST /{resource}/
///
/// Creates a record, or replaces the record named by an `id` in the body.
pub async fn create_record(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: Bytes,
) -> Result<(StatusCode, Json<ResultMessage<String>>), ApiError> {
    let schema = state.schema(&resource)?;
    let body = parse_object(&body)?;
    let doc = schema.document_from_json(&body)?;
    let id = body_id(&body)?.unwrap_or_else(generate_id);

    state
        .store
        .collection(schema.resource())
        .upsert(vec![(id.clone(), stored(doc, &id))])
        .await?;

    info!(%resource, %id, "record created");

    Ok((StatusCode::CREATED, Json(ResultMessage::new(id))))
}

/// PUT /{resource}/
///
/// Replaces the record named by the `id` in the body.
pub async fn replace_record_from_body(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    body: Bytes,
) -> HandlerResult<ResultMessage<String>> {
    let body = parse_object(&body)?;
    let id = body_id(&body)?
        .ok_or_else(|| ApiError::BadRequest("a replacement needs an 'id'".to_string()))?;

    replace(&state, &resource, id, &body).await
}

/// PUT /{resource}/{id}
pub async fn replace_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    body: Bytes,
) -> HandlerResult<ResultMessage<String>> {
    let body = parse_object(&body)?;

    replace(&state, &resource, id, &body).await
}

async fn replace(
    state: &AppState,
    resource: &str,
    id: String,
    body: &Map<String, Value>,
) -> HandlerResult<ResultMessage<String>> {
    let schema = state.schema(resource)?;
    let collection = state.store.collection(schema.resource());

    if collection.find_one(&id).await?.is_none() {
        return Err(record_not_found(resource, &id));
    }

    let doc = schema.document_from_json(body)?;
    collection.update(vec![(id.clone(), stored(doc, &id))]).await?;

    info!(%resource, %id, "record replaced");

    Ok(Json(ResultMessage::new(id)))
}

/// PATCH /{resource}/{id}
///
/// Changes only the fields present in the body.
pub async fn patch_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    body: Bytes,
) -> HandlerResult<ResultMessage<String>> {
    let schema = state.schema(&resource)?;
    let patch = parse_object(&body)?;
    let collection = state.store.collection(schema.resource());

    let mut doc = collection
        .find_one(&id)
        .await?
        .ok_or_else(|| record_not_found(&resource, &id))?;

    schema.merge_patch(&mut doc, &patch)?;
    collection.update(vec![(id.clone(), stored(doc, &id))]).await?;

    info!(%resource, %id, fields = patch.len(), "record patched");

    Ok(Json(ResultMessage::new(id)))
}

/// DELETE /{resource}/{id}
///
/// Reports how many records were removed, 0 or 1.
pub async fn delete_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
) -> HandlerResult<ResultMessage<u64>> {
    let schema = state.schema(&resource)?;
    let deleted = state
        .store
        .collection(schema.resource())
        .delete(vec![id.as_str()])
        .await?;

    info!(%resource, %id, deleted, "record deleted");

    Ok(Json(ResultMessage::new(deleted)))
}

/// Fallback for paths no route matches.
pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}

/// Fallback for a known route shape called with a method it does not serve.
///
/// The resource is still resolved first, so an unknown resource reads the same as it
/// does under a served method.
pub async fn method_not_routed(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> ApiError {
    let path = uri.path();
    let resource = path.trim_start_matches('/').split('/').next().unwrap_or_default();

    match state.schema(resource) {
        Ok(_) => ApiError::RouteNotFound(format!("{method} {path}")),
        Err(e) => e,
    }
}

fn record_not_found(resource: &str, id: &str) -> ApiError {
    ApiError::RecordNotFound {
        resource: resource.to_string(),
        id: id.to_string(),
    }
}

/// Parses a request body as a JSON object, whatever its content type.
fn parse_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(ValidationError::NotAnObject.into()),
        Err(e) => Err(ApiError::BadRequest(format!("invalid JSON body: {e}"))),
    }
}

/// Reads the optional `id` key of a body. Empty strings count as absent.
fn body_id(body: &Map<String, Value>) -> Result<Option<String>, ApiError> {
    match body.get(ID_FIELD) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if id.is_empty() => Ok(None),
        Some(Value::String(id)) => Ok(Some(id.clone())),
        Some(_) => Err(ApiError::BadRequest("'id' must be a string".to_string())),
    }
}

/// Stored form of a record: the document plus its identifier.
fn stored(mut doc: BsonDocument, id: &str) -> Bson {
    doc.insert(ID_FIELD, id);
    Bson::Document(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_object_accepts_only_objects() {
        assert!(parse_object(br#"{"name": "Jane"}"#).is_ok());
        assert!(matches!(
            parse_object(b"[1, 2]"),
            Err(ApiError::Validation(ValidationError::NotAnObject))
        ));
        assert!(matches!(parse_object(b"{oops"), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn body_id_reads_strings_only() {
        let body = |value: Value| value.as_object().cloned().unwrap();

        assert_eq!(body_id(&body(json!({ "id": "abc" }))).unwrap(), Some("abc".to_string()));
        assert_eq!(body_id(&body(json!({ "id": "" }))).unwrap(), None);
        assert_eq!(body_id(&body(json!({ "name": "x" }))).unwrap(), None);
        assert!(body_id(&body(json!({ "id": 7 }))).is_err());
    }
}

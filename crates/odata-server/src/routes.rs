//! The §6 URL surface: one route family per entity set, dispatching on
//! whether the path segment carries a `($key)` suffix. Navigation properties
//! are only ever materialized through `$expand` (spec §4.9); there is no
//! direct `/<EntitySet>($key)/<Nav>` route, since `EntityService` exposes no
//! such traversal.

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use odata_core::OrderedEntity;
use odata_engine::EntityService;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::server::AppState;

/// Splits `"Products"` into `("Products", None)` and `"Products(53)"` into
/// `("Products", Some("53"))`.
fn split_segment(segment: &str) -> (&str, Option<&str>) {
    match segment.find('(') {
        Some(open) if segment.ends_with(')') => (&segment[..open], Some(&segment[open + 1..segment.len() - 1])),
        _ => (segment, None),
    }
}

fn query_string(raw: Option<String>) -> String {
    raw.unwrap_or_default()
}

fn json_to_entity(value: Value) -> Result<OrderedEntity, ApiError> {
    let Value::Object(map) = value else {
        return Err(ApiError(odata_core::Error::parse("request body must be a JSON object")));
    };
    let mut entity = OrderedEntity::new();
    for (key, val) in map {
        entity.insert(key, val);
    }
    Ok(entity)
}

fn service(state: &AppState) -> EntityService<'_> {
    EntityService::new(state.registry.inner(), state.provider.as_ref()).with_limits(state.config.current().limits.0)
}

pub async fn get(Path(segment): Path<String>, RawQuery(query): RawQuery, State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (entity_set, key) = split_segment(&segment);
    let cancel = CancellationToken::new();
    let svc = service(&state);
    let response = match key {
        Some(key) => svc.get_by_key(entity_set, key, &query_string(query), &cancel).await?,
        None => svc.query_collection(entity_set, &query_string(query), &cancel).await?,
    };
    Ok(Json(response))
}

pub async fn post(Path(segment): Path<String>, State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, ApiError> {
    let (entity_set, key) = split_segment(&segment);
    if key.is_some() {
        return Err(ApiError(odata_core::Error::parse("POST does not accept a key segment")));
    }
    let cancel = CancellationToken::new();
    let data = json_to_entity(body)?;
    let row = service(&state).insert(entity_set, &data, &cancel).await?;
    Ok((StatusCode::CREATED, Json(odata_core::ODataResponse::single(entity_set, row))))
}

pub async fn put_or_patch(Path(segment): Path<String>, State(state): State<AppState>, Json(body): Json<Value>) -> Result<impl IntoResponse, ApiError> {
    let (entity_set, key) = split_segment(&segment);
    let key = key.ok_or_else(|| ApiError(odata_core::Error::parse("update requires a key segment")))?;
    let cancel = CancellationToken::new();
    let data = json_to_entity(body)?;
    let row = service(&state).update(entity_set, key, &data, &cancel).await?;
    Ok(Json(odata_core::ODataResponse::single(entity_set, row)))
}

pub async fn delete(Path(segment): Path<String>, State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let (entity_set, key) = split_segment(&segment);
    let key = key.ok_or_else(|| ApiError(odata_core::Error::parse("delete requires a key segment")))?;
    let cancel = CancellationToken::new();
    service(&state).delete(entity_set, key, &cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_plain_entity_set() {
        assert_eq!(split_segment("Products"), ("Products", None));
    }

    #[test]
    fn splits_entity_set_with_key() {
        assert_eq!(split_segment("Products(53)"), ("Products", Some("53")));
    }

    #[test]
    fn splits_composite_key() {
        assert_eq!(split_segment("Orders(ID=1,Line=2)"), ("Orders", Some("ID=1,Line=2")));
    }
}

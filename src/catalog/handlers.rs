use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument};

use super::{
    dto::{CatalogItem, CreateItemRequest, EditItemRequest},
    kind::{CatalogKind, FarmTasks, Tools},
    repo::CatalogRepo,
};
use crate::{
    error::{is_foreign_key_violation, ApiError},
    request::{require_id, ApiJson, ApiQuery, IdRequest, SearchQuery},
    response::{ok, ApiResult, Message, Updated},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes::<FarmTasks>())
        .merge(catalog_routes::<Tools>())
}

fn catalog_routes<K: CatalogKind>() -> Router<AppState> {
    Router::new()
        .route(K::PATH, get(list_items::<K>).post(create_item::<K>))
        .route(&format!("{}/edit", K::PATH), post(edit_item::<K>))
        .route(&format!("{}/delete", K::PATH), post(delete_item::<K>))
}

fn not_found<K: CatalogKind>() -> ApiError {
    ApiError::not_found(K::NOT_FOUND, format!("{} not found", K::NAME))
}

fn descripcion_required() -> ApiError {
    ApiError::bad_request("INVALID_INPUT", "Field 'descripcion' is required")
}

/// Lists every row, or only those whose description matches `?q=`.
#[instrument(skip(state), fields(table = K::TABLE))]
pub async fn list_items<K: CatalogKind>(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<CatalogItem>> {
    let items = match query.pattern() {
        Some(pattern) => CatalogRepo::<K>::search(&state.db, &pattern).await,
        None => CatalogRepo::<K>::list(&state.db).await,
    }
    .map_err(ApiError::db("Error listing catalog"))?;
    ok(items)
}

#[instrument(skip(state, input), fields(table = K::TABLE))]
pub async fn create_item<K: CatalogKind>(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateItemRequest>,
) -> ApiResult<CatalogItem> {
    let descripcion = input.descripcion.trim();
    if descripcion.is_empty() {
        return Err(descripcion_required());
    }

    let item = CatalogRepo::<K>::create(&state.db, descripcion)
        .await
        .map_err(ApiError::db_with("DB_INSERT_ERROR", "Error creating catalog entry"))?;

    info!(id = item.id, "catalog entry created");
    ok(item)
}

#[instrument(skip(state, input), fields(table = K::TABLE))]
pub async fn edit_item<K: CatalogKind>(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<EditItemRequest>,
) -> ApiResult<Updated<CatalogItem>> {
    let id = require_id(input.id)?;
    let mut current = CatalogRepo::<K>::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::db("Error loading catalog entry"))?
        .ok_or_else(not_found::<K>)?;

    let descripcion = match input.descripcion.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => return Err(descripcion_required()),
        Some(v) if v != current.descripcion => v,
        _ => return ok(Updated::unchanged()),
    };

    let updated = CatalogRepo::<K>::update(&state.db, id, &descripcion)
        .await
        .map_err(ApiError::db_with("DB_UPDATE_ERROR", "Error updating catalog entry"))?;
    if updated == 0 {
        return Err(not_found::<K>());
    }

    current.descripcion = descripcion;
    info!(id, "catalog entry updated");
    ok(Updated::Changed(current))
}

/// Entries still referenced by project data are kept.
#[instrument(skip(state, input), fields(table = K::TABLE))]
pub async fn delete_item<K: CatalogKind>(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<IdRequest>,
) -> ApiResult<Message> {
    let id = input.require()?;
    let deleted = CatalogRepo::<K>::delete(&state.db, id)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                ApiError::conflict(K::IN_USE, format!("{} is used by project data", K::NAME))
            } else {
                ApiError::db("Error deleting catalog entry")(e)
            }
        })?;
    if deleted == 0 {
        return Err(not_found::<K>());
    }

    info!(id, "catalog entry deleted");
    ok(Message::new(format!("{} deleted", K::NAME)))
}

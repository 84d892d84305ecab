use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{debug, info, instrument};

use super::{
    dto::{
        CreateProjectDataRequest, NewProjectData, ProjectData, ProjectDataChanges,
        ProjectDataQuery, ProjectDataRow, UpdateProjectDataRequest,
    },
    reconcile::{normalize, ToolSetDiff},
    repo,
};
use crate::{
    error::{is_foreign_key_violation, ApiError},
    request::{require_id, ApiJson, ApiQuery, IdRequest, SearchQuery},
    response::{ok, ApiResult, Message, Updated},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/project_data", get(list_project_data).post(create_project_data))
        .route("/project_data/update", post(update_project_data))
        .route("/project_data/delete", post(delete_project_data))
}

fn invalid_data() -> ApiError {
    ApiError::bad_request(
        "INVALID_DATA",
        "actividad, idproject, laborAgronomica, encargado, recursoHumano and costo are required",
    )
}

fn not_found() -> ApiError {
    ApiError::not_found("PROJECT_DATA_NOT_FOUND", "Project data not found")
}

/// Missing project, farm task, user or tool rows surface as a client error.
fn write_error(code: &'static str, message: &'static str) -> impl FnOnce(sqlx::Error) -> ApiError {
    move |e| {
        if is_foreign_key_violation(&e) {
            ApiError::bad_request(
                "INVALID_REFERENCE",
                "Referenced project, farm task, user or tool does not exist",
            )
        } else {
            ApiError::db_with(code, message)(e)
        }
    }
}

#[instrument(skip(state))]
pub async fn list_project_data(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProjectDataQuery>,
) -> ApiResult<Vec<ProjectData>> {
    let pattern = SearchQuery { q: query.q }.pattern();
    let rows = repo::list(&state.db, pattern.as_deref(), query.project_id.filter(|id| *id > 0))
        .await
        .map_err(ApiError::db("Error listing project data"))?;
    ok(rows.into_iter().map(ProjectData::from).collect())
}

fn validate_new(input: CreateProjectDataRequest) -> Result<(NewProjectData, Vec<i64>), ApiError> {
    let activity = input.actividad.trim().to_string();
    if activity.is_empty()
        || input.idproject == 0
        || input.labor_agronomica == 0
        || input.encargado == 0
        || input.recurso_humano == 0
        || input.costo == 0.0
    {
        return Err(invalid_data());
    }

    let new = NewProjectData {
        activity,
        fk_farm_task: input.labor_agronomica,
        fk_project: input.idproject,
        fk_user: input.encargado,
        num_human_resources: input.recurso_humano,
        cost: input.costo,
        details: input.observaciones.unwrap_or_default().trim().to_string(),
    };
    Ok((new, normalize(&input.equipos)))
}

/// Inserts the record and its tool links in one transaction.
#[instrument(skip(state, input))]
pub async fn create_project_data(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateProjectDataRequest>,
) -> ApiResult<ProjectData> {
    let (new, equipos) = validate_new(input)?;
    let on_error = || write_error("DB_INSERT_ERROR", "Error adding project data");

    let mut tx = state.db.begin().await.map_err(on_error())?;
    let id = repo::insert(&mut tx, &new).await.map_err(on_error())?;
    for tool_id in &equipos {
        repo::link_tool(&mut tx, id, *tool_id)
            .await
            .map_err(on_error())?;
    }
    tx.commit().await.map_err(on_error())?;

    info!(project_data_id = id, tools = equipos.len(), "project data created");
    ok(ProjectData {
        id,
        actividad: new.activity,
        idproject: new.fk_project,
        labor_agronomica: new.fk_farm_task,
        encargado: new.fk_user,
        equipos,
        recurso_humano: new.num_human_resources,
        costo: new.cost,
        observaciones: new.details,
    })
}

/// Validates every supplied scalar before anything is written, keeping only
/// those that differ from `current`.
fn collect_changes(
    current: &ProjectDataRow,
    input: &UpdateProjectDataRequest,
) -> Result<ProjectDataChanges, ApiError> {
    let nonzero = |v: Option<i64>| match v {
        Some(0) => Err(invalid_data()),
        other => Ok(other),
    };

    let activity = match input.actividad.as_deref().map(str::trim) {
        Some("") => return Err(invalid_data()),
        other => other.map(str::to_string),
    };
    let cost = match input.costo {
        Some(c) if c == 0.0 => return Err(invalid_data()),
        other => other,
    };

    Ok(ProjectDataChanges {
        activity: activity.filter(|v| *v != current.activity),
        fk_farm_task: nonzero(input.labor_agronomica)?.filter(|v| *v != current.fk_farm_task),
        fk_project: nonzero(input.idproject)?.filter(|v| *v != current.fk_project),
        fk_user: nonzero(input.encargado)?.filter(|v| *v != current.fk_user),
        num_human_resources: nonzero(input.recurso_humano)?
            .filter(|v| *v != current.num_human_resources),
        cost: cost.filter(|v| *v != current.cost),
        details: input
            .observaciones
            .as_deref()
            .map(|v| v.trim().to_string())
            .filter(|v| *v != current.details),
    })
}

/// Scalar update and tool reconciliation commit or roll back together.
#[instrument(skip(state, input), fields(project_data_id = ?input.id))]
pub async fn update_project_data(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UpdateProjectDataRequest>,
) -> ApiResult<Updated<ProjectData>> {
    let id = require_id(input.id)?;
    let on_error = || write_error("DB_UPDATE_ERROR", "Error updating project data");

    let mut tx = state.db.begin().await.map_err(on_error())?;
    // Write first so the read below never has to upgrade a shared lock.
    if repo::lock_row(&mut tx, id).await.map_err(on_error())? == 0 {
        return Err(not_found());
    }
    let mut current = repo::find_by_id(&mut tx, id)
        .await
        .map_err(ApiError::db("Error loading project data"))?
        .ok_or_else(not_found)?;

    let changes = collect_changes(&current, &input)?;
    let current_tools = current.tool_ids();
    let diff = input
        .equipos
        .as_deref()
        .map(|requested| ToolSetDiff::between(&current_tools, requested))
        .unwrap_or_default();

    if changes.is_empty() && diff.is_empty() {
        return ok(Updated::unchanged());
    }
    debug!(to_delete = ?diff.to_delete, to_add = ?diff.to_add, "reconciling tools");

    if !changes.is_empty() {
        repo::update(&mut tx, id, &changes)
            .await
            .map_err(on_error())?;
    }
    for tool_id in &diff.to_delete {
        repo::unlink_tool(&mut tx, id, *tool_id)
            .await
            .map_err(on_error())?;
    }
    for tool_id in &diff.to_add {
        repo::link_tool(&mut tx, id, *tool_id)
            .await
            .map_err(on_error())?;
    }
    tx.commit().await.map_err(on_error())?;

    changes.apply_to(&mut current);
    let mut record = ProjectData::from(current);
    if let Some(requested) = &input.equipos {
        record.equipos = normalize(requested);
    }

    info!(
        project_data_id = id,
        removed = diff.to_delete.len(),
        added = diff.to_add.len(),
        "project data updated"
    );
    ok(Updated::Changed(record))
}

/// Tool links go with the record.
#[instrument(skip(state, input))]
pub async fn delete_project_data(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<IdRequest>,
) -> ApiResult<Message> {
    let id = input.require()?;
    let deleted = repo::delete(&state.db, id)
        .await
        .map_err(ApiError::db("Error deleting project data"))?;
    if deleted == 0 {
        return Err(not_found());
    }

    info!(project_data_id = id, "project data deleted");
    ok(Message::new("Project data deleted"))
}

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tracing::{info, instrument};

use super::{
    dto::{
        AssignRequest, ChangeAssociationRequest, CreateProjectRequest, Membership, Project,
        ProjectChanges, ProjectStatus, RemoveAssociationRequest, UpdateProjectRequest,
        UpdateStatusRequest, UserIdRequest, UserProject,
    },
    export::{write_projects_csv, CSV_FILENAME},
    membership::{self, DEFAULT_ROLE_IN_PROJECT},
    repo::{self, NewProject},
};
use crate::{
    dates::{now_rfc3339, parse_day, today},
    error::{is_unique_violation, ApiError},
    request::{require_id, ApiJson, ApiQuery, IdRequest, SearchQuery},
    response::{ok, ApiResult, Message, Updated},
    state::AppState,
    users,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/proyectos", get(list_projects).post(create_project))
        .route("/proyectos/search", get(search_projects))
        .route("/proyectos/update", post(update_project))
        .route("/proyectos/update-status", post(update_status))
        .route("/proyectos/delete", post(delete_project))
        .route("/proyectos/download", get(download_csv))
        .route("/proyectos/asignar", post(assign_user))
        .route("/proyectos/changeAssociation", post(change_association))
        .route("/proyectos/removeAssociation", post(remove_association))
        .route("/proyectos/userProjects", post(user_projects))
        .route("/proyectos/availableForUser", post(available_for_user))
}

fn parse_status(raw: &str) -> Result<ProjectStatus, ApiError> {
    raw.trim().parse().map_err(|_| {
        ApiError::bad_request(
            "INVALID_STATE",
            "Estado must be one of: abierto, cerrado, en pausa",
        )
    })
}

fn check_day(raw: &str, field: &str) -> Result<String, ApiError> {
    let raw = raw.trim();
    match parse_day(raw) {
        Some(_) => Ok(raw.to_string()),
        None => Err(ApiError::bad_request(
            "INVALID_DATE",
            format!("Field '{field}' must be a YYYY-MM-DD date"),
        )),
    }
}

/// `YYYY-MM-DD` strings order the same way as the dates they spell.
fn check_range(inicio: &str, cierre: &str) -> Result<(), ApiError> {
    if cierre < inicio {
        return Err(ApiError::bad_request(
            "INVALID_DATE",
            "Closing date cannot precede start date",
        ));
    }
    Ok(())
}

fn require_ids(ids: &[Option<i64>]) -> Result<Vec<i64>, ApiError> {
    ids.iter()
        .map(|id| id.filter(|id| *id > 0))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| ApiError::bad_request("MISSING_FIELDS", "All id fields are required"))
}

fn project_not_found() -> ApiError {
    ApiError::not_found("PROJECT_NOT_FOUND", "Project not found")
}

#[instrument(skip(state))]
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Vec<Project>> {
    let projects = repo::list(&state.db)
        .await
        .map_err(ApiError::db("Error listing projects"))?;
    ok(projects)
}

#[instrument(skip(state))]
pub async fn search_projects(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<Project>> {
    let projects = match query.pattern() {
        Some(pattern) => repo::search(&state.db, &pattern).await,
        None => repo::list(&state.db).await,
    }
    .map_err(ApiError::db("Error searching projects"))?;
    ok(projects)
}

#[instrument(skip(state, input))]
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CreateProjectRequest>,
) -> ApiResult<Project> {
    let descripcion = input.descripcion.trim();
    if descripcion.is_empty() {
        return Err(ApiError::bad_request(
            "INVALID_INPUT",
            "Field 'descripcion' is required",
        ));
    }
    let fecha_inicio = check_day(&input.fecha_inicio, "fecha_inicio")?;
    let fecha_cierre = check_day(&input.fecha_cierre, "fecha_cierre")?;
    check_range(&fecha_inicio, &fecha_cierre)?;

    let created_at = today();
    let project = repo::create(
        &state.db,
        NewProject {
            descripcion,
            fecha_inicio: &fecha_inicio,
            fecha_cierre: &fecha_cierre,
            created_at: &created_at,
        },
    )
    .await
    .map_err(ApiError::db_with("DB_INSERT_ERROR", "Error creating project"))?;

    info!(project_id = project.id, "project created");
    ok(project)
}

/// Validates every supplied field before anything is written, keeping only
/// those that differ from `current`.
fn collect_changes(current: &Project, input: UpdateProjectRequest) -> Result<ProjectChanges, ApiError> {
    let mut changes = ProjectChanges::default();

    if let Some(descripcion) = input.descripcion.map(|v| v.trim().to_string()) {
        if descripcion.is_empty() {
            return Err(ApiError::bad_request(
                "INVALID_INPUT",
                "Field 'descripcion' cannot be empty",
            ));
        }
        changes.descripcion = Some(descripcion).filter(|v| *v != current.descripcion);
    }
    if let Some(raw) = input.fecha_inicio {
        let day = check_day(&raw, "fecha_inicio")?;
        changes.fecha_inicio = Some(day).filter(|v| *v != current.fecha_inicio);
    }
    if let Some(raw) = input.fecha_cierre {
        let day = check_day(&raw, "fecha_cierre")?;
        changes.fecha_cierre = Some(day).filter(|v| *v != current.fecha_cierre);
    }
    if let Some(raw) = input.estado {
        let estado = parse_status(&raw)?;
        changes.estado = Some(estado).filter(|v| v.as_str() != current.estado);
    }

    if changes.fecha_inicio.is_some() || changes.fecha_cierre.is_some() {
        check_range(
            changes.fecha_inicio.as_deref().unwrap_or(&current.fecha_inicio),
            changes.fecha_cierre.as_deref().unwrap_or(&current.fecha_cierre),
        )?;
    }

    Ok(changes)
}

#[instrument(skip(state, input), fields(project_id = ?input.id))]
pub async fn update_project(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Updated<Project>> {
    let id = require_id(input.id)?;
    let mut current = repo::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::db("Error loading project"))?
        .ok_or_else(project_not_found)?;

    let changes = collect_changes(&current, input)?;
    if changes.is_empty() {
        return ok(Updated::unchanged());
    }

    let updated = repo::update(&state.db, id, &changes)
        .await
        .map_err(ApiError::db_with("DB_UPDATE_ERROR", "Error updating project"))?;
    if updated == 0 {
        return Err(project_not_found());
    }

    changes.apply_to(&mut current);
    info!(project_id = id, "project updated");
    ok(Updated::Changed(current))
}

#[instrument(skip(state, input))]
pub async fn update_status(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Message> {
    let (Some(id), Some(raw)) = (input.id.filter(|id| *id > 0), input.estado) else {
        return Err(ApiError::bad_request(
            "MISSING_FIELDS",
            "Fields 'id' and 'estado' are required",
        ));
    };
    let estado = parse_status(&raw)?;

    let updated = repo::update_status(&state.db, id, estado)
        .await
        .map_err(ApiError::db_with("DB_UPDATE_ERROR", "Error updating project status"))?;
    if updated == 0 {
        return Err(project_not_found());
    }

    info!(project_id = id, %estado, "project status updated");
    ok(Message::new("Project status updated"))
}

/// Memberships and activity records go with the project.
#[instrument(skip(state, input))]
pub async fn delete_project(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<IdRequest>,
) -> ApiResult<Message> {
    let id = input.require()?;
    let deleted = repo::delete(&state.db, id)
        .await
        .map_err(ApiError::db("Error deleting project"))?;
    if deleted == 0 {
        return Err(project_not_found());
    }

    info!(project_id = id, "project deleted");
    ok(Message::new("Project deleted"))
}

#[instrument(skip(state))]
pub async fn download_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    let rows = repo::export_rows(&state.db)
        .await
        .map_err(ApiError::db("Error loading projects"))?;
    let export = write_projects_csv(rows)
        .map_err(ApiError::internal("CSV_ERROR", "Error generating CSV"))?;

    info!(skipped = export.skipped, bytes = export.body.len(), "projects exported");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment;filename={CSV_FILENAME}"),
            ),
            (
                header::HeaderName::from_static("x-skipped-rows"),
                export.skipped.to_string(),
            ),
        ],
        export.body,
    )
        .into_response())
}

async fn ensure_user(state: &AppState, user_id: i64) -> Result<(), ApiError> {
    let found = users::repo::exists(&state.db, user_id)
        .await
        .map_err(ApiError::db("Error checking user"))?;
    if !found {
        return Err(ApiError::not_found("USER_NOT_FOUND", "User not found"));
    }
    Ok(())
}

async fn ensure_project(state: &AppState, project_id: i64) -> Result<(), ApiError> {
    let found = repo::exists(&state.db, project_id)
        .await
        .map_err(ApiError::db("Error checking project"))?;
    if !found {
        return Err(project_not_found());
    }
    Ok(())
}

fn already_assigned() -> ApiError {
    ApiError::conflict("ALREADY_ASSIGNED", "User is already assigned to this project")
}

#[instrument(skip(state, input))]
pub async fn assign_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<AssignRequest>,
) -> ApiResult<Membership> {
    let ids = require_ids(&[input.user_id, input.project_id])?;
    let (user_id, project_id) = (ids[0], ids[1]);

    ensure_user(&state, user_id).await?;
    ensure_project(&state, project_id).await?;

    let member = membership::is_member(&state.db, user_id, project_id)
        .await
        .map_err(ApiError::db("Error checking membership"))?;
    if member {
        return Err(already_assigned());
    }

    let role = input
        .role
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE_IN_PROJECT.to_string());
    let assigned_at = now_rfc3339();

    let membership = membership::assign(&state.db, user_id, project_id, &role, &assigned_at)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                already_assigned()
            } else {
                ApiError::db_with("DB_INSERT_ERROR", "Error assigning user")(e)
            }
        })?;

    info!(user_id, project_id, role = %membership.role_in_project, "user assigned to project");
    ok(membership)
}

#[instrument(skip(state, input))]
pub async fn change_association(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ChangeAssociationRequest>,
) -> ApiResult<Message> {
    let ids = require_ids(&[input.user_id, input.old_project_id, input.new_project_id])?;
    let (user_id, old_project_id, new_project_id) = (ids[0], ids[1], ids[2]);

    ensure_project(&state, new_project_id).await?;
    if old_project_id != new_project_id {
        let member = membership::is_member(&state.db, user_id, new_project_id)
            .await
            .map_err(ApiError::db("Error checking membership"))?;
        if member {
            return Err(already_assigned());
        }
    }

    let moved = membership::change(
        &state.db,
        user_id,
        old_project_id,
        new_project_id,
        &now_rfc3339(),
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            already_assigned()
        } else {
            ApiError::db_with("DB_UPDATE_ERROR", "Error changing association")(e)
        }
    })?;
    if moved == 0 {
        return Err(ApiError::not_found(
            "ASSOCIATION_NOT_FOUND",
            "User is not assigned to the original project",
        ));
    }

    info!(user_id, old_project_id, new_project_id, "membership moved");
    ok(Message::new("Association updated"))
}

#[instrument(skip(state, input))]
pub async fn remove_association(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<RemoveAssociationRequest>,
) -> ApiResult<Message> {
    let ids = require_ids(&[input.user_id, input.project_id])?;
    let (user_id, project_id) = (ids[0], ids[1]);

    let removed = membership::remove(&state.db, user_id, project_id)
        .await
        .map_err(ApiError::db("Error removing association"))?;
    if removed == 0 {
        return Err(ApiError::not_found(
            "ASSOCIATION_NOT_FOUND",
            "User is not assigned to this project",
        ));
    }

    info!(user_id, project_id, "membership removed");
    ok(Message::new("Association removed"))
}

#[instrument(skip(state, input))]
pub async fn user_projects(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UserIdRequest>,
) -> ApiResult<Vec<UserProject>> {
    let user_id = require_ids(&[input.user_id])?[0];
    ensure_user(&state, user_id).await?;

    let projects = membership::projects_of_user(&state.db, user_id)
        .await
        .map_err(ApiError::db("Error listing user projects"))?;
    ok(projects)
}

#[instrument(skip(state, input))]
pub async fn available_for_user(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<UserIdRequest>,
) -> ApiResult<Vec<Project>> {
    let user_id = require_ids(&[input.user_id])?[0];
    ensure_user(&state, user_id).await?;

    let projects = membership::available_for_user(&state.db, user_id)
        .await
        .map_err(ApiError::db("Error listing available projects"))?;
    ok(projects)
}

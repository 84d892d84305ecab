use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{EditUserRequest, Role, User, UserChanges},
    repo,
    validation::{is_valid_email, is_valid_lastname, is_valid_username, normalize_email},
};
use crate::{
    auth::{AdminUser, AuthUser},
    error::{is_foreign_key_violation, is_unique_violation, ApiError},
    request::{require_id, ApiJson, ApiQuery, IdRequest, SearchQuery},
    response::{ok, ApiResult, Message, Updated},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/usuario/listUsers", get(list_users))
        .route("/usuario/search", get(search_users))
        .route("/usuario/roles", get(list_roles))
        .route("/usuario/edit", post(edit_user))
        .route("/usuario/delete", post(delete_user))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = repo::list(&state.db)
        .await
        .map_err(ApiError::db("Error listing users"))?;
    ok(users)
}

#[instrument(skip(state))]
pub async fn search_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Vec<User>> {
    let users = match query.pattern() {
        Some(pattern) => repo::search(&state.db, &pattern).await,
        None => repo::list(&state.db).await,
    }
    .map_err(ApiError::db("Error searching users"))?;
    ok(users)
}

#[instrument(skip(state))]
pub async fn list_roles(State(state): State<AppState>) -> ApiResult<Vec<Role>> {
    let roles = repo::list_roles(&state.db)
        .await
        .map_err(ApiError::db("Error listing roles"))?;
    ok(roles)
}

/// Validates the supplied fields and keeps only those that differ from `current`.
async fn collect_changes(
    state: &AppState,
    current: &User,
    input: EditUserRequest,
) -> Result<UserChanges, ApiError> {
    let mut changes = UserChanges::default();

    if let Some(name) = input.name.map(|v| v.trim().to_string()) {
        if name.is_empty() {
            return Err(ApiError::bad_request("INVALID_DATA", "Name cannot be empty"));
        }
        changes.name = Some(name).filter(|v| *v != current.name);
    }
    if let Some(lastname) = input.lastname.map(|v| v.trim().to_string()) {
        if !is_valid_lastname(&lastname) {
            return Err(ApiError::bad_request(
                "INVALID_LASTNAME",
                "Lastname may only contain letters and spaces",
            ));
        }
        changes.lastname = Some(lastname).filter(|v| *v != current.lastname);
    }
    if let Some(username) = input.username.map(|v| v.trim().to_string()) {
        if !is_valid_username(&username) {
            return Err(ApiError::bad_request(
                "INVALID_USERNAME",
                "Username may only contain letters, digits and underscores",
            ));
        }
        changes.username = Some(username).filter(|v| *v != current.username);
    }
    if let Some(email) = input.email.map(|v| normalize_email(&v)) {
        if !is_valid_email(&email) {
            return Err(ApiError::bad_request("INVALID_EMAIL", "Invalid email"));
        }
        changes.email = Some(email).filter(|v| *v != current.email);
    }
    if let Some(role) = input.role.map(|v| v.trim().to_string()) {
        if role != current.role {
            let known = repo::role_exists(&state.db, &role)
                .await
                .map_err(ApiError::db("Error checking role"))?;
            if !known {
                return Err(ApiError::bad_request("INVALID_ROLE", "Unknown role"));
            }
            changes.role = Some(role);
        }
    }

    if let Some(username) = &changes.username {
        let taken = repo::username_taken(&state.db, username)
            .await
            .map_err(ApiError::db("Error checking username"))?;
        if taken {
            return Err(ApiError::conflict("USERNAME_EXISTS", "Username is already taken"));
        }
    }
    if let Some(email) = &changes.email {
        let taken = repo::email_taken(&state.db, email)
            .await
            .map_err(ApiError::db("Error checking email"))?;
        if taken {
            return Err(ApiError::conflict("EMAIL_EXISTS", "Email is already registered"));
        }
    }

    Ok(changes)
}

/// Admins may edit anyone; other users only themselves and never their role.
#[instrument(skip(state, caller, input), fields(caller = caller.user_id()))]
pub async fn edit_user(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(input): ApiJson<EditUserRequest>,
) -> ApiResult<Updated<User>> {
    let id = require_id(input.id)?;
    if !caller.is_admin() && caller.user_id() != id {
        warn!(target_user = id, "user edit denied");
        return Err(ApiError::forbidden("You can only edit your own account"));
    }

    let mut current = repo::find_by_id(&state.db, id)
        .await
        .map_err(ApiError::db("Error loading user"))?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    let changes = collect_changes(&state, &current, input).await?;
    if changes.role.is_some() && !caller.is_admin() {
        return Err(ApiError::forbidden("Only an administrator can change roles"));
    }
    if changes.is_empty() {
        return ok(Updated::unchanged());
    }

    repo::update(&state.db, id, &changes).await.map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("USER_EXISTS", "Username or email already exists")
        } else {
            ApiError::db_with("DB_UPDATE_ERROR", "Error updating user")(e)
        }
    })?;

    changes.apply_to(&mut current);
    info!(user_id = id, "user updated");
    ok(Updated::Changed(current))
}

#[instrument(skip(state, admin, input), fields(admin = admin.0.user_id()))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    ApiJson(input): ApiJson<IdRequest>,
) -> ApiResult<Message> {
    let id = input.require()?;
    let deleted = repo::delete(&state.db, id).await.map_err(|e| {
        if is_foreign_key_violation(&e) {
            ApiError::conflict("USER_IN_USE", "User is responsible for project records")
        } else {
            ApiError::db("Error deleting user")(e)
        }
    })?;
    if deleted == 0 {
        return Err(ApiError::not_found("USER_NOT_FOUND", "User not found"));
    }

    info!(user_id = id, "user deleted");
    ok(Message::new("User deleted"))
}

use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    jwt::JwtKeys,
    middleware::AuthUser,
    password::{hash_password, verify_password},
    repo,
};
use crate::{
    error::{is_unique_violation, ApiError},
    request::ApiJson,
    response::{ok, ApiResult, Message},
    state::AppState,
    users::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, User},
        repo::{self as users_repo, NewUser},
        validation::{
            is_valid_email, is_valid_lastname, is_valid_username, normalize_email,
            MIN_PASSWORD_LEN,
        },
    },
};

const DEFAULT_ROLE: &str = "user";

/// Login and registration, reachable without a token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/usuario/login", post(login))
        .route("/usuario/register", post(register))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new().route("/usuario/logout", post(logout))
}

#[instrument(skip(state, caller, payload))]
pub async fn register(
    State(state): State<AppState>,
    caller: Option<AuthUser>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<User> {
    let email = normalize_email(&payload.email);
    let name = payload.name.trim();
    let lastname = payload.lastname.trim();
    let username = payload.username.trim();

    if name.is_empty()
        || lastname.is_empty()
        || username.is_empty()
        || email.is_empty()
        || payload.password.chars().count() < MIN_PASSWORD_LEN
    {
        return Err(ApiError::bad_request(
            "INVALID_DATA",
            "All fields are required and the password must have at least 6 characters",
        ));
    }
    if !is_valid_username(username) {
        return Err(ApiError::bad_request(
            "INVALID_USERNAME",
            "Username may only contain letters, digits and underscores",
        ));
    }
    if !is_valid_lastname(lastname) {
        return Err(ApiError::bad_request(
            "INVALID_LASTNAME",
            "Lastname may only contain letters and spaces",
        ));
    }
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("INVALID_EMAIL", "Invalid email"));
    }

    let role = payload
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_ROLE);
    if role != DEFAULT_ROLE && !caller.as_ref().is_some_and(AuthUser::is_admin) {
        warn!(role, "elevated role requested without admin token");
        return Err(ApiError::forbidden(
            "Only an administrator can register users with this role",
        ));
    }
    let role_known = users_repo::role_exists(&state.db, role)
        .await
        .map_err(ApiError::db("Error checking role"))?;
    if !role_known {
        return Err(ApiError::bad_request("INVALID_ROLE", "Unknown role"));
    }

    let username_taken = users_repo::username_taken(&state.db, username)
        .await
        .map_err(ApiError::db("Error checking username"))?;
    let email_taken = users_repo::email_taken(&state.db, &email)
        .await
        .map_err(ApiError::db("Error checking email"))?;
    match (username_taken, email_taken) {
        (true, true) => {
            return Err(ApiError::conflict(
                "USER_AND_EMAIL_EXIST",
                "Username and email already exist",
            ))
        }
        (true, false) => {
            return Err(ApiError::conflict("USERNAME_EXISTS", "Username is already taken"))
        }
        (false, true) => {
            return Err(ApiError::conflict("EMAIL_EXISTS", "Email is already registered"))
        }
        (false, false) => {}
    }

    let hash = hash_password(&payload.password)
        .map_err(ApiError::internal("HASH_ERROR", "Error hashing password"))?;

    let user = users_repo::create(
        &state.db,
        NewUser {
            name,
            lastname,
            username,
            email: &email,
            password_hash: &hash,
            role,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("USER_EXISTS", "Username or email already exists")
        } else {
            ApiError::db("Error registering user")(e)
        }
    })?;

    info!(user_id = user.id, email = %user.email, role = %user.role, "user registered");
    ok(user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let email = normalize_email(&payload.email);
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::bad_request(
            "MISSING_FIELDS",
            "Email and password are required",
        ));
    }

    let found = users_repo::find_by_email(&state.db, &email)
        .await
        .map_err(ApiError::db("Error looking up user"))?;
    let Some(found) = found else {
        warn!(%email, "login unknown email");
        return Err(ApiError::unauthorized("USER_NOT_FOUND", "User not found"));
    };

    let matches = verify_password(&payload.password, &found.password_hash)
        .map_err(ApiError::internal("HASH_ERROR", "Error verifying password"))?;
    if !matches {
        warn!(%email, user_id = found.user.id, "login invalid password");
        return Err(ApiError::unauthorized("INVALID_PASSWORD", "Invalid password"));
    }

    let user = found.user;
    let keys = JwtKeys::from_ref(&state);
    let issued = keys
        .sign(user.id, &user.email, &user.role)
        .map_err(ApiError::internal("TOKEN_ERROR", "Error generating token"))?;
    repo::record_token(&state.db, &issued)
        .await
        .map_err(ApiError::db("Error storing token"))?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    ok(LoginResponse {
        token: issued.token,
        user,
    })
}

#[instrument(skip(state, caller), fields(user_id = caller.user_id()))]
pub async fn logout(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Message> {
    repo::revoke_token(&state.db, &caller.token)
        .await
        .map_err(ApiError::db("Error revoking token"))?;
    info!("user logged out");
    ok(Message::new("Session closed"))
}

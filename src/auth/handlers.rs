use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::User,
    },
    error::ApiError,
    state::AppState,
    validation::{check_rules, is_valid_email, Rule},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
}

const REGISTER_RULES: &[Rule<RegisterRequest>] = &[
    Rule {
        field: "name",
        message: "Name is required",
        check: |r| !r.name.trim().is_empty(),
    },
    Rule {
        field: "email",
        message: "Please provide a valid email",
        check: |r| is_valid_email(&r.email),
    },
    Rule {
        field: "password",
        message: "Password must be at least 6 characters long",
        check: |r| r.password.len() >= 6,
    },
];

const LOGIN_RULES: &[Rule<LoginRequest>] = &[
    Rule {
        field: "email",
        message: "Please provide a valid email",
        check: |r| is_valid_email(&r.email),
    },
    Rule {
        field: "password",
        message: "Password is required",
        check: |r| !r.password.is_empty(),
    },
];

// Identical wording for unknown email and wrong password, so a caller
// cannot tell which accounts exist.
const BAD_CREDENTIALS: &str = "Invalid email or password";

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    check_rules(&payload, REGISTER_RULES)?;

    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("User already exists with this email"));
    }

    let hash = hash_password(&payload.password)?;
    let user = match User::create(&state.db, payload.name.trim(), &payload.email, &hash).await {
        Ok(u) => u,
        // A concurrent register can slip past the lookup; the unique
        // index on email is the source of truth.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email already registered (unique index)");
            return Err(ApiError::Conflict("User already exists with this email"));
        }
        Err(e) => return Err(e.into()),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            token,
            user: PublicUser {
                id: user.id,
                name: user.name,
                email: user.email,
            },
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();
    check_rules(&payload, LOGIN_RULES)?;

    let user = match User::find_by_email(&state.db, &payload.email).await? {
        Some(u) => u,
        None => {
            warn!(email = %payload.email, "login unknown email");
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized(BAD_CREDENTIALS));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(AuthResponse {
        message: "Login successful",
        token,
        user: PublicUser {
            id: user.id,
            name: user.name,
            email: user.email,
        },
    }))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

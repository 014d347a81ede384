use axum::{
    extract::{Query, State},
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, LogoutQuery, LogoutResponse, RegisterRequest, TokenResponse},
        password::{hash_password, verify_password},
        repo::User,
        sessions::{create_session, revoke_session},
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }

    // Friendly pre-check; under a concurrent race the unique index on the
    // email field is what actually decides.
    if User::find_by_email(state.store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&state.config.secret_salt, &payload.password);
    let user = User::create(state.store.as_ref(), &payload.name, &payload.email, &hash)
        .await?
        .ok_or_else(|| ApiError::Conflict("Email already registered".into()))?;

    let token = create_session(
        state.store.as_ref(),
        &user.email,
        state.config.session_ttl_days,
    )
    .await?;

    info!(email = %user.email, "user registered");
    Ok(Json(TokenResponse {
        token,
        name: user.name,
        email: user.email,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = match User::find_by_email(state.store.as_ref(), &payload.email).await? {
        Some(user)
            if verify_password(
                &state.config.secret_salt,
                &payload.password,
                &user.password_hash,
            ) =>
        {
            user
        }
        // Same response for unknown email and bad password.
        _ => {
            warn!(email = %payload.email, "login rejected");
            return Err(ApiError::Unauthorized("Invalid email or password".into()));
        }
    };

    let token = create_session(
        state.store.as_ref(),
        &user.email,
        state.config.session_ttl_days,
    )
    .await?;

    info!(email = %user.email, "user logged in");
    Ok(Json(TokenResponse {
        token,
        name: user.name,
        email: user.email,
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<LogoutQuery>,
) -> Result<Json<LogoutResponse>, ApiError> {
    if let Some(token) = query.token.as_deref() {
        revoke_session(state.store.as_ref(), token).await?;
    }
    Ok(Json(LogoutResponse { success: true }))
}

use std::sync::LazyLock;

use axum::{
    Json, extract::State, extract::rejection::JsonRejection, http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};

use messagely_auth::password::{hash_password, verify_password};
use messagely_db::Database;
use messagely_db::models::{NewUser, UserRow};
use messagely_types::api::{LoginRequest, RegisterRequest, TokenResponse};

use crate::error::ApiError;
use crate::{AppState, json_body, required, run_blocking};

/// Hash checked against when the username is unknown, so a miss costs the
/// same Argon2 work as a wrong password.
static DECOY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    hash_password("messagely-decoy-password")
        .map_err(|e| error!("Decoy hash unavailable, unknown-user logins will be faster: {}", e))
        .ok()
});

/// Compute the decoy hash up front so the first unknown-user login does not
/// pay for building it. Returns whether the decoy is in place.
pub fn prepare_decoy() -> bool {
    LazyLock::force(&DECOY_HASH).is_some()
}

/// Check a username/password pair. Unknown users and wrong passwords both
/// yield `Ok(false)`.
pub fn authenticate(db: &Database, username: &str, password: &str) -> Result<bool, ApiError> {
    match db.get_password_hash(username)? {
        Some(hash) => Ok(verify_password(password, &hash)?),
        None => {
            if let Some(decoy) = DECOY_HASH.as_deref() {
                let _ = verify_password(password, decoy);
            }
            Ok(false)
        }
    }
}

/// Hash the password and create the user.
pub fn register_user(db: &Database, profile: &NewUser<'_>, password: &str) -> Result<UserRow, ApiError> {
    let password_hash = hash_password(password)?;
    Ok(db.create_user(profile, &password_hash)?)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(payload)?;
    let username = required("username", req.username)?;
    let password = required("password", req.password)?;
    let first_name = required("first_name", req.first_name)?;
    let last_name = required("last_name", req.last_name)?;
    let phone = required("phone", req.phone)?;

    let token = run_blocking(&state, move |s| {
        let profile = NewUser {
            username: &username,
            first_name: &first_name,
            last_name: &last_name,
            phone: &phone,
        };
        let user = register_user(&s.db, &profile, &password)?;
        info!("Registered user {}", user.username);
        Ok(s.tokens.issue(&user.username)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let req = json_body(payload)?;
    let username = required("username", req.username)?;
    let password = required("password", req.password)?;

    let token = run_blocking(&state, move |s| {
        if !authenticate(&s.db, &username, &password)? {
            warn!("Failed login attempt for {}", username);
            return Err(ApiError::InvalidCredentials);
        }

        s.db.touch_login(&username)?;
        info!("{} logged in", username);
        Ok(s.tokens.issue(&username)?)
    })
    .await?;

    Ok(Json(TokenResponse { token }))
}

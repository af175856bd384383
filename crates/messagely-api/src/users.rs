use axum::{
    Extension, Json,
    extract::{Path, State, rejection::PathRejection},
};

use messagely_auth::{Action, CallerIdentity};
use messagely_types::api::{InboxResponse, OutboxResponse, UserResponse, UsersResponse};

use crate::error::ApiError;
use crate::middleware::enforce;
use crate::{AppState, convert, path_param, run_blocking};

/// GET /users — public profile of every user.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<UsersResponse>, ApiError> {
    enforce(&caller, Action::ListUsers)?;

    let rows = run_blocking(&state, |s| Ok(s.db.list_users()?)).await?;

    Ok(Json(UsersResponse {
        users: rows.into_iter().map(convert::summary).collect(),
    }))
}

/// GET /users/{username} — full profile, own account only.
pub async fn get_user(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<UserResponse>, ApiError> {
    let username = path_param(username)?;
    enforce(&caller, Action::ViewProfile { username: &username })?;

    let row = run_blocking(&state, move |s| Ok(s.db.get_user(&username)?)).await?;

    Ok(Json(UserResponse {
        user: convert::user_detail(row)?,
    }))
}

/// GET /users/{username}/to — messages received, own account only.
pub async fn messages_to(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<InboxResponse>, ApiError> {
    let username = path_param(username)?;
    enforce(&caller, Action::ListMessages { username: &username })?;

    let rows = run_blocking(&state, move |s| Ok(s.db.messages_to(&username)?)).await?;

    Ok(Json(InboxResponse {
        messages: rows
            .into_iter()
            .map(convert::inbox_message)
            .collect::<Result<_, _>>()?,
    }))
}

/// GET /users/{username}/from — messages sent, own account only.
pub async fn messages_from(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<OutboxResponse>, ApiError> {
    let username = path_param(username)?;
    enforce(&caller, Action::ListMessages { username: &username })?;

    let rows = run_blocking(&state, move |s| Ok(s.db.messages_from(&username)?)).await?;

    Ok(Json(OutboxResponse {
        messages: rows
            .into_iter()
            .map(convert::outbox_message)
            .collect::<Result<_, _>>()?,
    }))
}

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use messagely_auth::{Action, CallerIdentity};
use messagely_types::api::{
    MessageResponse, ReadReceiptResponse, SendMessageRequest, SentMessageResponse,
};

use crate::error::ApiError;
use crate::middleware::enforce;
use crate::{AppState, convert, json_body, path_param, required, run_blocking};

/// GET /messages/{id} — readable by the sender and the recipient.
pub async fn get_message(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = path_param(id)?;
    let row = run_blocking(&state, move |s| Ok(s.db.get_message(id)?)).await?;

    enforce(
        &caller,
        Action::ReadMessage {
            from_username: &row.from_user.username,
            to_username: &row.to_user.username,
        },
    )?;

    Ok(Json(MessageResponse {
        message: convert::message_detail(row)?,
    }))
}

/// POST /messages — the sender is always the caller.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    enforce(&caller, Action::SendMessage)?;

    let req = json_body(payload)?;
    let to_username = required("to_username", req.to_username)?;
    let body = required("body", req.body)?;

    let from_username = caller.username().to_string();
    let row = run_blocking(&state, move |s| {
        Ok(s.db.create_message(&from_username, &to_username, &body)?)
    })
    .await?;

    info!("{} sent message {} to {}", row.from_username, row.id, row.to_username);

    Ok((
        StatusCode::CREATED,
        Json(SentMessageResponse {
            message: convert::sent_message(row)?,
        }),
    ))
}

/// POST /messages/{id}/read — recipient only. Marking twice keeps the first
/// `read_at`.
pub async fn mark_read(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<ReadReceiptResponse>, ApiError> {
    let id = path_param(id)?;
    let receipt = run_blocking(&state, move |s| {
        let message = s.db.get_message(id)?;
        enforce(
            &caller,
            Action::MarkRead {
                to_username: &message.to_user.username,
            },
        )?;
        Ok(s.db.mark_read(id)?)
    })
    .await?;

    Ok(Json(ReadReceiptResponse {
        message: convert::read_receipt(receipt)?,
    }))
}

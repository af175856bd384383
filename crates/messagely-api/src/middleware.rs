use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::warn;

use messagely_auth::{Action, CallerIdentity, Decision, decide};

use crate::AppState;
use crate::error::ApiError;

/// Verify the bearer token and attach the caller's identity to the request.
/// Requests without a valid token stop here, before any lookup.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Authorization(bearer) = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::InvalidToken)?;

    let caller = state.tokens.verify(bearer.token())?;

    req.extensions_mut().insert(caller);
    Ok(next.run(req).await)
}

/// Apply the access policy, turning a denial into `PermissionDenied`.
pub fn enforce(caller: &CallerIdentity, action: Action<'_>) -> Result<(), ApiError> {
    match decide(caller, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            warn!("Denied {:?} for {}", action, caller.username());
            Err(ApiError::PermissionDenied)
        }
    }
}

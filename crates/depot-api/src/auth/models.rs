use axum::extract::FromRequestParts;
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use depot_core::models::Caller;

use crate::error::ErrorResponse;

/// Whoever is making the request, possibly anonymous.
#[derive(Debug, Clone, Copy)]
pub struct CurrentCaller(pub Caller);

/// An authenticated caller. Anonymous requests are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub Caller);

fn caller_from_parts(parts: &Parts) -> Caller {
    parts
        .extensions
        .get::<Caller>()
        .copied()
        .unwrap_or_else(Caller::anonymous)
}

impl<S> FromRequestParts<S> for CurrentCaller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentCaller(caller_from_parts(parts)))
    }
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = caller_from_parts(parts);
        if caller.is_authenticated() {
            return Ok(RequireUser(caller));
        }

        let mut body = ErrorResponse::new("Authentication required", "UNAUTHENTICATED");
        body.suggested_action = Some("Send a bearer token".to_string());
        Err((StatusCode::UNAUTHORIZED, Json(body)))
    }
}

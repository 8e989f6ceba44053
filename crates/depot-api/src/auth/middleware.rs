use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use depot_core::models::Caller;
use depot_core::AppError;
use subtle::ConstantTimeEq;

use crate::error::HttpAppError;
use crate::state::AuthState;

fn secure_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Find the caller a bearer token belongs to. Every configured token is compared so the
/// time taken does not depend on which one matched.
fn caller_for_token(auth: &AuthState, token: &str) -> Option<Caller> {
    let mut matched = None;
    for entry in auth.tokens.iter() {
        if secure_compare(&entry.token, token) && matched.is_none() {
            matched = Some(Caller::user(entry.user_id, entry.role));
        }
    }
    matched
}

/// Attach a `Caller` to every request.
///
/// No `Authorization` header means an anonymous caller. A header that is malformed or
/// carries an unknown token is rejected with 401.
pub async fn caller_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or_default().to_string());

    let caller = match header {
        None => Caller::anonymous(),
        Some(value) => {
            let Some(token) = value.strip_prefix("Bearer ") else {
                tracing::debug!("Rejected authorization header with unsupported scheme");
                return HttpAppError(AppError::Unauthenticated(
                    "Invalid authorization header format".to_string(),
                ))
                .into_response();
            };

            match caller_for_token(&auth, token.trim()) {
                Some(caller) => caller,
                None => {
                    tracing::warn!("Rejected unknown bearer token");
                    return HttpAppError(AppError::Unauthenticated(
                        "Invalid bearer token".to_string(),
                    ))
                    .into_response();
                }
            }
        }
    };

    request.extensions_mut().insert(caller);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::models::Role;
    use depot_core::ApiToken;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_secure_compare() {
        assert!(secure_compare("token", "token"));
        assert!(!secure_compare("token", "tokem"));
        assert!(!secure_compare("token", "token2"));
    }

    #[test]
    fn test_caller_for_token() {
        let user_id = Uuid::new_v4();
        let auth = AuthState {
            tokens: Arc::new(vec![ApiToken {
                token: "staff-token".to_string(),
                user_id,
                role: Role::Moderator,
            }]),
        };

        assert_eq!(
            caller_for_token(&auth, "staff-token"),
            Some(Caller::user(user_id, Role::Moderator))
        );
        assert_eq!(caller_for_token(&auth, "other"), None);
    }
}

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::jwt::{self, JwtError};
use crate::error::AppError;
use crate::state::AppState;
use crate::users::repository;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
}

/// Extractor that requires a valid `Authorization: Bearer <jwt>` header.
/// Returns 401 if the token is missing, invalid, expired, or its user no longer exists.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts).ok_or_else(AppError::unauthorized)?;

        let claims = jwt::verify_access_token(&state.jwt_secret, token).map_err(|e| match e {
            JwtError::Expired => AppError::Unauthorized("Token expired".into()),
            other => {
                tracing::debug!("Rejected access token: {}", other);
                AppError::unauthorized()
            }
        })?;

        let user = repository::find_by_id(&state.db, &claims.sub)?
            .ok_or_else(AppError::unauthorized)?;

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
        })
    }
}

fn extract_bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| {
            let (scheme, token) = s.trim().split_once(' ')?;
            if scheme.eq_ignore_ascii_case("bearer") {
                Some(token.trim())
            } else {
                None
            }
        })
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(v) = value {
            builder = builder.header(header::AUTHORIZATION, v);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_is_extracted() {
        let parts = parts_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(extract_bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let parts = parts_with_auth(Some("bearer abc"));
        assert_eq!(extract_bearer_token(&parts), Some("abc"));
    }

    #[test]
    fn missing_or_foreign_scheme_yields_none() {
        assert_eq!(extract_bearer_token(&parts_with_auth(None)), None);
        assert_eq!(
            extract_bearer_token(&parts_with_auth(Some("Basic dXNlcjpwYXNz"))),
            None
        );
        assert_eq!(extract_bearer_token(&parts_with_auth(Some("Bearer "))), None);
    }
}

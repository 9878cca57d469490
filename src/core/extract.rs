//! Path extractors enforcing the route patterns `{id:[0-9]+}` and
//! `{firstname:[a-zA-Z]+}/{lastname:[a-zA-Z]+}`
//!
//! A segment that does not match its pattern is answered with a bare 404,
//! exactly as if no route had matched.

use axum::{
    extract::{FromRequestParts, Path},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use super::http::ApiError;
use crate::models::User;

/// `[0-9]+`
pub fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// `[a-zA-Z]+`
pub fn is_alphabetic(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_alphabetic())
}

/// Numeric user id from the `{id}` segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i32);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::NOT_FOUND.into_response())?;

        if !is_numeric(&raw) {
            return Err(StatusCode::NOT_FOUND.into_response());
        }

        // Matches the pattern but does not fit the id type
        raw.parse::<i32>()
            .map(UserId)
            .map_err(|_| ApiError::InvalidId(raw).into_response())
    }
}

/// Name pair from the `{firstname}/{lastname}` segments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullName {
    pub firstname: String,
    pub lastname: String,
}

impl From<FullName> for User {
    fn from(name: FullName) -> Self {
        User::named(name.firstname, name.lastname)
    }
}

impl<S> FromRequestParts<S> for FullName
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path((firstname, lastname)) = Path::<(String, String)>::from_request_parts(parts, state)
            .await
            .map_err(|_| StatusCode::NOT_FOUND.into_response())?;

        if !is_alphabetic(&firstname) || !is_alphabetic(&lastname) {
            return Err(StatusCode::NOT_FOUND.into_response());
        }

        Ok(Self {
            firstname,
            lastname,
        })
    }
}

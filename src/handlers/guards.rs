//! Request identity supplied by the authenticating proxy in front of the API.
//!
//! Tokens are validated upstream; this layer only reads the forwarded
//! identity headers and checks roles.

use crate::errors::AppError;
use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use tracing::warn;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestUser {
    pub id: String,
    /// Display name, used as the reviewer identity. Falls back to the id.
    pub name: String,
    pub is_admin: bool,
    pub is_seller: bool,
}

impl RequestUser {
    /// Build the caller from forwarded headers. `None` without an id.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let id = header(USER_ID_HEADER)?.to_string();
        let name = header(USER_NAME_HEADER).unwrap_or(&id).to_string();

        let (mut is_admin, mut is_seller) = (false, false);
        for role in header(USER_ROLES_HEADER).unwrap_or("").split(',') {
            match role.trim().to_ascii_lowercase().as_str() {
                "admin" => is_admin = true,
                "seller" => is_seller = true,
                _ => {}
            }
        }

        Some(Self {
            id,
            name,
            is_admin,
            is_seller,
        })
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            warn!(user = %self.id, "admin role required");
            Err(AppError::forbidden("Invalid Admin Token"))
        }
    }

    pub fn require_seller_or_admin(&self) -> Result<(), AppError> {
        if self.is_admin || self.is_seller {
            Ok(())
        } else {
            warn!(user = %self.id, "seller or admin role required");
            Err(AppError::forbidden("Invalid Admin/Seller Token"))
        }
    }
}

impl<S> FromRequestParts<S> for RequestUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<RequestUser>() {
            return Ok(user.clone());
        }

        match RequestUser::from_headers(&parts.headers) {
            Some(user) => {
                parts.extensions.insert(user.clone());
                Ok(user)
            }
            None => {
                warn!(uri = %parts.uri, "request without identity");
                Err(AppError::unauthorized("No Token"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn missing_id_is_anonymous() {
        assert_eq!(RequestUser::from_headers(&HeaderMap::new()), None);
        assert_eq!(
            RequestUser::from_headers(&headers(&[(USER_ID_HEADER, "  ")])),
            None
        );
    }

    #[test]
    fn roles_and_name_fallback() {
        let user = RequestUser::from_headers(&headers(&[
            (USER_ID_HEADER, "u1"),
            (USER_ROLES_HEADER, "Seller, viewer"),
        ]))
        .unwrap();
        assert_eq!(user.name, "u1");
        assert!(user.is_seller && !user.is_admin);
        assert!(user.require_seller_or_admin().is_ok());
        assert_eq!(
            user.require_admin().unwrap_err().status,
            axum::http::StatusCode::FORBIDDEN
        );
    }
}

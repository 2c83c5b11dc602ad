use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use crate::auth::jwt;
use crate::auth::Capability;
use crate::error::AppError;
use crate::state::SharedState;

/// The authenticated caller: identity plus the capability set carried in the
/// token. Tenant scoping and permission checks both start from here; there is
/// no ambient "current user" anywhere else.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub email: Option<String>,
    pub caps: Vec<String>,
}

impl AuthUser {
    pub fn has(&self, cap: Capability) -> bool {
        self.caps.iter().any(|c| c == cap.as_str())
    }

    /// The permission gate. Denial is a visible 403, never an empty result.
    pub fn require(&self, cap: Capability) -> Result<(), AppError> {
        if self.has(cap) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "Missing required capability: {}",
                cap.as_str()
            )))
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

impl From<jwt::Claims> for AuthUser {
    fn from(claims: jwt::Claims) -> Self {
        AuthUser {
            user_id: claims.sub,
            tenant_id: claims.tid,
            email: claims.email,
            caps: claims.caps,
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        // Try Bearer token from Authorization header first
        if let Some(auth_header) = parts.headers.get("authorization") {
            let auth_str = auth_header
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid authorization header".to_string()))?;

            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                let claims = jwt::decode_token(token, &state.config.jwt_secret)
                    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
                return Ok(claims.into());
            }
        }

        // Try cookie-based auth
        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(cookie) = jar.get("access_token") {
            let claims = jwt::decode_token(cookie.value(), &state.config.jwt_secret)
                .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;
            return Ok(claims.into());
        }

        Err(AppError::Unauthorized(
            "Missing authentication token".to_string(),
        ))
    }
}

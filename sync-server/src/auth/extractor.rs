//! JWT Extractor
//!
//! Custom extractor for automatically validating JWT tokens

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::ErrorCode;

use crate::AppError;
use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;

/// Tenant header sent by devices alongside the bearer token
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Validate a raw token and build the caller context
///
/// Shared by the header extractor and the WebSocket hub, which receives the
/// token as a query parameter.
pub fn authenticate_token(
    jwt_service: &JwtService,
    token: &str,
    uri: &str,
) -> Result<CurrentUser, AppError> {
    match jwt_service.validate_token(token) {
        Ok(claims) => CurrentUser::try_from(claims).map_err(|e| {
            security_log!("WARN", "auth_bad_claims", error = e.to_string(), uri = uri);
            AppError::invalid_token(format!("Malformed JWT claims: {}", e))
        }),
        Err(e) => {
            security_log!("WARN", "auth_failed", error = e.to_string(), uri = uri);
            match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            }
        }
    }
}

/// JWT Auth Extractor
///
/// Use this extractor in protected handlers to automatically validate JWT
/// and extract CurrentUser
impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let uri = parts.uri.to_string();

        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
            None => {
                security_log!("WARN", "auth_missing", uri = uri.as_str());
                return Err(AppError::not_authenticated());
            }
        };

        let user = authenticate_token(&state.get_jwt_service(), token, &uri)?;

        // X-Tenant-ID 可选，出现时必须与令牌一致
        if let Some(header_tenant) = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            && header_tenant != user.tenant_id
        {
            security_log!(
                "WARN",
                "tenant_mismatch",
                staff_id = user.id.as_str(),
                uri = uri.as_str()
            );
            return Err(AppError::with_message(
                ErrorCode::TenantMismatch,
                "X-Tenant-ID does not match the token tenant",
            ));
        }

        // Store in extensions for potential reuse
        parts.extensions.insert(user.clone());

        Ok(user)
    }
}

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use super::app_state::AppState;

/// Extractor that admits the platform gateway: the request must carry
/// `Authorization: Bearer <ingest_secret>`.
pub struct GatewayAuth;

impl FromRequestParts<Arc<AppState>> for GatewayAuth {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if state.ingest_secret.is_empty() {
            return Err((StatusCode::SERVICE_UNAVAILABLE, "Event ingest is disabled").into_response());
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| (StatusCode::UNAUTHORIZED, "Missing bearer token").into_response())?;

        if bearer.token() != state.ingest_secret {
            return Err((StatusCode::UNAUTHORIZED, "Invalid bearer token").into_response());
        }
        Ok(GatewayAuth)
    }
}

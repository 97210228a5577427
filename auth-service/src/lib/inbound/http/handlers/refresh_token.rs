use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::ports::AuthServicePort;
use crate::inbound::http::router::AppState;

pub const REFRESH_TOKEN_HEADER: &str = "Refresh-Token";

pub async fn refresh_token<AS: AuthServicePort>(
    State(state): State<AppState<AS>>,
    headers: HeaderMap,
) -> Result<ApiSuccess<RefreshTokenResponseData>, ApiError> {
    let token = headers
        .get(REFRESH_TOKEN_HEADER)
        .map(|value| value.to_str())
        .transpose()
        .map_err(|_| ApiError::BadRequest("Invalid Refresh-Token header".to_string()))?
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Refresh token is required".to_string()))?;

    state
        .auth_service
        .refresh_token(token)
        .await
        .map_err(ApiError::from)
        .map(|access| ApiSuccess::new(StatusCode::OK, access.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshTokenResponseData {
    pub access_token: String,
    pub expires_in: i64,
}

impl From<auth::AccessToken> for RefreshTokenResponseData {
    fn from(access: auth::AccessToken) -> Self {
        Self {
            access_token: access.token,
            expires_in: access.expires_in,
        }
    }
}

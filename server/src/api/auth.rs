// server/src/api/auth.rs
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use models::medical::user::User;
use models::schemas::{LoginRequest, MessageResponse, RegisterRequest, TokenResponse};

use crate::api::error::HandlerResult;
use crate::api::state::SharedState;

pub async fn login(
    State(state): State<SharedState>,
    Json(request): Json<LoginRequest>,
) -> HandlerResult<Json<TokenResponse>> {
    let user = state
        .users
        .authenticate(&request.username, &request.password)
        .await?;
    let token = state.tokens.mint(&user)?;
    Ok(Json(TokenResponse::bearer(token)))
}

pub async fn register(
    State(state): State<SharedState>,
    Json(request): Json<RegisterRequest>,
) -> HandlerResult<Json<User>> {
    let user = state.users.register(request).await?;
    Ok(Json(user))
}

pub async fn me(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> HandlerResult<Json<User>> {
    let user = state.authorize(&headers).await?;
    Ok(Json(user))
}

/// Tokens are stateless; logout is the client discarding its token.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Session closed".to_string(),
    })
}

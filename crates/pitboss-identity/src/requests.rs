use serde::{Deserialize, Serialize};

use pitboss_core::{ActorType, RequestMeta, ResponseMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub meta: RequestMeta,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub meta: ResponseMeta,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRequest {
    pub meta: RequestMeta,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenResponse {
    pub meta: ResponseMeta,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub meta: RequestMeta,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCredentialRequest {
    pub meta: RequestMeta,
    pub actor_id: String,
    pub actor_type: ActorType,
    pub new_credential: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCredentialResponse {
    pub meta: ResponseMeta,
}

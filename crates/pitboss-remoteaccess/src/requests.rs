use serde::{Deserialize, Serialize};

use pitboss_core::{RequestMeta, ResponseMeta};

use crate::model::RemoteAccessActivity;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRemoteAccessActivitiesRequest {
    pub meta: RequestMeta,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRemoteAccessActivitiesResponse {
    pub meta: ResponseMeta,
    pub activities: Vec<RemoteAccessActivity>,
    pub next_offset: i64,
}

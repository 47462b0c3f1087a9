use serde::{Deserialize, Serialize};
use serde_json::Value;

use pitboss_core::{RequestMeta, ResponseMeta};

use crate::model::ReportRun;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReportRequest {
    pub meta: RequestMeta,
    pub kind: String,
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReportResponse {
    pub meta: ResponseMeta,
    pub run_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReportRunsRequest {
    pub meta: RequestMeta,
    pub page_size: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReportRunsResponse {
    pub meta: ResponseMeta,
    pub runs: Vec<ReportRun>,
    pub next_offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetReportRunRequest {
    pub meta: RequestMeta,
    pub run_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetReportRunResponse {
    pub meta: ResponseMeta,
    pub run: Option<ReportRun>,
}

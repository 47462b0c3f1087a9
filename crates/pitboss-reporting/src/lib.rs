//! pitboss-reporting
//!
//! Report-run lifecycle records (§4.9, §11). The aggregation a run
//! describes is an external collaborator; this crate only tracks the
//! run's PENDING → COMPLETE lifecycle.

pub mod model;
pub mod requests;
pub mod service;

pub use model::{ReportRun, ReportRunStatus};
pub use requests::{
    GenerateReportRequest, GenerateReportResponse, GetReportRunRequest, GetReportRunResponse, ListReportRunsRequest,
    ListReportRunsResponse,
};
pub use service::ReportingService;

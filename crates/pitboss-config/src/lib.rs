//! pitboss-config
//!
//! The configuration-change propose/approve/apply workflow (§4.7).

pub mod model;
pub mod requests;
pub mod service;

pub use model::{ConfigChange, ConfigChangeStatus};
pub use requests::{
    ApplyConfigChangeRequest, ApproveConfigChangeRequest, ConfigChangeResponse, ListConfigHistoryRequest,
    ListConfigHistoryResponse, ProposeConfigChangeRequest,
};
pub use service::ConfigService;

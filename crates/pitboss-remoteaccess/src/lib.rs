//! pitboss-remoteaccess
//!
//! The network-source admission wrapper for administrative HTTP paths
//! (§4.6): `/v1/config`, `/v1/reporting`, `/v1/audit`.

pub mod guard;
pub mod model;
pub mod query;
pub mod requests;
pub mod store;

pub use guard::{extract_client_ip, remote_access_layer, RemoteAccessGuard};
pub use model::{is_administrative_path, RemoteAccessActivity, RemoteAccessActivityInput};
pub use query::list_remote_access_activities;
pub use requests::{ListRemoteAccessActivitiesRequest, ListRemoteAccessActivitiesResponse};
pub use store::{AppendOutcome, RemoteAccessStore};

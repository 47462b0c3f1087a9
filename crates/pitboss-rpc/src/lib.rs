//! pitboss-rpc
//!
//! JSON-RPC 2.0 API (namespace "pitboss") and a parallel HTTP/JSON gateway
//! for the regulated cashless-gaming platform (§6). Every method here is a
//! thin pass-through into the owning component service — the envelope
//! (actor resolution, idempotency, response metadata) is applied inside
//! each component, not duplicated at this layer.

pub mod api;
pub mod gateway;
pub mod server;
pub mod types;

pub use api::PitbossApiServer;
pub use gateway::build_router;
pub use server::{RpcServer, RpcServerState};

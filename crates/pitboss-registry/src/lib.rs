//! pitboss-registry
//!
//! Equipment registry (§11): insert-or-update rows keyed by `equipment_id`,
//! restricted to OPERATOR/SERVICE actors.

pub mod model;
pub mod requests;
pub mod service;

pub use model::{Equipment, EquipmentStatus};
pub use requests::{
    GetEquipmentRequest, GetEquipmentResponse, ListEquipmentRequest, ListEquipmentResponse,
    UpsertEquipmentRequest, UpsertEquipmentResponse,
};
pub use service::RegistryService;

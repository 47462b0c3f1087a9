//! pitboss-ingestion
//!
//! The bounded, in-process device-event and meter-reading ingestion buffer
//! (§4.8).

pub mod model;
pub mod requests;
pub mod service;

pub use model::{MeterKind, MeterRecord, SignificantEvent, SlotStatus};
pub use requests::{
    ListEventsRequest, ListEventsResponse, ListMetersRequest, ListMetersResponse, SubmitEventResponse,
    SubmitMeterRequest, SubmitMeterResponse, SubmitSignificantEventRequest,
};
pub use service::IngestionService;

//! Models Module
//!
//! Request and response DTOs for the node HTTP API.

mod requests;
mod responses;

pub use requests::{GetMultiRequest, SetMultiRequest, SetRequest};
pub use responses::{
    AckResponse, GetMultiResponse, HealthResponse, StatsResponse,
};

//! gRPC API module.
//!
//! Handlers follow one shape: authenticate, log, delegate to the store, and
//! let `AppError` translate into a status code on the way out.

mod staff;

pub use staff::*;

use crate::proto::staff_service_server::StaffServiceServer;
use crate::AppState;

/// Build the tonic service for registration on a server.
pub fn staff_service(state: AppState) -> StaffServiceServer<StaffApi> {
    StaffServiceServer::new(StaffApi::new(state))
}

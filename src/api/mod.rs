//! HTTP API module for the exeat engine.
//!
//! Guardian messages, administrator commands and departure logging over
//! JSON. The engine itself never fails a request; only unparseable bodies
//! and store outages produce error responses.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{ActiveLeavesQuery, AdminCommandBody, DepartureBody, LeaveRequestBody};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;

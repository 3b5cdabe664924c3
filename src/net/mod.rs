//! Backend collaborator — wire types and the HTTP session API.

pub mod api;
pub mod types;

pub use api::{HttpSessionApi, SessionApi};
pub use types::{ApiError, UsageOp, UsageSnapshot, UserRecord};

//! HTTP API handlers for muster-server

pub mod data;
pub mod health;
pub mod subscribe;

pub use data::{get_report, update_data};
pub use health::health_routes;
pub use subscribe::subscribe_push;

use serde::Serialize;

/// `{ "message": ... }` body returned by the write endpoints
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

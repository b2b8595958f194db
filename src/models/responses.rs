//! Response DTOs for the service endpoints
//!
//! Entity bodies live in `category` and `product`; these are the rest.

use serde::Serialize;

/// Response body for the root endpoint (GET /)
#[derive(Debug, Clone, Serialize)]
pub struct WelcomeResponse {
    pub message: String,
}

impl WelcomeResponse {
    pub fn new(app_name: &str) -> Self {
        Self {
            message: format!("Welcome to {app_name}"),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Running application version
    pub version: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(version: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            version: version.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

use serde::{Deserialize, Serialize};

// Healthcheck response format
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct HealthResponse {
    pub status: String,
    pub system_info: SystemInfo,
    pub timestamp: String,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
}

// Error envelope - every error response body has this shape
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

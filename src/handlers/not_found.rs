use crate::error::ApiError;

// Fallback for every unmatched route
pub async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

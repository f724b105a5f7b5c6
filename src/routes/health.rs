//! Service health endpoint used for readiness checks and tests.

use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};

use crate::emails::EmailsDao;
use crate::models::ApiResponse;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Result pages held by the email cache.
    pub cached_pages: usize,
    /// Groups whose counts await confirmation.
    pub pending_changes: usize,
}

#[openapi(tag = "Health")]
#[get("/health")]
pub fn health_check(dao: &State<EmailsDao>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::new(HealthResponse {
        status: "ok".to_string(),
        cached_pages: dao.cached_pages(),
        pending_changes: dao.pending_changes().len(),
    }))
}

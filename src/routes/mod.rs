//! HTTP route handlers.
//!
//! Handlers are annotated with `#[openapi]` so `rocket_okapi` can derive an
//! OpenAPI document for them.

pub mod emails;
pub mod health;
pub mod params;

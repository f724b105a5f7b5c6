use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::OpenApiError;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

use crate::emails::DaoError;

#[derive(Debug)]
pub enum ApiError {
    /// A case database query failed; carries the failed SQL for the log.
    QueryFailure { query: String, message: String },
    BadRequest(String),
    InternalError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::QueryFailure { query, message } => {
                log::error!("query failure: {}\n{}", message, query);
                (Status::InternalServerError, "QueryFailure", message)
            }
            ApiError::BadRequest(msg) => {
                log::debug!("bad request: {}", msg);
                (Status::BadRequest, "BadRequest", msg)
            }
            ApiError::InternalError(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response)
            .unwrap_or_else(|_| r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string());

        Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json))
            .ok()
    }
}

impl From<DaoError> for ApiError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            DaoError::QueryFailure { query, source } => ApiError::QueryFailure {
                query,
                message: source.to_string(),
            },
            DaoError::ConfigurationFault(fault) => ApiError::InternalError(fault.to_string()),
        }
    }
}

fn error_response(description: &str) -> RefOr<OpenApiResponse> {
    RefOr::Object(OpenApiResponse {
        description: description.to_string(),
        ..Default::default()
    })
}

impl OpenApiResponderInner for ApiError {
    fn responses(_generator: &mut OpenApiGenerator) -> Result<Responses, OpenApiError> {
        let mut responses = Responses::default();
        responses
            .responses
            .insert("400".to_string(), error_response("Invalid filter parameters"));
        responses
            .responses
            .insert("500".to_string(), error_response("Case database query failed"));
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn dao_errors_map_to_status_classes() {
        assert!(matches!(
            ApiError::from(DaoError::InvalidArgument("bad".to_string())),
            ApiError::BadRequest(msg) if msg == "bad"
        ));

        let failure = DaoError::QueryFailure {
            query: "SELECT 1".to_string(),
            source: StoreError::Unavailable("down".to_string()),
        };
        match ApiError::from(failure) {
            ApiError::QueryFailure { query, message } => {
                assert_eq!(query, "SELECT 1");
                assert!(message.contains("down"));
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn documented_responses_match_error_statuses() {
        let settings = rocket_okapi::settings::OpenApiSettings::default();
        let mut generator = OpenApiGenerator::new(&settings);
        let responses = ApiError::responses(&mut generator).expect("responses");

        let mut codes: Vec<_> = responses.responses.keys().cloned().collect();
        codes.sort();
        assert_eq!(codes, vec!["400", "500"]);
    }
}

//! Email message and tree count endpoints.

use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::okapi::schemars::{self, JsonSchema};
use rocket_okapi::openapi;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::emails::{ChangeEvent, DomainEvent, EmailsDao};
use crate::error::ApiError;
use crate::models::{ApiResponse, PaginationMeta, ResponseMeta, ResultPage, TreeItem};
use crate::routes::params::{EmailCountParams, EmailMessageParams};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheClearResponse {
    pub cleared: bool,
}

fn filter_meta(params: &EmailMessageParams) -> JsonMap<String, JsonValue> {
    let mut filters = JsonMap::new();
    if let Some(account) = &params.account {
        filters.insert("account".to_string(), JsonValue::String(account.clone()));
    }
    if let Some(folder) = &params.folder {
        filters.insert("folder".to_string(), JsonValue::String(folder.clone()));
    }
    if let Some(ds) = params.data_source_id {
        filters.insert("dataSourceId".to_string(), JsonValue::from(ds));
    }
    filters
}

/// Page of email messages for one account folder.
///
/// Without `account` and `folder` the page lists messages whose path does
/// not name an account and folder.
#[openapi(tag = "Emails")]
#[get("/emails/messages?<filter..>")]
pub async fn get_email_messages(
    dao: &State<EmailsDao>,
    filter: EmailMessageParams,
) -> Result<Json<ApiResponse<ResultPage>>, ApiError> {
    let pagination = filter.pagination();
    let page = dao
        .fetch_page(
            filter.to_search_params(),
            pagination.start_item(),
            Some(pagination.size()),
        )
        .await?;

    let meta = ResponseMeta::default()
        .with_pagination(PaginationMeta::new(
            pagination.page(),
            pagination.size(),
            page.total_results,
        ))
        .with_filters(filter_meta(&filter));

    Ok(Json(ApiResponse::with_meta(page.as_ref().clone(), meta)))
}

/// Message counts per account, or per folder when `account` is given.
#[openapi(tag = "Emails")]
#[get("/emails/counts?<params..>")]
pub async fn get_email_counts(
    dao: &State<EmailsDao>,
    params: EmailCountParams,
) -> Result<Json<ApiResponse<Vec<TreeItem>>>, ApiError> {
    let items = dao
        .fetch_group_counts(params.data_source_id, params.account.as_deref())
        .await?;
    Ok(Json(ApiResponse::new(items)))
}

/// Apply an ingest notification and return the resulting events.
#[openapi(tag = "Emails")]
#[post("/emails/events", format = "json", data = "<event>")]
pub async fn post_change_event(
    dao: &State<EmailsDao>,
    event: Json<ChangeEvent>,
) -> Result<Json<ApiResponse<Vec<DomainEvent>>>, ApiError> {
    let events = dao.handle_change(event.into_inner()).await?;
    Ok(Json(ApiResponse::new(events)))
}

/// Drop cached pages and pending count markers (case close).
#[openapi(tag = "Emails")]
#[post("/emails/cache/clear")]
pub fn clear_caches(dao: &State<EmailsDao>) -> Json<ApiResponse<CacheClearResponse>> {
    dao.invalidate_all();
    Json(ApiResponse::new(CacheClearResponse { cleared: true }))
}

use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::emails::EmailSearchParams;
use crate::store::CellValue;

// ===== Result pages =====

/// One artifact row of a result page; `cells` line up with the page's
/// `column_keys`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultRow {
    pub artifact_id: i64,
    pub data_source_id: i64,
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultPage {
    pub type_id: String,
    pub column_keys: Vec<String>,
    pub rows: Vec<ResultRow>,
    pub start_item: u64,
    /// Best-effort total; the number of rows loaded for this window.
    pub total_results: u64,
}

// ===== Tree =====

/// Count shown on a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", content = "count", rename_all = "camelCase")]
pub enum TreeCount {
    Determinate(u64),
    /// A change is pending and the stored count is not confirmed yet.
    Indeterminate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TreeItem {
    pub type_id: String,
    pub search_params: EmailSearchParams,
    /// Path key of the node, `account/folder` with empty sentinels.
    pub id: String,
    pub display_name: String,
    pub count: TreeCount,
}

// ===== Response envelope =====

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: u64,
    pub page_size: u64,
    pub returned: u64,
}

impl PaginationMeta {
    pub fn new(page: u64, page_size: u64, returned: u64) -> Self {
        Self {
            page,
            page_size,
            returned,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<JsonMap<String, JsonValue>>,
}

impl ResponseMeta {
    pub fn with_pagination(mut self, pagination: PaginationMeta) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_filters(mut self, filters: JsonMap<String, JsonValue>) -> Self {
        if !filters.is_empty() {
            self.filters = Some(filters);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ApiResponse<T> {
    pub data: T,
    #[serde(default)]
    pub meta: ResponseMeta,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::default(),
        }
    }

    pub fn with_meta(data: T, meta: ResponseMeta) -> Self {
        Self { data, meta }
    }
}

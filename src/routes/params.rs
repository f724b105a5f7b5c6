//! Query parameters for the email endpoints.
//!
//! Parsed with Rocket's `FromForm` and described with `JsonSchema` so the
//! generated OpenAPI document lists names and defaults.

use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::emails::EmailSearchParams;

const fn default_page() -> u64 {
    1
}

const fn default_page_size() -> u64 {
    50
}

const MAX_PAGE_SIZE: u64 = 100;

/// Pagination applied to message listings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, rocket::form::FromForm)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    /// One-based page index (defaults to the first page).
    #[field(default = 1)]
    #[serde(default = "default_page")]
    pub page: u64,
    /// Number of items per page (clamped between 1 and 100, default 50).
    #[field(default = 50)]
    #[serde(default = "default_page_size")]
    pub size: u64,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_page_size(),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    pub fn size(&self) -> u64 {
        self.size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Zero-based index of the first item on the page.
    pub fn start_item(&self) -> u64 {
        (self.page() - 1).saturating_mul(self.size())
    }
}

/// Filter for `GET /emails/messages`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, rocket::form::FromForm)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessageParams {
    /// Account segment of the message path; requires `folder`.
    pub account: Option<String>,
    /// Folder segment of the message path; requires `account`.
    pub folder: Option<String>,
    #[field(name = "dataSourceId")]
    pub data_source_id: Option<i64>,
    #[field(default = 1)]
    #[serde(default = "default_page")]
    pub page: u64,
    #[field(default = 50)]
    #[serde(default = "default_page_size")]
    pub size: u64,
}

impl EmailMessageParams {
    pub fn to_search_params(&self) -> EmailSearchParams {
        EmailSearchParams::new(self.data_source_id, self.account.clone(), self.folder.clone())
    }

    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            size: self.size,
        }
    }
}

/// Filter for `GET /emails/counts`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, rocket::form::FromForm)]
#[serde(rename_all = "camelCase")]
pub struct EmailCountParams {
    #[field(name = "dataSourceId")]
    pub data_source_id: Option<i64>,
    /// List the folders of this account instead of the accounts.
    pub account: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_normalized() {
        let params = PaginationParams { page: 0, size: 500 };
        assert_eq!(params.page(), 1);
        assert_eq!(params.size(), MAX_PAGE_SIZE);
        assert_eq!(params.start_item(), 0);

        let params = PaginationParams { page: 3, size: 20 };
        assert_eq!(params.start_item(), 40);
    }
}

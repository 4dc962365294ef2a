//! Common API utilities and shared types

use serde::Deserialize;

use crate::models::ListParams;

/// Raw `page` / `pageSize` query parameters.
///
/// Kept as strings so unparsable values fall back to the defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl PaginationQuery {
    pub fn to_params(&self) -> ListParams {
        ListParams::from_query(self.page.as_deref(), self.page_size.as_deref())
    }
}

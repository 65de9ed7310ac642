//! Pagination parameters.
//!
//! A request pages either by offset (`limit`, `offset`) or by page number
//! (`page`, `pageSize`). The mode is decided once, when the execution context
//! is built: `page` present means page mode, anything else means offset mode.
//!
//! Raw query values are kept as given. Parsing happens on demand through the
//! accessors, which report malformed values as `400 Bad Request`.

use crate::config::PaginationDefaults;
use crate::error::ApiError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Query key for the page number.
pub const PAGE: &str = "page";
/// Query key for the page size.
pub const PAGE_SIZE: &str = "pageSize";
/// Query key for the row limit.
pub const LIMIT: &str = "limit";
/// Query key for the row offset.
pub const OFFSET: &str = "offset";

/// Pagination requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum PaginationRequest {
    /// Offset-based paging.
    Offset {
        /// Raw `limit`.
        limit: String,
        /// Raw `offset`.
        offset: String,
    },
    /// Page-based paging.
    #[serde(rename_all = "camelCase")]
    Page {
        /// Raw `page`.
        page: String,
        /// Raw `pageSize`.
        page_size: String,
    },
}

impl PaginationRequest {
    /// Derive the request from query parameters, filling absent values.
    #[must_use]
    pub fn from_query(query: &BTreeMap<String, String>, defaults: &PaginationDefaults) -> Self {
        let raw = |key: &str, default: u64| {
            query
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        match query.get(PAGE) {
            Some(page) => Self::Page {
                page: page.clone(),
                page_size: raw(PAGE_SIZE, defaults.page_size),
            },
            None => Self::Offset {
                limit: raw(LIMIT, defaults.limit),
                offset: raw(OFFSET, defaults.offset),
            },
        }
    }

    /// Whether this is page mode.
    #[must_use]
    pub const fn is_page_mode(&self) -> bool {
        matches!(self, Self::Page { .. })
    }

    /// Parsed `limit`; `None` in page mode.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the value is not a non-negative integer.
    pub fn limit(&self) -> Result<Option<u64>, ApiError> {
        match self {
            Self::Offset { limit, .. } => parse(LIMIT, limit).map(Some),
            Self::Page { .. } => Ok(None),
        }
    }

    /// Parsed `offset`; `None` in page mode.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the value is not a non-negative integer.
    pub fn offset(&self) -> Result<Option<u64>, ApiError> {
        match self {
            Self::Offset { offset, .. } => parse(OFFSET, offset).map(Some),
            Self::Page { .. } => Ok(None),
        }
    }

    /// Parsed `page`; `None` in offset mode.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the value is not a non-negative integer.
    pub fn page(&self) -> Result<Option<u64>, ApiError> {
        match self {
            Self::Page { page, .. } => parse(PAGE, page).map(Some),
            Self::Offset { .. } => Ok(None),
        }
    }

    /// Parsed `pageSize`; `None` in offset mode.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the value is not a non-negative integer.
    pub fn page_size(&self) -> Result<Option<u64>, ApiError> {
        match self {
            Self::Page { page_size, .. } => parse(PAGE_SIZE, page_size).map(Some),
            Self::Offset { .. } => Ok(None),
        }
    }

    /// Row window `(skip, take)` for either mode.
    ///
    /// Pages are 1-based; page `0` is treated as page `1`.
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if any value is malformed or the window overflows.
    pub fn window(&self) -> Result<(u64, u64), ApiError> {
        match self {
            Self::Offset { limit, offset } => Ok((parse(OFFSET, offset)?, parse(LIMIT, limit)?)),
            Self::Page { page, page_size } => {
                let page = parse(PAGE, page)?.max(1);
                let size = parse(PAGE_SIZE, page_size)?;
                let skip = (page - 1)
                    .checked_mul(size)
                    .ok_or_else(|| ApiError::bad_request("page is out of range"))?;
                Ok((skip, size))
            }
        }
    }
}

fn parse(key: &str, raw: &str) -> Result<u64, ApiError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ApiError::bad_request(format!("{key} must be a non-negative integer")))
}

/// Metadata a step attaches to a paged result.
///
/// The responder merges these fields into the body next to `results`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    fields: Map<String, Value>,
}

impl PageResponse {
    /// Page metadata with a total count.
    #[must_use]
    pub fn with_total(total: u64) -> Self {
        Self::default().field("total", total)
    }

    /// Add one field.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The metadata fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Merge `results` into the metadata.
    ///
    /// A `results` key already present in the metadata is overwritten.
    #[must_use]
    pub fn into_body(self, results: Value) -> Value {
        let mut fields = self.fields;
        fields.insert("results".to_string(), results);
        Value::Object(fields)
    }
}

impl From<Map<String, Value>> for PageResponse {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

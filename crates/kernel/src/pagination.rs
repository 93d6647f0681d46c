//! Bounded page slicing with per-caller serialization.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::Caller;
use crate::query::{QuerySet, Slice, Store};
use crate::serialize::{Document, Serializer};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

const MAX_OFFSET: u64 = i64::MAX as u64;

/// How rows are ordered across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    /// The collection's declared order; stable across pages.
    #[default]
    Normal,
    /// Shuffled on every request.
    Random,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

/// Page selection taken from the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    #[serde(default)]
    pub page_mode: PageMode,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: DEFAULT_PAGE_SIZE,
            page_mode: PageMode::Normal,
        }
    }
}

impl PageRequest {
    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page,
            page_size,
            page_mode: PageMode::Normal,
        }
    }

    /// Reject out-of-range values; nothing is clamped.
    pub fn validate(&self) -> Result<(), PageError> {
        if self.page < 1 {
            return Err(PageError::InvalidPage(self.page));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(PageError::InvalidPageSize(self.page_size));
        }
        Ok(())
    }

    /// Window for a validated request.
    ///
    /// The offset never exceeds `i64::MAX`, the largest OFFSET PostgreSQL
    /// accepts.
    pub fn slice(&self) -> Slice {
        let page = u64::try_from(self.page).unwrap_or(1).max(1);
        let limit = u64::try_from(self.page_size).unwrap_or(0);
        Slice {
            offset: (page - 1).saturating_mul(limit).min(MAX_OFFSET),
            limit,
        }
    }
}

/// Invalid page selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("invalid page number {0}: pages start at 1")]
    InvalidPage(i64),

    #[error("invalid page size {0}: must be between 1 and 100")]
    InvalidPageSize(i64),
}

/// Failure while paginating.
#[derive(Debug, Error)]
pub enum PaginateError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// One page of serialized results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub has_next: bool,
    pub count: u64,
    pub results: Vec<Document>,
}

/// Executes prepared querysets page by page.
pub struct Paginator<'a> {
    store: &'a dyn Store,
}

impl<'a> Paginator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Count the full set, fetch one window of it and serialize each row.
    ///
    /// The request is validated before any store call. `has_next` is
    /// derived from the total, so it stays correct on a short last page.
    pub async fn paginate(
        &self,
        request: &PageRequest,
        prepared: (QuerySet, Vec<String>),
        serializer: &dyn Serializer,
        caller: Option<&Caller>,
    ) -> Result<PageResponse, PaginateError> {
        if let Err(e) = request.validate() {
            warn!(error = %e, "rejected pagination request");
            return Err(e.into());
        }

        let (queryset, annotations) = prepared;
        let queryset = match request.page_mode {
            PageMode::Normal => queryset,
            PageMode::Random => queryset.shuffled(),
        };

        let total = self.store.count(&queryset).await?;
        let slice = request.slice();
        let rows = if slice.offset >= total {
            Vec::new()
        } else {
            self.store.fetch(&queryset, Some(slice)).await?
        };

        let mut results = Vec::with_capacity(rows.len());
        for entity in &rows {
            results.push(
                serializer
                    .serialize(self.store, entity, caller, &annotations)
                    .await?,
            );
        }

        debug!(
            model = queryset.model().table(),
            page = request.page,
            page_size = request.page_size,
            total,
            returned = results.len(),
            "paginated"
        );

        Ok(PageResponse {
            has_next: slice.offset.saturating_add(slice.limit) < total,
            count: total,
            results,
        })
    }
}

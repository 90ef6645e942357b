//! Page/ordering state shared by the list services.

use std::future::Future;

use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{ClientError, ServiceError};
use crate::types::{ListQuery, OrderDir, PageMeta};

/// Failure codes a list reports for its endpoint.
#[derive(Debug, Clone, Copy)]
pub struct ListCodes {
    /// Non-success envelope.
    pub failed: &'static str,
    /// Success envelope without an `items` array and a `meta` object.
    pub invalid: &'static str,
}

/// Requested change to a list's ordering. `None` fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct ListOrdering {
    pub order_by: Option<String>,
    pub order_dir: Option<OrderDir>,
    pub limit: Option<u32>,
}

/// Current page of a backend list plus the parameters that produced it.
#[derive(Debug, Clone)]
pub struct PagedList {
    page: u32,
    limit: u32,
    order_by: String,
    order_dir: OrderDir,
    items: Vec<Value>,
    meta: Option<PageMeta>,
}

impl PagedList {
    pub fn new(order_by: &str, order_dir: OrderDir, limit: u32) -> Self {
        Self {
            page: 1,
            limit,
            order_by: order_by.to_string(),
            order_dir,
            items: Vec::new(),
            meta: None,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    pub fn order_dir(&self) -> OrderDir {
        self.order_dir
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn meta(&self) -> Option<&PageMeta> {
        self.meta.as_ref()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.meta
            .as_ref()
            .is_some_and(|meta| meta.offset.saturating_add(self.items.len() as u64) < meta.total)
    }

    /// Apply an ordering change and go back to the first page.
    pub fn set_ordering(&mut self, ordering: ListOrdering) {
        if let Some(order_by) = ordering.order_by.filter(|o| !o.is_empty()) {
            self.order_by = order_by;
        }
        if let Some(order_dir) = ordering.order_dir {
            self.order_dir = order_dir;
        }
        if let Some(limit) = ordering.limit {
            self.limit = limit;
        }
        self.page = 1;
    }

    /// Query for `page` (1-based; 0 is treated as 1).
    pub fn query_for(&self, page: u32) -> ListQuery {
        let page = page.max(1);
        ListQuery {
            limit: Some(self.limit),
            offset: Some(u64::from(page - 1) * u64::from(self.limit)),
            order_by: Some(self.order_by.clone()),
            order_dir: Some(self.order_dir),
        }
    }

    /// Fetch `page` with `fetch` and replace the current items on success.
    /// On failure the previous page stays in place.
    pub async fn load<F, Fut>(&mut self, page: u32, codes: ListCodes, fetch: F) -> Result<(), ServiceError>
    where
        F: FnOnce(ListQuery) -> Fut,
        Fut: Future<Output = Result<Envelope, ClientError>>,
    {
        let page = page.max(1);
        let envelope = fetch(self.query_for(page)).await?;
        if !envelope.ok {
            return Err(ServiceError::Rejected(codes.failed));
        }
        let (items, meta) = parse_page(&envelope).ok_or(ServiceError::InvalidResponse(codes.invalid))?;
        self.items = items;
        self.meta = Some(meta);
        self.page = page;
        Ok(())
    }
}

fn parse_page(envelope: &Envelope) -> Option<(Vec<Value>, PageMeta)> {
    let data = envelope.data.as_ref()?;
    let items = data.get("items")?.as_array()?.clone();
    let meta = serde_json::from_value(data.get("meta")?.clone()).ok()?;
    Some((items, meta))
}

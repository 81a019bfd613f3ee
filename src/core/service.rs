//! Data source trait: the external collaborator that supplies items

use crate::core::item::Item;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Describes a load-more request to the data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    /// Items currently resident in the session
    pub resident: usize,
    /// Items currently displayed
    pub displayed: usize,
    /// Page size of the window
    pub page_size: usize,
    /// Query generation the request was stamped with
    pub generation: u64,
}

/// Source of items for a collection session
///
/// The engine assumes the collection is already resident after [`load`](Self::load);
/// `load_more` may hand back additional items (appended to the source) but
/// returns none by default. Timeouts and retries inside a fetch are the
/// source's concern; the engine only sees success or failure.
#[async_trait]
pub trait DataSource<T: Item>: Send + Sync {
    /// Fetch the initial collection
    async fn load(&self) -> Result<Vec<T>>;

    /// Fetch a replacement collection
    async fn refresh(&self) -> Result<Vec<T>> {
        self.load().await
    }

    /// Fetch items to append before the window grows by a page
    async fn load_more(&self, _request: PageRequest) -> Result<Vec<T>> {
        Ok(Vec::new())
    }
}

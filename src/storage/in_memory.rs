//! In-memory data sources for seeding sessions, tests and development

use crate::core::item::Item;
use crate::core::service::{DataSource, PageRequest};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::VecDeque;
use std::sync::{Arc, RwLock};

/// In-memory data source
///
/// `load` and `refresh` return the current seed; `load_more` hands out
/// queued extra pages, if any. Uses RwLock for thread-safe access.
#[derive(Clone)]
pub struct InMemorySource<T: Item> {
    items: Arc<RwLock<Vec<T>>>,
    extra_pages: Arc<RwLock<VecDeque<Vec<T>>>>,
}

impl<T: Item> InMemorySource<T> {
    /// Create a source seeded with `items`
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            extra_pages: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Replace the seed returned by the next load or refresh
    pub fn replace(&self, items: Vec<T>) -> Result<()> {
        let mut seed = self
            .items
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        *seed = items;
        Ok(())
    }

    /// Queue a page of items for the next load-more
    pub fn push_page(&self, page: Vec<T>) -> Result<()> {
        let mut pages = self
            .extra_pages
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;
        pages.push_back(page);
        Ok(())
    }
}

impl<T: Item> Default for InMemorySource<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl<T: Item> DataSource<T> for InMemorySource<T> {
    async fn load(&self) -> Result<Vec<T>> {
        let items = self
            .items
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(items.clone())
    }

    async fn load_more(&self, _request: PageRequest) -> Result<Vec<T>> {
        let mut pages = self
            .extra_pages
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(pages.pop_front().unwrap_or_default())
    }
}

type LoadFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

/// Data source backed by an async closure
///
/// The shape of `createSession(initialLoad)`: the same closure serves the
/// initial load and every refresh.
///
/// ```rust,ignore
/// let source = FnSource::new(|| async { Ok(fetch_reviews().await?) });
/// ```
#[derive(Clone)]
pub struct FnSource<T: Item> {
    load: LoadFn<T>,
}

impl<T: Item> FnSource<T> {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        Self {
            load: Arc::new(move || Box::pin(f())),
        }
    }
}

#[async_trait]
impl<T: Item> DataSource<T> for FnSource<T> {
    async fn load(&self) -> Result<Vec<T>> {
        (self.load)().await
    }
}

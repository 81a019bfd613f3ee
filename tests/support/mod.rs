//! Shared test harness for session testing
//!
//! Provides `ScriptedSource`, a data source whose fetches can be held open,
//! made to fail and counted, plus fixtures for reviews and restaurants.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod support;
//! use support::*;
//! ```

#![allow(dead_code)]

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use uuid::Uuid;

use tableside::prelude::*;

// ---------------------------------------------------------------------------
// ScriptedSource — controllable DataSource
// ---------------------------------------------------------------------------

struct Script<T> {
    items: Mutex<Vec<T>>,
    pages: Mutex<VecDeque<Vec<T>>>,
    gated: AtomicBool,
    gate: Semaphore,
    fail_load: AtomicBool,
    fail_more: AtomicBool,
    fail_refresh: AtomicBool,
    panic_refresh: AtomicBool,
    load_calls: AtomicUsize,
    more_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

/// A data source driven by the test
///
/// When gated, every fetch waits for a permit released with [`release`](Self::release).
#[derive(Clone)]
pub struct ScriptedSource<T> {
    script: Arc<Script<T>>,
}

impl<T: Item> ScriptedSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            script: Arc::new(Script {
                items: Mutex::new(items),
                pages: Mutex::new(VecDeque::new()),
                gated: AtomicBool::new(false),
                gate: Semaphore::new(0),
                fail_load: AtomicBool::new(false),
                fail_more: AtomicBool::new(false),
                fail_refresh: AtomicBool::new(false),
                panic_refresh: AtomicBool::new(false),
                load_calls: AtomicUsize::new(0),
                more_calls: AtomicUsize::new(0),
                refresh_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Hold every subsequent fetch until released
    pub fn gate(&self) {
        self.script.gated.store(true, Ordering::SeqCst);
    }

    /// Let `n` held fetches complete
    pub fn release(&self, n: usize) {
        self.script.gate.add_permits(n);
    }

    pub fn replace(&self, items: Vec<T>) {
        *self.script.items.lock().unwrap() = items;
    }

    pub fn push_page(&self, page: Vec<T>) {
        self.script.pages.lock().unwrap().push_back(page);
    }

    pub fn fail_load(&self, fail: bool) {
        self.script.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn fail_more(&self, fail: bool) {
        self.script.fail_more.store(fail, Ordering::SeqCst);
    }

    pub fn fail_refresh(&self, fail: bool) {
        self.script.fail_refresh.store(fail, Ordering::SeqCst);
    }

    /// Make `refresh` panic instead of returning
    pub fn panic_refresh(&self, panic: bool) {
        self.script.panic_refresh.store(panic, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.script.load_calls.load(Ordering::SeqCst)
    }

    pub fn more_calls(&self) -> usize {
        self.script.more_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.script.refresh_calls.load(Ordering::SeqCst)
    }

    async fn wait_gate(&self) -> Result<()> {
        if self.script.gated.load(Ordering::SeqCst) {
            self.script.gate.acquire().await?.forget();
        }
        Ok(())
    }
}

#[async_trait]
impl<T: Item> DataSource<T> for ScriptedSource<T> {
    async fn load(&self) -> Result<Vec<T>> {
        self.script.load_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await?;
        if self.script.fail_load.load(Ordering::SeqCst) {
            bail!("connection reset");
        }
        Ok(self.script.items.lock().unwrap().clone())
    }

    async fn refresh(&self) -> Result<Vec<T>> {
        self.script.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await?;
        if self.script.panic_refresh.load(Ordering::SeqCst) {
            panic!("refresh handler crashed");
        }
        if self.script.fail_refresh.load(Ordering::SeqCst) {
            bail!("service unavailable");
        }
        Ok(self.script.items.lock().unwrap().clone())
    }

    async fn load_more(&self, _request: PageRequest) -> Result<Vec<T>> {
        self.script.more_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await?;
        if self.script.fail_more.load(Ordering::SeqCst) {
            bail!("request timed out");
        }
        Ok(self.script.pages.lock().unwrap().pop_front().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// `n` reviews of one restaurant, newest first in source order, all rated 3
pub fn reviews(n: usize) -> Vec<Review> {
    let restaurant = Uuid::new_v4();
    let now = Utc::now();
    (0..n)
        .map(|i| {
            Review::new(restaurant, "taylor", format!("Visit #{}", i), 3.0)
                .with_created_at(now - Duration::hours(i as i64))
        })
        .collect()
}

pub fn ids<T: Item>(items: &[T]) -> Vec<Uuid> {
    items.iter().map(|item| item.id()).collect()
}

pub fn review_config(page_size: usize) -> EngineConfig {
    EngineConfig::reviews().with_page_size(page_size)
}

/// A started review session over a scripted source
pub async fn review_session(
    items: Vec<Review>,
    page_size: usize,
) -> (CollectionSession<Review>, ScriptedSource<Review>) {
    let source = ScriptedSource::new(items);
    let session = CollectionSession::builder(source.clone())
        .with_config(review_config(page_size))
        .build()
        .unwrap();
    assert_eq!(session.start().await.unwrap(), LoadOutcome::Applied);
    (session, source)
}

/// Yield to the runtime until the session reaches `phase`
pub async fn wait_for_phase<T: Item>(session: &CollectionSession<T>, phase: Phase) {
    for _ in 0..1_000 {
        if session.phase() == phase {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("session never reached {:?}, stuck in {:?}", phase, session.phase());
}

//! # Tableside
//!
//! A client-side query engine for locally held collections such as restaurant
//! listings and reviews.
//!
//! ## Features
//!
//! - **Composable Filters**: text, multi-select, threshold and flag clauses AND'd together
//! - **Stable Sorting**: a closed set of sort options with ties broken by source order
//! - **Incremental Windows**: page-by-page loading that survives edits and deletes
//! - **Load Coordination**: duplicate load-more suppression, queued refreshes and
//!   generation stamps that drop results for outdated queries
//! - **Observable**: pull a [`ViewState`](session::ViewState) or subscribe to session events
//! - **Configuration-Based**: declare filter clauses in YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tableside::prelude::*;
//!
//! let session = create_session(
//!     InMemorySource::new(reviews),
//!     EngineConfig::reviews(),
//! )
//! .await?;
//!
//! session.set_sort(SortOption::HighestRated)?;
//! session.set_filter(FilterPatch::new().threshold("min_rating", 4.0))?;
//! session.request_more().await?;
//!
//! let view = session.view_state();
//! for review in &view.displayed_items {
//!     println!("{} ({})", review.title, review.rating);
//! }
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod session;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{DataSource, FieldValue, Item, PageRequest};

    // === Query Building ===
    pub use crate::core::{
        ActiveFilterSummary, Bound, ClauseDef, ClauseKind, FilterPatch, FilterSchema, FilterState,
        PredicateSet, SortContext, SortOption, project,
    };

    // === Windows and Coordination ===
    pub use crate::core::{LoadKind, PageWindow, Phase, WindowState};

    // === Errors ===
    pub use crate::core::{ConfigError, FilterError, SessionError, TablesideError};

    // === Events ===
    pub use crate::core::{EventEnvelope, SessionEvent};

    // === Sessions ===
    pub use crate::session::{
        CollectionSession, LoadOutcome, SessionBuilder, ViewState, create_session,
    };

    // === Storage ===
    pub use crate::storage::{FnSource, InMemorySource};

    // === Entities ===
    pub use crate::entities::{Restaurant, RestaurantPatch, Review, ReviewPatch};

    // === Config ===
    pub use crate::config::EngineConfig;

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}

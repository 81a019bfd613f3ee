//! Core module containing the engine's traits and building blocks

pub mod collection;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod field;
pub mod filter;
pub mod item;
pub mod predicate;
pub mod projection;
pub mod service;
pub mod sort;
pub mod window;

pub use collection::SourceCollection;
pub use coordinator::{Coordinator, Dispatch, LoadKind, Phase, Resolution, Ticket};
pub use error::{ConfigError, FilterError, SessionError, TablesideError};
pub use events::{EventBus, EventEnvelope, SessionEvent};
pub use field::FieldValue;
pub use filter::{
    ActiveFilterSummary, Bound, ClauseDef, ClauseKind, FilterPatch, FilterSchema, FilterState,
};
pub use item::Item;
pub use predicate::PredicateSet;
pub use projection::{Projector, project, project_indices};
pub use service::{DataSource, PageRequest};
pub use sort::{SortContext, SortOption};
pub use window::{PageWindow, WindowState, WindowStep};

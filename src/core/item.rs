//! Item trait defining the record abstraction the engine projects

use crate::core::field::FieldValue;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Base trait for every record held in a source collection.
///
/// An item has:
/// - id: stable unique identifier, immutable for the item's lifetime
/// - title: human-readable name, used by the alphabetical sort
/// - rating: numeric score, used by the rating sorts
/// - timestamp: creation time, used by the recency sorts
/// - named fields: dynamic access for filter clauses
///
/// Edits go through [`Item::apply_patch`], which must never change `id`.
pub trait Item: Clone + Send + Sync + 'static {
    /// Partial update merged into an item in place
    type Patch: Send + Sync;

    /// Singular resource name used in errors and logs (e.g., "restaurant")
    fn resource_name() -> &'static str;

    // === Core Item Fields ===

    /// Get the unique identifier for this item
    fn id(&self) -> Uuid;

    /// Get the display title
    fn title(&self) -> &str;

    /// Get the numeric rating
    fn rating(&self) -> f64;

    /// Get the creation timestamp
    fn timestamp(&self) -> DateTime<Utc>;

    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Merge a patch into this item, leaving the identifier untouched
    fn apply_patch(&mut self, patch: &Self::Patch);
}

//! Predicate set: decides whether an item passes a filter state
//!
//! Every active clause is evaluated independently and the results are AND'd.
//! Inactive clauses (empty set, absent threshold, absent flag, empty text)
//! always pass. The text query is a case-insensitive substring match OR'd
//! over the schema's text fields.

use crate::core::filter::{ClauseKind, FilterSchema, FilterState};
use crate::core::item::Item;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Custom body for a threshold clause: `(item, threshold) -> passes`
pub type ThresholdFn<T> = Arc<dyn Fn(&T, f64) -> bool + Send + Sync>;

/// Custom body for a flag clause: `item -> passes`
pub type FlagFn<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Evaluates filter states against items
///
/// Threshold and flag clauses read the declared field through
/// [`Item::field_value`] unless a custom body is registered for the clause,
/// which is how distance and open-now are supplied by the host application.
pub struct PredicateSet<T: Item> {
    schema: Arc<FilterSchema>,
    thresholds: HashMap<String, ThresholdFn<T>>,
    flags: HashMap<String, FlagFn<T>>,
}

impl<T: Item> Clone for PredicateSet<T> {
    fn clone(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            thresholds: self.thresholds.clone(),
            flags: self.flags.clone(),
        }
    }
}

impl<T: Item> fmt::Debug for PredicateSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateSet")
            .field("schema", &self.schema)
            .field("custom_thresholds", &self.thresholds.keys().collect::<Vec<_>>())
            .field("custom_flags", &self.flags.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: Item> PredicateSet<T> {
    /// Create a predicate set evaluating clauses from their declared fields
    pub fn new(schema: FilterSchema) -> Self {
        Self {
            schema: Arc::new(schema),
            thresholds: HashMap::new(),
            flags: HashMap::new(),
        }
    }

    /// Replace the body of a threshold clause
    pub fn with_threshold_fn(
        mut self,
        clause: impl Into<String>,
        f: impl Fn(&T, f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.thresholds.insert(clause.into(), Arc::new(f));
        self
    }

    /// Replace the body of a flag clause
    pub fn with_flag_fn(
        mut self,
        clause: impl Into<String>,
        f: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.flags.insert(clause.into(), Arc::new(f));
        self
    }

    pub(crate) fn register_threshold_fn(&mut self, clause: String, f: ThresholdFn<T>) {
        self.thresholds.insert(clause, f);
    }

    pub(crate) fn register_flag_fn(&mut self, clause: String, f: FlagFn<T>) {
        self.flags.insert(clause, f);
    }

    pub fn schema(&self) -> &FilterSchema {
        &self.schema
    }

    /// Check whether `item` passes every active clause of `filter`
    pub fn matches(&self, item: &T, filter: &FilterState) -> bool {
        let needle = filter.text().to_lowercase();
        self.matches_text(item, &needle) && self.matches_clauses(item, filter)
    }

    /// Matching with a pre-lowered query, for callers that test many items
    pub(crate) fn matches_lowered(&self, item: &T, filter: &FilterState, needle: &str) -> bool {
        self.matches_text(item, needle) && self.matches_clauses(item, filter)
    }

    fn matches_text(&self, item: &T, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.schema.text_fields.iter().any(|field| {
            item.field_value(field).is_some_and(|value| {
                value
                    .text_values()
                    .iter()
                    .any(|text| text.to_lowercase().contains(needle))
            })
        })
    }

    fn matches_clauses(&self, item: &T, filter: &FilterState) -> bool {
        self.schema.clauses.iter().all(|(name, def)| match &def.kind {
            ClauseKind::MultiSelect { field } => match filter.selection(name) {
                None => true,
                Some(allowed) => item.field_value(field).is_some_and(|value| {
                    value.text_values().iter().any(|candidate| {
                        allowed
                            .iter()
                            .any(|wanted| wanted.eq_ignore_ascii_case(candidate))
                    })
                }),
            },
            ClauseKind::Threshold { field, bound, .. } => match filter.threshold(name) {
                None => true,
                Some(threshold) => match self.thresholds.get(name) {
                    Some(custom) => custom(item, threshold),
                    None => item
                        .field_value(field)
                        .and_then(|value| value.as_number())
                        .is_some_and(|value| bound.admits(value, threshold)),
                },
            },
            ClauseKind::Flag { field } => {
                if !filter.flag(name) {
                    return true;
                }
                match self.flags.get(name) {
                    Some(custom) => custom(item),
                    None => item
                        .field_value(field)
                        .and_then(|value| value.as_bool())
                        .unwrap_or(false),
                }
            }
        })
    }
}

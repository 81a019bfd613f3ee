//! Filter clauses, filter state construction and the active-filter summary
//!
//! A [`FilterSchema`] declares which clauses exist. A [`FilterState`] holds the
//! values currently set for those clauses and can only be produced by merging a
//! [`FilterPatch`] through the schema, so a state that reaches a predicate is
//! always well formed.
//!
//! # Example
//!
//! ```rust,ignore
//! let schema = EngineConfig::restaurants().filters;
//! let state = FilterState::default().with_patch(
//!     &FilterPatch::new()
//!         .select("cuisine", ["Seafood"])
//!         .threshold("min_rating", 4.0),
//!     &schema,
//! )?;
//! assert_eq!(state.summary(&schema).count, 2);
//! ```

use crate::core::error::{ConfigError, FilterError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Direction a threshold clause compares in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    /// Item value must be `>=` the threshold (ratings)
    AtLeast,
    /// Item value must be `<=` the threshold (distance)
    AtMost,
}

impl Bound {
    pub fn admits(self, value: f64, threshold: f64) -> bool {
        match self {
            Bound::AtLeast => value >= threshold,
            Bound::AtMost => value <= threshold,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Bound::AtLeast => "≥",
            Bound::AtMost => "≤",
        }
    }
}

/// Kind-specific part of a clause declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClauseKind {
    /// Set of allowed values; empty set means no restriction
    MultiSelect { field: String },

    /// Optional scalar bound
    Threshold {
        field: String,
        bound: Bound,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },

    /// Absent or true
    Flag { field: String },
}

impl ClauseKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClauseKind::MultiSelect { .. } => "multi_select",
            ClauseKind::Threshold { .. } => "threshold",
            ClauseKind::Flag { .. } => "flag",
        }
    }

    pub fn field(&self) -> &str {
        match self {
            ClauseKind::MultiSelect { field }
            | ClauseKind::Threshold { field, .. }
            | ClauseKind::Flag { field } => field,
        }
    }
}

/// A named clause declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseDef {
    /// Human-readable label used in filter chips
    pub label: String,

    #[serde(flatten)]
    pub kind: ClauseKind,
}

/// Declares the clauses a filter state may carry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSchema {
    /// Fields the free-text query is matched against (OR'd)
    #[serde(default)]
    pub text_fields: Vec<String>,

    /// Named clauses, in display order
    #[serde(default)]
    pub clauses: IndexMap<String, ClauseDef>,
}

impl FilterSchema {
    /// Look up a clause declaration by name
    pub fn clause(&self, name: &str) -> Option<&ClauseDef> {
        self.clauses.get(name)
    }

    /// Validate the declarations themselves
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, def) in &self.clauses {
            if def.kind.field().is_empty() {
                return Err(ConfigError::InvalidClause {
                    clause: name.clone(),
                    message: "field must not be empty".to_string(),
                });
            }
            if let ClauseKind::Threshold {
                min: Some(min),
                max: Some(max),
                ..
            } = &def.kind
            {
                if min > max {
                    return Err(ConfigError::InvalidClause {
                        clause: name.clone(),
                        message: format!("min {} is greater than max {}", min, max),
                    });
                }
            }
        }
        Ok(())
    }

    fn expect_kind<'a>(
        &'a self,
        clause: &str,
        expected: &'static str,
    ) -> Result<&'a ClauseKind, FilterError> {
        let def = self.clause(clause).ok_or_else(|| FilterError::UnknownClause {
            clause: clause.to_string(),
        })?;
        if def.kind.name() != expected {
            return Err(FilterError::KindMismatch {
                clause: clause.to_string(),
                expected,
                actual: def.kind.name(),
            });
        }
        Ok(&def.kind)
    }
}

/// Partial filter update, as sent by the presentation layer
///
/// Only the clauses mentioned are touched; everything else keeps its value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPatch {
    /// New text query (trimmed; empty clears)
    pub text: Option<String>,

    /// Replacement value sets per multi-select clause (empty clears)
    pub selections: BTreeMap<String, BTreeSet<String>>,

    /// New threshold per clause (`None` clears)
    pub thresholds: BTreeMap<String, Option<f64>>,

    /// Flag state per clause (`false` clears)
    pub flags: BTreeMap<String, bool>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, query: impl Into<String>) -> Self {
        self.text = Some(query.into());
        self
    }

    pub fn select<I, S>(mut self, clause: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(clause.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn threshold(mut self, clause: impl Into<String>, value: f64) -> Self {
        self.thresholds.insert(clause.into(), Some(value));
        self
    }

    pub fn clear_threshold(mut self, clause: impl Into<String>) -> Self {
        self.thresholds.insert(clause.into(), None);
        self
    }

    pub fn flag(mut self, clause: impl Into<String>, on: bool) -> Self {
        self.flags.insert(clause.into(), on);
        self
    }

    /// Parse a patch from a JSON value
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// The values currently set for each clause
///
/// `FilterState::default()` is the identity filter: it admits every item.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterState {
    text: String,
    selections: BTreeMap<String, BTreeSet<String>>,
    thresholds: BTreeMap<String, f64>,
    flags: BTreeSet<String>,
}

impl FilterState {
    /// Merge a patch, validating every entry against the schema first
    ///
    /// On error `self` is left as it was and no partial merge is observable.
    pub fn with_patch(
        &self,
        patch: &FilterPatch,
        schema: &FilterSchema,
    ) -> Result<FilterState, FilterError> {
        for clause in patch.selections.keys() {
            schema.expect_kind(clause, "multi_select")?;
        }
        for (clause, value) in &patch.thresholds {
            let kind = schema.expect_kind(clause, "threshold")?;
            if let (Some(value), ClauseKind::Threshold { min, max, .. }) = (value, kind) {
                validate_threshold(clause, *value, *min, *max)?;
            }
        }
        for clause in patch.flags.keys() {
            schema.expect_kind(clause, "flag")?;
        }

        let mut next = self.clone();
        if let Some(text) = &patch.text {
            next.text = text.trim().to_string();
        }
        for (clause, values) in &patch.selections {
            if values.is_empty() {
                next.selections.remove(clause);
            } else {
                next.selections.insert(clause.clone(), values.clone());
            }
        }
        for (clause, value) in &patch.thresholds {
            match value {
                Some(value) => {
                    next.thresholds.insert(clause.clone(), *value);
                }
                None => {
                    next.thresholds.remove(clause);
                }
            }
        }
        for (clause, on) in &patch.flags {
            if *on {
                next.flags.insert(clause.clone());
            } else {
                next.flags.remove(clause);
            }
        }
        Ok(next)
    }

    /// The current text query (empty when unset)
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Selected values of a multi-select clause, if any
    pub fn selection(&self, clause: &str) -> Option<&BTreeSet<String>> {
        self.selections.get(clause)
    }

    /// Threshold of a threshold clause, if set
    pub fn threshold(&self, clause: &str) -> Option<f64> {
        self.thresholds.get(clause).copied()
    }

    /// Whether a flag clause is on
    pub fn flag(&self, clause: &str) -> bool {
        self.flags.contains(clause)
    }

    /// True when no clause is active
    pub fn is_identity(&self) -> bool {
        self.text.is_empty()
            && self.selections.is_empty()
            && self.thresholds.is_empty()
            && self.flags.is_empty()
    }

    /// Active clauses for chip/badge display, one entry per clause
    pub fn summary(&self, schema: &FilterSchema) -> ActiveFilterSummary {
        let mut clauses = Vec::new();
        if !self.text.is_empty() {
            clauses.push(format!("Search: \"{}\"", self.text));
        }
        for (name, def) in &schema.clauses {
            match &def.kind {
                ClauseKind::MultiSelect { .. } => {
                    if let Some(values) = self.selections.get(name) {
                        let joined = values.iter().cloned().collect::<Vec<_>>().join(", ");
                        clauses.push(format!("{}: {}", def.label, joined));
                    }
                }
                ClauseKind::Threshold { bound, .. } => {
                    if let Some(value) = self.thresholds.get(name) {
                        clauses.push(format!("{} {} {}", def.label, bound.symbol(), value));
                    }
                }
                ClauseKind::Flag { .. } => {
                    if self.flags.contains(name) {
                        clauses.push(def.label.clone());
                    }
                }
            }
        }
        ActiveFilterSummary {
            count: clauses.len(),
            clauses,
        }
    }
}

fn validate_threshold(
    clause: &str,
    value: f64,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<(), FilterError> {
    if !value.is_finite() {
        return Err(FilterError::NotFinite {
            clause: clause.to_string(),
            value,
        });
    }
    let lower = min.unwrap_or(f64::NEG_INFINITY);
    let upper = max.unwrap_or(f64::INFINITY);
    if value < lower || value > upper {
        return Err(FilterError::OutOfRange {
            clause: clause.to_string(),
            value,
            min: lower,
            max: upper,
        });
    }
    Ok(())
}

/// Count and descriptors of the active clauses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActiveFilterSummary {
    /// Number of active clauses (not selected values)
    pub count: usize,

    /// Human-readable descriptor per active clause
    pub clauses: Vec<String>,
}

//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::core::filter::{Bound, ClauseDef, ClauseKind, FilterSchema};
use crate::core::sort::SortOption;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;

fn default_page_size() -> usize {
    10
}

fn default_event_capacity() -> usize {
    256
}

/// Complete configuration for a collection session
///
/// # Example
///
/// ```yaml
/// page_size: 5
/// default_sort: highest-rated
/// filters:
///   text_fields: [title, body]
///   clauses:
///     min_rating:
///       kind: threshold
///       field: rating
///       bound: at_least
///       min: 0
///       max: 5
///       label: Rating
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Items added to the window per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Sort applied when a session starts
    #[serde(default)]
    pub default_sort: SortOption,

    /// Buffer size of the session event bus
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Clause declarations
    #[serde(default)]
    pub filters: FilterSchema,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_sort: SortOption::default(),
            event_capacity: default_event_capacity(),
            filters: FilterSchema::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check page size and clause declarations
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.page_size_nonzero()?;
        self.filters.validate()
    }

    /// Page size as a non-zero value
    pub fn page_size_nonzero(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.page_size).ok_or(ConfigError::ZeroPageSize)
    }

    /// Override the page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Default configuration for restaurant listings
    pub fn restaurants() -> Self {
        let mut clauses = IndexMap::new();
        clauses.insert("cuisine".to_string(), multi_select("Cuisine", "cuisine"));
        clauses.insert("price".to_string(), multi_select("Price", "price"));
        clauses.insert("dietary".to_string(), multi_select("Dietary", "dietary"));
        clauses.insert(
            "min_rating".to_string(),
            threshold("Rating", "rating", Bound::AtLeast, Some(5.0)),
        );
        clauses.insert(
            "max_distance".to_string(),
            threshold("Distance (km)", "distance_km", Bound::AtMost, None),
        );
        clauses.insert(
            "open_now".to_string(),
            ClauseDef {
                label: "Open now".to_string(),
                kind: ClauseKind::Flag {
                    field: "open_now".to_string(),
                },
            },
        );

        Self {
            page_size: default_page_size(),
            default_sort: SortOption::HighestRated,
            event_capacity: default_event_capacity(),
            filters: FilterSchema {
                text_fields: vec![
                    "name".to_string(),
                    "cuisine".to_string(),
                    "address".to_string(),
                ],
                clauses,
            },
        }
    }

    /// Default configuration for review feeds
    pub fn reviews() -> Self {
        let mut clauses = IndexMap::new();
        clauses.insert(
            "min_rating".to_string(),
            threshold("Rating", "rating", Bound::AtLeast, Some(5.0)),
        );
        clauses.insert(
            "helpful".to_string(),
            ClauseDef {
                label: "Marked helpful".to_string(),
                kind: ClauseKind::Flag {
                    field: "helpful".to_string(),
                },
            },
        );

        Self {
            page_size: 5,
            default_sort: SortOption::Newest,
            event_capacity: default_event_capacity(),
            filters: FilterSchema {
                text_fields: vec![
                    "title".to_string(),
                    "body".to_string(),
                    "author".to_string(),
                ],
                clauses,
            },
        }
    }
}

fn multi_select(label: &str, field: &str) -> ClauseDef {
    ClauseDef {
        label: label.to_string(),
        kind: ClauseKind::MultiSelect {
            field: field.to_string(),
        },
    }
}

fn threshold(label: &str, field: &str, bound: Bound, max: Option<f64>) -> ClauseDef {
    ClauseDef {
        label: label.to_string(),
        kind: ClauseKind::Threshold {
            field: field.to_string(),
            bound,
            min: Some(0.0),
            max,
        },
    }
}

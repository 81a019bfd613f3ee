//! Sort registry: the closed set of sort options and their comparators

use crate::core::item::Item;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Selectable sort order
///
/// Comparators only define the primary order; the projection breaks ties by
/// source position so the resulting order is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    /// Most recent first
    #[default]
    Newest,
    /// Oldest first
    Oldest,
    /// Highest rating first
    HighestRated,
    /// Lowest rating first
    LowestRated,
    /// Alphabetical by title, case-insensitive
    Name,
}

impl SortOption {
    pub const ALL: [SortOption; 5] = [
        SortOption::Newest,
        SortOption::Oldest,
        SortOption::HighestRated,
        SortOption::LowestRated,
        SortOption::Name,
    ];

    /// Registry key (e.g., "highest-rated")
    pub fn key(self) -> &'static str {
        match self {
            SortOption::Newest => "newest",
            SortOption::Oldest => "oldest",
            SortOption::HighestRated => "highest-rated",
            SortOption::LowestRated => "lowest-rated",
            SortOption::Name => "name",
        }
    }

    /// Label for sort pickers
    pub fn label(self) -> &'static str {
        match self {
            SortOption::Newest => "Newest",
            SortOption::Oldest => "Oldest",
            SortOption::HighestRated => "Highest rated",
            SortOption::LowestRated => "Lowest rated",
            SortOption::Name => "Name",
        }
    }

    /// Compare two items under this option
    pub fn compare<T: Item>(self, a: &T, b: &T, ctx: &SortContext) -> Ordering {
        match self {
            SortOption::Newest => ctx.effective(b).cmp(&ctx.effective(a)),
            SortOption::Oldest => ctx.effective(a).cmp(&ctx.effective(b)),
            SortOption::HighestRated => b.rating().total_cmp(&a.rating()),
            SortOption::LowestRated => a.rating().total_cmp(&b.rating()),
            SortOption::Name => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        }
    }

    /// Comparator closure bound to one projection pass
    pub fn comparator<T: Item>(self, ctx: SortContext) -> impl Fn(&T, &T) -> Ordering {
        move |a, b| self.compare(a, b, &ctx)
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SortOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOption::ALL
            .into_iter()
            .find(|option| option.key() == s)
            .ok_or_else(|| format!("unknown sort option '{}'", s))
    }
}

/// Inputs captured once per projection pass
///
/// `now` is read a single time so every comparison in a pass sees the same
/// clock, even if the wall clock advances during the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortContext {
    pub now: DateTime<Utc>,
}

impl SortContext {
    pub fn now() -> Self {
        Self { now: Utc::now() }
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Timestamps in the future rank as if stamped `now`
    fn effective<T: Item>(&self, item: &T) -> DateTime<Utc> {
        item.timestamp().min(self.now)
    }
}

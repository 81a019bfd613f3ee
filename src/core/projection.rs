//! Projection: the pure filter + sort transform over a source collection

use crate::core::collection::SourceCollection;
use crate::core::filter::FilterState;
use crate::core::item::Item;
use crate::core::predicate::PredicateSet;
use crate::core::sort::{SortContext, SortOption};

/// Filter and sort `source`, returning references in projected order
///
/// Deterministic for identical inputs: ties under `sort` keep source order.
pub fn project<'a, T: Item>(
    source: &'a [T],
    predicates: &PredicateSet<T>,
    filter: &FilterState,
    sort: SortOption,
) -> Vec<&'a T> {
    project_indices(source, predicates, filter, sort, SortContext::now())
        .into_iter()
        .map(|index| &source[index])
        .collect()
}

/// Filter and sort `source`, returning source positions in projected order
pub fn project_indices<T: Item>(
    source: &[T],
    predicates: &PredicateSet<T>,
    filter: &FilterState,
    sort: SortOption,
    ctx: SortContext,
) -> Vec<usize> {
    let needle = filter.text().to_lowercase();
    let mut indices: Vec<usize> = source
        .iter()
        .enumerate()
        .filter(|(_, item)| predicates.matches_lowered(item, filter, &needle))
        .map(|(index, _)| index)
        .collect();

    let compare = sort.comparator::<T>(ctx);
    indices.sort_by(|&a, &b| compare(&source[a], &source[b]).then(a.cmp(&b)));
    indices
}

#[derive(Debug, Clone)]
struct Memo {
    version: u64,
    filter: FilterState,
    sort: SortOption,
    indices: Vec<usize>,
}

/// Memoizes the last projection of a collection
///
/// The key includes the collection version, so a result computed before a
/// mutation is never served after it.
#[derive(Debug, Clone, Default)]
pub struct Projector {
    memo: Option<Memo>,
}

impl Projector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projected source positions for the given inputs
    pub fn indices<T: Item>(
        &mut self,
        source: &SourceCollection<T>,
        predicates: &PredicateSet<T>,
        filter: &FilterState,
        sort: SortOption,
    ) -> &[usize] {
        let fresh = self.memo.as_ref().is_some_and(|memo| {
            memo.version == source.version() && memo.sort == sort && &memo.filter == filter
        });
        if !fresh {
            let indices =
                project_indices(source.items(), predicates, filter, sort, SortContext::now());
            tracing::trace!(
                version = source.version(),
                sort = %sort,
                total = indices.len(),
                "Recomputed projection"
            );
            self.memo = Some(Memo {
                version: source.version(),
                filter: filter.clone(),
                sort,
                indices,
            });
        }
        match &self.memo {
            Some(memo) => &memo.indices,
            None => &[],
        }
    }

    /// Number of items passing the filter
    pub fn total<T: Item>(
        &mut self,
        source: &SourceCollection<T>,
        predicates: &PredicateSet<T>,
        filter: &FilterState,
        sort: SortOption,
    ) -> usize {
        self.indices(source, predicates, filter, sort).len()
    }
}

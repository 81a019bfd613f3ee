//! Collection sessions: the engine's public surface
//!
//! A [`CollectionSession`] owns one source collection together with its filter,
//! sort, window and load coordinator. `displayed_items` is never stored; every
//! [`ViewState`] is derived from the source collection on demand.
//!
//! Filter, sort and mutation calls are synchronous. `start`, `request_more` and
//! `request_refresh` are the only suspension points. The session state lock is
//! never held across an `.await`, so a session handle can be cloned and driven
//! from several tasks; overlapping loads are sequenced by the coordinator.
//! Loads are spawned onto the current Tokio runtime, so the async methods must
//! be called from within one.
//!
//! # Example
//!
//! ```rust,ignore
//! let session = create_session(InMemorySource::new(reviews), EngineConfig::reviews()).await?;
//!
//! session.set_filter(FilterPatch::new().threshold("min_rating", 4.0))?;
//! session.request_more().await?;
//!
//! let view = session.view_state();
//! println!("{} of {}", view.displayed_items.len(), view.total_filtered_count);
//! ```

mod mutation;

use crate::config::EngineConfig;
use crate::core::collection::SourceCollection;
use crate::core::coordinator::{Coordinator, Dispatch, LoadKind, Phase, Ticket};
use crate::core::error::{ConfigError, SessionError};
use crate::core::events::{EventBus, EventEnvelope, SessionEvent};
use crate::core::filter::{ActiveFilterSummary, ClauseKind, FilterPatch, FilterState};
use crate::core::item::Item;
use crate::core::predicate::{FlagFn, PredicateSet, ThresholdFn};
use crate::core::projection::Projector;
use crate::core::service::{DataSource, PageRequest};
use crate::core::sort::SortOption;
use crate::core::window::{PageWindow, WindowState};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Result of an asynchronous load request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The load ran and its result was committed
    Applied,
    /// A refresh was queued behind an in-flight load-more
    Queued,
    /// An equivalent load was already in flight; nothing was dispatched
    Suppressed,
    /// The window already shows everything
    Exhausted,
    /// The load completed for an outdated query and was dropped
    Discarded,
    /// The session has not finished its initial load
    NotReady,
}

/// Snapshot of what the presentation layer should render
#[derive(Debug, Clone)]
pub struct ViewState<T> {
    pub total_filtered_count: usize,
    pub has_more: bool,
    pub displayed_items: Vec<T>,
    pub phase: Phase,
    pub window: WindowState,
    pub sort: SortOption,
    pub generation: u64,
    /// Last load failure, cleared by the next committed load
    pub last_error: Option<SessionError>,
}

/// Mutable state of one session, guarded by the session lock
#[derive(Debug)]
pub(crate) struct SessionState<T: Item> {
    source: SourceCollection<T>,
    filter: FilterState,
    sort: SortOption,
    window: PageWindow,
    coordinator: Coordinator,
    projector: Projector,
    last_error: Option<SessionError>,
}

/// A committed or rejected load plus any load that must run next
struct Settled {
    outcome: Result<LoadOutcome, SessionError>,
    follow_up: Option<Ticket>,
}

impl<T: Item> SessionState<T> {
    fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            source: SourceCollection::default(),
            filter: FilterState::default(),
            sort: config.default_sort,
            window: PageWindow::new(config.page_size_nonzero()?),
            coordinator: Coordinator::new(),
            projector: Projector::new(),
            last_error: None,
        })
    }

    fn total(&mut self, predicates: &PredicateSet<T>) -> usize {
        self.projector
            .total(&self.source, predicates, &self.filter, self.sort)
    }

    fn window_state(&mut self, predicates: &PredicateSet<T>) -> WindowState {
        let total = self.total(predicates);
        self.window.state(total)
    }

    fn view(&mut self, predicates: &PredicateSet<T>) -> ViewState<T> {
        let indices = self
            .projector
            .indices(&self.source, predicates, &self.filter, self.sort);
        let total = indices.len();
        let shown = self.window.current_count().min(total);
        let items = self.source.items();
        let displayed_items = indices[..shown]
            .iter()
            .map(|&index| items[index].clone())
            .collect();

        ViewState {
            total_filtered_count: total,
            has_more: self.window.has_more(total),
            displayed_items,
            phase: self.coordinator.phase(),
            window: self.window.state(total),
            sort: self.sort,
            generation: self.coordinator.generation(),
            last_error: self.last_error.clone(),
        }
    }

    fn page_request(&self, ticket: Ticket) -> PageRequest {
        PageRequest {
            resident: self.source.len(),
            displayed: self.window.current_count(),
            page_size: self.window.page_size(),
            generation: ticket.generation,
        }
    }

    /// Start a new query generation with `filter` and `sort`
    fn change_query(
        &mut self,
        filter: FilterState,
        sort: SortOption,
        predicates: &PredicateSet<T>,
        events: &EventBus,
    ) -> Result<(), SessionError> {
        let generation =
            self.coordinator
                .advance_generation()
                .map_err(|phase| SessionError::Busy {
                    operation: "change the query",
                    phase,
                })?;
        self.filter = filter;
        self.sort = sort;
        let total = self.total(predicates);
        self.window.reset(total);

        tracing::debug!(generation, sort = %sort, total, "Query changed");
        events.publish(SessionEvent::QueryChanged {
            generation,
            sort,
            total,
        });
        Ok(())
    }

    /// Commit or drop the result of a dispatched load
    fn settle(
        &mut self,
        ticket: Ticket,
        result: anyhow::Result<Vec<T>>,
        predicates: &PredicateSet<T>,
        events: &EventBus,
    ) -> Settled {
        let Some(resolution) = self.coordinator.resolve(ticket, result.is_ok()) else {
            tracing::warn!(kind = %ticket.kind, "Ignoring completion of unknown load");
            return Settled {
                outcome: Ok(LoadOutcome::Discarded),
                follow_up: None,
            };
        };
        let follow_up = resolution.follow_up;

        if !resolution.fresh {
            tracing::warn!(
                kind = %ticket.kind,
                generation = ticket.generation,
                current = self.coordinator.generation(),
                "Discarding result of outdated load"
            );
            events.publish(SessionEvent::ResultDiscarded {
                kind: ticket.kind,
                generation: ticket.generation,
            });
            return Settled {
                outcome: Ok(LoadOutcome::Discarded),
                follow_up,
            };
        }

        let items = match result {
            Ok(items) => items,
            Err(e) => {
                let err = SessionError::Fetch {
                    kind: ticket.kind,
                    message: e.to_string(),
                };
                tracing::warn!(kind = %ticket.kind, error = %e, "Load failed");
                events.publish(SessionEvent::LoadFailed {
                    kind: ticket.kind,
                    message: e.to_string(),
                });
                self.last_error = Some(err.clone());
                return Settled {
                    outcome: Err(err),
                    follow_up,
                };
            }
        };

        match ticket.kind {
            LoadKind::Initial => {
                self.source.replace_all(items);
                let total = self.total(predicates);
                self.window.reset(total);
            }
            LoadKind::More => {
                self.source.append(items);
                let total = self.total(predicates);
                self.window.request_more(total);
            }
            LoadKind::Refresh => {
                self.source.replace_all(items);
                let total = self.total(predicates);
                self.window.clamp_after_mutation(total);
                if self.window.current_count() == 0 {
                    self.window.reset(total);
                }
            }
        }
        self.last_error = None;

        let total = self.total(predicates);
        let displayed = self.window.current_count();
        tracing::info!(kind = %ticket.kind, total, displayed, "Load committed");
        events.publish(SessionEvent::Loaded {
            kind: ticket.kind,
            total,
            displayed,
        });
        Settled {
            outcome: Ok(LoadOutcome::Applied),
            follow_up,
        }
    }
}

struct SessionInner<T: Item> {
    state: Mutex<SessionState<T>>,
    source: Arc<dyn DataSource<T>>,
    predicates: PredicateSet<T>,
    events: EventBus,
}

/// Handle to a collection session
///
/// Cheap to clone; clones share the same session.
pub struct CollectionSession<T: Item> {
    inner: Arc<SessionInner<T>>,
}

impl<T: Item> Clone for CollectionSession<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Item> CollectionSession<T> {
    /// Start building a session over `source`
    pub fn builder(source: impl DataSource<T> + 'static) -> SessionBuilder<T> {
        SessionBuilder::new(source)
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut SessionState<T>) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    // === Asynchronous loads ===

    /// Run the initial load (`Idle` → `LoadingInitial` → `Ready`)
    ///
    /// On failure the session returns to `Idle` and `start` may be called again.
    pub async fn start(&self) -> Result<LoadOutcome, SessionError> {
        let dispatch = self.with_state(|s| s.coordinator.begin_initial());
        self.dispatch(dispatch).await
    }

    /// Grow the window by one page
    ///
    /// Duplicate requests while a load is in flight are suppressed. If a
    /// refresh was queued behind this load, it runs before this call returns.
    pub async fn request_more(&self) -> Result<LoadOutcome, SessionError> {
        let predicates = &self.inner.predicates;
        let dispatch = self.with_state(|s| {
            let window = s.window_state(predicates);
            s.coordinator.begin_more(window)
        });
        self.dispatch(dispatch).await
    }

    /// Replace the source collection, preserving scroll depth where possible
    ///
    /// Queued (returns [`LoadOutcome::Queued`]) while a load-more is in flight.
    pub async fn request_refresh(&self) -> Result<LoadOutcome, SessionError> {
        let dispatch = self.with_state(|s| s.coordinator.begin_refresh());
        self.dispatch(dispatch).await
    }

    async fn dispatch(&self, dispatch: Dispatch) -> Result<LoadOutcome, SessionError> {
        let ticket = match dispatch {
            Dispatch::Start(ticket) => ticket,
            Dispatch::Queued => {
                tracing::debug!("Refresh queued behind in-flight load-more");
                return Ok(LoadOutcome::Queued);
            }
            Dispatch::Suppressed => {
                tracing::debug!("Suppressed duplicate load request");
                return Ok(LoadOutcome::Suppressed);
            }
            Dispatch::Exhausted(window) => {
                tracing::debug!(?window, "Nothing more to load");
                return Ok(LoadOutcome::Exhausted);
            }
            Dispatch::NotReady(phase) => {
                tracing::debug!(%phase, "Load requested before session is ready");
                return Ok(LoadOutcome::NotReady);
            }
        };

        // The whole chain runs on its own task so that dropping this future
        // cannot leave the coordinator stuck in a loading phase.
        let session = self.clone();
        let task = tokio::spawn(async move {
            let settled = session.run_guarded(ticket).await;
            session.finish(settled).await
        });

        task.await.unwrap_or_else(|e| {
            tracing::error!(kind = %ticket.kind, error = %e, "Load chain aborted");
            Err(SessionError::Fetch {
                kind: ticket.kind,
                message: format!("load task aborted: {}", e),
            })
        })
    }

    /// Run any queued follow-up loads, then report the original outcome
    async fn finish(&self, settled: Settled) -> Result<LoadOutcome, SessionError> {
        let mut follow_up = settled.follow_up;
        while let Some(next) = follow_up {
            let chained = self.run_guarded(next).await;
            if let Err(e) = &chained.outcome {
                tracing::debug!(error = %e, "Queued refresh failed");
            }
            follow_up = chained.follow_up;
        }
        settled.outcome
    }

    /// Run one load on its own task; a panicking fetch settles that ticket as failed
    async fn run_guarded(&self, ticket: Ticket) -> Settled {
        let session = self.clone();
        match tokio::spawn(async move { session.run(ticket).await }).await {
            Ok(settled) => settled,
            Err(e) => {
                tracing::error!(kind = %ticket.kind, error = %e, "Load task aborted");
                let predicates = &self.inner.predicates;
                let events = &self.inner.events;
                self.with_state(|s| {
                    s.settle(
                        ticket,
                        Err(anyhow::anyhow!("load task aborted: {}", e)),
                        predicates,
                        events,
                    )
                })
            }
        }
    }

    async fn run(&self, ticket: Ticket) -> Settled {
        let request = self.with_state(|s| s.page_request(ticket));
        tracing::debug!(
            kind = %ticket.kind,
            generation = ticket.generation,
            displayed = request.displayed,
            "Dispatching load"
        );

        let source = &self.inner.source;
        let result = match ticket.kind {
            LoadKind::Initial => source.load().await,
            LoadKind::More => source.load_more(request).await,
            LoadKind::Refresh => source.refresh().await,
        };

        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| s.settle(ticket, result, predicates, events))
    }

    // === Query changes ===

    /// Merge a partial filter and restart pagination from the first page
    ///
    /// Fails with `InvalidFilterValue` (state untouched) if the patch does not
    /// fit the clause schema, or `Busy` during the initial load.
    pub fn set_filter(&self, patch: FilterPatch) -> Result<(), SessionError> {
        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| {
            let phase = s.coordinator.phase();
            if phase == Phase::LoadingInitial {
                return Err(SessionError::Busy {
                    operation: "change the query",
                    phase,
                });
            }
            let filter = s.filter.with_patch(&patch, predicates.schema())?;
            let sort = s.sort;
            s.change_query(filter, sort, predicates, events)
        })
    }

    /// Remove every active clause and restart pagination
    pub fn clear_filters(&self) -> Result<(), SessionError> {
        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| {
            let sort = s.sort;
            s.change_query(FilterState::default(), sort, predicates, events)
        })
    }

    /// Select a sort option and restart pagination
    pub fn set_sort(&self, sort: SortOption) -> Result<(), SessionError> {
        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| {
            let filter = s.filter.clone();
            s.change_query(filter, sort, predicates, events)
        })
    }

    // === Mutations ===

    /// Merge `patch` into the item with `id`
    pub fn apply_edit(&self, id: Uuid, patch: T::Patch) -> Result<(), SessionError> {
        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| s.apply_edit(id, &patch, predicates, events))
    }

    /// Remove the item with `id`, returning it
    pub fn apply_delete(&self, id: Uuid) -> Result<T, SessionError> {
        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| s.apply_delete(id, predicates, events))
    }

    /// Add a new item to the end of the source collection
    pub fn apply_insert(&self, item: T) -> Result<(), SessionError> {
        let predicates = &self.inner.predicates;
        let events = &self.inner.events;
        self.with_state(|s| s.apply_insert(item, predicates, events))
    }

    // === Reads ===

    /// Derive the current view; never triggers a transition
    pub fn view_state(&self) -> ViewState<T> {
        let predicates = &self.inner.predicates;
        self.with_state(|s| s.view(predicates))
    }

    /// Active clauses for chip/badge display
    pub fn active_filter_summary(&self) -> ActiveFilterSummary {
        let schema = self.inner.predicates.schema();
        self.with_state(|s| s.filter.summary(schema))
    }

    pub fn phase(&self) -> Phase {
        self.with_state(|s| s.coordinator.phase())
    }

    pub fn filter(&self) -> FilterState {
        self.with_state(|s| s.filter.clone())
    }

    pub fn sort(&self) -> SortOption {
        self.with_state(|s| s.sort)
    }

    /// Receive every session event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.inner.events.subscribe()
    }
}

/// Builder for [`CollectionSession`]
///
/// # Example
///
/// ```ignore
/// let session = CollectionSession::builder(InMemorySource::new(restaurants))
///     .with_config(EngineConfig::restaurants().with_page_size(20))
///     .with_flag_fn("open_now", |r: &Restaurant| hours::is_open(r))
///     .build()?;
/// session.start().await?;
/// ```
pub struct SessionBuilder<T: Item> {
    source: Arc<dyn DataSource<T>>,
    config: EngineConfig,
    thresholds: Vec<(String, ThresholdFn<T>)>,
    flags: Vec<(String, FlagFn<T>)>,
}

impl<T: Item> SessionBuilder<T> {
    pub fn new(source: impl DataSource<T> + 'static) -> Self {
        Self {
            source: Arc::new(source),
            config: EngineConfig::default(),
            thresholds: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Supply the body of a threshold clause (e.g., distance)
    pub fn with_threshold_fn(
        mut self,
        clause: impl Into<String>,
        f: impl Fn(&T, f64) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.thresholds.push((clause.into(), Arc::new(f)));
        self
    }

    /// Supply the body of a flag clause (e.g., open now)
    pub fn with_flag_fn(
        mut self,
        clause: impl Into<String>,
        f: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.flags.push((clause.into(), Arc::new(f)));
        self
    }

    /// Validate the configuration and create an `Idle` session
    pub fn build(self) -> Result<CollectionSession<T>, ConfigError> {
        self.config.validate()?;
        let schema = &self.config.filters;

        for (clause, _) in &self.thresholds {
            expect_clause(schema.clause(clause).map(|def| &def.kind), clause, "threshold")?;
        }
        for (clause, _) in &self.flags {
            expect_clause(schema.clause(clause).map(|def| &def.kind), clause, "flag")?;
        }

        let mut predicates = PredicateSet::new(schema.clone());
        for (clause, f) in self.thresholds {
            predicates.register_threshold_fn(clause, f);
        }
        for (clause, f) in self.flags {
            predicates.register_flag_fn(clause, f);
        }

        let state = SessionState::new(&self.config)?;
        Ok(CollectionSession {
            inner: Arc::new(SessionInner {
                state: Mutex::new(state),
                source: self.source,
                predicates,
                events: EventBus::new(self.config.event_capacity),
            }),
        })
    }
}

fn expect_clause(
    kind: Option<&ClauseKind>,
    clause: &str,
    expected: &str,
) -> Result<(), ConfigError> {
    match kind {
        Some(kind) if kind.name() == expected => Ok(()),
        Some(kind) => Err(ConfigError::InvalidClause {
            clause: clause.to_string(),
            message: format!("custom {} body given for a {} clause", expected, kind.name()),
        }),
        None => Err(ConfigError::InvalidClause {
            clause: clause.to_string(),
            message: "custom body given for an undeclared clause".to_string(),
        }),
    }
}

/// Build a session over `source` and run its initial load
///
/// A failed initial load does not fail this call: the session is returned in
/// `Idle` with the error in [`ViewState::last_error`], ready for `start()`.
pub async fn create_session<T: Item>(
    source: impl DataSource<T> + 'static,
    config: EngineConfig,
) -> Result<CollectionSession<T>, ConfigError> {
    let session = CollectionSession::builder(source)
        .with_config(config)
        .build()?;
    if let Err(e) = session.start().await {
        tracing::warn!(error = %e, "Initial load failed; session left idle");
    }
    Ok(session)
}

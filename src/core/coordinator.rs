//! Load coordinator: the state machine sequencing asynchronous loads
//!
//! The coordinator never awaits anything itself. Callers ask it for permission
//! to dispatch a load ([`Dispatch`]), run the fetch, and hand the [`Ticket`]
//! back on completion ([`Coordinator::resolve`]).
//!
//! ```text
//! Idle ──start──▶ LoadingInitial ──ok──▶ Ready ◀──────────────┐
//!   ▲                  │                  │ more    │ refresh │
//!   └──────err─────────┘                  ▼         ▼         │
//!                                   LoadingMore  Refreshing ──┘
//!                                         │  (queued refresh runs next)
//!                                         └──────────▶ Ready / Refreshing
//! ```
//!
//! Mutual exclusion:
//! - `more` while `LoadingMore` or `Refreshing` is suppressed
//! - `refresh` while `LoadingMore` is queued until that load resolves
//! - `refresh` while `Refreshing` is suppressed
//!
//! Every ticket carries the query generation current at dispatch; a ticket
//! resolved after the generation moved on is reported stale and its result
//! must be dropped.

use crate::core::window::WindowState;
use serde::Serialize;
use std::fmt;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
    Refreshing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::LoadingInitial => "loading initial data",
            Phase::Ready => "ready",
            Phase::LoadingMore => "loading more",
            Phase::Refreshing => "refreshing",
        })
    }
}

/// The three asynchronous operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadKind {
    Initial,
    More,
    Refresh,
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadKind::Initial => "initial load",
            LoadKind::More => "load-more",
            LoadKind::Refresh => "refresh",
        })
    }
}

/// Permission to run one load, stamped at dispatch time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: LoadKind,
    pub generation: u64,
    seq: u64,
}

/// Answer to a dispatch request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Run the load and resolve the ticket afterwards
    Start(Ticket),
    /// A refresh will run once the in-flight load-more resolves
    Queued,
    /// An equivalent load is already in flight
    Suppressed,
    /// The window has nothing more to show
    Exhausted(WindowState),
    /// The session has no data yet
    NotReady(Phase),
}

/// What to do with a completed load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// `false` when the query generation changed since dispatch
    pub fresh: bool,
    /// A queued refresh that must be run now
    pub follow_up: Option<Ticket>,
}

/// Five-state load coordinator with generation stamping
#[derive(Debug, Clone)]
pub struct Coordinator {
    phase: Phase,
    generation: u64,
    refresh_queued: bool,
    in_flight: Option<u64>,
    next_seq: u64,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            refresh_queued: false,
            in_flight: None,
            next_seq: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn refresh_queued(&self) -> bool {
        self.refresh_queued
    }

    /// `Idle` → `LoadingInitial`
    pub fn begin_initial(&mut self) -> Dispatch {
        match self.phase {
            Phase::Idle => Dispatch::Start(self.issue(LoadKind::Initial, Phase::LoadingInitial)),
            _ => Dispatch::Suppressed,
        }
    }

    /// `Ready` → `LoadingMore`, only while the window is partial
    pub fn begin_more(&mut self, window: WindowState) -> Dispatch {
        match self.phase {
            Phase::Ready if window == WindowState::Partial => {
                Dispatch::Start(self.issue(LoadKind::More, Phase::LoadingMore))
            }
            Phase::Ready => Dispatch::Exhausted(window),
            Phase::LoadingMore | Phase::Refreshing => Dispatch::Suppressed,
            Phase::Idle | Phase::LoadingInitial => Dispatch::NotReady(self.phase),
        }
    }

    /// `Ready` → `Refreshing`; queued behind an in-flight load-more
    pub fn begin_refresh(&mut self) -> Dispatch {
        match self.phase {
            Phase::Ready => Dispatch::Start(self.issue(LoadKind::Refresh, Phase::Refreshing)),
            Phase::LoadingMore => {
                self.refresh_queued = true;
                Dispatch::Queued
            }
            Phase::Refreshing => Dispatch::Suppressed,
            Phase::Idle | Phase::LoadingInitial => Dispatch::NotReady(self.phase),
        }
    }

    /// Start a new query generation (filter or sort change)
    ///
    /// Rejected while the initial load is running.
    pub fn advance_generation(&mut self) -> Result<u64, Phase> {
        if self.phase == Phase::LoadingInitial {
            return Err(self.phase);
        }
        self.generation += 1;
        Ok(self.generation)
    }

    /// Settle a dispatched load
    ///
    /// Returns `None` for a ticket that is not the one in flight.
    pub fn resolve(&mut self, ticket: Ticket, succeeded: bool) -> Option<Resolution> {
        if self.in_flight != Some(ticket.seq) {
            return None;
        }
        self.in_flight = None;
        let fresh = ticket.generation == self.generation;

        self.phase = match ticket.kind {
            LoadKind::Initial if !succeeded => Phase::Idle,
            _ => Phase::Ready,
        };

        let follow_up = if ticket.kind == LoadKind::More && self.refresh_queued {
            self.refresh_queued = false;
            Some(self.issue(LoadKind::Refresh, Phase::Refreshing))
        } else {
            None
        };

        Some(Resolution { fresh, follow_up })
    }

    fn issue(&mut self, kind: LoadKind, phase: Phase) -> Ticket {
        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        self.phase = phase;
        Ticket {
            kind,
            generation: self.generation,
            seq: self.next_seq,
        }
    }
}

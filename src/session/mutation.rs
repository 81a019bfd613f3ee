//! Mutation synchronizer: edits, deletes and inserts against the source collection
//!
//! Each mutation touches the source collection only, then re-derives the
//! projection under the unchanged filter and sort and clamps the window to the
//! new total. The window never grows here, so items the user has scrolled past
//! stay visible (backfilled from beyond the window when one disappears).

use super::SessionState;
use crate::core::coordinator::Phase;
use crate::core::error::SessionError;
use crate::core::events::{EventBus, SessionEvent};
use crate::core::item::Item;
use crate::core::predicate::PredicateSet;
use uuid::Uuid;

impl<T: Item> SessionState<T> {
    pub(super) fn apply_edit(
        &mut self,
        id: Uuid,
        patch: &T::Patch,
        predicates: &PredicateSet<T>,
        events: &EventBus,
    ) -> Result<(), SessionError> {
        if !self.source.edit(id, patch) {
            return Err(not_found::<T>(id));
        }
        let total = self.resync(predicates);
        tracing::debug!(resource = T::resource_name(), %id, total, "Applied edit");
        events.publish(SessionEvent::ItemEdited { id });
        Ok(())
    }

    pub(super) fn apply_delete(
        &mut self,
        id: Uuid,
        predicates: &PredicateSet<T>,
        events: &EventBus,
    ) -> Result<T, SessionError> {
        let removed = self.source.remove(id).ok_or_else(|| not_found::<T>(id))?;
        let total = self.resync(predicates);
        tracing::debug!(resource = T::resource_name(), %id, total, "Applied delete");
        events.publish(SessionEvent::ItemDeleted { id });
        Ok(removed)
    }

    pub(super) fn apply_insert(
        &mut self,
        item: T,
        predicates: &PredicateSet<T>,
        events: &EventBus,
    ) -> Result<(), SessionError> {
        let phase = self.coordinator.phase();
        if phase == Phase::LoadingInitial {
            return Err(SessionError::Busy {
                operation: "insert an item",
                phase,
            });
        }
        let id = item.id();
        if !self.source.insert(item) {
            return Err(SessionError::AlreadyExists {
                resource: T::resource_name(),
                id,
            });
        }
        let total = self.resync(predicates);
        tracing::debug!(resource = T::resource_name(), %id, total, "Applied insert");
        events.publish(SessionEvent::ItemInserted { id });
        Ok(())
    }

    /// Re-derive the projection and clamp the window to it
    ///
    /// An emptied window gets its first page back once something matches again.
    fn resync(&mut self, predicates: &PredicateSet<T>) -> usize {
        let total = self.total(predicates);
        self.window.clamp_after_mutation(total);
        if self.window.current_count() == 0 {
            self.window.reset(total);
        }
        total
    }
}

fn not_found<T: Item>(id: Uuid) -> SessionError {
    SessionError::NotFound {
        resource: T::resource_name(),
        id,
    }
}

/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/2/26
******************************************************************************/

//! Completion and failure observers, and step event listeners.

use super::core::Sequencer;
use super::event::StepEvent;
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked on `complete` (with `Null`) or `failure` (with the payload).
pub type ObserverFn = Arc<dyn Fn(&Sequencer, &Value) + Send + Sync>;

/// Type alias for event listener functions.
pub(crate) type EventListener = Arc<dyn Fn(&StepEvent) + Send + Sync>;

/// Event kinds an observer can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObserverKind {
    Failure,
    Complete,
}

/// Handle of a registered observer, unique within one observer set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ObserverId(u64);

#[derive(Clone)]
pub(crate) struct Observer {
    id: ObserverId,
    callback: ObserverFn,
    once: bool,
}

/// The two ordered observer lists of a sequencer.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    failure: Vec<Observer>,
    complete: Vec<Observer>,
    next_id: u64,
}

impl Observers {
    pub(crate) fn register(
        &mut self,
        kind: ObserverKind,
        callback: ObserverFn,
        once: bool,
    ) -> ObserverId {
        let id = self.reserve();
        self.insert(kind, id, callback, once);
        id
    }

    /// Allocates an id ahead of [`insert`](Self::insert), so a callback can
    /// know the ids of its siblings.
    pub(crate) fn reserve(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn insert(
        &mut self,
        kind: ObserverKind,
        id: ObserverId,
        callback: ObserverFn,
        once: bool,
    ) {
        self.list_mut(kind).push(Observer { id, callback, once });
    }

    /// Unregisters `id`. Returns `false` if it was not registered.
    pub(crate) fn remove(&mut self, kind: ObserverKind, id: ObserverId) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|o| o.id != id);
        list.len() != before
    }

    /// Returns the callbacks to fire for `kind` and drops the one-shot ones.
    ///
    /// Observers registered after this call are kept even if they are
    /// one-shot, since they were not part of this firing.
    pub(crate) fn take_for_firing(&mut self, kind: ObserverKind) -> Vec<ObserverFn> {
        let list = self.list_mut(kind);
        let callbacks = list.iter().map(|o| Arc::clone(&o.callback)).collect();
        list.retain(|o| !o.once);
        callbacks
    }

    pub(crate) fn len(&self, kind: ObserverKind) -> usize {
        match kind {
            ObserverKind::Failure => self.failure.len(),
            ObserverKind::Complete => self.complete.len(),
        }
    }

    fn list_mut(&mut self, kind: ObserverKind) -> &mut Vec<Observer> {
        match kind {
            ObserverKind::Failure => &mut self.failure,
            ObserverKind::Complete => &mut self.complete,
        }
    }
}

/// Invokes every callback in order.
pub(crate) fn fire(callbacks: &[ObserverFn], sequencer: &Sequencer, data: &Value) {
    for callback in callbacks {
        callback(sequencer, data);
    }
}

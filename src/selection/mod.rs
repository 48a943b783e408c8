//! The two mutually exclusive selection sets shared by every view.
//!
//! All mutation goes through [`SelectionManager::toggle_current`],
//! [`SelectionManager::toggle_negative`] and [`SelectionManager::reset`].
//! Each successful mutation bumps the revision, writes the attached store and
//! notifies subscribers; no-ops do none of that.

mod persist;

use std::sync::mpsc::{self, Receiver, Sender};

use indexmap::IndexSet;
use tracing::{debug, info, warn};

pub use persist::{JsonFileStore, PersistedSelection, SelectionStore, initial_selection, to_query};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectionState {
    None,
    Current,
    Negative,
}

/// A toggle request raised by a view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionIntent {
    ToggleCurrent(String),
    ToggleNegative(String),
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Current,
    Negative,
    Reset,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionChange {
    pub revision: u64,
    pub kind: ChangeKind,
    pub snapshot: PersistedSelection,
}

/// What [`SelectionManager::restore`] had to repair.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Ids listed as both current and negative; they were kept as negative.
    pub conflicts: Vec<String>,
    pub duplicates: usize,
}

impl RestoreReport {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.duplicates == 0
    }
}

#[derive(Default)]
pub struct SelectionManager {
    current: IndexSet<String>,
    negative: IndexSet<String>,
    revision: u64,
    subscribers: Vec<Sender<SelectionChange>>,
    store: Option<Box<dyn SelectionStore>>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the sets from persisted lists. An id found in both lists is
    /// kept as negative.
    pub fn restore(selection: PersistedSelection) -> (Self, RestoreReport) {
        let mut report = RestoreReport::default();
        let mut negative = IndexSet::with_capacity(selection.negative.len());
        for id in selection.negative {
            if !negative.insert(id) {
                report.duplicates += 1;
            }
        }

        let mut current = IndexSet::with_capacity(selection.current.len());
        for id in selection.current {
            if negative.contains(&id) {
                if report.conflicts.contains(&id) {
                    report.duplicates += 1;
                } else {
                    warn!(id = %id, "selection id is both current and negative; keeping negative");
                    report.conflicts.push(id);
                }
                continue;
            }
            if !current.insert(id) {
                report.duplicates += 1;
            }
        }

        info!(
            current = current.len(),
            negative = negative.len(),
            conflicts = report.conflicts.len(),
            "selection restored"
        );
        let manager = Self {
            current,
            negative,
            ..Self::default()
        };
        (manager, report)
    }

    /// Attaches a store that is written after every successful mutation.
    pub fn with_store(mut self, store: Box<dyn SelectionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn current(&self) -> &IndexSet<String> {
        &self.current
    }

    pub fn negative(&self) -> &IndexSet<String> {
        &self.negative
    }

    pub fn state_of(&self, id: &str) -> SelectionState {
        if self.current.contains(id) {
            SelectionState::Current
        } else if self.negative.contains(id) {
            SelectionState::Negative
        } else {
            SelectionState::None
        }
    }

    pub fn snapshot(&self) -> PersistedSelection {
        PersistedSelection {
            current: self.current.iter().cloned().collect(),
            negative: self.negative.iter().cloned().collect(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<SelectionChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Returns `false` when the id is negative. A re-added id goes to the end
    /// of the set.
    pub fn toggle_current(&mut self, id: &str) -> bool {
        if self.negative.contains(id) {
            debug!(id, "toggle current ignored; id is negative");
            return false;
        }
        if !self.current.shift_remove(id) {
            self.current.insert(id.to_owned());
        }
        self.commit(ChangeKind::Current);
        true
    }

    pub fn toggle_negative(&mut self, id: &str) -> bool {
        if self.current.contains(id) {
            debug!(id, "toggle negative ignored; id is current");
            return false;
        }
        if !self.negative.shift_remove(id) {
            self.negative.insert(id.to_owned());
        }
        self.commit(ChangeKind::Negative);
        true
    }

    pub fn reset(&mut self) -> bool {
        if self.current.is_empty() && self.negative.is_empty() {
            return false;
        }
        self.current.clear();
        self.negative.clear();
        self.commit(ChangeKind::Reset);
        true
    }

    /// Toggles off every id `known` rejects and returns them. Each removal is
    /// an ordinary toggle, so the store and subscribers see it.
    pub fn drop_unknown(&mut self, known: impl Fn(&str) -> bool) -> Vec<String> {
        let stale_current = self
            .current
            .iter()
            .filter(|id| !known(id.as_str()))
            .cloned()
            .collect::<Vec<_>>();
        let stale_negative = self
            .negative
            .iter()
            .filter(|id| !known(id.as_str()))
            .cloned()
            .collect::<Vec<_>>();

        for id in &stale_current {
            self.toggle_current(id);
        }
        for id in &stale_negative {
            self.toggle_negative(id);
        }

        let mut dropped = stale_current;
        dropped.extend(stale_negative);
        if !dropped.is_empty() {
            warn!(count = dropped.len(), "dropped selection ids missing from the dataset");
        }
        dropped
    }

    pub fn apply(&mut self, intent: &SelectionIntent) -> bool {
        match intent {
            SelectionIntent::ToggleCurrent(id) => self.toggle_current(id),
            SelectionIntent::ToggleNegative(id) => self.toggle_negative(id),
            SelectionIntent::Reset => self.reset(),
        }
    }

    fn commit(&mut self, kind: ChangeKind) {
        self.revision += 1;
        let snapshot = self.snapshot();

        if let Some(store) = self.store.as_mut()
            && let Err(error) = store.save(&snapshot)
        {
            warn!("failed to persist selection: {error:#}");
        }

        let change = SelectionChange {
            revision: self.revision,
            kind,
            snapshot,
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
        debug!(
            revision = self.revision,
            ?kind,
            subscribers = self.subscribers.len(),
            "selection changed"
        );
    }
}

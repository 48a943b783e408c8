use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use crate::selection::{SelectionChange, SelectionManager, SelectionState};

/// A view's copy of the selection, kept current from the manager's change
/// notifications.
pub(in crate::app) struct SelectionHighlight {
    rx: Receiver<SelectionChange>,
    revision: u64,
    states: HashMap<String, SelectionState>,
}

impl SelectionHighlight {
    pub(in crate::app) fn new(manager: &mut SelectionManager) -> Self {
        let mut highlight = Self {
            rx: manager.subscribe(),
            revision: manager.revision(),
            states: HashMap::new(),
        };
        highlight.rebuild(
            manager.current().iter().map(String::as_str),
            manager.negative().iter().map(String::as_str),
        );
        highlight
    }

    /// Applies queued notifications; returns whether anything changed.
    pub(in crate::app) fn refresh(&mut self) -> bool {
        let Some(latest) = self.rx.try_iter().last() else {
            return false;
        };
        if latest.revision <= self.revision {
            return false;
        }
        self.revision = latest.revision;
        self.rebuild(
            latest.snapshot.current.iter().map(String::as_str),
            latest.snapshot.negative.iter().map(String::as_str),
        );
        true
    }

    pub(in crate::app) fn state_of(&self, id: &str) -> SelectionState {
        self.states
            .get(id)
            .copied()
            .unwrap_or(SelectionState::None)
    }

    #[cfg(test)]
    fn revision(&self) -> u64 {
        self.revision
    }

    fn rebuild<'a>(
        &mut self,
        current: impl Iterator<Item = &'a str>,
        negative: impl Iterator<Item = &'a str>,
    ) {
        self.states.clear();
        for id in current {
            self.states.insert(id.to_owned(), SelectionState::Current);
        }
        for id in negative {
            self.states.insert(id.to_owned(), SelectionState::Negative);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::selection::PersistedSelection;

    #[test]
    fn starts_from_the_restored_selection() {
        let (mut manager, _) = SelectionManager::restore(PersistedSelection {
            current: vec!["a".to_owned()],
            negative: vec!["b".to_owned()],
        });
        let highlight = SelectionHighlight::new(&mut manager);
        assert_eq!(highlight.state_of("a"), SelectionState::Current);
        assert_eq!(highlight.state_of("b"), SelectionState::Negative);
        assert_eq!(highlight.state_of("c"), SelectionState::None);
    }

    #[test]
    fn refresh_follows_the_latest_change() {
        let mut manager = SelectionManager::new();
        let mut results = SelectionHighlight::new(&mut manager);
        let mut embedding = SelectionHighlight::new(&mut manager);
        assert!(!results.refresh());

        manager.toggle_current("a");
        manager.toggle_negative("b");
        manager.toggle_current("a");

        for view in [&mut results, &mut embedding] {
            assert!(view.refresh());
            assert_eq!(view.revision(), 3);
            assert_eq!(view.state_of("a"), SelectionState::None);
            assert_eq!(view.state_of("b"), SelectionState::Negative);
            assert!(!view.refresh());
        }
    }
}

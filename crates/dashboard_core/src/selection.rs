use std::collections::HashSet;
use std::hash::Hash;

/// Header-checkbox state derived from the selection and the visible id list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    Unchecked,
    Indeterminate,
    Checked,
}

/// Set of selected row ids for one list view. Survives pagination and filter
/// changes; only an explicit clear (or a successful bulk mutation upstream)
/// empties it. Every operation is a pure set transformation.
#[derive(Debug, Clone)]
pub struct SelectionTracker<K> {
    selected: HashSet<K>,
}

impl<K> Default for SelectionTracker<K> {
    fn default() -> Self {
        Self {
            selected: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> SelectionTracker<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips membership of a single id.
    pub fn toggle(&mut self, id: K) {
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Adds or removes exactly the given ids. Ids outside `visible` keep
    /// whatever membership they already had.
    pub fn set_all_visible(&mut self, visible: &[K], selected: bool) {
        if selected {
            for id in visible {
                self.selected.insert(id.clone());
            }
        } else {
            for id in visible {
                self.selected.remove(id);
            }
        }
    }

    /// The select-all keyboard shortcut: select every visible id unless all of
    /// them are already selected, in which case deselect them.
    pub fn toggle_all_visible(&mut self, visible: &[K]) {
        let select = !self.is_all_visible_selected(visible);
        self.set_all_visible(visible, select);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: &K) -> bool {
        self.selected.contains(id)
    }

    /// True only when `visible` is non-empty and every member is selected.
    pub fn is_all_visible_selected(&self, visible: &[K]) -> bool {
        !visible.is_empty() && visible.iter().all(|id| self.selected.contains(id))
    }

    pub fn is_any_visible_selected(&self, visible: &[K]) -> bool {
        visible.iter().any(|id| self.selected.contains(id))
    }

    pub fn select_all_state(&self, visible: &[K]) -> SelectAllState {
        if self.is_all_visible_selected(visible) {
            SelectAllState::Checked
        } else if self.is_any_visible_selected(visible) {
            SelectAllState::Indeterminate
        } else {
            SelectAllState::Unchecked
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Copies the current membership, e.g. for a pending bulk-action payload.
    pub fn snapshot(&self) -> Vec<K> {
        self.selected.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_membership() {
        let mut tracker = SelectionTracker::new();
        tracker.toggle(7);
        assert!(tracker.is_selected(&7));
        tracker.toggle(7);
        assert!(!tracker.is_selected(&7));
        assert!(tracker.is_empty());
    }

    #[test]
    fn set_all_visible_only_touches_the_given_ids() {
        let mut tracker = SelectionTracker::new();
        tracker.set_all_visible(&[1, 2, 3], true);
        tracker.set_all_visible(&[2], false);
        let mut selected = tracker.snapshot();
        selected.sort_unstable();
        assert_eq!(selected, vec![1, 3]);
    }

    #[test]
    fn selection_from_other_pages_survives_set_all_visible() {
        let mut tracker = SelectionTracker::new();
        // id 10 selected on another page
        tracker.toggle(10);
        tracker.set_all_visible(&[1, 2], true);
        tracker.set_all_visible(&[1, 2], false);
        assert!(tracker.is_selected(&10));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn all_visible_requires_non_empty_id_list() {
        let tracker: SelectionTracker<i64> = SelectionTracker::new();
        assert!(!tracker.is_all_visible_selected(&[]));
        assert!(!tracker.is_any_visible_selected(&[]));
        assert_eq!(tracker.select_all_state(&[]), SelectAllState::Unchecked);
    }

    #[test]
    fn tri_state_reflects_partial_and_full_selection() {
        let mut tracker = SelectionTracker::new();
        let visible = [1, 2, 3];
        assert_eq!(tracker.select_all_state(&visible), SelectAllState::Unchecked);
        tracker.toggle(2);
        assert_eq!(
            tracker.select_all_state(&visible),
            SelectAllState::Indeterminate
        );
        tracker.set_all_visible(&visible, true);
        assert_eq!(tracker.select_all_state(&visible), SelectAllState::Checked);
    }

    #[test]
    fn toggle_all_visible_matches_set_all_with_complement() {
        let visible = [4, 5, 6];

        let mut shortcut = SelectionTracker::new();
        shortcut.toggle(5);
        let mut explicit = shortcut.clone();

        shortcut.toggle_all_visible(&visible);
        let select = !explicit.is_all_visible_selected(&visible);
        explicit.set_all_visible(&visible, select);
        let mut lhs = shortcut.snapshot();
        let mut rhs = explicit.snapshot();
        lhs.sort_unstable();
        rhs.sort_unstable();
        assert_eq!(lhs, rhs);

        // and again from the fully-selected state, where it must deselect
        shortcut.toggle_all_visible(&visible);
        assert!(!shortcut.is_any_visible_selected(&visible));
    }

    #[test]
    fn duplicate_ids_cannot_accumulate() {
        let mut tracker = SelectionTracker::new();
        tracker.set_all_visible(&[9, 9, 9], true);
        assert_eq!(tracker.len(), 1);
    }
}

use std::time::Duration;

use shared::domain::{RoleId, UserStatus};

/// Canonical fetch parameters for one list view. `page_index` is 0-based;
/// the wire translation adds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub search: String,
    pub role: Option<RoleId>,
    pub status: Option<UserStatus>,
    pub page_index: u32,
    pub page_size: u32,
}

/// Handed back by [`QueryState::set_draft_query`]; the caller sleeps
/// `window` and then offers `generation` back to
/// [`QueryState::settle_query`]. A newer draft invalidates older tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceTicket {
    pub generation: u64,
    pub window: Duration,
}

/// Owns the filter and pagination parameters for one list view and turns
/// state changes into request descriptors. Free-text input is held as a
/// draft that only commits once the debounce window passes without further
/// edits; all other setters commit immediately. No I/O happens here.
///
/// Every setter returns `Some(descriptor)` exactly when the canonical
/// descriptor changed, so each settled change maps to one fetch.
#[derive(Debug)]
pub struct QueryState {
    draft_query: String,
    committed_query: String,
    role: Option<RoleId>,
    status: Option<UserStatus>,
    page_index: u32,
    page_size: u32,
    debounce_window: Duration,
    draft_generation: u64,
}

impl QueryState {
    pub fn new(debounce_window: Duration, page_size: u32) -> Self {
        Self {
            draft_query: String::new(),
            committed_query: String::new(),
            role: None,
            status: None,
            page_index: 0,
            page_size: page_size.max(1),
            debounce_window,
            draft_generation: 0,
        }
    }

    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor {
            search: self.committed_query.clone(),
            role: self.role,
            status: self.status,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }

    /// The text as typed, before debouncing. For input echo only.
    pub fn draft_query(&self) -> &str {
        &self.draft_query
    }

    pub fn committed_query(&self) -> &str {
        &self.committed_query
    }

    pub fn set_draft_query(&mut self, text: impl Into<String>) -> DebounceTicket {
        self.draft_query = text.into();
        self.draft_generation += 1;
        DebounceTicket {
            generation: self.draft_generation,
            window: self.debounce_window,
        }
    }

    /// Commits the draft behind `generation`. Returns `None` when a newer
    /// draft superseded the ticket or the settled text matches what is
    /// already committed.
    pub fn settle_query(&mut self, generation: u64) -> Option<RequestDescriptor> {
        if generation != self.draft_generation {
            return None;
        }
        if self.draft_query == self.committed_query {
            return None;
        }
        self.committed_query = self.draft_query.clone();
        self.page_index = 0;
        Some(self.descriptor())
    }

    pub fn set_role_filter(&mut self, role: Option<RoleId>) -> Option<RequestDescriptor> {
        if self.role == role {
            return None;
        }
        self.role = role;
        self.page_index = 0;
        Some(self.descriptor())
    }

    pub fn set_status_filter(&mut self, status: Option<UserStatus>) -> Option<RequestDescriptor> {
        if self.status == status {
            return None;
        }
        self.status = status;
        self.page_index = 0;
        Some(self.descriptor())
    }

    /// The one setter that does not reset the page index.
    pub fn set_page_index(&mut self, page_index: u32) -> Option<RequestDescriptor> {
        if self.page_index == page_index {
            return None;
        }
        self.page_index = page_index;
        Some(self.descriptor())
    }

    pub fn set_page_size(&mut self, page_size: u32) -> Option<RequestDescriptor> {
        let page_size = page_size.max(1);
        if self.page_size == page_size {
            return None;
        }
        self.page_size = page_size;
        self.page_index = 0;
        Some(self.descriptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> QueryState {
        QueryState::new(Duration::from_millis(500), 10)
    }

    #[test]
    fn filter_changes_reset_page_index() {
        let mut query = state();
        query.set_page_index(3);

        let descriptor = query.set_role_filter(Some(RoleId(2))).unwrap();
        assert_eq!(descriptor.page_index, 0);

        query.set_page_index(5);
        let descriptor = query.set_status_filter(Some(UserStatus::Active)).unwrap();
        assert_eq!(descriptor.page_index, 0);

        query.set_page_index(5);
        let descriptor = query.set_page_size(25).unwrap();
        assert_eq!(descriptor.page_index, 0);
        assert_eq!(descriptor.page_size, 25);
    }

    #[test]
    fn page_index_change_does_not_reset_itself() {
        let mut query = state();
        let descriptor = query.set_page_index(4).unwrap();
        assert_eq!(descriptor.page_index, 4);
    }

    #[test]
    fn unchanged_setters_produce_no_descriptor() {
        let mut query = state();
        query.set_role_filter(Some(RoleId(1)));
        assert!(query.set_role_filter(Some(RoleId(1))).is_none());
        assert!(query.set_page_index(0).is_none());
        assert!(query.set_page_size(10).is_none());
        assert!(query.set_status_filter(None).is_none());
    }

    #[test]
    fn only_the_latest_draft_generation_settles() {
        let mut query = state();
        let first = query.set_draft_query("ann");
        let second = query.set_draft_query("anna");
        let third = query.set_draft_query("annabel");

        assert!(query.settle_query(first.generation).is_none());
        assert!(query.settle_query(second.generation).is_none());

        let descriptor = query.settle_query(third.generation).unwrap();
        assert_eq!(descriptor.search, "annabel");
        assert_eq!(descriptor.page_index, 0);
    }

    #[test]
    fn settling_commits_once_and_resets_page() {
        let mut query = state();
        query.set_page_index(2);

        let ticket = query.set_draft_query("maria");
        assert_eq!(query.draft_query(), "maria");
        assert_eq!(query.committed_query(), "");

        let descriptor = query.settle_query(ticket.generation).unwrap();
        assert_eq!(descriptor.search, "maria");
        assert_eq!(descriptor.page_index, 0);

        // settling the same generation again is a no-op
        assert!(query.settle_query(ticket.generation).is_none());
    }

    #[test]
    fn settling_an_unchanged_text_is_a_no_op() {
        let mut query = state();
        let ticket = query.set_draft_query("ann");
        query.settle_query(ticket.generation).unwrap();

        // retype the same text; no new fetch should follow
        let ticket = query.set_draft_query("ann");
        assert!(query.settle_query(ticket.generation).is_none());
    }

    #[test]
    fn page_size_is_clamped_to_at_least_one() {
        let mut query = state();
        let descriptor = query.set_page_size(0).unwrap();
        assert_eq!(descriptor.page_size, 1);
    }

    #[test]
    fn descriptor_carries_committed_not_draft_text() {
        let mut query = state();
        query.set_draft_query("typing");
        assert_eq!(query.descriptor().search, "");
    }
}

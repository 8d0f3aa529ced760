//! Suggestion session: query debouncing, search tickets and loading state.
//!
//! A session lives from the moment a trigger is matched until the match is lost, committed or
//! dismissed. Searches are request/response: the session hands out a [`SearchTicket`] per
//! request and only accepts results for the latest ticket it issued. Every session gets a new
//! generation, so tickets of a closed session never match again.

use crate::config::MentionItem;
use crate::menu::MenuItem;
use std::time::{Duration, Instant};

/// Identifies one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchTicket {
    generation: u64,
    sequence: u64,
}

impl SearchTicket {
    /// Session generation the request belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A search the host must answer with `MentionsPlugin::complete_search`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Ticket to hand back with the result.
    pub ticket: SearchTicket,
    /// Active trigger.
    pub trigger: String,
    /// Debounced query.
    pub query: String,
}

/// Remote candidate source.
pub trait SearchSource {
    /// Start a search. The result is delivered later through `complete_search`.
    fn search(&mut self, request: &SearchRequest);
}

/// State of the active suggestion session.
#[derive(Debug, Clone)]
pub struct Session {
    generation: u64,
    trigger: String,
    query: String,
    searched_query: Option<String>,
    results: Vec<MentionItem>,
    loading: bool,
    deadline: Option<Instant>,
    ticket: Option<SearchTicket>,
    next_sequence: u64,
    pub(crate) items: Vec<MenuItem>,
    pub(crate) highlighted: Option<usize>,
    pub(crate) blur_pending: bool,
}

impl Session {
    pub(crate) fn new(generation: u64, trigger: &str, query: &str) -> Self {
        Self {
            generation,
            trigger: trigger.to_string(),
            query: query.to_string(),
            searched_query: None,
            results: Vec::new(),
            loading: false,
            deadline: None,
            ticket: None,
            next_sequence: 0,
            items: Vec::new(),
            highlighted: None,
            blur_pending: false,
        }
    }

    /// Session generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Active trigger.
    pub fn trigger(&self) -> &str {
        &self.trigger
    }

    /// Raw query as typed.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Query of the last search started.
    pub fn searched_query(&self) -> Option<&str> {
        self.searched_query.as_deref()
    }

    /// Results of the last completed search.
    pub fn results(&self) -> &[MentionItem] {
        &self.results
    }

    /// A search is scheduled or in flight.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Pending debounce deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub(crate) fn set_query(&mut self, query: &str) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query.to_string();
        true
    }

    /// Restart the debounce timer.
    pub(crate) fn schedule(&mut self, now: Instant, delay: Duration) {
        self.deadline = Some(now + delay);
        self.loading = true;
    }

    /// Fire the debounce timer if it is due.
    pub(crate) fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Start a search for the current query.
    pub(crate) fn begin_search(&mut self) -> SearchRequest {
        let ticket = SearchTicket {
            generation: self.generation,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.ticket = Some(ticket);
        self.deadline = None;
        self.loading = true;
        self.searched_query = Some(self.query.clone());
        SearchRequest {
            ticket,
            trigger: self.trigger.clone(),
            query: self.query.clone(),
        }
    }

    /// Whether `ticket` answers the latest request.
    pub(crate) fn accepts(&self, ticket: SearchTicket) -> bool {
        self.ticket == Some(ticket)
    }

    /// Settle the latest request.
    pub(crate) fn finish_search(&mut self, results: Option<Vec<MentionItem>>) {
        self.ticket = None;
        if self.deadline.is_none() {
            self.loading = false;
        }
        if let Some(results) = results {
            self.results = results;
        }
    }

    /// Synchronous results (static items).
    pub(crate) fn set_results(&mut self, results: Vec<MentionItem>) {
        self.deadline = None;
        self.ticket = None;
        self.loading = false;
        self.searched_query = Some(self.query.clone());
        self.results = results;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_fires_once_when_due() {
        let start = Instant::now();
        let mut session = Session::new(1, "@", "a");
        session.schedule(start, Duration::from_millis(250));
        assert!(session.loading());
        assert!(!session.take_due(start + Duration::from_millis(100)));
        assert!(session.take_due(start + Duration::from_millis(250)));
        assert!(!session.take_due(start + Duration::from_millis(500)));
    }

    #[test]
    fn only_latest_ticket_is_accepted() {
        let mut session = Session::new(3, "@", "a");
        let first = session.begin_search().ticket;
        session.set_query("ab");
        let second = session.begin_search().ticket;
        assert!(!session.accepts(first));
        assert!(session.accepts(second));
        assert_eq!(second.generation(), 3);
        assert_eq!(session.searched_query(), Some("ab"));

        session.finish_search(Some(vec![MentionItem::from("abe")]));
        assert!(!session.loading());
        assert!(!session.accepts(second));
        assert_eq!(session.results().len(), 1);
    }

    #[test]
    fn rescheduled_query_keeps_loading_after_stale_completion() {
        let start = Instant::now();
        let mut session = Session::new(1, "@", "a");
        let ticket = session.begin_search().ticket;
        session.set_query("ab");
        session.schedule(start, Duration::from_millis(250));
        session.finish_search(None);
        assert!(session.loading());
        assert!(!session.accepts(ticket));
    }
}

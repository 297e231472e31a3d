//! Render decisions for the event views, kept free of Leptos types.

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;

use crate::graphql::operations::{Event, EventsData, News};

pub const LOADING_LIST: &str = "Loading ...";
pub const LOADING_LATEST: &str = "Loading...";

/// What `EventList` shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventListView {
    Loading,
    /// Table rows; an empty table when the query failed or found nothing.
    Rows(Vec<Event>),
}

impl EventListView {
    /// `None` while the query is in flight.
    #[must_use]
    pub fn from_query<E>(result: Option<&Result<EventsData, E>>) -> Self {
        match result {
            None => Self::Loading,
            Some(Ok(data)) => Self::Rows(data.list_events.items.clone()),
            Some(Err(_)) => Self::Rows(Vec::new()),
        }
    }
}

/// What `LatestEvents` shows: only the most recent event, never a history.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LatestEventView {
    pub latest: Option<Event>,
}

impl LatestEventView {
    pub fn apply(&mut self, news: News) {
        self.latest = Some(news.subscribe_to_events);
    }

    #[must_use]
    pub fn display(&self) -> &str {
        self.latest.as_ref().map_or(LOADING_LATEST, |event| event.name.as_str())
    }
}

//! The documents the views run, and their result shapes.

#[cfg(test)]
#[path = "operations_test.rs"]
mod operations_test;

use appsync::GraphqlRequest;
use serde::{Deserialize, Serialize};

pub const LIST_EVENTS: &str = r"
  query ListEvents {
    listEvents {
      items {
        id
        name
      }
    }
  }
";

pub const NEW_EVENTS: &str = r"
  subscription getNewEvents {
    subscribeToEvents {
      id
      name
    }
  }
";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConnection {
    #[serde(default)]
    pub items: Vec<Event>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsData {
    #[serde(rename = "listEvents")]
    pub list_events: EventConnection,
}

/// One subscription message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    #[serde(rename = "subscribeToEvents")]
    pub subscribe_to_events: Event,
}

#[must_use]
pub fn list_events() -> GraphqlRequest {
    GraphqlRequest::new(LIST_EVENTS)
}

#[must_use]
pub fn new_events() -> GraphqlRequest {
    GraphqlRequest::new(NEW_EVENTS)
}

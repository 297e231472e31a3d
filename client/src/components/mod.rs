pub mod event_list;
pub mod latest_events;

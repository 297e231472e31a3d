//! Client-side state.
//!
//! DESIGN
//! ======
//! `auth` holds the pure auth-state reducer, `session` drives it from the
//! identity provider, and `events` turns GraphQL results into what the event
//! views render. None of these touch the DOM, so all run in native tests.

pub mod auth;
pub mod events;
pub mod session;

//! Executor handle for background futures started outside a component.
//!
//! The auth session spawns its fetches through [`futures::task::LocalSpawn`]
//! so tests can drive it with a `LocalPool` while the app uses Leptos.

use futures::future::LocalFutureObj;
use futures::task::{LocalSpawn, SpawnError};

/// Spawns onto the Leptos local executor.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeptosSpawner;

impl LocalSpawn for LeptosSpawner {
    fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
        leptos::task::spawn_local(future);
        Ok(())
    }
}

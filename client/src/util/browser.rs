//! Page location and history access.
//!
//! Reads and rewrites `window.location` for the hosted-UI redirect flow.
//! Requires a browser environment; server-side calls are no-ops.

use crate::identity::{IdentityError, Navigator};

/// Full URL of the current page, if running in a browser.
pub fn current_href() -> Option<String> {
    #[cfg(feature = "hydrate")]
    {
        web_sys::window().and_then(|w| w.location().href().ok())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        None
    }
}

/// [`Navigator`] backed by `window.location` and `window.history`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn redirect(&self, url: &str) -> Result<(), IdentityError> {
        #[cfg(feature = "hydrate")]
        {
            let window = web_sys::window().ok_or_else(|| IdentityError::Navigation("no window".to_owned()))?;
            window
                .location()
                .assign(url)
                .map_err(|e| IdentityError::Navigation(format!("{e:?}")))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            Err(IdentityError::Navigation(format!("cannot navigate to {url} outside the browser")))
        }
    }

    fn replace_history(&self, url: &str) {
        #[cfg(feature = "hydrate")]
        {
            if let Some(history) = web_sys::window().and_then(|w| w.history().ok()) {
                let _ = history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(url));
            }
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = url;
        }
    }
}

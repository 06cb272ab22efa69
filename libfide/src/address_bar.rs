//! Mirroring of the current selection into the page address so that views can be shared.
use std::sync::{Arc, Mutex};

/// The query part of the page address, without the leading `?`.
pub trait AddressBar: Send {
    fn query(&self) -> String;
    /// Replaces the query without adding a history entry.
    fn replace_query(&mut self, query: &str);
}

/// In-memory address bar. Clones share the same history, which lets tests observe writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryAddressBar {
    writes: Arc<Mutex<Vec<String>>>,
    initial: String,
}

impl MemoryAddressBar {
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self {
            writes: Arc::default(),
            initial: initial.strip_prefix('?').unwrap_or(initial).to_string(),
        }
    }

    /// All queries written so far, oldest first.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl AddressBar for MemoryAddressBar {
    fn query(&self) -> String {
        self.writes
            .lock()
            .ok()
            .and_then(|w| w.last().cloned())
            .unwrap_or_else(|| self.initial.clone())
    }

    fn replace_query(&mut self, query: &str) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.push(query.to_string());
        }
    }
}

/// Address bar of the browser window hosting the wasm build.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct BrowserAddressBar;

#[cfg(target_arch = "wasm32")]
impl AddressBar for BrowserAddressBar {
    fn query(&self) -> String {
        web_sys::window()
            .and_then(|window| window.location().search().ok())
            .map(|search| search.trim_start_matches('?').to_string())
            .unwrap_or_default()
    }

    fn replace_query(&mut self, query: &str) {
        use tracing::warn;

        let Some(window) = web_sys::window() else {
            return;
        };
        let Ok(history) = window.history() else {
            warn!("No history object, address bar not updated");
            return;
        };
        let Ok(path) = window.location().pathname() else {
            return;
        };
        let url = format!("{path}?{query}");
        if let Err(e) =
            history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(&url))
        {
            warn!("Failed to update address bar: {e:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_address_bar_reports_latest_write() {
        let mut bar = MemoryAddressBar::new("?country=NOR");
        let observer = bar.clone();
        assert_eq!(bar.query(), "country=NOR");

        bar.replace_query("sort=name&order=asc");
        assert_eq!(observer.query(), "sort=name&order=asc");
        assert_eq!(observer.writes(), vec!["sort=name&order=asc".to_string()]);
    }
}

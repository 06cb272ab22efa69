//! Paginated, searchable and sortable browsing of the FIDE player list.
//!
//! [`PageController`] owns all state. User input and completions of background work reach
//! it as [`Message`]s; network requests and timers run as spawned tasks which report back
//! through the controller's channel.

pub mod address_bar;
pub mod async_util;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod logs;
pub mod message;
pub mod navigator;
pub mod page_controller;
pub mod prefetch;
pub mod remote;
pub mod state;
#[cfg(test)]
mod tests;
pub mod url_builder;

use std::sync::mpsc::{self, Receiver, Sender};

pub use fide_server::{Player, PlayerId, PlayersPage};

pub use address_bar::{AddressBar, MemoryAddressBar};
pub use cache::{PageResult, ResponseCache};
pub use config::FideConfig;
pub use message::Message;
pub use page_controller::{PageController, SelectionCallback};
pub use remote::{FetchError, HttpFetcher, PageFetcher};
pub use state::{BrowserState, LoadStatus, ViewState};
pub use url_builder::FilterState;

pub struct Channels {
    pub msg_sender: Sender<Message>,
    pub msg_receiver: Receiver<Message>,
}

impl Channels {
    fn new() -> Self {
        let (msg_sender, msg_receiver) = mpsc::channel();
        Self {
            msg_sender,
            msg_receiver,
        }
    }
}
